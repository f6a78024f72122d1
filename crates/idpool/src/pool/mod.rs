mod builder;
mod double;
mod executor;
mod stats;

pub use builder::*;
pub use double::*;
pub use executor::*;
pub use stats::*;
