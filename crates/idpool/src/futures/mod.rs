mod pool;
mod runtime;
mod sleep_provider;

#[cfg(feature = "async-tokio")]
pub use runtime::*;
pub use sleep_provider::*;
