mod buffer;
#[cfg(test)]
mod tests;

pub use buffer::*;
