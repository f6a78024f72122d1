#[cfg(feature = "async-tokio")]
mod tokio_rt;

#[cfg_attr(docsrs, doc(cfg(feature = "async-tokio")))]
#[cfg(feature = "async-tokio")]
pub use tokio_rt::*;
