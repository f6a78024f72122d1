#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod error;
#[cfg(feature = "futures")]
mod futures;
mod pool;
mod ring;
mod source;
#[cfg(feature = "snowflake")]
mod time;

pub use crate::error::*;
#[cfg(feature = "futures")]
pub use crate::futures::*;
pub use crate::pool::*;
pub use crate::ring::*;
pub use crate::source::*;
#[cfg(feature = "snowflake")]
pub use crate::time::*;
