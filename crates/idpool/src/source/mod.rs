mod interface;
#[cfg(feature = "snowflake")]
mod snowflake;

pub use interface::*;
#[cfg_attr(docsrs, doc(cfg(feature = "snowflake")))]
#[cfg(feature = "snowflake")]
pub use snowflake::*;
