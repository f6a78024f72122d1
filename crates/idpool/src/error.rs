use core::time::Duration;

/// A result type defaulting to the crate's [`Error`].
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// All error variants that `idpool` can emit.
///
/// None of these are produced by [`IdPool::get_id`], which never fails. They
/// come from construction and from the bounded waiting variants.
///
/// [`IdPool::get_id`]: crate::IdPool::get_id
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A ring buffer (and therefore a pool) needs room for at least one ID.
    #[error("buffer capacity must be greater than zero")]
    InvalidCapacity,

    /// The synchronous startup fill could not complete before the configured
    /// deadline because the source kept failing.
    #[error("startup fill of buffer {buffer} did not complete within {timeout:?}")]
    StartupTimedOut {
        /// Index of the buffer that was being filled.
        buffer: usize,
        /// The deadline that elapsed.
        timeout: Duration,
    },

    /// Both buffers stayed empty for the whole bounded wait.
    #[error("no ID became available within {timeout:?}")]
    Starved {
        /// The deadline that elapsed.
        timeout: Duration,
    },
}
