/// A point-in-time view of an [`IdPool`].
///
/// Fields are read one by one without synchronization, so a snapshot taken
/// under load is approximate.
///
/// [`IdPool`]: crate::IdPool
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PoolStats {
    /// Slots per buffer.
    pub capacity: usize,
    /// Remaining count below which a buffer asks for a refill.
    pub threshold: u64,
    /// Index of the buffer currently serving reads.
    pub active: usize,
    /// Values currently held by each buffer.
    pub buffered: [u64; 2],
    /// Whether a refill task is in flight for each buffer.
    pub refilling: [bool; 2],
    /// Refill tasks handed to the executor.
    pub refills_started: u64,
    /// Refill tasks that ran to completion.
    pub refills_completed: u64,
    /// Calls to the ID source that returned an error.
    pub source_failures: u64,
    /// Whether [`IdPool::close`] has been called.
    ///
    /// [`IdPool::close`]: crate::IdPool::close
    pub closed: bool,
}
