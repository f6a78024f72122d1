use core::time::Duration;

use crate::{IdPool, IdSource, RefillExecutor, Result, ThreadExecutor};

/// Construction parameters for an [`IdPool`].
///
/// Only the capacity is required. The refill threshold is always
/// `capacity / 10` and cannot be set independently.
///
/// # Example
/// ```
/// use core::time::Duration;
/// use idpool::PoolBuilder;
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// let next = AtomicU64::new(1);
/// let pool = PoolBuilder::new(16)
///     .backoff(Duration::from_millis(2))
///     .startup_timeout(Duration::from_secs(5))
///     .build(move || Ok::<_, ()>(next.fetch_add(1, Ordering::Relaxed)))
///     .unwrap();
///
/// assert_eq!(pool.get_id(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct PoolBuilder {
    pub(crate) capacity: usize,
    pub(crate) backoff: Duration,
    pub(crate) wait_interval: Duration,
    pub(crate) startup_timeout: Option<Duration>,
}

impl PoolBuilder {
    /// Pause after a failed call to the ID source.
    pub const DEFAULT_BACKOFF: Duration = Duration::from_millis(1);

    /// Pause between attempts on an empty standby buffer.
    pub const DEFAULT_WAIT_INTERVAL: Duration = Duration::from_millis(1);

    /// Starts a builder for a pool whose two buffers each hold `capacity`
    /// IDs.
    pub const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            backoff: Self::DEFAULT_BACKOFF,
            wait_interval: Self::DEFAULT_WAIT_INTERVAL,
            startup_timeout: None,
        }
    }

    /// Sets how long fill routines sleep after the source returns an error.
    #[must_use]
    pub fn backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets how long [`IdPool::get_id`] sleeps between attempts when the
    /// standby buffer it switched to is still empty.
    #[must_use]
    pub fn wait_interval(mut self, wait_interval: Duration) -> Self {
        self.wait_interval = wait_interval;
        self
    }

    /// Bounds the synchronous startup fill.
    ///
    /// Without a timeout, a source that never recovers keeps construction
    /// blocked forever. With one, construction fails with
    /// [`Error::StartupTimedOut`] once the deadline passes. A timeout too
    /// large to add to the current instant leaves the fill unbounded.
    ///
    /// [`Error::StartupTimedOut`]: crate::Error::StartupTimedOut
    #[must_use]
    pub fn startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = Some(timeout);
        self
    }

    /// Builds the pool, refilling on [`ThreadExecutor`].
    ///
    /// Blocks until both buffers are full.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidCapacity`] if the capacity is zero.
    /// - [`Error::StartupTimedOut`] if a startup timeout was set and elapsed.
    ///
    /// [`Error::InvalidCapacity`]: crate::Error::InvalidCapacity
    /// [`Error::StartupTimedOut`]: crate::Error::StartupTimedOut
    pub fn build<S>(self, source: S) -> Result<IdPool<S>>
    where
        S: IdSource,
    {
        self.build_with_executor(source, ThreadExecutor)
    }

    /// Builds the pool with a custom [`RefillExecutor`].
    ///
    /// Blocks until both buffers are full.
    ///
    /// # Errors
    ///
    /// Same as [`Self::build`].
    pub fn build_with_executor<S, E>(self, source: S, executor: E) -> Result<IdPool<S, E>>
    where
        S: IdSource,
        E: RefillExecutor,
    {
        IdPool::from_builder(self, source, executor)
    }
}
