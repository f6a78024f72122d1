//! The double-buffered pool.
//!
//! Two [`RingBuffer`]s take turns serving reads. While the active one drains,
//! the standby sits full (or is being refilled). When a caller finds the
//! active buffer empty it flips the selector to the standby and asks for a
//! background refill of the buffer it fell off. Refills are single-flight per
//! buffer: a CAS on a per-buffer flag admits one task, and the flag is
//! released when that task ends.

use core::time::Duration;
use std::{
    sync::Arc,
    thread,
    time::Instant,
};

use crossbeam_utils::CachePadded;
use portable_atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

use crate::{
    Error, IdSource, PoolBuilder, PoolStats, RefillExecutor, Result, RingBuffer, ThreadExecutor,
};

/// A self-refilling pool of pre-generated IDs.
///
/// Serving an ID is a single lock-free dequeue on the fast path; the cost of
/// minting IDs is paid by background refill tasks. Clones share the same
/// buffers.
///
/// Every returned ID was produced by the [`IdSource`] and is handed out at
/// most once, regardless of how many threads call in. No ordering between
/// callers is promised.
///
/// # Example
/// ```
/// use idpool::IdPool;
/// use std::sync::atomic::{AtomicU64, Ordering};
///
/// let next = AtomicU64::new(1);
/// let pool = IdPool::new(4, move || Ok::<_, ()>(next.fetch_add(1, Ordering::Relaxed))).unwrap();
///
/// // Buffer 0 holds 1..=4 and buffer 1 holds 5..=8.
/// assert_eq!(pool.get_ids(5), vec![1, 2, 3, 4, 5]);
/// assert_eq!(pool.stats().active, 1);
/// ```
pub struct IdPool<S, E = ThreadExecutor>
where
    S: IdSource,
    E: RefillExecutor,
{
    shared: Arc<Shared<S, E>>,
}

impl<S, E> Clone for IdPool<S, E>
where
    S: IdSource,
    E: RefillExecutor,
{
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<S, E> {
    buffers: [RingBuffer; 2],
    active: CachePadded<AtomicUsize>,
    refilling: [AtomicBool; 2],
    closed: AtomicBool,
    source: S,
    executor: E,
    threshold: u64,
    backoff: Duration,
    wait_interval: Duration,
    refills_started: AtomicU64,
    refills_completed: AtomicU64,
    source_failures: AtomicU64,
}

impl<S> IdPool<S>
where
    S: IdSource,
{
    /// Builds a pool of two buffers holding `capacity` IDs each, refilled on
    /// [`ThreadExecutor`] with default timings.
    ///
    /// Blocks until both buffers are full. If the source never recovers from
    /// failing, this never returns; use [`PoolBuilder::startup_timeout`] to
    /// bound it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize, source: S) -> Result<Self> {
        PoolBuilder::new(capacity).build(source)
    }

    /// Shorthand for [`PoolBuilder::new`].
    pub const fn builder(capacity: usize) -> PoolBuilder {
        PoolBuilder::new(capacity)
    }
}

impl<S, E> IdPool<S, E>
where
    S: IdSource,
    E: RefillExecutor,
{
    pub(crate) fn from_builder(builder: PoolBuilder, source: S, executor: E) -> Result<Self> {
        let capacity = builder.capacity;
        let shared = Arc::new(Shared {
            buffers: [RingBuffer::new(capacity)?, RingBuffer::new(capacity)?],
            active: CachePadded::new(AtomicUsize::new(0)),
            refilling: [AtomicBool::new(false), AtomicBool::new(false)],
            closed: AtomicBool::new(false),
            source,
            executor,
            threshold: capacity as u64 / 10,
            backoff: builder.backoff,
            wait_interval: builder.wait_interval,
            refills_started: AtomicU64::new(0),
            refills_completed: AtomicU64::new(0),
            source_failures: AtomicU64::new(0),
        });

        let deadline = builder
            .startup_timeout
            .and_then(|timeout| Some((Instant::now().checked_add(timeout)?, timeout)));
        for idx in 0..2 {
            shared.fill_sync(idx, deadline)?;
        }

        #[cfg(feature = "tracing")]
        tracing::info!(capacity, threshold = shared.threshold, "ID pool filled");

        Ok(Self { shared })
    }

    /// Returns an ID, waiting if both buffers are momentarily drained.
    ///
    /// Never fails. While the standby buffer is empty the caller sleeps for
    /// the configured wait interval between attempts; with an ID source that
    /// never recovers this waits forever. See [`Self::get_id_timeout`] for a
    /// bounded variant.
    pub fn get_id(&self) -> u64 {
        let standby = match self.shared.take_active() {
            Ok(id) => return id,
            Err(standby) => standby,
        };

        loop {
            if let Some(id) = self.shared.take_standby(standby) {
                return id;
            }
            thread::sleep(self.shared.wait_interval);
        }
    }

    /// Like [`Self::get_id`], but gives up once `timeout` has passed without
    /// an ID becoming available. A `timeout` too large to add to the
    /// current instant waits like [`Self::get_id`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Starved`] when the wait expires.
    pub fn get_id_timeout(&self, timeout: Duration) -> Result<u64> {
        let standby = match self.shared.take_active() {
            Ok(id) => return Ok(id),
            Err(standby) => standby,
        };

        // A deadline past what `Instant` can represent means no deadline.
        let deadline = Instant::now().checked_add(timeout);
        loop {
            if let Some(id) = self.shared.take_standby(standby) {
                return Ok(id);
            }

            let mut pause = self.shared.wait_interval;
            if let Some(deadline) = deadline {
                let now = Instant::now();
                if now >= deadline {
                    return Err(Error::Starved { timeout });
                }
                pause = pause.min(deadline - now);
            }
            thread::sleep(pause);
        }
    }

    /// Returns `count` IDs from sequential [`Self::get_id`] calls, in call
    /// order.
    pub fn get_ids(&self, count: usize) -> Vec<u64> {
        (0..count).map(|_| self.get_id()).collect()
    }

    /// Stops background refilling.
    ///
    /// Running refill tasks exit at their next iteration and new refill
    /// requests are ignored. IDs already buffered can still be taken.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);

        #[cfg(feature = "tracing")]
        tracing::debug!("ID pool closed, refills stopped");
    }

    /// Returns `true` once [`Self::close`] has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Slots per buffer.
    pub fn capacity(&self) -> usize {
        self.shared.buffers[0].capacity()
    }

    /// Remaining count below which a buffer asks for a refill
    /// (`capacity / 10`).
    pub fn threshold(&self) -> u64 {
        self.shared.threshold
    }

    /// Takes a best-effort snapshot of the pool's state.
    pub fn stats(&self) -> PoolStats {
        let shared = &self.shared;
        PoolStats {
            capacity: self.capacity(),
            threshold: shared.threshold,
            active: shared.active.load(Ordering::Acquire),
            buffered: [shared.buffers[0].len(), shared.buffers[1].len()],
            refilling: [
                shared.refilling[0].load(Ordering::Acquire),
                shared.refilling[1].load(Ordering::Acquire),
            ],
            refills_started: shared.refills_started.load(Ordering::Relaxed),
            refills_completed: shared.refills_completed.load(Ordering::Relaxed),
            source_failures: shared.source_failures.load(Ordering::Relaxed),
            closed: self.is_closed(),
        }
    }

    /// Fast path: one attempt on the active buffer. On failure the selector
    /// has been flipped and the index of the new active buffer is returned.
    #[cfg_attr(not(feature = "futures"), allow(dead_code))]
    pub(crate) fn try_take_active(&self) -> core::result::Result<u64, usize> {
        self.shared.take_active()
    }

    /// One attempt on the standby buffer the caller switched to.
    #[cfg_attr(not(feature = "futures"), allow(dead_code))]
    pub(crate) fn try_take_standby(&self, standby: usize) -> Option<u64> {
        self.shared.take_standby(standby)
    }

    #[cfg_attr(not(feature = "futures"), allow(dead_code))]
    pub(crate) fn wait_interval(&self) -> Duration {
        self.shared.wait_interval
    }

    #[cfg(test)]
    pub(crate) fn request_refill(&self, idx: usize) {
        self.shared.request_refill(idx);
    }
}

impl<S, E> Shared<S, E>
where
    S: IdSource,
    E: RefillExecutor,
{
    fn take_active(self: &Arc<Self>) -> core::result::Result<u64, usize> {
        let current = self.active.load(Ordering::Acquire);
        if let Some(id) = self.take(current) {
            return Ok(id);
        }

        // The emptiness check and the flip are not one atomic step, so racing
        // callers may all flip. Storing the same index twice is harmless.
        let standby = 1 - current;
        self.active.store(standby, Ordering::Release);
        self.request_refill(current);

        #[cfg(feature = "tracing")]
        tracing::trace!(from = current, to = standby, "switched active buffer");

        Err(standby)
    }

    fn take_standby(self: &Arc<Self>, standby: usize) -> Option<u64> {
        let id = self.take(standby);
        if id.is_none() {
            // The standby drained before anyone asked for it to be refilled.
            self.request_refill(standby);
        }
        id
    }

    fn take(self: &Arc<Self>, idx: usize) -> Option<u64> {
        let buffer = &self.buffers[idx];
        let id = buffer.try_dequeue()?;
        if buffer.len() < self.threshold {
            self.request_refill(idx);
        }
        Some(id)
    }

    fn request_refill(self: &Arc<Self>, idx: usize) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        if self.refilling[idx]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }

        self.refills_started.fetch_add(1, Ordering::Relaxed);
        let guard = RefillGuard {
            shared: Arc::clone(self),
            idx,
        };
        self.executor.execute(Box::new(move || guard.run()));
    }

    /// Drains the source into buffer `idx` until it is full.
    fn refill(&self, idx: usize) {
        let buffer = &self.buffers[idx];
        let mut _produced = 0_u64;

        #[cfg(feature = "tracing")]
        tracing::trace!(buffer = idx, buffered = buffer.len(), "refill started");

        while !buffer.is_full() && !self.closed.load(Ordering::Acquire) {
            match self.source.next_id() {
                Ok(id) => {
                    if !buffer.try_enqueue(id) {
                        break;
                    }
                    _produced += 1;
                }
                Err(e) => self.source_failed(idx, &e),
            }
        }

        self.refills_completed.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "tracing")]
        tracing::debug!(buffer = idx, produced = _produced, "refill finished");
    }

    /// Fills buffer `idx` on the calling thread during construction.
    fn fill_sync(&self, idx: usize, deadline: Option<(Instant, Duration)>) -> Result<()> {
        let buffer = &self.buffers[idx];

        while !buffer.is_full() {
            match self.source.next_id() {
                Ok(id) => {
                    if !buffer.try_enqueue(id) {
                        break;
                    }
                }
                Err(e) => {
                    if let Some((at, timeout)) = deadline {
                        if Instant::now() >= at {
                            self.source_failures.fetch_add(1, Ordering::Relaxed);
                            return Err(Error::StartupTimedOut {
                                buffer: idx,
                                timeout,
                            });
                        }
                    }
                    self.source_failed(idx, &e);
                }
            }
        }
        Ok(())
    }

    fn source_failed(&self, _idx: usize, _err: &S::Err) {
        self.source_failures.fetch_add(1, Ordering::Relaxed);

        #[cfg(feature = "tracing")]
        tracing::debug!(buffer = _idx, error = ?_err, "ID source failed, backing off");

        thread::sleep(self.backoff);
    }
}

/// Owns the single-flight slot of one buffer for the lifetime of a refill
/// task. Dropping it, whether after running or without ever running,
/// releases the slot.
struct RefillGuard<S, E>
where
    S: IdSource,
    E: RefillExecutor,
{
    shared: Arc<Shared<S, E>>,
    idx: usize,
}

impl<S, E> RefillGuard<S, E>
where
    S: IdSource,
    E: RefillExecutor,
{
    fn run(self) {
        self.shared.refill(self.idx);
    }
}

impl<S, E> Drop for RefillGuard<S, E>
where
    S: IdSource,
    E: RefillExecutor,
{
    fn drop(&mut self) {
        self.shared.refilling[self.idx].store(false, Ordering::Release);
    }
}
