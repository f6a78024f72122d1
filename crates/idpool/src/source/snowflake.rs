use core::cmp;

use crossbeam_utils::CachePadded;
use portable_atomic::{AtomicU64, Ordering};

use crate::{IdSource, MonotonicClock, TimeSource};

const SEQUENCE_BITS: u32 = 12;
const WORKER_ID_BITS: u32 = 5;
const DATACENTER_ID_BITS: u32 = 5;
const TIMESTAMP_BITS: u32 = 41;

const WORKER_ID_SHIFT: u32 = SEQUENCE_BITS;
const DATACENTER_ID_SHIFT: u32 = WORKER_ID_SHIFT + WORKER_ID_BITS;
const TIMESTAMP_SHIFT: u32 = DATACENTER_ID_SHIFT + DATACENTER_ID_BITS;

const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

/// Largest datacenter ID that fits the layout.
pub const MAX_DATACENTER_ID: u64 = (1 << DATACENTER_ID_BITS) - 1;
/// Largest worker ID that fits the layout.
pub const MAX_WORKER_ID: u64 = (1 << WORKER_ID_BITS) - 1;
/// Largest timestamp (milliseconds since the epoch) that fits the layout.
pub const MAX_TIMESTAMP: u64 = (1 << TIMESTAMP_BITS) - 1;

/// Errors produced by [`SnowflakeSource`].
///
/// Only [`SnowflakeError::NodeIdOutOfRange`] is returned at construction. The
/// others come from [`IdSource::next_id`] and are transient from the point of
/// view of an [`IdPool`], which simply retries after a short backoff.
///
/// [`IdPool`]: crate::IdPool
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SnowflakeError {
    /// A datacenter or worker ID does not fit in its 5-bit field.
    #[error("{field} {value} exceeds the maximum of {max}")]
    NodeIdOutOfRange {
        /// Which component was out of range.
        field: &'static str,
        /// The rejected value.
        value: u64,
        /// The largest accepted value.
        max: u64,
    },

    /// All 4096 sequence numbers of the current millisecond were handed out.
    #[error("sequence exhausted for millisecond {timestamp}")]
    SequenceExhausted {
        /// The saturated millisecond.
        timestamp: u64,
    },

    /// The time source reads earlier than the last issued timestamp.
    #[error("clock is {by_ms} ms behind the last issued timestamp")]
    ClockBehind {
        /// How far behind the clock is.
        by_ms: u64,
    },

    /// The time since the epoch no longer fits in 41 bits.
    #[error("timestamp {timestamp} does not fit in 41 bits")]
    TimestampOverflow {
        /// The offending timestamp.
        timestamp: u64,
    },
}

/// The decoded components of an ID minted by [`SnowflakeSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnowflakeParts {
    /// Milliseconds since the source's epoch.
    pub timestamp: u64,
    /// Datacenter component.
    pub datacenter_id: u64,
    /// Worker component.
    pub worker_id: u64,
    /// Per-millisecond sequence number.
    pub sequence: u64,
}

/// A lock-free Snowflake-style ID source.
///
/// Layout (most significant first): 1 unused bit, 41-bit millisecond
/// timestamp, 5-bit datacenter ID, 5-bit worker ID, 12-bit sequence.
///
/// The last issued ID lives in a single [`AtomicU64`] and every call advances
/// it with a compare-and-swap, so the source can be shared by the refill tasks
/// of an [`IdPool`] without a lock. A lost CAS is retried immediately; running
/// out of sequence numbers or a clock reading behind the last timestamp is
/// reported as an error so the caller can back off.
///
/// # Example
/// ```
/// use idpool::{IdSource, MonotonicClock, SnowflakeSource};
///
/// let source = SnowflakeSource::new(1, 1, MonotonicClock::default()).unwrap();
/// let a = source.next_id().unwrap();
/// let b = source.next_id().unwrap();
/// assert!(b > a);
/// ```
///
/// [`IdPool`]: crate::IdPool
pub struct SnowflakeSource<T = MonotonicClock>
where
    T: TimeSource,
{
    state: CachePadded<AtomicU64>,
    node: u64,
    time: T,
}

impl<T> SnowflakeSource<T>
where
    T: TimeSource,
{
    /// Creates a source for the given datacenter and worker.
    ///
    /// # Errors
    ///
    /// Returns [`SnowflakeError::NodeIdOutOfRange`] if either ID exceeds 31.
    pub fn new(datacenter_id: u64, worker_id: u64, time: T) -> Result<Self, SnowflakeError> {
        if datacenter_id > MAX_DATACENTER_ID {
            return Err(SnowflakeError::NodeIdOutOfRange {
                field: "datacenter_id",
                value: datacenter_id,
                max: MAX_DATACENTER_ID,
            });
        }
        if worker_id > MAX_WORKER_ID {
            return Err(SnowflakeError::NodeIdOutOfRange {
                field: "worker_id",
                value: worker_id,
                max: MAX_WORKER_ID,
            });
        }

        let node = (datacenter_id << DATACENTER_ID_SHIFT) | (worker_id << WORKER_ID_SHIFT);
        Ok(Self {
            state: CachePadded::new(AtomicU64::new(node)),
            node,
            time,
        })
    }

    /// Splits an ID produced by this layout into its components.
    pub const fn decompose(id: u64) -> SnowflakeParts {
        SnowflakeParts {
            timestamp: id >> TIMESTAMP_SHIFT,
            datacenter_id: (id >> DATACENTER_ID_SHIFT) & MAX_DATACENTER_ID,
            worker_id: (id >> WORKER_ID_SHIFT) & MAX_WORKER_ID,
            sequence: id & SEQUENCE_MASK,
        }
    }

    /// Attempts to mint the next ID.
    ///
    /// # Errors
    ///
    /// - [`SnowflakeError::SequenceExhausted`] when the current millisecond is
    ///   used up.
    /// - [`SnowflakeError::ClockBehind`] when the clock reads earlier than the
    ///   last issued timestamp.
    /// - [`SnowflakeError::TimestampOverflow`] once the 41-bit range is spent.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip(self)))]
    pub fn try_next_id(&self) -> Result<u64, SnowflakeError> {
        loop {
            let now = self.time.current_millis();
            if now > MAX_TIMESTAMP {
                return Err(SnowflakeError::TimestampOverflow { timestamp: now });
            }

            let current = self.state.load(Ordering::Relaxed);
            let current_ts = current >> TIMESTAMP_SHIFT;

            let next = match now.cmp(&current_ts) {
                cmp::Ordering::Equal => {
                    if current & SEQUENCE_MASK == SEQUENCE_MASK {
                        return Err(SnowflakeError::SequenceExhausted { timestamp: now });
                    }
                    current + 1
                }
                cmp::Ordering::Greater => (now << TIMESTAMP_SHIFT) | self.node,
                cmp::Ordering::Less => {
                    return Err(Self::cold_clock_behind(now, current_ts));
                }
            };

            if self
                .state
                .compare_exchange(current, next, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
            {
                return Ok(next);
            }
            // Another refill task won the race; re-read the clock and state.
        }
    }

    #[cold]
    #[inline(never)]
    fn cold_clock_behind(now: u64, current_ts: u64) -> SnowflakeError {
        SnowflakeError::ClockBehind {
            by_ms: current_ts - now,
        }
    }
}

impl<T> IdSource for SnowflakeSource<T>
where
    T: TimeSource,
{
    type Err = SnowflakeError;

    fn next_id(&self) -> Result<u64, Self::Err> {
        self.try_next_id()
    }
}
