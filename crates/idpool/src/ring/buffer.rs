use crate::{Error, Result};
use crossbeam_utils::{Backoff, CachePadded};
use portable_atomic::{AtomicU64, Ordering};

/// A single cell of the ring.
///
/// `stamp` is the commit marker for `value`. For the slot at index `i` and a
/// lap `k` (ticket `t = k * capacity + i`):
///
/// - `stamp == t`: empty, the producer holding ticket `t` may write.
/// - `stamp == t + 1`: holds the value written under ticket `t`, the consumer
///   holding ticket `t` may read.
///
/// After reading, the consumer hands the slot to the next lap by storing
/// `t + capacity`.
struct Slot {
    stamp: AtomicU64,
    value: AtomicU64,
}

/// A lock-free, bounded, multi-producer multi-consumer FIFO of `u64` values.
///
/// Positions are handed out by two monotonically increasing counters, `read`
/// and `write`, each advanced only through a compare-and-swap. A successful
/// CAS grants one ticket to exactly one caller, so no two producers ever write
/// the same slot and no two consumers ever take the same value. The slot
/// position is `ticket % capacity`.
///
/// The counters alone cannot tell a consumer whether the producer that
/// reserved a ticket has finished writing, so every slot also carries a
/// sequence stamp. The producer stores the value and then release-stores the
/// stamp; the consumer acquire-loads the stamp before reading. A value is
/// therefore never observed before it is committed.
///
/// `0 <= write - read <= capacity` holds at every instant.
///
/// ## See Also
/// - [`IdPool`], which pairs two of these into a double buffer.
///
/// [`IdPool`]: crate::IdPool
pub struct RingBuffer {
    read: CachePadded<AtomicU64>,
    write: CachePadded<AtomicU64>,
    slots: Box<[Slot]>,
    capacity: u64,
}

impl RingBuffer {
    /// Creates an empty ring that can hold `capacity` values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapacity`] if `capacity` is zero.
    ///
    /// # Example
    /// ```
    /// use idpool::RingBuffer;
    ///
    /// let ring = RingBuffer::new(2).unwrap();
    /// assert!(ring.try_enqueue(7));
    /// assert!(ring.try_enqueue(8));
    /// assert!(!ring.try_enqueue(9));
    /// assert_eq!(ring.try_dequeue(), Some(7));
    /// ```
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity);
        }

        let slots = (0..capacity as u64)
            .map(|i| Slot {
                stamp: AtomicU64::new(i),
                value: AtomicU64::new(0),
            })
            .collect();

        Ok(Self {
            read: CachePadded::new(AtomicU64::new(0)),
            write: CachePadded::new(AtomicU64::new(0)),
            slots,
            capacity: capacity as u64,
        })
    }

    /// Attempts to append `value`.
    ///
    /// Returns `false` only when the ring is full, which is a real capacity
    /// condition rather than a lost race: losing the CAS to another producer
    /// re-runs the full check.
    pub fn try_enqueue(&self, value: u64) -> bool {
        let mut write = self.write.load(Ordering::Acquire);
        loop {
            let read = self.read.load(Ordering::Acquire);
            if read > write {
                // Consumers overtook our snapshot of `write`.
                write = self.write.load(Ordering::Acquire);
                continue;
            }
            if write - read >= self.capacity {
                return false;
            }

            match self.write.compare_exchange_weak(
                write,
                write + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.commit(write, value);
                    return true;
                }
                Err(current) => write = current,
            }
        }
    }

    /// Attempts to remove the oldest value.
    ///
    /// Returns `None` when the ring was empty at the time of the check.
    pub fn try_dequeue(&self) -> Option<u64> {
        let mut read = self.read.load(Ordering::Acquire);
        loop {
            let write = self.write.load(Ordering::Acquire);
            if read >= write {
                return None;
            }

            match self.read.compare_exchange_weak(
                read,
                read + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Some(self.take(read)),
                Err(current) => read = current,
            }
        }
    }

    /// Writes `value` into the slot reserved by `ticket` and publishes it.
    ///
    /// The slot may still be held by the consumer of the previous lap, which
    /// has already advanced `read` but not yet released the slot.
    #[inline]
    fn commit(&self, ticket: u64, value: u64) {
        let slot = self.slot(ticket);
        Self::wait_for(&slot.stamp, ticket);
        slot.value.store(value, Ordering::Relaxed);
        slot.stamp.store(ticket + 1, Ordering::Release);
    }

    /// Reads the value for the reserved `ticket` and hands the slot to the
    /// producer of the next lap.
    #[inline]
    fn take(&self, ticket: u64) -> u64 {
        let slot = self.slot(ticket);
        Self::wait_for(&slot.stamp, ticket + 1);
        let value = slot.value.load(Ordering::Relaxed);
        slot.stamp.store(ticket + self.capacity, Ordering::Release);
        value
    }

    #[inline]
    fn slot(&self, ticket: u64) -> &Slot {
        &self.slots[(ticket % self.capacity) as usize]
    }

    /// Waits until the peer holding the neighbouring ticket has finished with
    /// the slot. The peer only has a couple of stores left to do, so this
    /// spins briefly and then yields.
    #[inline]
    fn wait_for(stamp: &AtomicU64, expected: u64) {
        let backoff = Backoff::new();
        while stamp.load(Ordering::Acquire) != expected {
            backoff.snooze();
        }
    }

    /// Returns the fixed number of slots.
    pub const fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Returns a best-effort snapshot of the number of buffered values.
    ///
    /// Only suitable as a trigger for background work; the reservation
    /// protocol is the sole authority on what can be taken.
    pub fn len(&self) -> u64 {
        // Load `read` first: `write` can only have grown since, which keeps
        // the difference non-negative.
        let read = self.read.load(Ordering::Acquire);
        let write = self.write.load(Ordering::Acquire);
        (write - read).min(self.capacity)
    }

    /// Best-effort check for `write - read >= capacity`.
    pub fn is_full(&self) -> bool {
        self.len() >= self.capacity
    }

    /// Best-effort check for `write == read`.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of dequeue reservations granted since creation.
    pub fn read_count(&self) -> u64 {
        self.read.load(Ordering::Acquire)
    }

    /// Total number of enqueue reservations granted since creation.
    pub fn write_count(&self) -> u64 {
        self.write.load(Ordering::Acquire)
    }
}

impl core::fmt::Debug for RingBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.capacity)
            .field("read", &self.read_count())
            .field("write", &self.write_count())
            .finish()
    }
}
