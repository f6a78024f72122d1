use crate::{Error, RingBuffer};
use std::collections::HashSet;
use std::sync::{
    Barrier, Mutex,
    atomic::{AtomicBool, Ordering},
};
use std::thread::scope;

fn filled(capacity: usize) -> RingBuffer {
    let ring = RingBuffer::new(capacity).unwrap();
    for i in 0..capacity as u64 {
        assert!(ring.try_enqueue(i + 1));
    }
    ring
}

#[test]
fn zero_capacity_is_rejected() {
    assert_eq!(RingBuffer::new(0).unwrap_err(), Error::InvalidCapacity);
}

#[test]
fn new_ring_is_empty() {
    let ring = RingBuffer::new(4).unwrap();
    assert!(ring.is_empty());
    assert!(!ring.is_full());
    assert_eq!(ring.len(), 0);
    assert_eq!(ring.capacity(), 4);
}

#[test]
fn dequeues_in_fifo_order() {
    let ring = filled(4);
    assert!(ring.is_full());
    assert_eq!(ring.try_dequeue(), Some(1));
    assert_eq!(ring.try_dequeue(), Some(2));
    assert_eq!(ring.try_dequeue(), Some(3));
    assert_eq!(ring.try_dequeue(), Some(4));
    assert!(ring.is_empty());
}

#[test]
fn enqueue_into_full_ring_leaves_counters_unchanged() {
    let ring = filled(4);
    let (read, write) = (ring.read_count(), ring.write_count());

    assert!(!ring.try_enqueue(99));

    assert_eq!(ring.read_count(), read);
    assert_eq!(ring.write_count(), write);
    assert_eq!(ring.len(), 4);
}

#[test]
fn dequeue_from_empty_ring_leaves_counters_unchanged() {
    let ring = RingBuffer::new(4).unwrap();
    assert!(ring.try_enqueue(1));
    assert_eq!(ring.try_dequeue(), Some(1));
    let (read, write) = (ring.read_count(), ring.write_count());

    assert_eq!(ring.try_dequeue(), None);

    assert_eq!(ring.read_count(), read);
    assert_eq!(ring.write_count(), write);
}

#[test]
fn wraps_around_many_laps() {
    let ring = RingBuffer::new(3).unwrap();
    let mut next = 0_u64;
    let mut expected = 0_u64;

    for _ in 0..1_000 {
        while ring.try_enqueue(next) {
            next += 1;
        }
        assert!(ring.is_full());
        assert_eq!(ring.try_dequeue(), Some(expected));
        assert_eq!(ring.try_dequeue(), Some(expected + 1));
        expected += 2;
    }

    assert_eq!(ring.write_count() - ring.read_count(), ring.len());
}

#[test]
fn single_free_slot_race_has_exactly_one_winner() {
    const ROUNDS: usize = 500;

    for _ in 0..ROUNDS {
        let ring = RingBuffer::new(4).unwrap();
        for i in 0..3 {
            assert!(ring.try_enqueue(i));
        }
        let barrier = Barrier::new(2);

        let (a, b) = scope(|s| {
            let a = s.spawn(|| {
                barrier.wait();
                ring.try_enqueue(100)
            });
            let b = s.spawn(|| {
                barrier.wait();
                ring.try_enqueue(200)
            });
            (a.join().unwrap(), b.join().unwrap())
        });

        assert!(a ^ b, "exactly one enqueue must win");
        assert!(ring.is_full());
        assert_eq!(ring.write_count(), 4);
    }
}

#[test]
fn concurrent_producers_and_consumers_deliver_every_value_once() {
    const PRODUCERS: u64 = 4;
    const CONSUMERS: usize = 4;
    const PER_PRODUCER: u64 = 20_000;

    let ring = RingBuffer::new(64).unwrap();
    let seen = Mutex::new(HashSet::with_capacity((PRODUCERS * PER_PRODUCER) as usize));
    let producers_done = AtomicBool::new(false);

    scope(|s| {
        let producers: Vec<_> = (0..PRODUCERS)
            .map(|p| {
                let ring = &ring;
                s.spawn(move || {
                    for i in 0..PER_PRODUCER {
                        let value = p * PER_PRODUCER + i;
                        while !ring.try_enqueue(value) {
                            std::thread::yield_now();
                        }
                    }
                })
            })
            .collect();

        for _ in 0..CONSUMERS {
            s.spawn(|| {
                let mut local = Vec::new();
                loop {
                    match ring.try_dequeue() {
                        Some(value) => local.push(value),
                        None if producers_done.load(Ordering::Acquire) => {
                            if ring.is_empty() {
                                break;
                            }
                        }
                        None => std::thread::yield_now(),
                    }
                }
                let mut seen = seen.lock().unwrap();
                for value in local {
                    assert!(seen.insert(value), "value {value} delivered twice");
                }
            });
        }

        for producer in producers {
            producer.join().unwrap();
        }
        producers_done.store(true, Ordering::Release);
    });

    let seen = seen.into_inner().unwrap();
    assert_eq!(seen.len() as u64, PRODUCERS * PER_PRODUCER);
    assert!(ring.is_empty());
}

#[test]
fn occupancy_never_exceeds_capacity_under_contention() {
    const CAPACITY: u64 = 8;
    const OPS: usize = 50_000;

    let ring = RingBuffer::new(CAPACITY as usize).unwrap();
    let stop = AtomicBool::new(false);

    scope(|s| {
        let observer = s.spawn(|| {
            while !stop.load(Ordering::Acquire) {
                // Each bound is only sound for one load order.
                let read = ring.read_count();
                let write = ring.write_count();
                assert!(write >= read);

                let write = ring.write_count();
                let read = ring.read_count();
                assert!(write.saturating_sub(read) <= CAPACITY);
            }
        });

        let workers: Vec<_> = (0..4)
            .map(|t| {
                let ring = &ring;
                s.spawn(move || {
                    for i in 0..OPS {
                        if (i + t) % 2 == 0 {
                            ring.try_enqueue(i as u64);
                        } else {
                            ring.try_dequeue();
                        }
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().unwrap();
        }
        stop.store(true, Ordering::Release);
        observer.join().unwrap();
    });
}
