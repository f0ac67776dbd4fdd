//! Lock-free single-producer/single-consumer ring buffer.
//!
//! Capacity is a power of two `N`; one slot stays empty to distinguish
//! full from empty, so usable capacity is `N - 1`. The producer owns
//! `tail`, the consumer owns `head`; each side stores its own index with
//! release ordering and loads the peer's with acquire ordering, which is
//! exactly the handoff that makes a written element visible before its
//! slot becomes poppable.
//!
//! The queue is split at construction into a [`Producer`] and a
//! [`Consumer`] handle. Neither is `Clone`, so the single-producer/
//! single-consumer discipline holds by construction rather than by
//! convention.
//!
//! Element types must be `Copy`: transport is a byte copy and no
//! destructor ever runs on a queue slot.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::utils::CachePadded;

struct Inner<T> {
    buf: Box<[UnsafeCell<MaybeUninit<T>>]>,
    mask: usize,
    /// Consumer index. On its own cache line to prevent false sharing
    /// with `tail`.
    head: CachePadded<AtomicUsize>,
    /// Producer index.
    tail: CachePadded<AtomicUsize>,
}

// SAFETY: the producer writes a slot strictly before publishing it with a
// release store of `tail`, and the consumer reads it only after an acquire
// load observes that store (and vice versa for slot reuse via `head`).
// Each slot is therefore accessed by at most one thread at a time.
unsafe impl<T: Send> Send for Inner<T> {}
unsafe impl<T: Send> Sync for Inner<T> {}

/// Create a SPSC ring with the given power-of-two capacity.
///
/// Usable capacity is `capacity - 1`.
///
/// # Panics
///
/// Panics if `capacity` is not a power of two or is less than 2.
pub fn spsc_ring<T: Copy>(capacity: usize) -> (Producer<T>, Consumer<T>) {
    assert!(
        capacity.is_power_of_two() && capacity >= 2,
        "SPSC capacity must be a power of two >= 2, got {capacity}"
    );

    let mut buf = Vec::with_capacity(capacity);
    for _ in 0..capacity {
        buf.push(UnsafeCell::new(MaybeUninit::uninit()));
    }

    let inner = Arc::new(Inner {
        buf: buf.into_boxed_slice(),
        mask: capacity - 1,
        head: CachePadded::new(AtomicUsize::new(0)),
        tail: CachePadded::new(AtomicUsize::new(0)),
    });

    (
        Producer {
            inner: Arc::clone(&inner),
        },
        Consumer { inner },
    )
}

/// Producing half of a SPSC ring. `Send`, not `Clone`.
pub struct Producer<T: Copy> {
    inner: Arc<Inner<T>>,
}

/// Consuming half of a SPSC ring. `Send`, not `Clone`.
pub struct Consumer<T: Copy> {
    inner: Arc<Inner<T>>,
}

impl<T: Copy> Producer<T> {
    /// Attempt to push an item. Returns `false` iff the ring is full.
    ///
    /// Never blocks, never allocates.
    #[inline]
    pub fn try_push(&mut self, item: T) -> bool {
        let inner = &*self.inner;
        let tail = inner.tail.load(Ordering::Relaxed);
        let next = (tail + 1) & inner.mask;
        if next == inner.head.load(Ordering::Acquire) {
            return false;
        }
        // SAFETY: `tail` is owned by this (unique) producer and the slot
        // at `tail` is outside the consumer's visible range until the
        // release store below.
        unsafe {
            (*inner.buf[tail].get()).write(item);
        }
        inner.tail.store(next, Ordering::Release);
        true
    }

    /// Approximate number of items currently queued.
    #[inline]
    pub fn len(&self) -> usize {
        len(&self.inner)
    }

    /// Returns `true` if the ring appears empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Usable capacity (one less than the ring size).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.mask
    }
}

impl<T: Copy> Consumer<T> {
    /// Attempt to pop an item. Returns `None` iff the ring is empty.
    ///
    /// Never blocks, never allocates.
    #[inline]
    pub fn try_pop(&mut self) -> Option<T> {
        let inner = &*self.inner;
        let head = inner.head.load(Ordering::Relaxed);
        if head == inner.tail.load(Ordering::Acquire) {
            return None;
        }
        // SAFETY: the acquire load above observed the producer's release
        // store for this slot, so the element is fully written; `head` is
        // owned by this (unique) consumer. T: Copy, so reading out does
        // not require any drop bookkeeping.
        let item = unsafe { (*inner.buf[head].get()).assume_init_read() };
        inner.head.store((head + 1) & inner.mask, Ordering::Release);
        Some(item)
    }

    /// Approximate number of items currently queued.
    #[inline]
    pub fn len(&self) -> usize {
        len(&self.inner)
    }

    /// Returns `true` if the ring appears empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Usable capacity (one less than the ring size).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.inner.mask
    }
}

#[inline]
fn len<T>(inner: &Inner<T>) -> usize {
    let tail = inner.tail.load(Ordering::Acquire);
    let head = inner.head.load(Ordering::Acquire);
    tail.wrapping_sub(head) & inner.mask
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_push_pop_single() {
        let (mut tx, mut rx) = spsc_ring::<u64>(8);
        assert!(tx.try_push(42));
        assert_eq!(rx.try_pop(), Some(42));
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn test_empty_pop_returns_none() {
        let (_tx, mut rx) = spsc_ring::<u64>(8);
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn test_usable_capacity_is_n_minus_one() {
        let (mut tx, rx) = spsc_ring::<u64>(8);
        assert_eq!(tx.capacity(), 7);
        assert_eq!(rx.capacity(), 7);
        for i in 0..7 {
            assert!(tx.try_push(i), "push {i} should succeed");
        }
        assert!(!tx.try_push(7), "8th push must report full");
    }

    #[test]
    fn test_fifo_order() {
        let (mut tx, mut rx) = spsc_ring::<u64>(16);
        for i in 0..10 {
            assert!(tx.try_push(i));
        }
        for i in 0..10 {
            assert_eq!(rx.try_pop(), Some(i));
        }
    }

    #[test]
    fn test_wraparound() {
        let (mut tx, mut rx) = spsc_ring::<u64>(4);
        // Capacity 3; cycle enough to wrap the indices several times.
        for round in 0..50u64 {
            assert!(tx.try_push(round * 2));
            assert!(tx.try_push(round * 2 + 1));
            assert_eq!(rx.try_pop(), Some(round * 2));
            assert_eq!(rx.try_pop(), Some(round * 2 + 1));
        }
        assert_eq!(rx.try_pop(), None);
    }

    #[test]
    fn test_len_tracks_occupancy() {
        let (mut tx, mut rx) = spsc_ring::<u64>(8);
        assert!(tx.is_empty());
        tx.try_push(1);
        tx.try_push(2);
        assert_eq!(tx.len(), 2);
        assert_eq!(rx.len(), 2);
        rx.try_pop();
        assert_eq!(rx.len(), 1);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn test_non_power_of_two_capacity_panics() {
        let _ = spsc_ring::<u64>(10);
    }

    #[test]
    fn test_handles_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<Producer<u64>>();
        assert_send::<Consumer<u64>>();
    }

    /// Stress: producer pushes 1..=1_000_000, consumer pops until the
    /// count is reached, values strictly increase and the total sum
    /// matches N(N+1)/2.
    #[test]
    fn test_spsc_stress_million() {
        const N: u64 = 1_000_000;
        let (mut tx, mut rx) = spsc_ring::<u64>(1024);

        let producer = thread::spawn(move || {
            for i in 1..=N {
                while !tx.try_push(i) {
                    std::hint::spin_loop();
                }
            }
        });

        let consumer = thread::spawn(move || {
            let mut count = 0u64;
            let mut last = 0u64;
            let mut sum = 0u64;
            while count < N {
                if let Some(v) = rx.try_pop() {
                    assert!(v > last, "values must strictly increase: {v} after {last}");
                    last = v;
                    sum += v;
                    count += 1;
                } else {
                    std::hint::spin_loop();
                }
            }
            sum
        });

        producer.join().unwrap();
        let sum = consumer.join().unwrap();
        assert_eq!(sum, N * (N + 1) / 2);
    }

    /// Writes made before try_push are visible after try_pop (release/
    /// acquire handoff), checked with a composite payload.
    #[test]
    fn test_handoff_visibility() {
        #[derive(Clone, Copy, PartialEq, Debug)]
        struct Payload {
            a: u64,
            b: u64,
        }

        const N: u64 = 100_000;
        let (mut tx, mut rx) = spsc_ring::<Payload>(256);

        let producer = thread::spawn(move || {
            for i in 0..N {
                let p = Payload { a: i, b: !i };
                while !tx.try_push(p) {
                    std::hint::spin_loop();
                }
            }
        });

        let consumer = thread::spawn(move || {
            for i in 0..N {
                let p = loop {
                    if let Some(p) = rx.try_pop() {
                        break p;
                    }
                    std::hint::spin_loop();
                };
                assert_eq!(p, Payload { a: i, b: !i });
            }
        });

        producer.join().unwrap();
        consumer.join().unwrap();
    }
}
