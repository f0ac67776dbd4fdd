//! A price level: FIFO queue of resting orders at one price.
//!
//! The queue is an intrusive doubly-linked list threaded through the
//! entries' `prev`/`next` slot indices, so enqueue, dequeue and
//! cancel-in-the-middle are all O(1). `total_quantity` aggregates the
//! residual (unfilled) quantity of every linked entry and `order_count`
//! the list length.

use velo_containers::slab::NIL;
use velo_containers::SlabPool;
use velo_core::types::{Order, Price, Qty};

/// A resting order inside the book: the wire-form [`Order`] plus the
/// intrusive list links. Lives in the slab pool and never crosses a
/// queue.
#[derive(Debug, Clone, Copy)]
pub struct BookEntry {
    /// The order itself.
    pub order: Order,
    /// Previous entry at the same price level, or [`NIL`].
    pub prev: u32,
    /// Next entry at the same price level, or [`NIL`].
    pub next: u32,
}

impl BookEntry {
    /// Wrap an order with unlinked list pointers.
    pub fn new(order: Order) -> Self {
        Self {
            order,
            prev: NIL,
            next: NIL,
        }
    }

    /// Quantity still open.
    #[inline]
    pub fn remaining(&self) -> Qty {
        self.order.remaining()
    }
}

/// FIFO queue of orders resting at a single price.
#[derive(Debug, Clone, Copy)]
pub struct PriceLevel {
    /// The level's price.
    pub price: Price,
    /// Sum of residual quantities over the linked entries.
    pub total_quantity: Qty,
    /// Number of linked entries.
    pub order_count: u32,
    /// Oldest entry (highest time priority), or [`NIL`].
    pub head: u32,
    /// Newest entry, or [`NIL`].
    pub tail: u32,
}

impl PriceLevel {
    /// Create an empty level at `price`.
    pub fn new(price: Price) -> Self {
        Self {
            price,
            total_quantity: 0,
            order_count: 0,
            head: NIL,
            tail: NIL,
        }
    }

    /// Returns `true` if no entries are linked.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == NIL
    }

    /// Oldest entry index, or [`NIL`].
    #[inline]
    pub fn front(&self) -> u32 {
        self.head
    }

    /// Append `idx` at the tail (lowest time priority).
    pub fn push_back(&mut self, pool: &mut SlabPool<BookEntry>, idx: u32) {
        let old_tail = self.tail;
        {
            let entry = pool.get_mut(idx);
            entry.prev = old_tail;
            entry.next = NIL;
        }
        if old_tail == NIL {
            self.head = idx;
        } else {
            pool.get_mut(old_tail).next = idx;
        }
        self.tail = idx;
        self.total_quantity += pool.get(idx).remaining();
        self.order_count += 1;
    }

    /// Unlink `idx` from anywhere in the list in O(1).
    ///
    /// Subtracts the entry's residual from `total_quantity`; fills must be
    /// deducted separately as they happen.
    pub fn unlink(&mut self, pool: &mut SlabPool<BookEntry>, idx: u32) {
        let (prev, next, remaining) = {
            let entry = pool.get(idx);
            (entry.prev, entry.next, entry.remaining())
        };

        if prev == NIL {
            self.head = next;
        } else {
            pool.get_mut(prev).next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            pool.get_mut(next).prev = prev;
        }

        {
            let entry = pool.get_mut(idx);
            entry.prev = NIL;
            entry.next = NIL;
        }

        self.total_quantity = self.total_quantity.saturating_sub(remaining);
        self.order_count -= 1;
    }
}
