//! One slot of the domain's ring: a reader-count bank plus a bucket of
//! retired pointers awaiting disposal.
//!
//! Readers only ever touch the shard counters. The bucket side (primary
//! groups, overflow chain, write cursor) is mutated exclusively under the
//! owning domain's writer lock, which is why it sits behind `UnsafeCell`
//! rather than another layer of atomics.

use core::cell::UnsafeCell;
use core::mem;
use core::ptr;
use core::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_utils::{Backoff, CachePadded};

use crate::deleter::Deleter;

/// Generations in the domain's ring. Three is the minimum that leaves a
/// writer a spare slot to advance into while the outgoing one drains.
pub(crate) const GENERATIONS: usize = 4;

/// Shard counters per generation; a reader arrival picks exactly one.
pub(crate) const SHARDS: usize = 4;

/// Retired pairs in one shard's primary group (one cache line's worth).
pub(crate) const GROUP_SIZE: usize = 8;

/// Primary capacity of a generation.
pub(crate) const PRIMARY_CAP: usize = SHARDS * GROUP_SIZE;

/// Pairs per overflow group, matching the primary capacity.
const OVERFLOW_CAP: usize = PRIMARY_CAP;

/// A retired pointer paired with its disposal action.
struct Retired {
    ptr: *mut (),
    deleter: Deleter,
}

impl Retired {
    const fn vacant() -> Self {
        Self {
            ptr: ptr::null_mut(),
            deleter: Deleter::empty(),
        }
    }

    /// Run the disposal and reset the slot to vacant.
    ///
    /// A panicking disposal is contained: clearing must finish for every
    /// slot once a generation has drained.
    fn dispose(&mut self) {
        let mut deleter = mem::replace(&mut self.deleter, Deleter::empty());
        let ptr = mem::replace(&mut self.ptr, ptr::null_mut());
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            // SAFETY: `ptr` was supplied together with this deleter at
            // retirement and has not been disposed through any other path.
            // Vacant slots carry the empty deleter, for which this is a
            // no-op.
            unsafe { deleter.invoke(ptr) };
        }));
        if outcome.is_err() {
            eprintln!("grace: disposal action panicked; object abandoned");
        }
    }
}

/// One shard: the reader counter colocated with its primary slot group.
struct Shard {
    readers: AtomicUsize,
    primary: UnsafeCell<[Retired; GROUP_SIZE]>,
}

impl Shard {
    fn new() -> Self {
        Self {
            readers: AtomicUsize::new(0),
            primary: UnsafeCell::new(core::array::from_fn(|_| Retired::vacant())),
        }
    }
}

/// Writer-side cursor state: where the next retired pair lands.
struct Tail {
    /// Pairs currently held in the primary region.
    size: usize,
    /// Chain of extra groups; the head is the last element.
    overflow: Vec<Box<[Retired; OVERFLOW_CAP]>>,
    /// Pairs in the head overflow group.
    overflow_fill: usize,
}

pub(crate) struct Generation {
    shards: [CachePadded<Shard>; SHARDS],
    tail: UnsafeCell<Tail>,
}

// SAFETY: the shard counters are atomics; everything behind UnsafeCell is
// only accessed by the thread holding the domain's writer lock (or by a
// `&mut self` path with exclusive access).
unsafe impl Send for Generation {}
unsafe impl Sync for Generation {}

impl Generation {
    pub(crate) fn new() -> Self {
        Self {
            shards: core::array::from_fn(|_| CachePadded::new(Shard::new())),
            tail: UnsafeCell::new(Tail {
                size: 0,
                overflow: Vec::new(),
                overflow_fill: 0,
            }),
        }
    }

    /// The reader counter of one shard.
    #[inline]
    pub(crate) fn counter(&self, shard: usize) -> &AtomicUsize {
        &self.shards[shard].readers
    }

    /// Whether every shard counter is zero.
    #[inline]
    pub(crate) fn is_drained(&self) -> bool {
        self.shards
            .iter()
            .all(|shard| shard.readers.load(Ordering::Acquire) == 0)
    }

    /// Spin until every shard counter reaches zero.
    pub(crate) fn wait_drained(&self) {
        for shard in &self.shards {
            let backoff = Backoff::new();
            while shard.readers.load(Ordering::Acquire) != 0 {
                backoff.snooze();
            }
        }
    }

    /// Whether both the primary region and the head overflow group are at
    /// capacity, i.e. the next push would have to open a new overflow group.
    ///
    /// # Safety
    ///
    /// Caller must hold the domain's writer lock.
    pub(crate) unsafe fn is_full(&self) -> bool {
        let tail = unsafe { &*self.tail.get() };
        tail.size == PRIMARY_CAP
            && !tail.overflow.is_empty()
            && tail.overflow_fill == OVERFLOW_CAP
    }

    /// Append a retired pair at the linear write position: the primary region
    /// while capacity remains, then the head overflow group, opening a fresh
    /// group when the head is full.
    ///
    /// # Safety
    ///
    /// Caller must hold the domain's writer lock.
    pub(crate) unsafe fn push(&self, ptr: *mut (), deleter: Deleter) {
        let tail = unsafe { &mut *self.tail.get() };
        if tail.size < PRIMARY_CAP {
            let group = unsafe { &mut *self.shards[tail.size / GROUP_SIZE].primary.get() };
            group[tail.size % GROUP_SIZE] = Retired { ptr, deleter };
            tail.size += 1;
        } else {
            if tail.overflow.is_empty() || tail.overflow_fill == OVERFLOW_CAP {
                tail.overflow
                    .push(Box::new(core::array::from_fn(|_| Retired::vacant())));
                tail.overflow_fill = 0;
            }
            let head = tail.overflow.last_mut().unwrap();
            head[tail.overflow_fill] = Retired { ptr, deleter };
            tail.overflow_fill += 1;
        }
    }

    /// Invoke every held deleter and reset the bucket to empty.
    ///
    /// Does not look at the counter bank: readers that arrived after this
    /// generation became current again only contribute counts, never pairs.
    ///
    /// # Safety
    ///
    /// Caller must hold the domain's writer lock (or have exclusive access),
    /// and every pair held here must have been retired at least one full
    /// ring lap ago or be otherwise unreachable.
    pub(crate) unsafe fn clear(&self) {
        let tail = unsafe { &mut *self.tail.get() };
        let mut remaining = tail.size;
        'primary: for shard in &self.shards {
            let group = unsafe { &mut *shard.primary.get() };
            for slot in group.iter_mut() {
                if remaining == 0 {
                    break 'primary;
                }
                slot.dispose();
                remaining -= 1;
            }
        }
        for group in tail.overflow.iter_mut() {
            for slot in group.iter_mut() {
                slot.dispose();
            }
        }
        tail.overflow.clear();
        tail.size = 0;
        tail.overflow_fill = 0;
    }

    /// Number of retired pairs currently held.
    ///
    /// # Safety
    ///
    /// Caller must hold the domain's writer lock.
    pub(crate) unsafe fn pending(&self) -> usize {
        let tail = unsafe { &*self.tail.get() };
        let full_groups = tail.overflow.len().saturating_sub(1);
        tail.size + full_groups * OVERFLOW_CAP
            + if tail.overflow.is_empty() {
                0
            } else {
                tail.overflow_fill
            }
    }
}

impl Drop for Generation {
    fn drop(&mut self) {
        // A generation must never be torn down under live readers; that is a
        // shutdown-order bug in the caller.
        assert!(
            self.is_drained(),
            "generation dropped while readers are still inside"
        );
        // SAFETY: `&mut self` gives exclusive access.
        unsafe { self.clear() };
    }
}
