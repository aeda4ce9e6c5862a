//! The atomically published deque layout: island array base + element count.
//!
//! Readers must snapshot the pair in one shot, so it is packed into a single
//! 128-bit atomic (pointer in the low word, count in the high word).
//! `portable-atomic` provides the type on platforms without native 16-byte
//! atomics.

use core::marker::PhantomData;
use core::ptr;
use core::sync::atomic::Ordering;

use portable_atomic::AtomicU128;

use crate::deque::{Island, ISLAND_SIZE};

/// Pointer to an immutable island.
pub type IslandPtr<T> = *const Island<T>;

/// One snapshot of a deque's layout.
pub(crate) struct Descriptor<T> {
    /// First element of the island-pointer array; null when the deque is
    /// empty.
    pub(crate) base: *const IslandPtr<T>,
    /// Exact element count, not rounded to an island boundary.
    pub(crate) len: usize,
}

impl<T> Clone for Descriptor<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Descriptor<T> {}

impl<T> Descriptor<T> {
    pub(crate) const fn empty() -> Self {
        Self {
            base: ptr::null(),
            len: 0,
        }
    }

    /// Length of the island-pointer array this descriptor references.
    #[inline]
    pub(crate) fn island_count(&self) -> usize {
        self.len.div_ceil(ISLAND_SIZE)
    }
}

/// A [`Descriptor`] behind one 128-bit atomic.
pub(crate) struct AtomicDescriptor<T> {
    data: AtomicU128,
    _marker: PhantomData<*mut T>,
}

impl<T> AtomicDescriptor<T> {
    pub(crate) fn new(descriptor: Descriptor<T>) -> Self {
        Self {
            data: AtomicU128::new(pack(descriptor)),
            _marker: PhantomData,
        }
    }

    #[inline]
    pub(crate) fn load(&self, order: Ordering) -> Descriptor<T> {
        unpack(self.data.load(order))
    }

    #[inline]
    pub(crate) fn store(&self, descriptor: Descriptor<T>, order: Ordering) {
        self.data.store(pack(descriptor), order);
    }
}

#[inline]
fn pack<T>(descriptor: Descriptor<T>) -> u128 {
    (descriptor.base as usize as u128) | ((descriptor.len as u128) << 64)
}

#[inline]
fn unpack<T>(value: u128) -> Descriptor<T> {
    Descriptor {
        base: value as u64 as usize as *const IslandPtr<T>,
        len: (value >> 64) as u64 as usize,
    }
}
