//! Shared-lock reference deque.
//!
//! Same island layout and view semantics as [`Deque`](crate::Deque), but
//! every reader goes through a shared lock acquisition instead of an RCU
//! critical section. Exists to validate the RCU variant's observed behavior
//! and as the comparison baseline in benches; nothing is ever retired.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::deque::{build_islands, free_islands};
use crate::descriptor::IslandPtr;
use crate::view::Iter;

struct Layout<T> {
    islands: Vec<IslandPtr<T>>,
    len: usize,
}

impl<T> Drop for Layout<T> {
    fn drop(&mut self) {
        // SAFETY: exclusive access; every pointer came from build_islands.
        unsafe { free_islands(&self.islands) };
    }
}

/// The behavioral reference: an island deque behind a reader-writer lock.
pub struct RwDeque<T> {
    layout: RwLock<Layout<T>>,
}

// SAFETY: the layout is only reached through the RwLock; readers on other
// threads only ever get `&T`.
unsafe impl<T: Send + Sync> Send for RwDeque<T> {}
unsafe impl<T: Send + Sync> Sync for RwDeque<T> {}

impl<T: Default> RwDeque<T> {
    /// Build a deque from a sized iterator.
    pub fn from_range<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let (islands, len) = build_islands(items);
        Self {
            layout: RwLock::new(Layout { islands, len }),
        }
    }

    /// Take the shared lock and snapshot the layout. The view is valid for
    /// as long as the lock is held.
    pub fn read(&self) -> RwView<'_, T> {
        RwView {
            layout: self.layout.read().unwrap(),
        }
    }

    /// Take the exclusive lock for an in-place layout change.
    pub fn write(&self) -> RwWriteGuard<'_, T> {
        RwWriteGuard {
            layout: self.layout.write().unwrap(),
        }
    }
}

/// A snapshot of an [`RwDeque`], holding the shared lock.
pub struct RwView<'a, T> {
    layout: RwLockReadGuard<'a, Layout<T>>,
}

impl<'a, T> RwView<'a, T> {
    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.layout.len
    }

    /// Whether the deque holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layout.len == 0
    }

    /// Random access by linear index.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index < self.layout.len {
            // SAFETY: bounds checked; the shared lock keeps the island
            // array in place and islands are immutable.
            Some(unsafe { crate::view::element(&self.layout.islands, index) })
        } else {
            None
        }
    }

    /// Iterate the snapshot front to back.
    #[inline]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(&self.layout.islands, self.layout.len)
    }
}

/// Writer access to an [`RwDeque`], holding the exclusive lock.
pub struct RwWriteGuard<'a, T> {
    layout: RwLockWriteGuard<'a, Layout<T>>,
}

impl<'a, T> RwWriteGuard<'a, T> {
    /// Element count of the layout being changed.
    #[inline]
    pub fn len(&self) -> usize {
        self.layout.len
    }

    /// Whether the layout being changed is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layout.len == 0
    }

    /// The island-pointer array, mutable in place. Readers are excluded for
    /// as long as this guard lives, so reordering here is safe.
    #[inline]
    pub fn islands_mut(&mut self) -> &mut [IslandPtr<T>] {
        &mut self.layout.islands
    }
}
