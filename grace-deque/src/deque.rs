//! The RCU deque: fixed-size islands addressed through one atomically
//! published descriptor.
//!
//! Readers snapshot the descriptor inside a critical section and traverse
//! without any lock. Writers serialize through the deque's mutex, build a
//! replacement island-pointer array, publish it with release ordering, and
//! retire the outgoing array to the reclamation domain. The islands
//! themselves are never replaced by publication — only the array ordering
//! them.

use core::ptr;
use core::slice;
use core::sync::atomic::Ordering;
use std::sync::{Mutex, MutexGuard};

use grace::{Domain, Guard};

use crate::descriptor::{AtomicDescriptor, Descriptor, IslandPtr};
use crate::view::View;

/// Elements per island: the unit of physical storage.
pub const ISLAND_SIZE: usize = 256;

/// A fixed-size contiguous block of elements, immutable once published.
pub type Island<T> = [T; ISLAND_SIZE];

/// Copy a sized iterator into freshly allocated islands.
///
/// The tail of the last island is padded with `T::default()`; the logical
/// length returned is the exact item count, and views never traverse the
/// padding.
pub(crate) fn build_islands<T, I>(items: I) -> (Vec<IslandPtr<T>>, usize)
where
    T: Default,
    I: IntoIterator<Item = T>,
    I::IntoIter: ExactSizeIterator,
{
    let mut items = items.into_iter();
    let len = items.len();
    let mut islands = Vec::with_capacity(len.div_ceil(ISLAND_SIZE));
    for _ in 0..len.div_ceil(ISLAND_SIZE) {
        let island: Box<Island<T>> =
            Box::new(core::array::from_fn(|_| items.next().unwrap_or_default()));
        islands.push(Box::into_raw(island) as IslandPtr<T>);
    }
    (islands, len)
}

/// Free every island in `islands`.
///
/// # Safety
///
/// Each pointer must have come from `build_islands` (i.e. `Box::into_raw`)
/// and no reader may still hold a view into any of them.
pub(crate) unsafe fn free_islands<T>(islands: &[IslandPtr<T>]) {
    for &island in islands {
        drop(unsafe { Box::from_raw(island as *mut Island<T>) });
    }
}

/// An ordered sequence of `T` stored in islands, with lock-free reads and
/// atomically published layout changes.
///
/// ```
/// use grace_deque::Deque;
///
/// let deque = Deque::from_range(0usize..1000);
/// let guard = deque.domain().pin();
/// let view = deque.view(&guard);
/// assert_eq!(view.len(), 1000);
/// assert!(view.iter().any(|&x| x == 500));
/// # drop(guard);
/// # deque.domain().synchronize();
/// ```
pub struct Deque<T> {
    write: Mutex<()>,
    descriptor: AtomicDescriptor<T>,
    domain: &'static Domain,
}

// SAFETY: the descriptor is a packed atomic; island contents are immutable
// after publication and the write side is behind the mutex. Readers on other
// threads only ever get `&T`, hence the `Sync` bound on T.
unsafe impl<T: Send + Sync> Send for Deque<T> {}
unsafe impl<T: Send + Sync> Sync for Deque<T> {}

impl<T> Deque<T>
where
    T: Default + Send + Sync + 'static,
{
    /// Build a deque over the default domain from a sized iterator.
    pub fn from_range<I>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        Self::with_domain(items, grace::default_domain())
    }

    /// Build a deque that retires outgoing layouts to `domain`.
    pub fn with_domain<I>(items: I, domain: &'static Domain) -> Self
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let (islands, len) = build_islands(items);
        let descriptor = if len == 0 {
            Descriptor::empty()
        } else {
            Descriptor {
                base: Box::into_raw(islands.into_boxed_slice()) as *const IslandPtr<T>,
                len,
            }
        };
        Self {
            write: Mutex::new(()),
            descriptor: AtomicDescriptor::new(descriptor),
            domain,
        }
    }

    /// The domain outgoing layouts are retired to.
    #[inline]
    pub fn domain(&self) -> &'static Domain {
        self.domain
    }

    /// Element count of the currently published layout.
    #[inline]
    pub fn len(&self) -> usize {
        self.descriptor.load(Ordering::Acquire).len
    }

    /// Whether the currently published layout is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot the published layout for traversal.
    ///
    /// The snapshot borrows the guard: it cannot outlive the reader critical
    /// section that keeps its islands and pointer array alive. The guard
    /// must come from this deque's domain.
    pub fn view<'g>(&self, guard: &'g Guard<'_>) -> View<'g, T> {
        debug_assert!(
            ptr::eq(guard.domain(), self.domain),
            "view guarded by a foreign domain"
        );
        let descriptor = self.descriptor.load(Ordering::Acquire);
        let islands: &[IslandPtr<T>] = if descriptor.base.is_null() {
            &[]
        } else {
            // SAFETY: the guard pins the generation the array's eventual
            // retirement will wait on, so base stays valid for 'g.
            unsafe { slice::from_raw_parts(descriptor.base, descriptor.island_count()) }
        };
        View::new(islands, descriptor.len)
    }

    /// Acquire the writer side. Publication happens through the returned
    /// guard; writers on the same deque serialize here.
    pub fn write_lock(&self) -> WriteGuard<'_, T> {
        WriteGuard {
            deque: self,
            _lock: self.write.lock().unwrap(),
        }
    }
}

impl<T> Drop for Deque<T> {
    fn drop(&mut self) {
        // Callers must synchronize the domain before dropping the deque so
        // no reader still holds a view into this layout; arrays retired by
        // earlier publications are disposed by the domain, not here.
        let descriptor = self.descriptor.load(Ordering::Relaxed);
        if descriptor.base.is_null() {
            return;
        }
        unsafe {
            let array = Box::from_raw(ptr::slice_from_raw_parts_mut(
                descriptor.base as *mut IslandPtr<T>,
                descriptor.island_count(),
            ));
            free_islands(&array);
        }
    }
}

/// Writer access to a [`Deque`], held for the duration of a layout change.
pub struct WriteGuard<'a, T> {
    deque: &'a Deque<T>,
    _lock: MutexGuard<'a, ()>,
}

impl<'a, T> WriteGuard<'a, T>
where
    T: Default + Send + Sync + 'static,
{
    /// Element count of the layout this writer is replacing.
    #[inline]
    pub fn len(&self) -> usize {
        self.deque.len()
    }

    /// Whether the layout this writer is replacing is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.deque.is_empty()
    }

    /// The current island-pointer array.
    ///
    /// Stable while this guard is held: only the holder of the write lock
    /// can retire it.
    pub fn islands(&self) -> &[IslandPtr<T>] {
        let descriptor = self.deque.descriptor.load(Ordering::Acquire);
        if descriptor.base.is_null() {
            &[]
        } else {
            // SAFETY: see above; the write lock keeps this array current.
            unsafe { slice::from_raw_parts(descriptor.base, descriptor.island_count()) }
        }
    }

    /// Atomically publish a new island-pointer array covering `len`
    /// elements, then retire the outgoing array to the domain with a
    /// disposal that frees the array and nothing else.
    ///
    /// Islands referenced by the outgoing array and absent from the new one
    /// are leaked: publication reorders or extends the layout, it does not
    /// shrink it.
    ///
    /// # Panics
    ///
    /// If `islands.len()` does not cover exactly `len` elements.
    pub fn publish(&self, islands: Box<[IslandPtr<T>]>, len: usize) {
        assert_eq!(
            islands.len(),
            len.div_ceil(ISLAND_SIZE),
            "island count does not match element count"
        );
        let old = self.deque.descriptor.load(Ordering::Acquire);
        let base = if islands.is_empty() {
            ptr::null()
        } else {
            Box::into_raw(islands) as *const IslandPtr<T>
        };
        self.deque
            .descriptor
            .store(Descriptor { base, len }, Ordering::Release);

        if !old.base.is_null() {
            let blocks = old.island_count();
            // SAFETY: the outgoing array came from Box::into_raw at its own
            // publication (or construction) and is unreachable to new
            // readers from here on; the disposal frees the array alone —
            // the islands now belong to the published layout.
            unsafe {
                self.deque
                    .domain
                    .retire_with(old.base as *mut IslandPtr<T>, move |base| {
                        // SAFETY: `base` is the array published above, now
                        // unobservable by any reader.
                        drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(base, blocks)) });
                    });
            }
        }
    }
}
