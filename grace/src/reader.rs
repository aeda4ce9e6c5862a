//! Per-thread reader state and the RAII critical-section guard.
//!
//! Each thread keeps one registry entry per domain it has read from: a shard
//! key drawn once from a global round-robin counter, the reentrancy depth,
//! and the cached pointer to the shard counter the outermost entry
//! incremented. The cached pointer is only dereferenced while depth > 0 and
//! is re-selected from the current generation on every outermost entry.

use core::cell::{Cell, RefCell};
use core::marker::PhantomData;
use core::ptr;
use core::sync::atomic::{AtomicUsize, Ordering};

use crate::domain::Domain;
use crate::generation::SHARDS;

/// Round-robin source of shard keys; each thread draws one per domain.
static NEXT_SHARD: AtomicUsize = AtomicUsize::new(0);

struct Entry {
    domain: u64,
    shard: usize,
    /// Nested critical sections currently open on this thread.
    depth: Cell<usize>,
    /// Counter incremented by the outermost entry; valid while depth > 0.
    counter: Cell<*const AtomicUsize>,
}

std::thread_local! {
    static REGISTRY: RefCell<Vec<Entry>> = const { RefCell::new(Vec::new()) };
}

/// Open a critical section on `domain` for the calling thread.
///
/// Allocation-free except for the very first entry of a (thread, domain)
/// pair, which registers the thread's entry.
pub(crate) fn enter(domain: &Domain) {
    REGISTRY.with(|registry| {
        let mut entries = registry.borrow_mut();
        let index = match entries.iter().position(|e| e.domain == domain.id()) {
            Some(index) => index,
            None => {
                entries.push(Entry {
                    domain: domain.id(),
                    shard: NEXT_SHARD.fetch_add(1, Ordering::Relaxed) % SHARDS,
                    depth: Cell::new(0),
                    counter: Cell::new(ptr::null()),
                });
                entries.len() - 1
            }
        };
        let entry = &entries[index];
        if entry.depth.get() == 0 {
            let counter = domain.reader_counter(entry.shard);
            counter.fetch_add(1, Ordering::Release);
            entry.counter.set(counter);
        }
        entry.depth.set(entry.depth.get() + 1);
    });
}

/// Close the most recent critical section on `domain`.
pub(crate) fn leave(domain: &Domain) {
    // try_with: during thread teardown the registry may already be gone. In
    // that case the counter stays pinned, which stalls synchronize rather
    // than freeing early.
    let _ = REGISTRY.try_with(|registry| {
        let entries = registry.borrow();
        let entry = entries
            .iter()
            .find(|e| e.domain == domain.id())
            .expect("leave without a matching enter");
        let depth = entry.depth.get();
        assert!(depth > 0, "leave without a matching enter");
        entry.depth.set(depth - 1);
        if depth == 1 {
            // SAFETY: set by the matching outermost enter; the domain (and
            // with it the counter) outlives any open critical section.
            let counter = unsafe { &*entry.counter.get() };
            counter.fetch_sub(1, Ordering::Release);
        }
    });
}

/// Reentrancy depth of the calling thread on `domain` (0 when outside).
pub(crate) fn depth(domain: &Domain) -> usize {
    REGISTRY
        .try_with(|registry| {
            registry
                .borrow()
                .iter()
                .find(|e| e.domain == domain.id())
                .map_or(0, |e| e.depth.get())
        })
        .unwrap_or(0)
}

/// RAII guard for a reader critical section.
///
/// While a `Guard` exists, any pointer retired to its domain before the
/// section began remains live. Dropping the guard closes the section on all
/// exit paths. Nested guards on one thread are cheap: only the outermost one
/// touches a shard counter.
#[must_use]
pub struct Guard<'d> {
    domain: &'d Domain,
    // Pins the guard to its thread: the depth and cached counter it will
    // undo on drop live in that thread's registry.
    _not_send: PhantomData<*mut ()>,
}

impl<'d> Guard<'d> {
    pub(crate) fn new(domain: &'d Domain) -> Self {
        enter(domain);
        Self {
            domain,
            _not_send: PhantomData,
        }
    }

    /// The domain this guard holds open.
    #[inline]
    pub fn domain(&self) -> &'d Domain {
        self.domain
    }
}

impl Drop for Guard<'_> {
    #[inline]
    fn drop(&mut self) {
        leave(self.domain);
    }
}
