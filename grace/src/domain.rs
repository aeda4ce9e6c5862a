//! The reclamation engine: a ring of generations and the operations on it.
//!
//! Implements the retire/advance/clear protocol:
//! - Readers count themselves into the current generation (see `reader`).
//! - `retire` appends into the current generation; when it is full and the
//!   next generation has drained, the ring advances and the generation being
//!   advanced into is cleared (its tenants were retired a full lap ago).
//! - `synchronize` waits for every generation to drain, clearing each.

use core::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use once_cell::race::OnceBox;

use crate::deleter::Deleter;
use crate::generation::{Generation, GENERATIONS};
use crate::lock::WriterLock;
use crate::reader::{self, Guard};

static NEXT_DOMAIN_ID: AtomicU64 = AtomicU64::new(0);

/// An independent reclamation domain.
///
/// A process-wide default exists (see [`default_domain`]); additional domains
/// can be created for test isolation or to partition unrelated containers.
/// Thread-local reader state is keyed by domain identity, so domains never
/// share counters.
///
/// ```
/// let domain = grace::Domain::new();
///
/// let guard = domain.pin();
/// // traverse shared state published through this domain...
/// drop(guard);
///
/// let stale = Box::into_raw(Box::new(42u64));
/// // SAFETY: `stale` came from Box::into_raw and is not used again.
/// unsafe { domain.retire(stale) };
/// domain.synchronize();
/// ```
pub struct Domain {
    id: u64,
    /// Monotonic generation counter; the current ring slot is `% GENERATIONS`.
    current: AtomicUsize,
    generations: [Generation; GENERATIONS],
    writer: WriterLock,
}

impl Domain {
    /// Create a fresh domain with an empty ring.
    pub fn new() -> Self {
        Self {
            id: NEXT_DOMAIN_ID.fetch_add(1, Ordering::Relaxed),
            current: AtomicUsize::new(0),
            generations: core::array::from_fn(|_| Generation::new()),
            writer: WriterLock::new(),
        }
    }

    #[inline]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// The shard counter a reader arriving now should count into.
    #[inline]
    pub(crate) fn reader_counter(&self, shard: usize) -> &AtomicUsize {
        let current = self.current.load(Ordering::Acquire);
        self.generations[current % GENERATIONS].counter(shard)
    }

    /// Open a reader critical section. Reentrant; must be matched by
    /// [`leave`](Self::leave). Prefer [`pin`](Self::pin) which cannot be
    /// left unbalanced.
    #[inline]
    pub fn enter(&self) {
        reader::enter(self);
    }

    /// Close the most recent critical section opened by
    /// [`enter`](Self::enter). Panics if no section is open.
    #[inline]
    pub fn leave(&self) {
        reader::leave(self);
    }

    /// Open a reader critical section, closed when the guard drops.
    #[inline]
    pub fn pin(&self) -> Guard<'_> {
        Guard::new(self)
    }

    /// Retire `ptr` for deferred disposal via `Box::from_raw`.
    ///
    /// # Safety
    ///
    /// - `ptr` must come from [`Box::into_raw`] and must not be accessed
    ///   after this call.
    /// - `ptr` must not be retired more than once.
    pub unsafe fn retire<T: Send + 'static>(&self, ptr: *mut T) {
        unsafe { self.retire_erased(ptr.cast(), Deleter::boxed::<T>()) };
    }

    /// Retire `ptr` with a custom disposal action.
    ///
    /// # Safety
    ///
    /// - `ptr` must remain valid until `dispose` runs, and must not be
    ///   accessed after this call except by `dispose`.
    /// - `ptr` must not be retired more than once.
    pub unsafe fn retire_with<T, D>(&self, ptr: *mut T, dispose: D)
    where
        T: 'static,
        D: FnOnce(*mut T) + Send + 'static,
    {
        unsafe { self.retire_erased(ptr.cast(), Deleter::new::<T, D>(dispose)) };
    }

    /// Retire an already-erased pointer/deleter pair.
    ///
    /// Calling this from inside a reader critical section on the same domain
    /// is a contract violation and panics: the caller would be pinning the
    /// very generation that must eventually drain.
    ///
    /// # Safety
    ///
    /// `ptr` must stay valid until `deleter` runs and must not be retired
    /// more than once.
    pub unsafe fn retire_erased(&self, ptr: *mut (), deleter: Deleter) {
        assert_eq!(
            reader::depth(self),
            0,
            "retire inside a reader critical section"
        );
        let _writer = self.writer.lock();
        let current = self.current.load(Ordering::Acquire);
        let generation = &self.generations[current % GENERATIONS];
        // SAFETY: writer lock held for the whole bucket manipulation.
        unsafe {
            if generation.is_full()
                && self.generations[current.wrapping_add(1) % GENERATIONS].is_drained()
            {
                let next = current.wrapping_add(1);
                self.current.store(next, Ordering::Release);
                let incoming = &self.generations[next % GENERATIONS];
                // Everything held here was retired a full ring lap ago and
                // its readers have long since drained.
                incoming.clear();
                incoming.push(ptr, deleter);
            } else {
                generation.push(ptr, deleter);
            }
        }
    }

    /// Block until every retirement so far has been disposed.
    ///
    /// Spins (yielding) on each generation's counter bank in turn, clearing
    /// each once drained. Idempotent on a quiescent domain. Panics if called
    /// from inside a reader critical section on this domain, which could
    /// never finish.
    pub fn synchronize(&self) {
        assert_eq!(
            reader::depth(self),
            0,
            "synchronize inside a reader critical section"
        );
        let _writer = self.writer.lock();
        for generation in &self.generations {
            generation.wait_drained();
            // SAFETY: writer lock held; no retirement can race this clear.
            unsafe { generation.clear() };
        }
    }

    /// Synonym of [`synchronize`](Self::synchronize).
    #[inline]
    pub fn barrier(&self) {
        self.synchronize();
    }

    /// Number of reader critical sections currently open across all threads
    /// (outermost entries only). Diagnostic; racy by nature.
    pub fn active_readers(&self) -> usize {
        self.generations
            .iter()
            .map(|generation| {
                (0..crate::generation::SHARDS)
                    .map(|shard| generation.counter(shard).load(Ordering::Acquire))
                    .sum::<usize>()
            })
            .sum()
    }

    /// Number of retirements not yet disposed. Diagnostic.
    pub fn pending(&self) -> usize {
        let _writer = self.writer.lock();
        self.generations
            .iter()
            // SAFETY: writer lock held.
            .map(|generation| unsafe { generation.pending() })
            .sum()
    }

    /// The monotonically increasing generation counter. Diagnostic; useful
    /// for observing ring advances.
    #[inline]
    pub fn current_generation(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }
}

impl Default for Domain {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT: OnceBox<Domain> = OnceBox::new();

/// The process-wide default domain, initialized on first use.
#[inline]
pub fn default_domain() -> &'static Domain {
    DEFAULT.get_or_init(|| Box::new(Domain::new()))
}

/// Open a reader critical section on the default domain.
#[inline]
pub fn pin() -> Guard<'static> {
    default_domain().pin()
}

/// Retire `ptr` to the default domain for disposal via `Box::from_raw`.
///
/// # Safety
///
/// Same contract as [`Domain::retire`].
#[inline]
pub unsafe fn retire<T: Send + 'static>(ptr: *mut T) {
    unsafe { default_domain().retire(ptr) };
}

/// Retire `ptr` to the default domain with a custom disposal action.
///
/// # Safety
///
/// Same contract as [`Domain::retire_with`].
#[inline]
pub unsafe fn retire_with<T, D>(ptr: *mut T, dispose: D)
where
    T: 'static,
    D: FnOnce(*mut T) + Send + 'static,
{
    unsafe { default_domain().retire_with(ptr, dispose) };
}

/// Block until every retirement to the default domain has been disposed.
#[inline]
pub fn synchronize() {
    default_domain().synchronize();
}

/// Synonym of [`synchronize`].
#[inline]
pub fn barrier() {
    default_domain().barrier();
}
