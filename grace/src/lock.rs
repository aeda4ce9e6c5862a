//! Test-test-and-set lock for the writer side of a domain.
//!
//! Retirement and synchronization are short critical sections executed by at
//! most a handful of writer threads, so a TTAS spin lock beats a full mutex:
//! the test phase spins on a relaxed load that stays in cache, and only the
//! acquiring swap takes the cache line exclusive.

use core::hint::spin_loop;
use core::sync::atomic::{AtomicBool, Ordering};

/// Spin lock serializing `retire` and `synchronize` on one domain.
///
/// Holds no data: the state it protects lives behind `UnsafeCell` in the
/// generation ring, with the lock as the access contract.
pub(crate) struct WriterLock {
    held: AtomicBool,
}

impl WriterLock {
    pub(crate) const fn new() -> Self {
        Self {
            held: AtomicBool::new(false),
        }
    }

    /// Acquire the lock, spinning until it is free.
    #[inline]
    pub(crate) fn lock(&self) -> WriterGuard<'_> {
        loop {
            // Test phase: spin on a relaxed load (stays in cache)
            while self.held.load(Ordering::Relaxed) {
                spin_loop();
            }
            // Test-and-set phase: attempt to acquire
            if !self.held.swap(true, Ordering::Acquire) {
                return WriterGuard { lock: self };
            }
        }
    }
}

/// RAII guard for [`WriterLock`]. Releases the lock on drop.
pub(crate) struct WriterGuard<'a> {
    lock: &'a WriterLock,
}

impl Drop for WriterGuard<'_> {
    #[inline]
    fn drop(&mut self) {
        self.lock.held.store(false, Ordering::Release);
    }
}
