//! Grace: user-space RCU reclamation over a ring of generations.
//!
//! Readers enter short critical sections with nothing but a thread-local
//! bookkeeping update and one shard-counter increment; writers publish new
//! versions of their data and hand the old versions to a [`Domain`], which
//! defers disposal until every reader that could still observe them has left.
//!
//! # How it works
//!
//! A domain owns a small ring of *generations*, each holding a bank of
//! sharded reader counters and a bucket of retired `(pointer, deleter)`
//! pairs. The outermost [`Domain::enter`] on a thread counts the reader into
//! the current generation; retirement appends into the current generation's
//! bucket. The ring only advances into a generation whose counters have all
//! drained to zero, and a generation's bucket is only cleared a full ring lap
//! after its tenants were retired — by which point every reader that could
//! have observed them is gone.
//!
//! # Example
//!
//! ```
//! use std::sync::atomic::{AtomicPtr, Ordering};
//!
//! let domain = grace::Domain::new();
//! let shared = AtomicPtr::new(Box::into_raw(Box::new(41u64)));
//!
//! // Reader: traverse under a guard.
//! {
//!     let _guard = domain.pin();
//!     let value = unsafe { &*shared.load(Ordering::Acquire) };
//!     assert_eq!(*value, 41);
//! }
//!
//! // Writer: publish a replacement, retire the old version.
//! let old = shared.swap(Box::into_raw(Box::new(42u64)), Ordering::AcqRel);
//! // SAFETY: `old` came from Box::into_raw and is no longer reachable.
//! unsafe { domain.retire(old) };
//!
//! domain.synchronize(); // old version disposed here at the latest
//! # unsafe { domain.retire(shared.load(Ordering::Relaxed)) };
//! # domain.synchronize();
//! ```

#![warn(missing_docs)]

mod deleter;
mod domain;
mod generation;
mod lock;
mod reader;

pub use deleter::Deleter;
pub use domain::{barrier, default_domain, pin, retire, retire_with, synchronize, Domain};
pub use reader::Guard;
