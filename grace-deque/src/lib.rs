//! An island deque whose layout is published atomically and reclaimed
//! through [`grace`].
//!
//! Elements live in fixed-size immutable *islands* of [`ISLAND_SIZE`]
//! entries. A single 128-bit descriptor — island-pointer array base plus
//! exact element count — defines the current layout. Readers pin the
//! reclamation domain, snapshot the descriptor and traverse with no lock;
//! writers serialize on a mutex, publish a replacement array with release
//! ordering and retire the outgoing one to the domain.
//!
//! [`RwDeque`] is the shared-lock rendition of the same container, kept as
//! the behavioral reference and benchmark baseline.
//!
//! ```
//! use grace_deque::Deque;
//!
//! let deque = Deque::from_range(0usize..10_000);
//!
//! // Reader fast path: pin, snapshot, traverse.
//! let guard = deque.domain().pin();
//! let view = deque.view(&guard);
//! assert!(view.iter().any(|&x| x == 5_000));
//! drop(guard);
//!
//! // Writer: republish the same islands in reverse order.
//! let writer = deque.write_lock();
//! let mut islands: Vec<_> = writer.islands().to_vec();
//! islands.reverse();
//! writer.publish(islands.into_boxed_slice(), writer.len());
//! drop(writer);
//!
//! deque.domain().synchronize(); // outgoing array disposed
//! ```

#![warn(missing_docs)]

mod baseline;
mod deque;
mod descriptor;
mod view;

pub use baseline::{RwDeque, RwView, RwWriteGuard};
pub use deque::{Deque, Island, WriteGuard, ISLAND_SIZE};
pub use descriptor::IslandPtr;
pub use view::{Iter, View};
