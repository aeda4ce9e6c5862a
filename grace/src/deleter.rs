//! Type-erased disposal actions for retired pointers.
//!
//! A [`Deleter`] owns a caller-supplied action `FnOnce(*mut T)` together with
//! the identity of `T`, erased behind a two-entry dispatch table so the
//! reclamation engine can store and run disposals without knowing any types.
//! Actions that fit in one pointer's worth of aligned bytes are stored inline;
//! larger ones are boxed.

use core::marker::PhantomData;
use core::mem::{self, MaybeUninit};
use core::ptr;

/// Inline storage: one pointer's worth of bytes, aligned as a pointer.
/// Doubles as the heap-pointer slot for out-of-line actions.
type Slot = MaybeUninit<*mut ()>;

/// Whether `D` fits and aligns within the inline slot.
const fn fits_inline<D>() -> bool {
    mem::size_of::<D>() <= mem::size_of::<*mut ()>()
        && mem::align_of::<D>() <= mem::align_of::<*mut ()>()
}

/// Per-(T, D) dispatch table.
///
/// Both entries know statically whether `D` is inline or boxed. `invoke`
/// consumes the action; `dispose` destroys it without running it.
struct Vtable {
    invoke: unsafe fn(&mut Slot, *mut ()),
    dispose: unsafe fn(&mut Slot),
}

fn noop_invoke(_: &mut Slot, _: *mut ()) {}
fn noop_dispose(_: &mut Slot) {}

/// The table every empty deleter binds to.
static EMPTY: Vtable = Vtable {
    invoke: noop_invoke as unsafe fn(&mut Slot, *mut ()),
    dispose: noop_dispose as unsafe fn(&mut Slot),
};

struct VtableFor<T, D>(PhantomData<(fn(*mut T), D)>);

impl<T: 'static, D: FnOnce(*mut T) + Send + 'static> VtableFor<T, D> {
    const VTABLE: Vtable = Vtable {
        invoke: Self::invoke,
        dispose: Self::dispose,
    };

    /// Move the action out of the slot.
    ///
    /// # Safety
    ///
    /// The slot must hold a live action written by `Deleter::new::<T, D>`,
    /// and must not be read again afterwards.
    unsafe fn take(slot: &mut Slot) -> D {
        if fits_inline::<D>() {
            unsafe { slot.as_mut_ptr().cast::<D>().read() }
        } else {
            unsafe { *Box::from_raw(slot.assume_init().cast::<D>()) }
        }
    }

    unsafe fn invoke(slot: &mut Slot, p: *mut ()) {
        let action = unsafe { Self::take(slot) };
        action(p.cast::<T>());
    }

    unsafe fn dispose(slot: &mut Slot) {
        drop(unsafe { Self::take(slot) });
    }
}

/// A type-erased disposal action bound to a pointer type.
///
/// Move-only; moving leaves nothing behind to double-dispose. Dropping a
/// deleter that was never invoked destroys the action without running it —
/// running it is the retirement engine's duty before destruction.
///
/// ```
/// use grace::Deleter;
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// static RAN: AtomicBool = AtomicBool::new(false);
///
/// let mut d = Deleter::new::<u64, _>(|_p| {
///     RAN.store(true, Ordering::Relaxed);
/// });
/// assert!(!d.is_empty());
///
/// let mut x = 7u64;
/// // SAFETY: the action only records that it ran.
/// unsafe { d.invoke((&mut x as *mut u64).cast()) };
/// assert!(RAN.load(Ordering::Relaxed));
/// assert!(d.is_empty());
/// ```
pub struct Deleter {
    slot: Slot,
    vtable: &'static Vtable,
}

// SAFETY: actions are required to be Send at construction; the slot is either
// inline bytes of such an action or a heap pointer owning one.
unsafe impl Send for Deleter {}

impl Deleter {
    /// The empty deleter: invoking and dropping it are no-ops.
    #[inline]
    pub const fn empty() -> Self {
        Self {
            slot: MaybeUninit::uninit(),
            vtable: &EMPTY,
        }
    }

    /// Erase `action` as the disposal for pointers to `T`.
    pub fn new<T, D>(action: D) -> Self
    where
        T: 'static,
        D: FnOnce(*mut T) + Send + 'static,
    {
        let mut slot: Slot = MaybeUninit::uninit();
        if fits_inline::<D>() {
            unsafe { slot.as_mut_ptr().cast::<D>().write(action) };
        } else {
            slot.write(Box::into_raw(Box::new(action)).cast());
        }
        Self {
            slot,
            vtable: &VtableFor::<T, D>::VTABLE,
        }
    }

    /// The canonical disposer for pointers produced by [`Box::into_raw`].
    pub(crate) fn boxed<T: Send + 'static>() -> Self {
        Self::new::<T, _>(|p| {
            // SAFETY: the retirement contract hands us a pointer obtained
            // from Box::into_raw and never touched again after retire.
            drop(unsafe { Box::from_raw(p) });
        })
    }

    /// Apply the action to `p`, consuming it and leaving this deleter empty.
    ///
    /// # Safety
    ///
    /// `p` must be the pointer this deleter was retired with, cast to
    /// `*mut ()`, still valid and not disposed through any other path.
    #[inline]
    pub unsafe fn invoke(&mut self, p: *mut ()) {
        let vtable = mem::replace(&mut self.vtable, &EMPTY);
        unsafe { (vtable.invoke)(&mut self.slot, p) };
    }

    /// Whether this deleter holds no action.
    #[inline]
    pub fn is_empty(&self) -> bool {
        ptr::eq(self.vtable, &EMPTY)
    }
}

impl Default for Deleter {
    fn default() -> Self {
        Self::empty()
    }
}

impl Drop for Deleter {
    fn drop(&mut self) {
        let vtable = mem::replace(&mut self.vtable, &EMPTY);
        unsafe { (vtable.dispose)(&mut self.slot) };
    }
}

impl core::fmt::Debug for Deleter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Deleter")
            .field("empty", &self.is_empty())
            .finish()
    }
}
