//! Minimal pin/retire/synchronize walkthrough on the default domain.

use std::sync::atomic::{AtomicPtr, Ordering};

fn main() {
    let shared = AtomicPtr::new(Box::into_raw(Box::new(String::from("first"))));

    // Reader: traverse under a critical-section guard.
    {
        let _guard = grace::pin();
        let value = unsafe { &*shared.load(Ordering::Acquire) };
        println!("reader sees: {value}");
    }

    // Writer: publish a replacement, hand the old version to the domain.
    let old = shared.swap(
        Box::into_raw(Box::new(String::from("second"))),
        Ordering::AcqRel,
    );
    // SAFETY: `old` came from Box::into_raw and is no longer reachable.
    unsafe { grace::retire(old) };

    {
        let _guard = grace::pin();
        let value = unsafe { &*shared.load(Ordering::Acquire) };
        println!("reader sees: {value}");
    }

    // Wait for every retirement to be disposed.
    grace::synchronize();
    println!("old version disposed");

    // SAFETY: final owner; nothing reads `shared` after this.
    unsafe { grace::retire(shared.load(Ordering::Relaxed)) };
    grace::synchronize();
}
