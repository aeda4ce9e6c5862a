//! Stress tests: many writers churning retirements while readers pin.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use grace::Domain;

#[test]
fn retirement_churn() {
    const WRITERS: usize = 4;
    const READERS: usize = 4;
    const RETIRES_PER_WRITER: usize = 10_000;

    let domain = Arc::new(Domain::new());
    let disposed = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicBool::new(false));
    let mut handles = vec![];

    let start = Instant::now();

    for _ in 0..WRITERS {
        let domain = domain.clone();
        let disposed = disposed.clone();
        handles.push(thread::spawn(move || {
            for i in 0..RETIRES_PER_WRITER {
                let counter = disposed.clone();
                let ptr = Box::into_raw(Box::new(i));
                // SAFETY: ptr came from Box::into_raw and is not used again.
                unsafe {
                    domain.retire_with(ptr, move |p| {
                        drop(unsafe { Box::from_raw(p) });
                        counter.fetch_add(1, Ordering::Relaxed);
                    });
                }
            }
        }));
    }

    let mut readers = vec![];
    for _ in 0..READERS {
        let domain = domain.clone();
        let done = done.clone();
        readers.push(thread::spawn(move || {
            let mut sections = 0usize;
            while !done.load(Ordering::Acquire) {
                let outer = domain.pin();
                let inner = domain.pin();
                drop(inner);
                drop(outer);
                sections += 1;
                if sections % 64 == 0 {
                    thread::yield_now();
                }
            }
            sections
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
    done.store(true, Ordering::Release);
    let mut total_sections = 0usize;
    for reader in readers {
        total_sections += reader.join().unwrap();
    }

    domain.synchronize();
    let elapsed = start.elapsed();

    assert_eq!(disposed.load(Ordering::Acquire), WRITERS * RETIRES_PER_WRITER);
    assert_eq!(domain.pending(), 0);
    assert_eq!(domain.active_readers(), 0);

    println!(
        "retirement churn: {} retirements, {} reader sections in {:?}",
        WRITERS * RETIRES_PER_WRITER,
        total_sections,
        elapsed
    );
}

#[test]
fn pin_storm() {
    const THREADS: usize = 8;
    const SECTIONS: usize = 50_000;

    let domain = Arc::new(Domain::new());
    let start = Instant::now();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let domain = domain.clone();
            thread::spawn(move || {
                for i in 0..SECTIONS {
                    let guard = domain.pin();
                    if i % 7 == 0 {
                        let _nested = domain.pin();
                    }
                    drop(guard);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(domain.active_readers(), 0);
    println!(
        "pin storm: {} sections in {:?}",
        THREADS * SECTIONS,
        start.elapsed()
    );
}
