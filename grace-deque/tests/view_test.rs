//! Single-threaded layout and view semantics.

use grace::Domain;
use grace_deque::{Deque, RwDeque, ISLAND_SIZE};

fn isolated() -> &'static Domain {
    Box::leak(Box::new(Domain::new()))
}

#[test]
fn roundtrip_in_order() {
    let domain = isolated();
    let deque = Deque::with_domain(0usize..10_000, domain);
    let guard = domain.pin();
    let view = deque.view(&guard);
    assert_eq!(view.len(), 10_000);
    let collected: Vec<usize> = view.iter().copied().collect();
    let expected: Vec<usize> = (0..10_000).collect();
    assert_eq!(collected, expected);
}

#[test]
fn empty_deque_has_empty_view() {
    let domain = isolated();
    let deque: Deque<usize> = Deque::with_domain(Vec::new(), domain);
    assert!(deque.is_empty());
    let guard = domain.pin();
    let view = deque.view(&guard);
    assert_eq!(view.len(), 0);
    assert!(view.iter().next().is_none());
    assert!(view.get(0).is_none());
}

#[test]
fn partial_island_ends_at_exact_count() {
    let domain = isolated();
    // 300 elements spill into a second, partially filled island.
    let deque = Deque::with_domain(0usize..300, domain);
    let guard = domain.pin();
    let view = deque.view(&guard);
    assert_eq!(view.len(), 300);
    assert_eq!(view.iter().count(), 300);
    assert_eq!(view.get(299), Some(&299));
    assert!(view.get(300).is_none());
    assert!(view.get(ISLAND_SIZE * 2 - 1).is_none());
}

#[test]
fn random_access_and_index() {
    let domain = isolated();
    let deque = Deque::with_domain(0usize..1_000, domain);
    let guard = domain.pin();
    let view = deque.view(&guard);
    assert_eq!(view[0], 0);
    assert_eq!(view[ISLAND_SIZE], ISLAND_SIZE);
    assert_eq!(view[999], 999);
    assert_eq!(view.get(1_000), None);
}

#[test]
#[should_panic(expected = "index out of bounds")]
fn index_past_end_panics() {
    let domain = isolated();
    let deque = Deque::with_domain(0usize..10, domain);
    let guard = domain.pin();
    let view = deque.view(&guard);
    let _ = view[10];
}

#[test]
fn double_ended_iteration() {
    let domain = isolated();
    let deque = Deque::with_domain(0usize..600, domain);
    let guard = domain.pin();
    let view = deque.view(&guard);

    let reversed: Vec<usize> = view.iter().rev().copied().collect();
    let expected: Vec<usize> = (0..600).rev().collect();
    assert_eq!(reversed, expected);

    let mut iter = view.iter();
    assert_eq!(iter.next(), Some(&0));
    assert_eq!(iter.next_back(), Some(&599));
    assert_eq!(iter.len(), 598);
    assert_eq!(iter.nth(100), Some(&101));
}

#[test]
fn publish_reversed_islands() {
    let domain = isolated();
    // Two whole islands, so island reordering keeps the view exact.
    let deque = Deque::with_domain(0usize..2 * ISLAND_SIZE, domain);

    {
        let writer = deque.write_lock();
        let mut islands: Vec<_> = writer.islands().to_vec();
        islands.reverse();
        writer.publish(islands.into_boxed_slice(), writer.len());
    }

    let guard = domain.pin();
    let view = deque.view(&guard);
    let collected: Vec<usize> = view.iter().copied().collect();
    let expected: Vec<usize> = (ISLAND_SIZE..2 * ISLAND_SIZE)
        .chain(0..ISLAND_SIZE)
        .collect();
    assert_eq!(collected, expected);

    drop(guard);
    domain.synchronize();
    assert_eq!(domain.pending(), 0);
}

#[test]
fn view_survives_publication_within_section() {
    let domain = isolated();
    let deque = Deque::with_domain(0usize..2 * ISLAND_SIZE, domain);

    let guard = domain.pin();
    let before = deque.view(&guard);
    let first_before = before[0];

    {
        let writer = deque.write_lock();
        let mut islands: Vec<_> = writer.islands().to_vec();
        islands.reverse();
        writer.publish(islands.into_boxed_slice(), writer.len());
    }

    // The old snapshot stays valid and unchanged for the section's lifetime.
    assert_eq!(before[0], first_before);
    // A fresh snapshot in the same section observes the new layout.
    let after = deque.view(&guard);
    assert_eq!(after[0], ISLAND_SIZE);

    drop(guard);
    domain.synchronize();
}

#[test]
fn baseline_matches_rcu_view() {
    let domain = isolated();
    let rcu = Deque::with_domain(0usize..3_000, domain);
    let baseline = RwDeque::from_range(0usize..3_000);

    let guard = domain.pin();
    let rcu_view = rcu.view(&guard);
    let locked_view = baseline.read();

    assert_eq!(rcu_view.len(), locked_view.len());
    for i in 0..rcu_view.len() {
        assert_eq!(rcu_view.get(i), locked_view.get(i));
    }
    let a: Vec<usize> = rcu_view.iter().copied().collect();
    let b: Vec<usize> = locked_view.iter().copied().collect();
    assert_eq!(a, b);
}

#[test]
fn baseline_in_place_reorder() {
    let baseline = RwDeque::from_range(0usize..2 * ISLAND_SIZE);
    {
        let mut writer = baseline.write();
        writer.islands_mut().reverse();
    }
    let view = baseline.read();
    assert_eq!(view.get(0), Some(&ISLAND_SIZE));
    assert_eq!(view.iter().count(), 2 * ISLAND_SIZE);
}
