//! Build a deque, traverse it under a guard, republish a shuffled layout.

use grace_deque::{Deque, ISLAND_SIZE};

fn main() {
    let deque = Deque::from_range(0usize..4 * ISLAND_SIZE);

    {
        let guard = deque.domain().pin();
        let view = deque.view(&guard);
        println!("len = {}, first = {}, last = {}", view.len(), view[0], view[view.len() - 1]);
    }

    // Reverse the island order; readers keep seeing a consistent snapshot.
    {
        let writer = deque.write_lock();
        let mut islands: Vec<_> = writer.islands().to_vec();
        islands.reverse();
        writer.publish(islands.into_boxed_slice(), writer.len());
    }

    {
        let guard = deque.domain().pin();
        let view = deque.view(&guard);
        println!("after republish, first = {}", view[0]);
    }

    // The outgoing island-pointer array is disposed here.
    deque.domain().synchronize();
    println!("retired layout reclaimed");
}
