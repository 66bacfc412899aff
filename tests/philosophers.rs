//! Five dining philosophers: fork molecules are tokens, and because a firing
//! consumes a philosopher's hunger and both forks atomically, two neighbors
//! can never hold a shared fork at the same time.

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use reaction_soup::{when_ignore, Emitter, FixedThreadPool, JoinDefinition};

const SEATS: usize = 5;
const MEALS: usize = 50;

#[test]
fn shared_forks_are_mutually_exclusive() {
    let hungry: Vec<_> = (0..SEATS)
        .map(|i| Emitter::<()>::named(format!("hungry-{i}")))
        .collect();
    let forks: Vec<_> = (0..SEATS)
        .map(|i| Emitter::<()>::named(format!("fork-{i}")))
        .collect();
    let thinking: Vec<_> = (0..SEATS)
        .map(|i| Emitter::<()>::named(format!("thinking-{i}")))
        .collect();

    let fork_in_use: Arc<Vec<AtomicBool>> =
        Arc::new((0..SEATS).map(|_| AtomicBool::new(false)).collect());
    let violations = Arc::new(AtomicUsize::new(0));
    let meals = Arc::new(AtomicUsize::new(0));

    let mut reactions = Vec::new();
    for i in 0..SEATS {
        let left = i;
        let right = (i + 1) % SEATS;

        // hungry(i) + fork(left) + fork(right) -> eat, then put it all back.
        let fork_in_use = fork_in_use.clone();
        let violations = violations.clone();
        let meals = meals.clone();
        let think_again = thinking[i].clone();
        let left_back = forks[left].clone();
        let right_back = forks[right].clone();
        reactions.push(
            when_ignore(&hungry[i])
                .and_ignore(&forks[left])
                .and_ignore(&forks[right])
                .then_do(move |_, _, _| {
                    if fork_in_use[left].swap(true, Ordering::SeqCst) {
                        violations.fetch_add(1, Ordering::SeqCst);
                    }
                    if fork_in_use[right].swap(true, Ordering::SeqCst) {
                        violations.fetch_add(1, Ordering::SeqCst);
                    }

                    // Hold the forks for a moment to widen any race window.
                    thread::sleep(Duration::from_micros(200));

                    fork_in_use[left].store(false, Ordering::SeqCst);
                    fork_in_use[right].store(false, Ordering::SeqCst);
                    meals.fetch_add(1, Ordering::SeqCst);

                    left_back.emit(()).unwrap();
                    right_back.emit(()).unwrap();
                    think_again.emit(()).unwrap();
                }),
        );

        // thinking(i) -> hungry(i)
        let go_hungry = hungry[i].clone();
        reactions.push(when_ignore(&thinking[i]).then_do(move |_| {
            go_hungry.emit(()).unwrap();
        }));
    }

    let pool = Arc::new(FixedThreadPool::new(4).unwrap());
    let _table = JoinDefinition::activate(pool, reactions).unwrap();

    for fork in &forks {
        fork.emit(()).unwrap();
    }
    for seat in &thinking {
        seat.emit(()).unwrap();
    }

    assert!(
        common::wait_until(Duration::from_secs(30), || {
            meals.load(Ordering::SeqCst) >= MEALS
        }),
        "only {} meals eaten",
        meals.load(Ordering::SeqCst)
    );
    assert_eq!(0, violations.load(Ordering::SeqCst));
}
