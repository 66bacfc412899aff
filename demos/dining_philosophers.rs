//! Dining philosophers with fork molecules as tokens.
//!
//! Each philosopher's eating reaction consumes their hunger and both
//! neighboring forks in one atomic firing, so the classic deadlock and the
//! shared-fork race cannot occur by construction.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rand::Rng;

use reaction_soup::{when_ignore, Emitter, Executor, FixedThreadPool, JoinDefinition};

const SEATS: usize = 5;
const MEALS_SERVED: usize = 25;

fn main() {
    pretty_env_logger::init();

    let hungry: Vec<_> = (0..SEATS)
        .map(|i| Emitter::<()>::named(format!("hungry-{i}")))
        .collect();
    let forks: Vec<_> = (0..SEATS)
        .map(|i| Emitter::<()>::named(format!("fork-{i}")))
        .collect();
    let thinking: Vec<_> = (0..SEATS)
        .map(|i| Emitter::<()>::named(format!("thinking-{i}")))
        .collect();

    let meals = Arc::new(AtomicUsize::new(0));

    let mut reactions = Vec::new();
    for i in 0..SEATS {
        let left = i;
        let right = (i + 1) % SEATS;

        // hungry(i) + fork(left) + fork(right) -> eat -> thinking(i) + forks
        let meals = meals.clone();
        let think_again = thinking[i].clone();
        let left_back = forks[left].clone();
        let right_back = forks[right].clone();
        reactions.push(
            when_ignore(&hungry[i])
                .and_ignore(&forks[left])
                .and_ignore(&forks[right])
                .then_do(move |_, _, _| {
                    println!("<Philosopher {i}> Picked up forks {left} and {right}, eating!");
                    thread::sleep(Duration::from_millis(rand::thread_rng().gen_range(1..20)));
                    meals.fetch_add(1, Ordering::SeqCst);
                    println!("<Philosopher {i}> Done eating, putting forks back.");

                    // Emissions may be declined once the table shuts down.
                    let _ = left_back.emit(());
                    let _ = right_back.emit(());
                    let _ = think_again.emit(());
                }),
        );

        // thinking(i) -> hungry(i)
        let go_hungry = hungry[i].clone();
        reactions.push(when_ignore(&thinking[i]).then_do(move |_| {
            println!("<Philosopher {i}> Thinking...");
            thread::sleep(Duration::from_millis(rand::thread_rng().gen_range(1..20)));
            let _ = go_hungry.emit(());
        }));
    }

    let pool = Arc::new(FixedThreadPool::new(SEATS).unwrap());
    let table = JoinDefinition::activate(pool.clone(), reactions).unwrap();

    // Lay the table: all forks down, all philosophers thinking.
    for fork in &forks {
        fork.emit(()).unwrap();
    }
    for seat in &thinking {
        seat.emit(()).unwrap();
    }

    while meals.load(Ordering::SeqCst) < MEALS_SERVED {
        thread::sleep(Duration::from_millis(50));
    }

    println!("{}", table.current_contents());
    println!("<Table> {MEALS_SERVED} meals served, closing.");
    pool.shutdown_now();
}
