//! A blocking fetch that only matches once a long chain of decrements has
//! driven the counter molecule to zero.

mod common;

use std::sync::Arc;
use std::time::Duration;

use reaction_soup::{when, when_eq, Emitter, FixedThreadPool, JoinDefinition, SyncEmitter};

#[test]
fn fetch_blocks_until_counter_reaches_zero() {
    let counter = Emitter::<i64>::named("counter");
    let decr = Emitter::<()>::named("decr");
    let fetch = SyncEmitter::<(), ()>::named("fetch");

    let counter_down = counter.clone();
    let counter_zero = counter.clone();

    let pool = Arc::new(FixedThreadPool::new(2).unwrap());
    let _cell = JoinDefinition::activate(
        pool,
        vec![
            when(&counter)
                .and_ignore(&decr)
                .emits(&[&counter])
                .then_do(move |n, _| {
                    counter_down.emit(n - 1).unwrap();
                }),
            when_eq(&counter, 0)
                .and_sync(&fetch)
                .emits(&[&counter])
                .then_do(move |_, (_, reply)| {
                    reply.reply(());
                    counter_zero.emit(0).unwrap();
                }),
        ],
    )
    .unwrap();

    counter.emit(10_000).unwrap();
    for _ in 0..10_000 {
        decr.emit(()).unwrap();
    }

    // Suspends until the decrement chain has fully run down.
    fetch.emit(()).unwrap();

    assert!(common::wait_until(Duration::from_secs(5), || {
        let contents = counter.current_contents().unwrap();
        contents.contains("counter: [0]")
            && contents.contains("decr: []")
            && contents.contains("fetch: []")
    }));
}
