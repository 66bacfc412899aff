//! Map/reduce over carrier molecules: square 1..=100 into an accumulator
//! molecule and fetch the total once all hundred results are folded in.

mod common;

use std::sync::Arc;
use std::time::Duration;

use reaction_soup::{when, when_where, Emitter, FixedThreadPool, JoinDefinition, SyncEmitter};

#[test]
fn sum_of_squares_via_accumulator_molecule() {
    let data = Emitter::<i64>::named("data");
    let accum = Emitter::<(i64, i64)>::named("accum");
    let fetch = SyncEmitter::<(), i64>::named("fetch");

    let accum_next = accum.clone();
    let accum_back = accum.clone();

    let pool = Arc::new(FixedThreadPool::new(4).unwrap());
    let _jd = JoinDefinition::activate(
        pool,
        vec![
            // data(x) + accum((n, sum)) -> accum((n + 1, sum + x^2))
            when(&data)
                .and(&accum)
                .emits(&[&accum])
                .then_do(move |x, (n, sum)| {
                    accum_next.emit((n + 1, sum + x * x)).unwrap();
                }),
            // accum((100, sum)) + fetch(_, reply) -> reply sum, keep accum
            when_where(&accum, |(n, _)| *n == 100)
                .and_sync(&fetch)
                .emits(&[&accum])
                .then_do(move |(n, sum), (_, reply)| {
                    reply.reply(sum);
                    accum_back.emit((n, sum)).unwrap();
                }),
        ],
    )
    .unwrap();

    accum.emit((0, 0)).unwrap();
    for x in 1..=100 {
        data.emit(x).unwrap();
    }

    assert_eq!(338_350, fetch.emit(()).unwrap());

    assert!(common::wait_until(Duration::from_secs(5), || {
        accum
            .current_contents()
            .unwrap()
            .contains("accum: [(100, 338350)]")
    }));
}
