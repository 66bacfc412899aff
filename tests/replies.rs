//! The blocking-reply protocol: no-reply detection, deadlines, late replies,
//! panic isolation, and the dedicated reply pool.

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::unbounded;

use reaction_soup::{
    when, when_sync, Emitter, EmitError, FixedThreadPool, JoinDefinition, SyncEmitter,
};

fn pool(threads: usize) -> Arc<FixedThreadPool> {
    Arc::new(FixedThreadPool::new(threads).unwrap())
}

#[test]
fn body_that_never_replies_surfaces_no_reply() {
    let f = SyncEmitter::<(), ()>::named("f");
    let c = Emitter::<i64>::named("c");

    let c_next = c.clone();
    let _jd = JoinDefinition::activate(
        pool(2),
        vec![when_sync(&f).and(&c).then_do(move |(_, _reply), n| {
            // The reply handle is dropped unfulfilled when the body returns.
            c_next.emit(n + 1).unwrap();
        })],
    )
    .unwrap();

    c.emit(0).unwrap();
    assert_eq!(Err(EmitError::NoReply), f.emit(()));

    // The reaction itself still ran to completion.
    assert!(common::wait_until(Duration::from_secs(5), || {
        c.current_contents().unwrap().contains("c: [1]")
    }));
}

#[test]
fn zero_deadline_with_no_match_times_out_promptly() {
    let gate = Emitter::<()>::named("gate");
    let ask = SyncEmitter::<(), i64>::named("ask");

    let _jd = JoinDefinition::activate(
        pool(1),
        vec![when(&gate).and_sync(&ask).then_do(|_, (_, reply)| {
            reply.reply(1);
        })],
    )
    .unwrap();

    // No gate molecule: the ask can never fire before the deadline.
    assert_eq!(
        Err(EmitError::Timeout),
        ask.emit_timeout((), Duration::ZERO)
    );
}

#[test]
fn late_reply_after_timeout_is_discarded() {
    let slow = SyncEmitter::<(), i64>::named("slow");

    let _jd = JoinDefinition::activate(
        pool(1),
        vec![when_sync(&slow).then_do(|(_, reply)| {
            thread::sleep(Duration::from_millis(100));
            reply.reply(7);
        })],
    )
    .unwrap();

    // The reaction fires immediately, but the deadline expires first; the
    // consumption stands and the eventual reply goes nowhere.
    assert_eq!(
        Err(EmitError::Timeout),
        slow.emit_timeout((), Duration::from_millis(5))
    );

    // A later emission rendezvouses with a fresh firing as usual.
    assert_eq!(Ok(7), slow.emit(()));
}

#[test]
fn panicking_body_yields_no_reply_and_runtime_survives() {
    let boom = SyncEmitter::<(), i64>::named("boom");

    let _jd = JoinDefinition::activate(
        pool(1),
        vec![when_sync(&boom).then_do(|(_, _reply)| {
            panic!("reaction body failure");
        })],
    )
    .unwrap();

    assert_eq!(Err(EmitError::NoReply), boom.emit(()));
    // The runtime and its worker are still alive for the next firing.
    assert_eq!(Err(EmitError::NoReply), boom.emit(()));
}

#[test]
fn reply_pool_keeps_blocking_reactions_runnable() {
    let trigger = Emitter::<()>::named("trigger");
    let g = SyncEmitter::<(), i64>::named("g");
    let (seen_tx, seen_rx) = unbounded();

    let g_inner = g.clone();
    let _jd = JoinDefinition::activate_with_reply_pool(
        // One worker for bodies: the trigger body occupies it entirely while
        // blocked, so g's reaction must run on the reply pool to unblock it.
        pool(1),
        pool(1),
        vec![
            when(&trigger).then_do(move |_| {
                let value = g_inner.emit(()).unwrap();
                seen_tx.send(value).unwrap();
            }),
            when_sync(&g).then_do(|(_, reply)| {
                reply.reply(5);
            }),
        ],
    )
    .unwrap();

    trigger.emit(()).unwrap();
    assert_eq!(Ok(5), seen_rx.recv_timeout(Duration::from_secs(5)));
}

#[test]
fn join_definitions_can_be_activated_inside_reaction_bodies() {
    let start = Emitter::<i64>::named("start");
    let (seen_tx, seen_rx) = unbounded();

    let workers = pool(2);
    let inner_pool = workers.clone();
    let _outer = JoinDefinition::activate(
        workers.clone(),
        vec![when(&start).then_do(move |seed| {
            let inner = Emitter::<i64>::named("inner");
            let seen_tx = seen_tx.clone();
            let _inner_jd = JoinDefinition::activate(
                inner_pool.clone(),
                vec![when(&inner).then_do(move |v| {
                    seen_tx.send(v).unwrap();
                })],
            )
            .unwrap();
            inner.emit(seed * 2).unwrap();
        })],
    )
    .unwrap();

    start.emit(21).unwrap();
    assert_eq!(Ok(42), seen_rx.recv_timeout(Duration::from_secs(5)));
}
