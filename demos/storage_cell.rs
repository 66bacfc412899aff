//! The classic storage cell: the value lives in a `val` molecule that no
//! thread ever owns, updates race through `put`, and `get`/`swap` are
//! blocking emissions that rendezvous with the current value.

use std::sync::Arc;

use reaction_soup::{when, Emitter, FixedThreadPool, JoinDefinition, SyncEmitter};

fn main() {
    pretty_env_logger::init();

    // The carrier molecule holding the cell's value.
    let val = Emitter::<i32>::named("val");

    // Request molecules: update, read, and atomic swap.
    let put = Emitter::<i32>::named("put");
    let get = SyncEmitter::<(), i32>::named("get");
    let swap = SyncEmitter::<i32, i32>::named("swap");

    let put_val = val.clone();
    let get_val = val.clone();
    let swap_val = val.clone();

    let pool = Arc::new(FixedThreadPool::new(2).unwrap());
    let cell = JoinDefinition::activate(
        pool,
        vec![
            // put(new) + val(_) -> val(new)
            when(&put)
                .and_ignore(&val)
                .emits(&[&val])
                .then_do(move |new, _| {
                    println!(">> put-val fired with new={new}");
                    put_val.emit(new).unwrap();
                }),
            // val(v) + get(_, reply) -> reply v, val(v)
            when(&val)
                .and_sync(&get)
                .emits(&[&val])
                .then_do(move |v, (_, reply)| {
                    println!(">> val-get fired with v={v}");
                    reply.reply(v);
                    get_val.emit(v).unwrap();
                }),
            // val(old) + swap(new, reply) -> reply old, val(new)
            when(&val)
                .and_sync(&swap)
                .emits(&[&val])
                .then_do(move |old, (new, reply)| {
                    println!(">> val-swap fired with old={old} and new={new}");
                    reply.reply(old);
                    swap_val.emit(new).unwrap();
                }),
        ],
    )
    .unwrap();
    cell.set_log_level(1);

    // Initialise the cell, then update it.
    val.emit(1729).unwrap();
    put.emit(42).unwrap();

    // Read the current value; blocks until the updated val molecule exists.
    println!("get() = {}", get.emit(()).unwrap());

    // Atomically replace the value and retrieve the old one.
    println!("swap(16) = {}", swap.emit(16).unwrap());

    println!("get() = {}", get.emit(()).unwrap());

    println!("{}", cell.current_contents());
}
