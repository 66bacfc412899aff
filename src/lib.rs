//! Crate implementing the chemical-machine flavor of the [Join Calculus](https://www.microsoft.com/en-us/research/wp-content/uploads/2017/01/join-tutorial.pdf)
//! developed by Cédric Fournet and Georges Gonthier: concurrent computation
//! expressed as reactions over a multiset of typed messages ("molecules").
//!
//! A program declares *species* of molecules through emitter handles, then
//! activates a *join definition* — a set of reactions, each consuming one
//! molecule per input site and running an arbitrary body on a thread pool.
//! A reaction fires the moment all of its inputs are simultaneously present;
//! its inputs vanish from the multiset atomically, so reactions that share a
//! species never observe or consume the same molecule twice. Blocking
//! species additionally suspend the emitting thread until the consuming
//! reaction answers through a reply handle.
//!
//! See the example of a concurrent counter written using this crate:
//!
//! ```
//! use std::sync::Arc;
//! use reaction_soup::{when, Emitter, FixedThreadPool, JoinDefinition, SyncEmitter};
//!
//! // Declare the species: the counter state, an increment signal, and a
//! // blocking read that returns the current count.
//! let counter = Emitter::<i64>::named("counter");
//! let incr = Emitter::<()>::named("incr");
//! let read = SyncEmitter::<(), i64>::named("read");
//!
//! // Reaction bodies emit through their own clones of the handles.
//! let counter_up = counter.clone();
//! let counter_back = counter.clone();
//!
//! let pool = Arc::new(FixedThreadPool::new(2).unwrap());
//! let _cell = JoinDefinition::activate(
//!     pool,
//!     vec![
//!         // counter(n) + incr(_) -> counter(n + 1)
//!         when(&counter).and_ignore(&incr).then_do(move |n, _| {
//!             counter_up.emit(n + 1).unwrap();
//!         }),
//!         // counter(n) + read(_, reply) -> reply n, put counter(n) back
//!         when(&counter).and_sync(&read).then_do(move |n, (_, reply)| {
//!             reply.reply(n);
//!             counter_back.emit(n).unwrap();
//!         }),
//!     ],
//! )
//! .unwrap();
//!
//! // Inject the initial state and an increment, then read synchronously.
//! counter.emit(0).unwrap();
//! incr.emit(()).unwrap();
//! assert_eq!(1, read.emit(()).unwrap());
//! ```
//!
//! The `counter` molecule carries the state; because it exists exactly once,
//! the two reactions exclude each other and no lock is ever visible to user
//! code. The blocking `read` suspends its caller until the counter molecule
//! is available again, which is what makes the assertion deterministic even
//! though the bodies run on pool threads.
//!
//! # Matching
//!
//! Each input site of a reaction carries a pattern: bind any value, ignore
//! the value, require structural equality, or apply a pure predicate — see
//! the builder functions in this crate ([`when`], [`when_eq`],
//! [`when_where`], [`when_sync`], ...). Among reactions fireable at the same
//! moment, the engine prefers the one that has not fired for longest and
//! breaks ties randomly; within one species, candidates are tried oldest
//! first. No stronger fairness is guaranteed.
//!
//! # Threading
//!
//! Reaction bodies run on a user-supplied [`Executor`]; the bundled
//! [`FixedThreadPool`] suits most programs. A body that performs a blocking
//! emission parks its worker thread until the reply arrives, so either size
//! the pool beyond the deepest blocking chain or pass a dedicated pool for
//! blocking reactions via [`JoinDefinition::activate_with_reply_pool`].

mod emitter;
mod error;
mod executor;
mod junction;
mod pattern;
mod patterns;
mod reply;
mod store;
mod types;

pub use emitter::{Emitter, SpeciesRef, SyncEmitter};
pub use error::{ActivationError, EmitError, ExecutorError};
pub use executor::{Executor, FixedThreadPool, Task};
pub use junction::JoinDefinition;
pub use pattern::{Pattern, ReactionInfo};
pub use patterns::{
    when, when_eq, when_ignore, when_pattern, when_sync, when_sync_eq, when_sync_pattern,
    when_sync_where, when_where, PartialPattern1, PartialPattern2, PartialPattern3,
};
pub use reply::Reply;
