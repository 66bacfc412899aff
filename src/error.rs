//! Error kinds surfaced by activation, emission, and executors.

use thiserror::Error;

/// Errors that abort the activation of a join definition.
///
/// Activation is all-or-nothing: when any of these is returned, no species
/// mentioned in the rejected reaction set has been bound.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActivationError {
    /// A reaction listed the same species at two input sites.
    #[error("reaction lists species `{species}` more than once as input")]
    Nonlinear { species: String },
    /// An input species is already owned by another join definition.
    #[error("species `{species}` is already bound to another join definition")]
    AlreadyBound { species: String },
    /// A blocking input site arrived without its reply binder.
    #[error("blocking input `{species}` carries no reply binder in its pattern")]
    InvalidReply { species: String },
}

/// Errors surfaced to the emitter performing an emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EmitError {
    /// The species was never registered as an input of any join definition.
    #[error("emitter is not bound to any join definition")]
    Unbound,
    /// The consuming reaction finished without performing a reply.
    #[error("consuming reaction completed without replying")]
    NoReply,
    /// The supplied deadline elapsed before a reply arrived.
    #[error("deadline elapsed before a reply arrived")]
    Timeout,
    /// The executor declined the reaction task.
    #[error("executor rejected the reaction task: {0}")]
    ExecutorRejected(#[from] ExecutorError),
}

/// Errors returned by [`Executor::submit`](crate::Executor::submit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExecutorError {
    /// The executor has been shut down and accepts no further tasks.
    #[error("executor is shut down")]
    Rejected,
}
