//! Per-species handles through which molecules enter their join definition.
//!
//! Emitters are created free-standing and stay inert until some activation
//! lists their species as a reaction input, which binds them to that join
//! definition. Clones share the species: any clone emits into the same bag,
//! like clones of an `mpsc::Sender` feed the same receiver.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use crate::error::EmitError;
use crate::reply::reply_pair;
use crate::store::Instance;
use crate::types::{Message, SpeciesCore, SpeciesKind};

/// Anything that names a species; used for output-species declarations.
pub trait SpeciesRef {
    /// The declared name of the species, or its generated placeholder.
    fn species_label(&self) -> String;
}

/// Emitter for a non-blocking species carrying values of type `V`.
pub struct Emitter<V> {
    species: Arc<SpeciesCore>,
    _value: PhantomData<fn(V)>,
}

impl<V> Clone for Emitter<V> {
    fn clone(&self) -> Self {
        Emitter {
            species: self.species.clone(),
            _value: PhantomData,
        }
    }
}

#[allow(clippy::new_without_default)]
impl<V> Emitter<V> {
    /// Create a new, unnamed species.
    pub fn new() -> Emitter<V> {
        Self::build(None)
    }

    /// Create a new species with a debug name.
    ///
    /// The name shows up in snapshots and log lines and feeds the owning
    /// reactions' fingerprints; it carries no identity — two species named
    /// alike are still distinct.
    pub fn named(name: impl Into<String>) -> Emitter<V> {
        Self::build(Some(name.into()))
    }

    fn build(name: Option<String>) -> Emitter<V> {
        Emitter {
            species: Arc::new(SpeciesCore::new(name, SpeciesKind::Async)),
            _value: PhantomData,
        }
    }

    /// The declared name, if any.
    pub fn name(&self) -> Option<&str> {
        self.species.name.as_deref()
    }

    /// Snapshot of the owning join definition's bag and reactions.
    pub fn current_contents(&self) -> Result<String, EmitError> {
        let core = self.species.bound_core().ok_or(EmitError::Unbound)?;
        Ok(core.render_contents())
    }

    /// Set the owning join definition's log verbosity.
    pub fn set_log_level(&self, level: usize) -> Result<(), EmitError> {
        let core = self.species.bound_core().ok_or(EmitError::Unbound)?;
        core.set_log_level(level);
        Ok(())
    }

    pub(crate) fn species(&self) -> &Arc<SpeciesCore> {
        &self.species
    }
}

impl<V> Emitter<V>
where
    V: Any + Send + fmt::Debug,
{
    /// Emit one molecule and return once its decision cycle has run.
    ///
    /// Never blocks beyond the owning join definition's decision lock.
    pub fn emit(&self, value: V) -> Result<(), EmitError> {
        let core = self.species.bound_core().ok_or(EmitError::Unbound)?;
        let rendered = format!("{value:?}");
        core.emit(
            self.species.id,
            Instance::asynchronous(Message::new(value), rendered),
        )
    }
}

impl<V> SpeciesRef for Emitter<V> {
    fn species_label(&self) -> String {
        self.species.display_name()
    }
}

/// Emitter for a blocking species carrying values of type `V` and suspending
/// each emission until the consuming reaction replies with an `R`.
pub struct SyncEmitter<V, R> {
    species: Arc<SpeciesCore>,
    _value: PhantomData<fn(V) -> R>,
}

impl<V, R> Clone for SyncEmitter<V, R> {
    fn clone(&self) -> Self {
        SyncEmitter {
            species: self.species.clone(),
            _value: PhantomData,
        }
    }
}

#[allow(clippy::new_without_default)]
impl<V, R> SyncEmitter<V, R> {
    /// Create a new, unnamed blocking species.
    pub fn new() -> SyncEmitter<V, R> {
        Self::build(None)
    }

    /// Create a new blocking species with a debug name.
    pub fn named(name: impl Into<String>) -> SyncEmitter<V, R> {
        Self::build(Some(name.into()))
    }

    fn build(name: Option<String>) -> SyncEmitter<V, R> {
        SyncEmitter {
            species: Arc::new(SpeciesCore::new(name, SpeciesKind::Sync)),
            _value: PhantomData,
        }
    }

    /// The declared name, if any.
    pub fn name(&self) -> Option<&str> {
        self.species.name.as_deref()
    }

    /// Snapshot of the owning join definition's bag and reactions.
    pub fn current_contents(&self) -> Result<String, EmitError> {
        let core = self.species.bound_core().ok_or(EmitError::Unbound)?;
        Ok(core.render_contents())
    }

    /// Set the owning join definition's log verbosity.
    pub fn set_log_level(&self, level: usize) -> Result<(), EmitError> {
        let core = self.species.bound_core().ok_or(EmitError::Unbound)?;
        core.set_log_level(level);
        Ok(())
    }

    pub(crate) fn species(&self) -> &Arc<SpeciesCore> {
        &self.species
    }
}

impl<V, R> SyncEmitter<V, R>
where
    V: Any + Send + fmt::Debug,
    R: Any + Send,
{
    /// Emit one molecule and block until the consuming reaction replies.
    ///
    /// Fails with [`EmitError::NoReply`] when the reaction completes — or
    /// panics — without replying.
    pub fn emit(&self, value: V) -> Result<R, EmitError> {
        self.launch(value)?.recv().map_err(EmitError::from)
    }

    /// Like [`SyncEmitter::emit`], giving up with [`EmitError::Timeout`]
    /// once the deadline elapses.
    ///
    /// A timed-out emission does not undo the consumption that may already
    /// have removed its molecule; a reply arriving later is discarded.
    pub fn emit_timeout(&self, value: V, timeout: Duration) -> Result<R, EmitError> {
        self.launch(value)?
            .recv_timeout(timeout)
            .map_err(EmitError::from)
    }

    fn launch(&self, value: V) -> Result<crate::reply::ReplyReceiver<R>, EmitError> {
        let core = self.species.bound_core().ok_or(EmitError::Unbound)?;
        let (reply, receiver) = reply_pair::<R>();
        let rendered = format!("{value:?}");
        core.emit(
            self.species.id,
            Instance::blocking(Message::new(value), rendered, Message::new(reply)),
        )?;
        Ok(receiver)
    }
}

impl<V, R> SpeciesRef for SyncEmitter<V, R> {
    fn species_label(&self) -> String {
        self.species.display_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbound_async_emission_fails() {
        let m = Emitter::<i64>::new();
        assert_eq!(Err(EmitError::Unbound), m.emit(1));
        assert_eq!(Err(EmitError::Unbound), m.current_contents().map(|_| ()));
    }

    #[test]
    fn unbound_sync_emission_fails() {
        let f = SyncEmitter::<(), i64>::named("f");
        assert_eq!(Err(EmitError::Unbound), f.emit(()));
        assert_eq!(
            Err(EmitError::Unbound),
            f.emit_timeout((), Duration::from_millis(1))
        );
    }

    #[test]
    fn clones_share_the_species() {
        let m = Emitter::<i64>::named("m");
        let n = m.clone();
        assert_eq!(m.species().id, n.species().id);
        assert_eq!(Some("m"), n.name());
    }
}
