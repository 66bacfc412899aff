//! Collection of shared runtime types: type-erased message payloads, id
//! generation, and the per-species state every emitter hangs off.

use std::any::Any;
use std::sync::{Arc, OnceLock};

use crate::junction::JoinCore;

/// Shallow wrapper for a trait object using `Box` that can pass through thread
/// boundaries.
pub struct Message(Box<dyn Any + Send>);

impl Message {
    pub(crate) fn new<T>(raw_value: T) -> Message
    where
        T: Any + Send,
    {
        Message(Box::new(raw_value))
    }

    /// Cast internal trait object to `Box<T>`.
    pub(crate) fn downcast<T>(self) -> Result<Box<T>, Box<dyn Any + Send>>
    where
        T: Any + Send,
    {
        self.0.downcast::<T>()
    }

    /// Borrow the payload as a `T`, if that is what it holds.
    pub(crate) fn downcast_ref<T>(&self) -> Option<&T>
    where
        T: Any + Send,
    {
        self.0.downcast_ref::<T>()
    }
}

/// Whether emissions on a species return immediately or block for a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SpeciesKind {
    Async,
    Sync,
}

/// State shared by all clones of one emitter: identity, declared name, kind,
/// and the write-once binding to the join definition that owns the species.
pub(crate) struct SpeciesCore {
    pub(crate) id: ids::SpeciesId,
    pub(crate) name: Option<String>,
    pub(crate) kind: SpeciesKind,
    bound: OnceLock<Arc<JoinCore>>,
}

impl SpeciesCore {
    pub(crate) fn new(name: Option<String>, kind: SpeciesKind) -> SpeciesCore {
        SpeciesCore {
            id: ids::SpeciesId::next(),
            name,
            kind,
            bound: OnceLock::new(),
        }
    }

    /// The owning join definition, once activation has bound this species.
    ///
    /// Lock-free after activation; the slot is written exactly once.
    pub(crate) fn bound_core(&self) -> Option<&Arc<JoinCore>> {
        self.bound.get()
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.bound.get().is_some()
    }

    /// Bind this species to a join definition. Later calls are ignored, so a
    /// species that appears in several reactions of one activation binds once.
    pub(crate) fn bind(&self, core: Arc<JoinCore>) {
        let _ = self.bound.set(core);
    }

    /// Name used in snapshots and log lines.
    pub(crate) fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("m{}", self.id.raw()),
        }
    }

    /// Name contributed to reaction fingerprints. Unnamed species contribute
    /// a placeholder so structurally identical reaction sets hash equal even
    /// across freshly created emitters.
    pub(crate) fn fingerprint_label(&self) -> &str {
        self.name.as_deref().unwrap_or("_")
    }
}

/// Adds specific ID types for the various IDs that are used in the crate.
pub(crate) mod ids {
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Globally synchronized counter to ensure that no two species will have
    /// the same ID.
    static LATEST_SPECIES_ID: AtomicU64 = AtomicU64::new(0);

    /// ID to identify one species across all join definitions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub(crate) struct SpeciesId(u64);

    impl SpeciesId {
        pub(crate) fn next() -> SpeciesId {
            SpeciesId(LATEST_SPECIES_ID.fetch_add(1, Ordering::Relaxed))
        }

        pub(crate) fn raw(self) -> u64 {
            self.0
        }
    }

    /// Globally synchronized counter to ensure that no two join definitions
    /// will have the same ID.
    static LATEST_JOIN_ID: AtomicU64 = AtomicU64::new(0);

    /// ID for a join definition to identify itself in logs and snapshots.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct JoinId(u64);

    impl JoinId {
        pub(crate) fn next() -> JoinId {
            JoinId(LATEST_JOIN_ID.fetch_add(1, Ordering::Relaxed))
        }

        pub(crate) fn raw(self) -> u64 {
            self.0
        }
    }
}
