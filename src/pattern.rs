//! Static description of one reaction: its ordered input sites with per-site
//! match patterns, the erased body callable, the declared output species, and
//! a structural fingerprint used for diagnostics.

use std::any::Any;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::types::{Message, SpeciesCore, SpeciesKind};

/// Erased per-site match test over a molecule payload.
pub(crate) type SiteTest = Box<dyn Fn(&Message) -> bool + Send + Sync>;

/// Erased reaction body: the bound values (one per input site, in source
/// order) and the reply handles (one per blocking site, in source order).
pub(crate) type ReactionBody = Arc<dyn Fn(Vec<Message>, Vec<Message>) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum PatternTag {
    Wildcard,
    Variable,
    Constant,
    Where,
}

/// How one input site of a reaction matches candidate molecules.
///
/// Patterns are pure: they are evaluated under the join definition's decision
/// lock and must not block or have side effects.
pub struct Pattern<V> {
    tag: PatternTag,
    test: Option<Box<dyn Fn(&V) -> bool + Send + Sync>>,
    display: String,
}

impl<V> Pattern<V> {
    /// Accept any value without binding interest in it.
    pub fn wildcard() -> Pattern<V> {
        Pattern {
            tag: PatternTag::Wildcard,
            test: None,
            display: "_".to_string(),
        }
    }

    /// Accept any value and bind it for the reaction body.
    pub fn variable() -> Pattern<V> {
        Pattern {
            tag: PatternTag::Variable,
            test: None,
            display: "x".to_string(),
        }
    }

    /// Accept values structurally equal to the given one.
    pub fn eq(expected: V) -> Pattern<V>
    where
        V: PartialEq + fmt::Debug + Send + Sync + 'static,
    {
        let display = format!("={expected:?}");
        Pattern {
            tag: PatternTag::Constant,
            test: Some(Box::new(move |value| *value == expected)),
            display,
        }
    }

    /// Accept values the given pure predicate holds for.
    pub fn matching<F>(pred: F) -> Pattern<V>
    where
        F: Fn(&V) -> bool + Send + Sync + 'static,
    {
        Pattern {
            tag: PatternTag::Where,
            test: Some(Box::new(pred)),
            display: "?".to_string(),
        }
    }

    /// Lower the typed pattern to its erased, payload-level form.
    pub(crate) fn erase(self) -> ErasedPattern
    where
        V: Any + Send,
    {
        let test = self.test.map(|test| -> SiteTest {
            Box::new(move |msg| msg.downcast_ref::<V>().map_or(false, |value| test(value)))
        });
        ErasedPattern {
            tag: self.tag,
            test,
            display: self.display,
        }
    }
}

/// Payload-level form of a [`Pattern`], as stored in a reaction.
pub(crate) struct ErasedPattern {
    pub(crate) tag: PatternTag,
    test: Option<SiteTest>,
    pub(crate) display: String,
}

impl ErasedPattern {
    pub(crate) fn accepts(&self, msg: &Message) -> bool {
        self.test.as_ref().map_or(true, |test| test(msg))
    }
}

/// One input position of a reaction: the species it consumes, the pattern its
/// candidate must satisfy, and whether the site binds a reply channel.
pub(crate) struct InputSite {
    pub(crate) species: Arc<SpeciesCore>,
    pub(crate) pattern: ErasedPattern,
    pub(crate) binds_reply: bool,
}

impl InputSite {
    pub(crate) fn new(
        species: Arc<SpeciesCore>,
        pattern: ErasedPattern,
        binds_reply: bool,
    ) -> InputSite {
        InputSite {
            species,
            pattern,
            binds_reply,
        }
    }

    pub(crate) fn accepts(&self, msg: &Message) -> bool {
        self.pattern.accepts(msg)
    }
}

/// Immutable description of one reaction, as consumed by activation.
///
/// Built by the fixed-arity builders in [`crate::patterns`]; the runtime
/// treats it as opaque apart from its sites.
pub struct ReactionInfo {
    sites: Vec<InputSite>,
    body: ReactionBody,
    outputs: Vec<String>,
    fingerprint: u64,
}

impl ReactionInfo {
    pub(crate) fn new(
        sites: Vec<InputSite>,
        body: ReactionBody,
        outputs: Vec<String>,
    ) -> ReactionInfo {
        let fingerprint = fingerprint_of(&sites);
        ReactionInfo {
            sites,
            body,
            outputs,
            fingerprint,
        }
    }

    /// Stable structural fingerprint of the input pattern.
    ///
    /// Derived from the declared species names, kinds, and pattern shapes —
    /// never from runtime ids — so activating an identical reaction set on a
    /// fresh join definition yields equal fingerprints.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    pub(crate) fn sites(&self) -> &[InputSite] {
        &self.sites
    }

    pub(crate) fn body(&self) -> ReactionBody {
        self.body.clone()
    }

    pub(crate) fn has_sync_site(&self) -> bool {
        self.sites.iter().any(|site| site.binds_reply)
    }
}

fn fingerprint_of(sites: &[InputSite]) -> u64 {
    let mut hasher = DefaultHasher::new();
    sites.len().hash(&mut hasher);
    for site in sites {
        site.species.fingerprint_label().hash(&mut hasher);
        matches!(site.species.kind, SpeciesKind::Sync).hash(&mut hasher);
        site.pattern.tag.hash(&mut hasher);
        site.pattern.display.hash(&mut hasher);
        site.binds_reply.hash(&mut hasher);
    }
    hasher.finish()
}

impl fmt::Display for ReactionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, site) in self.sites.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            if site.binds_reply {
                write!(f, "{}({}, reply)", site.species.display_name(), site.pattern.display)?;
            } else {
                write!(f, "{}({})", site.species.display_name(), site.pattern.display)?;
            }
        }
        if !self.outputs.is_empty() {
            write!(f, " => {}", self.outputs.join(" + "))?;
        }
        Ok(())
    }
}
