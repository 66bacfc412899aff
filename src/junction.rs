//! Join definitions: the owning aggregate of a molecule bag, a reaction set,
//! and the decision lock that serializes matching and consumption.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use itertools::Itertools;
use rand::seq::SliceRandom;
use soup_index::InvertedIndex;

use crate::error::{ActivationError, EmitError};
use crate::executor::{Executor, Task};
use crate::pattern::ReactionInfo;
use crate::store::{Instance, MoleculeBag};
use crate::types::ids::{JoinId, SpeciesId};
use crate::types::SpeciesKind;

/// Serializes concurrent activations so check-then-bind is atomic and a
/// rejected activation leaves every species unbound.
static ACTIVATION_LOCK: Mutex<()> = Mutex::new(());

/// An activated join definition.
///
/// Owns the reaction set and the bag of pending molecules for its input
/// species. Once activated, the reaction set is immutable and every input
/// species routes its emissions here for the rest of the program; dropping
/// this handle does not tear the definition down.
pub struct JoinDefinition {
    core: Arc<JoinCore>,
}

impl JoinDefinition {
    /// Activate a join definition over the given reactions, running bodies
    /// on `executor`.
    ///
    /// Checks each reaction for nonlinear inputs and missing reply binders,
    /// then claims every input species. Rejection leaves all species unbound.
    pub fn activate(
        executor: Arc<dyn Executor>,
        reactions: Vec<ReactionInfo>,
    ) -> Result<JoinDefinition, ActivationError> {
        Self::activate_inner(executor, None, reactions)
    }

    /// Like [`JoinDefinition::activate`], with a second pool that runs the
    /// reactions containing blocking input sites.
    ///
    /// Keeping those reactions off the main pool means a body blocked on a
    /// blocking emission cannot starve the reaction that would unblock it.
    pub fn activate_with_reply_pool(
        executor: Arc<dyn Executor>,
        reply_executor: Arc<dyn Executor>,
        reactions: Vec<ReactionInfo>,
    ) -> Result<JoinDefinition, ActivationError> {
        Self::activate_inner(executor, Some(reply_executor), reactions)
    }

    fn activate_inner(
        executor: Arc<dyn Executor>,
        reply_executor: Option<Arc<dyn Executor>>,
        reactions: Vec<ReactionInfo>,
    ) -> Result<JoinDefinition, ActivationError> {
        // Structural checks first; nothing binds unless every one passes.
        for reaction in &reactions {
            let species_ids = reaction.sites().iter().map(|site| site.species.id);
            if let Some(dup) = species_ids.duplicates().next() {
                let species = name_of(reaction, dup);
                return Err(ActivationError::Nonlinear { species });
            }
            for site in reaction.sites() {
                if site.species.kind == SpeciesKind::Sync && !site.binds_reply {
                    return Err(ActivationError::InvalidReply {
                        species: site.species.display_name(),
                    });
                }
            }
        }

        let _guard = ACTIVATION_LOCK.lock().unwrap();

        for reaction in &reactions {
            for site in reaction.sites() {
                if site.species.is_bound() {
                    return Err(ActivationError::AlreadyBound {
                        species: site.species.display_name(),
                    });
                }
            }
        }

        let mut site_index = InvertedIndex::new();
        let mut species_names = HashMap::new();
        for (index, reaction) in reactions.iter().enumerate() {
            for site in reaction.sites() {
                site_index.insert(site.species.id, index);
                species_names
                    .entry(site.species.id)
                    .or_insert_with(|| site.species.display_name());
            }
        }

        let reaction_count = reactions.len();
        let core = Arc::new(JoinCore {
            id: JoinId::next(),
            reactions,
            site_index,
            species_names,
            state: Mutex::new(DecisionState {
                bag: MoleculeBag::new(),
                clock: 0,
                last_fired: vec![None; reaction_count],
            }),
            executor,
            reply_executor,
            log_level: AtomicUsize::new(0),
        });

        // Bind every input species to the new definition. A species that
        // appears in several reactions binds once; cannot fail past here.
        for reaction in &core.reactions {
            for site in reaction.sites() {
                site.species.bind(core.clone());
            }
        }

        log::debug!(
            "join #{}: activated with {} reactions",
            core.id.raw(),
            core.reactions.len()
        );

        Ok(JoinDefinition { core })
    }

    /// Snapshot of the pending molecules and the reaction set.
    pub fn current_contents(&self) -> String {
        self.core.render_contents()
    }

    /// Set this definition's log verbosity: 0 quiet, 1 firings, 2 also
    /// molecule traffic.
    pub fn set_log_level(&self, level: usize) {
        self.core.set_log_level(level);
    }
}

fn name_of(reaction: &ReactionInfo, species: SpeciesId) -> String {
    reaction
        .sites()
        .iter()
        .find(|site| site.species.id == species)
        .map(|site| site.species.display_name())
        .unwrap_or_default()
}

/// A selected firing, extracted from the bag under the decision lock and
/// carried to the executor after the lock is released.
struct PreparedFiring {
    reaction: usize,
    values: Vec<crate::types::Message>,
    replies: Vec<crate::types::Message>,
}

struct DecisionState {
    bag: MoleculeBag,
    /// Emissions seen so far; pseudo-time for the fairness order.
    clock: u64,
    /// Clock value at which each reaction last fired, `None` until then.
    last_fired: Vec<Option<u64>>,
}

/// Shared state behind every [`JoinDefinition`] handle and every bound
/// species: the reaction set, the species lookup, and the decision lock.
pub(crate) struct JoinCore {
    id: JoinId,
    reactions: Vec<ReactionInfo>,
    /// Species to the indices of reactions with an input site of it.
    site_index: InvertedIndex<SpeciesId, usize>,
    /// Display names for snapshots and log lines.
    species_names: HashMap<SpeciesId, String>,
    state: Mutex<DecisionState>,
    executor: Arc<dyn Executor>,
    reply_executor: Option<Arc<dyn Executor>>,
    log_level: AtomicUsize,
}

impl JoinCore {
    /// One decision cycle: insert the new molecule, search for a fireable
    /// reaction, and on a match consume its inputs and hand the body off.
    ///
    /// At most one reaction fires per emission; reactions left fireable are
    /// picked up by later decision cycles, which consider every reaction
    /// whose species are present, not only those of the new molecule.
    pub(crate) fn emit(&self, species: SpeciesId, instance: Instance) -> Result<(), EmitError> {
        let prepared = {
            let mut state = self.state.lock().unwrap();
            state.clock += 1;
            if self.log_enabled(2) {
                log::trace!(
                    "join #{}: +{}({}), {} pending",
                    self.id.raw(),
                    self.species_name(species),
                    instance.rendered,
                    state.bag.count(species) + 1
                );
            }
            state.bag.insert(species, instance);
            self.select_firing(&mut state)
        };

        match prepared {
            Some(firing) => self.submit_firing(firing),
            None => Ok(()),
        }
    }

    /// Search the bag for a reaction whose every input site binds a pending
    /// instance, and consume those instances. Runs under the decision lock.
    fn select_firing(&self, state: &mut DecisionState) -> Option<PreparedFiring> {
        let mut seen = vec![false; self.reactions.len()];
        let mut candidates = Vec::new();
        for species in state.bag.species_present() {
            for &index in self.site_index.get(&species) {
                if !seen[index] {
                    seen[index] = true;
                    candidates.push(index);
                }
            }
        }

        // Random order first, then least-recently-fired precedence; the
        // stable sort keeps the random order among equally recent reactions.
        candidates.shuffle(&mut rand::thread_rng());
        candidates.sort_by(|&a, &b| state.last_fired[a].cmp(&state.last_fired[b]));

        for index in candidates {
            let reaction = &self.reactions[index];
            let Some(picks) = state.bag.find_match(reaction.sites()) else {
                continue;
            };

            let instances = state.bag.remove_picked(&picks);
            state.last_fired[index] = Some(state.clock);

            let mut values = Vec::with_capacity(instances.len());
            let mut replies = Vec::new();
            for instance in instances {
                values.push(instance.value);
                if let Some(reply) = instance.reply {
                    replies.push(reply);
                }
            }

            if self.log_enabled(1) {
                log::debug!("join #{}: firing {}", self.id.raw(), reaction);
            }

            return Some(PreparedFiring {
                reaction: index,
                values,
                replies,
            });
        }

        None
    }

    /// Hand a prepared firing to the executor. The inputs are already gone
    /// from the bag; nothing can reinstate them.
    fn submit_firing(&self, firing: PreparedFiring) -> Result<(), EmitError> {
        let reaction = &self.reactions[firing.reaction];
        let body = reaction.body();
        let label = reaction.to_string();
        let join_id = self.id.raw();
        let PreparedFiring {
            values, replies, ..
        } = firing;

        let task: Task = Box::new(move || {
            // Reply handles travel in `replies`; dropping them on any exit
            // path wakes still-blocked emitters with a no-reply error.
            if catch_unwind(AssertUnwindSafe(|| (*body)(values, replies))).is_err() {
                log::error!("join #{join_id}: reaction body panicked: {label}");
            }
        });

        let executor = if reaction.has_sync_site() {
            self.reply_executor.as_ref().unwrap_or(&self.executor)
        } else {
            &self.executor
        };
        executor.submit(task).map_err(EmitError::from)
    }

    pub(crate) fn render_contents(&self) -> String {
        let state = self.state.lock().unwrap();

        let mut species: Vec<(&String, SpeciesId)> = self
            .species_names
            .iter()
            .map(|(id, name)| (name, *id))
            .collect();
        species.sort_by(|a, b| a.0.cmp(b.0).then(a.1.raw().cmp(&b.1.raw())));

        let mut out = format!("JoinDefinition #{} {{\n", self.id.raw());
        for (name, id) in species {
            out.push_str(&format!("  {}: [{}]\n", name, state.bag.pending(id).join(", ")));
        }
        out.push_str("  reactions:\n");
        for reaction in &self.reactions {
            out.push_str(&format!("    {reaction}\n"));
        }
        out.push('}');
        out
    }

    pub(crate) fn set_log_level(&self, level: usize) {
        self.log_level.store(level, Ordering::Relaxed);
    }

    fn log_enabled(&self, level: usize) -> bool {
        self.log_level.load(Ordering::Relaxed) >= level
    }

    fn species_name(&self, species: SpeciesId) -> &str {
        self.species_names
            .get(&species)
            .map_or("?", String::as_str)
    }
}
