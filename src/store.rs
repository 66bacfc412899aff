//! The multiset of pending molecules owned by one join definition.
//!
//! Mutated only under the owning join definition's decision lock; reaction
//! bodies never touch it directly.

use soup_bag::Bag;

use crate::pattern::InputSite;
use crate::types::ids::SpeciesId;
use crate::types::Message;

/// One pending molecule: its payload, a snapshot-friendly rendering captured
/// at emission, and the reply handle when the emission was blocking.
pub(crate) struct Instance {
    pub(crate) value: Message,
    pub(crate) rendered: String,
    pub(crate) reply: Option<Message>,
}

impl Instance {
    pub(crate) fn asynchronous(value: Message, rendered: String) -> Instance {
        Instance {
            value,
            rendered,
            reply: None,
        }
    }

    pub(crate) fn blocking(value: Message, rendered: String, reply: Message) -> Instance {
        Instance {
            value,
            rendered,
            reply: Some(reply),
        }
    }
}

/// Multiset store keyed by species, FIFO per species.
pub(crate) struct MoleculeBag {
    items: Bag<SpeciesId, Instance>,
}

impl MoleculeBag {
    pub(crate) fn new() -> MoleculeBag {
        MoleculeBag { items: Bag::new() }
    }

    pub(crate) fn insert(&mut self, species: SpeciesId, instance: Instance) {
        self.items.add(species, instance);
    }

    /// Species that currently have at least one pending instance.
    pub(crate) fn species_present(&self) -> Vec<SpeciesId> {
        self.items.keys().copied().collect()
    }

    /// Try to assign one pending instance to every input site.
    ///
    /// Per site, candidates are scanned oldest-first and the first instance
    /// the site's pattern accepts is picked. Activation rejects reactions
    /// with two sites of one species, so the per-site picks never collide.
    pub(crate) fn find_match(&self, sites: &[InputSite]) -> Option<Vec<(SpeciesId, usize)>> {
        let mut picks = Vec::with_capacity(sites.len());
        for site in sites {
            let species = site.species.id;
            let index = self
                .items
                .position(&species, |instance| site.accepts(&instance.value))?;
            picks.push((species, index));
        }
        Some(picks)
    }

    /// Remove the picked instances, in pick order.
    ///
    /// Callers pass picks produced by [`MoleculeBag::find_match`] within the
    /// same critical section, so every pick is still present.
    pub(crate) fn remove_picked(&mut self, picks: &[(SpeciesId, usize)]) -> Vec<Instance> {
        picks
            .iter()
            .filter_map(|(species, index)| self.items.remove_at(species, *index))
            .collect()
    }

    pub(crate) fn count(&self, species: SpeciesId) -> usize {
        self.items.count_items(&species)
    }

    /// Rendered payloads pending for one species, oldest first.
    pub(crate) fn pending(&self, species: SpeciesId) -> Vec<&str> {
        self.items
            .iter_key(&species)
            .map(|instance| instance.rendered.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::pattern::Pattern;
    use crate::types::{SpeciesCore, SpeciesKind};

    fn species(name: &str) -> Arc<SpeciesCore> {
        Arc::new(SpeciesCore::new(Some(name.to_string()), SpeciesKind::Async))
    }

    fn instance(value: i64) -> Instance {
        Instance::asynchronous(Message::new(value), format!("{value:?}"))
    }

    #[test]
    fn find_match_picks_oldest_accepted_instance() {
        // Given:
        let counter = species("counter");
        let mut bag = MoleculeBag::new();
        bag.insert(counter.id, instance(1));
        bag.insert(counter.id, instance(2));
        bag.insert(counter.id, instance(2));

        let sites = vec![InputSite::new(
            counter.clone(),
            Pattern::eq(2_i64).erase(),
            false,
        )];

        // When:
        let picks = bag.find_match(&sites).unwrap();

        // Then:
        assert_eq!(vec![(counter.id, 1)], picks);
    }

    #[test]
    fn find_match_fails_when_any_site_is_unmatched() {
        // Given:
        let counter = species("counter");
        let incr = species("incr");
        let mut bag = MoleculeBag::new();
        bag.insert(counter.id, instance(1));

        let sites = vec![
            InputSite::new(counter.clone(), Pattern::<i64>::variable().erase(), false),
            InputSite::new(incr, Pattern::<i64>::variable().erase(), false),
        ];

        // Then:
        assert!(bag.find_match(&sites).is_none());
        assert_eq!(1, bag.count(counter.id));
    }

    #[test]
    fn remove_picked_consumes_exactly_the_picks() {
        // Given:
        let counter = species("counter");
        let incr = species("incr");
        let mut bag = MoleculeBag::new();
        bag.insert(counter.id, instance(10));
        bag.insert(counter.id, instance(11));
        bag.insert(incr.id, instance(0));

        let sites = vec![
            InputSite::new(counter.clone(), Pattern::eq(11_i64).erase(), false),
            InputSite::new(incr.clone(), Pattern::<i64>::wildcard().erase(), false),
        ];

        // When:
        let picks = bag.find_match(&sites).unwrap();
        let removed = bag.remove_picked(&picks);

        // Then:
        assert_eq!(2, removed.len());
        assert_eq!(1, bag.count(counter.id));
        assert_eq!(0, bag.count(incr.id));
        assert_eq!(vec!["10"], bag.pending(counter.id));
    }
}
