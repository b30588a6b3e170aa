use std::collections::{BTreeSet, VecDeque};

use bevy_ecs::prelude::*;
use bevy_utils::tracing::debug;

use crate::core::observers::{ObserverId, Observers};
use crate::data::catalog::ContentLibrary;
use crate::data::clues::{Character, Clue, ClueId};

/// Discovered clue numbers for the session. Clue content lives in the library.
#[derive(Resource, Debug, Default)]
pub struct ClueRegistry {
    found: BTreeSet<ClueId>,
    on_discovered: Observers<ClueRegistry, ClueId>,
}

impl ClueRegistry {
    /// True only when the clue was not already known.
    pub fn discover(&mut self, id: ClueId) -> bool {
        if !self.found.insert(id) {
            return false;
        }
        debug!(clue = id.0, "clue discovered");
        self.on_discovered.emit(self, &id);
        true
    }

    pub fn has(&self, id: ClueId) -> bool {
        self.found.contains(&id)
    }

    /// Found clues ordered by clue number.
    pub fn found(&self) -> Vec<ClueId> {
        self.found.iter().copied().collect()
    }

    pub fn contains_all(&self, ids: &[ClueId]) -> bool {
        ids.iter().all(|id| self.found.contains(id))
    }

    pub fn len(&self) -> usize {
        self.found.len()
    }

    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }

    /// Journal view for one character, in clue-number order.
    pub fn found_for<'a>(&self, character: Character, library: &'a ContentLibrary) -> Vec<&'a Clue> {
        self.found
            .iter()
            .filter_map(|id| library.clue(*id))
            .filter(|clue| clue.is_visible_to(character))
            .collect()
    }

    pub fn clear(&mut self) {
        self.found.clear();
    }

    /// Replace the whole set without notifying (save loading).
    pub fn restore(&mut self, clues: impl IntoIterator<Item = ClueId>) {
        self.found = clues.into_iter().collect();
    }

    pub fn on_discovered(
        &mut self,
        callback: impl Fn(&ClueRegistry, &ClueId) + Send + Sync + 'static,
    ) -> ObserverId {
        self.on_discovered.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        self.on_discovered.unsubscribe(id)
    }
}

pub fn is_visible_to(clue: &Clue, character: Character) -> bool {
    clue.visibility.is_visible_to(character)
}

/// "New clue" popups. A showing popup is never replaced; later discoveries wait their turn.
#[derive(Resource, Debug, Default)]
pub struct ClueAnnouncements {
    current: Option<ClueId>,
    pending: VecDeque<ClueId>,
}

impl ClueAnnouncements {
    pub fn push(&mut self, id: ClueId) {
        if self.current.is_none() {
            self.current = Some(id);
        } else {
            self.pending.push_back(id);
        }
    }

    pub fn current(&self) -> Option<ClueId> {
        self.current
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Close the showing popup and return the next one, if any.
    pub fn dismiss(&mut self) -> Option<ClueId> {
        self.current = self.pending.pop_front();
        self.current
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.pending.clear();
    }
}
