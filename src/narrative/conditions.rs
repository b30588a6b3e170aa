use crate::data::clues::ClueId;
use crate::data::dialogue::Conditions;
use crate::simulation::clues::ClueRegistry;
use crate::simulation::flags::FlagStore;

/// Read-only view of flag and clue state used by every gate.
#[derive(Clone, Copy)]
pub struct StoryState<'a> {
    pub flags: &'a FlagStore,
    pub clues: &'a ClueRegistry,
}

impl<'a> StoryState<'a> {
    pub fn new(flags: &'a FlagStore, clues: &'a ClueRegistry) -> Self {
        Self { flags, clues }
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.has(name)
    }

    pub fn has_clue(&self, id: ClueId) -> bool {
        self.clues.has(id)
    }

    pub fn has_all_clues(&self, ids: &[ClueId]) -> bool {
        self.clues.contains_all(ids)
    }
}

/// Gate evaluation: required flag, required clue, skip flag, skip clue.
pub fn conditions_met(conditions: &Conditions, state: StoryState<'_>) -> bool {
    if let Some(flag) = &conditions.requires_flag {
        if !state.has_flag(flag) {
            return false;
        }
    }
    if let Some(clue) = conditions.requires_clue {
        if !state.has_clue(clue) {
            return false;
        }
    }
    if let Some(flag) = &conditions.skip_if_flag {
        if state.has_flag(flag) {
            return false;
        }
    }
    if let Some(clue) = conditions.skip_if_clue {
        if state.has_clue(clue) {
            return false;
        }
    }
    true
}
