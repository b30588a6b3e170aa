use crate::data::dialogue::{ConditionalDialogue, Interactable, SequenceId};
use crate::narrative::conditions::{conditions_met, StoryState};
use crate::simulation::effects::Effect;

/// Flag that records a play-once entry as used.
pub fn play_once_key(object_id: Option<&str>, sequence: &SequenceId) -> String {
    match object_id.map(str::trim).filter(|id| !id.is_empty()) {
        Some(object_id) => format!("played_{}_{}", object_id, sequence),
        None => format!("played_{}", sequence),
    }
}

/// Outcome of resolving an interactable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueChoice {
    pub sequence: SequenceId,
    /// Index of the matched entry; `None` when the fallback was used.
    pub entry: Option<usize>,
    /// Set as soon as the choice is made.
    pub play_once_flag: Option<String>,
    /// Fired when the chosen sequence completes.
    pub after: Vec<Effect>,
}

/// First entry, in declaration order, whose gates all pass.
pub fn resolve_conditional<'a>(
    entries: &'a [ConditionalDialogue],
    object_id: Option<&str>,
    state: StoryState<'_>,
) -> Option<(usize, &'a ConditionalDialogue)> {
    entries.iter().enumerate().find(|(_, entry)| {
        if entry.play_once && state.has_flag(&play_once_key(object_id, &entry.sequence)) {
            return false;
        }
        conditions_met(&entry.conditions, state)
    })
}

pub fn after_effects(entry: &ConditionalDialogue) -> Vec<Effect> {
    let mut effects = Vec::new();
    if let Some(flag) = &entry.set_flag_after {
        effects.push(Effect::SetFlag(flag.clone()));
    }
    if let Some(clue) = entry.discover_clue_after {
        effects.push(Effect::DiscoverClue(clue));
    }
    effects
}

/// Pick the dialogue for an interactable, falling back when nothing matches.
pub fn resolve_interactable(interactable: &Interactable, state: StoryState<'_>) -> Option<DialogueChoice> {
    let object_id = Some(interactable.id.as_str());
    if let Some((index, entry)) = resolve_conditional(&interactable.dialogues, object_id, state) {
        return Some(DialogueChoice {
            sequence: entry.sequence.clone(),
            entry: Some(index),
            play_once_flag: entry
                .play_once
                .then(|| play_once_key(object_id, &entry.sequence)),
            after: after_effects(entry),
        });
    }
    interactable.fallback.as_ref().map(|sequence| DialogueChoice {
        sequence: sequence.clone(),
        entry: None,
        play_once_flag: None,
        after: Vec::new(),
    })
}
