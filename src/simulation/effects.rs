use bevy_ecs::prelude::*;

use crate::data::clues::ClueId;
use crate::data::dialogue::{SequenceId, Triggers};
use crate::data::questions::QuestionId;

/// A single narrative side effect, applied after the step that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    SetFlag(String),
    DiscoverClue(ClueId),
    RevealQuestion(QuestionId),
    ChangeScene(String),
    ShowSequence(SequenceId),
}

impl Triggers {
    /// Flag, clue, question, then scene.
    pub fn effects(&self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(flag) = &self.set_flag {
            effects.push(Effect::SetFlag(flag.clone()));
        }
        if let Some(clue) = self.discover_clue {
            effects.push(Effect::DiscoverClue(clue));
        }
        if let Some(question) = self.reveal_question {
            effects.push(Effect::RevealQuestion(question));
        }
        if let Some(scene) = &self.change_scene {
            effects.push(Effect::ChangeScene(scene.clone()));
        }
        effects
    }
}

/// Effects waiting for the end-of-tick apply pass.
#[derive(Resource, Debug, Default)]
pub struct PendingEffects(pub Vec<Effect>);

impl PendingEffects {
    pub fn extend(&mut self, effects: impl IntoIterator<Item = Effect>) {
        self.0.extend(effects);
    }

    pub fn take(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triggers_expand_in_fixed_order() {
        let triggers = Triggers {
            set_flag: Some("read_letter".to_string()),
            discover_clue: Some(ClueId(2)),
            reveal_question: Some(QuestionId(1)),
            change_scene: Some("cellar".to_string()),
        };
        assert_eq!(
            triggers.effects(),
            vec![
                Effect::SetFlag("read_letter".to_string()),
                Effect::DiscoverClue(ClueId(2)),
                Effect::RevealQuestion(QuestionId(1)),
                Effect::ChangeScene("cellar".to_string()),
            ]
        );
        assert!(Triggers::default().effects().is_empty());
    }
}
