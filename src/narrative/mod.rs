pub mod conditions;
pub mod resolver;

pub use conditions::{conditions_met, StoryState};
pub use resolver::{
    after_effects, play_once_key, resolve_conditional, resolve_interactable, DialogueChoice,
};
