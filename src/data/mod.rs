pub mod catalog;
pub mod clues;
pub mod dialogue;
pub mod music;
pub mod questions;
pub mod scenes;

pub use catalog::{load_content_catalog, ContentCatalog, ContentError, ContentLibrary};
pub use clues::{Character, Clue, ClueId, ClueVisibility};
pub use dialogue::{
    ConditionalDialogue, Conditions, DialogueLine, DialogueSequence, Interactable, SequenceId,
    Speaker, Triggers, VoiceCues,
};
pub use music::{AudioClip, MusicTrack};
pub use questions::{AnswerOption, Question, QuestionId, BLANK};
pub use scenes::SceneDef;
