use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::clues::ClueId;
use crate::data::questions::QuestionId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceId(pub String);

impl SequenceId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SequenceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Flag/clue gate shared by dialogue lines and conditional dialogue entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conditions {
    #[serde(default)]
    pub requires_flag: Option<String>,
    #[serde(default)]
    pub requires_clue: Option<ClueId>,
    #[serde(default)]
    pub skip_if_flag: Option<String>,
    #[serde(default)]
    pub skip_if_clue: Option<ClueId>,
}

impl Conditions {
    pub fn is_empty(&self) -> bool {
        self.requires_flag.is_none()
            && self.requires_clue.is_none()
            && self.skip_if_flag.is_none()
            && self.skip_if_clue.is_none()
    }
}

/// Side effects attached to a line or to the end of a sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triggers {
    #[serde(default)]
    pub set_flag: Option<String>,
    #[serde(default)]
    pub discover_clue: Option<ClueId>,
    #[serde(default)]
    pub reveal_question: Option<QuestionId>,
    #[serde(default)]
    pub change_scene: Option<String>,
}

impl Triggers {
    pub fn is_empty(&self) -> bool {
        self.set_flag.is_none()
            && self.discover_clue.is_none()
            && self.reveal_question.is_none()
            && self.change_scene.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoiceCues {
    #[serde(default)]
    pub normal: Vec<String>,
    #[serde(default)]
    pub bold: Vec<String>,
    #[serde(default)]
    pub italic: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Speaker {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub chars_per_second: Option<f32>,
    #[serde(default)]
    pub bold_multiplier: Option<f32>,
    #[serde(default)]
    pub italic_multiplier: Option<f32>,
    #[serde(default)]
    pub blip_interval: Option<u32>,
    #[serde(default)]
    pub voice: VoiceCues,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueLine {
    pub text: String,
    #[serde(default)]
    pub speaker: Option<String>,
    #[serde(flatten)]
    pub conditions: Conditions,
    #[serde(default)]
    pub triggers: Triggers,
    #[serde(default)]
    pub delay_before: f32,
}

impl DialogueLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            speaker: None,
            conditions: Conditions::default(),
            triggers: Triggers::default(),
            delay_before: 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogueSequence {
    pub id: SequenceId,
    pub lines: Vec<DialogueLine>,
    #[serde(default)]
    pub on_complete: Triggers,
}

/// One gated choice of sequence on an interactable, evaluated in declaration order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionalDialogue {
    pub sequence: SequenceId,
    #[serde(default)]
    pub play_once: bool,
    #[serde(flatten)]
    pub conditions: Conditions,
    #[serde(default)]
    pub set_flag_after: Option<String>,
    #[serde(default)]
    pub discover_clue_after: Option<ClueId>,
}

impl ConditionalDialogue {
    pub fn unconditional(sequence: impl Into<String>) -> Self {
        Self {
            sequence: SequenceId(sequence.into()),
            play_once: false,
            conditions: Conditions::default(),
            set_flag_after: None,
            discover_clue_after: None,
        }
    }
}

/// A clickable scene object that picks its dialogue from ordered entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interactable {
    pub id: String,
    #[serde(default)]
    pub dialogues: Vec<ConditionalDialogue>,
    #[serde(default)]
    pub fallback: Option<SequenceId>,
}
