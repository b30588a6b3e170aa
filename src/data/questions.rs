use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::clues::ClueId;
use crate::data::dialogue::SequenceId;

/// Placeholder inside question text that the chosen answer fills.
pub const BLANK: &str = "___";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub u32);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.0)
    }
}

/// One selectable completion for a question's blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerOption {
    pub text: String,
    #[serde(default)]
    pub required_clues: Vec<ClueId>,
    #[serde(default)]
    pub unlock_flag: Option<String>,
}

impl AnswerOption {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            required_clues: Vec::new(),
            unlock_flag: None,
        }
    }

    pub fn requiring(mut self, clues: impl IntoIterator<Item = u32>) -> Self {
        self.required_clues = clues.into_iter().map(ClueId).collect();
        self
    }

    pub fn unlocked_by(mut self, flag: impl Into<String>) -> Self {
        self.unlock_flag = Some(flag.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub text: String,
    pub correct: AnswerOption,
    #[serde(default)]
    pub incorrect: Vec<AnswerOption>,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default)]
    pub on_correct: Option<SequenceId>,
    #[serde(default)]
    pub on_wrong: Option<SequenceId>,
}

impl Question {
    /// Correct answer first, then the incorrect ones in declaration order.
    pub fn answers(&self) -> impl Iterator<Item = &AnswerOption> {
        std::iter::once(&self.correct).chain(self.incorrect.iter())
    }

    /// Pure text comparison against the correct answer.
    pub fn is_correct_text(&self, text: &str) -> bool {
        self.correct.text == text
    }

    pub fn find_answer(&self, text: &str) -> Option<&AnswerOption> {
        self.answers().find(|answer| answer.text == text)
    }

    /// Question text with the blank replaced by `answer`.
    pub fn filled(&self, answer: &str) -> String {
        if self.text.contains(BLANK) {
            self.text.replacen(BLANK, answer, 1)
        } else {
            format!("{} {}", self.text, answer)
        }
    }
}
