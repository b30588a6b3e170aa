use std::fmt;

use serde::{Deserialize, Serialize};

use crate::data::questions::QuestionId;

/// Stable clue number. Journals and saves order clues by this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClueId(pub u32);

impl fmt::Display for ClueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The two playable characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Character {
    #[default]
    Detective,
    Partner,
}

impl Character {
    pub fn other(self) -> Self {
        match self {
            Character::Detective => Character::Partner,
            Character::Partner => Character::Detective,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Character::Detective => "DETECTIVE",
            Character::Partner => "PARTNER",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DETECTIVE" => Some(Character::Detective),
            "PARTNER" => Some(Character::Partner),
            _ => None,
        }
    }
}

impl fmt::Display for Character {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClueVisibility {
    #[default]
    Both,
    DetectiveOnly,
    PartnerOnly,
}

impl ClueVisibility {
    pub fn is_visible_to(self, character: Character) -> bool {
        match self {
            ClueVisibility::Both => true,
            ClueVisibility::DetectiveOnly => character == Character::Detective,
            ClueVisibility::PartnerOnly => character == Character::Partner,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Clue {
    pub number: ClueId,
    pub key: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub visibility: ClueVisibility,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub related_questions: Vec<QuestionId>,
    #[serde(default)]
    pub is_fake: bool,
    #[serde(default)]
    pub fake_explanation: Option<String>,
}

impl Clue {
    pub fn new(number: u32, key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            number: ClueId(number),
            key: key.into(),
            name: name.into(),
            description: String::new(),
            icon: None,
            visibility: ClueVisibility::Both,
            location: None,
            related_questions: Vec::new(),
            is_fake: false,
            fake_explanation: None,
        }
    }

    pub fn is_visible_to(&self, character: Character) -> bool {
        self.visibility.is_visible_to(character)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_clues_are_visible_to_both_characters() {
        assert!(ClueVisibility::Both.is_visible_to(Character::Detective));
        assert!(ClueVisibility::Both.is_visible_to(Character::Partner));
    }

    #[test]
    fn single_character_clues_compare_by_owner() {
        assert!(ClueVisibility::DetectiveOnly.is_visible_to(Character::Detective));
        assert!(!ClueVisibility::DetectiveOnly.is_visible_to(Character::Partner));
        assert!(ClueVisibility::PartnerOnly.is_visible_to(Character::Partner));
        assert!(!ClueVisibility::PartnerOnly.is_visible_to(Character::Detective));
    }

    #[test]
    fn character_names_parse_case_insensitively() {
        assert_eq!(Character::parse("partner"), Some(Character::Partner));
        assert_eq!(Character::parse(" Detective "), Some(Character::Detective));
        assert_eq!(Character::parse("butler"), None);
        assert_eq!(Character::Detective.other(), Character::Partner);
    }
}
