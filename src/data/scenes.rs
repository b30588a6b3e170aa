use serde::{Deserialize, Serialize};

use crate::data::clues::Character;
use crate::data::dialogue::SequenceId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneDef {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub detective_track: Option<String>,
    #[serde(default)]
    pub partner_track: Option<String>,
    #[serde(default)]
    pub entry_sequence: Option<SequenceId>,
}

impl SceneDef {
    pub fn track_for(&self, character: Character) -> Option<&str> {
        match character {
            Character::Detective => self.detective_track.as_deref(),
            Character::Partner => self.partner_track.as_deref(),
        }
    }
}
