use std::fs;
use std::path::Path;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::clues::{Character, ClueId};
use crate::data::questions::QuestionId;
use crate::deduction::board::{DeductionBoard, SubmittedAnswer};
use crate::dialogue::sequencer::DialogueSequencer;
use crate::simulation::clues::{ClueAnnouncements, ClueRegistry};
use crate::simulation::effects::PendingEffects;
use crate::simulation::flags::FlagStore;
use crate::simulation::scene::SceneState;
use crate::systems::effects::start_scene_music;

pub const SAVE_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("save io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("save json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("{0}")]
    InvalidData(String),
}

/// Progress snapshot: character, scene and everything discovered or answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveState {
    #[serde(default = "default_save_version")]
    pub version: u32,
    #[serde(default)]
    pub character: Character,
    #[serde(default)]
    pub scene: Option<String>,
    #[serde(default)]
    pub flags: Vec<String>,
    #[serde(default)]
    pub clues: Vec<ClueId>,
    #[serde(default)]
    pub revealed_questions: Vec<QuestionId>,
    #[serde(default)]
    pub answers: Vec<SavedAnswer>,
}

fn default_save_version() -> u32 {
    SAVE_VERSION
}

impl Default for SaveState {
    fn default() -> Self {
        Self {
            version: SAVE_VERSION,
            character: Character::default(),
            scene: None,
            flags: Vec::new(),
            clues: Vec::new(),
            revealed_questions: Vec::new(),
            answers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAnswer {
    pub question: QuestionId,
    pub text: String,
    pub correct: bool,
}

/// Extract a serializable snapshot of the session.
pub fn extract_state_from_world(world: &World) -> SaveState {
    let scene = world.resource::<SceneState>();
    let board = world.resource::<DeductionBoard>();
    SaveState {
        version: SAVE_VERSION,
        character: scene.character(),
        scene: scene.scene().map(str::to_string),
        flags: world
            .resource::<FlagStore>()
            .iter()
            .map(str::to_string)
            .collect(),
        clues: world.resource::<ClueRegistry>().found(),
        revealed_questions: board.revealed().collect(),
        answers: board
            .answers()
            .iter()
            .map(|(question, answer)| SavedAnswer {
                question: *question,
                text: answer.text.clone(),
                correct: answer.correct,
            })
            .collect(),
    }
}

/// Replace session progress with `state`.
///
/// Flag and clue observers stay silent; only the character and scene
/// notifications fire. Open dialogue and pending popups are dropped and the
/// scene music restarts.
pub fn apply_state_to_world(state: SaveState, world: &mut World) {
    world.resource_mut::<FlagStore>().restore(state.flags);
    world.resource_mut::<ClueRegistry>().restore(state.clues);
    world.resource_mut::<DeductionBoard>().restore(
        state.revealed_questions,
        state.answers.into_iter().map(|answer| {
            (
                answer.question,
                SubmittedAnswer {
                    text: answer.text,
                    correct: answer.correct,
                },
            )
        }),
    );
    world.resource_mut::<ClueAnnouncements>().clear();
    world.resource_mut::<DialogueSequencer>().force_close();
    world.resource_mut::<PendingEffects>().take();
    world
        .resource_mut::<SceneState>()
        .restore(state.scene, state.character);
    start_scene_music(world);
}

pub fn save_state_to_json(state: &SaveState) -> serde_json::Result<String> {
    serde_json::to_string_pretty(state)
}

pub fn load_state_from_json(data: &str) -> Result<SaveState, SaveError> {
    let state: SaveState = serde_json::from_str(data)?;
    if state.version > SAVE_VERSION {
        return Err(SaveError::InvalidData(format!(
            "save version {} is newer than supported {}",
            state.version, SAVE_VERSION
        )));
    }
    Ok(state)
}

/// Write a save state to a file path.
pub fn save_state_to_path<P: AsRef<Path>>(state: &SaveState, path: P) -> Result<(), SaveError> {
    let json = save_state_to_json(state)?;
    fs::write(path, json)?;
    Ok(())
}

/// Read a save state from a file path.
pub fn load_state_from_path<P: AsRef<Path>>(path: P) -> Result<SaveState, SaveError> {
    let data = fs::read_to_string(&path)?;
    load_state_from_json(&data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SaveState {
        SaveState {
            character: Character::Partner,
            scene: Some("study".to_string()),
            flags: vec!["met_butler".to_string()],
            clues: vec![ClueId(1), ClueId(4)],
            revealed_questions: vec![QuestionId(2)],
            answers: vec![SavedAnswer {
                question: QuestionId(1),
                text: "a knife".to_string(),
                correct: false,
            }],
            ..SaveState::default()
        }
    }

    #[test]
    fn save_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("slot1.json");
        save_state_to_path(&sample(), &path).unwrap();
        assert_eq!(load_state_from_path(&path).unwrap(), sample());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let state = load_state_from_json(r#"{ "flags": ["a"] }"#).unwrap();
        assert_eq!(state.version, SAVE_VERSION);
        assert_eq!(state.character, Character::Detective);
        assert_eq!(state.flags, vec!["a".to_string()]);
    }

    #[test]
    fn newer_save_versions_are_rejected() {
        let err = load_state_from_json(r#"{ "version": 99 }"#).unwrap_err();
        assert!(matches!(err, SaveError::InvalidData(_)));
    }

    #[test]
    fn missing_file_reports_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_state_from_path(dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SaveError::Io(_)));
    }
}
