use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use bevy_ecs::prelude::*;
use bevy_utils::tracing::warn;
use serde::{Deserialize, Serialize};

use crate::data::clues::{Clue, ClueId};
use crate::data::dialogue::{DialogueSequence, Interactable, SequenceId, Speaker, Triggers};
use crate::data::music::MusicTrack;
use crate::data::questions::{Question, QuestionId};
use crate::data::scenes::SceneDef;

pub const CONTENT_SCHEMA_VERSION: u32 = 1;

/// On-disk content bundle authored by designers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentCatalog {
    pub schema_version: u32,
    /// Scene a new game opens in.
    #[serde(default)]
    pub start_scene: Option<String>,
    #[serde(default)]
    pub clues: Vec<Clue>,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub speakers: Vec<Speaker>,
    #[serde(default)]
    pub sequences: Vec<DialogueSequence>,
    #[serde(default)]
    pub interactables: Vec<Interactable>,
    #[serde(default)]
    pub tracks: Vec<MusicTrack>,
    #[serde(default)]
    pub scenes: Vec<SceneDef>,
}

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0}")]
    Validation(String),
}

pub fn load_content_catalog(path: impl AsRef<Path>) -> Result<ContentCatalog, ContentError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ContentError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let catalog: ContentCatalog =
        serde_json::from_str(&raw).map_err(|source| ContentError::Json {
            path: path.display().to_string(),
            source,
        })?;
    catalog.validate()?;
    Ok(catalog)
}

fn check_unique<K, I>(kind: &str, keys: I) -> Result<(), ContentError>
where
    K: std::fmt::Display + Eq + std::hash::Hash,
    I: IntoIterator<Item = K>,
{
    let mut seen = HashSet::new();
    for key in keys {
        let label = key.to_string();
        if label.trim().is_empty() {
            return Err(ContentError::Validation(format!("{} id cannot be empty", kind)));
        }
        if !seen.insert(key) {
            return Err(ContentError::Validation(format!(
                "duplicate {} id {}",
                kind, label
            )));
        }
    }
    Ok(())
}

impl ContentCatalog {
    /// Hard errors only: structural problems that make lookups ambiguous.
    pub fn validate(&self) -> Result<(), ContentError> {
        if self.schema_version != CONTENT_SCHEMA_VERSION {
            return Err(ContentError::Validation(format!(
                "unsupported content schema {} (expected {})",
                self.schema_version, CONTENT_SCHEMA_VERSION
            )));
        }
        check_unique("clue", self.clues.iter().map(|c| c.number))?;
        check_unique("clue key", self.clues.iter().map(|c| c.key.as_str()))?;
        check_unique("question", self.questions.iter().map(|q| q.id))?;
        check_unique("speaker", self.speakers.iter().map(|s| s.id.as_str()))?;
        check_unique("sequence", self.sequences.iter().map(|s| s.id.as_str()))?;
        check_unique("interactable", self.interactables.iter().map(|i| i.id.as_str()))?;
        check_unique("track", self.tracks.iter().map(|t| t.id.as_str()))?;
        check_unique("scene", self.scenes.iter().map(|s| s.id.as_str()))?;

        for question in &self.questions {
            if question.text.trim().is_empty() {
                return Err(ContentError::Validation(format!(
                    "question {} missing text",
                    question.id
                )));
            }
            if question.correct.text.trim().is_empty() {
                return Err(ContentError::Validation(format!(
                    "question {} has an empty correct answer",
                    question.id
                )));
            }
        }
        Ok(())
    }
}

/// Indexed, immutable content shared by every system of a session.
#[derive(Resource, Debug, Default, Clone)]
pub struct ContentLibrary {
    pub start_scene: Option<String>,
    pub clues: BTreeMap<ClueId, Clue>,
    pub questions: BTreeMap<QuestionId, Question>,
    pub speakers: BTreeMap<String, Speaker>,
    pub sequences: BTreeMap<SequenceId, DialogueSequence>,
    pub interactables: BTreeMap<String, Interactable>,
    pub tracks: BTreeMap<String, MusicTrack>,
    pub scenes: BTreeMap<String, SceneDef>,
}

impl ContentLibrary {
    pub fn from_catalog(catalog: ContentCatalog) -> Self {
        let library = Self {
            start_scene: catalog.start_scene,
            clues: catalog.clues.into_iter().map(|c| (c.number, c)).collect(),
            questions: catalog.questions.into_iter().map(|q| (q.id, q)).collect(),
            speakers: catalog
                .speakers
                .into_iter()
                .map(|s| (s.id.clone(), s))
                .collect(),
            sequences: catalog
                .sequences
                .into_iter()
                .map(|s| (s.id.clone(), s))
                .collect(),
            interactables: catalog
                .interactables
                .into_iter()
                .map(|i| (i.id.clone(), i))
                .collect(),
            tracks: catalog.tracks.into_iter().map(|t| (t.id.clone(), t)).collect(),
            scenes: catalog.scenes.into_iter().map(|s| (s.id.clone(), s)).collect(),
        };
        for warning in library.lint() {
            warn!("content: {}", warning);
        }
        library
    }

    pub fn clue(&self, id: ClueId) -> Option<&Clue> {
        self.clues.get(&id)
    }

    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.get(&id)
    }

    pub fn speaker(&self, id: &str) -> Option<&Speaker> {
        self.speakers.get(id)
    }

    pub fn sequence(&self, id: &SequenceId) -> Option<&DialogueSequence> {
        self.sequences.get(id)
    }

    pub fn interactable(&self, id: &str) -> Option<&Interactable> {
        self.interactables.get(id)
    }

    pub fn track(&self, id: &str) -> Option<&MusicTrack> {
        self.tracks.get(id)
    }

    pub fn scene(&self, id: &str) -> Option<&SceneDef> {
        self.scenes.get(id)
    }

    /// Dangling references. Partial content is normal while authoring, so these only warn.
    pub fn lint(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let check_triggers = |owner: String, triggers: &Triggers, warnings: &mut Vec<String>| {
            if let Some(clue) = triggers.discover_clue {
                if !self.clues.contains_key(&clue) {
                    warnings.push(format!("{} discovers unknown clue {}", owner, clue));
                }
            }
            if let Some(question) = triggers.reveal_question {
                if !self.questions.contains_key(&question) {
                    warnings.push(format!("{} reveals unknown question {}", owner, question));
                }
            }
            if let Some(scene) = &triggers.change_scene {
                if !self.scenes.contains_key(scene) {
                    warnings.push(format!("{} changes to unknown scene {}", owner, scene));
                }
            }
        };

        for sequence in self.sequences.values() {
            if sequence.lines.is_empty() {
                warnings.push(format!("sequence {} has no lines", sequence.id));
            }
            for (index, line) in sequence.lines.iter().enumerate() {
                if let Some(speaker) = &line.speaker {
                    if !self.speakers.contains_key(speaker) {
                        warnings.push(format!(
                            "sequence {} line {} uses unknown speaker {}",
                            sequence.id, index, speaker
                        ));
                    }
                }
                check_triggers(
                    format!("sequence {} line {}", sequence.id, index),
                    &line.triggers,
                    &mut warnings,
                );
            }
            check_triggers(
                format!("sequence {} completion", sequence.id),
                &sequence.on_complete,
                &mut warnings,
            );
        }

        for interactable in self.interactables.values() {
            for entry in &interactable.dialogues {
                if !self.sequences.contains_key(&entry.sequence) {
                    warnings.push(format!(
                        "interactable {} references unknown sequence {}",
                        interactable.id, entry.sequence
                    ));
                }
            }
            if let Some(fallback) = &interactable.fallback {
                if !self.sequences.contains_key(fallback) {
                    warnings.push(format!(
                        "interactable {} falls back to unknown sequence {}",
                        interactable.id, fallback
                    ));
                }
            }
        }

        for question in self.questions.values() {
            for answer in question.answers() {
                for clue in &answer.required_clues {
                    if !self.clues.contains_key(clue) {
                        warnings.push(format!(
                            "question {} answer '{}' requires unknown clue {}",
                            question.id, answer.text, clue
                        ));
                    }
                }
            }
            for follow_up in [&question.on_correct, &question.on_wrong].into_iter().flatten() {
                if !self.sequences.contains_key(follow_up) {
                    warnings.push(format!(
                        "question {} follows up with unknown sequence {}",
                        question.id, follow_up
                    ));
                }
            }
        }

        for track in self.tracks.values() {
            if !track.is_valid() {
                warnings.push(format!("track {} has no playable clip", track.id));
            }
        }

        if let Some(start) = &self.start_scene {
            if !self.scenes.contains_key(start) {
                warnings.push(format!("start scene {} is not defined", start));
            }
        }

        for scene in self.scenes.values() {
            for track in [&scene.detective_track, &scene.partner_track].into_iter().flatten() {
                if !self.tracks.contains_key(track) {
                    warnings.push(format!("scene {} uses unknown track {}", scene.id, track));
                }
            }
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "schema_version": 1,
        "clues": [
            { "number": 1, "key": "torn_note", "name": "Torn note", "description": "Half a page." }
        ],
        "sequences": [
            { "id": "intro", "lines": [ { "text": "Hello.", "speaker": "ghost" } ] }
        ]
    }"#;

    #[test]
    fn minimal_catalog_parses_and_validates() {
        let catalog: ContentCatalog = serde_json::from_str(MINIMAL).expect("catalog parses");
        catalog.validate().expect("catalog validates");
        let library = ContentLibrary::from_catalog(catalog);
        assert!(library.clue(ClueId(1)).is_some());
        assert!(library.sequence(&SequenceId::from("intro")).is_some());
    }

    #[test]
    fn lint_reports_unknown_speaker_without_failing() {
        let catalog: ContentCatalog = serde_json::from_str(MINIMAL).expect("catalog parses");
        let library = ContentLibrary::from_catalog(catalog);
        let warnings = library.lint();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("unknown speaker ghost"));
    }

    #[test]
    fn duplicate_clue_numbers_fail_validation() {
        let mut catalog: ContentCatalog = serde_json::from_str(MINIMAL).expect("catalog parses");
        let duplicate = catalog.clues[0].clone();
        catalog.clues.push(Clue {
            key: "other".to_string(),
            ..duplicate
        });
        let err = catalog.validate().expect_err("duplicate must fail");
        assert!(err.to_string().contains("duplicate clue id"));
    }

    #[test]
    fn wrong_schema_version_is_rejected() {
        let catalog = ContentCatalog {
            schema_version: 99,
            ..ContentCatalog::default()
        };
        assert!(matches!(catalog.validate(), Err(ContentError::Validation(_))));
    }

    #[test]
    fn bundled_case_loads_without_warnings() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/assets/content/case01.json");
        let catalog = load_content_catalog(path).expect("bundled case loads");
        let library = ContentLibrary::from_catalog(catalog);
        assert_eq!(library.lint(), Vec::<String>::new());
        assert_eq!(library.start_scene.as_deref(), Some("study"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_content_catalog("/nonexistent/casebook.json").expect_err("no file");
        assert!(err.to_string().contains("/nonexistent/casebook.json"));
    }
}
