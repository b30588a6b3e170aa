use std::fs;
use std::path::Path;

use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dialogue::typewriter::RevealProfile;

/// Session tuning. Every field has a default so partial files are fine.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub typewriter: RevealProfile,
    pub music: MusicSettings,
    pub answers: AnswerPolicy,
    pub rng_seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            typewriter: RevealProfile::default(),
            music: MusicSettings::default(),
            answers: AnswerPolicy::default(),
            rng_seed: 0x00C0_FFEE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicSettings {
    pub crossfade_seconds: f32,
    pub master_volume: f32,
    pub sample_rate: u32,
}

impl Default for MusicSettings {
    fn default() -> Self {
        Self {
            crossfade_seconds: 1.0,
            master_volume: 1.0,
            sample_rate: 48_000,
        }
    }
}

/// How answer submissions are judged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerPolicy {
    /// When set, the correct text only counts once the correct answer is available.
    /// When clear, correctness is plain text equality and the UI is trusted to gate choices.
    pub enforce_availability: bool,
}

impl Default for AnswerPolicy {
    fn default() -> Self {
        Self {
            enforce_availability: true,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

pub fn load_config(path: impl AsRef<Path>) -> Result<GameConfig, ConfigError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: GameConfig =
            serde_json::from_str(r#"{ "music": { "crossfade_seconds": 2.5 } }"#).expect("parses");
        assert_eq!(config.music.crossfade_seconds, 2.5);
        assert_eq!(config.music.sample_rate, 48_000);
        assert!(config.answers.enforce_availability);
        assert_eq!(config.typewriter, RevealProfile::default());
    }

    #[test]
    fn trusting_policy_can_be_configured() {
        let config: GameConfig =
            serde_json::from_str(r#"{ "answers": { "enforce_availability": false } }"#)
                .expect("parses");
        assert!(!config.answers.enforce_availability);
    }

    #[test]
    fn load_config_reads_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("casebook.json");
        fs::write(&path, r#"{ "rng_seed": 42 }"#).expect("write");
        let config = load_config(&path).expect("loads");
        assert_eq!(config.rng_seed, 42);
        assert!(matches!(
            load_config(dir.path().join("missing.json")),
            Err(ConfigError::Io { .. })
        ));
    }
}
