// Re-export core modules for use by the binary or other consumers
pub mod audio;
pub mod config;
pub mod core;
pub mod data;
pub mod deduction;
pub mod dialogue;
pub mod narrative;
pub mod persistence;
pub mod simulation;
pub mod systems;
pub mod ui;
pub mod world;

// Expose the main Game wrapper and types needed for interaction
pub use crate::config::{load_config, GameConfig};
pub use crate::core::serialization::{SaveError, SaveState};
pub use crate::core::world::{DialogueView, Game, Snapshot};
pub use crate::data::{load_content_catalog, ContentError, ContentLibrary};
