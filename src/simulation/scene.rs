use bevy_ecs::prelude::*;
use bevy_utils::tracing::debug;

use crate::core::observers::{ObserverId, Observers};
use crate::data::clues::Character;

/// Active scene and playable character.
#[derive(Resource, Debug, Default)]
pub struct SceneState {
    scene: Option<String>,
    character: Character,
    on_scene_changed: Observers<SceneState, str>,
    on_character_changed: Observers<SceneState, Character>,
}

impl SceneState {
    pub fn scene(&self) -> Option<&str> {
        self.scene.as_deref()
    }

    pub fn character(&self) -> Character {
        self.character
    }

    /// Returns false (and stays quiet) when already in `scene`.
    pub fn change_scene(&mut self, scene: &str) -> bool {
        let scene = scene.trim();
        if scene.is_empty() || self.scene.as_deref() == Some(scene) {
            return false;
        }
        debug!(scene, "scene changed");
        self.scene = Some(scene.to_string());
        self.on_scene_changed.emit(self, scene);
        true
    }

    pub fn set_character(&mut self, character: Character) -> bool {
        if self.character == character {
            return false;
        }
        debug!(character = character.as_str(), "character changed");
        self.character = character;
        self.on_character_changed.emit(self, &character);
        true
    }

    pub fn switch_character(&mut self) -> Character {
        let next = self.character.other();
        self.set_character(next);
        next
    }

    /// Save loading: both notifications fire unconditionally so listeners resync.
    pub fn restore(&mut self, scene: Option<String>, character: Character) {
        self.scene = scene.filter(|s| !s.trim().is_empty());
        self.character = character;
        self.on_character_changed.emit(self, &character);
        if let Some(scene) = self.scene.as_deref() {
            self.on_scene_changed.emit(self, scene);
        }
    }

    pub fn on_scene_changed(
        &mut self,
        callback: impl Fn(&SceneState, &str) + Send + Sync + 'static,
    ) -> ObserverId {
        self.on_scene_changed.subscribe(callback)
    }

    pub fn on_character_changed(
        &mut self,
        callback: impl Fn(&SceneState, &Character) + Send + Sync + 'static,
    ) -> ObserverId {
        self.on_character_changed.subscribe(callback)
    }
}
