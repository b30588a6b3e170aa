use bevy_ecs::prelude::*;
use bevy_utils::tracing::{debug, warn};

use crate::audio::music::MusicSequencer;
use crate::data::catalog::ContentLibrary;
use crate::data::clues::{Character, ClueId};
use crate::data::dialogue::SequenceId;
use crate::data::music::MusicTrack;
use crate::dialogue::sequencer::DialogueSequencer;
use crate::deduction::board::DeductionBoard;
use crate::narrative::conditions::StoryState;
use crate::simulation::clues::{ClueAnnouncements, ClueRegistry};
use crate::simulation::effects::{Effect, PendingEffects};
use crate::simulation::flags::FlagStore;
use crate::simulation::scene::SceneState;
use crate::simulation::time::AudioClock;

/// Upper bound on chained effect rounds applied in one pass.
pub const MAX_EFFECT_ROUNDS: usize = 16;

/// Drain `PendingEffects`, including anything the effects themselves queue.
/// Returns the number of effects applied.
pub fn apply_pending_effects(world: &mut World) -> usize {
    let mut applied = 0;
    for _ in 0..MAX_EFFECT_ROUNDS {
        let batch = world.resource_mut::<PendingEffects>().take();
        if batch.is_empty() {
            return applied;
        }
        for effect in batch {
            apply_effect(world, effect);
            applied += 1;
        }
    }
    let left = world.resource::<PendingEffects>().0.len();
    if left > 0 {
        warn!(left, "effect chain did not settle; deferring to next tick");
    }
    applied
}

pub fn apply_effect(world: &mut World, effect: Effect) {
    debug!(?effect, "applying effect");
    match effect {
        Effect::SetFlag(name) => {
            world.resource_mut::<FlagStore>().set(&name);
        }
        Effect::DiscoverClue(id) => {
            discover_clue(world, id);
        }
        Effect::RevealQuestion(id) => {
            if world.resource::<ContentLibrary>().question(id).is_none() {
                warn!(question = id.0, "reveal of unknown question");
                return;
            }
            world.resource_mut::<DeductionBoard>().reveal(id);
        }
        Effect::ChangeScene(scene) => {
            change_scene(world, &scene);
        }
        Effect::ShowSequence(sequence) => {
            show_sequence(world, &sequence, Vec::new());
        }
    }
}

/// Record a clue and queue its popup. Unknown clue numbers are ignored.
pub fn discover_clue(world: &mut World, id: ClueId) -> bool {
    if world.resource::<ContentLibrary>().clue(id).is_none() {
        warn!(clue = id.0, "discovery of unknown clue");
        return false;
    }
    let discovered = world.resource_mut::<ClueRegistry>().discover(id);
    if discovered {
        world.resource_mut::<ClueAnnouncements>().push(id);
    }
    discovered
}

/// Queue a sequence on the dialogue sequencer. Immediate effects (first line
/// triggers, or completion of a fully gated sequence) land in `PendingEffects`.
pub fn show_sequence(world: &mut World, id: &SequenceId, after: Vec<Effect>) -> bool {
    let mut produced = Vec::new();
    let shown = world.resource_scope(|world, mut dialogue: Mut<DialogueSequencer>| {
        let library = world.resource::<ContentLibrary>();
        let Some(sequence) = library.sequence(id) else {
            warn!(sequence = %id, "unknown dialogue sequence");
            return false;
        };
        let state = StoryState::new(world.resource::<FlagStore>(), world.resource::<ClueRegistry>());
        dialogue.show(sequence, library, state, after, &mut produced);
        true
    });
    world.resource_mut::<PendingEffects>().extend(produced);
    shown
}

/// Move to `scene`, start its music for the current character and queue its
/// entry dialogue. Re-entering the current scene does nothing.
pub fn change_scene(world: &mut World, scene: &str) -> bool {
    if !world.resource_mut::<SceneState>().change_scene(scene) {
        return false;
    }
    let entry = match world.resource::<ContentLibrary>().scene(scene) {
        Some(def) => def.entry_sequence.clone(),
        None => {
            warn!(scene, "entered scene without a definition");
            None
        }
    };
    start_scene_music(world);
    if let Some(entry) = entry {
        world
            .resource_mut::<PendingEffects>()
            .extend([Effect::ShowSequence(entry)]);
    }
    true
}

/// Swap playable character and crossfade to their version of the scene music.
pub fn switch_character(world: &mut World) -> Character {
    let character = world.resource_mut::<SceneState>().switch_character();
    let now = world.resource::<AudioClock>().seconds();
    world.resource_scope(|world, mut music: Mut<MusicSequencer>| {
        if let Some(track) = scene_track(world, character) {
            music.on_character_changed(track, now);
        }
    });
    character
}

/// Start the current scene's track for the current character from the top.
pub fn start_scene_music(world: &mut World) {
    let character = world.resource::<SceneState>().character();
    let now = world.resource::<AudioClock>().seconds();
    world.resource_scope(|world, mut music: Mut<MusicSequencer>| {
        match scene_track(world, character) {
            Some(track) => music.play_character_track(track, now),
            None => debug!("scene has no music for {}", character.as_str()),
        }
    });
}

fn scene_track(world: &World, character: Character) -> Option<&MusicTrack> {
    let library = world.resource::<ContentLibrary>();
    let scene = world.resource::<SceneState>().scene()?;
    let track_id = library.scene(scene)?.track_for(character)?;
    let track = library.track(track_id);
    if track.is_none() {
        warn!(scene, track = track_id, "scene references unknown music track");
    }
    track
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::core::ecs::create_world;
    use crate::data::catalog::ContentCatalog;
    use crate::data::clues::Clue;
    use crate::data::dialogue::{DialogueLine, DialogueSequence, Triggers};
    use crate::data::questions::QuestionId;
    use crate::data::scenes::SceneDef;

    fn library() -> ContentLibrary {
        let mut entry_line = DialogueLine::new("Dust everywhere.");
        entry_line.triggers = Triggers {
            discover_clue: Some(ClueId(1)),
            ..Triggers::default()
        };
        ContentLibrary::from_catalog(ContentCatalog {
            clues: vec![Clue::new(1, "dust", "Dust")],
            sequences: vec![DialogueSequence {
                id: SequenceId::from("attic_entry"),
                lines: vec![entry_line],
                on_complete: Triggers::default(),
            }],
            scenes: vec![SceneDef {
                id: "attic".to_string(),
                name: "Attic".to_string(),
                detective_track: None,
                partner_track: None,
                entry_sequence: Some(SequenceId::from("attic_entry")),
            }],
            ..ContentCatalog::default()
        })
    }

    #[test]
    fn discover_queues_popup_once() {
        let mut world = create_world(&GameConfig::default(), library());
        assert!(discover_clue(&mut world, ClueId(1)));
        assert!(!discover_clue(&mut world, ClueId(1)));
        assert!(!discover_clue(&mut world, ClueId(42)));
        let popups = world.resource::<ClueAnnouncements>();
        assert_eq!(popups.current(), Some(ClueId(1)));
        assert_eq!(popups.pending(), 0);
    }

    #[test]
    fn scene_change_chains_into_entry_dialogue_effects() {
        let mut world = create_world(&GameConfig::default(), library());
        world
            .resource_mut::<PendingEffects>()
            .extend([Effect::ChangeScene("attic".to_string())]);
        apply_pending_effects(&mut world);

        assert_eq!(world.resource::<SceneState>().scene(), Some("attic"));
        assert!(world.resource::<DialogueSequencer>().is_active());
        assert!(world.resource::<ClueRegistry>().has(ClueId(1)));
    }

    #[test]
    fn unknown_question_reveal_is_ignored() {
        let mut world = create_world(&GameConfig::default(), library());
        apply_effect(&mut world, Effect::RevealQuestion(QuestionId(9)));
        assert!(!world.resource::<DeductionBoard>().is_revealed(QuestionId(9)));
    }
}
