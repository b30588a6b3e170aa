use bevy_ecs::prelude::*;
use bevy_ecs::schedule::SystemSet;

use crate::audio::music::MusicSequencer;
use crate::audio::output::NullOutput;
use crate::config::GameConfig;
use crate::data::catalog::ContentLibrary;
use crate::deduction::board::DeductionBoard;
use crate::dialogue::sequencer::DialogueSequencer;
use crate::simulation::clues::{ClueAnnouncements, ClueRegistry};
use crate::simulation::effects::PendingEffects;
use crate::simulation::flags::FlagStore;
use crate::simulation::scene::SceneState;
use crate::simulation::time::{advance_clock_system, AudioClock, FrameClock, FrameInput};
use crate::systems::{apply_effects_system, dialogue_tick_system, music_tick_system};

/// Canonical tick ordering for a session.
#[derive(SystemSet, Debug, Hash, PartialEq, Eq, Clone)]
pub enum TickSet {
    Clock,
    Narrative,
    Audio,
    Effects,
}

/// Build the session world with every service as a resource.
pub fn create_world(config: &GameConfig, library: ContentLibrary) -> World {
    let mut world = World::new();
    world.insert_resource(config.clone());
    world.insert_resource(library);
    world.insert_resource(FrameInput::default());
    world.insert_resource(FrameClock::default());
    world.insert_resource(AudioClock::new(config.music.sample_rate));
    world.insert_resource(FlagStore::default());
    world.insert_resource(ClueRegistry::default());
    world.insert_resource(ClueAnnouncements::default());
    world.insert_resource(SceneState::default());
    world.insert_resource(PendingEffects::default());
    world.insert_resource(DialogueSequencer::new(config.typewriter));
    world.insert_resource(DeductionBoard::new(config.answers, config.rng_seed));
    world.insert_resource(MusicSequencer::new(config.music, NullOutput));
    world
}

/// Build the system schedule in the canonical order.
pub fn create_schedule() -> Schedule {
    let mut schedule = Schedule::default();

    schedule.configure_sets(
        (
            TickSet::Clock,
            TickSet::Narrative,
            TickSet::Audio,
            TickSet::Effects,
        )
            .chain(),
    );

    schedule.add_systems((
        advance_clock_system.in_set(TickSet::Clock),
        dialogue_tick_system.in_set(TickSet::Narrative),
        music_tick_system.in_set(TickSet::Audio),
        apply_effects_system.in_set(TickSet::Effects),
    ));

    schedule
}
