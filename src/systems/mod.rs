pub mod effects;

use bevy_ecs::prelude::*;

use crate::audio::music::MusicSequencer;
use crate::dialogue::sequencer::DialogueSequencer;
use crate::simulation::effects::PendingEffects;
use crate::simulation::time::{AudioClock, FrameClock};

/// System: drives dialogue delays and typewriter reveal on unscaled time.
pub fn dialogue_tick_system(
    clock: Res<FrameClock>,
    mut dialogue: ResMut<DialogueSequencer>,
    mut pending: ResMut<PendingEffects>,
) {
    let mut effects = Vec::new();
    dialogue.tick(clock.unscaled_delta, &mut effects);
    pending.extend(effects);
}

/// System: advances music fades and handoffs against the DSP clock.
pub fn music_tick_system(audio: Res<AudioClock>, mut music: ResMut<MusicSequencer>) {
    music.tick(audio.seconds());
}

/// Exclusive system: applies every effect queued during the tick.
pub fn apply_effects_system(world: &mut World) {
    effects::apply_pending_effects(world);
}
