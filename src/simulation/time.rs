use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Raw timing for one frame, supplied by whatever drives the session.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct FrameInput {
    /// Wall time since the previous frame, in seconds.
    pub unscaled_delta: f32,
    /// Absolute DSP position in output samples. `None` derives it from `unscaled_delta`.
    pub dsp_samples: Option<u64>,
}

impl FrameInput {
    pub fn seconds(delta: f32) -> Self {
        Self {
            unscaled_delta: delta.max(0.0),
            dsp_samples: None,
        }
    }
}

/// Frame clock with a pausable, scaled timeline and an unscaled one.
///
/// Dialogue runs on unscaled time because it commonly plays while the game is paused.
#[derive(Resource, Debug, Clone, Serialize, Deserialize)]
pub struct FrameClock {
    pub frame: u64,
    pub delta: f32,
    pub unscaled_delta: f32,
    pub elapsed: f64,
    pub unscaled_elapsed: f64,
    pub time_scale: f32,
    pub paused: bool,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self {
            frame: 0,
            delta: 0.0,
            unscaled_delta: 0.0,
            elapsed: 0.0,
            unscaled_elapsed: 0.0,
            time_scale: 1.0,
            paused: false,
        }
    }
}

impl FrameClock {
    pub fn advance(&mut self, unscaled_delta: f32) {
        let unscaled_delta = unscaled_delta.max(0.0);
        self.frame += 1;
        self.unscaled_delta = unscaled_delta;
        self.unscaled_elapsed += unscaled_delta as f64;
        self.delta = if self.paused {
            0.0
        } else {
            unscaled_delta * self.time_scale.max(0.0)
        };
        self.elapsed += self.delta as f64;
    }
}

/// Monotonic audio clock counted in output samples.
#[derive(Resource, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AudioClock {
    pub sample_rate: u32,
    pub samples: u64,
}

impl Default for AudioClock {
    fn default() -> Self {
        Self::new(48_000)
    }
}

impl AudioClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate.max(1),
            samples: 0,
        }
    }

    /// DSP time in seconds.
    pub fn seconds(&self) -> f64 {
        self.samples as f64 / self.sample_rate as f64
    }

    pub fn advance_seconds(&mut self, delta: f32) {
        let step = (delta.max(0.0) as f64 * self.sample_rate as f64).round() as u64;
        self.samples += step;
    }

    /// Sync to an external DSP counter. The clock never runs backwards.
    pub fn sync(&mut self, samples: u64) {
        self.samples = self.samples.max(samples);
    }
}

/// System: applies the frame input to both clocks.
pub fn advance_clock_system(
    input: Res<FrameInput>,
    mut clock: ResMut<FrameClock>,
    mut audio: ResMut<AudioClock>,
) {
    clock.advance(input.unscaled_delta);
    match input.dsp_samples {
        Some(samples) => audio.sync(samples),
        None => audio.advance_seconds(input.unscaled_delta),
    }
}
