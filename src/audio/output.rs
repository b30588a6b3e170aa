use std::fmt;
use std::sync::{Arc, Mutex};

use serde::Serialize;

use crate::data::music::AudioClip;

/// One of the two music sources. Roles alternate between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Channel {
    A,
    B,
}

impl Channel {
    pub fn other(self) -> Channel {
        match self {
            Channel::A => Channel::B,
            Channel::B => Channel::A,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Channel::A => 0,
            Channel::B => 1,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::A => f.write_str("A"),
            Channel::B => f.write_str("B"),
        }
    }
}

/// Sink for mixer commands. Times are DSP seconds.
pub trait AudioOutput: Send + Sync {
    /// Start `clip` on `channel` at `start_at`, `offset` seconds into the clip.
    fn play(&self, _channel: Channel, _clip: &AudioClip, _start_at: f64, _offset: f64, _looping: bool) {}

    fn stop(&self, _channel: Channel) {}

    fn set_volume(&self, _channel: Channel, _volume: f32) {}
}

/// Drops every command.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl AudioOutput for NullOutput {}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AudioCommand {
    Play {
        channel: Channel,
        clip: String,
        start_at: f64,
        offset: f64,
        looping: bool,
    },
    Stop {
        channel: Channel,
    },
    SetVolume {
        channel: Channel,
        volume: f32,
    },
}

/// Keeps every command in order. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    commands: Arc<Mutex<Vec<AudioCommand>>>,
}

impl RecordingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> Vec<AudioCommand> {
        self.log().clone()
    }

    /// Play commands only, which is what most assertions care about.
    pub fn plays(&self) -> Vec<AudioCommand> {
        self.log()
            .iter()
            .filter(|command| matches!(command, AudioCommand::Play { .. }))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.log().clear();
    }

    fn log(&self) -> std::sync::MutexGuard<'_, Vec<AudioCommand>> {
        match self.commands.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn record(&self, command: AudioCommand) {
        self.log().push(command);
    }
}

impl AudioOutput for RecordingOutput {
    fn play(&self, channel: Channel, clip: &AudioClip, start_at: f64, offset: f64, looping: bool) {
        self.record(AudioCommand::Play {
            channel,
            clip: clip.name.clone(),
            start_at,
            offset,
            looping,
        });
    }

    fn stop(&self, channel: Channel) {
        self.record(AudioCommand::Stop { channel });
    }

    fn set_volume(&self, channel: Channel, volume: f32) {
        self.record(AudioCommand::SetVolume { channel, volume });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_output_tracks_commands_across_clones() {
        let output = RecordingOutput::new();
        let handle = output.clone();
        let clip = AudioClip::new("theme_intro", 48_000, 48_000);
        output.play(Channel::A, &clip, 2.0, 0.5, false);
        output.set_volume(Channel::A, 0.25);
        output.stop(Channel::B);

        assert_eq!(
            handle.commands(),
            vec![
                AudioCommand::Play {
                    channel: Channel::A,
                    clip: "theme_intro".to_string(),
                    start_at: 2.0,
                    offset: 0.5,
                    looping: false,
                },
                AudioCommand::SetVolume {
                    channel: Channel::A,
                    volume: 0.25,
                },
                AudioCommand::Stop { channel: Channel::B },
            ]
        );
        assert_eq!(handle.plays().len(), 1);
        handle.clear();
        assert!(output.commands().is_empty());
    }

    #[test]
    fn channels_alternate() {
        assert_eq!(Channel::A.other(), Channel::B);
        assert_eq!(Channel::B.other().other(), Channel::B);
    }
}
