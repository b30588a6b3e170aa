pub mod music;
pub mod output;

pub use music::{MusicEvent, MusicSequencer, MusicState};
pub use output::{AudioCommand, AudioOutput, Channel, NullOutput, RecordingOutput};
