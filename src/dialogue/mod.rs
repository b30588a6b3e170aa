pub mod sequencer;
pub mod typewriter;

pub use sequencer::{DialogueEvent, DialogueSequencer, DialogueState, LinePhase};
pub use typewriter::{parse_markup, RevealProfile, TextStyle, Typewriter};
