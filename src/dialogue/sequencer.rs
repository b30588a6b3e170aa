use std::collections::VecDeque;

use bevy_ecs::prelude::*;
use bevy_utils::tracing::{debug, warn};

use crate::core::observers::{ObserverId, Observers};
use crate::data::catalog::ContentLibrary;
use crate::data::dialogue::{DialogueLine, DialogueSequence, SequenceId, Speaker};
use crate::dialogue::typewriter::{RevealProfile, TextStyle, Typewriter};
use crate::narrative::conditions::{conditions_met, StoryState};
use crate::simulation::effects::Effect;

#[derive(Debug, Clone, PartialEq)]
pub enum DialogueEvent {
    SequenceQueued { sequence: SequenceId },
    LineStarted {
        sequence: SequenceId,
        line: usize,
        speaker: Option<String>,
        text: String,
    },
    Blip { cue: String },
    LineRevealed { sequence: SequenceId, line: usize },
    SequenceCompleted { sequence: SequenceId },
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinePhase {
    Delay { remaining: f32 },
    Revealing,
    AwaitingAdvance,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DialogueState {
    Idle,
    Playing { line: usize, phase: LinePhase },
}

#[derive(Debug, Clone)]
struct QueuedLine {
    sequence: SequenceId,
    index: usize,
    line: DialogueLine,
    speaker: Option<Speaker>,
}

/// Completion effects owed once the queue runs dry.
#[derive(Debug, Clone)]
struct PendingCompletion {
    sequence: SequenceId,
    effects: Vec<Effect>,
}

#[derive(Debug, Clone)]
struct ActiveLine {
    queued: QueuedLine,
    phase: LinePhase,
    typewriter: Option<Typewriter>,
    blip_cursor: usize,
}

/// Plays dialogue sequences one line at a time.
///
/// A sequence shown while another is playing is appended to the queue; it
/// never interrupts the line on screen. The newest sequence takes over the
/// pending completion, which fires once the whole queue has been dismissed.
#[derive(Resource, Debug)]
pub struct DialogueSequencer {
    queue: VecDeque<QueuedLine>,
    active: Option<ActiveLine>,
    completion: Option<PendingCompletion>,
    default_profile: RevealProfile,
    events: Vec<DialogueEvent>,
    observers: Observers<DialogueSequencer, DialogueEvent>,
}

impl Default for DialogueSequencer {
    fn default() -> Self {
        Self::new(RevealProfile::default())
    }
}

impl DialogueSequencer {
    pub fn new(default_profile: RevealProfile) -> Self {
        Self {
            queue: VecDeque::new(),
            active: None,
            completion: None,
            default_profile,
            events: Vec::new(),
            observers: Observers::default(),
        }
    }

    pub fn state(&self) -> DialogueState {
        match &self.active {
            None => DialogueState::Idle,
            Some(active) => DialogueState::Playing {
                line: active.queued.index,
                phase: active.phase,
            },
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn queued_lines(&self) -> usize {
        self.queue.len()
    }

    pub fn current_sequence(&self) -> Option<&SequenceId> {
        self.active.as_ref().map(|active| &active.queued.sequence)
    }

    pub fn current_speaker(&self) -> Option<&str> {
        let active = self.active.as_ref()?;
        match &active.queued.speaker {
            Some(speaker) => Some(speaker.name.as_str()),
            None => active.queued.line.speaker.as_deref(),
        }
    }

    /// Text revealed so far on the current line.
    pub fn visible_text(&self) -> Option<&str> {
        let active = self.active.as_ref()?;
        Some(active.typewriter.as_ref().map_or("", |t| t.visible_text()))
    }

    /// Queue a sequence. Lines are filtered by their gates now; `after` effects
    /// run alongside the sequence's own completion effects. While dialogue is
    /// playing, this sequence's completion replaces the one pending.
    pub fn show(
        &mut self,
        sequence: &DialogueSequence,
        library: &ContentLibrary,
        state: StoryState<'_>,
        after: Vec<Effect>,
        effects: &mut Vec<Effect>,
    ) {
        let mut completion = sequence.on_complete.effects();
        completion.extend(after);

        let lines: Vec<QueuedLine> = sequence
            .lines
            .iter()
            .enumerate()
            .filter(|(_, line)| conditions_met(&line.conditions, state))
            .map(|(index, line)| QueuedLine {
                sequence: sequence.id.clone(),
                index,
                line: line.clone(),
                speaker: line.speaker.as_deref().and_then(|id| {
                    let speaker = library.speaker(id).cloned();
                    if speaker.is_none() {
                        warn!(speaker = id, sequence = %sequence.id, "unknown speaker");
                    }
                    speaker
                }),
            })
            .collect();

        if lines.is_empty() && self.active.is_none() {
            debug!(sequence = %sequence.id, "no lines pass their gates; completing immediately");
            effects.extend(completion);
            self.emit(DialogueEvent::SequenceCompleted {
                sequence: sequence.id.clone(),
            });
            return;
        }
        let pending = PendingCompletion {
            sequence: sequence.id.clone(),
            effects: completion,
        };
        if let Some(replaced) = self.completion.replace(pending) {
            debug!(replaced = %replaced.sequence, sequence = %sequence.id, "pending completion replaced");
        }

        debug!(sequence = %sequence.id, lines = lines.len(), "dialogue queued");
        self.queue.extend(lines);
        self.emit(DialogueEvent::SequenceQueued {
            sequence: sequence.id.clone(),
        });
        if self.active.is_none() {
            self.start_next(effects);
        }
    }

    /// Advance input. Completes a revealing line, or dismisses a revealed one.
    /// Returns false when there was nothing to advance.
    pub fn advance(&mut self, effects: &mut Vec<Effect>) -> bool {
        let Some(active) = self.active.as_mut() else {
            return false;
        };
        let phase = active.phase;
        match phase {
            LinePhase::Delay { .. } => false,
            LinePhase::Revealing => {
                if let Some(typewriter) = active.typewriter.as_mut() {
                    typewriter.complete();
                }
                active.phase = LinePhase::AwaitingAdvance;
                let event = DialogueEvent::LineRevealed {
                    sequence: active.queued.sequence.clone(),
                    line: active.queued.index,
                };
                self.emit(event);
                true
            }
            LinePhase::AwaitingAdvance => {
                self.active = None;
                self.start_next(effects);
                true
            }
        }
    }

    /// Abandon the queue without firing completion effects.
    pub fn force_close(&mut self) {
        let was_active = self.active.take().is_some();
        self.queue.clear();
        self.completion = None;
        if was_active {
            debug!("dialogue force closed");
            self.emit(DialogueEvent::Closed);
        }
    }

    /// Drive delays and reveal with unscaled time.
    pub fn tick(&mut self, unscaled_delta: f32, effects: &mut Vec<Effect>) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let phase = active.phase;
        match phase {
            LinePhase::Delay { remaining } => {
                let remaining = remaining - unscaled_delta.max(0.0);
                if remaining > 0.0 {
                    active.phase = LinePhase::Delay { remaining };
                } else {
                    self.begin_line(effects);
                }
            }
            LinePhase::Revealing => {
                let mut blips = Vec::new();
                let finished = active
                    .typewriter
                    .as_mut()
                    .map_or(true, |t| t.tick(unscaled_delta, &mut blips));
                let cues: Vec<String> = blips
                    .into_iter()
                    .filter_map(|style| next_cue(active, style))
                    .collect();
                let revealed = if finished {
                    active.phase = LinePhase::AwaitingAdvance;
                    Some(DialogueEvent::LineRevealed {
                        sequence: active.queued.sequence.clone(),
                        line: active.queued.index,
                    })
                } else {
                    None
                };
                for cue in cues {
                    self.emit(DialogueEvent::Blip { cue });
                }
                if let Some(event) = revealed {
                    self.emit(event);
                }
            }
            LinePhase::AwaitingAdvance => {}
        }
    }

    pub fn drain_events(&mut self) -> Vec<DialogueEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn on_event(
        &mut self,
        callback: impl Fn(&DialogueSequencer, &DialogueEvent) + Send + Sync + 'static,
    ) -> ObserverId {
        self.observers.subscribe(callback)
    }

    fn start_next(&mut self, effects: &mut Vec<Effect>) {
        let Some(queued) = self.queue.pop_front() else {
            self.active = None;
            if let Some(completion) = self.completion.take() {
                effects.extend(completion.effects);
                self.emit(DialogueEvent::SequenceCompleted {
                    sequence: completion.sequence,
                });
            }
            self.emit(DialogueEvent::Closed);
            return;
        };
        let delay = queued.line.delay_before;
        self.active = Some(ActiveLine {
            queued,
            phase: LinePhase::Revealing,
            typewriter: None,
            blip_cursor: 0,
        });
        if delay > 0.0 {
            if let Some(active) = self.active.as_mut() {
                active.phase = LinePhase::Delay { remaining: delay };
            }
        } else {
            self.begin_line(effects);
        }
    }

    /// Line triggers fire before any text is revealed.
    fn begin_line(&mut self, effects: &mut Vec<Effect>) {
        let default_profile = self.default_profile;
        let Some(active) = self.active.as_mut() else {
            return;
        };
        effects.extend(active.queued.line.triggers.effects());
        let profile = active
            .queued
            .speaker
            .as_ref()
            .map_or(default_profile, |speaker| profile_for(speaker, default_profile));
        let typewriter = Typewriter::new(&active.queued.line.text, profile);
        let finished = typewriter.is_finished();
        let started = DialogueEvent::LineStarted {
            sequence: active.queued.sequence.clone(),
            line: active.queued.index,
            speaker: active.queued.line.speaker.clone(),
            text: typewriter.full_text().to_string(),
        };
        active.typewriter = Some(typewriter);
        active.phase = if finished {
            LinePhase::AwaitingAdvance
        } else {
            LinePhase::Revealing
        };
        let revealed = finished.then(|| DialogueEvent::LineRevealed {
            sequence: active.queued.sequence.clone(),
            line: active.queued.index,
        });
        self.emit(started);
        if let Some(event) = revealed {
            self.emit(event);
        }
    }

    fn emit(&mut self, event: DialogueEvent) {
        self.observers.emit(self, &event);
        self.events.push(event);
    }
}

pub fn profile_for(speaker: &Speaker, fallback: RevealProfile) -> RevealProfile {
    RevealProfile {
        chars_per_second: speaker.chars_per_second.unwrap_or(fallback.chars_per_second),
        bold_multiplier: speaker.bold_multiplier.unwrap_or(fallback.bold_multiplier),
        italic_multiplier: speaker.italic_multiplier.unwrap_or(fallback.italic_multiplier),
        blip_interval: speaker.blip_interval.unwrap_or(fallback.blip_interval),
    }
}

/// Round-robin through the speaker's cue set for `style`, falling back to the normal set.
fn next_cue(active: &mut ActiveLine, style: TextStyle) -> Option<String> {
    let voice = &active.queued.speaker.as_ref()?.voice;
    let set = match style {
        TextStyle::Bold if !voice.bold.is_empty() => &voice.bold,
        TextStyle::Italic if !voice.italic.is_empty() => &voice.italic,
        _ => &voice.normal,
    };
    if set.is_empty() {
        return None;
    }
    let cue = set[active.blip_cursor % set.len()].clone();
    active.blip_cursor += 1;
    Some(cue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::clues::ClueId;
    use crate::data::dialogue::{Conditions, Triggers, VoiceCues};
    use crate::simulation::clues::ClueRegistry;
    use crate::simulation::flags::FlagStore;

    fn line(text: &str) -> DialogueLine {
        DialogueLine::new(text)
    }

    fn sequence(id: &str, lines: Vec<DialogueLine>) -> DialogueSequence {
        DialogueSequence {
            id: SequenceId::from(id),
            lines,
            on_complete: Triggers::default(),
        }
    }

    struct Fixture {
        flags: FlagStore,
        clues: ClueRegistry,
        library: ContentLibrary,
        sequencer: DialogueSequencer,
        effects: Vec<Effect>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                flags: FlagStore::default(),
                clues: ClueRegistry::default(),
                library: ContentLibrary::default(),
                sequencer: DialogueSequencer::new(RevealProfile {
                    chars_per_second: 10.0,
                    ..RevealProfile::default()
                }),
                effects: Vec::new(),
            }
        }

        fn show(&mut self, seq: &DialogueSequence) {
            let state = StoryState::new(&self.flags, &self.clues);
            self.sequencer
                .show(seq, &self.library, state, Vec::new(), &mut self.effects);
        }

        fn advance(&mut self) -> bool {
            self.sequencer.advance(&mut self.effects)
        }
    }

    #[test]
    fn plays_lines_in_order_and_returns_to_idle() {
        let mut fx = Fixture::new();
        fx.show(&sequence("s", vec![line("One."), line("Two.")]));
        assert!(matches!(
            fx.sequencer.state(),
            DialogueState::Playing { line: 0, phase: LinePhase::Revealing }
        ));
        assert!(fx.advance());
        assert_eq!(fx.sequencer.visible_text(), Some("One."));
        assert!(fx.advance());
        assert!(matches!(
            fx.sequencer.state(),
            DialogueState::Playing { line: 1, .. }
        ));
        assert!(fx.advance());
        assert!(fx.advance());
        assert_eq!(fx.sequencer.state(), DialogueState::Idle);
        assert!(!fx.advance());
    }

    #[test]
    fn advance_during_reveal_only_completes_the_current_line() {
        let mut fx = Fixture::new();
        fx.show(&sequence("s", vec![line("Long sentence."), line("Next.")]));
        fx.sequencer.tick(0.1, &mut fx.effects);
        assert_eq!(fx.sequencer.visible_text(), Some("L"));
        fx.advance();
        assert_eq!(fx.sequencer.visible_text(), Some("Long sentence."));
        assert_eq!(fx.sequencer.queued_lines(), 1);
    }

    #[test]
    fn gated_lines_are_filtered_at_show_time() {
        let mut fx = Fixture::new();
        fx.clues.discover(ClueId(1));
        let mut hidden = line("Hidden.");
        hidden.conditions = Conditions {
            requires_flag: Some("never".to_string()),
            ..Conditions::default()
        };
        let mut skipped = line("Skipped.");
        skipped.conditions = Conditions {
            skip_if_clue: Some(ClueId(1)),
            ..Conditions::default()
        };
        fx.show(&sequence("s", vec![hidden, skipped, line("Shown.")]));
        assert!(matches!(
            fx.sequencer.state(),
            DialogueState::Playing { line: 2, .. }
        ));
        assert_eq!(fx.sequencer.queued_lines(), 0);
    }

    #[test]
    fn line_triggers_fire_before_reveal() {
        let mut fx = Fixture::new();
        let mut first = line("I found a button.");
        first.triggers = Triggers {
            set_flag: Some("saw_button".to_string()),
            discover_clue: Some(ClueId(7)),
            ..Triggers::default()
        };
        fx.show(&sequence("s", vec![first]));
        assert_eq!(fx.sequencer.visible_text(), Some(""));
        assert_eq!(
            fx.effects,
            vec![
                Effect::SetFlag("saw_button".to_string()),
                Effect::DiscoverClue(ClueId(7))
            ]
        );
    }

    #[test]
    fn completion_effects_fire_once_after_last_dismissal() {
        let mut fx = Fixture::new();
        let mut seq = sequence("s", vec![line("a"), line("b")]);
        seq.on_complete.set_flag = Some("done".to_string());
        fx.show(&seq);
        fx.advance();
        fx.advance();
        assert!(fx.effects.is_empty());
        fx.advance();
        assert!(fx.effects.is_empty());
        fx.advance();
        assert_eq!(fx.effects, vec![Effect::SetFlag("done".to_string())]);
        let completed = fx
            .sequencer
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, DialogueEvent::SequenceCompleted { .. }))
            .count();
        assert_eq!(completed, 1);
    }

    #[test]
    fn second_sequence_is_appended_not_interrupting() {
        let mut fx = Fixture::new();
        let mut first = sequence("first", vec![line("a")]);
        first.on_complete.set_flag = Some("first_done".to_string());
        let mut second = sequence("second", vec![line("b")]);
        second.on_complete.set_flag = Some("second_done".to_string());
        fx.show(&first);
        fx.show(&second);
        assert_eq!(fx.sequencer.current_sequence().map(|s| s.as_str()), Some("first"));
        assert_eq!(fx.sequencer.queued_lines(), 1);
        fx.advance();
        fx.advance();
        assert!(fx.effects.is_empty(), "nothing completes while lines remain queued");
        assert_eq!(fx.sequencer.current_sequence().map(|s| s.as_str()), Some("second"));
        fx.advance();
        fx.advance();
        assert_eq!(fx.effects, vec![Effect::SetFlag("second_done".to_string())]);
        assert_eq!(fx.sequencer.state(), DialogueState::Idle);
        let completed: Vec<DialogueEvent> = fx
            .sequencer
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, DialogueEvent::SequenceCompleted { .. }))
            .collect();
        assert_eq!(
            completed,
            vec![DialogueEvent::SequenceCompleted {
                sequence: SequenceId::from("second")
            }]
        );
    }

    #[test]
    fn gated_out_sequence_shown_mid_dialogue_takes_over_completion() {
        let mut fx = Fixture::new();
        let mut first = sequence("first", vec![line("a")]);
        first.on_complete.set_flag = Some("first_done".to_string());
        let mut gated = line("never");
        gated.conditions.requires_flag = Some("missing".to_string());
        let mut empty = sequence("empty", vec![gated]);
        empty.on_complete.set_flag = Some("empty_done".to_string());
        fx.show(&first);
        fx.show(&empty);
        assert!(fx.effects.is_empty());
        fx.advance();
        fx.advance();
        assert_eq!(fx.effects, vec![Effect::SetFlag("empty_done".to_string())]);
    }

    #[test]
    fn force_close_drops_pending_completion() {
        let mut fx = Fixture::new();
        let mut seq = sequence("s", vec![line("a")]);
        seq.on_complete.set_flag = Some("done".to_string());
        fx.show(&seq);
        fx.sequencer.force_close();
        fx.show(&sequence("t", vec![line("b")]));
        fx.advance();
        fx.advance();
        assert!(fx.effects.is_empty());
    }

    #[test]
    fn force_close_skips_completion() {
        let mut fx = Fixture::new();
        let mut seq = sequence("s", vec![line("a"), line("b")]);
        seq.on_complete.set_flag = Some("done".to_string());
        fx.show(&seq);
        fx.sequencer.force_close();
        assert_eq!(fx.sequencer.state(), DialogueState::Idle);
        assert_eq!(fx.sequencer.queued_lines(), 0);
        assert!(fx.effects.is_empty());
        assert!(fx.sequencer.drain_events().contains(&DialogueEvent::Closed));
    }

    #[test]
    fn delay_before_holds_the_line_and_its_triggers() {
        let mut fx = Fixture::new();
        let mut delayed = line("...");
        delayed.delay_before = 1.0;
        delayed.triggers.set_flag = Some("paused".to_string());
        fx.show(&sequence("s", vec![delayed]));
        assert!(matches!(
            fx.sequencer.state(),
            DialogueState::Playing { phase: LinePhase::Delay { .. }, .. }
        ));
        assert!(!fx.advance());
        fx.sequencer.tick(0.5, &mut fx.effects);
        assert!(fx.effects.is_empty());
        fx.sequencer.tick(0.5, &mut fx.effects);
        assert_eq!(fx.effects, vec![Effect::SetFlag("paused".to_string())]);
        assert!(matches!(
            fx.sequencer.state(),
            DialogueState::Playing { phase: LinePhase::Revealing, .. }
        ));
    }

    #[test]
    fn fully_filtered_sequence_completes_immediately() {
        let mut fx = Fixture::new();
        let mut gated = line("never");
        gated.conditions.requires_flag = Some("missing".to_string());
        let mut seq = sequence("s", vec![gated]);
        seq.on_complete.discover_clue = Some(ClueId(3));
        fx.show(&seq);
        assert_eq!(fx.sequencer.state(), DialogueState::Idle);
        assert_eq!(fx.effects, vec![Effect::DiscoverClue(ClueId(3))]);
    }

    #[test]
    fn speaker_voice_cues_follow_reveal() {
        let mut fx = Fixture::new();
        fx.library.speakers.insert(
            "maid".to_string(),
            Speaker {
                id: "maid".to_string(),
                name: "The Maid".to_string(),
                chars_per_second: Some(100.0),
                bold_multiplier: None,
                italic_multiplier: None,
                blip_interval: Some(1),
                voice: VoiceCues {
                    normal: vec!["tick_a".to_string(), "tick_b".to_string()],
                    bold: Vec::new(),
                    italic: Vec::new(),
                },
            },
        );
        let mut spoken = line("abc");
        spoken.speaker = Some("maid".to_string());
        fx.show(&sequence("s", vec![spoken]));
        assert_eq!(fx.sequencer.current_speaker(), Some("The Maid"));
        fx.sequencer.tick(1.0, &mut fx.effects);
        let cues: Vec<String> = fx
            .sequencer
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                DialogueEvent::Blip { cue } => Some(cue),
                _ => None,
            })
            .collect();
        assert_eq!(cues, vec!["tick_a", "tick_b", "tick_a"]);
        assert!(matches!(
            fx.sequencer.state(),
            DialogueState::Playing { phase: LinePhase::AwaitingAdvance, .. }
        ));
    }
}
