use std::path::Path;

use bevy_ecs::prelude::*;
use bevy_utils::tracing::{debug, info, warn};

use crate::audio::music::{MusicEvent, MusicSequencer, MusicState};
use crate::audio::output::AudioOutput;
use crate::config::GameConfig;
use crate::core::ecs::{create_schedule, create_world};
use crate::core::serialization::{
    apply_state_to_world, extract_state_from_world, load_state_from_path, save_state_to_path,
    SaveError, SaveState,
};
use crate::data::catalog::ContentLibrary;
use crate::data::clues::{Character, Clue, ClueId};
use crate::data::dialogue::SequenceId;
use crate::data::questions::{Question, QuestionId};
use crate::deduction::board::{DeductionBoard, SubmittedAnswer};
use crate::dialogue::sequencer::{DialogueEvent, DialogueSequencer, DialogueState, LinePhase};
use crate::narrative::conditions::StoryState;
use crate::narrative::resolver::resolve_interactable;
use crate::simulation::clues::{ClueAnnouncements, ClueRegistry};
use crate::simulation::effects::{Effect, PendingEffects};
use crate::simulation::flags::FlagStore;
use crate::simulation::scene::SceneState;
use crate::simulation::time::{AudioClock, FrameClock, FrameInput};
use crate::systems::effects::{
    apply_pending_effects, change_scene, discover_clue, show_sequence, switch_character,
};
use crate::world::repository::SaveRepository;

/// Line currently on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogueView {
    pub sequence: SequenceId,
    pub line: usize,
    pub phase: LinePhase,
    pub speaker: Option<String>,
    pub text: String,
}

/// Data snapshot returned to the UI layer after each tick.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub frame: u64,
    pub character: Character,
    pub scene: Option<String>,
    pub dialogue: Option<DialogueView>,
    pub queued_lines: usize,
    pub clue_popup: Option<ClueId>,
    pub pending_popups: usize,
    pub music_state: MusicState,
    pub music_track: Option<String>,
    pub flags: usize,
    pub clues_found: usize,
    pub dialogue_events: Vec<DialogueEvent>,
    pub music_events: Vec<MusicEvent>,
}

/// Wrapper around the session world and schedule.
pub struct Game {
    world: World,
    schedule: Schedule,
}

impl Game {
    pub fn new(library: ContentLibrary, config: GameConfig) -> Self {
        let world = create_world(&config, library);
        let schedule = create_schedule();
        info!(
            clues = world.resource::<ContentLibrary>().clues.len(),
            questions = world.resource::<ContentLibrary>().questions.len(),
            "session created"
        );
        Self { world, schedule }
    }

    /// Route music commands to a mixer.
    pub fn set_audio_output(&mut self, output: impl AudioOutput + 'static) {
        self.world.resource_mut::<MusicSequencer>().set_output(output);
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn library(&self) -> &ContentLibrary {
        self.world.resource::<ContentLibrary>()
    }

    /// Run one frame of `delta` wall seconds.
    pub fn tick(&mut self, delta: f32) -> Snapshot {
        self.tick_frame(FrameInput::seconds(delta))
    }

    pub fn tick_frame(&mut self, input: FrameInput) -> Snapshot {
        self.world.insert_resource(input);
        self.schedule.run(&mut self.world);
        self.snapshot()
    }

    /// Capture the current view, draining event logs accumulated since the last one.
    pub fn snapshot(&mut self) -> Snapshot {
        Snapshot::capture(&mut self.world)
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.world.resource_mut::<FrameClock>().paused = paused;
    }

    pub fn set_time_scale(&mut self, scale: f32) {
        self.world.resource_mut::<FrameClock>().time_scale = scale.max(0.0);
    }

    pub fn set_flag(&mut self, name: &str) -> bool {
        self.world.resource_mut::<FlagStore>().set(name)
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.world.resource::<FlagStore>().has(name)
    }

    pub fn remove_flag(&mut self, name: &str) -> bool {
        self.world.resource_mut::<FlagStore>().remove(name)
    }

    pub fn flags(&self) -> Vec<String> {
        self.world
            .resource::<FlagStore>()
            .iter()
            .map(str::to_string)
            .collect()
    }

    pub fn discover_clue(&mut self, id: ClueId) -> bool {
        discover_clue(&mut self.world, id)
    }

    pub fn has_clue(&self, id: ClueId) -> bool {
        self.world.resource::<ClueRegistry>().has(id)
    }

    pub fn found_clues(&self) -> Vec<ClueId> {
        self.world.resource::<ClueRegistry>().found()
    }

    /// Found clues the current character may see, in clue-number order.
    pub fn journal(&self) -> Vec<Clue> {
        let character = self.character();
        self.world
            .resource::<ClueRegistry>()
            .found_for(character, self.library())
            .into_iter()
            .cloned()
            .collect()
    }

    /// Close the clue popup on screen; returns the next one, if any.
    pub fn dismiss_clue_popup(&mut self) -> Option<ClueId> {
        self.world.resource_mut::<ClueAnnouncements>().dismiss()
    }

    /// Talk to / inspect an object. Returns the sequence that was queued.
    pub fn interact(&mut self, object_id: &str) -> Option<SequenceId> {
        let choice = {
            let library = self.world.resource::<ContentLibrary>();
            let Some(interactable) = library.interactable(object_id) else {
                warn!(object = object_id, "interaction with unknown object");
                return None;
            };
            let state = StoryState::new(
                self.world.resource::<FlagStore>(),
                self.world.resource::<ClueRegistry>(),
            );
            resolve_interactable(interactable, state)
        };
        let Some(choice) = choice else {
            debug!(object = object_id, "nothing to say");
            return None;
        };
        if !show_sequence(&mut self.world, &choice.sequence, choice.after) {
            return None;
        }
        if let Some(flag) = &choice.play_once_flag {
            self.world.resource_mut::<FlagStore>().set(flag);
        }
        apply_pending_effects(&mut self.world);
        Some(choice.sequence)
    }

    pub fn show_dialogue(&mut self, sequence: &SequenceId) -> bool {
        let shown = show_sequence(&mut self.world, sequence, Vec::new());
        apply_pending_effects(&mut self.world);
        shown
    }

    pub fn advance_dialogue(&mut self) -> bool {
        let mut effects = Vec::new();
        let advanced = self
            .world
            .resource_mut::<DialogueSequencer>()
            .advance(&mut effects);
        self.apply(effects);
        advanced
    }

    pub fn force_close_dialogue(&mut self) {
        self.world.resource_mut::<DialogueSequencer>().force_close();
    }

    pub fn dialogue_state(&self) -> DialogueState {
        self.world.resource::<DialogueSequencer>().state()
    }

    pub fn reveal_question(&mut self, id: QuestionId) {
        self.apply([Effect::RevealQuestion(id)]);
    }

    /// Questions on the board, ordered by category then display order.
    pub fn visible_questions(&self) -> Vec<Question> {
        let state = self.story_state();
        self.world
            .resource::<DeductionBoard>()
            .visible_questions(self.library(), state)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Shuffled answer texts currently selectable for a question.
    pub fn answer_options(&mut self, id: QuestionId) -> Vec<String> {
        self.world
            .resource_scope(|world, mut board: Mut<DeductionBoard>| {
                let library = world.resource::<ContentLibrary>();
                let Some(question) = library.question(id) else {
                    return Vec::new();
                };
                let state = StoryState::new(world.resource::<FlagStore>(), world.resource::<ClueRegistry>());
                board.answer_choices(question, state)
            })
    }

    /// Record an answer and queue its follow-up dialogue. `None` for unknown questions.
    pub fn submit_answer(&mut self, id: QuestionId, text: &str) -> Option<bool> {
        let submission = self
            .world
            .resource_scope(|world, mut board: Mut<DeductionBoard>| {
                let state = StoryState::new(world.resource::<FlagStore>(), world.resource::<ClueRegistry>());
                board.submit_by_id(world.resource::<ContentLibrary>(), id, text, state)
            })?;
        if let Some(sequence) = submission.follow_up {
            self.apply([Effect::ShowSequence(sequence)]);
        }
        Some(submission.correct)
    }

    pub fn answer(&self, id: QuestionId) -> Option<SubmittedAnswer> {
        self.world.resource::<DeductionBoard>().answer(id).cloned()
    }

    pub fn is_case_solved(&self) -> bool {
        let state = self.story_state();
        self.world
            .resource::<DeductionBoard>()
            .is_solved(self.library(), state)
    }

    pub fn character(&self) -> Character {
        self.world.resource::<SceneState>().character()
    }

    pub fn scene(&self) -> Option<&str> {
        self.world.resource::<SceneState>().scene()
    }

    pub fn switch_character(&mut self) -> Character {
        switch_character(&mut self.world)
    }

    pub fn change_scene(&mut self, scene: &str) -> bool {
        let changed = change_scene(&mut self.world, scene);
        apply_pending_effects(&mut self.world);
        changed
    }

    /// Play a track's clip once over the scene music.
    pub fn play_one_shot(&mut self, track_id: &str) -> bool {
        let clip = self.library().track(track_id).and_then(|track| {
            track
                .playable_loop()
                .or_else(|| track.playable_intro())
                .cloned()
        });
        let Some(clip) = clip else {
            warn!(track = track_id, "one-shot track missing or has no playable clip");
            return false;
        };
        let now = self.dsp_seconds();
        self.world
            .resource_mut::<MusicSequencer>()
            .play_one_shot(&clip, now);
        true
    }

    pub fn return_to_scene_music(&mut self) -> bool {
        let now = self.dsp_seconds();
        self.world
            .resource_mut::<MusicSequencer>()
            .return_to_scene_music(now)
    }

    pub fn stop_music(&mut self, fade: bool) {
        let now = self.dsp_seconds();
        self.world.resource_mut::<MusicSequencer>().stop(now, fade);
    }

    pub fn music_state(&self) -> MusicState {
        self.world.resource::<MusicSequencer>().state()
    }

    pub fn dsp_seconds(&self) -> f64 {
        self.world.resource::<AudioClock>().seconds()
    }

    /// Extract a serializable save state from the current session.
    pub fn save_state(&self) -> SaveState {
        extract_state_from_world(&self.world)
    }

    /// Apply a saved state back into the live session.
    pub fn load_state(&mut self, state: SaveState) {
        apply_state_to_world(state, &mut self.world);
        info!(
            flags = self.world.resource::<FlagStore>().len(),
            clues = self.world.resource::<ClueRegistry>().len(),
            "save loaded"
        );
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), SaveError> {
        save_state_to_path(&self.save_state(), path)
    }

    pub fn load_from_path<P: AsRef<Path>>(&mut self, path: P) -> Result<(), SaveError> {
        let state = load_state_from_path(path)?;
        self.load_state(state);
        Ok(())
    }

    pub fn save_to(&self, repository: &mut dyn SaveRepository) -> Result<(), SaveError> {
        repository.save(&self.save_state())
    }

    /// Returns false when the repository holds no save yet.
    pub fn load_from(&mut self, repository: &mut dyn SaveRepository) -> Result<bool, SaveError> {
        match repository.load()? {
            Some(state) => {
                self.load_state(state);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn story_state(&self) -> StoryState<'_> {
        StoryState::new(
            self.world.resource::<FlagStore>(),
            self.world.resource::<ClueRegistry>(),
        )
    }

    fn apply(&mut self, effects: impl IntoIterator<Item = Effect>) {
        self.world.resource_mut::<PendingEffects>().extend(effects);
        apply_pending_effects(&mut self.world);
    }
}

impl Snapshot {
    fn capture(world: &mut World) -> Self {
        let dialogue_events = world.resource_mut::<DialogueSequencer>().drain_events();
        let music_events = world.resource_mut::<MusicSequencer>().drain_events();

        let scene = world.resource::<SceneState>();
        let sequencer = world.resource::<DialogueSequencer>();
        let dialogue = match sequencer.state() {
            DialogueState::Idle => None,
            DialogueState::Playing { line, phase } => {
                sequencer.current_sequence().map(|sequence| DialogueView {
                    sequence: sequence.clone(),
                    line,
                    phase,
                    speaker: sequencer.current_speaker().map(str::to_string),
                    text: sequencer.visible_text().unwrap_or_default().to_string(),
                })
            }
        };
        let popups = world.resource::<ClueAnnouncements>();
        let music = world.resource::<MusicSequencer>();

        Snapshot {
            frame: world.resource::<FrameClock>().frame,
            character: scene.character(),
            scene: scene.scene().map(str::to_string),
            dialogue,
            queued_lines: sequencer.queued_lines(),
            clue_popup: popups.current(),
            pending_popups: popups.pending(),
            music_state: music.state(),
            music_track: music.current_track().map(str::to_string),
            flags: world.resource::<FlagStore>().len(),
            clues_found: world.resource::<ClueRegistry>().len(),
            dialogue_events,
            music_events,
        }
    }
}
