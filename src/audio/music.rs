use std::fmt;

use bevy_ecs::prelude::*;
use bevy_utils::tracing::{debug, warn};

use crate::audio::output::{AudioOutput, Channel, NullOutput};
use crate::config::MusicSettings;
use crate::core::observers::{ObserverId, Observers};
use crate::data::music::{AudioClip, MusicTrack};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MusicState {
    Idle,
    PlayingIntro,
    PlayingLoop,
    Crossfading,
    OneShot,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MusicEvent {
    TrackStarted { track: String, channel: Channel },
    /// The loop took over from the intro at DSP time `at`.
    HandoffToLoop { track: String, channel: Channel, at: f64 },
    /// A non-looping clip reached its end.
    TrackFinished { track: String },
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VoiceRole {
    Intro,
    Loop,
    OneShot,
}

#[derive(Debug, Clone)]
struct Voice {
    track: String,
    clip: AudioClip,
    role: VoiceRole,
    /// DSP time at which clip position zero plays.
    origin: f64,
    looping: bool,
}

impl Voice {
    fn new(track: &str, clip: &AudioClip, role: VoiceRole, origin: f64, looping: bool) -> Self {
        Self {
            track: track.to_string(),
            clip: clip.clone(),
            role,
            origin,
            looping,
        }
    }

    fn position(&self, now: f64) -> f64 {
        let length = self.clip.length_seconds();
        if length <= 0.0 {
            return 0.0;
        }
        let elapsed = (now - self.origin).max(0.0);
        if self.looping {
            elapsed % length
        } else {
            elapsed.min(length)
        }
    }

    fn end(&self) -> Option<f64> {
        (!self.looping).then(|| self.origin + self.clip.length_seconds())
    }
}

/// Loop clip waiting to take over from an intro.
#[derive(Debug, Clone)]
struct Handoff {
    track: String,
    clip: AudioClip,
    start_at: f64,
    looping: bool,
    staged: Option<Channel>,
    generation: u64,
}

#[derive(Debug, Clone, Copy)]
struct Fade {
    out: Option<Channel>,
    into: Option<Channel>,
    started_at: f64,
    duration: f64,
    generation: u64,
}

impl Fade {
    fn progress(&self, now: f64) -> f32 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((now - self.started_at) / self.duration).clamp(0.0, 1.0) as f32
    }
}

type Plan = (Voice, Option<Handoff>);

/// Two-channel music player with intro to loop handoff and position-preserving
/// character crossfades. All times are DSP seconds from the session `AudioClock`.
#[derive(Resource)]
pub struct MusicSequencer {
    output: Box<dyn AudioOutput>,
    voices: [Option<Voice>; 2],
    active: Channel,
    current: Option<MusicTrack>,
    resume: Option<MusicTrack>,
    handoff: Option<Handoff>,
    fade: Option<Fade>,
    generation: u64,
    settings: MusicSettings,
    events: Vec<MusicEvent>,
    observers: Observers<MusicSequencer, MusicEvent>,
}

impl Default for MusicSequencer {
    fn default() -> Self {
        Self::new(MusicSettings::default(), NullOutput)
    }
}

impl fmt::Debug for MusicSequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MusicSequencer")
            .field("state", &self.state())
            .field("active", &self.active)
            .field("current", &self.current_track())
            .field("generation", &self.generation)
            .finish()
    }
}

impl MusicSequencer {
    pub fn new(settings: MusicSettings, output: impl AudioOutput + 'static) -> Self {
        Self {
            output: Box::new(output),
            voices: [None, None],
            active: Channel::A,
            current: None,
            resume: None,
            handoff: None,
            fade: None,
            generation: 0,
            settings,
            events: Vec::new(),
            observers: Observers::default(),
        }
    }

    pub fn set_output(&mut self, output: impl AudioOutput + 'static) {
        self.output = Box::new(output);
    }

    pub fn settings(&self) -> MusicSettings {
        self.settings
    }

    pub fn state(&self) -> MusicState {
        if self.fade.map_or(false, |fade| fade.into.is_some()) {
            return MusicState::Crossfading;
        }
        match self.voice(self.active).map(|voice| voice.role) {
            None => MusicState::Idle,
            Some(VoiceRole::Intro) => MusicState::PlayingIntro,
            Some(VoiceRole::Loop) => MusicState::PlayingLoop,
            Some(VoiceRole::OneShot) => MusicState::OneShot,
        }
    }

    pub fn active_channel(&self) -> Channel {
        self.active
    }

    pub fn current_track(&self) -> Option<&str> {
        self.current.as_ref().map(|track| track.id.as_str())
    }

    /// Track that `return_to_scene_music` would restore.
    pub fn resume_track(&self) -> Option<&str> {
        self.resume.as_ref().map(|track| track.id.as_str())
    }

    pub fn active_clip(&self) -> Option<&str> {
        self.voice(self.active).map(|voice| voice.clip.name.as_str())
    }

    /// Playback position of the audible clip, in seconds.
    pub fn position(&self, now: f64) -> Option<f64> {
        self.voice(self.active).map(|voice| voice.position(now))
    }

    /// DSP time at which the pending loop takes over.
    pub fn scheduled_handoff(&self) -> Option<f64> {
        self.handoff.as_ref().map(|handoff| handoff.start_at)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start `track` from the top, crossfading away from whatever plays now.
    pub fn play_character_track(&mut self, track: &MusicTrack, now: f64) {
        if !track.is_valid() {
            warn!(track = %track.id, "music track has no playable clips");
            return;
        }
        self.cancel_in_flight();
        let Some(plan) = plan_from_start(track, now) else {
            return;
        };
        self.resume = None;
        self.begin(track, plan, now);
    }

    /// Crossfade to the other character's version, keeping the musical position.
    pub fn on_character_changed(&mut self, track: &MusicTrack, now: f64) {
        if !track.is_valid() {
            warn!(track = %track.id, "music track has no playable clips");
            return;
        }
        let Some(playing) = self.voice(self.active).cloned() else {
            self.play_character_track(track, now);
            return;
        };
        if playing.role == VoiceRole::OneShot {
            debug!(track = %track.id, "character changed during one-shot, updating resume track");
            self.resume = Some(track.clone());
            return;
        }

        let plan = match playing.role {
            VoiceRole::Intro => plan_from_intro(track, playing.origin, now),
            _ => plan_synced_loop(track, playing.origin, now),
        };
        self.cancel_in_flight();
        match plan {
            Some(plan) => self.begin(track, plan, now),
            None => {
                // Clamped past the end of a one-pass intro: the new track is already over.
                debug!(track = %track.id, "switched past the end of the new track");
                self.release_active(now, true);
                self.current = Some(track.clone());
                self.emit(MusicEvent::TrackFinished {
                    track: track.id.clone(),
                });
            }
        }
    }

    /// Play a clip once, remembering the character track to come back to.
    pub fn play_one_shot(&mut self, clip: &AudioClip, now: f64) {
        if !clip.is_playable() {
            warn!(clip = %clip.name, "one-shot clip is not playable");
            return;
        }
        let already_one_shot = self
            .voice(self.active)
            .map_or(false, |voice| voice.role == VoiceRole::OneShot);
        self.cancel_in_flight();
        if !already_one_shot {
            if let Some(current) = self.current.take() {
                self.resume = Some(current);
            }
        }
        let voice = Voice::new(&clip.name, clip, VoiceRole::OneShot, now, false);
        self.crossfade_to(voice, now);
    }

    pub fn return_to_scene_music(&mut self, now: f64) -> bool {
        match self.resume.take() {
            Some(track) => {
                self.play_character_track(&track, now);
                true
            }
            None => false,
        }
    }

    pub fn stop(&mut self, now: f64, fade: bool) {
        self.cancel_in_flight();
        self.current = None;
        self.resume = None;
        if self.release_active(now, fade) {
            self.emit(MusicEvent::Stopped);
        }
    }

    /// Silence the active channel, fading when asked. Returns false when nothing played.
    fn release_active(&mut self, now: f64, fade: bool) -> bool {
        let active = self.active;
        if self.voice(active).is_none() {
            return false;
        }
        let duration = self.crossfade_duration();
        if fade && duration > 0.0 {
            self.fade = Some(Fade {
                out: Some(active),
                into: None,
                started_at: now,
                duration,
                generation: self.generation,
            });
            self.active = active.other();
        } else {
            self.stop_channel(active);
        }
        true
    }

    /// Advance fades, handoffs and natural track ends to DSP time `now`.
    pub fn tick(&mut self, now: f64) {
        self.advance_fade(now);
        self.advance_handoff(now);
        self.finish_if_ended(now);
    }

    pub fn drain_events(&mut self) -> Vec<MusicEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn on_event(
        &mut self,
        callback: impl Fn(&MusicSequencer, &MusicEvent) + Send + Sync + 'static,
    ) -> ObserverId {
        self.observers.subscribe(callback)
    }

    fn voice(&self, channel: Channel) -> Option<&Voice> {
        self.voices[channel.index()].as_ref()
    }

    fn master(&self) -> f32 {
        self.settings.master_volume.clamp(0.0, 1.0)
    }

    fn crossfade_duration(&self) -> f64 {
        self.settings.crossfade_seconds.max(0.0) as f64
    }

    fn begin(&mut self, track: &MusicTrack, plan: Plan, now: f64) {
        let (voice, handoff) = plan;
        self.crossfade_to(voice, now);
        self.handoff = handoff.map(|handoff| Handoff {
            generation: self.generation,
            ..handoff
        });
        self.current = Some(track.clone());
    }

    /// Drop any running fade and pending handoff, snapping to the fade target.
    fn cancel_in_flight(&mut self) {
        self.generation += 1;
        if let Some(fade) = self.fade.take() {
            if let Some(out) = fade.out {
                self.stop_channel(out);
            }
            if let Some(into) = fade.into {
                let master = self.master();
                self.output.set_volume(into, master);
            }
        }
        if let Some(handoff) = self.handoff.take() {
            if let Some(channel) = handoff.staged {
                self.stop_channel(channel);
            }
        }
    }

    fn stop_channel(&mut self, channel: Channel) {
        if self.voices[channel.index()].take().is_some() {
            self.output.stop(channel);
        }
    }

    fn start_voice(&mut self, channel: Channel, voice: Voice, now: f64, volume: f32) {
        let (start_at, offset) = if voice.origin > now {
            (voice.origin, 0.0)
        } else {
            (now, voice.position(now))
        };
        self.output.set_volume(channel, volume);
        self.output
            .play(channel, &voice.clip, start_at, offset, voice.looping);
        self.voices[channel.index()] = Some(voice);
    }

    fn crossfade_to(&mut self, voice: Voice, now: f64) {
        let into = self.active.other();
        self.stop_channel(into);
        let out = self.voice(self.active).is_some().then_some(self.active);
        let duration = self.crossfade_duration();
        let track = voice.track.clone();

        if duration <= 0.0 {
            if let Some(out) = out {
                self.stop_channel(out);
            }
            let master = self.master();
            self.start_voice(into, voice, now, master);
        } else {
            self.start_voice(into, voice, now, 0.0);
            self.fade = Some(Fade {
                out,
                into: Some(into),
                started_at: now,
                duration,
                generation: self.generation,
            });
        }
        self.active = into;
        self.emit(MusicEvent::TrackStarted {
            track,
            channel: into,
        });
    }

    fn advance_fade(&mut self, now: f64) {
        let Some(fade) = self.fade else {
            return;
        };
        if fade.generation != self.generation {
            self.fade = None;
            return;
        }
        let t = fade.progress(now);
        let master = self.master();
        if let Some(out) = fade.out {
            self.output.set_volume(out, master * (1.0 - t));
        }
        if let Some(into) = fade.into {
            self.output.set_volume(into, master * t);
        }
        if t >= 1.0 {
            self.fade = None;
            if let Some(out) = fade.out {
                self.stop_channel(out);
            }
            debug!(channel = ?fade.into, "crossfade finished");
        }
    }

    fn advance_handoff(&mut self, now: f64) {
        let Some(handoff) = self.handoff.as_ref() else {
            return;
        };
        if handoff.generation != self.generation {
            self.handoff = None;
            return;
        }
        let start_at = handoff.start_at;
        if handoff.staged.is_none() && (self.fade.is_none() || now >= start_at) {
            self.stage_handoff(now);
        }
        if now >= start_at {
            self.complete_handoff();
        }
    }

    /// Schedule the loop on the free channel, finishing a crossfade early if
    /// the intro is about to run out.
    fn stage_handoff(&mut self, now: f64) {
        if let Some(fade) = self.fade.take() {
            if let Some(out) = fade.out {
                self.stop_channel(out);
            }
            if let Some(into) = fade.into {
                let master = self.master();
                self.output.set_volume(into, master);
            }
        }
        let channel = self.active.other();
        self.stop_channel(channel);
        let Some(handoff) = self.handoff.as_mut() else {
            return;
        };
        handoff.staged = Some(channel);
        let voice = Voice::new(
            &handoff.track,
            &handoff.clip,
            VoiceRole::Loop,
            handoff.start_at,
            handoff.looping,
        );
        debug!(track = %voice.track, start_at = handoff.start_at, %channel, "loop scheduled");
        let master = self.master();
        self.start_voice(channel, voice, now, master);
    }

    fn complete_handoff(&mut self) {
        let Some(handoff) = self.handoff.take() else {
            return;
        };
        let Some(channel) = handoff.staged else {
            return;
        };
        let previous = self.active;
        self.stop_channel(previous);
        self.active = channel;
        self.emit(MusicEvent::HandoffToLoop {
            track: handoff.track,
            channel,
            at: handoff.start_at,
        });
    }

    fn finish_if_ended(&mut self, now: f64) {
        if self.handoff.is_some() {
            return;
        }
        let Some(voice) = self.voice(self.active) else {
            return;
        };
        let Some(end) = voice.end() else {
            return;
        };
        if now < end {
            return;
        }
        let track = voice.track.clone();
        let role = voice.role;
        if let Some(fade) = self.fade.take() {
            if let Some(out) = fade.out {
                self.stop_channel(out);
            }
        }
        let active = self.active;
        self.stop_channel(active);
        if role != VoiceRole::OneShot {
            self.current = None;
        }
        self.emit(MusicEvent::TrackFinished { track });
    }

    fn emit(&mut self, event: MusicEvent) {
        debug!(?event, "music event");
        self.observers.emit(self, &event);
        self.events.push(event);
    }
}

fn plan_from_start(track: &MusicTrack, now: f64) -> Option<Plan> {
    match (track.playable_intro(), track.playable_loop()) {
        (Some(intro), Some(loop_clip)) => Some((
            Voice::new(&track.id, intro, VoiceRole::Intro, now, false),
            Some(handoff_for(track, loop_clip, now + intro.length_seconds())),
        )),
        (Some(intro), None) => Some((intro_only(track, intro, now), None)),
        (None, Some(loop_clip)) => Some((
            Voice::new(&track.id, loop_clip, VoiceRole::Loop, now, track.looping),
            None,
        )),
        (None, None) => None,
    }
}

/// Mirror the elapsed intro time into the new track's intro. Past the end of
/// the new intro the loop starts fresh.
fn plan_from_intro(track: &MusicTrack, origin: f64, now: f64) -> Option<Plan> {
    let elapsed = (now - origin).max(0.0);
    match (track.playable_intro(), track.playable_loop()) {
        (Some(intro), loop_clip) if elapsed < intro.length_seconds() => match loop_clip {
            Some(loop_clip) => Some((
                Voice::new(&track.id, intro, VoiceRole::Intro, origin, false),
                Some(handoff_for(track, loop_clip, origin + intro.length_seconds())),
            )),
            None => Some((intro_only(track, intro, origin), None)),
        },
        (_, Some(loop_clip)) => Some((
            Voice::new(&track.id, loop_clip, VoiceRole::Loop, now, track.looping),
            None,
        )),
        (Some(intro), None) if track.looping => Some((intro_only(track, intro, origin), None)),
        _ => None,
    }
}

/// Share the old loop's start time so the new position is `T mod Lf`.
fn plan_synced_loop(track: &MusicTrack, origin: f64, now: f64) -> Option<Plan> {
    match (track.playable_intro(), track.playable_loop()) {
        (_, Some(loop_clip)) => Some((
            Voice::new(&track.id, loop_clip, VoiceRole::Loop, origin, track.looping),
            None,
        )),
        (Some(intro), None) if track.looping => Some((intro_only(track, intro, origin), None)),
        _ => plan_from_start(track, now),
    }
}

/// Intro-only tracks loop the intro when the track loops.
fn intro_only(track: &MusicTrack, intro: &AudioClip, origin: f64) -> Voice {
    let role = if track.looping {
        VoiceRole::Loop
    } else {
        VoiceRole::Intro
    };
    Voice::new(&track.id, intro, role, origin, track.looping)
}

fn handoff_for(track: &MusicTrack, loop_clip: &AudioClip, start_at: f64) -> Handoff {
    Handoff {
        track: track.id.clone(),
        clip: loop_clip.clone(),
        start_at,
        looping: track.looping,
        staged: None,
        generation: 0,
    }
}
