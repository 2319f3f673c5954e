//! Playback engine
//!
//! Owns the single active voice and enforces the soundboard rules:
//!
//! - **Exclusivity**: starting a sound stops and releases the previous voice
//!   before the new one is requested.
//! - **Toggle-to-stop**: triggering the active sound again stops it.
//! - **Trim**: a cue point seeks the voice and schedules a stop after
//!   `end - start` of wall-clock time.
//!
//! The engine is a synchronous state machine. A driver calls [`PlaybackEngine::pump`]
//! from its event loop to feed backend events and expire trim deadlines; every
//! path to idle funnels through one generation-guarded transition, so a late
//! confirmation or a stale timer can never touch a newer voice.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::engine::IDLE_TICK_MS;
use crate::cue::CuePoint;

use super::backend::AudioBackend;
use super::types::{PlaybackEvent, PlaybackState, StopReason, VoiceEvent, VoiceRequest};

/// Pending automatic stop for a trimmed voice
#[derive(Debug, Clone, Copy)]
struct TrimDeadline {
    generation: u64,
    at: Instant,
}

/// Single-voice playback engine
pub struct PlaybackEngine<B: AudioBackend> {
    backend: B,
    state: PlaybackState,
    next_generation: u64,
    deadline: Option<TrimDeadline>,
    events: Vec<PlaybackEvent>,
}

impl<B: AudioBackend> PlaybackEngine<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: PlaybackState::Idle,
            next_generation: 1,
            deadline: None,
            events: Vec::new(),
        }
    }

    /// Play `path` for `sound_id`, trimmed to `[start_time, end_time)`.
    ///
    /// Returns immediately; the sound reports as playing once the backend
    /// confirms the start.
    pub fn play(
        &mut self,
        sound_id: &str,
        path: impl AsRef<Path>,
        start_time: f64,
        end_time: Option<f64>,
    ) {
        self.play_cue_at(
            sound_id,
            path.as_ref(),
            CuePoint::new(start_time, end_time),
            Instant::now(),
        );
    }

    /// Play with a stored cue point
    pub fn play_cue(&mut self, sound_id: &str, path: impl AsRef<Path>, cue: CuePoint) {
        self.play_cue_at(sound_id, path.as_ref(), cue, Instant::now());
    }

    /// Play with an explicit call time; the trim deadline is measured from `now`
    pub fn play_cue_at(&mut self, sound_id: &str, path: &Path, cue: CuePoint, now: Instant) {
        let ready = self.backend.ensure_ready();

        if self.state.sound_id() == Some(sound_id) {
            self.stop_active(StopReason::Toggled);
            return;
        }

        self.stop_active(StopReason::Replaced);

        if let Err(e) = ready {
            self.warn(format!("Cannot play {sound_id}: {e}"));
            return;
        }

        let generation = self.next_generation;
        self.next_generation += 1;

        let window = cue.window();
        self.deadline = match window.stop_after.map(|after| now.checked_add(after)) {
            Some(Some(at)) => Some(TrimDeadline { generation, at }),
            Some(None) => {
                self.warn(format!("Trim window for {sound_id} is out of range, playing to end"));
                None
            }
            None => None,
        };
        self.state = PlaybackState::Starting {
            sound_id: sound_id.to_string(),
            generation,
        };
        debug!(
            sound_id,
            generation,
            offset_secs = window.offset.as_secs_f64(),
            "Starting voice"
        );
        self.backend.start(VoiceRequest {
            generation,
            path: path.to_path_buf(),
            offset: window.offset,
        });
    }

    /// Stop whatever is playing. Safe to call when idle.
    pub fn stop_all(&mut self) {
        self.deadline = None;
        self.stop_active(StopReason::StopAll);
    }

    /// Process backend events and expire the trim deadline
    pub fn pump(&mut self, now: Instant) {
        while let Some(event) = self.backend.try_event() {
            self.handle_voice_event(event);
        }

        if let Some(deadline) = self.deadline {
            if now >= deadline.at {
                self.deadline = None;
                self.finish(deadline.generation, StopReason::TrimReached);
            }
        }
    }

    /// Sound confirmed as audible
    pub fn currently_playing(&self) -> Option<&str> {
        match &self.state {
            PlaybackState::Playing { sound_id, .. } => Some(sound_id),
            _ => None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.currently_playing().is_some()
    }

    /// Full state including an unconfirmed start
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    /// When the pending trim stop is due, if any
    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadline.map(|d| d.at)
    }

    /// How long a driver may sleep before the next `pump`
    pub fn poll_timeout(&self, now: Instant) -> Duration {
        let idle = Duration::from_millis(IDLE_TICK_MS);
        match self.deadline {
            Some(deadline) => deadline.at.saturating_duration_since(now).min(idle),
            None => idle,
        }
    }

    /// Take the events emitted since the last call
    pub fn drain_events(&mut self) -> Vec<PlaybackEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    fn handle_voice_event(&mut self, event: VoiceEvent) {
        let generation = event.generation();
        let current = self.state.generation() == Some(generation);

        match event {
            VoiceEvent::Started { .. } => {
                if !current {
                    // Canceled before the platform answered; release the orphan
                    debug!(generation, "Discarding late start confirmation");
                    self.backend.stop(generation);
                    return;
                }
                if let PlaybackState::Starting { sound_id, .. } = &self.state {
                    let sound_id = sound_id.clone();
                    self.state = PlaybackState::Playing {
                        sound_id: sound_id.clone(),
                        generation,
                    };
                    self.events.push(PlaybackEvent::Started { sound_id });
                }
            }
            VoiceEvent::Ended { .. } => {
                self.finish(generation, StopReason::Ended);
            }
            VoiceEvent::Failed { message, .. } => {
                if !current {
                    debug!(generation, %message, "Ignoring failure of a stale voice");
                    return;
                }
                let sound_id = self.state.sound_id().unwrap_or_default().to_string();
                self.warn(format!("Playback failed for {sound_id}: {message}"));
                self.finish(generation, StopReason::Failed);
            }
        }
    }

    fn stop_active(&mut self, reason: StopReason) {
        if let Some(generation) = self.state.generation() {
            self.finish(generation, reason);
        }
    }

    /// The one transition to idle. No-op unless `generation` is the active voice.
    fn finish(&mut self, generation: u64, reason: StopReason) {
        if self.state.generation() != Some(generation) {
            return;
        }
        if self.deadline.is_some_and(|d| d.generation == generation) {
            self.deadline = None;
        }
        self.backend.stop(generation);

        let previous = std::mem::take(&mut self.state);
        if let Some(sound_id) = previous.sound_id() {
            debug!(sound_id, generation, %reason, "Voice released");
            self.events.push(PlaybackEvent::Stopped {
                sound_id: sound_id.to_string(),
                reason,
            });
        }
    }

    fn warn(&mut self, message: String) {
        warn!("{message}");
        self.events.push(PlaybackEvent::Warning(message));
    }
}

impl<B: AudioBackend> Drop for PlaybackEngine<B> {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::backend::ScriptedBackend;
    use crate::config::cue::MAX_CUE_SECS;
    use proptest::prelude::*;

    fn engine() -> PlaybackEngine<ScriptedBackend> {
        PlaybackEngine::new(ScriptedBackend::new())
    }

    fn auto_engine() -> PlaybackEngine<ScriptedBackend> {
        PlaybackEngine::new(ScriptedBackend::auto_confirming())
    }

    /// Generation of the voice most recently requested from the backend
    fn last_generation(engine: &PlaybackEngine<ScriptedBackend>) -> u64 {
        engine.backend().last_request().unwrap().generation
    }

    // --- Start confirmation ---

    #[test]
    fn starts_idle() {
        let engine = engine();
        assert_eq!(engine.currently_playing(), None);
        assert!(!engine.is_playing());
        assert!(engine.state().is_idle());
    }

    #[test]
    fn play_is_pending_until_confirmed() {
        let mut engine = engine();
        engine.play("ace", "sounds/ace.mp3", 0.0, None);

        assert_eq!(engine.currently_playing(), None);
        assert_eq!(engine.state().sound_id(), Some("ace"));

        let generation = last_generation(&engine);
        engine.backend_mut().confirm(generation);
        engine.pump(Instant::now());

        assert_eq!(engine.currently_playing(), Some("ace"));
        assert!(engine.is_playing());
        assert_eq!(
            engine.drain_events(),
            vec![PlaybackEvent::Started {
                sound_id: "ace".to_string()
            }]
        );
    }

    #[test]
    fn play_initializes_backend_on_every_call() {
        let mut engine = auto_engine();
        engine.play("ace", "a.mp3", 0.0, None);
        engine.play("boo", "b.mp3", 0.0, None);
        assert_eq!(engine.backend().init_calls(), 2);
    }

    #[test]
    fn play_seeks_to_start_time() {
        let mut engine = engine();
        engine.play("ace", "sounds/ace.mp3", 2.5, None);
        let request = engine.backend().last_request().unwrap();
        assert_eq!(request.offset, Duration::from_millis(2500));
        assert_eq!(request.path, Path::new("sounds/ace.mp3"));
    }

    // --- Toggle ---

    #[test]
    fn second_play_of_same_sound_stops_it() {
        let mut engine = auto_engine();
        engine.play("ace", "a.mp3", 0.0, None);
        engine.pump(Instant::now());
        assert_eq!(engine.currently_playing(), Some("ace"));

        engine.play("ace", "a.mp3", 0.0, None);
        assert_eq!(engine.currently_playing(), None);
        assert!(engine.state().is_idle());
        assert!(engine.backend().live_voices().is_empty());
        assert_eq!(engine.backend().requests().len(), 1);
    }

    #[test]
    fn toggle_cycles_rather_than_latching() {
        let mut engine = auto_engine();
        for expected in [Some("ace"), None, Some("ace"), None] {
            engine.play("ace", "a.mp3", 0.0, None);
            engine.pump(Instant::now());
            assert_eq!(engine.currently_playing(), expected);
        }
    }

    #[test]
    fn toggle_matches_pending_start() {
        let mut engine = engine();
        engine.play("ace", "a.mp3", 0.0, None);
        let generation = last_generation(&engine);

        engine.play("ace", "a.mp3", 0.0, None);
        assert!(engine.state().is_idle());

        // Confirmation arrives after the cancel: must not resurrect the voice
        engine.backend_mut().confirm(generation);
        engine.pump(Instant::now());
        assert_eq!(engine.currently_playing(), None);
        assert!(engine.backend().live_voices().is_empty());
    }

    #[test]
    fn toggle_emits_toggled_reason() {
        let mut engine = auto_engine();
        engine.play("ace", "a.mp3", 0.0, None);
        engine.pump(Instant::now());
        engine.drain_events();

        engine.play("ace", "a.mp3", 0.0, None);
        assert_eq!(
            engine.drain_events(),
            vec![PlaybackEvent::Stopped {
                sound_id: "ace".to_string(),
                reason: StopReason::Toggled
            }]
        );
    }

    // --- Exclusivity ---

    #[test]
    fn new_sound_replaces_previous() {
        let mut engine = auto_engine();
        engine.play("ace", "a.mp3", 0.0, None);
        engine.pump(Instant::now());
        let first = last_generation(&engine);

        engine.play("boo", "b.mp3", 0.0, None);
        assert!(engine.backend().stops().contains(&first));
        assert_eq!(engine.backend().live_voices().len(), 1);

        engine.pump(Instant::now());
        assert_eq!(engine.currently_playing(), Some("boo"));
    }

    #[test]
    fn previous_voice_released_before_next_requested() {
        let mut engine = auto_engine();
        engine.play("ace", "a.mp3", 0.0, None);
        let first = last_generation(&engine);
        engine.play("boo", "b.mp3", 0.0, None);

        // The stop for the first voice was recorded while only one voice had been requested after it
        let stops = engine.backend().stops();
        assert_eq!(stops, &[first]);
        assert_eq!(engine.backend().live_voices(), &[last_generation(&engine)]);
    }

    #[test]
    fn replacement_reports_replaced() {
        let mut engine = auto_engine();
        engine.play("ace", "a.mp3", 0.0, None);
        engine.pump(Instant::now());
        engine.drain_events();

        engine.play("boo", "b.mp3", 0.0, None);
        engine.pump(Instant::now());
        assert_eq!(
            engine.drain_events(),
            vec![
                PlaybackEvent::Stopped {
                    sound_id: "ace".to_string(),
                    reason: StopReason::Replaced
                },
                PlaybackEvent::Started {
                    sound_id: "boo".to_string()
                },
            ]
        );
    }

    #[test]
    fn late_confirmation_of_replaced_voice_is_discarded() {
        let mut engine = engine();
        engine.play("ace", "a.mp3", 0.0, None);
        let first = last_generation(&engine);
        engine.play("boo", "b.mp3", 0.0, None);
        let second = last_generation(&engine);

        engine.backend_mut().confirm(first);
        engine.backend_mut().confirm(second);
        engine.pump(Instant::now());

        assert_eq!(engine.currently_playing(), Some("boo"));
        assert_eq!(engine.backend().live_voices(), &[second]);
    }

    // --- Trim ---

    #[test]
    fn trim_stops_after_window_length() {
        let mut engine = auto_engine();
        let t0 = Instant::now();
        engine.play_cue_at("ace", Path::new("a.mp3"), CuePoint::new(2.0, Some(5.0)), t0);
        engine.pump(t0);
        assert_eq!(engine.currently_playing(), Some("ace"));
        assert_eq!(engine.next_deadline(), Some(t0 + Duration::from_secs(3)));

        engine.pump(t0 + Duration::from_millis(2999));
        assert_eq!(engine.currently_playing(), Some("ace"));

        engine.pump(t0 + Duration::from_secs(3));
        assert_eq!(engine.currently_playing(), None);
        assert!(engine.backend().live_voices().is_empty());
        assert!(engine.drain_events().contains(&PlaybackEvent::Stopped {
            sound_id: "ace".to_string(),
            reason: StopReason::TrimReached
        }));
    }

    #[test]
    fn absurd_cue_values_play_without_trim() {
        let mut engine = auto_engine();
        let t0 = Instant::now();
        engine.play_cue_at("ace", Path::new("a.mp3"), CuePoint::new(0.0, Some(1e300)), t0);
        engine.pump(t0);
        assert_eq!(engine.currently_playing(), Some("ace"));
        assert_eq!(engine.next_deadline(), None);

        engine.play("boo", "b.mp3", 1e20, None);
        engine.pump(t0);
        assert_eq!(engine.currently_playing(), Some("boo"));
        let request = engine.backend().last_request().unwrap();
        assert_eq!(request.offset, Duration::from_secs_f64(MAX_CUE_SECS));
        assert_eq!(engine.next_deadline(), None);
    }

    #[test]
    fn no_deadline_without_end() {
        let mut engine = auto_engine();
        engine.play("ace", "a.mp3", 1.0, None);
        assert_eq!(engine.next_deadline(), None);
    }

    #[test]
    fn inverted_window_plays_to_end() {
        let mut engine = auto_engine();
        let t0 = Instant::now();
        engine.play_cue_at("ace", Path::new("a.mp3"), CuePoint::new(5.0, Some(2.0)), t0);
        engine.pump(t0);
        assert_eq!(engine.next_deadline(), None);

        engine.pump(t0 + Duration::from_secs(60));
        assert_eq!(engine.currently_playing(), Some("ace"));
    }

    #[test]
    fn deadline_measured_from_call_time_even_if_unconfirmed() {
        let mut engine = engine();
        let t0 = Instant::now();
        engine.play_cue_at("ace", Path::new("a.mp3"), CuePoint::new(0.0, Some(1.0)), t0);

        engine.pump(t0 + Duration::from_secs(1));
        assert!(engine.state().is_idle());

        // Confirmation after the trim already fired is stale
        let generation = last_generation(&engine);
        engine.backend_mut().confirm(generation);
        engine.pump(t0 + Duration::from_secs(2));
        assert_eq!(engine.currently_playing(), None);
    }

    #[test]
    fn stale_deadline_does_not_stop_newer_voice() {
        let mut engine = auto_engine();
        let t0 = Instant::now();
        engine.play_cue_at("ace", Path::new("a.mp3"), CuePoint::new(0.0, Some(1.0)), t0);
        engine.pump(t0);
        engine.play_cue_at("boo", Path::new("b.mp3"), CuePoint::FULL, t0);
        engine.pump(t0);

        assert_eq!(engine.next_deadline(), None);
        engine.pump(t0 + Duration::from_secs(5));
        assert_eq!(engine.currently_playing(), Some("boo"));
    }

    #[test]
    fn natural_end_cancels_deadline() {
        let mut engine = auto_engine();
        let t0 = Instant::now();
        engine.play_cue_at("ace", Path::new("a.mp3"), CuePoint::new(0.0, Some(10.0)), t0);
        engine.pump(t0);

        let generation = last_generation(&engine);
        engine.backend_mut().finish(generation);
        engine.pump(t0 + Duration::from_secs(1));

        assert!(engine.state().is_idle());
        assert_eq!(engine.next_deadline(), None);
    }

    #[test]
    fn end_and_trim_racing_release_once() {
        let mut engine = auto_engine();
        let t0 = Instant::now();
        engine.play_cue_at("ace", Path::new("a.mp3"), CuePoint::new(0.0, Some(1.0)), t0);
        engine.pump(t0);
        engine.drain_events();

        let generation = last_generation(&engine);
        engine.backend_mut().finish(generation);
        engine.pump(t0 + Duration::from_secs(2));

        let stopped = engine
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, PlaybackEvent::Stopped { .. }))
            .count();
        assert_eq!(stopped, 1);
    }

    #[test]
    fn poll_timeout_shrinks_near_deadline() {
        let mut engine = auto_engine();
        let t0 = Instant::now();
        assert_eq!(engine.poll_timeout(t0), Duration::from_millis(IDLE_TICK_MS));

        engine.play_cue_at("ace", Path::new("a.mp3"), CuePoint::new(0.0, Some(0.01)), t0);
        assert_eq!(engine.poll_timeout(t0), Duration::from_millis(10));
        assert_eq!(
            engine.poll_timeout(t0 + Duration::from_secs(1)),
            Duration::ZERO
        );
    }

    // --- Failures ---

    #[test]
    fn rejected_start_returns_to_idle_with_warning() {
        let mut engine = engine();
        engine.play("ace", "missing.mp3", 0.0, None);
        let generation = last_generation(&engine);
        engine.backend_mut().reject(generation, "file not found");
        engine.pump(Instant::now());

        assert_eq!(engine.currently_playing(), None);
        assert!(engine.state().is_idle());
        let events = engine.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, PlaybackEvent::Warning(msg) if msg.contains("file not found"))));
    }

    #[test]
    fn rejected_start_cancels_deadline() {
        let mut engine = engine();
        engine.play("ace", "missing.mp3", 0.0, Some(4.0));
        let generation = last_generation(&engine);
        engine.backend_mut().reject(generation, "nope");
        engine.pump(Instant::now());
        assert_eq!(engine.next_deadline(), None);
    }

    #[test]
    fn failure_of_stale_voice_is_ignored() {
        let mut engine = auto_engine();
        engine.play("ace", "a.mp3", 0.0, None);
        let first = last_generation(&engine);
        engine.play("boo", "b.mp3", 0.0, None);
        engine.pump(Instant::now());
        engine.drain_events();

        engine.backend_mut().reject(first, "late failure");
        engine.pump(Instant::now());
        assert_eq!(engine.currently_playing(), Some("boo"));
        assert!(engine.drain_events().is_empty());
    }

    #[test]
    fn init_failure_is_a_warning_not_a_panic() {
        let mut engine = PlaybackEngine::new(ScriptedBackend::failing_init());
        engine.play("ace", "a.mp3", 0.0, None);
        assert!(engine.state().is_idle());
        assert!(engine.backend().requests().is_empty());
        assert!(matches!(
            engine.drain_events().as_slice(),
            [PlaybackEvent::Warning(_)]
        ));
    }

    // --- stop_all ---

    #[test]
    fn stop_all_when_idle_is_noop() {
        let mut engine = engine();
        engine.stop_all();
        engine.stop_all();
        assert!(engine.state().is_idle());
        assert!(engine.drain_events().is_empty());
        assert!(engine.backend().stops().is_empty());
    }

    #[test]
    fn stop_all_stops_and_cancels_deadline() {
        let mut engine = auto_engine();
        let t0 = Instant::now();
        engine.play_cue_at("ace", Path::new("a.mp3"), CuePoint::new(0.0, Some(3.0)), t0);
        engine.pump(t0);

        engine.stop_all();
        assert!(engine.state().is_idle());
        assert_eq!(engine.next_deadline(), None);
        assert!(engine.backend().live_voices().is_empty());
    }

    #[test]
    fn stop_all_cancels_pending_start() {
        let mut engine = engine();
        engine.play("ace", "a.mp3", 0.0, None);
        let generation = last_generation(&engine);
        engine.stop_all();

        engine.backend_mut().confirm(generation);
        engine.pump(Instant::now());
        assert_eq!(engine.currently_playing(), None);
        assert!(engine.backend().live_voices().is_empty());
    }

    #[test]
    fn play_after_stop_all_starts_fresh() {
        let mut engine = auto_engine();
        engine.play("ace", "a.mp3", 0.0, None);
        engine.pump(Instant::now());
        engine.stop_all();

        engine.play("ace", "a.mp3", 0.0, None);
        engine.pump(Instant::now());
        assert_eq!(engine.currently_playing(), Some("ace"));
    }

    proptest! {
        /// At most one voice is ever live and at most one sound reports playing
        #[test]
        fn exclusivity_holds_for_any_trigger_sequence(
            ids in prop::collection::vec(0usize..4, 1..40),
            confirm in prop::collection::vec(any::<bool>(), 40),
        ) {
            let names = ["ace", "boo", "siren", "whistle"];
            let mut engine = engine();
            let t0 = Instant::now();

            for (i, id) in ids.iter().enumerate() {
                engine.play(names[*id], "clip.mp3", 0.0, None);
                if confirm[i] {
                    if let Some(generation) = engine.state().generation() {
                        engine.backend_mut().confirm(generation);
                    }
                }
                engine.pump(t0);

                prop_assert!(engine.backend().live_voices().len() <= 1);
                if let Some(playing) = engine.currently_playing() {
                    prop_assert_eq!(Some(playing), engine.state().sound_id());
                }
            }

            engine.stop_all();
            prop_assert!(engine.backend().live_voices().is_empty());
        }
    }
}
