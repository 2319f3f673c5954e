//! Cue-point editor
//!
//! Working copy of one file's trim window. The clip's duration is probed in
//! the background; until it arrives the timeline is inert. Every mutation
//! keeps `0 <= start <= end <= duration`. Preview runs through its own
//! [`PlaybackEngine`], so it trims exactly like the board does but never
//! touches the board's voice.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, TryRecvError};
use tracing::{debug, warn};

use courtside::audio::{spawn_duration_probe, AudioBackend, PlaybackEngine, PlaybackEvent};
use courtside::config::timeouts::PROBE_TIMEOUT_SECS;
use courtside::{format_seconds, CuePoint};

use crate::catalog::display_name;
use crate::data::CueStore;
use crate::error::Result;

/// Sound id the preview voice plays under
const PREVIEW_ID: &str = "__preview__";

/// Background duration read and when it was requested
struct DurationProbe {
    rx: Receiver<courtside::error::Result<f64>>,
    since: Instant,
}

pub struct CueEditor<B: AudioBackend> {
    sound_id: String,
    file: String,
    path: PathBuf,
    duration: f64,
    start: f64,
    /// `None` until the duration is known and no end was stored
    end: Option<f64>,
    cursor: f64,
    probe: Option<DurationProbe>,
    load_error: Option<String>,
    preview: PlaybackEngine<B>,
    /// Call time and start offset of the audible preview
    preview_origin: Option<(Instant, f64)>,
    warning: Option<String>,
}

impl<B: AudioBackend> CueEditor<B> {
    /// Editor for `file` of `sound_id`, seeded from its stored cue.
    ///
    /// The duration stays unknown until [`load_duration`](Self::load_duration).
    pub fn new(
        sound_id: &str,
        file: &str,
        path: impl Into<PathBuf>,
        stored: CuePoint,
        preview_backend: B,
    ) -> Self {
        Self {
            sound_id: sound_id.to_string(),
            file: file.to_string(),
            path: path.into(),
            duration: 0.0,
            start: stored.start_time,
            end: stored.end_time,
            cursor: stored.start_time,
            probe: None,
            load_error: None,
            preview: PlaybackEngine::new(preview_backend),
            preview_origin: None,
            warning: None,
        }
    }

    /// Like [`new`](Self::new), and starts probing the clip's duration
    pub fn open(
        sound_id: &str,
        file: &str,
        path: impl Into<PathBuf>,
        stored: CuePoint,
        preview_backend: B,
    ) -> Self {
        let mut editor = Self::new(sound_id, file, path, stored, preview_backend);
        match spawn_duration_probe(editor.path.clone()) {
            Ok(rx) => {
                editor.probe = Some(DurationProbe {
                    rx,
                    since: Instant::now(),
                })
            }
            Err(e) => editor.fail_load(e.to_string()),
        }
        editor
    }

    /// Make the timeline live. Non-positive or non-finite durations are ignored.
    pub fn load_duration(&mut self, duration: f64) {
        if !duration.is_finite() || duration <= 0.0 {
            self.fail_load(format!("invalid duration {duration}"));
            return;
        }
        self.duration = duration;
        self.probe = None;
        self.start = self.start.clamp(0.0, duration);
        let end = self.end.unwrap_or(duration);
        self.end = Some(end.clamp(self.start, duration));
        self.cursor = self.start;
        debug!(file = %self.file, duration, "Editor timeline ready");
    }

    /// Poll the duration probe and drive the preview voice
    pub fn pump(&mut self, now: Instant) {
        let timeout = Duration::from_secs(PROBE_TIMEOUT_SECS);
        match self.probe.as_ref().map(|p| (p.rx.try_recv(), p.since)) {
            Some((Ok(Ok(duration)), _)) => self.load_duration(duration),
            Some((Ok(Err(e)), _)) => self.fail_load(e.to_string()),
            Some((Err(TryRecvError::Disconnected), _)) => {
                self.fail_load("probe stopped".to_string())
            }
            Some((Err(TryRecvError::Empty), since))
                if now.saturating_duration_since(since) >= timeout =>
            {
                self.fail_load(format!("timed out after {PROBE_TIMEOUT_SECS}s"))
            }
            Some((Err(TryRecvError::Empty), _)) | None => {}
        }

        self.preview.pump(now);
        for event in self.preview.drain_events() {
            match event {
                PlaybackEvent::Started { .. } => {
                    if let Some((at, _)) = &mut self.preview_origin {
                        *at = now;
                    }
                }
                PlaybackEvent::Stopped { .. } => self.preview_origin = None,
                PlaybackEvent::Warning(message) => self.warning = Some(message),
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        self.duration > 0.0
    }

    pub fn is_loading(&self) -> bool {
        self.probe.is_some()
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    /// Last preview warning, cleared on read
    pub fn take_warning(&mut self) -> Option<String> {
        self.warning.take()
    }

    // --- Window edits ---

    /// Set the start, clamped to `[0, end]`. Inert until ready.
    pub fn set_start(&mut self, seconds: f64) {
        if !self.is_ready() {
            return;
        }
        let seconds = if seconds.is_finite() { seconds } else { 0.0 };
        self.start = seconds.clamp(0.0, self.end_time());
    }

    /// Set the end, clamped to `[start, duration]`. Inert until ready.
    pub fn set_end(&mut self, seconds: f64) {
        if !self.is_ready() {
            return;
        }
        let seconds = if seconds.is_finite() {
            seconds
        } else {
            self.duration
        };
        self.end = Some(seconds.clamp(self.start, self.duration));
    }

    /// Numeric entry for the start; unparsable text means `0`
    pub fn set_start_text(&mut self, text: &str) {
        self.set_start(parse_seconds(text).unwrap_or(0.0));
    }

    /// Numeric entry for the end; unparsable text means the full duration
    pub fn set_end_text(&mut self, text: &str) {
        let fallback = self.duration;
        self.set_end(parse_seconds(text).unwrap_or(fallback));
    }

    /// Pointer gesture at `fraction` of the timeline.
    ///
    /// Plain sets the start, `extend` sets the end.
    pub fn click_timeline(&mut self, fraction: f64, extend: bool) {
        if !self.is_ready() || !fraction.is_finite() {
            return;
        }
        let time = fraction.clamp(0.0, 1.0) * self.duration;
        if extend {
            self.set_end(time.max(self.start));
        } else {
            self.set_start(time.min(self.end_time()));
        }
    }

    /// Move the keyboard cursor by `delta` seconds
    pub fn move_cursor(&mut self, delta: f64) {
        if !self.is_ready() || !delta.is_finite() {
            return;
        }
        self.cursor = (self.cursor + delta).clamp(0.0, self.duration);
    }

    /// Timeline gesture at the cursor position
    pub fn mark_at_cursor(&mut self, extend: bool) {
        if self.is_ready() {
            self.click_timeline(self.cursor / self.duration, extend);
        }
    }

    /// Back to the full clip
    pub fn reset(&mut self) {
        if !self.is_ready() {
            return;
        }
        self.start = 0.0;
        self.end = Some(self.duration);
    }

    // --- Preview ---

    /// Start or stop the preview voice. Inert until the duration is known.
    pub fn toggle_preview(&mut self, now: Instant) {
        if !self.preview.state().is_idle() {
            self.preview.stop_all();
            self.preview_origin = None;
            return;
        }
        if !self.is_ready() {
            return;
        }
        let cue = self.working_cue();
        self.preview_origin = Some((now, cue.start_time));
        self.preview.play_cue_at(PREVIEW_ID, &self.path, cue, now);
    }

    pub fn is_previewing(&self) -> bool {
        !self.preview.state().is_idle()
    }

    /// Estimated playhead while previewing, in seconds
    pub fn playhead(&self, now: Instant) -> Option<f64> {
        let (at, offset) = self.preview_origin?;
        if !self.preview.is_playing() {
            return None;
        }
        let position = offset + now.saturating_duration_since(at).as_secs_f64();
        Some(position.min(self.end_time()))
    }

    /// Preview engine, for drivers sizing their wait
    pub fn preview(&self) -> &PlaybackEngine<B> {
        &self.preview
    }

    pub fn set_preview_volume(&mut self, volume: f32) {
        self.preview.backend_mut().set_volume(volume);
    }

    // --- Commit ---

    /// Cue as it would be stored. An end at the full duration means "no trim".
    pub fn working_cue(&self) -> CuePoint {
        let end = match self.end {
            Some(end) if self.is_ready() && end >= self.duration => None,
            other => other,
        };
        CuePoint::new(self.start, end)
    }

    /// Persist the working window. Stops the preview.
    pub fn save(&mut self, store: &mut CueStore) -> Result<CuePoint> {
        self.preview.stop_all();
        let cue = self.working_cue();
        store.set(&self.sound_id, &self.file, cue.start_time, cue.end_time)
    }

    /// Discard the working window
    pub fn close(mut self) {
        self.preview.stop_all();
        debug!(file = %self.file, "Editor closed without saving");
    }

    // --- Display ---

    pub fn sound_id(&self) -> &str {
        &self.sound_id
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn title(&self) -> String {
        display_name(&self.file)
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn start_time(&self) -> f64 {
        self.start
    }

    /// Effective end; the full duration when unset
    pub fn end_time(&self) -> f64 {
        self.end.unwrap_or(self.duration)
    }

    pub fn cursor(&self) -> f64 {
        self.cursor
    }

    /// Length of the window in seconds
    pub fn window_length(&self) -> f64 {
        (self.end_time() - self.start).max(0.0)
    }

    /// True when the end marker sits before the end of the clip
    pub fn has_end_marker(&self) -> bool {
        self.is_ready() && self.end_time() < self.duration
    }

    pub fn start_label(&self) -> String {
        format_seconds(self.start)
    }

    pub fn end_label(&self) -> String {
        format_seconds(self.end_time())
    }

    pub fn length_label(&self) -> String {
        format_seconds(self.window_length())
    }

    /// Position of `seconds` on the timeline in `[0, 1]`
    pub fn fraction_of(&self, seconds: f64) -> f64 {
        if !self.is_ready() {
            return 0.0;
        }
        (seconds / self.duration).clamp(0.0, 1.0)
    }

    fn fail_load(&mut self, message: String) {
        warn!(file = %self.file, "Cannot read clip duration: {message}");
        self.probe = None;
        self.load_error = Some(message);
    }
}

fn parse_seconds(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
