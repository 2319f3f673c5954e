//! Board controller
//!
//! Owns the playback engine, the cue store and the catalog, and turns
//! front-end commands into plays, stops and cue edits. Single-threaded: a
//! front-end calls [`Board::pump`] from its event loop and sleeps for at most
//! [`Board::poll_timeout`] between calls.

use std::borrow::Cow;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use courtside::audio::{AudioBackend, PlaybackEngine, PlaybackEvent, PlaybackState, StopReason};
use courtside::CuePoint;

use super::editor::CueEditor;
use super::state::{BoardCommand, BoardSnapshot, View};
use crate::catalog::{display_name, Catalog, Sound};
use crate::data::{CueStore, Settings};
use crate::error::{AppError, Result};

/// One file of one sound in the developer listing
#[derive(Debug, Clone, PartialEq)]
pub struct CueListing {
    pub group_id: String,
    pub sound_id: String,
    pub sound_name: String,
    pub icon: String,
    /// 1-based position among the sound's files
    pub number: usize,
    pub file: String,
    pub display_name: String,
    pub cue: CuePoint,
}

impl CueListing {
    /// True when the stored cue trims the clip
    pub fn has_cue(&self) -> bool {
        self.cue.has_trim()
    }

    /// `m:ss` or `m:ss - m:ss` when trimmed
    pub fn cue_label(&self) -> Option<String> {
        self.has_cue().then(|| self.cue.to_string())
    }
}

type BackendFactory<B> = Box<dyn FnMut() -> B>;

pub struct Board<B: AudioBackend> {
    engine: PlaybackEngine<B>,
    cues: CueStore,
    catalog: Catalog,
    settings: Settings,
    editor: Option<CueEditor<B>>,
    /// Builds the independent voice each editor previews through
    preview_backend: BackendFactory<B>,
    rng: StdRng,
    view: View,
    status_text: Cow<'static, str>,
    is_error: bool,
}

impl<B: AudioBackend> Board<B> {
    pub fn new(
        backend: B,
        preview_backend: impl FnMut() -> B + 'static,
        cues: CueStore,
        catalog: Catalog,
        settings: Settings,
    ) -> Self {
        let view = if settings.start_in_developer_view {
            View::Developer
        } else {
            View::Board
        };
        Self {
            engine: PlaybackEngine::new(backend),
            cues,
            catalog,
            settings,
            editor: None,
            preview_backend: Box::new(preview_backend),
            rng: StdRng::from_entropy(),
            view,
            status_text: Cow::Borrowed("Ready"),
            is_error: false,
        }
    }

    /// Make random file picks reproducible
    pub fn seed_rng(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Apply a front-end command
    pub fn handle(&mut self, command: BoardCommand, now: Instant) -> Result<()> {
        match command {
            BoardCommand::Trigger { sound_id } => self.trigger(&sound_id, now),
            BoardCommand::PlayFile { sound_id, file } => self.play_file(&sound_id, &file, now),
            BoardCommand::StopAll => {
                self.stop_all();
                Ok(())
            }
            BoardCommand::ToggleView => {
                self.set_view(self.view.toggled());
                Ok(())
            }
            BoardCommand::OpenEditor { sound_id, file } => self.open_editor(&sound_id, &file),
            BoardCommand::SaveEditor => self.save_editor().map(|_| ()),
            BoardCommand::CloseEditor => {
                self.close_editor();
                Ok(())
            }
            BoardCommand::ClearCue { sound_id, file } => self.clear_cue(&sound_id, &file).map(|_| ()),
            BoardCommand::AdjustVolume { delta } => {
                self.adjust_volume(delta);
                Ok(())
            }
            BoardCommand::ToggleMute => {
                self.toggle_mute();
                Ok(())
            }
        }
    }

    // --- Playback ---

    /// Button press: play a random file of the sound with its cue point.
    ///
    /// Pressing the active sound again stops it.
    pub fn trigger(&mut self, sound_id: &str, now: Instant) -> Result<()> {
        let sound = self
            .catalog
            .find(sound_id)
            .ok_or_else(|| AppError::NotFound(format!("sound '{sound_id}'")))?;
        let file = sound
            .pick_file(&mut self.rng)
            .map(str::to_string)
            .ok_or_else(|| AppError::Catalog(format!("sound '{sound_id}' has no files")))?;
        self.start(sound_id, &file, now);
        Ok(())
    }

    /// Play one specific file of a sound
    pub fn play_file(&mut self, sound_id: &str, file: &str, now: Instant) -> Result<()> {
        if !self.sound(sound_id)?.has_file(file) {
            return Err(AppError::NotFound(format!("file {file} of sound '{sound_id}'")));
        }
        self.start(sound_id, file, now);
        Ok(())
    }

    pub fn stop_all(&mut self) {
        self.engine.stop_all();
    }

    /// Feed backend events, fire trim stops, poll the editor
    pub fn pump(&mut self, now: Instant) {
        self.engine.pump(now);
        for event in self.engine.drain_events() {
            self.apply_event(event);
        }

        if let Some(editor) = &mut self.editor {
            editor.pump(now);
            if let Some(message) = editor.take_warning() {
                self.set_status(message, true);
            }
        }
    }

    /// Longest safe sleep before the next `pump`
    pub fn poll_timeout(&self, now: Instant) -> Duration {
        let board = self.engine.poll_timeout(now);
        match &self.editor {
            Some(editor) => board.min(editor.preview().poll_timeout(now)),
            None => board,
        }
    }

    pub fn currently_playing(&self) -> Option<&str> {
        self.engine.currently_playing()
    }

    pub fn is_playing(&self) -> bool {
        self.engine.is_playing()
    }

    /// Sound requested and awaiting confirmation
    pub fn pending(&self) -> Option<&str> {
        match self.engine.state() {
            PlaybackState::Starting { sound_id, .. } => Some(sound_id),
            _ => None,
        }
    }

    // --- Cues ---

    pub fn cue(&self, sound_id: &str, file: &str) -> CuePoint {
        self.cues.get(sound_id, file)
    }

    pub fn set_cue(
        &mut self,
        sound_id: &str,
        file: &str,
        start_time: f64,
        end_time: Option<f64>,
    ) -> Result<CuePoint> {
        self.sound(sound_id)?;
        self.cues.set(sound_id, file, start_time, end_time)
    }

    /// Drop the stored cue so the file plays in full again
    pub fn clear_cue(&mut self, sound_id: &str, file: &str) -> Result<bool> {
        let cleared = self.cues.clear(sound_id, file)?;
        if cleared {
            self.set_status(format!("Cleared cue for {}", display_name(file)), false);
        }
        Ok(cleared)
    }

    /// Every file of every sound with its stored cue, in board order
    pub fn developer_listing(&self) -> Vec<CueListing> {
        self.catalog
            .groups()
            .iter()
            .flat_map(|group| {
                group.sounds.iter().flat_map(move |sound| {
                    sound
                        .files()
                        .iter()
                        .enumerate()
                        .map(move |(index, file)| (group, sound, index, file))
                })
            })
            .map(|(group, sound, index, file)| CueListing {
                group_id: group.id.clone(),
                sound_id: sound.id.clone(),
                sound_name: sound.name.clone(),
                icon: sound.icon.clone(),
                number: index + 1,
                file: file.clone(),
                display_name: display_name(file),
                cue: self.cues.get(&sound.id, file),
            })
            .collect()
    }

    // --- Editor ---

    /// Open the cue editor for one file. Replaces any open editor.
    pub fn open_editor(&mut self, sound_id: &str, file: &str) -> Result<()> {
        if !self.sound(sound_id)?.has_file(file) {
            return Err(AppError::NotFound(format!("file {file} of sound '{sound_id}'")));
        }
        self.close_editor();
        let path = self.settings.resolve_sound_path(file);
        let stored = self.cues.get(sound_id, file);
        let mut backend = (self.preview_backend)();
        backend.set_volume(self.settings.effective_volume());
        self.editor = Some(CueEditor::open(sound_id, file, path, stored, backend));
        Ok(())
    }

    /// Persist the editor's window and close it.
    ///
    /// On a write failure the editor stays open with its edits.
    pub fn save_editor(&mut self) -> Result<Option<CuePoint>> {
        let Some(editor) = &mut self.editor else {
            return Ok(None);
        };
        let cue = editor.save(&mut self.cues)?;
        let name = editor.title();
        self.close_editor();
        self.set_status(format!("Saved cue for {name}: {cue}"), false);
        Ok(Some(cue))
    }

    /// Close the editor, discarding its edits
    pub fn close_editor(&mut self) {
        if let Some(editor) = self.editor.take() {
            editor.close();
        }
    }

    pub fn editor(&self) -> Option<&CueEditor<B>> {
        self.editor.as_ref()
    }

    pub fn editor_mut(&mut self) -> Option<&mut CueEditor<B>> {
        self.editor.as_mut()
    }

    // --- Output level ---

    /// Nudge the output level by `delta`; unmutes. Returns the new level.
    pub fn adjust_volume(&mut self, delta: f32) -> f32 {
        let volume = self.settings.volume + delta;
        self.settings.set_volume(volume);
        self.settings.muted = false;
        self.apply_volume();
        self.settings.volume
    }

    /// Returns true when output is now muted
    pub fn toggle_mute(&mut self) -> bool {
        self.settings.muted = !self.settings.muted;
        self.apply_volume();
        self.settings.muted
    }

    fn apply_volume(&mut self) {
        let volume = self.settings.effective_volume();
        self.engine.backend_mut().set_volume(volume);
        if let Some(editor) = &mut self.editor {
            editor.set_preview_volume(volume);
        }
        let text = if self.settings.muted {
            "Muted".to_string()
        } else {
            format!("Volume {:.0}%", self.settings.volume * 100.0)
        };
        info!("{text}");
        self.set_status(text, false);
    }

    // --- View ---

    pub fn view(&self) -> View {
        self.view
    }

    pub fn set_view(&mut self, view: View) {
        if view == View::Board {
            self.close_editor();
        }
        self.view = view;
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn engine(&self) -> &PlaybackEngine<B> {
        &self.engine
    }

    /// Show a failed command in the status line
    pub fn report(&mut self, error: &AppError) {
        warn!("{error}");
        self.set_status(error.to_string(), true);
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            view: self.view,
            playing: self.currently_playing().map(str::to_string),
            pending: self.pending().map(str::to_string),
            editor_open: self.editor.is_some(),
            status_text: self.status_text.clone(),
            is_error: self.is_error,
        }
    }

    fn sound(&self, sound_id: &str) -> Result<&Sound> {
        self.catalog
            .find(sound_id)
            .ok_or_else(|| AppError::NotFound(format!("sound '{sound_id}'")))
    }

    fn start(&mut self, sound_id: &str, file: &str, now: Instant) {
        let cue = self.cues.get(sound_id, file);
        let path = self.settings.resolve_sound_path(file);
        info!(sound_id, file, %cue, "Trigger");
        self.engine.play_cue_at(sound_id, &path, cue, now);
    }

    fn apply_event(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Started { sound_id } => {
                let label = self.label(&sound_id);
                self.set_status(format!("Playing {label}"), false);
            }
            PlaybackEvent::Stopped { sound_id, reason } => {
                // A replacement reports its own start
                if reason != StopReason::Replaced && reason != StopReason::Failed {
                    let label = self.label(&sound_id);
                    self.set_status(format!("Ready ({label} {reason})"), false);
                }
            }
            PlaybackEvent::Warning(message) => {
                warn!("{message}");
                self.set_status(message, true);
            }
        }
    }

    fn label(&self, sound_id: &str) -> String {
        self.catalog
            .find(sound_id)
            .map(|s| s.name.clone())
            .unwrap_or_else(|| sound_id.to_string())
    }

    fn set_status(&mut self, text: impl Into<Cow<'static, str>>, is_error: bool) {
        self.status_text = text.into();
        self.is_error = is_error;
    }
}
