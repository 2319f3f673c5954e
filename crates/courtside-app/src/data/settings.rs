//! Operator settings
//!
//! Where the board finds its catalog and sound files, plus output level.
//! Command-line flags override whatever is stored here.

use crate::data::storage;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const FORMAT_VERSION: u32 = 1;
const DEFAULT_VOLUME: f32 = 0.8;

/// Board settings as stored in `settings.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub version: u32,

    /// Output level, 0.0 to 1.0
    pub volume: f32,

    /// Silences output without losing the level
    pub muted: bool,

    /// Sound catalog JSON; the built-in board is used when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog_path: Option<PathBuf>,

    /// Directory that catalog file paths resolve against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sound_root: Option<PathBuf>,

    /// Open in developer view instead of the board
    pub start_in_developer_view: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: FORMAT_VERSION,
            volume: DEFAULT_VOLUME,
            muted: false,
            catalog_path: None,
            sound_root: None,
            start_in_developer_view: false,
        }
    }
}

impl Settings {
    /// Read settings, falling back to defaults when the file is absent.
    ///
    /// A stored volume outside 0.0..=1.0 is pulled back into range.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut settings = storage::load_from::<Settings>(path)?.unwrap_or_default();
        settings.volume = sanitize_volume(settings.volume);
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        storage::save_to(path, self)
    }

    /// Store only the output level and mute flag into `path`.
    ///
    /// Other fields keep their on-disk values, so one-off command-line
    /// overrides are never persisted.
    pub fn save_levels_to(&self, path: &Path) -> Result<()> {
        let mut stored = storage::load_from::<Settings>(path)?.unwrap_or_default();
        stored.volume = self.volume;
        stored.muted = self.muted;
        stored.save_to(path)
    }

    /// Set the output level, clamped to 0.0..=1.0
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = sanitize_volume(volume);
    }

    /// Level handed to the output device
    pub fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            sanitize_volume(self.volume)
        }
    }

    /// Map a catalog file path to a location on disk.
    ///
    /// Catalog paths are written web-style (`/sounds/ace.mp3`), so a leading
    /// slash is treated as relative to the sound root when one is set.
    pub fn resolve_sound_path(&self, file: &str) -> PathBuf {
        match &self.sound_root {
            Some(root) => root.join(file.trim_start_matches('/')),
            None => PathBuf::from(file),
        }
    }
}

fn sanitize_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        DEFAULT_VOLUME
    } else {
        volume.clamp(0.0, 1.0)
    }
}
