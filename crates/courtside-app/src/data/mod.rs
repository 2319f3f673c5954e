//! Data persistence
//!
//! Handles cue points, settings, and the JSON storage they share.

pub mod cues;
pub mod settings;
pub mod storage;

// Re-export common types
pub use cues::{CueConfig, CueStore};
pub use settings::Settings;
pub use storage::{config_dir, ensure_dir, load_from, resolve_config_dir, save_to};
