//! Courtside: live soundboard engine
//!
//! Exclusive single-voice playback with cue-point trimming.
//!
//! ## Quick start
//!
//! ```no_run
//! use courtside::audio::{PlaybackEngine, RodioBackend};
//!
//! let mut engine = PlaybackEngine::new(RodioBackend::new(0.8));
//! engine.play("air-horn", "sounds/air-horn.mp3", 0.5, Some(3.0));
//! ```

pub mod audio;
pub mod config;
pub mod cue;
pub mod error;

pub use cue::{format_seconds, CuePoint, TrimWindow};
