//! Audio subsystem
//!
//! Handles the single-voice playback state machine, the platform backend seam,
//! clip decoding, and device output.

pub mod backend;
pub mod decoder;
pub mod engine;
pub mod output;
pub mod types;

pub use backend::{AudioBackend, ScriptedBackend};
pub use decoder::{probe_duration, spawn_duration_probe, ClipSource};
pub use engine::PlaybackEngine;
pub use output::RodioBackend;
pub use types::{
    PlaybackEvent, PlaybackState, StopReason, VoiceCommand, VoiceEvent, VoiceRequest,
};
