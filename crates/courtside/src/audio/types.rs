//! Shared audio types
//!
//! Pure data types used across the audio subsystem.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Current playback state of the engine
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    /// A voice was requested but the backend has not confirmed it yet
    Starting { sound_id: String, generation: u64 },
    /// The backend confirmed the voice is audible
    Playing { sound_id: String, generation: u64 },
}

impl PlaybackState {
    /// Sound owning the active voice, confirmed or not
    pub fn sound_id(&self) -> Option<&str> {
        match self {
            PlaybackState::Idle => None,
            PlaybackState::Starting { sound_id, .. } | PlaybackState::Playing { sound_id, .. } => {
                Some(sound_id)
            }
        }
    }

    /// Generation of the active voice
    pub fn generation(&self) -> Option<u64> {
        match self {
            PlaybackState::Idle => None,
            PlaybackState::Starting { generation, .. }
            | PlaybackState::Playing { generation, .. } => Some(*generation),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, PlaybackState::Idle)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "Idle"),
            PlaybackState::Starting { sound_id, .. } => write!(f, "Starting({sound_id})"),
            PlaybackState::Playing { sound_id, .. } => write!(f, "Playing({sound_id})"),
        }
    }
}

/// Request for the backend to start one voice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceRequest {
    /// Play-attempt token; every event about this voice carries it back
    pub generation: u64,
    pub path: PathBuf,
    /// Seek offset applied before the voice becomes audible
    pub offset: Duration,
}

/// Commands sent to the output thread
#[derive(Debug)]
pub enum VoiceCommand {
    Start(VoiceRequest),
    /// Stop and release the voice if it is still the one with this generation
    Stop { generation: u64 },
    /// Set master volume (0.0..=1.0)
    SetVolume(f32),
    /// Shut down the output thread
    Shutdown,
}

/// Lifecycle notifications from the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    /// The voice is producing sound
    Started { generation: u64 },
    /// The clip ran out of samples
    Ended { generation: u64 },
    /// The voice could not start or died mid-clip
    Failed { generation: u64, message: String },
}

impl VoiceEvent {
    pub fn generation(&self) -> u64 {
        match self {
            VoiceEvent::Started { generation }
            | VoiceEvent::Ended { generation }
            | VoiceEvent::Failed { generation, .. } => *generation,
        }
    }
}

/// Why a voice went away
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The same sound was triggered again
    Toggled,
    /// A different sound took over
    Replaced,
    /// `stop_all` was called
    StopAll,
    /// Natural end of the clip
    Ended,
    /// The cue point's end was reached
    TrimReached,
    /// The backend rejected or lost the voice
    Failed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            StopReason::Toggled => "toggled",
            StopReason::Replaced => "replaced",
            StopReason::StopAll => "stopped",
            StopReason::Ended => "ended",
            StopReason::TrimReached => "cue end",
            StopReason::Failed => "failed",
        };
        f.write_str(label)
    }
}

/// Events emitted by the playback engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// Playback confirmed for a sound
    Started { sound_id: String },
    /// The active sound went idle
    Stopped { sound_id: String, reason: StopReason },
    /// Non-fatal problem (start rejected, device unavailable, ...)
    Warning(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_has_no_identity() {
        let state = PlaybackState::default();
        assert!(state.is_idle());
        assert_eq!(state.sound_id(), None);
        assert_eq!(state.generation(), None);
    }

    #[test]
    fn starting_and_playing_expose_identity() {
        let starting = PlaybackState::Starting {
            sound_id: "ace".to_string(),
            generation: 3,
        };
        assert_eq!(starting.sound_id(), Some("ace"));
        assert_eq!(starting.generation(), Some(3));
        assert!(!starting.is_idle());

        let playing = PlaybackState::Playing {
            sound_id: "boo".to_string(),
            generation: 7,
        };
        assert_eq!(playing.sound_id(), Some("boo"));
        assert_eq!(playing.generation(), Some(7));
    }

    #[test]
    fn playback_state_display() {
        assert_eq!(PlaybackState::Idle.to_string(), "Idle");
        let playing = PlaybackState::Playing {
            sound_id: "siren".to_string(),
            generation: 1,
        };
        assert_eq!(playing.to_string(), "Playing(siren)");
    }

    #[test]
    fn voice_event_generation() {
        assert_eq!(VoiceEvent::Started { generation: 4 }.generation(), 4);
        assert_eq!(VoiceEvent::Ended { generation: 5 }.generation(), 5);
        let failed = VoiceEvent::Failed {
            generation: 6,
            message: "nope".to_string(),
        };
        assert_eq!(failed.generation(), 6);
    }

    #[test]
    fn stop_reason_labels() {
        assert_eq!(StopReason::TrimReached.to_string(), "cue end");
        assert_eq!(StopReason::StopAll.to_string(), "stopped");
    }
}
