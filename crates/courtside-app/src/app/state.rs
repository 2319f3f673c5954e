//! Board commands and view state
//!
//! `BoardCommand` is what a front-end sends in response to input.
//! `BoardSnapshot` is what it reads back to render.

use std::borrow::Cow;

/// Which screen the front-end shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    /// Button grid for live use
    #[default]
    Board,
    /// Per-file cue listing and editor
    Developer,
}

impl View {
    pub fn toggled(self) -> Self {
        match self {
            View::Board => View::Developer,
            View::Developer => View::Board,
        }
    }
}

/// Commands sent by a front-end
#[derive(Debug, Clone, PartialEq)]
pub enum BoardCommand {
    /// Button press: random file of the sound, toggles if already active
    Trigger { sound_id: String },
    /// Play one chosen file of a sound
    PlayFile { sound_id: String, file: String },
    /// Panic stop
    StopAll,
    ToggleView,
    OpenEditor { sound_id: String, file: String },
    SaveEditor,
    CloseEditor,
    ClearCue { sound_id: String, file: String },
    /// Nudge the output level
    AdjustVolume { delta: f32 },
    ToggleMute,
}

/// Render state for a front-end
#[derive(Clone, Debug)]
pub struct BoardSnapshot {
    pub view: View,
    /// Sound confirmed as audible
    pub playing: Option<String>,
    /// Sound requested but not yet confirmed
    pub pending: Option<String>,
    pub editor_open: bool,
    pub status_text: Cow<'static, str>,
    /// True when status_text is a warning (for red UI text)
    pub is_error: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_toggles_both_ways() {
        assert_eq!(View::Board.toggled(), View::Developer);
        assert_eq!(View::Developer.toggled(), View::Board);
    }
}
