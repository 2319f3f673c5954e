//! Cue points
//!
//! A cue point restricts playback of one clip to a `[start, end)` window.
//! `end_time: None` means "play to the natural end of the clip".

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::cue::MAX_CUE_SECS;

/// Trim window attached to a (sound, file) pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CuePoint {
    /// Offset into the clip where playback starts, in seconds
    #[serde(default)]
    pub start_time: f64,
    /// Offset where playback is cut, in seconds
    #[serde(default)]
    pub end_time: Option<f64>,
}

impl CuePoint {
    /// The untrimmed cue: start at zero, play to the end
    pub const FULL: CuePoint = CuePoint {
        start_time: 0.0,
        end_time: None,
    };

    /// Build a cue point from user-supplied values.
    ///
    /// Negative or non-finite starts become `0.0`; a non-finite end becomes `None`.
    pub fn new(start_time: f64, end_time: Option<f64>) -> Self {
        Self {
            start_time: sanitize_start(start_time),
            end_time: end_time.filter(|e| e.is_finite()),
        }
    }

    /// True when the cue differs from the untrimmed default
    pub fn has_trim(&self) -> bool {
        self.start_time > 0.0 || self.end_time.is_some()
    }

    /// Resolve the playback window for this cue.
    ///
    /// An end at or before the start disables the auto-stop instead of
    /// stopping at time zero. Values beyond `MAX_CUE_SECS` never reach a
    /// `Duration` unclamped.
    pub fn window(&self) -> TrimWindow {
        let start = sanitize_start(self.start_time).min(MAX_CUE_SECS);
        let stop_after = self
            .end_time
            .filter(|end| end.is_finite() && *end > start && *end <= MAX_CUE_SECS)
            .and_then(|end| Duration::try_from_secs_f64(end - start).ok());
        TrimWindow {
            offset: Duration::try_from_secs_f64(start).unwrap_or(Duration::ZERO),
            stop_after,
        }
    }
}

impl Default for CuePoint {
    fn default() -> Self {
        Self::FULL
    }
}

impl fmt::Display for CuePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_seconds(self.start_time))?;
        if let Some(end) = self.end_time {
            write!(f, " - {}", format_seconds(end))?;
        }
        Ok(())
    }
}

/// Resolved playback window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimWindow {
    /// Seek offset applied before the voice starts
    pub offset: Duration,
    /// Wall-clock playback time after which the voice is cut
    pub stop_after: Option<Duration>,
}

fn sanitize_start(start: f64) -> f64 {
    if start.is_finite() && start > 0.0 {
        start
    } else {
        0.0
    }
}

/// Format seconds as `m:ss`; invalid or non-positive input renders as `0:00`
pub fn format_seconds(seconds: f64) -> String {
    if !seconds.is_finite() || seconds <= 0.0 {
        return "0:00".to_string();
    }
    let whole = seconds.floor() as u64;
    format!("{}:{:02}", whole / 60, whole % 60)
}
