//! Configuration constants for courtside app services

/// Application metadata
pub mod app {
    /// Application name (used for config directory, etc.)
    pub const NAME: &str = "courtside";
}

/// Persisted data files inside the config directory
pub mod files {
    /// Cue-point map, keyed by `"<soundId>:<filePath>"`
    pub const CUES: &str = "cues.json";

    /// User settings
    pub const SETTINGS: &str = "settings.json";

    /// Log output of the terminal front-end
    pub const LOG: &str = "courtside.log";
}

/// Cue editor configuration
pub mod editor {
    /// Step used when nudging the timeline cursor, in seconds
    pub const NUDGE_SECS: f64 = 0.1;
}
