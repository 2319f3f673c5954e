//! Configuration constants for the courtside engine

/// Audio output configuration
pub mod audio {
    /// Output thread poll interval in milliseconds; bounds end-of-clip detection latency
    pub const OUTPUT_TICK_MS: u64 = 20;

    /// Capacity of the command channel into the output thread
    pub const COMMAND_CHANNEL_CAPACITY: usize = 32;

    /// Capacity of the voice event channel out of the output thread
    pub const EVENT_CHANNEL_CAPACITY: usize = 64;

    /// Upper bound for the master volume
    pub const MAX_VOLUME: f32 = 1.0;
}

/// Playback engine scheduling
pub mod engine {
    /// Longest a driver should wait between `pump` calls when no trim stop is pending
    pub const IDLE_TICK_MS: u64 = 50;
}

/// Cue point limits
pub mod cue {
    /// Longest offset a cue may resolve to, in seconds. Starts past it are
    /// pulled back; ends past it mean "play to the natural end".
    pub const MAX_CUE_SECS: f64 = 24.0 * 60.0 * 60.0;
}

/// Timeout configuration
pub mod timeouts {
    /// Maximum time to wait for a duration probe in seconds
    pub const PROBE_TIMEOUT_SECS: u64 = 10;

    /// Maximum time to wait for the output device to open in seconds
    pub const OUTPUT_INIT_TIMEOUT_SECS: u64 = 5;
}
