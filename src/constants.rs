//! Configuration constants for the song quiz session
//!
//! This module contains the defaults and bounds used throughout the crate
//! so that validation, playback timing and rendering agree on one set of
//! numbers.

/// Playback timing constants
pub mod playback {
    /// Default clip length in seconds before the round times out
    pub const DEFAULT_DURATION: u64 = 30;
    /// Minimum clip length in seconds
    pub const MIN_DURATION: u64 = 5;
    /// Maximum clip length in seconds
    pub const MAX_DURATION: u64 = 240;
    /// Default offset in seconds at which the hint is revealed
    pub const DEFAULT_HINT_DELAY: u64 = 15;
    /// Minimum hint offset in seconds
    pub const MIN_HINT_DELAY: u64 = 0;
    /// Maximum hint offset in seconds
    pub const MAX_HINT_DELAY: u64 = 240;
    /// Default interval in milliseconds between progress ticks
    pub const DEFAULT_TICK_MILLIS: u64 = 1_000;
    /// Minimum tick interval in milliseconds
    pub const MIN_TICK_MILLIS: u64 = 100;
    /// Maximum tick interval in milliseconds
    pub const MAX_TICK_MILLIS: u64 = 5_000;
}

/// Circular progress indicator geometry
pub mod indicator {
    /// Radius of the progress ring
    pub const RADIUS: f64 = 80.;
    /// Width and height of the square the ring is drawn in
    pub const SIZE: u32 = 200;
    /// Stroke width of the ring
    pub const STROKE_WIDTH: u32 = 10;
}

/// Chat answer constants
pub mod answer {
    /// Maximum length of a chat username in characters
    pub const MAX_USERNAME_LENGTH: usize = 64;
    /// Maximum length of a submitted answer in characters
    pub const MAX_LENGTH: usize = 200;
    /// Number of most recent chat answers a session keeps for inspection
    pub const MAX_RECORDED_ATTEMPTS: usize = 256;
}

/// Results screen constants
pub mod leaderboard {
    /// Maximum number of standings listed on the results screen
    pub const DISPLAY_LIMIT: usize = 50;
}

/// Backend connection constants
pub mod backend {
    /// Environment variable holding the backend base URL
    pub const BASE_URL_ENV: &str = "SONGQUIZ_API_URL";
    /// Environment variable holding the request timeout in seconds
    pub const TIMEOUT_ENV: &str = "SONGQUIZ_API_TIMEOUT_SECS";
    /// Base URL used when none is configured
    pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
    /// Request timeout in seconds used when none is configured
    pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
}
