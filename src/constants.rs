//! Configuration constants for the buzzer coordinator
//!
//! This module contains the coordinator-wide bounds and timing constants
//! used throughout the system. Capacity bounds exist so that a misbehaving
//! client cannot exhaust process resources; timing constants document the
//! cadence the protocol expects from both sides of the wire.

/// Room directory and lifecycle constants
pub mod room {
    /// Maximum number of live rooms per registry
    pub const MAX_ROOM_COUNT: usize = 10_000;
    /// Maximum number of players in a single room
    pub const MAX_PLAYER_COUNT: usize = 128;
    /// Number of characters in a room code
    pub const CODE_LENGTH: usize = 5;
    /// Seconds an empty room survives before teardown
    pub const GRACE_PERIOD_SECONDS: u64 = 300;
}

/// Question-round countdown constants
pub mod round {
    /// Default countdown value broadcast when a question starts
    pub const COUNTDOWN_START: u8 = 3;
    /// Minimum configurable countdown start value
    pub const MIN_COUNTDOWN_START: u8 = 1;
    /// Maximum configurable countdown start value
    pub const MAX_COUNTDOWN_START: u8 = 10;
    /// Seconds between countdown ticks
    pub const TICK_SECONDS: u64 = 1;
}

/// Clock synchronization constants
pub mod clock {
    /// Seconds between client clock-sync probes
    pub const SYNC_INTERVAL_SECONDS: u64 = 10;
    /// Number of round-trip samples kept for the rolling offset estimate
    pub const MAX_SAMPLES: usize = 8;
}

/// Player identity and naming constants
pub mod player {
    /// Maximum length of a display name in characters
    pub const MAX_NAME_LENGTH: usize = 30;
    /// Maximum length of an identity token in characters
    pub const MAX_IDENTITY_LENGTH: usize = 64;
    /// Maximum length of a team name in characters
    pub const MAX_TEAM_NAME_LENGTH: usize = 30;
}
