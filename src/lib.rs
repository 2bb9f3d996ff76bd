//! # Bzzt Buzzer Coordinator
//!
//! This library implements the room coordinator for a real-time multiplayer
//! buzzer game: clients join a shared room addressed by a short code, and when
//! a question is read, the first (or first-per-team) client to buzz wins the
//! turn. The coordinator owns the authoritative buzz ordering, host authority,
//! team semantics, and presence; the transport is abstracted behind the
//! [`session::Tunnel`] trait and the embedding server feeds commands in one at
//! a time per [`registry::RoomRegistry`].

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

pub mod arbitrator;
pub mod clock;
pub mod constants;
pub mod host;
pub mod presence;
pub mod registry;
pub mod room;
pub mod room_code;
pub mod roster;
pub mod session;
pub mod team;

use arbitrator::BuzzEntry;
use room::RoomOptions;
use room_code::RoomCode;
use roster::{PlayerEntry, PlayerId};
use team::{RoomMode, TeamName, TeamStats};

/// Version of the client/server wire schema.
///
/// Bumped whenever a message shape changes incompatibly; both sides of the
/// wire are expected to agree on it out of band.
pub const PROTOCOL_VERSION: u32 = 1;

/// Recoverable command failures reported to the originating connection
///
/// Every variant maps to an `error` message on the wire; none of them tears
/// down the connection or the room, and no command that fails with one of
/// these partially applies.
#[derive(ThisError, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No live room matches the supplied code
    #[error("room not found")]
    RoomNotFound,
    /// The identity token or display name is absent or empty
    #[error("identity or name missing")]
    IdentityMissing,
    /// The room is in team mode and no team was supplied
    #[error("team selection required")]
    TeamRequired,
    /// A host-only command was issued by a non-host identity
    #[error("only the host can do that")]
    NotHost,
    /// The player (or their team, in team mode) already has a buzz recorded
    #[error("already buzzed this round")]
    DuplicateBuzz,
    /// Buzzing is gated off by the lock or an in-progress countdown
    #[error("buzzers are closed")]
    BuzzersClosed,
    /// A coordinator-wide bound (room count, players per room) was hit
    #[error("capacity reached")]
    CapacityReached,
    /// The display name is too long or fails the content filter
    #[error("name is not allowed")]
    InvalidName,
    /// Room options are outside their permitted ranges
    #[error("invalid room options")]
    InvalidOptions,
}

/// Messages sent by clients to the coordinator
///
/// This is the complete, closed inbound wire schema. Payload field names
/// use the camelCase convention of the wire protocol; the embedding
/// server decodes JSON into this enum and hands it to
/// [`registry::RoomRegistry::receive_message`].
#[derive(Debug, Deserialize, Clone)]
pub enum ClientMessage {
    /// Create a new room; the sender becomes its host
    #[serde(rename = "createRoom", rename_all = "camelCase")]
    CreateRoom {
        /// Display name of the creator
        name: String,
        /// Durable opaque identity token
        user_id: PlayerId,
        /// Solo or team buzzing (defaults to solo)
        #[serde(default)]
        mode: RoomMode,
        /// Tunable room behavior (defaults apply when omitted)
        #[serde(default)]
        options: RoomOptions,
    },
    /// Join an existing room
    #[serde(rename = "joinRoom", rename_all = "camelCase")]
    JoinRoom {
        /// Code of the room to join
        room_id: RoomCode,
        /// Display name of the joiner
        name: String,
        /// Durable opaque identity token
        user_id: PlayerId,
        /// Team to join (required in team mode)
        #[serde(default)]
        team_id: Option<TeamName>,
    },
    /// Re-attach after a reload, recovering the previous team and host flag
    #[serde(rename = "rejoinRoom", rename_all = "camelCase")]
    RejoinRoom {
        /// Code of the room to rejoin
        room_id: RoomCode,
        /// Display name (may have changed since the last session)
        name: String,
        /// Durable opaque identity token
        user_id: PlayerId,
    },
    /// Leave a room explicitly
    #[serde(rename = "leaveRoom", rename_all = "camelCase")]
    LeaveRoom {
        /// Code of the room to leave
        room_id: RoomCode,
        /// Identity of the leaving player
        user_id: PlayerId,
    },
    /// Submit a buzz with an offset-corrected client timestamp
    #[serde(rename = "buzz", rename_all = "camelCase")]
    Buzz {
        /// Code of the room buzzed in
        room_id: RoomCode,
        /// Identity of the buzzing player
        user_id: PlayerId,
        /// Client-reported, offset-corrected time in milliseconds
        timestamp: u64,
    },
    /// Flip the room lock (host only)
    #[serde(rename = "toggleLock", rename_all = "camelCase")]
    ToggleLock {
        /// Code of the room
        room_id: RoomCode,
        /// Identity of the sender (must be the host)
        user_id: PlayerId,
    },
    /// Clear the buzz queue and return the round to idle (host only)
    #[serde(rename = "reset", rename_all = "camelCase")]
    Reset {
        /// Code of the room
        room_id: RoomCode,
        /// Identity of the sender (must be the host)
        user_id: PlayerId,
    },
    /// Begin the question countdown (host only)
    #[serde(rename = "startQuestion", rename_all = "camelCase")]
    StartQuestion {
        /// Code of the room
        room_id: RoomCode,
        /// Identity of the sender (must be the host)
        user_id: PlayerId,
    },
    /// Credit a win to a team explicitly (host only)
    #[serde(rename = "awardWin", rename_all = "camelCase")]
    AwardWin {
        /// Code of the room
        room_id: RoomCode,
        /// Identity of the sender (must be the host)
        user_id: PlayerId,
        /// Competing team receiving the win
        team: TeamName,
    },
    /// Report the client-side visibility signal
    #[serde(rename = "updateStatus", rename_all = "camelCase")]
    UpdateStatus {
        /// Code of the room
        room_id: RoomCode,
        /// Identity of the reporting player
        user_id: PlayerId,
        /// New activity status
        status: presence::ActivityStatus,
    },
    /// Clock synchronization probe; answered on the fast path
    #[serde(rename = "sync_ping", rename_all = "camelCase")]
    SyncPing {
        /// Client wall-clock reading at send time, in milliseconds
        client_time: u64,
    },
}

/// Messages sent by the coordinator to clients
///
/// Broadcast to every connection in the affected room, except
/// [`ServerMessage::RoomCreated`], [`ServerMessage::SyncPong`] and
/// [`ServerMessage::Error`] which target only the requester.
#[derive(Debug, Serialize, Clone, PartialEq, derive_more::From)]
pub enum ServerMessage {
    /// Acknowledges room creation with the allocated code
    #[serde(rename = "roomCreated", rename_all = "camelCase")]
    RoomCreated {
        /// The freshly allocated room code
        room_id: RoomCode,
    },
    /// Current player roster of the room
    #[serde(rename = "playerList")]
    #[from]
    PlayerList(Vec<PlayerEntry>),
    /// Current ranked buzz queue; position 0 is the winner
    #[serde(rename = "buzzOrder")]
    #[from]
    BuzzOrder(Vec<BuzzEntry>),
    /// Current lock state of the room
    #[serde(rename = "lockStatus")]
    LockStatus(bool),
    /// Countdown tick; 0 signals the end of the countdown
    #[serde(rename = "countdownUpdate")]
    CountdownUpdate(u8),
    /// Whether buzz submissions are currently being accepted
    #[serde(rename = "buzzersEnabled")]
    BuzzersEnabled(bool),
    /// Cumulative per-team win tally
    #[serde(rename = "statsUpdate")]
    #[from]
    StatsUpdate(TeamStats),
    /// Answer to a clock synchronization probe
    #[serde(rename = "sync_pong", rename_all = "camelCase")]
    SyncPong {
        /// Echo of the client's reported send time
        client_time: u64,
        /// Server wall-clock reading at receive time, in milliseconds
        server_time: u64,
    },
    /// A recoverable command failure
    #[serde(rename = "error")]
    Error {
        /// Human-readable description of the failure
        message: String,
    },
}

impl ServerMessage {
    /// Converts the message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

impl From<Error> for ServerMessage {
    fn from(error: Error) -> Self {
        Self::Error {
            message: error.to_string(),
        }
    }
}

/// Timer-fired messages re-entering the serialized command stream
///
/// The coordinator never sleeps while holding a room: whenever it needs a
/// future wakeup it hands one of these to the embedder's scheduling closure
/// together with a delay, and the embedder later feeds it back through
/// [`registry::RoomRegistry::receive_alarm`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Next countdown tick for a room's question round
    CountdownTick {
        /// Room whose countdown is running
        room: RoomCode,
        /// Value this tick will broadcast
        value: u8,
    },
    /// Grace period for an emptied room has elapsed
    RoomExpiry {
        /// Room to tear down if still empty
        room: RoomCode,
    },
}
