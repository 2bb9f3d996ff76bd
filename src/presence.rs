//! Player presence tracking
//!
//! Presence has two independent axes. The connection axis follows the
//! transport: a player goes offline when their connection drops and online
//! again when a connection with the same identity attaches. The activity
//! axis follows a client-reported visibility signal (tab focused or not)
//! and is unrelated to the transport. Both are advisory display state:
//! neither axis removes a player from the room or from buzz eligibility,
//! and an away player keeps any queue position they already earned.

use serde::{Deserialize, Serialize};

use crate::session::ConnectionId;

/// Connection liveness of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// A transport connection is currently attached
    Online,
    /// No transport connection is attached
    Offline,
}

/// Client-reported activity of a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityStatus {
    /// The client reports itself visible and active
    #[default]
    Active,
    /// The client reports itself hidden or backgrounded
    Away,
}

/// Presence state of one player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presence {
    session: Option<ConnectionId>,
    activity: ActivityStatus,
}

impl Presence {
    /// Creates presence for a freshly attached connection
    pub fn online(connection: ConnectionId) -> Self {
        Self {
            session: Some(connection),
            activity: ActivityStatus::Active,
        }
    }

    /// Attaches a connection, replacing any previous one
    ///
    /// Reconnecting also resets the activity axis: a client that just
    /// attached is by definition visible.
    pub fn attach(&mut self, connection: ConnectionId) {
        self.session = Some(connection);
        self.activity = ActivityStatus::Active;
    }

    /// Detaches the current connection, if the given id still owns it
    ///
    /// The guard matters: a stale disconnect notification arriving after
    /// the same identity already reconnected must not knock the fresh
    /// connection offline.
    pub fn detach(&mut self, connection: ConnectionId) -> bool {
        if self.session == Some(connection) {
            self.session = None;
            true
        } else {
            false
        }
    }

    /// The currently attached connection, if any
    pub fn session(&self) -> Option<ConnectionId> {
        self.session
    }

    /// Connection axis as reported in the player list
    pub fn connection_status(&self) -> ConnectionStatus {
        if self.session.is_some() {
            ConnectionStatus::Online
        } else {
            ConnectionStatus::Offline
        }
    }

    /// Sets the activity axis from the client's visibility signal
    pub fn set_activity(&mut self, activity: ActivityStatus) {
        self.activity = activity;
    }

    /// Activity axis as reported in the player list
    pub fn activity(&self) -> ActivityStatus {
        self.activity
    }
}
