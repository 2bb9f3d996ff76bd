//! Communication session management
//!
//! This module defines the trait for tunneling messages between the room
//! coordinator and connected clients. The tunnel abstraction allows for
//! different communication mechanisms (WebSockets, Server-Sent Events, an
//! in-memory channel in tests) while maintaining a consistent interface.
//!
//! The coordinator looks tunnels up by [`ConnectionId`]
//! through a `tunnel_finder` closure passed into every command; it never
//! stores tunnels itself, so a reconnecting client simply starts resolving
//! to a fresh tunnel under a new connection id.

use std::{fmt::Display, str::FromStr};

use serde_with::{DeserializeFromStr, SerializeDisplay};
use uuid::Uuid;

use super::ServerMessage;

/// A unique identifier for one transport connection
///
/// Connections are transient: a client that reloads comes back with a new
/// connection id but the same identity token, and the roster swaps the old
/// id for the new one. The coordinator never treats this as a player key.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, DeserializeFromStr, SerializeDisplay,
)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Creates a new random connection id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ConnectionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::from_str(s)?))
    }
}

/// Trait for sending messages through a communication tunnel
///
/// Implementations are expected to deliver messages reliably and in order
/// for the lifetime of one connection; delivery guarantees across
/// reconnects are the coordinator's job, not the tunnel's.
pub trait Tunnel {
    /// Sends a message to the client behind this tunnel
    fn send_message(&self, message: &ServerMessage);

    /// Closes the communication tunnel
    ///
    /// Called when the coordinator discards a connection, for example when
    /// a room is destroyed under its teardown policy.
    fn close(self);
}
