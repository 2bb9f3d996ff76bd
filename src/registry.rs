//! Top-level directory of live rooms
//!
//! The registry owns every room, allocates codes, and routes each inbound
//! command and alarm to the room it addresses. The embedding server drives
//! it through three entry points: [`RoomRegistry::receive_message`] for
//! client commands, [`RoomRegistry::receive_alarm`] for timer wakeups, and
//! [`RoomRegistry::handle_disconnect`] for transport-level connection
//! loss. Commands for one registry must be fed in serially; the registry
//! itself never blocks and never sleeps, handing wakeups to the embedder's
//! scheduling closure instead.

use std::collections::HashMap;

use garde::Validate;
use serde::{Deserialize, Serialize};
use tracing::info;
use web_time::Duration;

use crate::{
    AlarmMessage, ClientMessage, Error, ServerMessage, clock,
    constants::room::{GRACE_PERIOD_SECONDS, MAX_ROOM_COUNT},
    presence::ActivityStatus,
    room::{Room, RoomOptions},
    room_code::RoomCode,
    roster::PlayerId,
    session::{ConnectionId, Tunnel},
    team::RoomMode,
};

/// What happens to a room when its host leaves explicitly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostLeavePolicy {
    /// The room continues hostless; host commands are rejected until the
    /// host identity rejoins
    #[default]
    Freeze,
    /// The room is torn down and every remaining tunnel is closed
    Destroy,
}

/// Registry-wide tunables supplied by the embedding server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Maximum number of simultaneously live rooms
    pub max_rooms: usize,
    /// Teardown behavior when a host leaves explicitly
    pub host_leave_policy: HostLeavePolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_rooms: MAX_ROOM_COUNT,
            host_leave_policy: HostLeavePolicy::default(),
        }
    }
}

/// Directory of live rooms plus the connection routing index
#[derive(Default)]
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, Room>,
    /// Which room and identity each live connection is attached to
    connections: HashMap<ConnectionId, (RoomCode, PlayerId)>,
    config: RegistryConfig,
}

impl RoomRegistry {
    /// Creates a registry with the given configuration
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Number of currently live rooms
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Looks a live room up by code
    pub fn room(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    /// Routes one client command to its handler
    ///
    /// `sync_ping` is answered before any room lookup so clock probes are
    /// never delayed by room processing. Any recoverable failure is
    /// reported as an `error` message to the originating connection only.
    pub fn receive_message<
        T: Tunnel,
        F: Fn(ConnectionId) -> Option<T>,
        S: FnMut(AlarmMessage, Duration),
    >(
        &mut self,
        connection: ConnectionId,
        message: ClientMessage,
        schedule: S,
        tunnel_finder: F,
    ) {
        if let ClientMessage::SyncPing { client_time } = message {
            if let Some(tunnel) = tunnel_finder(connection) {
                tunnel.send_message(&clock::answer(client_time));
            }
            return;
        }

        let result = self.dispatch(connection, message, schedule, &tunnel_finder);
        if let Err(error) = result {
            if let Some(tunnel) = tunnel_finder(connection) {
                tunnel.send_message(&ServerMessage::from(error));
            }
        }
    }

    fn dispatch<
        T: Tunnel,
        F: Fn(ConnectionId) -> Option<T>,
        S: FnMut(AlarmMessage, Duration),
    >(
        &mut self,
        connection: ConnectionId,
        message: ClientMessage,
        schedule: S,
        tunnel_finder: &F,
    ) -> Result<(), Error> {
        match message {
            ClientMessage::CreateRoom {
                name,
                user_id,
                mode,
                options,
            } => self.create_room(connection, &name, user_id, mode, options, tunnel_finder),
            ClientMessage::JoinRoom {
                room_id,
                name,
                user_id,
                team_id,
            } => {
                self.room_mut(&room_id)?
                    .join(connection, &name, &user_id, team_id, tunnel_finder)?;
                self.connections.insert(connection, (room_id, user_id));
                Ok(())
            }
            ClientMessage::RejoinRoom {
                room_id,
                name,
                user_id,
            } => {
                self.room_mut(&room_id)?
                    .rejoin(connection, &name, &user_id, tunnel_finder)?;
                self.connections.insert(connection, (room_id, user_id));
                Ok(())
            }
            ClientMessage::LeaveRoom { room_id, user_id } => {
                self.leave_room(&room_id, &user_id, schedule, tunnel_finder)
            }
            ClientMessage::Buzz {
                room_id,
                user_id,
                timestamp,
            } => self
                .room_mut(&room_id)?
                .buzz(&user_id, timestamp, tunnel_finder),
            ClientMessage::ToggleLock { room_id, user_id } => self
                .room_mut(&room_id)?
                .toggle_lock(&user_id, tunnel_finder),
            ClientMessage::Reset { room_id, user_id } => {
                self.room_mut(&room_id)?.reset(&user_id, tunnel_finder)
            }
            ClientMessage::StartQuestion { room_id, user_id } => self
                .room_mut(&room_id)?
                .start_question(&user_id, schedule, tunnel_finder),
            ClientMessage::AwardWin {
                room_id,
                user_id,
                team,
            } => self
                .room_mut(&room_id)?
                .award_win(&user_id, &team, tunnel_finder),
            ClientMessage::UpdateStatus {
                room_id,
                user_id,
                status,
            } => self.update_status(&room_id, &user_id, status, tunnel_finder),
            ClientMessage::SyncPing { .. } => Ok(()),
        }
    }

    fn room_mut(&mut self, code: &RoomCode) -> Result<&mut Room, Error> {
        self.rooms.get_mut(code).ok_or(Error::RoomNotFound)
    }

    fn create_room<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        connection: ConnectionId,
        name: &str,
        user_id: PlayerId,
        mode: RoomMode,
        options: RoomOptions,
        tunnel_finder: &F,
    ) -> Result<(), Error> {
        user_id.validate()?;
        let name = crate::roster::validate_name(name)?;
        options.validate().map_err(|_| Error::InvalidOptions)?;
        if self.rooms.len() >= self.config.max_rooms {
            return Err(Error::CapacityReached);
        }

        let code = loop {
            let candidate = RoomCode::generate();
            if !self.rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        info!(room = %code, ?mode, "room created");
        let room = Room::new(
            code.clone(),
            mode,
            options,
            user_id.clone(),
            name,
            connection,
        );
        self.rooms.insert(code.clone(), room);
        self.connections
            .insert(connection, (code.clone(), user_id));

        if let Some(tunnel) = tunnel_finder(connection) {
            tunnel.send_message(&ServerMessage::RoomCreated { room_id: code });
        }
        Ok(())
    }

    fn leave_room<
        T: Tunnel,
        F: Fn(ConnectionId) -> Option<T>,
        S: FnMut(AlarmMessage, Duration),
    >(
        &mut self,
        code: &RoomCode,
        user_id: &PlayerId,
        mut schedule: S,
        tunnel_finder: &F,
    ) -> Result<(), Error> {
        let room = self.room_mut(code)?;
        let outcome = room.leave(user_id, tunnel_finder)?;
        self.connections
            .retain(|_, (room_code, player)| !(room_code == code && player == user_id));

        if outcome.was_host && self.config.host_leave_policy == HostLeavePolicy::Destroy {
            info!(room = %code, "room destroyed after host left");
            if let Some(room) = self.rooms.remove(code) {
                room.close_all(tunnel_finder);
            }
            self.connections.retain(|_, (room_code, _)| room_code != code);
            return Ok(());
        }

        if self.rooms.get(code).is_some_and(|room| !room.any_online()) {
            schedule(
                AlarmMessage::RoomExpiry { room: code.clone() },
                Duration::from_secs(GRACE_PERIOD_SECONDS),
            );
        }
        Ok(())
    }

    fn update_status<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        code: &RoomCode,
        user_id: &PlayerId,
        status: ActivityStatus,
        tunnel_finder: &F,
    ) -> Result<(), Error> {
        self.room_mut(code)?
            .set_activity(user_id, status, tunnel_finder)
    }

    /// Applies a timer wakeup previously handed to the scheduling closure
    ///
    /// Alarms are advisory: one that arrives for a room that was since
    /// torn down, or for a state that was since reset, is dropped silently.
    pub fn receive_alarm<
        T: Tunnel,
        F: Fn(ConnectionId) -> Option<T>,
        S: FnMut(AlarmMessage, Duration),
    >(
        &mut self,
        alarm: AlarmMessage,
        schedule: S,
        tunnel_finder: F,
    ) {
        match alarm {
            AlarmMessage::CountdownTick { room, value } => {
                if let Some(room) = self.rooms.get_mut(&room) {
                    room.tick_countdown(value, schedule, &tunnel_finder);
                }
            }
            AlarmMessage::RoomExpiry { room: code } => {
                let expired = self
                    .rooms
                    .get(&code)
                    .is_some_and(|room| !room.any_online());
                if expired {
                    info!(room = %code, "empty room expired");
                    self.rooms.remove(&code);
                    self.connections.retain(|_, (room, _)| room != &code);
                }
            }
        }
    }

    /// Handles a transport-level connection loss
    ///
    /// The player is marked offline but keeps their roster entry and any
    /// buzz queue position. When the room is left with no live connection
    /// a teardown grace period starts.
    pub fn handle_disconnect<
        T: Tunnel,
        F: Fn(ConnectionId) -> Option<T>,
        S: FnMut(AlarmMessage, Duration),
    >(
        &mut self,
        connection: ConnectionId,
        mut schedule: S,
        tunnel_finder: F,
    ) {
        let Some((code, _)) = self.connections.remove(&connection) else {
            return;
        };
        let Some(room) = self.rooms.get_mut(&code) else {
            return;
        };
        room.mark_offline(connection, &tunnel_finder);
        if !room.any_online() {
            schedule(
                AlarmMessage::RoomExpiry { room: code },
                Duration::from_secs(GRACE_PERIOD_SECONDS),
            );
        }
    }
}
