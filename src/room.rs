//! Room state and per-command mutation
//!
//! A room is a single logical unit of mutable state: the registry feeds it
//! one command at a time, every command either fully applies or fully
//! rejects, and broadcasts always reflect a completely applied mutation.
//! The room composes the components the commands delegate to: the
//! [`Roster`] for membership and presence, the [`BuzzArbitrator`] for
//! ordering, the [`HostAuthority`] for the lock and round lifecycle, and
//! [`TeamStats`] for win tallies.

use garde::Validate;
use serde::{Deserialize, Serialize};
use web_time::Duration;

use crate::{
    AlarmMessage, Error, ServerMessage,
    arbitrator::BuzzArbitrator,
    constants::{
        room::MAX_PLAYER_COUNT,
        round::{COUNTDOWN_START, MAX_COUNTDOWN_START, MIN_COUNTDOWN_START, TICK_SECONDS},
    },
    host::{self, CountdownStep, HostAuthority},
    presence::ActivityStatus,
    room_code::RoomCode,
    roster::{self, Player, PlayerId, Roster},
    session::{ConnectionId, Tunnel},
    team::{self, RoomMode, TeamName, TeamStats},
};

/// How a round's win is credited to a team
///
/// The observed design credits the win at first buzz, with no
/// correct/incorrect adjudication step. `Manual` is the adjudication
/// extension point: automatic crediting is disabled and the host awards
/// wins explicitly via `awardWin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WinCredit {
    /// Credit the first buzz of each round automatically
    #[default]
    FirstBuzz,
    /// Only credit wins the host awards explicitly
    Manual,
}

/// Tunable per-room behavior supplied at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Validate)]
#[serde(default, rename_all = "camelCase")]
pub struct RoomOptions {
    /// Countdown value a question starts from
    #[garde(range(min = MIN_COUNTDOWN_START, max = MAX_COUNTDOWN_START))]
    pub countdown_start: u8,
    /// Win crediting policy
    #[garde(skip)]
    pub win_credit: WinCredit,
    /// Maximum players this room accepts
    #[garde(range(min = 2, max = MAX_PLAYER_COUNT))]
    pub max_players: usize,
}

impl Default for RoomOptions {
    fn default() -> Self {
        Self {
            countdown_start: COUNTDOWN_START,
            win_credit: WinCredit::default(),
            max_players: MAX_PLAYER_COUNT,
        }
    }
}

/// Result of a leave command, telling the registry what policy to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaveOutcome {
    /// Whether the departing player held the host flag
    pub was_host: bool,
}

/// An isolated game session addressed by a short code
pub struct Room {
    code: RoomCode,
    mode: RoomMode,
    options: RoomOptions,
    roster: Roster,
    arbitrator: BuzzArbitrator,
    authority: HostAuthority,
    stats: TeamStats,
}

impl Room {
    /// Creates a room with its host already joined
    ///
    /// Identity, name and options are validated by the registry before
    /// this constructor runs.
    pub fn new(
        code: RoomCode,
        mode: RoomMode,
        options: RoomOptions,
        host_id: PlayerId,
        host_name: String,
        connection: ConnectionId,
    ) -> Self {
        let host = Player::new(host_name, TeamName::host(), connection);
        Self {
            code,
            mode,
            options,
            roster: Roster::with_host(host_id, host, options.max_players),
            arbitrator: BuzzArbitrator::default(),
            authority: HostAuthority::default(),
            stats: TeamStats::default(),
        }
    }

    /// The room's code
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// The room's mode
    pub fn mode(&self) -> RoomMode {
        self.mode
    }

    /// The room's player directory
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Whether any player currently has a live connection
    pub fn any_online(&self) -> bool {
        self.roster.any_online()
    }

    /// Sends a message to every connection currently attached to the room
    fn broadcast<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &self,
        message: &ServerMessage,
        tunnel_finder: &F,
    ) {
        for connection in self.roster.online_connections() {
            if let Some(tunnel) = tunnel_finder(connection) {
                tunnel.send_message(message);
            }
        }
    }

    /// Sends a message to one connection only
    fn send_to<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &self,
        connection: ConnectionId,
        message: &ServerMessage,
        tunnel_finder: &F,
    ) {
        if let Some(tunnel) = tunnel_finder(connection) {
            tunnel.send_message(message);
        }
    }

    /// Broadcasts the current player list
    pub fn broadcast_player_list<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &self,
        tunnel_finder: &F,
    ) {
        self.broadcast(&ServerMessage::from(self.roster.entries()), tunnel_finder);
    }

    /// Synchronizes a freshly attached connection with the room state
    ///
    /// The player list follows separately as a broadcast; this covers the
    /// state only broadcast on change.
    fn sync_connection<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &self,
        connection: ConnectionId,
        tunnel_finder: &F,
    ) {
        self.send_to(
            connection,
            &ServerMessage::from(self.arbitrator.to_vec()),
            tunnel_finder,
        );
        self.send_to(
            connection,
            &ServerMessage::LockStatus(self.authority.locked()),
            tunnel_finder,
        );
        if self.mode == RoomMode::Team {
            self.send_to(
                connection,
                &ServerMessage::from(self.stats.clone()),
                tunnel_finder,
            );
        }
    }

    /// Attaches a connection to a player, closing any stale tunnel
    fn attach<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        player_id: &PlayerId,
        connection: ConnectionId,
        tunnel_finder: &F,
    ) {
        let Some(player) = self.roster.get_mut(player_id) else {
            return;
        };
        if let Some(stale) = player.presence().session() {
            if stale != connection {
                if let Some(tunnel) = tunnel_finder(stale) {
                    tunnel.close();
                }
            }
        }
        player.presence_mut().attach(connection);
    }

    /// Adds a player, or re-attaches an existing identity
    ///
    /// Joining is idempotent on identity: rejoining with the same token
    /// updates name and connection rather than duplicating the player.
    /// A team change for an existing member is ignored so the queue's
    /// team-exclusivity invariant cannot be broken retroactively.
    pub fn join<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        connection: ConnectionId,
        name: &str,
        player_id: &PlayerId,
        team: Option<TeamName>,
        tunnel_finder: &F,
    ) -> Result<(), Error> {
        player_id.validate()?;
        let name = roster::validate_name(name)?;

        if self.roster.get(player_id).is_some() {
            self.attach(player_id, connection, tunnel_finder);
            if let Some(player) = self.roster.get_mut(player_id) {
                player.set_name(name);
            }
        } else {
            // The reserved pseudo-teams can never be claimed at join time;
            // role derivation makes a self-assigned HOST a real host.
            let team = match (self.mode, team) {
                (RoomMode::Team, None) => return Err(Error::TeamRequired),
                (RoomMode::Team | RoomMode::Solo, Some(team)) => {
                    roster::validate_team_name(&team)?;
                    team
                }
                (RoomMode::Solo, None) => TeamName::solo(),
            };
            self.roster
                .insert(player_id.clone(), Player::new(name, team, connection))?;
        }

        self.broadcast_player_list(tunnel_finder);
        self.sync_connection(connection, tunnel_finder);
        Ok(())
    }

    /// Re-attaches after a reload, recovering team and host flag
    ///
    /// Used when the client has no fresh team selection to offer. An
    /// identity unknown to both the active and departed sets joins fresh
    /// in solo mode and is asked for a team in team mode.
    pub fn rejoin<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        connection: ConnectionId,
        name: &str,
        player_id: &PlayerId,
        tunnel_finder: &F,
    ) -> Result<(), Error> {
        player_id.validate()?;
        let name = roster::validate_name(name)?;

        if self.roster.get(player_id).is_some() {
            self.attach(player_id, connection, tunnel_finder);
            if let Some(player) = self.roster.get_mut(player_id) {
                player.set_name(name);
            }
        } else {
            // Capacity is checked before the departed stash is consumed so
            // a rejected rejoin leaves the stash intact for a later try.
            if !self.roster.has_capacity() {
                return Err(Error::CapacityReached);
            }
            if let Some(mut stashed) = self.roster.take_departed(player_id) {
                stashed.set_name(name);
                stashed.presence_mut().attach(connection);
                self.roster.insert(player_id.clone(), stashed)?;
            } else if self.mode == RoomMode::Solo {
                self.roster.insert(
                    player_id.clone(),
                    Player::new(name, TeamName::solo(), connection),
                )?;
            } else {
                return Err(Error::TeamRequired);
            }
        }

        self.broadcast_player_list(tunnel_finder);
        self.sync_connection(connection, tunnel_finder);
        Ok(())
    }

    /// Removes a player from the active set
    pub fn leave<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        player_id: &PlayerId,
        tunnel_finder: &F,
    ) -> Result<LeaveOutcome, Error> {
        let was_host = self.roster.is_host(player_id);
        self.roster.remove(player_id).ok_or(Error::RoomNotFound)?;
        self.broadcast_player_list(tunnel_finder);
        Ok(LeaveOutcome { was_host })
    }

    /// Submits a buzz attempt
    ///
    /// Accepted only when the lock and countdown gates are open, the
    /// identity has not already buzzed, and (in team mode) the player's
    /// team has not already buzzed. A rejection sets no state.
    pub fn buzz<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        player_id: &PlayerId,
        timestamp: u64,
        tunnel_finder: &F,
    ) -> Result<(), Error> {
        let team = self.roster.team_of(player_id).ok_or(Error::RoomNotFound)?;
        if !self.authority.buzzing_allowed() {
            return Err(Error::BuzzersClosed);
        }
        if team::has_team_buzzed(self.mode, &team, self.arbitrator.entries(), |id| {
            self.roster.team_of(id)
        }) {
            return Err(Error::DuplicateBuzz);
        }

        let first = self.arbitrator.is_empty();
        self.arbitrator.submit(player_id.clone(), timestamp)?;
        self.broadcast(&ServerMessage::from(self.arbitrator.to_vec()), tunnel_finder);

        if first {
            self.authority.record_first_buzz();
            if self.mode == RoomMode::Team
                && self.options.win_credit == WinCredit::FirstBuzz
                && team.is_competing()
            {
                self.stats.record_win(&team);
                self.broadcast(&ServerMessage::from(self.stats.clone()), tunnel_finder);
            }
        }
        Ok(())
    }

    /// Flips the room lock (host only)
    ///
    /// A silent no-op while a countdown is running, like `startQuestion`
    /// in an invalid phase.
    pub fn toggle_lock<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        player_id: &PlayerId,
        tunnel_finder: &F,
    ) -> Result<(), Error> {
        host::ensure_host(&self.roster, player_id)?;
        if let Some(locked) = self.authority.toggle_lock() {
            self.broadcast(&ServerMessage::LockStatus(locked), tunnel_finder);
        }
        Ok(())
    }

    /// Clears the buzz queue and returns the round to idle (host only)
    ///
    /// Idempotent: resetting an already idle, empty room broadcasts the
    /// same empty state again without error.
    pub fn reset<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        player_id: &PlayerId,
        tunnel_finder: &F,
    ) -> Result<(), Error> {
        host::ensure_host(&self.roster, player_id)?;
        self.authority.reset();
        self.arbitrator.clear();
        self.broadcast(&ServerMessage::from(self.arbitrator.to_vec()), tunnel_finder);
        self.broadcast(&ServerMessage::BuzzersEnabled(false), tunnel_finder);
        Ok(())
    }

    /// Begins the question countdown (host only)
    ///
    /// A countdown already in progress, or an open round, makes this a
    /// silent no-op; the host's next reset brings the round back to idle.
    pub fn start_question<
        T: Tunnel,
        F: Fn(ConnectionId) -> Option<T>,
        S: FnMut(AlarmMessage, Duration),
    >(
        &mut self,
        player_id: &PlayerId,
        mut schedule: S,
        tunnel_finder: &F,
    ) -> Result<(), Error> {
        host::ensure_host(&self.roster, player_id)?;
        if let Some(start) = self.authority.start_question(self.options.countdown_start) {
            self.broadcast(&ServerMessage::CountdownUpdate(start), tunnel_finder);
            schedule(
                AlarmMessage::CountdownTick {
                    room: self.code.clone(),
                    value: start - 1,
                },
                Duration::from_secs(TICK_SECONDS),
            );
        }
        Ok(())
    }

    /// Applies a countdown tick alarm
    ///
    /// The terminal tick broadcasts `countdownUpdate 0` followed by exactly
    /// one `buzzersEnabled true`.
    pub fn tick_countdown<
        T: Tunnel,
        F: Fn(ConnectionId) -> Option<T>,
        S: FnMut(AlarmMessage, Duration),
    >(
        &mut self,
        value: u8,
        mut schedule: S,
        tunnel_finder: &F,
    ) {
        match self.authority.tick(value) {
            CountdownStep::Tick(value) => {
                self.broadcast(&ServerMessage::CountdownUpdate(value), tunnel_finder);
                schedule(
                    AlarmMessage::CountdownTick {
                        room: self.code.clone(),
                        value: value - 1,
                    },
                    Duration::from_secs(TICK_SECONDS),
                );
            }
            CountdownStep::Open => {
                self.broadcast(&ServerMessage::CountdownUpdate(0), tunnel_finder);
                self.broadcast(&ServerMessage::BuzzersEnabled(true), tunnel_finder);
            }
            CountdownStep::Ignored => {}
        }
    }

    /// Credits a win to a team explicitly (host only)
    ///
    /// Available under every crediting policy as a host override; reserved
    /// teams cannot receive wins.
    pub fn award_win<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        player_id: &PlayerId,
        team: &TeamName,
        tunnel_finder: &F,
    ) -> Result<(), Error> {
        host::ensure_host(&self.roster, player_id)?;
        if !team.is_competing() {
            return Err(Error::TeamRequired);
        }
        self.stats.record_win(team);
        self.broadcast(&ServerMessage::from(self.stats.clone()), tunnel_finder);
        Ok(())
    }

    /// Applies a client-reported activity signal
    pub fn set_activity<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        player_id: &PlayerId,
        status: ActivityStatus,
        tunnel_finder: &F,
    ) -> Result<(), Error> {
        let player = self.roster.get_mut(player_id).ok_or(Error::RoomNotFound)?;
        player.presence_mut().set_activity(status);
        self.broadcast_player_list(tunnel_finder);
        Ok(())
    }

    /// Marks whichever player owns this connection as offline
    ///
    /// Returns the affected identity, if the connection belonged to one.
    /// Presence only degrades; the player keeps their roster entry and any
    /// buzz queue position.
    pub fn mark_offline<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(
        &mut self,
        connection: ConnectionId,
        tunnel_finder: &F,
    ) -> Option<PlayerId> {
        let player_id = self.roster.player_of_connection(connection)?;
        self.roster
            .get_mut(&player_id)?
            .presence_mut()
            .detach(connection);
        self.broadcast_player_list(tunnel_finder);
        Some(player_id)
    }

    /// Closes every attached tunnel, used on explicit teardown
    pub fn close_all<T: Tunnel, F: Fn(ConnectionId) -> Option<T>>(&self, tunnel_finder: &F) {
        for connection in self.roster.online_connections() {
            if let Some(tunnel) = tunnel_finder(connection) {
                tunnel.close();
            }
        }
    }
}
