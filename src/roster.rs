//! Per-room player directory
//!
//! This module tracks every player of a room, keyed by the durable opaque
//! identity token the client supplies (never by the transient connection
//! id, since a client may reconnect with a new connection but the same
//! token). It maintains a role-indexed reverse mapping for cheap host
//! lookup and spectator filtering, and stashes departed players so a
//! rejoin before room teardown recovers the same team assignment and host
//! flag.

use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
};

use enum_map::{Enum, EnumMap};
use itertools::Itertools;
use rustrict::CensorStr;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    constants::player::{MAX_IDENTITY_LENGTH, MAX_NAME_LENGTH, MAX_TEAM_NAME_LENGTH},
    presence::{ActivityStatus, ConnectionStatus, Presence},
    session::ConnectionId,
    team::TeamName,
};

/// A durable opaque identity token supplied by the client
///
/// Generated and persisted client-side, replayed across reconnects, and
/// treated server-side purely as a correlation key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Returns the token as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Checks the token is present and of sane length
    pub fn validate(&self) -> Result<(), Error> {
        if self.0.trim().is_empty() || self.0.len() > MAX_IDENTITY_LENGTH {
            return Err(Error::IdentityMissing);
        }
        Ok(())
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for PlayerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The role of a player within a room, derived from their team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Enum, Serialize, Deserialize)]
pub enum Role {
    /// The room creator; exactly one per room, non-transferable
    Host,
    /// A competing player
    Contestant,
    /// A watcher without a buzzer
    Spectator,
}

impl Role {
    /// Derives the role from a team assignment
    pub fn of_team(team: &TeamName) -> Self {
        if *team == TeamName::host() {
            Role::Host
        } else if *team == TeamName::spectator() {
            Role::Spectator
        } else {
            Role::Contestant
        }
    }
}

/// One player of a room
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    name: String,
    team: TeamName,
    presence: Presence,
}

impl Player {
    /// Creates a player attached to a live connection
    pub fn new(name: String, team: TeamName, connection: ConnectionId) -> Self {
        Self {
            name,
            team,
            presence: Presence::online(connection),
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replaces the display name (already validated by the caller)
    pub fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Team assignment
    pub fn team(&self) -> &TeamName {
        &self.team
    }

    /// Role derived from the team assignment
    pub fn role(&self) -> Role {
        Role::of_team(&self.team)
    }

    /// Presence state
    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    /// Mutable presence state
    pub fn presence_mut(&mut self) -> &mut Presence {
        &mut self.presence
    }
}

/// One row of the `playerList` broadcast
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntry {
    /// Identity token of the player
    pub user_id: PlayerId,
    /// Display name
    pub name: String,
    /// Team assignment
    pub team: TeamName,
    /// Connection axis of presence
    pub connection: ConnectionStatus,
    /// Activity axis of presence
    pub activity: ActivityStatus,
    /// Whether this player is the room's host
    pub is_host: bool,
}

/// Directory of all players in one room
#[derive(Debug, Default)]
pub struct Roster {
    /// Primary mapping from identity to player state
    mapping: HashMap<PlayerId, Player>,
    /// Reverse mapping organized by role for efficient filtering
    reverse_mapping: EnumMap<Role, HashSet<PlayerId>>,
    /// Players who left; kept so a rejoin recovers team and host flag
    departed: HashMap<PlayerId, Player>,
    /// Maximum players this room accepts
    max_players: usize,
}

impl Roster {
    /// Creates a roster seeded with the room's host
    pub fn with_host(host_id: PlayerId, host: Player, max_players: usize) -> Self {
        let mut roster = Self {
            max_players,
            ..Self::default()
        };
        // Seeding cannot exceed capacity.
        let _ = roster.insert(host_id, host);
        roster
    }

    /// Adds a player to the active set
    ///
    /// # Errors
    ///
    /// Returns [`Error::CapacityReached`] when the room is full.
    pub fn insert(&mut self, player_id: PlayerId, player: Player) -> Result<(), Error> {
        if self.mapping.len() >= self.max_players {
            return Err(Error::CapacityReached);
        }
        self.reverse_mapping[player.role()].insert(player_id.clone());
        self.mapping.insert(player_id, player);
        Ok(())
    }

    /// Looks a player up by identity
    pub fn get(&self, player_id: &PlayerId) -> Option<&Player> {
        self.mapping.get(player_id)
    }

    /// Looks a player up mutably by identity
    pub fn get_mut(&mut self, player_id: &PlayerId) -> Option<&mut Player> {
        self.mapping.get_mut(player_id)
    }

    /// Removes a player from the active set, stashing them for rejoin
    pub fn remove(&mut self, player_id: &PlayerId) -> Option<Player> {
        let mut player = self.mapping.remove(player_id)?;
        self.reverse_mapping[player.role()].remove(player_id);
        if let Some(session) = player.presence().session() {
            player.presence_mut().detach(session);
        }
        self.departed.insert(player_id.clone(), player.clone());
        Some(player)
    }

    /// Reclaims a departed player's stashed state
    pub fn take_departed(&mut self, player_id: &PlayerId) -> Option<Player> {
        self.departed.remove(player_id)
    }

    /// The host's identity, if a host is currently in the active set
    pub fn host_id(&self) -> Option<&PlayerId> {
        self.reverse_mapping[Role::Host].iter().next()
    }

    /// Whether this identity holds the host flag
    pub fn is_host(&self, player_id: &PlayerId) -> bool {
        self.reverse_mapping[Role::Host].contains(player_id)
    }

    /// Team assignment of an active player
    pub fn team_of(&self, player_id: &PlayerId) -> Option<TeamName> {
        self.mapping.get(player_id).map(|p| p.team().clone())
    }

    /// Number of players in the active set
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// Whether the active set is empty
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Whether another player fits under the capacity bound
    pub fn has_capacity(&self) -> bool {
        self.mapping.len() < self.max_players
    }

    /// Whether any player currently has a live connection
    pub fn any_online(&self) -> bool {
        self.mapping
            .values()
            .any(|p| p.presence().session().is_some())
    }

    /// Identity of the player a connection is attached to, if any
    pub fn player_of_connection(&self, connection: ConnectionId) -> Option<PlayerId> {
        self.mapping
            .iter()
            .find(|(_, p)| p.presence().session() == Some(connection))
            .map(|(id, _)| id.clone())
    }

    /// Connection ids of every currently attached player
    pub fn online_connections(&self) -> Vec<ConnectionId> {
        self.mapping
            .values()
            .filter_map(|p| p.presence().session())
            .collect_vec()
    }

    /// Snapshot of the roster for a `playerList` broadcast
    ///
    /// Sorted by name then identity so repeated broadcasts of the same
    /// state are byte-identical.
    pub fn entries(&self) -> Vec<PlayerEntry> {
        self.mapping
            .iter()
            .map(|(id, player)| PlayerEntry {
                user_id: id.clone(),
                name: player.name().to_owned(),
                team: player.team().clone(),
                connection: player.presence().connection_status(),
                activity: player.presence().activity(),
                is_host: player.role() == Role::Host,
            })
            .sorted_by(|a, b| (&a.name, &a.user_id).cmp(&(&b.name, &b.user_id)))
            .collect_vec()
    }
}

/// Validates and normalizes a display name
///
/// # Errors
///
/// [`Error::IdentityMissing`] when the name is empty after trimming;
/// [`Error::InvalidName`] when it is too long or fails the content filter.
pub fn validate_name(name: &str) -> Result<String, Error> {
    if name.len() > MAX_NAME_LENGTH {
        return Err(Error::InvalidName);
    }
    let name = rustrict::trim_whitespace(name);
    if name.is_empty() {
        return Err(Error::IdentityMissing);
    }
    if name.is_inappropriate() {
        return Err(Error::InvalidName);
    }
    Ok(name.to_owned())
}

/// Validates a client-supplied team name
///
/// The reserved pseudo-teams are rejected here: `HOST` and `SPECTATOR`
/// are assigned by the coordinator, never claimed by a joiner, since the
/// role index is derived from the team name.
///
/// # Errors
///
/// [`Error::TeamRequired`] when empty; [`Error::InvalidName`] when
/// reserved, too long or failing the content filter.
pub fn validate_team_name(team: &TeamName) -> Result<(), Error> {
    let name = team.as_str();
    if name.trim().is_empty() {
        return Err(Error::TeamRequired);
    }
    if !team.is_competing() || name.len() > MAX_TEAM_NAME_LENGTH || name.is_inappropriate() {
        return Err(Error::InvalidName);
    }
    Ok(())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn contestant(name: &str, team: &str) -> Player {
        Player::new(name.to_owned(), TeamName::from(team), ConnectionId::new())
    }

    fn host_roster() -> Roster {
        Roster::with_host(
            PlayerId::from("host-token"),
            Player::new("Quinn".to_owned(), TeamName::host(), ConnectionId::new()),
            4,
        )
    }

    #[test]
    fn test_host_lookup() {
        let roster = host_roster();
        assert_eq!(roster.host_id(), Some(&PlayerId::from("host-token")));
        assert!(roster.is_host(&PlayerId::from("host-token")));
        assert!(!roster.is_host(&PlayerId::from("other")));
    }

    #[test]
    fn test_capacity_bound() {
        let mut roster = host_roster();
        for i in 0..3 {
            roster
                .insert(PlayerId::from(format!("tok-{i}")), contestant("P", "Team"))
                .unwrap();
        }
        assert_eq!(
            roster.insert(PlayerId::from("tok-3"), contestant("P", "Team")),
            Err(Error::CapacityReached)
        );
        assert_eq!(roster.len(), 4);
    }

    #[test]
    fn test_remove_stashes_for_rejoin() {
        let mut roster = host_roster();
        let ann = PlayerId::from("ann-token");
        roster
            .insert(ann.clone(), contestant("Ann", "Team Red"))
            .unwrap();

        let removed = roster.remove(&ann).unwrap();
        assert_eq!(removed.team(), &TeamName::from("Team Red"));
        assert!(roster.get(&ann).is_none());

        let stashed = roster.take_departed(&ann).unwrap();
        assert_eq!(stashed.team(), &TeamName::from("Team Red"));
        assert_eq!(
            stashed.presence().connection_status(),
            ConnectionStatus::Offline
        );
        assert!(roster.take_departed(&ann).is_none());
    }

    #[test]
    fn test_removed_host_keeps_host_team() {
        let mut roster = host_roster();
        let host = PlayerId::from("host-token");
        roster.remove(&host);
        assert_eq!(roster.host_id(), None);

        let stashed = roster.take_departed(&host).unwrap();
        assert_eq!(stashed.role(), Role::Host);
    }

    #[test]
    fn test_entries_sorted_and_flagged() {
        let mut roster = host_roster();
        roster
            .insert(PlayerId::from("bob"), contestant("Bob", "Team Blue"))
            .unwrap();
        roster
            .insert(PlayerId::from("ann"), contestant("Ann", "Team Red"))
            .unwrap();

        let entries = roster.entries();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Ann", "Bob", "Quinn"]);
        assert!(entries[2].is_host);
        assert!(!entries[0].is_host);
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Ann  "), Ok("Ann".to_owned()));
        assert_eq!(validate_name("   "), Err(Error::IdentityMissing));
        assert_eq!(
            validate_name(&"a".repeat(MAX_NAME_LENGTH + 1)),
            Err(Error::InvalidName)
        );
    }

    #[test]
    fn test_validate_identity() {
        assert!(PlayerId::from("tok").validate().is_ok());
        assert_eq!(
            PlayerId::from("").validate(),
            Err(Error::IdentityMissing)
        );
        assert_eq!(
            PlayerId::from("x".repeat(MAX_IDENTITY_LENGTH + 1)).validate(),
            Err(Error::IdentityMissing)
        );
    }

    #[test]
    fn test_validate_team_name() {
        assert!(validate_team_name(&TeamName::from("Team Red")).is_ok());
        assert_eq!(
            validate_team_name(&TeamName::from("  ")),
            Err(Error::TeamRequired)
        );
        assert_eq!(
            validate_team_name(&TeamName::from("x".repeat(MAX_TEAM_NAME_LENGTH + 1).as_str())),
            Err(Error::InvalidName)
        );
    }

    #[test]
    fn test_validate_team_name_rejects_reserved_names() {
        assert_eq!(
            validate_team_name(&TeamName::host()),
            Err(Error::InvalidName)
        );
        assert_eq!(
            validate_team_name(&TeamName::spectator()),
            Err(Error::InvalidName)
        );
    }
}
