//! Team semantics and win tallies
//!
//! A room either runs solo (every player competes individually) or in team
//! mode, where buzz eligibility and win credit are computed per team. Two
//! team names are reserved and never compete: `HOST` marks the room
//! creator and `SPECTATOR` marks watchers without a buzzer. The policy
//! function [`has_team_buzzed`] is pure over the room mode, the player→team
//! assignment and the buzz queue so it can gate arbitration and drive the
//! "team in" presentation state from the same definition.

use std::{collections::BTreeMap, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::{arbitrator::BuzzEntry, roster::PlayerId};

/// Reserved pseudo-team of the room creator
const HOST: &str = "HOST";
/// Reserved pseudo-team of non-competing watchers
const SPECTATOR: &str = "SPECTATOR";

/// Whether a room buzzes solo or per team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomMode {
    /// Every player competes individually
    #[default]
    Solo,
    /// Buzz eligibility and win credit are per team
    Team,
}

/// A team name supplied by clients at join time
///
/// Treated as an opaque label except for the two reserved names.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamName(String);

impl TeamName {
    /// The reserved pseudo-team of the room creator
    pub fn host() -> Self {
        Self(HOST.to_owned())
    }

    /// The reserved pseudo-team of non-competing watchers
    pub fn spectator() -> Self {
        Self(SPECTATOR.to_owned())
    }

    /// Default assignment for contestants in solo rooms
    ///
    /// Solo rooms carry no team semantics; this label exists only so the
    /// player list has a uniform shape in both modes.
    pub fn solo() -> Self {
        Self("SOLO".to_owned())
    }

    /// Returns the team name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this team takes part in buzz exclusivity and win tallies
    ///
    /// `HOST` and `SPECTATOR` are not real competing teams and are always
    /// excluded.
    pub fn is_competing(&self) -> bool {
        self.0 != HOST && self.0 != SPECTATOR
    }
}

impl From<&str> for TeamName {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for TeamName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for TeamName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Whether a team has already committed a buzz this round
///
/// Pure over the room mode, the player→team assignment (`team_of`) and the
/// current buzz queue. Always `false` in solo mode and for reserved teams.
pub fn has_team_buzzed<F: Fn(&PlayerId) -> Option<TeamName>>(
    mode: RoomMode,
    team: &TeamName,
    queue: &[BuzzEntry],
    team_of: F,
) -> bool {
    if mode != RoomMode::Team || !team.is_competing() {
        return false;
    }
    queue
        .iter()
        .any(|entry| team_of(&entry.player).as_ref() == Some(team))
}

/// Cumulative per-team win counts for the lifetime of a room
///
/// Keyed by team name in a sorted map so every `statsUpdate` broadcast
/// serializes in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamStats(BTreeMap<TeamName, u64>);

impl TeamStats {
    /// Increments a team's win count and returns the new total
    pub fn record_win(&mut self, team: &TeamName) -> u64 {
        let wins = self.0.entry(team.clone()).or_insert(0);
        *wins += 1;
        *wins
    }

    /// Win count of a team (zero if it never won)
    pub fn wins(&self, team: &TeamName) -> u64 {
        self.0.get(team).copied().unwrap_or(0)
    }

    /// Whether any team has recorded a win yet
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn queue_of(entries: &[(&str, u64)]) -> Vec<BuzzEntry> {
        entries
            .iter()
            .map(|(id, time)| BuzzEntry::new(PlayerId::from(*id), *time))
            .collect()
    }

    #[test]
    fn test_reserved_teams_do_not_compete() {
        assert!(!TeamName::host().is_competing());
        assert!(!TeamName::spectator().is_competing());
        assert!(TeamName::from("Team Red").is_competing());
    }

    #[test]
    fn test_has_team_buzzed_in_team_mode() {
        let queue = queue_of(&[("ann", 1000)]);
        let team_of = |id: &PlayerId| {
            (id.as_str() == "ann").then(|| TeamName::from("Team Red"))
        };

        assert!(has_team_buzzed(
            RoomMode::Team,
            &TeamName::from("Team Red"),
            &queue,
            team_of,
        ));
        assert!(!has_team_buzzed(
            RoomMode::Team,
            &TeamName::from("Team Blue"),
            &queue,
            team_of,
        ));
    }

    #[test]
    fn test_solo_mode_never_blocks() {
        let queue = queue_of(&[("ann", 1000)]);
        assert!(!has_team_buzzed(
            RoomMode::Solo,
            &TeamName::from("Team Red"),
            &queue,
            |_| Some(TeamName::from("Team Red")),
        ));
    }

    #[test]
    fn test_reserved_teams_never_block() {
        let queue = queue_of(&[("host", 500), ("spec", 600)]);
        let team_of = |id: &PlayerId| match id.as_str() {
            "host" => Some(TeamName::host()),
            "spec" => Some(TeamName::spectator()),
            _ => None,
        };

        assert!(!has_team_buzzed(
            RoomMode::Team,
            &TeamName::host(),
            &queue,
            team_of,
        ));
        assert!(!has_team_buzzed(
            RoomMode::Team,
            &TeamName::spectator(),
            &queue,
            team_of,
        ));
    }

    #[test]
    fn test_stats_record_and_query() {
        let mut stats = TeamStats::default();
        let red = TeamName::from("Team Red");
        assert!(stats.is_empty());
        assert_eq!(stats.wins(&red), 0);

        assert_eq!(stats.record_win(&red), 1);
        assert_eq!(stats.record_win(&red), 2);
        assert_eq!(stats.wins(&red), 2);
        assert!(!stats.is_empty());
    }

    #[test]
    fn test_stats_serialize_sorted() {
        let mut stats = TeamStats::default();
        stats.record_win(&TeamName::from("Zebra"));
        stats.record_win(&TeamName::from("Alpha"));
        assert_eq!(
            serde_json::to_string(&stats).unwrap(),
            r#"{"Alpha":1,"Zebra":1}"#
        );
    }
}
