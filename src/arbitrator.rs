//! Authoritative buzz ordering
//!
//! The arbitrator owns the ranked buzz queue of a room. Every accepted buzz
//! carries the client-reported, offset-corrected timestamp as its
//! authoritative time: ranking then reflects reaction latency rather than
//! network latency, at the cost of trusting client clocks. That trade-off
//! is deliberate for a casual game; a hardened variant would record server
//! receive time minus a smoothed per-connection latency estimate instead.
//!
//! Corrected timestamps can arrive out of order, so entries are inserted in
//! sorted position rather than appended. Two invariants hold by
//! construction: timestamps are non-decreasing along the queue, and equal
//! timestamps keep their arrival order (a new entry goes after every entry
//! with an equal-or-smaller time). Lock and countdown gating, and the team
//! exclusivity check, happen in [`crate::room`] before an entry reaches the
//! arbitrator; a rejected buzz never touches the queue.

use serde::{Deserialize, Serialize};

use crate::{Error, roster::PlayerId};

/// One accepted buzz: who, and the authoritative time in milliseconds
///
/// Immutable once appended. Position 0 of the queue is always the winner;
/// the presentation layer derives the inter-buzz gap as
/// `time[i] - time[0]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuzzEntry {
    /// Identity of the buzzing player
    #[serde(rename = "userId")]
    pub player: PlayerId,
    /// Authoritative timestamp in milliseconds
    pub time: u64,
}

impl BuzzEntry {
    /// Creates a buzz entry
    pub fn new(player: PlayerId, time: u64) -> Self {
        Self { player, time }
    }
}

/// The ranked, append-only buzz queue of one room round
#[derive(Debug, Default, Clone)]
pub struct BuzzArbitrator {
    entries: Vec<BuzzEntry>,
}

impl BuzzArbitrator {
    /// Records a buzz, keeping the queue sorted by authoritative time
    ///
    /// Returns the zero-based queue position of the new entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateBuzz`] if this identity already has an
    /// entry; the queue is left untouched.
    pub fn submit(&mut self, player: PlayerId, time: u64) -> Result<usize, Error> {
        if self.has_buzzed(&player) {
            return Err(Error::DuplicateBuzz);
        }
        let position = self.entries.partition_point(|entry| entry.time <= time);
        self.entries.insert(position, BuzzEntry::new(player, time));
        Ok(position)
    }

    /// Whether an identity already has an entry this round
    pub fn has_buzzed(&self, player: &PlayerId) -> bool {
        self.entries.iter().any(|entry| &entry.player == player)
    }

    /// The queue as an ordered read-only sequence
    pub fn entries(&self) -> &[BuzzEntry] {
        &self.entries
    }

    /// Clones the queue for a `buzzOrder` broadcast
    pub fn to_vec(&self) -> Vec<BuzzEntry> {
        self.entries.clone()
    }

    /// Whether no buzz has been accepted this round
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clears the queue for a new round
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
