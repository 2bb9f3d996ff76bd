//! Host authority and the question-round state machine
//!
//! Every command that shapes a round (lock, reset, start-question, award)
//! is reserved to the room's host identity and validated here. The round
//! lifecycle is `Idle → Countdown(n) → BuzzersOpen → RoundComplete → Idle`,
//! with the lock as an orthogonal gate the host can flip at any point
//! outside a running countdown's restrictions. Countdown ticks never block:
//! each tick is a scheduled [`crate::AlarmMessage`] that re-enters the
//! room's serialized command stream one second later.
//!
//! A room with no countdown running accepts buzzes in `Idle` too; the
//! countdown is an optional ceremony for hosts who want a synchronized
//! start, not a precondition for casual buzzing.

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    roster::{PlayerId, Roster},
};

/// Phase of the question-round lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RoundPhase {
    /// No round ceremony in progress; buzzing follows the lock only
    #[default]
    Idle,
    /// Counting down; buzzing is rejected until the countdown opens
    Countdown(u8),
    /// The countdown reached zero; buzzers are open
    BuzzersOpen,
    /// A winner has been recorded; later placements still queue up
    RoundComplete,
}

/// Outcome of a countdown tick alarm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownStep {
    /// Broadcast this countdown value and schedule the next tick
    Tick(u8),
    /// The countdown ended; broadcast zero and enable the buzzers
    Open,
    /// No countdown is running anymore (a reset raced the tick)
    Ignored,
}

/// Lock flag and round phase of one room, driven by its host
#[derive(Debug, Default, Clone)]
pub struct HostAuthority {
    phase: RoundPhase,
    locked: bool,
}

/// Validates that a command was issued by the room's host
pub fn ensure_host(roster: &Roster, player_id: &PlayerId) -> Result<(), Error> {
    if roster.is_host(player_id) {
        Ok(())
    } else {
        Err(Error::NotHost)
    }
}

impl HostAuthority {
    /// Current round phase
    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Current lock state
    pub fn locked(&self) -> bool {
        self.locked
    }

    /// Flips the lock and returns the new state
    ///
    /// Rejected while a countdown is running: the lock must not change
    /// between the first `countdownUpdate` and `buzzersEnabled`. Returns
    /// `None` when the command is a no-op.
    pub fn toggle_lock(&mut self) -> Option<bool> {
        if matches!(self.phase, RoundPhase::Countdown(_)) {
            return None;
        }
        self.locked = !self.locked;
        Some(self.locked)
    }

    /// Begins a countdown if the round allows it
    ///
    /// Valid from `Idle` and `RoundComplete`; returns the starting value to
    /// broadcast, or `None` when a countdown or open round is already in
    /// progress (the command is then a no-op).
    pub fn start_question(&mut self, countdown_start: u8) -> Option<u8> {
        match self.phase {
            RoundPhase::Idle | RoundPhase::RoundComplete => {
                self.phase = RoundPhase::Countdown(countdown_start);
                Some(countdown_start)
            }
            RoundPhase::Countdown(_) | RoundPhase::BuzzersOpen => None,
        }
    }

    /// Applies a countdown tick alarm
    ///
    /// Ticks fired for a countdown that was since reset are ignored.
    pub fn tick(&mut self, value: u8) -> CountdownStep {
        if !matches!(self.phase, RoundPhase::Countdown(_)) {
            return CountdownStep::Ignored;
        }
        if value == 0 {
            self.phase = RoundPhase::BuzzersOpen;
            CountdownStep::Open
        } else {
            self.phase = RoundPhase::Countdown(value);
            CountdownStep::Tick(value)
        }
    }

    /// Returns the round to `Idle`; valid in any state
    ///
    /// The lock is deliberately untouched: reset clears the round, not the
    /// host's gate.
    pub fn reset(&mut self) {
        self.phase = RoundPhase::Idle;
    }

    /// Whether a buzz submission passes the lock and countdown gates
    pub fn buzzing_allowed(&self) -> bool {
        !self.locked && !matches!(self.phase, RoundPhase::Countdown(_))
    }

    /// Records that the first buzz of a round landed
    pub fn record_first_buzz(&mut self) {
        if self.phase == RoundPhase::BuzzersOpen {
            self.phase = RoundPhase::RoundComplete;
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_lock() {
        let mut authority = HostAuthority::default();
        assert!(!authority.locked());
        assert_eq!(authority.toggle_lock(), Some(true));
        assert!(authority.locked());
        assert_eq!(authority.toggle_lock(), Some(false));
    }

    #[test]
    fn test_toggle_lock_rejected_during_countdown() {
        let mut authority = HostAuthority::default();
        authority.start_question(3);
        assert_eq!(authority.toggle_lock(), None);
        assert!(!authority.locked());

        // The lock works again once the countdown opens.
        authority.tick(0);
        assert_eq!(authority.toggle_lock(), Some(true));
    }

    #[test]
    fn test_start_question_from_idle_and_complete() {
        let mut authority = HostAuthority::default();
        assert_eq!(authority.start_question(3), Some(3));
        assert_eq!(authority.phase(), RoundPhase::Countdown(3));

        // Already counting down: no-op.
        assert_eq!(authority.start_question(3), None);

        authority.tick(0);
        authority.record_first_buzz();
        assert_eq!(authority.phase(), RoundPhase::RoundComplete);
        assert_eq!(authority.start_question(3), Some(3));
    }

    #[test]
    fn test_start_question_rejected_while_open() {
        let mut authority = HostAuthority::default();
        authority.start_question(3);
        authority.tick(0);
        assert_eq!(authority.phase(), RoundPhase::BuzzersOpen);
        assert_eq!(authority.start_question(3), None);
    }

    #[test]
    fn test_tick_sequence_opens_buzzers() {
        let mut authority = HostAuthority::default();
        authority.start_question(3);
        assert_eq!(authority.tick(2), CountdownStep::Tick(2));
        assert_eq!(authority.tick(1), CountdownStep::Tick(1));
        assert_eq!(authority.tick(0), CountdownStep::Open);
        assert_eq!(authority.phase(), RoundPhase::BuzzersOpen);
    }

    #[test]
    fn test_tick_after_reset_is_ignored() {
        let mut authority = HostAuthority::default();
        authority.start_question(3);
        authority.reset();
        assert_eq!(authority.tick(2), CountdownStep::Ignored);
        assert_eq!(authority.phase(), RoundPhase::Idle);
    }

    #[test]
    fn test_buzzing_allowed_matrix() {
        let mut authority = HostAuthority::default();
        // Idle, unlocked: casual buzzing works without any countdown.
        assert!(authority.buzzing_allowed());

        authority.toggle_lock();
        assert!(!authority.buzzing_allowed());
        authority.toggle_lock();

        authority.start_question(3);
        assert!(!authority.buzzing_allowed());

        authority.tick(0);
        assert!(authority.buzzing_allowed());

        authority.record_first_buzz();
        assert!(authority.buzzing_allowed());
    }

    #[test]
    fn test_reset_keeps_lock() {
        let mut authority = HostAuthority::default();
        authority.toggle_lock();
        authority.start_question(3);
        authority.reset();
        assert_eq!(authority.phase(), RoundPhase::Idle);
        assert!(authority.locked());
    }

    #[test]
    fn test_first_buzz_only_completes_open_round() {
        let mut authority = HostAuthority::default();
        authority.record_first_buzz();
        // A buzz in Idle does not fabricate a round.
        assert_eq!(authority.phase(), RoundPhase::Idle);
    }
}
