//! Clock synchronization between clients and the server
//!
//! Buzz ordering compares timestamps produced by independently-clocked
//! clients, so every client keeps a running estimate of the offset between
//! its own clock and the server's. The server half of the protocol is
//! stateless: a `sync_ping` carrying the client's send time is answered
//! immediately with the server's wall-clock reading, and must never be
//! queued behind room processing since any added latency biases the
//! estimate. The client half resamples every
//! [`crate::constants::clock::SYNC_INTERVAL_SECONDS`] and folds samples into
//! a rolling estimate; [`OffsetEstimator`] implements that fold for client
//! embeddings of this crate.

use std::collections::VecDeque;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use web_time::{SystemTime, UNIX_EPOCH};

use crate::{ServerMessage, constants::clock::MAX_SAMPLES};

/// Current server wall-clock reading in milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

/// Answers a clock synchronization probe
///
/// Echoes the client's reported send time alongside the server's own
/// wall-clock reading. This is the entire server-side obligation: no
/// samples are stored.
pub fn answer(client_time: u64) -> ServerMessage {
    ServerMessage::SyncPong {
        client_time,
        server_time: now_millis(),
    }
}

/// One completed round trip of the synchronization protocol
///
/// Ephemeral and client-side only; never part of room state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockSample {
    /// Client wall-clock reading when the probe was sent
    pub sent: u64,
    /// Server wall-clock reading echoed in the pong
    pub server: u64,
    /// Client wall-clock reading when the pong arrived
    pub received: u64,
}

impl ClockSample {
    /// Offset estimate from this single sample, in milliseconds
    ///
    /// Uses the classic midpoint assumption that the request and response
    /// legs are symmetric: `(server + rtt/2) - received`. Positive means
    /// the server clock is ahead of the client clock.
    pub fn offset_millis(&self) -> i64 {
        let rtt = self.received.saturating_sub(self.sent);
        let midpoint = i64::try_from(self.server).unwrap_or(i64::MAX)
            + i64::try_from(rtt / 2).unwrap_or(i64::MAX);
        midpoint - i64::try_from(self.received).unwrap_or(i64::MAX)
    }
}

/// Rolling clock offset estimate built from recent round-trip samples
///
/// Keeps the last [`MAX_SAMPLES`] samples and reports their median offset,
/// which tracks drift while shrugging off the occasional congested round
/// trip.
#[derive(Debug, Clone, Default)]
pub struct OffsetEstimator {
    samples: VecDeque<ClockSample>,
}

impl OffsetEstimator {
    /// Creates an estimator with no samples
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a completed round trip into the estimate
    pub fn record(&mut self, sample: ClockSample) {
        self.samples.push_back(sample);
        while self.samples.len() > MAX_SAMPLES {
            self.samples.pop_front();
        }
    }

    /// Current offset estimate in milliseconds, or `None` before any sample
    pub fn offset_millis(&self) -> Option<i64> {
        if self.samples.is_empty() {
            return None;
        }
        let sorted = self
            .samples
            .iter()
            .map(ClockSample::offset_millis)
            .sorted()
            .collect_vec();
        Some(sorted[sorted.len() / 2])
    }

    /// Corrects a local wall-clock reading into server time
    ///
    /// Falls back to the uncorrected reading before the first sample.
    pub fn correct(&self, local_millis: u64) -> u64 {
        match self.offset_millis() {
            Some(offset) => local_millis.saturating_add_signed(offset),
            None => local_millis,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_answer_echoes_client_time() {
        let ServerMessage::SyncPong { client_time, .. } = answer(4242) else {
            panic!("answer must produce a sync_pong");
        };
        assert_eq!(client_time, 4242);
    }

    #[test]
    fn test_sample_offset_symmetric_legs() {
        // Client sends at 1000, server reads 1520 halfway through a 40ms
        // round trip: the server is 500ms ahead.
        let sample = ClockSample {
            sent: 1000,
            server: 1520,
            received: 1040,
        };
        assert_eq!(sample.offset_millis(), 500);
    }

    #[test]
    fn test_sample_offset_server_behind() {
        let sample = ClockSample {
            sent: 2000,
            server: 1510,
            received: 2020,
        };
        assert_eq!(sample.offset_millis(), -500);
    }

    #[test]
    fn test_estimator_empty() {
        let estimator = OffsetEstimator::new();
        assert_eq!(estimator.offset_millis(), None);
        assert_eq!(estimator.correct(1234), 1234);
    }

    #[test]
    fn test_estimator_median_resists_outlier() {
        let mut estimator = OffsetEstimator::new();
        for base in [0u64, 100, 200] {
            estimator.record(ClockSample {
                sent: base + 1000,
                server: base + 1500,
                received: base + 1000,
            });
        }
        // One congested round trip with a wildly skewed midpoint.
        estimator.record(ClockSample {
            sent: 2000,
            server: 9500,
            received: 3000,
        });
        assert_eq!(estimator.offset_millis(), Some(500));
    }

    #[test]
    fn test_estimator_keeps_a_bounded_window() {
        let mut estimator = OffsetEstimator::new();
        for i in 0..(MAX_SAMPLES as u64 * 2) {
            estimator.record(ClockSample {
                sent: i,
                server: i + 100,
                received: i,
            });
        }
        assert_eq!(estimator.samples.len(), MAX_SAMPLES);
        assert_eq!(estimator.offset_millis(), Some(100));
    }

    #[test]
    fn test_correct_applies_offset() {
        let mut estimator = OffsetEstimator::new();
        estimator.record(ClockSample {
            sent: 1000,
            server: 1500,
            received: 1000,
        });
        assert_eq!(estimator.correct(2000), 2500);
    }
}
