//! Cancellable solution search
//!
//! The search loop is CPU bound. It checks a [`MiningTicket`] every
//! iteration so a node stops searching as soon as it accepts a competing
//! bundle.

use crate::error::ChainError;
use crate::puzzle::{PuzzleOracle, Solution};
use rand::RngCore;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Shared cancellation signal. Every call to [`CancelToken::cancel`] advances
/// an epoch; searches started before the advance observe it and stop.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    epoch: Arc<AtomicU64>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    pub fn cancel(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    /// Snapshot the current epoch for one search.
    pub fn ticket(&self) -> MiningTicket {
        MiningTicket {
            token: self.clone(),
            started_at: self.epoch(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MiningTicket {
    token: CancelToken,
    started_at: u64,
}

impl MiningTicket {
    pub fn is_cancelled(&self) -> bool {
        self.token.epoch() != self.started_at
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Miner {
    max_attempts: Option<u64>,
}

impl Miner {
    pub fn new(max_attempts: Option<u64>) -> Self {
        Self { max_attempts }
    }

    /// Sample candidates until the oracle accepts one.
    pub fn search(
        &self,
        oracle: &dyn PuzzleOracle,
        rng: &mut dyn RngCore,
        ticket: &MiningTicket,
    ) -> Result<Solution, ChainError> {
        let mut attempts: u64 = 0;
        loop {
            if ticket.is_cancelled() {
                debug!("search cancelled after {} attempts", attempts);
                return Err(ChainError::MiningCancelled(attempts));
            }
            if let Some(max) = self.max_attempts {
                if attempts >= max {
                    return Err(ChainError::MiningExhausted(attempts));
                }
            }

            let candidate = oracle.sample(rng);
            attempts += 1;
            if oracle.validate(&candidate) {
                debug!("found solution {} after {} attempts", candidate, attempts);
                return Ok(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::puzzle::ThresholdOracle;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::AtomicUsize;

    /// Never accepts; cancels its token after a fixed number of samples.
    struct CancellingOracle {
        token: CancelToken,
        cancel_after: usize,
        samples: AtomicUsize,
    }

    impl PuzzleOracle for CancellingOracle {
        fn validate(&self, _candidate: &Solution) -> bool {
            false
        }

        fn sample(&self, _rng: &mut dyn RngCore) -> Solution {
            if self.samples.fetch_add(1, Ordering::SeqCst) + 1 == self.cancel_after {
                self.token.cancel();
            }
            Solution::new(u64::MAX)
        }
    }

    #[test]
    fn test_search_finds_valid_solution() {
        let oracle = ThresholdOracle::default();
        let mut rng = StdRng::seed_from_u64(1);
        let ticket = CancelToken::new().ticket();

        let solution = Miner::default().search(&oracle, &mut rng, &ticket).unwrap();
        assert!(oracle.validate(&solution));
    }

    #[test]
    fn test_search_stops_when_cancelled() {
        let token = CancelToken::new();
        let oracle = CancellingOracle {
            token: token.clone(),
            cancel_after: 5,
            samples: AtomicUsize::new(0),
        };
        let mut rng = StdRng::seed_from_u64(2);
        let ticket = token.ticket();

        let result = Miner::default().search(&oracle, &mut rng, &ticket);
        assert!(matches!(result, Err(ChainError::MiningCancelled(5))));
    }

    #[test]
    fn test_search_respects_attempt_cap() {
        let token = CancelToken::new();
        let oracle = CancellingOracle {
            token: token.clone(),
            cancel_after: usize::MAX,
            samples: AtomicUsize::new(0),
        };
        let mut rng = StdRng::seed_from_u64(3);

        let result = Miner::new(Some(20)).search(&oracle, &mut rng, &token.ticket());
        assert!(matches!(result, Err(ChainError::MiningExhausted(20))));
    }

    #[test]
    fn test_ticket_tracks_epoch() {
        let token = CancelToken::new();
        let ticket = token.ticket();
        assert!(!ticket.is_cancelled());

        token.cancel();
        assert!(ticket.is_cancelled());
        assert!(!token.ticket().is_cancelled());
    }
}
