//! Puzzle oracle: the stand-in for proof-of-work
//!
//! A solution is accepted by a stateless predicate that is identical on every
//! node and never depends on earlier solutions. The oracle is a trait so the
//! acceptance rule can be replaced without touching the ledger or gossip code.

use crate::error::ChainError;
use rand::{Rng, RngCore};
use std::fmt;

/// A candidate (or accepted) puzzle value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Solution(u64);

impl Solution {
    pub const fn new(value: u64) -> Self {
        Solution(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub trait PuzzleOracle: Send + Sync {
    /// Whether `candidate` solves the puzzle.
    fn validate(&self, candidate: &Solution) -> bool;

    /// Draw one candidate from the puzzle's domain.
    fn sample(&self, rng: &mut dyn RngCore) -> Solution;
}

pub const DEFAULT_DOMAIN: u64 = 1_000_000;
pub const DEFAULT_THRESHOLD: u64 = 200_000;

/// Accepts any candidate below `threshold`, sampling uniformly in `[0, domain)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdOracle {
    domain: u64,
    threshold: u64,
}

impl ThresholdOracle {
    pub fn new(domain: u64, threshold: u64) -> Result<Self, ChainError> {
        if domain == 0 {
            return Err(ChainError::ConfigError(
                "puzzle domain must be greater than zero".to_string(),
            ));
        }
        if threshold == 0 || threshold > domain {
            return Err(ChainError::ConfigError(format!(
                "puzzle threshold {} must be in 1..={}",
                threshold, domain
            )));
        }
        Ok(Self { domain, threshold })
    }

    pub fn domain(&self) -> u64 {
        self.domain
    }

    pub fn threshold(&self) -> u64 {
        self.threshold
    }
}

impl Default for ThresholdOracle {
    fn default() -> Self {
        Self {
            domain: DEFAULT_DOMAIN,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl PuzzleOracle for ThresholdOracle {
    fn validate(&self, candidate: &Solution) -> bool {
        candidate.value() < self.threshold
    }

    fn sample(&self, rng: &mut dyn RngCore) -> Solution {
        Solution(rng.gen_range(0..self.domain))
    }
}
