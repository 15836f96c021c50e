//! Error types for gossipcoin

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ChainError {
    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),
    #[error("Input spent or unknown: {0}")]
    InputNotFound(String),
    #[error("Double spend detected: {0}")]
    DoubleSpendDetected(String),
    #[error("Invalid solution: {0}")]
    InvalidSolution(String),
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Mining cancelled after {0} attempts")]
    MiningCancelled(u64),
    #[error("Mining gave up after {0} attempts")]
    MiningExhausted(u64),
    #[error("Stale solution: {0}")]
    StaleSolution(String),
    #[error("Worker error: {0}")]
    WorkerError(String),
    #[error("Config error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
