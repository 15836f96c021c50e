//! gossipcoin - a minimal peer-to-peer UTXO network
//!
//! # Architecture
//!
//! The crate is organized into logical modules, leaves first:
//!
//! ## Core Ledger
//! - [`transaction`] - Transaction types, builder and validity predicates
//! - [`ledger`] - Per-node UTXO set, pending pool and bundle application
//!
//! ## Gossip
//! - [`network`] - Peer registry, gossip messages and broadcast
//! - [`node`] - Peer task: inbox handling, `give`, `mine`, `balance`
//!
//! ## Consensus
//! - [`puzzle`] - Pluggable puzzle oracle (proof-of-work stand-in)
//! - [`miner`] - Cancellable solution search
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`crypto`] - Addresses and hashing helpers
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod ledger;
pub mod transaction;

// ============================================================================
// Gossip
// ============================================================================
pub mod network;
pub mod node;

// ============================================================================
// Consensus
// ============================================================================
pub mod miner;
pub mod puzzle;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod crypto;
pub mod error;
