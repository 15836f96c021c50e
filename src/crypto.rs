//! Identity and hashing primitives for gossipcoin
//!
//! Addresses stand in for public keys. There is no key material and no
//! signature scheme: an address is a bare 32-byte identifier.

use sha2::{Digest, Sha256};

/// Type alias for an address, a 32-byte identifier.
pub type Address = [u8; 32];

/// A SHA-256 digest, used for transaction ids.
pub type Sha256Hash = [u8; 32];

/// Derive an address from a human label (hashes the label).
pub fn address_from_string(s: &str) -> Address {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    hasher.finalize().into()
}

/// Convert an address to a hex string for display.
pub fn address_to_hex(addr: &Address) -> String {
    hex::encode(addr)
}

/// Short hex prefix for log lines.
pub fn short_hex(bytes: &[u8; 32]) -> String {
    hex::encode(&bytes[..6])
}
