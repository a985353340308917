//! Cache key derivation
//!
//! A key is a pure function of `(locator, last_modified)`. A changed
//! modification time therefore yields a different key, so edited videos
//! never collide with their previous cache entries.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Hash used to derive cache keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyHash {
    /// SHA-256, hex encoded (64 characters).
    #[default]
    Sha256,
    /// 64-bit FNV-1a, hex encoded (16 characters). Deterministic but weaker.
    Fnv1a,
}

/// Fixed-length opaque identifier of a cache subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the cache key for a resource using SHA-256.
pub fn derive_key(locator: &str, last_modified: i64) -> CacheKey {
    derive_key_with(KeyHash::Sha256, locator, last_modified)
}

/// Derive the cache key for a resource with an explicit hash.
pub fn derive_key_with(hash: KeyHash, locator: &str, last_modified: i64) -> CacheKey {
    let input = format!("{}_{}", locator, last_modified);
    match hash {
        KeyHash::Sha256 => CacheKey(hex::encode(Sha256::digest(input.as_bytes()))),
        KeyHash::Fnv1a => CacheKey(format!("{:016x}", fnv1a64(input.as_bytes()))),
    }
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;

    bytes.iter().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(PRIME)
    })
}
