//! FNV-1a 64-bit hash
//!
//! The metadata store keys its hash table by the FNV-1a hash of the full depot
//! path, and the texture cache footer stores the FNV-1a hash of its info tables.
//! Both use the standard 64-bit offset basis and prime over raw bytes.

use std::fmt;

/// FNV-1a 64-bit offset basis
pub const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a 64-bit prime
pub const PRIME: u64 = 0x0000_0100_0000_01b3;

/// Incremental FNV-1a 64-bit hasher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fnv1a64 {
    state: u64,
}

impl Default for Fnv1a64 {
    fn default() -> Self {
        Self::new()
    }
}

impl Fnv1a64 {
    /// Create a hasher seeded with the offset basis
    pub const fn new() -> Self {
        Self {
            state: OFFSET_BASIS,
        }
    }

    /// Hash a complete byte slice
    pub fn hash(data: &[u8]) -> u64 {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finish()
    }

    /// Hash a depot path as stored in archive name tables
    pub fn hash_path(path: &str) -> u64 {
        Self::hash(path.as_bytes())
    }

    /// Feed more bytes into the hash
    pub fn update(&mut self, data: &[u8]) {
        let mut state = self.state;
        for &byte in data {
            state ^= u64::from(byte);
            state = state.wrapping_mul(PRIME);
        }
        self.state = state;
    }

    /// Current hash value
    pub const fn finish(&self) -> u64 {
        self.state
    }
}

impl fmt::Display for Fnv1a64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.state)
    }
}
