//! CRC-32 checksum of uncompressed entry bytes

use std::fmt;

/// A CRC-32 (IEEE) checksum value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Crc32(u32);

impl Crc32 {
    /// Checksum a complete byte slice
    pub fn of(data: &[u8]) -> Self {
        Self(crc32fast::hash(data))
    }

    /// Wrap a checksum read from disk
    pub const fn from_value(value: u32) -> Self {
        Self(value)
    }

    /// Raw checksum value
    pub const fn value(self) -> u32 {
        self.0
    }
}

impl From<Crc32> for u32 {
    fn from(crc: Crc32) -> Self {
        crc.0
    }
}

impl fmt::Display for Crc32 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}
