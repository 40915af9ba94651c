//! Compression tags stored in archive records

use super::error::CompressionError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Compression algorithm of an archive entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u32)]
pub enum CompressionKind {
    /// Stored as-is (tag 0)
    None = 0,
    /// zlib stream (tag 1)
    ZLib = 1,
    /// Raw snappy block (tag 2)
    Snappy = 2,
    /// Doboz (tag 3)
    Doboz = 3,
    /// LZ4 block (tag 4)
    Lz4 = 4,
    /// LZ4 block, high-compression encoder (tag 5)
    Lz4Hc = 5,
}

impl CompressionKind {
    /// All kinds in tag order
    pub const ALL: [Self; 6] = [
        Self::None,
        Self::ZLib,
        Self::Snappy,
        Self::Doboz,
        Self::Lz4,
        Self::Lz4Hc,
    ];

    /// Parse a tag read from disk
    pub const fn from_tag(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::None),
            1 => Some(Self::ZLib),
            2 => Some(Self::Snappy),
            3 => Some(Self::Doboz),
            4 => Some(Self::Lz4),
            5 => Some(Self::Lz4Hc),
            _ => None,
        }
    }

    /// Tag written to disk
    pub const fn tag(self) -> u32 {
        self as u32
    }

    /// Lowercase name
    pub const fn name(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ZLib => "zlib",
            Self::Snappy => "snappy",
            Self::Doboz => "doboz",
            Self::Lz4 => "lz4",
            Self::Lz4Hc => "lz4hc",
        }
    }
}

impl TryFrom<u32> for CompressionKind {
    type Error = CompressionError;

    fn try_from(tag: u32) -> Result<Self, Self::Error> {
        Self::from_tag(tag).ok_or(CompressionError::UnsupportedCompressionKind(tag))
    }
}

impl fmt::Display for CompressionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown compression kind: {s}"))
    }
}
