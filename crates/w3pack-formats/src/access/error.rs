//! Backing store error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating or reading an entry's bytes
#[derive(Debug, Error)]
pub enum AccessError {
    /// None of the entry's backing sources is available
    #[error("no backing store available for {name}")]
    MissingBackingStore {
        /// Depot path of the entry
        name: String,
    },

    /// Requested region lies outside the backing file
    #[error("region of {len} bytes at offset {offset} is outside {path:?} ({file_len} bytes)")]
    OutOfBounds {
        /// Backing file
        path: PathBuf,
        /// Region start
        offset: u64,
        /// Region length
        len: u64,
        /// Actual file length
        file_len: u64,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for backing store operations
pub type AccessResult<T> = Result<T, AccessError>;
