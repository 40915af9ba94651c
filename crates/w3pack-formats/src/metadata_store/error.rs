//! Metadata store error types

use thiserror::Error;

/// Metadata-store-specific error type
#[derive(Debug, Error)]
pub enum MetadataError {
    /// Magic or version does not match
    #[error("invalid metadata store header: magic {magic:02X?}, version {version}")]
    InvalidArchiveHeader {
        /// Magic bytes found
        magic: [u8; 4],
        /// Version found
        version: u32,
    },

    /// Structural parse failure
    #[error("corrupt metadata store: {0}")]
    CorruptArchive(String),

    /// Malformed variable-length quantity
    #[error("malformed variable-length quantity at offset {0}")]
    VlqError(usize),

    /// A table or offset does not fit the format's 32-bit fields
    #[error("metadata store value exceeds 32-bit range: {0}")]
    OffsetOverflow(u64),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

/// Result type for metadata store operations
pub type MetadataResult<T> = Result<T, MetadataError>;
