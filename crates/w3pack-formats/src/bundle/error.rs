//! Bundle error types

use crate::access::AccessError;
use crate::compression::CompressionError;
use thiserror::Error;

/// Bundle-specific error type
#[derive(Debug, Error)]
pub enum BundleError {
    /// Magic bytes are not `POTATO70`
    #[error("invalid bundle magic: expected \"POTATO70\", got {0:02X?}")]
    InvalidArchiveHeader([u8; 8]),

    /// Structural parse failure or out-of-bounds entry region
    #[error("corrupt bundle: {0}")]
    CorruptArchive(String),

    /// Entry bytes cannot be located
    #[error("no backing store available for {name}")]
    MissingBackingStore {
        /// Depot path of the entry
        name: String,
    },

    /// Buffer and non-buffer entries in one container
    #[error(
        "cannot pack {buffers} buffer entries and {others} regular entries into one bundle"
    )]
    MixedBufferKind {
        /// Number of `.buffer` entries
        buffers: usize,
        /// Number of other entries
        others: usize,
    },

    /// The same depot path appears twice in one ToC
    #[error("duplicate depot path in bundle: {0}")]
    DuplicatePath(String),

    /// Layout does not fit the 32-bit offsets of the format
    #[error("bundle layout exceeds 4 GiB at offset {0}")]
    OffsetOverflow(u64),

    /// Compression/decompression error
    #[error(transparent)]
    Compression(#[from] CompressionError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Binary parsing error
    #[error("binary parsing error: {0}")]
    BinRw(#[from] binrw::Error),
}

impl From<AccessError> for BundleError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::MissingBackingStore { name } => Self::MissingBackingStore { name },
            AccessError::OutOfBounds { .. } => Self::CorruptArchive(err.to_string()),
            AccessError::Io(e) => Self::Io(e),
        }
    }
}

/// Result type for bundle operations
pub type BundleResult<T> = Result<T, BundleError>;
