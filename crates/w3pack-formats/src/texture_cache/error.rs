//! Texture cache error types

use crate::access::AccessError;
use crate::compression::CompressionError;
use thiserror::Error;

/// Texture-cache-specific error type
#[derive(Debug, Error)]
pub enum TextureCacheError {
    /// Footer magic is not `HCXT`
    #[error("invalid texture cache magic: expected \"HCXT\", got {0:02X?}")]
    InvalidArchiveHeader([u8; 4]),

    /// Structural parse failure or out-of-bounds item region
    #[error("corrupt texture cache: {0}")]
    CorruptArchive(String),

    /// The same depot path appears twice in one cache
    #[error("duplicate depot path in texture cache: {0}")]
    DuplicatePath(String),

    /// Name table does not match the entry count, even after de-duplication
    #[error("name table holds {parsed} names, footer declares {declared} entries")]
    NameTableCorrupt {
        /// Entry count from the footer
        declared: u32,
        /// Distinct names parsed
        parsed: usize,
    },

    /// Item bytes cannot be located
    #[error("no backing store available for {name}")]
    MissingBackingStore {
        /// Depot path of the item
        name: String,
    },

    /// Type code outside the pixel-format table
    #[error("unknown pixel format type code: 0x{0:04X}")]
    UnknownPixelFormat(u16),

    /// Layout does not fit the 32-bit fields of the format
    #[error("texture cache layout exceeds 32-bit range at {0}")]
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

impl From<AccessError> for TextureCacheError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::MissingBackingStore { name } => Self::MissingBackingStore { name },
            AccessError::OutOfBounds { .. } => Self::CorruptArchive(err.to_string()),
            AccessError::Io(e) => Self::Io(e),
        }
    }
}

/// Result type for texture cache operations
pub type TextureCacheResult<T> = Result<T, TextureCacheError>;
