//! Compression error types

use super::CompressionKind;
use thiserror::Error;

/// Compression-specific error type
#[derive(Debug, Error)]
pub enum CompressionError {
    /// Tag does not name any known algorithm
    #[error("unsupported compression kind: {0}")]
    UnsupportedCompressionKind(u32),

    /// Tag is known but no codec for it is built in
    #[error("no codec available for {0} compression")]
    CodecUnavailable(CompressionKind),

    /// Encoder failure
    #[error("{kind} compression failed: {reason}")]
    CompressFailed {
        /// Algorithm in use
        kind: CompressionKind,
        /// Underlying error text
        reason: String,
    },

    /// Decoder failure
    #[error("{kind} decompression failed: {reason}")]
    DecompressFailed {
        /// Algorithm in use
        kind: CompressionKind,
        /// Underlying error text
        reason: String,
    },

    /// Decoded length differs from the size recorded in the entry
    #[error("decompressed size mismatch: expected {expected}, got {actual}")]
    SizeMismatch {
        /// Size recorded in the entry
        expected: usize,
        /// Size actually produced
        actual: usize,
    },

    /// Output would exceed [`MAX_DECOMPRESSION_SIZE`](super::MAX_DECOMPRESSION_SIZE)
    #[error("decompressed size {0} exceeds limit of {limit} bytes", limit = super::MAX_DECOMPRESSION_SIZE)]
    TooLarge(usize),
}

/// Result type for compression operations
pub type CompressionResult<T> = Result<T, CompressionError>;
