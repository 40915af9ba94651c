//! Compression and decompression of entry payloads
//!
//! Every codec shares one contract: `compress(bytes, kind)` and
//! `decompress(bytes, kind, expected_size)`. The expected size comes from the
//! entry record, since LZ4 blocks carry no length of their own, and every
//! decoder's output is checked against it.
//!
//! LZ4 and LZ4HC produce the same block format; both are written with the
//! standard LZ4 block encoder. Doboz is recognised but has no codec here.

mod error;
mod kind;

pub use error::{CompressionError, CompressionResult};
pub use kind::CompressionKind;

use flate2::Compression;
use flate2::read::{ZlibDecoder, ZlibEncoder};
use std::io::Read;

/// Maximum allowed decompression size (1 GB)
pub const MAX_DECOMPRESSION_SIZE: usize = 1024 * 1024 * 1024;

/// Compress `data` with `kind`
pub fn compress(data: &[u8], kind: CompressionKind) -> CompressionResult<Vec<u8>> {
    match kind {
        CompressionKind::None => Ok(data.to_vec()),
        CompressionKind::ZLib => {
            let mut encoder = ZlibEncoder::new(data, Compression::default());
            let mut compressed = Vec::new();
            encoder
                .read_to_end(&mut compressed)
                .map_err(|e| CompressionError::CompressFailed {
                    kind,
                    reason: e.to_string(),
                })?;
            Ok(compressed)
        }
        CompressionKind::Snappy => snap::raw::Encoder::new()
            .compress_vec(data)
            .map_err(|e| CompressionError::CompressFailed {
                kind,
                reason: e.to_string(),
            }),
        CompressionKind::Lz4 | CompressionKind::Lz4Hc => Ok(lz4_flex::block::compress(data)),
        CompressionKind::Doboz => Err(CompressionError::CodecUnavailable(kind)),
    }
}

/// Decompress `data` that was compressed with `kind` from `expected_size` bytes
pub fn decompress(
    data: &[u8],
    kind: CompressionKind,
    expected_size: usize,
) -> CompressionResult<Vec<u8>> {
    if expected_size > MAX_DECOMPRESSION_SIZE {
        return Err(CompressionError::TooLarge(expected_size));
    }

    let decompressed = match kind {
        CompressionKind::None => data.to_vec(),
        CompressionKind::ZLib => inflate(data)?,
        CompressionKind::Snappy => {
            let declared = snap::raw::decompress_len(data).map_err(|e| {
                CompressionError::DecompressFailed {
                    kind,
                    reason: e.to_string(),
                }
            })?;
            if declared > MAX_DECOMPRESSION_SIZE {
                return Err(CompressionError::TooLarge(declared));
            }
            snap::raw::Decoder::new()
                .decompress_vec(data)
                .map_err(|e| CompressionError::DecompressFailed {
                    kind,
                    reason: e.to_string(),
                })?
        }
        CompressionKind::Lz4 | CompressionKind::Lz4Hc => {
            lz4_flex::block::decompress(data, expected_size).map_err(|e| {
                CompressionError::DecompressFailed {
                    kind,
                    reason: e.to_string(),
                }
            })?
        }
        CompressionKind::Doboz => return Err(CompressionError::CodecUnavailable(kind)),
    };

    if decompressed.len() != expected_size {
        return Err(CompressionError::SizeMismatch {
            expected: expected_size,
            actual: decompressed.len(),
        });
    }

    Ok(decompressed)
}

/// Decompress using a raw tag read from disk
pub fn decompress_tagged(
    data: &[u8],
    tag: u32,
    expected_size: usize,
) -> CompressionResult<Vec<u8>> {
    decompress(data, CompressionKind::try_from(tag)?, expected_size)
}

/// Inflate a complete zlib stream, bounded by [`MAX_DECOMPRESSION_SIZE`]
pub fn inflate(data: &[u8]) -> CompressionResult<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut decompressed = Vec::new();

    // Read in chunks to enforce size limit
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read =
            decoder
                .read(&mut buffer)
                .map_err(|e| CompressionError::DecompressFailed {
                    kind: CompressionKind::ZLib,
                    reason: e.to_string(),
                })?;

        if bytes_read == 0 {
            break;
        }

        if decompressed.len() + bytes_read > MAX_DECOMPRESSION_SIZE {
            return Err(CompressionError::TooLarge(decompressed.len() + bytes_read));
        }

        decompressed.extend_from_slice(&buffer[..bytes_read]);
    }

    Ok(decompressed)
}
