//! Signed variable-length quantities used for table counts
//!
//! The first byte holds the sign in bit 7, a continuation flag in bit 6 and the
//! low 6 value bits. Each following byte holds a continuation flag in bit 7 and
//! the next 7 value bits.

use super::error::{MetadataError, MetadataResult};

const SIGN: u8 = 0x80;
const FIRST_CONTINUATION: u8 = 0x40;
const CONTINUATION: u8 = 0x80;

/// Read a VLQ from `data` at `offset`, advancing `offset`
pub fn read_vlq(data: &[u8], offset: &mut usize) -> MetadataResult<i32> {
    let start = *offset;
    let first = *data.get(*offset).ok_or(MetadataError::VlqError(start))?;
    *offset += 1;

    let mut magnitude = u64::from(first & 0x3F);
    let mut shift = 6;
    let mut more = first & FIRST_CONTINUATION != 0;

    while more {
        let byte = *data.get(*offset).ok_or(MetadataError::VlqError(start))?;
        *offset += 1;

        magnitude |= u64::from(byte & 0x7F) << shift;
        more = byte & CONTINUATION != 0;
        shift += 7;
        if more && shift >= 34 {
            return Err(MetadataError::VlqError(start));
        }
    }

    let value = if first & SIGN != 0 {
        -i64::try_from(magnitude).map_err(|_| MetadataError::VlqError(start))?
    } else {
        i64::try_from(magnitude).map_err(|_| MetadataError::VlqError(start))?
    };
    i32::try_from(value).map_err(|_| MetadataError::VlqError(start))
}

/// Append the VLQ encoding of `value` to `data`
pub fn write_vlq(value: i32, data: &mut Vec<u8>) {
    let mut rest = value.unsigned_abs();

    let mut first = (rest & 0x3F) as u8;
    rest >>= 6;
    if value < 0 {
        first |= SIGN;
    }
    if rest != 0 {
        first |= FIRST_CONTINUATION;
    }
    data.push(first);

    while rest != 0 {
        let mut byte = (rest & 0x7F) as u8;
        rest >>= 7;
        if rest != 0 {
            byte |= CONTINUATION;
        }
        data.push(byte);
    }
}

/// Encoded length of `value`
pub fn vlq_size(value: i32) -> usize {
    let magnitude = value.unsigned_abs();
    if magnitude < 0x40 {
        1
    } else {
        1 + (32 - (magnitude >> 6).leading_zeros()).div_ceil(7) as usize
    }
}
