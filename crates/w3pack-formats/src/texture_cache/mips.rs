//! Mip chain stored after an item's payload
//!
//! Each mip is a 9-byte header followed by its data:
//!
//! ```text
//! overflow u8 | page_count u32 | dim1 u16 | dim2 u16 | page_count * 256 + overflow bytes
//! ```

use super::error::{TextureCacheError, TextureCacheResult};

/// Size of a mip header
pub const MIP_HEADER_SIZE: usize = 9;

/// Granularity of `page_count`
pub const MIP_PAGE_SIZE: u64 = 256;

/// Header in front of each stored mip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipHeader {
    /// Bytes beyond the last full 256-byte page
    pub overflow: u8,
    /// Full 256-byte pages
    pub page_count: u32,
    /// First dimension
    pub dim1: u16,
    /// Second dimension
    pub dim2: u16,
}

impl MipHeader {
    /// Header describing `len` bytes of mip data
    pub fn for_len(len: u64, dim1: u16, dim2: u16) -> Option<Self> {
        Some(Self {
            overflow: u8::try_from(len % MIP_PAGE_SIZE).ok()?,
            page_count: u32::try_from(len / MIP_PAGE_SIZE).ok()?,
            dim1,
            dim2,
        })
    }

    /// Parse from the first 9 bytes of `bytes`
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let header = bytes.get(..MIP_HEADER_SIZE)?;
        Some(Self {
            overflow: header[0],
            page_count: u32::from_le_bytes([header[1], header[2], header[3], header[4]]),
            dim1: u16::from_le_bytes([header[5], header[6]]),
            dim2: u16::from_le_bytes([header[7], header[8]]),
        })
    }

    /// Serialized bytes
    pub fn to_bytes(self) -> [u8; MIP_HEADER_SIZE] {
        let mut bytes = [0u8; MIP_HEADER_SIZE];
        bytes[0] = self.overflow;
        bytes[1..5].copy_from_slice(&self.page_count.to_le_bytes());
        bytes[5..7].copy_from_slice(&self.dim1.to_le_bytes());
        bytes[7..9].copy_from_slice(&self.dim2.to_le_bytes());
        bytes
    }

    /// Bytes of mip data following the header
    pub fn data_len(self) -> u64 {
        u64::from(self.page_count) * MIP_PAGE_SIZE + u64::from(self.overflow)
    }
}

/// Offsets of `count` mips relative to the start of `section`
pub fn relative_offsets(section: &[u8], count: usize, name: &str) -> TextureCacheResult<Vec<u64>> {
    let mut offsets = Vec::with_capacity(count);
    let mut position = 0u64;

    for index in 0..count {
        let start = usize::try_from(position).ok();
        let header = start
            .and_then(|start| section.get(start..))
            .and_then(MipHeader::parse)
            .ok_or_else(|| {
                TextureCacheError::CorruptArchive(format!(
                    "{name}: mip {index} header at {position} is outside the {} byte mip section",
                    section.len()
                ))
            })?;

        offsets.push(position);
        position += MIP_HEADER_SIZE as u64 + header.data_len();
        if position > section.len() as u64 {
            return Err(TextureCacheError::CorruptArchive(format!(
                "{name}: mip {index} ends at {position}, past the {} byte mip section",
                section.len()
            )));
        }
    }

    Ok(offsets)
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn chain(lens: &[u64]) -> Vec<u8> {
        let mut out = Vec::new();
        for (i, len) in lens.iter().enumerate() {
            let header = MipHeader::for_len(*len, 64 >> i, 64 >> i).unwrap();
            out.extend_from_slice(&header.to_bytes());
            out.extend(std::iter::repeat_n(i as u8, *len as usize));
        }
        out
    }

    #[test]
    fn test_walk_chain() {
        let section = chain(&[600, 256, 3]);
        let offsets = relative_offsets(&section, 3, "t").expect("Operation should succeed");
        assert_eq!(offsets, vec![0, 609, 609 + 265]);
    }

    #[test]
    fn test_header_round_trip() {
        let header = MipHeader::for_len(1000, 32, 16).unwrap();
        assert_eq!(header.page_count, 3);
        assert_eq!(header.overflow, 232);
        assert_eq!(MipHeader::parse(&header.to_bytes()), Some(header));
        assert_eq!(header.data_len(), 1000);
    }

    #[test]
    fn test_truncated_chain_is_corrupt() {
        let mut section = chain(&[600]);
        section.truncate(300);
        assert!(matches!(
            relative_offsets(&section, 1, "t"),
            Err(TextureCacheError::CorruptArchive(_))
        ));
        assert!(relative_offsets(&section, 2, "t").is_err());
    }

    #[test]
    fn test_zero_mips() {
        assert!(relative_offsets(&[], 0, "t").unwrap().is_empty());
    }
}
