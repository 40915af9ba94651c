//! Bundle header

use super::error::{BundleError, BundleResult};
use super::record::TOC_ENTRY_SIZE;
use binrw::{BinRead, BinWrite};

/// Bundle magic bytes
pub const BUNDLE_MAGIC: [u8; 8] = *b"POTATO70";

/// Header size in bytes
pub const HEADER_SIZE: u64 = 32;

/// Fixed bytes closing every header
pub const HEADER_TRAILER: [u8; 12] = [
    0x03, 0x00, 0x01, 0x00, 0x00, 0x13, 0x13, 0x13, 0x13, 0x13, 0x13, 0x13,
];

/// 32-byte bundle header
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct BundleHeader {
    /// `POTATO70`
    pub magic: [u8; 8],
    /// Total bundle size as recorded by the writer
    pub bundle_size: u32,
    /// Always zero
    pub reserved: u32,
    /// Byte length of the ToC
    pub toc_size: u32,
    /// [`HEADER_TRAILER`]
    pub trailer: [u8; 12],
}

impl BundleHeader {
    /// Header for a freshly laid out bundle
    pub const fn new(bundle_size: u32, toc_size: u32) -> Self {
        Self {
            magic: BUNDLE_MAGIC,
            bundle_size,
            reserved: 0,
            toc_size,
            trailer: HEADER_TRAILER,
        }
    }

    /// Check the magic bytes
    pub fn validate(&self) -> BundleResult<()> {
        if self.magic != BUNDLE_MAGIC {
            return Err(BundleError::InvalidArchiveHeader(self.magic));
        }
        if u64::from(self.toc_size) % TOC_ENTRY_SIZE != 0 {
            return Err(BundleError::CorruptArchive(format!(
                "ToC size {} is not a multiple of {TOC_ENTRY_SIZE}",
                self.toc_size
            )));
        }
        Ok(())
    }

    /// Number of ToC records
    pub fn entry_count(&self) -> usize {
        (u64::from(self.toc_size) / TOC_ENTRY_SIZE) as usize
    }

    /// Offset of the first byte after header and ToC
    pub fn data_block_offset(&self) -> u32 {
        self.toc_size.saturating_add(HEADER_SIZE as u32)
    }

    /// Byte length from the data block offset to the recorded bundle end
    pub fn data_block_size(&self) -> u32 {
        self.bundle_size.saturating_sub(self.data_block_offset())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use binrw::io::Cursor;

    #[test]
    fn test_header_layout() {
        let header = BundleHeader::new(8192, 640);
        let mut cursor = Cursor::new(Vec::new());
        header.write(&mut cursor).expect("Operation should succeed");
        let bytes = cursor.into_inner();

        assert_eq!(bytes.len() as u64, HEADER_SIZE);
        assert_eq!(&bytes[0..8], b"POTATO70");
        assert_eq!(&bytes[8..12], &8192u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &[0, 0, 0, 0]);
        assert_eq!(&bytes[16..20], &640u32.to_le_bytes());
        assert_eq!(&bytes[20..32], &HEADER_TRAILER);

        let parsed = BundleHeader::read(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_data_block_values() {
        let header = BundleHeader::new(8192, 320);
        assert_eq!(header.data_block_offset(), 352);
        assert_eq!(header.data_block_size(), 8192 - 352);
        assert_eq!(header.entry_count(), 1);
    }

    #[test]
    fn test_validate_rejects_wrong_magic() {
        let mut header = BundleHeader::new(0, 0);
        header.magic = *b"POTATO71";
        assert!(matches!(
            header.validate(),
            Err(BundleError::InvalidArchiveHeader(m)) if &m == b"POTATO71"
        ));
    }

    #[test]
    fn test_validate_rejects_partial_record() {
        let header = BundleHeader::new(0, 100);
        assert!(matches!(header.validate(), Err(BundleError::CorruptArchive(_))));
    }
}
