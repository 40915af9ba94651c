//! Texture cache footer

use super::error::{TextureCacheError, TextureCacheResult};
use super::record::ENTRY_RECORD_SIZE;
use binrw::{BinRead, BinWrite};

/// Footer magic bytes
pub const CACHE_MAGIC: [u8; 4] = *b"HCXT";

/// Footer version written by this crate
pub const CACHE_VERSION: u32 = 6;

/// Footer size in bytes
pub const FOOTER_SIZE: u64 = 32;

/// Fixed 32-byte footer at the end of a texture cache
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct TextureCacheFooter {
    /// FNV-1a 64 over the mip table, name table and entry table
    pub crc: u64,
    /// Body size in 4096-byte pages
    pub used_pages: u32,
    /// Number of entry records
    pub entry_count: u32,
    /// Byte length of the name table
    pub string_table_size: u32,
    /// Number of mip-offset table entries
    pub mip_entry_count: u32,
    /// `HCXT`
    pub magic: [u8; 4],
    /// Format version
    pub version: u32,
}

impl TextureCacheFooter {
    /// Footer for a freshly laid out cache; the checksum is filled in on write
    pub const fn new(
        used_pages: u32,
        entry_count: u32,
        string_table_size: u32,
        mip_entry_count: u32,
    ) -> Self {
        Self {
            crc: 0,
            used_pages,
            entry_count,
            string_table_size,
            mip_entry_count,
            magic: CACHE_MAGIC,
            version: CACHE_VERSION,
        }
    }

    /// Check the magic bytes
    pub fn validate(&self) -> TextureCacheResult<()> {
        if self.magic != CACHE_MAGIC {
            return Err(TextureCacheError::InvalidArchiveHeader(self.magic));
        }
        Ok(())
    }

    /// Byte length of mip table + name table + entry table
    pub fn info_tables_size(&self) -> u64 {
        u64::from(self.mip_entry_count) * 4
            + u64::from(self.string_table_size)
            + u64::from(self.entry_count) * ENTRY_RECORD_SIZE
    }

    /// Distance from end of file back to the start of the mip table
    pub fn backward_jump(&self) -> u64 {
        FOOTER_SIZE + self.info_tables_size()
    }
}
