//! Per-item records: the 52-byte entry record and the 9-byte body sub-header

use binrw::{BinRead, BinWrite};

/// Byte size of one entry record
pub const ENTRY_RECORD_SIZE: u64 = 52;

/// Byte size of the sub-header in front of each item body
pub const SUB_HEADER_SIZE: u64 = 9;

/// One entry-table record
#[derive(Debug, Clone, PartialEq, Eq, Default, BinRead, BinWrite)]
#[brw(little)]
pub struct TextureEntryRecord {
    /// Texture hash as produced by the cooker
    pub hash: i32,
    /// Byte offset of the name in the name table
    pub path_string_index: u32,
    /// Item position in 4096-byte pages
    pub page_offset: u32,
    /// Bytes of sub-header, payload and mip chain
    pub zsize: u32,
    /// Uncompressed size including mips
    pub size: u32,
    /// Row alignment of the base level
    pub base_alignment: u32,
    /// Base width
    pub width: u16,
    /// Base height
    pub height: u16,
    /// Mip levels including the base
    pub total_mips: u16,
    /// Array slices (6 for cubemaps)
    pub slice_count: u16,
    /// First entry of this item in the mip-offset table
    pub mip_offset_index: u32,
    /// Entries this item owns in the mip-offset table
    pub mips_count: u32,
    /// Cook timestamp
    pub timestamp: i64,
    /// Pixel format type code
    pub texture_type: u16,
    /// Non-zero for cubemaps
    pub is_cube: u16,
}

/// Sub-header at the start of every item body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BinRead, BinWrite)]
#[brw(little)]
pub struct ItemSubHeader {
    /// Compressed size of the payload without mips
    pub cached_zsize_no_mips: u32,
    /// Uncompressed size of the payload without mips
    pub cached_size_no_mips: u32,
    /// Number of mips stored after the payload
    pub cached_mips_count: u8,
}

impl ItemSubHeader {
    /// Serialized bytes
    pub fn to_bytes(self) -> [u8; SUB_HEADER_SIZE as usize] {
        let mut bytes = [0u8; SUB_HEADER_SIZE as usize];
        bytes[0..4].copy_from_slice(&self.cached_zsize_no_mips.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.cached_size_no_mips.to_le_bytes());
        bytes[8] = self.cached_mips_count;
        bytes
    }
}
