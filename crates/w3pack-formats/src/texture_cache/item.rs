//! Texture cache items

use super::dds::DdsHeader;
use super::error::{TextureCacheError, TextureCacheResult};
use super::format::TextureFormat;
use super::mips;
use super::record::{ItemSubHeader, SUB_HEADER_SIZE, TextureEntryRecord};
use crate::access::{self, BackingStore};
use crate::align::ALIGNMENT;
use crate::compression::{self, CompressionKind};
use crate::entry::ArchiveEntry;
use crate::registry::{ArchiveId, ArchiveRegistry};
use binrw::BinWrite;
use binrw::io::Cursor;
use std::io::Write;

/// One texture stored in a texture cache.
///
/// The item's region is `zsize` bytes at `page_offset * 4096`: the 9-byte
/// sub-header, the zlib payload and the mip chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureCacheItem {
    pub(crate) depot_path: String,
    pub(crate) record: TextureEntryRecord,
    pub(crate) sub_header: ItemSubHeader,
    pub(crate) mip_offsets: Vec<u32>,
    pub(crate) owner: ArchiveId,
    pub(crate) backing: BackingStore,
}

impl TextureCacheItem {
    /// Item parsed from an entry record and the sub-header found at its page
    pub(crate) fn from_record(
        depot_path: String,
        record: TextureEntryRecord,
        sub_header: ItemSubHeader,
        mip_offsets: Vec<u32>,
        owner: ArchiveId,
    ) -> Self {
        let offset = u64::from(record.page_offset) * ALIGNMENT;
        Self {
            depot_path,
            record,
            sub_header,
            mip_offsets,
            owner,
            backing: BackingStore::BackedByArchive {
                archive: owner,
                offset,
            },
        }
    }

    /// Entry record as it will be written
    pub const fn record(&self) -> &TextureEntryRecord {
        &self.record
    }

    /// Body sub-header
    pub const fn sub_header(&self) -> ItemSubHeader {
        self.sub_header
    }

    /// Logical path
    pub fn depot_path(&self) -> &str {
        &self.depot_path
    }

    /// Texture hash
    pub const fn hash(&self) -> i32 {
        self.record.hash
    }

    /// Position in 4096-byte pages
    pub const fn page_offset(&self) -> u32 {
        self.record.page_offset
    }

    /// Position in bytes
    pub fn byte_offset(&self) -> u64 {
        u64::from(self.record.page_offset) * ALIGNMENT
    }

    /// Region size: sub-header, payload and mips
    pub const fn zsize(&self) -> u32 {
        self.record.zsize
    }

    /// Uncompressed size
    pub const fn size(&self) -> u32 {
        self.record.size
    }

    /// Base width
    pub const fn width(&self) -> u16 {
        self.record.width
    }

    /// Base height
    pub const fn height(&self) -> u16 {
        self.record.height
    }

    /// Mip levels including the base
    pub const fn total_mips(&self) -> u16 {
        self.record.total_mips
    }

    /// Array slices
    pub const fn slice_count(&self) -> u16 {
        self.record.slice_count
    }

    /// Mips stored in the chain after the payload
    pub const fn mips_count(&self) -> u32 {
        self.record.mips_count
    }

    /// Pixel format type code
    pub const fn texture_type(&self) -> u16 {
        self.record.texture_type
    }

    /// Whether this is a cubemap
    pub const fn is_cube(&self) -> bool {
        self.record.is_cube != 0
    }

    /// Cook timestamp
    pub const fn timestamp(&self) -> i64 {
        self.record.timestamp
    }

    /// This item's entries of the mip-offset table
    pub fn mip_offsets(&self) -> &[u32] {
        &self.mip_offsets
    }

    /// Owning cache
    pub const fn owner(&self) -> ArchiveId {
        self.owner
    }

    /// Where the bytes come from when the owning cache is not on disk
    pub const fn backing(&self) -> &BackingStore {
        &self.backing
    }

    /// Pixel format from the type code
    pub fn pixel_format(&self) -> TextureCacheResult<TextureFormat> {
        TextureFormat::from_type_code(self.record.texture_type)
    }

    /// DDS header for [`extract`](ArchiveEntry::extract)
    pub fn dds_header(&self) -> TextureCacheResult<DdsHeader> {
        Ok(DdsHeader::new(
            u32::from(self.record.width),
            u32::from(self.record.height),
            u32::from(self.record.total_mips),
            self.pixel_format()?,
            self.is_cube(),
        ))
    }

    /// Whether the item's bytes can be located
    pub fn is_reachable(&self, registry: &ArchiveRegistry) -> bool {
        access::is_reachable(registry, self.owner, &self.backing)
    }

    /// The whole region: sub-header, payload and mip chain
    pub fn read_region(&self, registry: &ArchiveRegistry) -> TextureCacheResult<Vec<u8>> {
        let bytes = access::resolve_to_vec(
            registry,
            self.owner,
            self.byte_offset(),
            u64::from(self.record.zsize),
            &self.backing,
            &self.depot_path,
        )?;
        if bytes.len() != self.record.zsize as usize {
            return Err(TextureCacheError::CorruptArchive(format!(
                "{}: expected a {} byte region, found {}",
                self.depot_path,
                self.record.zsize,
                bytes.len()
            )));
        }
        Ok(bytes)
    }

    /// Offsets of the stored mips relative to the start of the mip chain
    pub fn relative_mip_offsets(&self, registry: &ArchiveRegistry) -> TextureCacheResult<Vec<u64>> {
        if self.record.mips_count == 0 {
            return Ok(Vec::new());
        }
        let region = self.read_region(registry)?;
        let section = self.mip_section(&region)?;
        mips::relative_offsets(section, self.record.mips_count as usize, &self.depot_path)
    }

    /// zlib payload without mips
    pub fn payload<'a>(&self, region: &'a [u8]) -> TextureCacheResult<&'a [u8]> {
        let start = SUB_HEADER_SIZE as usize;
        let end = start + self.sub_header.cached_zsize_no_mips as usize;
        region.get(start..end).ok_or_else(|| {
            TextureCacheError::CorruptArchive(format!(
                "{}: payload of {} bytes does not fit the {} byte region",
                self.depot_path,
                self.sub_header.cached_zsize_no_mips,
                region.len()
            ))
        })
    }

    /// Mip chain following the payload
    pub fn mip_section<'a>(&self, region: &'a [u8]) -> TextureCacheResult<&'a [u8]> {
        let start = SUB_HEADER_SIZE as usize + self.sub_header.cached_zsize_no_mips as usize;
        region.get(start..).ok_or_else(|| {
            TextureCacheError::CorruptArchive(format!(
                "{}: mip chain starts at {start}, past the {} byte region",
                self.depot_path,
                region.len()
            ))
        })
    }

    /// DDS header followed by the inflated payload
    pub fn extract_to_vec(&self, registry: &ArchiveRegistry) -> TextureCacheResult<Vec<u8>> {
        let header = self.dds_header()?;
        let region = self.read_region(registry)?;
        let pixels = compression::decompress(
            self.payload(&region)?,
            CompressionKind::ZLib,
            self.sub_header.cached_size_no_mips as usize,
        )?;

        let mut out = Cursor::new(Vec::with_capacity(148 + pixels.len()));
        header.write(&mut out)?;
        let mut out = out.into_inner();
        out.extend_from_slice(&pixels);
        Ok(out)
    }
}

impl ArchiveEntry for TextureCacheItem {
    type Error = TextureCacheError;

    fn depot_path(&self) -> &str {
        &self.depot_path
    }

    fn size(&self) -> u64 {
        u64::from(self.record.size)
    }

    fn zsize(&self) -> u64 {
        u64::from(self.record.zsize)
    }

    fn owner(&self) -> ArchiveId {
        self.owner
    }

    fn get_compressed_bytes(
        &self,
        registry: &ArchiveRegistry,
        out: &mut dyn Write,
    ) -> TextureCacheResult<()> {
        let region = self.read_region(registry)?;
        out.write_all(&region)?;
        Ok(())
    }

    fn extract(&self, registry: &ArchiveRegistry, out: &mut dyn Write) -> TextureCacheResult<()> {
        let data = self.extract_to_vec(registry)?;
        out.write_all(&data)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::registry::ArchiveKind;
    use pretty_assertions::assert_eq;

    fn in_memory_item(registry: &mut ArchiveRegistry, pixels: &[u8], texture_type: u16) -> TextureCacheItem {
        let owner = registry.register(ArchiveKind::TextureCache, "texture.cache", None);
        let payload = compression::compress(pixels, CompressionKind::ZLib).unwrap();
        let sub_header = ItemSubHeader {
            cached_zsize_no_mips: payload.len() as u32,
            cached_size_no_mips: pixels.len() as u32,
            cached_mips_count: 0,
        };
        let mut region = sub_header.to_bytes().to_vec();
        region.extend_from_slice(&payload);

        TextureCacheItem {
            depot_path: "environment\\textures\\stone.xbm".to_string(),
            record: TextureEntryRecord {
                zsize: region.len() as u32,
                size: pixels.len() as u32,
                width: 4,
                height: 4,
                total_mips: 1,
                slice_count: 1,
                texture_type,
                ..TextureEntryRecord::default()
            },
            sub_header,
            mip_offsets: Vec::new(),
            owner,
            backing: BackingStore::in_memory(region),
        }
    }

    #[test]
    fn test_extract_writes_dds_then_pixels() {
        let mut registry = ArchiveRegistry::new();
        let pixels = vec![0xAB; 16];
        let item = in_memory_item(&mut registry, &pixels, 0x407);

        let mut out = Vec::new();
        item.extract(&registry, &mut out).expect("Operation should succeed");
        assert_eq!(&out[0..4], b"DDS ");
        assert_eq!(&out[84..88], b"DXT1");
        assert_eq!(&out[128..], pixels.as_slice());
    }

    #[test]
    fn test_unknown_pixel_format() {
        let mut registry = ArchiveRegistry::new();
        let item = in_memory_item(&mut registry, &[0; 16], 0x0123);
        assert!(matches!(
            item.extract_to_vec(&registry),
            Err(TextureCacheError::UnknownPixelFormat(0x0123))
        ));
    }

    #[test]
    fn test_no_mips_means_no_io() {
        let mut registry = ArchiveRegistry::new();
        let mut item = in_memory_item(&mut registry, &[0; 16], 0x407);
        item.backing = BackingStore::BackedByFile {
            path: "/nonexistent/texture.cache".into(),
        };
        assert!(item.relative_mip_offsets(&registry).unwrap().is_empty());
        assert!(!item.is_reachable(&registry));
    }
}
