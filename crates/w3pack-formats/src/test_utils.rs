//! Fixtures shared by unit tests

use crate::access::BackingStore;
use crate::bundle::{DEPOT_SEPARATOR, LooseFile};
use crate::compression::{self, CompressionKind};
use crate::registry::{ArchiveKind, ArchiveRegistry};
use crate::texture_cache::mips::MipHeader;
use crate::texture_cache::{ItemSubHeader, TextureCacheItem, TextureEntryRecord};
use std::path::Path;

/// Write `(depot_path, bytes)` pairs below `root` and return them as loose files
pub fn write_loose_tree(root: &Path, files: &[(&str, Vec<u8>)]) -> Vec<LooseFile> {
    files
        .iter()
        .map(|(depot_path, bytes)| {
            let disk_path = depot_path
                .split(DEPOT_SEPARATOR)
                .fold(root.to_path_buf(), |path, part| path.join(part));
            if let Some(parent) = disk_path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(&disk_path, bytes).unwrap();
            LooseFile::new(*depot_path, disk_path)
        })
        .collect()
}

/// In-memory texture item with a zlib payload and a mip chain of the given
/// data lengths
pub fn texture_item_with_mips(
    registry: &mut ArchiveRegistry,
    depot_path: &str,
    pixels: &[u8],
    mip_lens: &[u64],
) -> TextureCacheItem {
    let owner = registry.register(ArchiveKind::TextureCache, "source.cache", None);
    let payload = compression::compress(pixels, CompressionKind::ZLib).unwrap();
    let sub_header = ItemSubHeader {
        cached_zsize_no_mips: payload.len() as u32,
        cached_size_no_mips: pixels.len() as u32,
        cached_mips_count: mip_lens.len() as u8,
    };

    let mut region = sub_header.to_bytes().to_vec();
    region.extend_from_slice(&payload);
    for (level, len) in mip_lens.iter().enumerate() {
        let dim = (64u16 >> level).max(1);
        region.extend_from_slice(&MipHeader::for_len(*len, dim, dim).unwrap().to_bytes());
        region.extend(std::iter::repeat_n(level as u8, *len as usize));
    }

    TextureCacheItem {
        depot_path: depot_path.to_string(),
        record: TextureEntryRecord {
            hash: 0x1234,
            zsize: region.len() as u32,
            size: pixels.len() as u32,
            width: 64,
            height: 64,
            total_mips: mip_lens.len() as u16 + 1,
            slice_count: 1,
            mips_count: mip_lens.len() as u32,
            texture_type: 0x407,
            ..TextureEntryRecord::default()
        },
        sub_header,
        mip_offsets: Vec::new(),
        owner,
        backing: BackingStore::in_memory(region),
    }
}
