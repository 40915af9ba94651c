//! Texture cache read, build and write

use super::error::{TextureCacheError, TextureCacheResult};
use super::footer::{FOOTER_SIZE, TextureCacheFooter};
use super::item::TextureCacheItem;
use super::record::{ENTRY_RECORD_SIZE, ItemSubHeader, SUB_HEADER_SIZE, TextureEntryRecord};
use crate::access::{BackingStore, mapped};
use crate::align::{ALIGNMENT, next_aligned, pad_to};
use crate::bundle::LooseFile;
use crate::compression::{self, CompressionKind};
use crate::config::PackConfig;
use crate::entry::first_duplicate;
use crate::registry::{ArchiveId, ArchiveKind, ArchiveRegistry};
use binrw::io::{Cursor, Write};
use binrw::{BinRead, BinWrite};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use w3pack_hash::Fnv1a64;

/// A texture cache: item bodies followed by the info tables and footer
#[derive(Debug, Clone)]
pub struct TextureCache {
    id: ArchiveId,
    name: String,
    footer: TextureCacheFooter,
    mip_offsets: Vec<u32>,
    items: Vec<TextureCacheItem>,
}

/// Info tables located through the footer
struct ParsedTables {
    footer: TextureCacheFooter,
    mip_offsets: Vec<u32>,
    names: Vec<String>,
    records: Vec<TextureEntryRecord>,
}

impl TextureCache {
    /// Open a texture cache and register it.
    ///
    /// Reads the footer, info tables and each item's sub-header. Item bodies
    /// stay on disk.
    pub fn read(path: impl AsRef<Path>, registry: &mut ArchiveRegistry) -> TextureCacheResult<Self> {
        let path = path.as_ref();
        info!("Opening texture cache {}", path.display());

        let mmap = mapped::map_file(path)?;
        let data = mmap.as_deref().unwrap_or_default();
        let tables = parse_tables(data)?;

        let mut parsed = Vec::with_capacity(tables.records.len());
        for (name, record) in tables.names.into_iter().zip(tables.records) {
            let sub_header = read_sub_header(data, &name, &record)?;
            let mip_offsets = item_mip_offsets(&tables.mip_offsets, &name, &record);
            parsed.push((name, record, sub_header, mip_offsets));
        }

        let name = path
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        let id = registry.register(
            ArchiveKind::TextureCache,
            name.clone(),
            Some(path.to_path_buf()),
        );

        let items: Vec<_> = parsed
            .into_iter()
            .map(|(item_name, record, sub_header, mips)| {
                TextureCacheItem::from_record(item_name, record, sub_header, mips, id)
            })
            .collect();

        debug!("{}: {} items", path.display(), items.len());
        Ok(Self {
            id,
            name,
            footer: tables.footer,
            mip_offsets: tables.mip_offsets,
            items,
        })
    }

    /// New cache holding copies of `items`.
    ///
    /// Page offsets, name offsets and the mip-offset table are recomputed. Each
    /// stored mip offset becomes `new_item_offset + 9 + payload_size + r`,
    /// where `r` is the mip's position within its item's chain.
    pub fn build_from_items(
        items: &[TextureCacheItem],
        config: &PackConfig,
        registry: &mut ArchiveRegistry,
    ) -> TextureCacheResult<Self> {
        check_unique(items.iter().map(|item| item.depot_path.as_str()))?;
        let name = config.texture_cache_name.clone();
        let id = registry.register(ArchiveKind::TextureCache, name.clone(), None);

        let mut relative = Vec::with_capacity(items.len());
        for item in items {
            relative.push(item.relative_mip_offsets(registry)?);
        }

        let mut copies = Vec::with_capacity(items.len());
        for item in items {
            copies.push(reparent(item, id, registry));
        }
        let (footer, mip_offsets) = layout(&mut copies, &relative)?;

        info!("Built {name} from {} existing items", copies.len());
        Ok(Self {
            id,
            name,
            footer,
            mip_offsets,
            items: copies,
        })
    }

    /// New cache from loose texture payloads.
    ///
    /// Each file is zlib-compressed and stored without mips or image
    /// metadata.
    pub fn build_from_files(
        files: &[LooseFile],
        config: &PackConfig,
        registry: &mut ArchiveRegistry,
    ) -> TextureCacheResult<Self> {
        check_unique(files.iter().map(|f| f.depot_path.as_str()))?;
        let name = config.texture_cache_name.clone();
        let id = registry.register(ArchiveKind::TextureCache, name.clone(), None);

        let mut items = Vec::with_capacity(files.len());
        for file in files {
            let raw = std::fs::read(&file.path)?;
            let payload = compression::compress(&raw, CompressionKind::ZLib)?;
            let sub_header = ItemSubHeader {
                cached_zsize_no_mips: to_u32(payload.len() as u64)?,
                cached_size_no_mips: to_u32(raw.len() as u64)?,
                cached_mips_count: 0,
            };

            let mut region = Vec::with_capacity(SUB_HEADER_SIZE as usize + payload.len());
            region.extend_from_slice(&sub_header.to_bytes());
            region.extend_from_slice(&payload);
            debug!("{}: {} -> {} bytes", file.depot_path, raw.len(), region.len());

            items.push(TextureCacheItem {
                depot_path: file.depot_path.clone(),
                record: TextureEntryRecord {
                    zsize: to_u32(region.len() as u64)?,
                    size: to_u32(raw.len() as u64)?,
                    ..TextureEntryRecord::default()
                },
                sub_header,
                mip_offsets: Vec::new(),
                owner: id,
                backing: BackingStore::in_memory(region),
            });
        }

        let relative = vec![Vec::new(); items.len()];
        let (footer, mip_offsets) = layout(&mut items, &relative)?;

        info!("Built {name} from {} loose files", items.len());
        Ok(Self {
            id,
            name,
            footer,
            mip_offsets,
            items,
        })
    }

    /// Write the cache as `dir/<name>` and record that path in the registry.
    ///
    /// Every item's bytes must be reachable; this is checked before the file
    /// is created.
    pub fn write(
        &self,
        dir: impl AsRef<Path>,
        registry: &mut ArchiveRegistry,
    ) -> TextureCacheResult<PathBuf> {
        let path = dir.as_ref().join(&self.name);
        info!("Writing texture cache {}", path.display());

        if let Some(item) = self.items.iter().find(|item| !item.is_reachable(registry)) {
            return Err(TextureCacheError::MissingBackingStore {
                name: item.depot_path().to_string(),
            });
        }

        let mut writer = BufWriter::new(File::create(&path)?);
        self.write_to(&mut writer, registry)?;
        writer.flush()?;
        drop(writer);

        registry.attach_path(self.id, path.clone());
        Ok(path)
    }

    /// Serialize item bodies, info tables and footer into `writer`.
    ///
    /// The footer checksum is recomputed over the info tables.
    pub fn write_to<W: Write>(
        &self,
        writer: &mut W,
        registry: &ArchiveRegistry,
    ) -> TextureCacheResult<()> {
        let mut position = 0u64;
        for item in &self.items {
            if position != item.byte_offset() {
                return Err(TextureCacheError::CorruptArchive(format!(
                    "{} expected at offset {}, writer is at {position}",
                    item.depot_path(),
                    item.byte_offset()
                )));
            }

            let region = item.read_region(registry)?;
            let body = region.get(SUB_HEADER_SIZE as usize..).ok_or_else(|| {
                TextureCacheError::CorruptArchive(format!(
                    "{}: {} byte region is shorter than its sub-header",
                    item.depot_path(),
                    region.len()
                ))
            })?;
            writer.write_all(&item.sub_header().to_bytes())?;
            writer.write_all(body)?;
            position += region.len() as u64;
            position = pad_to(writer, position, next_aligned(position))?;
        }

        let tables = self.info_tables()?;
        let mut footer = self.footer.clone();
        footer.crc = Fnv1a64::hash(&tables);

        writer.write_all(&tables)?;
        let mut tail = Cursor::new(Vec::with_capacity(FOOTER_SIZE as usize));
        footer.write(&mut tail)?;
        writer.write_all(&tail.into_inner())?;
        Ok(())
    }

    /// Mip-offset table, name table and entry table as written
    fn info_tables(&self) -> TextureCacheResult<Vec<u8>> {
        let mut tables = Cursor::new(Vec::with_capacity(
            usize::try_from(self.footer.info_tables_size()).unwrap_or(0),
        ));
        for offset in &self.mip_offsets {
            tables.write_all(&offset.to_le_bytes())?;
        }
        for item in &self.items {
            tables.write_all(item.depot_path().as_bytes())?;
            tables.write_all(&[0])?;
        }
        for item in &self.items {
            item.record().write(&mut tables)?;
        }
        Ok(tables.into_inner())
    }

    /// Registry handle
    pub const fn id(&self) -> ArchiveId {
        self.id
    }

    /// File name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Footer; the checksum of a built cache is filled in on write
    pub const fn footer(&self) -> &TextureCacheFooter {
        &self.footer
    }

    /// Flat mip-offset table
    pub fn mip_offsets(&self) -> &[u32] {
        &self.mip_offsets
    }

    /// Items in table order
    pub fn items(&self) -> &[TextureCacheItem] {
        &self.items
    }

    /// Find an item by depot path
    pub fn item(&self, depot_path: &str) -> Option<&TextureCacheItem> {
        self.items.iter().find(|i| i.depot_path() == depot_path)
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cache holds no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Locate and parse the footer and info tables
fn parse_tables(data: &[u8]) -> TextureCacheResult<ParsedTables> {
    let len = data.len() as u64;
    if len < FOOTER_SIZE {
        return Err(TextureCacheError::CorruptArchive(format!(
            "file is {len} bytes, shorter than the footer"
        )));
    }

    let mut cursor = Cursor::new(data);
    cursor.set_position(len - FOOTER_SIZE);
    let footer = TextureCacheFooter::read(&mut cursor)?;
    footer.validate()?;

    let jump = footer.backward_jump();
    if jump > len {
        return Err(TextureCacheError::CorruptArchive(format!(
            "info tables need {jump} bytes, file is {len} bytes"
        )));
    }
    let tables_start = len - jump;
    let names_start = tables_start + u64::from(footer.mip_entry_count) * 4;
    let entries_start = names_start + u64::from(footer.string_table_size);

    cursor.set_position(tables_start);
    let mut mip_offsets = Vec::with_capacity(footer.mip_entry_count as usize);
    for _ in 0..footer.mip_entry_count {
        mip_offsets.push(u32::read_le(&mut cursor)?);
    }

    let name_bytes = &data[names_start as usize..entries_start as usize];
    let names = recover_names(split_names(name_bytes), footer.entry_count)?;

    cursor.set_position(entries_start);
    let mut records = Vec::with_capacity(footer.entry_count as usize);
    for _ in 0..footer.entry_count {
        records.push(TextureEntryRecord::read(&mut cursor)?);
    }

    if cursor.position() != len - FOOTER_SIZE {
        return Err(TextureCacheError::CorruptArchive(format!(
            "entry table ends at {}, footer starts at {}",
            cursor.position(),
            len - FOOTER_SIZE
        )));
    }

    debug_assert_eq!(
        entries_start + u64::from(footer.entry_count) * ENTRY_RECORD_SIZE,
        len - FOOTER_SIZE
    );

    Ok(ParsedTables {
        footer,
        mip_offsets,
        names,
        records,
    })
}

/// NUL-terminated strings of the name table
fn split_names(bytes: &[u8]) -> Vec<String> {
    let bytes = bytes.strip_suffix(&[0]).unwrap_or(bytes);
    if bytes.is_empty() {
        return Vec::new();
    }
    bytes
        .split(|b| *b == 0)
        .map(|name| String::from_utf8_lossy(name).into_owned())
        .collect()
}

/// Match the parsed names to the declared entry count.
///
/// Some shipped caches repeat names in the table; dropping repeats (keeping
/// first occurrences) recovers the intended list.
fn recover_names(names: Vec<String>, declared: u32) -> TextureCacheResult<Vec<String>> {
    if names.len() == declared as usize {
        return Ok(names);
    }

    let total = names.len();
    let mut seen = HashSet::new();
    let distinct: Vec<_> = names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect();

    if distinct.len() == declared as usize {
        warn!(
            "name table holds {total} names for {declared} entries; dropped {} repeats",
            total - distinct.len()
        );
        Ok(distinct)
    } else {
        Err(TextureCacheError::NameTableCorrupt {
            declared,
            parsed: distinct.len(),
        })
    }
}

/// Sub-header at the start of an item's region
fn read_sub_header(
    data: &[u8],
    name: &str,
    record: &TextureEntryRecord,
) -> TextureCacheResult<ItemSubHeader> {
    let start = u64::from(record.page_offset) * ALIGNMENT;
    let end = start + u64::from(record.zsize);
    if end > data.len() as u64 || u64::from(record.zsize) < SUB_HEADER_SIZE {
        return Err(TextureCacheError::CorruptArchive(format!(
            "{name}: region {start}..{end} is outside the {} byte file",
            data.len()
        )));
    }

    let mut cursor = Cursor::new(data);
    cursor.set_position(start);
    Ok(ItemSubHeader::read(&mut cursor)?)
}

/// An item's slice of the flat mip-offset table
fn item_mip_offsets(table: &[u32], name: &str, record: &TextureEntryRecord) -> Vec<u32> {
    let start = record.mip_offset_index as usize;
    let end = start.saturating_add(record.mips_count as usize);
    match table.get(start..end) {
        Some(offsets) => offsets.to_vec(),
        None => {
            warn!(
                "{name}: mip entries {start}..{end} exceed the {} entry table",
                table.len()
            );
            table.get(start.min(table.len())..).unwrap_or_default().to_vec()
        }
    }
}

/// Copy of `item` owned by `new_owner`, reading from wherever the bytes live now
fn reparent(
    item: &TextureCacheItem,
    new_owner: ArchiveId,
    registry: &ArchiveRegistry,
) -> TextureCacheItem {
    let backing = if registry.existing_file(item.owner()).is_some() {
        BackingStore::BackedByArchive {
            archive: item.owner(),
            offset: item.byte_offset(),
        }
    } else {
        item.backing().clone()
    };

    TextureCacheItem {
        owner: new_owner,
        backing,
        ..item.clone()
    }
}

/// Assign pages, name offsets and mip-table slots in order and return the
/// matching footer and flat mip table
fn layout(
    items: &mut [TextureCacheItem],
    relative_mips: &[Vec<u64>],
) -> TextureCacheResult<(TextureCacheFooter, Vec<u32>)> {
    let mut offset = 0u64;
    let mut string_offset = 0u64;
    let mut mip_table = Vec::new();

    for (item, relative) in items.iter_mut().zip(relative_mips) {
        let chain_start =
            offset + SUB_HEADER_SIZE + u64::from(item.sub_header.cached_zsize_no_mips);
        let rebased = relative
            .iter()
            .map(|r| to_u32(chain_start + r))
            .collect::<TextureCacheResult<Vec<_>>>()?;

        item.record.path_string_index = to_u32(string_offset)?;
        item.record.page_offset = to_u32(offset / ALIGNMENT)?;
        item.record.mip_offset_index = to_u32(mip_table.len() as u64)?;
        item.record.mips_count = to_u32(rebased.len() as u64)?;
        mip_table.extend_from_slice(&rebased);
        item.mip_offsets = rebased;

        string_offset += item.depot_path.len() as u64 + 1;
        offset = next_aligned(offset + u64::from(item.record.zsize));
    }

    let footer = TextureCacheFooter::new(
        to_u32(offset / ALIGNMENT)?,
        to_u32(items.len() as u64)?,
        to_u32(string_offset)?,
        to_u32(mip_table.len() as u64)?,
    );
    Ok((footer, mip_table))
}

fn to_u32(value: u64) -> TextureCacheResult<u32> {
    u32::try_from(value).map_err(|_| TextureCacheError::OffsetOverflow(value))
}

fn check_unique<'a>(names: impl Iterator<Item = &'a str>) -> TextureCacheResult<()> {
    match first_duplicate(names) {
        Some(name) => Err(TextureCacheError::DuplicatePath(name.to_string())),
        None => Ok(()),
    }
}
