//! Bundle read, build and write

use super::entry::BundleEntry;
use super::error::{BundleError, BundleResult};
use super::header::{BundleHeader, HEADER_SIZE};
use super::loose::LooseFile;
use super::record::{NAME_FIELD_SIZE, TOC_ENTRY_SIZE, TocRecord};
use crate::access::{self, BackingStore, mapped};
use crate::align::{next_aligned, pad_to};
use crate::compression;
use crate::config::PackConfig;
use crate::entry::{depot_key, first_duplicate};
use crate::registry::{ArchiveId, ArchiveKind, ArchiveRegistry};
use binrw::io::{Cursor, Write};
use binrw::{BinRead, BinWrite};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use w3pack_hash::Crc32;

/// A bundle archive: header, ToC entries and the bodies they point at
#[derive(Debug, Clone)]
pub struct Bundle {
    id: ArchiveId,
    name: String,
    header: BundleHeader,
    entries: Vec<BundleEntry>,
}

impl Bundle {
    /// Open a bundle file and register it.
    ///
    /// Only the header and ToC are read; entry bodies stay on disk.
    pub fn read(path: impl AsRef<Path>, registry: &mut ArchiveRegistry) -> BundleResult<Self> {
        let path = path.as_ref();
        info!("Opening bundle {}", path.display());

        let mmap = mapped::map_file(path)?;
        let data = mmap.as_deref().unwrap_or_default();
        let (header, records) = parse_toc(data)?;

        let name = path
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        let id = registry.register(ArchiveKind::Bundle, name.clone(), Some(path.to_path_buf()));

        let entries: Vec<_> = records
            .iter()
            .map(|record| BundleEntry::from_record(record, id))
            .collect();

        let mut seen = HashSet::new();
        for entry in &entries {
            if !seen.insert(depot_key(entry.depot_path())) {
                warn!("{}: duplicate ToC entry {}", path.display(), entry.depot_path());
            }
        }

        debug!("{}: {} entries", path.display(), entries.len());
        Ok(Self {
            id,
            name,
            header,
            entries,
        })
    }

    /// New bundle holding copies of `entries`.
    ///
    /// Offsets are recomputed. Bodies are not copied; each new entry reads from
    /// the archive or buffer its source entry reads from.
    pub fn build_from_entries(
        entries: &[BundleEntry],
        config: &PackConfig,
        registry: &mut ArchiveRegistry,
    ) -> BundleResult<Self> {
        let buffers = check_buffer_class(entries.iter().map(BundleEntry::depot_path))?;
        check_unique(entries.iter().map(BundleEntry::depot_path))?;

        let name = config.bundle_name(buffers).to_string();
        let id = registry.register(ArchiveKind::Bundle, name.clone(), None);

        let mut copies: Vec<_> = entries
            .iter()
            .map(|entry| entry.reparent(id, registry))
            .collect();
        let header = layout(&mut copies)?;

        info!("Built {name} from {} existing entries", copies.len());
        Ok(Self {
            id,
            name,
            header,
            entries: copies,
        })
    }

    /// New bundle from loose files, compressed with `config.compression`.
    ///
    /// Compressed bodies are kept in memory until the bundle is written.
    pub fn build_from_files(
        files: &[LooseFile],
        config: &PackConfig,
        registry: &mut ArchiveRegistry,
    ) -> BundleResult<Self> {
        let buffers = check_buffer_class(files.iter().map(|f| f.depot_path.as_str()))?;
        check_unique(files.iter().map(|f| f.depot_path.as_str()))?;

        let name = config.bundle_name(buffers).to_string();
        let id = registry.register(ArchiveKind::Bundle, name.clone(), None);

        let mut entries = Vec::with_capacity(files.len());
        for file in files {
            if file.depot_path.len() > NAME_FIELD_SIZE {
                warn!(
                    "{}: depot path longer than {NAME_FIELD_SIZE} bytes will be truncated",
                    file.depot_path
                );
            }

            let raw = std::fs::read(&file.path)?;
            let compressed = compression::compress(&raw, config.compression)?;
            debug!(
                "{}: {} -> {} bytes ({})",
                file.depot_path,
                raw.len(),
                compressed.len(),
                config.compression
            );

            entries.push(BundleEntry {
                depot_path: file.depot_path.clone(),
                hash: [0; 16],
                size: to_u32(raw.len() as u64)?,
                zsize: to_u32(compressed.len() as u64)?,
                page_offset: 0,
                date: 0,
                time: 0,
                crc: Crc32::of(&raw).value(),
                compression: config.compression.tag(),
                owner: id,
                backing: BackingStore::in_memory(compressed),
            });
        }
        let header = layout(&mut entries)?;

        info!("Built {name} from {} loose files", entries.len());
        Ok(Self {
            id,
            name,
            header,
            entries,
        })
    }

    /// Write the bundle as `dir/<name>` and record that path in the registry.
    ///
    /// Every entry's bytes must be reachable; this is checked before the file
    /// is created.
    pub fn write(
        &self,
        dir: impl AsRef<Path>,
        registry: &mut ArchiveRegistry,
    ) -> BundleResult<PathBuf> {
        let path = dir.as_ref().join(&self.name);
        info!("Writing bundle {}", path.display());

        self.ensure_reachable(registry)?;

        let mut writer = BufWriter::new(File::create(&path)?);
        self.write_to(&mut writer, registry)?;
        writer.flush()?;
        drop(writer);

        registry.attach_path(self.id, path.clone());
        Ok(path)
    }

    /// Serialize header, ToC and bodies into `writer`
    pub fn write_to<W: Write>(&self, writer: &mut W, registry: &ArchiveRegistry) -> BundleResult<()> {
        let mut table = Cursor::new(Vec::with_capacity(
            HEADER_SIZE as usize + self.header.toc_size as usize,
        ));
        self.header.write(&mut table)?;
        for entry in &self.entries {
            entry.serialize_record(&mut table)?;
        }
        let table = table.into_inner();
        writer.write_all(&table)?;

        let mut position = table.len() as u64;
        position = pad_to(writer, position, next_aligned(position))?;

        let last = self.entries.len().saturating_sub(1);
        for (index, entry) in self.entries.iter().enumerate() {
            if position != u64::from(entry.page_offset()) {
                return Err(BundleError::CorruptArchive(format!(
                    "{} expected at offset {}, writer is at {position}",
                    entry.depot_path(),
                    entry.page_offset()
                )));
            }

            let bytes = entry.compressed_bytes(registry)?;
            writer.write_all(&bytes)?;
            position += bytes.len() as u64;

            if index != last {
                position = pad_to(writer, position, next_aligned(position))?;
            }
        }

        Ok(())
    }

    /// Fail with `MissingBackingStore` if any entry's bytes are unreachable
    fn ensure_reachable(&self, registry: &ArchiveRegistry) -> BundleResult<()> {
        for entry in &self.entries {
            if !access::is_reachable(registry, entry.owner(), entry.backing()) {
                return Err(BundleError::MissingBackingStore {
                    name: entry.depot_path().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Registry handle
    pub const fn id(&self) -> ArchiveId {
        self.id
    }

    /// File name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Header
    pub const fn header(&self) -> &BundleHeader {
        &self.header
    }

    /// Entries in ToC order
    pub fn entries(&self) -> &[BundleEntry] {
        &self.entries
    }

    /// Find an entry by depot path
    pub fn entry(&self, depot_path: &str) -> Option<&BundleEntry> {
        self.entries.iter().find(|e| e.depot_path() == depot_path)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ToC is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether every entry is a `.buffer` entry
    pub fn is_buffer_bundle(&self) -> bool {
        !self.entries.is_empty() && self.entries.iter().all(BundleEntry::is_buffer)
    }
}

/// Parse header and ToC records from a mapped bundle
fn parse_toc(data: &[u8]) -> BundleResult<(BundleHeader, Vec<TocRecord>)> {
    if data.len() < 8 || data[..8] != super::header::BUNDLE_MAGIC {
        let mut magic = [0u8; 8];
        let len = data.len().min(8);
        magic[..len].copy_from_slice(&data[..len]);
        return Err(BundleError::InvalidArchiveHeader(magic));
    }
    if (data.len() as u64) < HEADER_SIZE {
        return Err(BundleError::CorruptArchive(format!(
            "file is {} bytes, shorter than the header",
            data.len()
        )));
    }

    let mut cursor = Cursor::new(data);
    let header = BundleHeader::read(&mut cursor)?;
    header.validate()?;

    let toc_end = HEADER_SIZE + u64::from(header.toc_size);
    if toc_end > data.len() as u64 {
        return Err(BundleError::CorruptArchive(format!(
            "ToC ends at {toc_end}, file is {} bytes",
            data.len()
        )));
    }

    let mut records = Vec::with_capacity(header.entry_count());
    while cursor.position() + TOC_ENTRY_SIZE <= toc_end {
        records.push(TocRecord::read(&mut cursor)?);
    }
    Ok((header, records))
}

/// Assign page offsets in ToC order and return the matching header
fn layout(entries: &mut [BundleEntry]) -> BundleResult<BundleHeader> {
    let toc_size = entries.len() as u64 * TOC_ENTRY_SIZE;
    let mut offset = next_aligned(HEADER_SIZE + toc_size);

    for entry in entries.iter_mut() {
        entry.page_offset = to_u32(offset)?;
        offset = next_aligned(offset + u64::from(entry.zsize));
    }

    Ok(BundleHeader::new(to_u32(offset)?, to_u32(toc_size)?))
}

/// Whether the names are all buffers (`true`) or none are (`false`)
fn check_buffer_class<'a>(names: impl Iterator<Item = &'a str>) -> BundleResult<bool> {
    let (mut buffers, mut others) = (0usize, 0usize);
    for name in names {
        if crate::entry::is_buffer_path(name) {
            buffers += 1;
        } else {
            others += 1;
        }
    }
    if buffers > 0 && others > 0 {
        return Err(BundleError::MixedBufferKind { buffers, others });
    }
    Ok(buffers > 0)
}

fn check_unique<'a>(names: impl Iterator<Item = &'a str>) -> BundleResult<()> {
    match first_duplicate(names) {
        Some(name) => Err(BundleError::DuplicatePath(name.to_string())),
        None => Ok(()),
    }
}

fn to_u32(value: u64) -> BundleResult<u32> {
    u32::try_from(value).map_err(|_| BundleError::OffsetOverflow(value))
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::compression::CompressionKind;
    use crate::test_utils::write_loose_tree;

    #[test]
    fn test_single_loose_file_lands_on_first_page() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_loose_tree(dir.path(), &[("texture.dds", vec![0x41; 4096])]);

        let mut registry = ArchiveRegistry::new();
        let bundle = Bundle::build_from_files(&files, &PackConfig::default(), &mut registry)
            .expect("Operation should succeed");

        let entry = &bundle.entries()[0];
        assert_eq!(entry.page_offset(), 4096);
        assert!(entry.zsize() <= 4096);
        assert_eq!(bundle.header().toc_size, 320);
        assert_eq!(
            u64::from(bundle.header().bundle_size),
            next_aligned(4096 + u64::from(entry.zsize()))
        );

        let out = tempfile::tempdir().unwrap();
        let path = bundle.write(out.path(), &mut registry).expect("Operation should succeed");
        let len = std::fs::metadata(&path).unwrap().len();
        assert_eq!(len, 4096 + u64::from(entry.zsize()));
        assert_eq!(registry.existing_file(bundle.id()), Some(path.as_path()));
    }

    #[test]
    fn test_mixed_buffer_kinds_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_loose_tree(
            dir.path(),
            &[
                ("a.w2mesh", b"mesh".to_vec()),
                ("a.w2mesh.1.buffer", b"buffer".to_vec()),
            ],
        );

        let mut registry = ArchiveRegistry::new();
        let err = Bundle::build_from_files(&files, &PackConfig::default(), &mut registry)
            .unwrap_err();
        assert!(matches!(
            err,
            BundleError::MixedBufferKind {
                buffers: 1,
                others: 1
            }
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_buffer_only_bundle_is_named_for_buffers() {
        let dir = tempfile::tempdir().unwrap();
        let files = write_loose_tree(dir.path(), &[("a.w2mesh.1.buffer", vec![7; 100])]);

        let mut registry = ArchiveRegistry::new();
        let config = PackConfig::default().with_compression(CompressionKind::None);
        let bundle = Bundle::build_from_files(&files, &config, &mut registry).unwrap();
        assert_eq!(bundle.name(), "buffers0.bundle");
        assert!(bundle.is_buffer_bundle());
    }

    #[test]
    fn test_read_rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob0.bundle");
        std::fs::write(&path, [0x50u8; 64]).unwrap();

        let mut registry = ArchiveRegistry::new();
        let err = Bundle::read(&path, &mut registry).unwrap_err();
        assert!(matches!(err, BundleError::InvalidArchiveHeader(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_read_rejects_truncated_toc() {
        let header = BundleHeader::new(8192, 3200);
        let mut cursor = Cursor::new(Vec::new());
        header.write(&mut cursor).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob0.bundle");
        std::fs::write(&path, cursor.into_inner()).unwrap();

        let mut registry = ArchiveRegistry::new();
        let err = Bundle::read(&path, &mut registry).unwrap_err();
        assert!(matches!(err, BundleError::CorruptArchive(_)));
    }

    #[test]
    fn test_duplicate_loose_paths_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = write_loose_tree(dir.path(), &[("a.xml", b"a".to_vec())]);
        files.push(files[0].clone());

        let mut registry = ArchiveRegistry::new();
        let err = Bundle::build_from_files(&files, &PackConfig::default(), &mut registry)
            .unwrap_err();
        assert!(matches!(err, BundleError::DuplicatePath(p) if p == "a.xml"));
    }

    #[test]
    fn test_paths_differing_only_in_case_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut files = write_loose_tree(dir.path(), &[("gameplay\\a.xml", b"a".to_vec())]);
        let mut upper = files[0].clone();
        upper.depot_path = "Gameplay/A.xml".to_string();
        files.push(upper);

        let mut registry = ArchiveRegistry::new();
        let err = Bundle::build_from_files(&files, &PackConfig::default(), &mut registry)
            .unwrap_err();
        assert!(matches!(err, BundleError::DuplicatePath(p) if p == "Gameplay/A.xml"));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_missing_source_fails_before_file_is_created() {
        let src = tempfile::tempdir().unwrap();
        let files = write_loose_tree(src.path(), &[("a.xml", b"<a/>".to_vec())]);

        let mut registry = ArchiveRegistry::new();
        let config = PackConfig::default();
        let original = Bundle::build_from_files(&files, &config, &mut registry).unwrap();
        let first_dir = tempfile::tempdir().unwrap();
        let written = original.write(first_dir.path(), &mut registry).unwrap();

        let merged = Bundle::build_from_entries(original.entries(), &config, &mut registry).unwrap();
        std::fs::remove_file(&written).unwrap();

        let out = tempfile::tempdir().unwrap();
        let err = merged.write(out.path(), &mut registry).unwrap_err();
        assert!(matches!(err, BundleError::MissingBackingStore { ref name } if name == "a.xml"));
        assert!(!out.path().join("blob0.bundle").exists());
    }
}
