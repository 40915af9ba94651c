//! The metadata store and its wire format

use super::builder;
use super::error::{MetadataError, MetadataResult};
use super::records::{
    BundleInfoRecord, DirInitRecord, FileEntryRecord, FileInfoRecord, FileInitRecord, HashRecord,
    TableRecord,
};
use super::vlq::{read_vlq, write_vlq};
use crate::bundle::Bundle;
use crate::config::PackConfig;
use binrw::io::Cursor;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use w3pack_hash::Fnv1a64;

/// Magic bytes at the start of a metadata store
pub const METADATA_MAGIC: [u8; 4] = [0x03, b'V', b'T', b'M'];

/// Version written and accepted
pub const METADATA_VERSION: u32 = 6;

/// Index the engine loads to find every file of a set of bundles.
///
/// The file-info, file-entry and bundle-info tables are held without the
/// zeroed record that precedes them on the wire, so `file_infos()[i]` belongs
/// to file id `i + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataStore {
    pub(super) version: u32,
    pub(super) max_file_size_in_bundle: u32,
    pub(super) max_file_size_in_memory: u32,
    pub(super) string_table: Vec<u8>,
    pub(super) file_infos: Vec<FileInfoRecord>,
    pub(super) file_entries: Vec<FileEntryRecord>,
    pub(super) bundle_infos: Vec<BundleInfoRecord>,
    pub(super) buffers: Vec<u32>,
    pub(super) dir_inits: Vec<DirInitRecord>,
    pub(super) file_inits: Vec<FileInitRecord>,
    pub(super) hashes: Vec<HashRecord>,
}

impl MetadataStore {
    /// Index `bundles`, in the order given.
    ///
    /// Bundle ids and file ids follow that order; a depot path appearing in
    /// more than one bundle is indexed once, from the first.
    pub fn build(bundles: &[&Bundle]) -> MetadataResult<Self> {
        builder::build(bundles)
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> MetadataResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.string_table.len() + 64);
        out.extend_from_slice(&METADATA_MAGIC);
        out.extend_from_slice(&self.version.to_le_bytes());
        out.extend_from_slice(&self.max_file_size_in_bundle.to_le_bytes());
        out.extend_from_slice(&self.max_file_size_in_memory.to_le_bytes());

        write_vlq(to_count(self.string_table.len())?, &mut out);
        out.extend_from_slice(&self.string_table);

        write_table(&mut out, &self.file_infos, true)?;
        write_table(&mut out, &self.file_entries, true)?;
        write_table(&mut out, &self.bundle_infos, true)?;

        write_vlq(to_count(self.buffers.len())?, &mut out);
        for buffer in &self.buffers {
            out.extend_from_slice(&buffer.to_le_bytes());
        }

        write_table(&mut out, &self.dir_inits, false)?;
        write_table(&mut out, &self.file_inits, false)?;
        write_table(&mut out, &self.hashes, false)?;
        Ok(out)
    }

    /// Write as `dir/<config.metadata_store_name>`
    pub fn write(&self, dir: impl AsRef<Path>, config: &PackConfig) -> MetadataResult<PathBuf> {
        let path = dir.as_ref().join(&config.metadata_store_name);
        info!("Writing metadata store {}", path.display());
        fs::write(&path, self.to_bytes()?)?;
        Ok(path)
    }

    /// Check that serializing the parse of `data` reproduces it byte for byte
    pub fn round_trips(data: &[u8]) -> MetadataResult<bool> {
        let rebuilt = Self::parse(data)?.to_bytes()?;
        Ok(data == rebuilt.as_slice())
    }

    /// Parse from bytes
    pub fn parse(data: &[u8]) -> MetadataResult<Self> {
        let mut reader = Reader { data, offset: 0 };

        let magic: [u8; 4] = reader.take_array()?;
        let version = u32::from_le_bytes(reader.take_array()?);
        if magic != METADATA_MAGIC || version != METADATA_VERSION {
            return Err(MetadataError::InvalidArchiveHeader { magic, version });
        }
        let max_file_size_in_bundle = u32::from_le_bytes(reader.take_array()?);
        let max_file_size_in_memory = u32::from_le_bytes(reader.take_array()?);

        let string_table_size = reader.count("string table", 1)?;
        let string_table = reader.take(string_table_size)?.to_vec();

        let file_infos = reader.table(true)?;
        let file_entries = reader.table(true)?;
        let bundle_infos = reader.table(true)?;

        let buffer_count = reader.count("buffer", 4)?;
        let mut buffers = Vec::with_capacity(buffer_count);
        for _ in 0..buffer_count {
            buffers.push(u32::from_le_bytes(reader.take_array()?));
        }

        let dir_inits = reader.table(false)?;
        let file_inits = reader.table(false)?;
        let hashes = reader.table(false)?;

        if reader.offset != data.len() {
            warn!(
                "metadata store has {} trailing bytes after the hash table",
                data.len() - reader.offset
            );
        }

        Ok(Self {
            version,
            max_file_size_in_bundle,
            max_file_size_in_memory,
            string_table,
            file_infos,
            file_entries,
            bundle_infos,
            buffers,
            dir_inits,
            file_inits,
            hashes,
        })
    }

    /// Read and parse a `metadata.store` file
    pub fn read(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();
        info!("Reading metadata store {}", path.display());
        Self::parse(&fs::read(path)?)
    }

    /// Format version
    pub const fn version(&self) -> u32 {
        self.version
    }

    /// Largest compressed file size
    pub const fn max_file_size_in_bundle(&self) -> u32 {
        self.max_file_size_in_bundle
    }

    /// Largest uncompressed file size
    pub const fn max_file_size_in_memory(&self) -> u32 {
        self.max_file_size_in_memory
    }

    /// Raw string table, starting with its leading NUL
    pub fn string_table(&self) -> &[u8] {
        &self.string_table
    }

    /// File info records, index `i` for file id `i + 1`
    pub fn file_infos(&self) -> &[FileInfoRecord] {
        &self.file_infos
    }

    /// File entry records, index `i` for file id `i + 1`
    pub fn file_entries(&self) -> &[FileEntryRecord] {
        &self.file_entries
    }

    /// Bundle info records, index `i` for bundle id `i + 1`
    pub fn bundle_infos(&self) -> &[BundleInfoRecord] {
        &self.bundle_infos
    }

    /// File ids of `.buffer` files
    pub fn buffers(&self) -> &[u32] {
        &self.buffers
    }

    /// Directory records; record 0 is the root
    pub fn dir_inits(&self) -> &[DirInitRecord] {
        &self.dir_inits
    }

    /// Leaf file records
    pub fn file_inits(&self) -> &[FileInitRecord] {
        &self.file_inits
    }

    /// Hash table, ascending by hash
    pub fn hashes(&self) -> &[HashRecord] {
        &self.hashes
    }

    /// NUL-terminated string starting at `offset` of the string table
    pub fn string_at(&self, offset: u32) -> Option<String> {
        let tail = self.string_table.get(offset as usize..)?;
        let end = tail.iter().position(|b| *b == 0)?;
        Some(String::from_utf8_lossy(&tail[..end]).into_owned())
    }

    /// Depot path of a 1-based file id
    pub fn file_path(&self, file_id: u32) -> Option<String> {
        let index = (file_id as usize).checked_sub(1)?;
        let info = self.file_infos.get(index)?;
        self.string_at(info.path_offset)
    }

    /// Name of a 1-based bundle id
    pub fn bundle_name(&self, bundle_id: u32) -> Option<String> {
        let index = (bundle_id as usize).checked_sub(1)?;
        let info = self.bundle_infos.get(index)?;
        self.string_at(info.name_offset)
    }

    /// File id of a non-buffer depot path, through the hash table
    pub fn find(&self, depot_path: &str) -> Option<u64> {
        let hash = Fnv1a64::hash_path(depot_path);
        let start = self.hashes.partition_point(|record| record.hash < hash);
        self.hashes[start..]
            .iter()
            .take_while(|record| record.hash == hash)
            .find(|record| {
                u32::try_from(record.file_id)
                    .ok()
                    .and_then(|id| self.file_path(id))
                    .is_some_and(|path| path == depot_path)
            })
            .map(|record| record.file_id)
    }

    /// File entry of a depot path
    pub fn file_entry(&self, depot_path: &str) -> Option<&FileEntryRecord> {
        let id = self.find(depot_path)?;
        self.file_entries.get(usize::try_from(id).ok()?.checked_sub(1)?)
    }
}

/// Write a VLQ count and the records, with a zeroed record first if `sentinel`
fn write_table<T: TableRecord>(out: &mut Vec<u8>, records: &[T], sentinel: bool) -> MetadataResult<()> {
    write_vlq(to_count(records.len() + usize::from(sentinel))?, out);

    let mut cursor = Cursor::new(Vec::with_capacity((records.len() + 1) * T::SIZE));
    if sentinel {
        T::default().write_le(&mut cursor)?;
    }
    for record in records {
        record.write_le(&mut cursor)?;
    }
    out.extend_from_slice(&cursor.into_inner());
    Ok(())
}

fn to_count(len: usize) -> MetadataResult<i32> {
    i32::try_from(len).map_err(|_| MetadataError::OffsetOverflow(len as u64))
}

/// Bounds-checked cursor over a store
struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> MetadataResult<&'a [u8]> {
        let end = self.offset.checked_add(len).filter(|end| *end <= self.data.len());
        let Some(end) = end else {
            return Err(MetadataError::CorruptArchive(format!(
                "need {len} bytes at offset {}, store is {} bytes",
                self.offset,
                self.data.len()
            )));
        };
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> MetadataResult<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    /// VLQ element count, checked against the bytes that remain
    fn count(&mut self, table: &str, element_size: usize) -> MetadataResult<usize> {
        let at = self.offset;
        let count = read_vlq(self.data, &mut self.offset)?;
        let count = usize::try_from(count).map_err(|_| {
            MetadataError::CorruptArchive(format!("{table} table has negative count {count} at offset {at}"))
        })?;
        let remaining = self.data.len() - self.offset;
        if count.saturating_mul(element_size) > remaining {
            return Err(MetadataError::CorruptArchive(format!(
                "{table} table declares {count} records, only {remaining} bytes remain"
            )));
        }
        Ok(count)
    }

    /// VLQ-counted table, dropping the leading zeroed record if `sentinel`
    fn table<T: TableRecord>(&mut self, sentinel: bool) -> MetadataResult<Vec<T>> {
        let count = self.count(T::TABLE, T::SIZE)?;
        let bytes = self.take(count * T::SIZE)?;

        let mut cursor = Cursor::new(bytes);
        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            records.push(T::read_le(&mut cursor)?);
        }

        if sentinel {
            if records.is_empty() {
                return Err(MetadataError::CorruptArchive(format!(
                    "{} table is missing its leading empty record",
                    T::TABLE
                )));
            }
            records.remove(0);
        }
        Ok(records)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::bundle::Bundle;
    use crate::compression::CompressionKind;
    use crate::registry::ArchiveRegistry;
    use crate::test_utils::write_loose_tree;
    use pretty_assertions::assert_eq;

    fn sample_bundles(registry: &mut ArchiveRegistry) -> (Bundle, Bundle) {
        let dir = tempfile::tempdir().unwrap();
        let files = write_loose_tree(
            dir.path(),
            &[
                ("characters\\models\\geralt\\body.w2mesh", vec![1; 300]),
                ("characters\\models\\geralt\\head.w2mesh", vec![2; 200]),
                ("gameplay\\items\\swords.xml", vec![3; 100]),
                ("readme.txt", vec![4; 10]),
            ],
        );
        let buffer_files = write_loose_tree(
            dir.path(),
            &[
                ("characters\\models\\geralt\\body.w2mesh.2.buffer", vec![5; 50]),
                ("characters\\models\\geralt\\body.w2mesh.1.buffer", vec![6; 50]),
            ],
        );
        let config = PackConfig::default().with_compression(CompressionKind::None);
        let blobs = Bundle::build_from_files(&files, &config, registry).unwrap();
        let buffers = Bundle::build_from_files(&buffer_files, &config, registry).unwrap();
        (blobs, buffers)
    }

    #[test]
    fn test_ids_and_tables() {
        let mut registry = ArchiveRegistry::new();
        let (blobs, buffers) = sample_bundles(&mut registry);
        let store = MetadataStore::build(&[&blobs, &buffers]).expect("Operation should succeed");

        assert_eq!(store.file_infos().len(), 6);
        assert_eq!(store.file_entries().len(), 6);
        assert_eq!(store.bundle_infos().len(), 2);
        assert_eq!(store.buffers(), &[5, 6]);
        assert_eq!(store.hashes().len(), 4);
        assert_eq!(store.file_inits().len(), 4);

        assert_eq!(store.file_path(1).as_deref(), Some("characters\\models\\geralt\\body.w2mesh"));
        assert_eq!(store.bundle_name(2).as_deref(), Some("buffers0.bundle"));

        let body = store.file_infos()[0];
        assert_eq!(body.has_buffer, 1);
        assert_eq!(body.buffer_id, 1);
        assert_eq!(store.file_infos()[1].has_buffer, 0);

        let entry = store.file_entries()[4];
        assert_eq!(entry.bundle_id, 2);
        assert_eq!(entry.offset, 4096);

        assert_eq!(store.bundle_infos()[1].first_file_entry, 5);
        assert_eq!(store.bundle_infos()[1].num_entries, 2);
        assert_eq!(store.bundle_infos()[0].data_block_offset, 32 + 4 * 320);
        assert_eq!(store.max_file_size_in_memory(), 300);
    }

    #[test]
    fn test_directory_tree() {
        let mut registry = ArchiveRegistry::new();
        let (blobs, _) = sample_bundles(&mut registry);
        let store = MetadataStore::build(&[&blobs]).unwrap();

        let dirs = store.dir_inits();
        assert_eq!(store.string_at(dirs[0].name_offset).as_deref(), Some(""));
        assert_eq!(dirs[0].parent_id, 0);

        let names: Vec<_> = dirs[1..]
            .iter()
            .map(|d| (store.string_at(d.name_offset).unwrap(), d.parent_id))
            .collect();
        assert_eq!(
            names,
            vec![
                ("characters".to_string(), 0),
                ("models".to_string(), 1),
                ("geralt".to_string(), 2),
                ("gameplay".to_string(), 0),
                ("items".to_string(), 4),
            ]
        );

        let readme = store.file_inits().iter().find(|f| f.file_id == 4).unwrap();
        assert_eq!(readme.dir_id, 0);
        assert_eq!(store.string_at(readme.name_offset).as_deref(), Some("readme.txt"));
        let head = store.file_inits().iter().find(|f| f.file_id == 2).unwrap();
        assert_eq!(head.dir_id, 3);
    }

    #[test]
    fn test_hash_table_sorted_and_searchable() {
        let mut registry = ArchiveRegistry::new();
        let (blobs, buffers) = sample_bundles(&mut registry);
        let store = MetadataStore::build(&[&blobs, &buffers]).unwrap();

        assert!(store.hashes().windows(2).all(|w| w[0].hash <= w[1].hash));
        assert_eq!(store.find("gameplay\\items\\swords.xml"), Some(3));
        assert_eq!(store.find("characters\\models\\geralt\\body.w2mesh.1.buffer"), None);
        assert_eq!(store.find("missing.xml"), None);
    }

    #[test]
    fn test_wire_round_trip_and_idempotence() {
        let mut registry = ArchiveRegistry::new();
        let (blobs, buffers) = sample_bundles(&mut registry);
        let first = MetadataStore::build(&[&blobs, &buffers]).unwrap().to_bytes().unwrap();
        let second = MetadataStore::build(&[&blobs, &buffers]).unwrap().to_bytes().unwrap();
        assert_eq!(first, second);

        assert_eq!(&first[..4], &METADATA_MAGIC);
        assert!(MetadataStore::round_trips(&first).unwrap());
        let parsed = MetadataStore::parse(&first).unwrap();
        assert_eq!(parsed.file_path(3).as_deref(), Some("gameplay\\items\\swords.xml"));
    }

    #[test]
    fn test_duplicate_paths_indexed_once() {
        let mut registry = ArchiveRegistry::new();
        let (blobs, _) = sample_bundles(&mut registry);
        let store = MetadataStore::build(&[&blobs, &blobs]).unwrap();
        assert_eq!(store.file_infos().len(), 4);
        assert_eq!(store.bundle_infos()[1].first_file_entry, 0);
        assert_eq!(store.bundle_infos()[1].num_entries, 0);
    }

    #[test]
    fn test_overlapping_bundles_count_indexed_files() {
        let dir = tempfile::tempdir().unwrap();
        let first_files = write_loose_tree(
            &dir.path().join("first"),
            &[("x\\a.xml", vec![1; 20]), ("x\\b.xml", vec![2; 20])],
        );
        let mut second_files =
            write_loose_tree(&dir.path().join("second"), &[("x\\a.xml", vec![3; 20])]);
        second_files.extend(write_loose_tree(
            &dir.path().join("second"),
            &[("x\\c.xml", vec![4; 20])],
        ));
        second_files[0].depot_path = "X\\A.xml".to_string();

        let mut registry = ArchiveRegistry::new();
        let config = PackConfig::default().with_compression(CompressionKind::None);
        let first = Bundle::build_from_files(&first_files, &config, &mut registry).unwrap();
        let second = Bundle::build_from_files(&second_files, &config, &mut registry).unwrap();
        let store = MetadataStore::build(&[&first, &second]).expect("Operation should succeed");

        assert_eq!(store.file_entries().len(), 3);
        let infos = store.bundle_infos();
        assert_eq!((infos[0].first_file_entry, infos[0].num_entries), (1, 2));
        assert_eq!((infos[1].first_file_entry, infos[1].num_entries), (3, 1));
        assert_eq!(store.file_entry("x\\c.xml").unwrap().bundle_id, 2);
        assert_eq!(store.file_entry("x\\a.xml").unwrap().bundle_id, 1);
    }

    #[test]
    fn test_empty_store() {
        let store = MetadataStore::build(&[]).unwrap();
        let bytes = store.to_bytes().unwrap();
        let parsed = MetadataStore::parse(&bytes).unwrap();
        assert_eq!(parsed, store);
        assert_eq!(parsed.dir_inits().len(), 1);
        assert_eq!(parsed.max_file_size_in_bundle(), 0);
    }

    #[test]
    fn test_parse_rejects_bad_magic() {
        let mut bytes = MetadataStore::build(&[]).unwrap().to_bytes().unwrap();
        bytes[1] = b'X';
        assert!(matches!(
            MetadataStore::parse(&bytes),
            Err(MetadataError::InvalidArchiveHeader { version: 6, .. })
        ));
    }

    #[test]
    fn test_parse_rejects_truncation() {
        let mut registry = ArchiveRegistry::new();
        let (blobs, _) = sample_bundles(&mut registry);
        let bytes = MetadataStore::build(&[&blobs]).unwrap().to_bytes().unwrap();
        assert!(matches!(
            MetadataStore::parse(&bytes[..bytes.len() - 3]),
            Err(MetadataError::CorruptArchive(_))
        ));
    }
}
