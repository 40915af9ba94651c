//! Bundle entries

use super::error::{BundleError, BundleResult};
use super::record::{PackedTimestamp, TocRecord, decode_name, encode_name};
use crate::access::{self, BackingStore};
use crate::compression::{self, CompressionKind, CompressionResult};
use crate::entry::{ArchiveEntry, is_buffer_path};
use crate::registry::{ArchiveId, ArchiveRegistry};
use binrw::BinWrite;
use binrw::io::{Seek, Write};

/// One file packed in a bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleEntry {
    pub(crate) depot_path: String,
    pub(crate) hash: [u8; 16],
    pub(crate) size: u32,
    pub(crate) zsize: u32,
    pub(crate) page_offset: u32,
    pub(crate) date: u32,
    pub(crate) time: u32,
    pub(crate) crc: u32,
    pub(crate) compression: u32,
    pub(crate) owner: ArchiveId,
    pub(crate) backing: BackingStore,
}

impl BundleEntry {
    /// Entry parsed from a ToC record of `owner`
    pub(crate) fn from_record(record: &TocRecord, owner: ArchiveId) -> Self {
        Self {
            depot_path: decode_name(&record.name),
            hash: record.hash,
            size: record.size,
            zsize: record.zsize,
            page_offset: record.page_offset,
            date: record.date,
            time: record.time,
            crc: record.crc,
            compression: record.compression,
            owner,
            backing: BackingStore::BackedByArchive {
                archive: owner,
                offset: u64::from(record.page_offset),
            },
        }
    }

    /// ToC record for this entry
    pub fn to_record(&self) -> TocRecord {
        TocRecord {
            name: encode_name(&self.depot_path),
            hash: self.hash,
            reserved: 0,
            size: self.size,
            zsize: self.zsize,
            page_offset: self.page_offset,
            date: self.date,
            time: self.time,
            padding: [0; 16],
            crc: self.crc,
            compression: self.compression,
        }
    }

    /// Write the fixed-width ToC record
    pub fn serialize_record<W: Write + Seek>(&self, writer: &mut W) -> BundleResult<()> {
        self.to_record().write(writer)?;
        Ok(())
    }

    /// Copy of this entry owned by `new_owner`.
    ///
    /// The copy keeps pointing at wherever the bytes live now, so they are read
    /// lazily when the new bundle is written. Timestamps are cleared.
    pub(crate) fn reparent(&self, new_owner: ArchiveId, registry: &ArchiveRegistry) -> Self {
        let backing = if registry.existing_file(self.owner).is_some() {
            BackingStore::BackedByArchive {
                archive: self.owner,
                offset: u64::from(self.page_offset),
            }
        } else {
            self.backing.clone()
        };

        Self {
            date: 0,
            time: 0,
            owner: new_owner,
            backing,
            ..self.clone()
        }
    }

    /// Logical path
    pub fn depot_path(&self) -> &str {
        &self.depot_path
    }

    /// Content hash field
    pub const fn hash(&self) -> &[u8; 16] {
        &self.hash
    }

    /// Content hash as lowercase hex
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Uncompressed size
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Compressed size
    pub const fn zsize(&self) -> u32 {
        self.zsize
    }

    /// Byte offset of the compressed blob in the owning bundle
    pub const fn page_offset(&self) -> u32 {
        self.page_offset
    }

    /// CRC-32 of the uncompressed bytes
    pub const fn crc(&self) -> u32 {
        self.crc
    }

    /// Raw compression tag
    pub const fn compression_tag(&self) -> u32 {
        self.compression
    }

    /// Compression algorithm, if the tag is known
    pub fn compression_kind(&self) -> CompressionResult<CompressionKind> {
        CompressionKind::try_from(self.compression)
    }

    /// Packed date and time, if set
    pub const fn timestamp(&self) -> Option<PackedTimestamp> {
        PackedTimestamp::from_packed(self.date, self.time)
    }

    /// Owning bundle
    pub const fn owner(&self) -> ArchiveId {
        self.owner
    }

    /// Where the bytes come from when the owning bundle is not on disk
    pub const fn backing(&self) -> &BackingStore {
        &self.backing
    }

    /// Whether this is a `.buffer` entry
    pub fn is_buffer(&self) -> bool {
        is_buffer_path(&self.depot_path)
    }

    /// Compressed bytes as a buffer
    pub fn compressed_bytes(&self, registry: &ArchiveRegistry) -> BundleResult<Vec<u8>> {
        let bytes = access::resolve_to_vec(
            registry,
            self.owner,
            u64::from(self.page_offset),
            u64::from(self.zsize),
            &self.backing,
            &self.depot_path,
        )?;
        if bytes.len() != self.zsize as usize {
            return Err(BundleError::CorruptArchive(format!(
                "{}: expected {} compressed bytes, found {}",
                self.depot_path,
                self.zsize,
                bytes.len()
            )));
        }
        Ok(bytes)
    }

    /// Decoded content as a buffer
    pub fn extract_to_vec(&self, registry: &ArchiveRegistry) -> BundleResult<Vec<u8>> {
        let kind = self.compression_kind()?;
        let compressed = self.compressed_bytes(registry)?;
        Ok(compression::decompress(
            &compressed,
            kind,
            self.size as usize,
        )?)
    }
}

impl ArchiveEntry for BundleEntry {
    type Error = BundleError;

    fn depot_path(&self) -> &str {
        &self.depot_path
    }

    fn size(&self) -> u64 {
        u64::from(self.size)
    }

    fn zsize(&self) -> u64 {
        u64::from(self.zsize)
    }

    fn owner(&self) -> ArchiveId {
        self.owner
    }

    fn get_compressed_bytes(
        &self,
        registry: &ArchiveRegistry,
        out: &mut dyn std::io::Write,
    ) -> BundleResult<()> {
        let bytes = self.compressed_bytes(registry)?;
        out.write_all(&bytes)?;
        Ok(())
    }

    fn extract(&self, registry: &ArchiveRegistry, out: &mut dyn std::io::Write) -> BundleResult<()> {
        let data = self.extract_to_vec(registry)?;
        out.write_all(&data)?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::compression::CompressionError;
    use crate::registry::ArchiveKind;

    fn in_memory_entry(registry: &mut ArchiveRegistry, data: &[u8], tag: u32) -> BundleEntry {
        let owner = registry.register(ArchiveKind::Bundle, "blob0.bundle", None);
        let kind = CompressionKind::from_tag(tag).unwrap_or(CompressionKind::None);
        let compressed = compression::compress(data, kind).unwrap();
        BundleEntry {
            depot_path: "gameplay\\abilities\\geralt_abl.xml".to_string(),
            hash: [0; 16],
            size: data.len() as u32,
            zsize: compressed.len() as u32,
            page_offset: 4096,
            date: 0,
            time: 0,
            crc: w3pack_hash::Crc32::of(data).value(),
            compression: tag,
            owner,
            backing: BackingStore::in_memory(compressed),
        }
    }

    #[test]
    fn test_extract_in_memory_entry() {
        let mut registry = ArchiveRegistry::new();
        let data = b"<ability name=\"Geralt\"/>".repeat(20);
        let entry = in_memory_entry(&mut registry, &data, CompressionKind::ZLib.tag());

        let mut out = Vec::new();
        entry.extract(&registry, &mut out).expect("Operation should succeed");
        assert_eq!(out, data);
    }

    #[test]
    fn test_unknown_tag_fails_extraction() {
        let mut registry = ArchiveRegistry::new();
        let entry = in_memory_entry(&mut registry, b"abc", 77);

        let err = entry.extract_to_vec(&registry).unwrap_err();
        assert!(matches!(
            err,
            BundleError::Compression(CompressionError::UnsupportedCompressionKind(77))
        ));
    }

    #[test]
    fn test_record_round_trip_through_entry() {
        let mut registry = ArchiveRegistry::new();
        let entry = in_memory_entry(&mut registry, b"payload", CompressionKind::None.tag());
        let record = entry.to_record();
        let parsed = BundleEntry::from_record(&record, entry.owner());

        assert_eq!(parsed.depot_path(), entry.depot_path());
        assert_eq!(parsed.size(), entry.size());
        assert_eq!(parsed.zsize(), entry.zsize());
        assert_eq!(parsed.crc(), entry.crc());
        assert_eq!(parsed.compression_tag(), entry.compression_tag());
        assert!(parsed.timestamp().is_none());
    }

    #[test]
    fn test_reparent_keeps_in_memory_backing_and_clears_time() {
        let mut registry = ArchiveRegistry::new();
        let mut entry = in_memory_entry(&mut registry, b"payload", CompressionKind::None.tag());
        entry.date = 1;
        let merged = registry.register(ArchiveKind::Bundle, "merged", None);

        let copy = entry.reparent(merged, &registry);
        assert_eq!(copy.owner(), merged);
        assert_eq!(copy.backing(), entry.backing());
        assert!(copy.timestamp().is_none());
    }
}
