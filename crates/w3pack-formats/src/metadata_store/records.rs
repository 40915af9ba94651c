//! Fixed-size records of the metadata store tables

use binrw::{BinRead, BinWrite};

/// A record type stored in a VLQ-counted table
pub trait TableRecord:
    Sized + Default + for<'a> BinRead<Args<'a> = ()> + for<'a> BinWrite<Args<'a> = ()>
{
    /// Serialized size in bytes
    const SIZE: usize;
    /// Table name for diagnostics
    const TABLE: &'static str;
}

/// Per-file information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BinRead, BinWrite)]
#[brw(little)]
pub struct FileInfoRecord {
    /// String table offset of the full depot path
    pub path_offset: u32,
    /// Unused path hash
    pub path_hash: u32,
    /// Compressed size
    pub size_in_bundle: u32,
    /// Uncompressed size
    pub size_in_memory: u32,
    /// 1-based index of the first file-entry record
    pub first_entry: u32,
    /// Compression tag
    pub compression: u32,
    /// Position of the first linked buffer in the buffer list
    pub buffer_id: u32,
    /// 1 when `buffer_id` is meaningful
    pub has_buffer: u32,
}

impl TableRecord for FileInfoRecord {
    const SIZE: usize = 32;
    const TABLE: &'static str = "file info";
}

/// Where one file lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BinRead, BinWrite)]
#[brw(little)]
pub struct FileEntryRecord {
    /// 1-based file id
    pub file_id: u32,
    /// 1-based bundle id
    pub bundle_id: u32,
    /// Byte offset in the bundle
    pub offset: u32,
    /// Compressed size
    pub size_in_bundle: u32,
    /// Next entry for the same file, 0 for none
    pub next_entry: u32,
}

impl TableRecord for FileEntryRecord {
    const SIZE: usize = 20;
    const TABLE: &'static str = "file entry";
}

/// Per-bundle summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BinRead, BinWrite)]
#[brw(little)]
pub struct BundleInfoRecord {
    /// String table offset of the bundle name
    pub name_offset: u32,
    /// 1-based file-entry index of the bundle's first file
    pub first_file_entry: u32,
    /// ToC entries in the bundle
    pub num_entries: u32,
    /// Body size
    pub data_block_size: u32,
    /// Body start
    pub data_block_offset: u32,
    /// Always 0
    pub burst_data_block_size: u32,
}

impl TableRecord for BundleInfoRecord {
    const SIZE: usize = 24;
    const TABLE: &'static str = "bundle info";
}

/// Directory node; record 0 is the root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BinRead, BinWrite)]
#[brw(little)]
pub struct DirInitRecord {
    /// String table offset of the component name
    pub name_offset: u32,
    /// Parent directory id, 0 for the root
    pub parent_id: u32,
}

impl TableRecord for DirInitRecord {
    const SIZE: usize = 8;
    const TABLE: &'static str = "dir init";
}

/// Leaf file node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BinRead, BinWrite)]
#[brw(little)]
pub struct FileInitRecord {
    /// 1-based file id
    pub file_id: u32,
    /// Containing directory id
    pub dir_id: u32,
    /// String table offset of the leaf name
    pub name_offset: u32,
}

impl TableRecord for FileInitRecord {
    const SIZE: usize = 12;
    const TABLE: &'static str = "file init";
}

/// Path hash to file id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, BinRead, BinWrite)]
#[brw(little)]
pub struct HashRecord {
    /// FNV-1a 64 of the full depot path
    pub hash: u64,
    /// 1-based file id
    pub file_id: u64,
}

impl TableRecord for HashRecord {
    const SIZE: usize = 16;
    const TABLE: &'static str = "hash";
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use binrw::io::Cursor;

    fn encoded_len<T: TableRecord>(record: &T) -> usize {
        let mut cursor = Cursor::new(Vec::new());
        record.write_le(&mut cursor).expect("Operation should succeed");
        cursor.into_inner().len()
    }

    #[test]
    fn test_record_sizes() {
        assert_eq!(encoded_len(&FileInfoRecord::default()), FileInfoRecord::SIZE);
        assert_eq!(encoded_len(&FileEntryRecord::default()), FileEntryRecord::SIZE);
        assert_eq!(encoded_len(&BundleInfoRecord::default()), BundleInfoRecord::SIZE);
        assert_eq!(encoded_len(&DirInitRecord::default()), DirInitRecord::SIZE);
        assert_eq!(encoded_len(&FileInitRecord::default()), FileInitRecord::SIZE);
        assert_eq!(encoded_len(&HashRecord::default()), HashRecord::SIZE);
    }

    #[test]
    fn test_hash_record_layout() {
        let record = HashRecord {
            hash: 0x1122_3344_5566_7788,
            file_id: 3,
        };
        let mut cursor = Cursor::new(Vec::new());
        record.write_le(&mut cursor).unwrap();
        let bytes = cursor.into_inner();
        assert_eq!(&bytes[..8], &0x1122_3344_5566_7788u64.to_le_bytes());
        assert_eq!(&bytes[8..], &3u64.to_le_bytes());
    }
}
