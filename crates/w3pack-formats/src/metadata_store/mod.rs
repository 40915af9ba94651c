//! Metadata store
//!
//! Wire layout, all integers little-endian:
//!
//! ```text
//! magic 03 'V' 'T' 'M' | version u32 | max size in bundle u32 | max size in memory u32
//! VLQ size + string table
//! VLQ count + file info records     (record 0 is empty)
//! VLQ count + file entry records    (record 0 is empty)
//! VLQ count + bundle info records   (record 0 is empty)
//! VLQ count + buffer file ids (u32)
//! VLQ count + dir init records      (record 0 is the root)
//! VLQ count + file init records
//! VLQ count + hash records          (ascending by hash)
//! ```

mod builder;
mod error;
pub mod records;
mod store;
pub mod vlq;

pub use error::{MetadataError, MetadataResult};
pub use records::{
    BundleInfoRecord, DirInitRecord, FileEntryRecord, FileInfoRecord, FileInitRecord, HashRecord,
    TableRecord,
};
pub use store::{METADATA_MAGIC, METADATA_VERSION, MetadataStore};
