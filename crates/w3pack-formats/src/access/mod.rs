//! Where an entry's compressed bytes live
//!
//! Entries are resolved in a fixed order:
//!
//! 1. the owning archive's file, if it exists on disk, at the entry's own offset
//! 2. the entry's [`BackingStore`]: another archive at a recorded offset, or a
//!    standalone file
//! 3. bytes held in memory from construction
//!
//! If none applies the read fails with [`AccessError::MissingBackingStore`].
//! Existence is checked up front; a missing file never surfaces as an I/O error.

mod error;
pub mod mapped;

pub use error::{AccessError, AccessResult};

use crate::registry::{ArchiveId, ArchiveRegistry};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Source of an entry's bytes other than its owning archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackingStore {
    /// Inside another registered archive, starting at `offset`
    BackedByArchive {
        /// Archive holding the bytes
        archive: ArchiveId,
        /// Byte offset of the bytes in that archive
        offset: u64,
    },
    /// The leading bytes of a standalone file
    BackedByFile {
        /// File holding the bytes
        path: PathBuf,
    },
    /// Produced in memory with no file behind it
    InMemory {
        /// The bytes themselves
        bytes: Arc<[u8]>,
    },
}

impl BackingStore {
    /// Wrap an in-memory buffer
    pub fn in_memory(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::InMemory {
            bytes: bytes.into(),
        }
    }

    /// File accessor for file-backed variants whose file currently exists
    pub fn accessor(&self, registry: &ArchiveRegistry) -> Option<FileAccessor> {
        match self {
            Self::BackedByArchive { archive, offset } => registry
                .existing_file(*archive)
                .map(|path| FileAccessor::in_archive(path, *offset)),
            Self::BackedByFile { path } => {
                path.is_file().then(|| FileAccessor::standalone(path))
            }
            Self::InMemory { .. } => None,
        }
    }
}

/// A path plus the byte offset the wanted bytes start at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAccessor {
    /// Backing file
    pub path: PathBuf,
    /// Byte offset within the file
    pub offset: u64,
}

impl FileAccessor {
    /// Accessor into an archive at a byte offset
    pub fn in_archive(path: &Path, offset: u64) -> Self {
        Self {
            path: path.to_path_buf(),
            offset,
        }
    }

    /// Accessor for a whole standalone file
    pub fn standalone(path: &Path) -> Self {
        Self::in_archive(path, 0)
    }

    /// Copy `len` bytes from the accessor's position
    pub fn copy_to<W: Write + ?Sized>(&self, len: u64, out: &mut W) -> AccessResult<()> {
        mapped::copy_region(&self.path, self.offset, len, out)
    }
}

/// Copy an entry's `len` bytes into `out` following the resolution order.
///
/// `owner_offset` is the entry's offset inside its owning archive, used when
/// that archive exists on disk.
pub fn resolve<W: Write + ?Sized>(
    registry: &ArchiveRegistry,
    owner: ArchiveId,
    owner_offset: u64,
    len: u64,
    backing: &BackingStore,
    name: &str,
    out: &mut W,
) -> AccessResult<()> {
    if let Some(path) = registry.existing_file(owner) {
        return mapped::copy_region(path, owner_offset, len, out);
    }

    if let Some(accessor) = backing.accessor(registry) {
        debug!(
            "{name}: reading {len} bytes from {} at {}",
            accessor.path.display(),
            accessor.offset
        );
        return accessor.copy_to(len, out);
    }

    if let BackingStore::InMemory { bytes } = backing {
        out.write_all(bytes)?;
        return Ok(());
    }

    Err(AccessError::MissingBackingStore {
        name: name.to_string(),
    })
}

/// Whether [`resolve`] would find a source, without reading anything
pub fn is_reachable(registry: &ArchiveRegistry, owner: ArchiveId, backing: &BackingStore) -> bool {
    registry.existing_file(owner).is_some()
        || matches!(backing, BackingStore::InMemory { .. })
        || backing.accessor(registry).is_some()
}

/// [`resolve`] into a fresh buffer
pub fn resolve_to_vec(
    registry: &ArchiveRegistry,
    owner: ArchiveId,
    owner_offset: u64,
    len: u64,
    backing: &BackingStore,
    name: &str,
) -> AccessResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
    resolve(registry, owner, owner_offset, len, backing, name, &mut buf)?;
    Ok(buf)
}
