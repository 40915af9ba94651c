//! Arena of archives known to the current session
//!
//! Entries refer to their owning archive through an [`ArchiveId`] instead of a
//! reference, so archives and their entries can be moved and cloned freely.
//! The registry is the single place that knows where an archive lives on disk.

use std::fmt;
use std::path::{Path, PathBuf};

/// Handle to an archive registered in an [`ArchiveRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchiveId(usize);

impl ArchiveId {
    /// Position of the archive in its registry
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ArchiveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "archive#{}", self.0)
    }
}

/// Container type of a registered archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveKind {
    /// `*.bundle`
    Bundle,
    /// `texture.cache`
    TextureCache,
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bundle => f.write_str("bundle"),
            Self::TextureCache => f.write_str("texture cache"),
        }
    }
}

/// One archive slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredArchive {
    /// Container type
    pub kind: ArchiveKind,
    /// File name (e.g. `blob0.bundle`)
    pub name: String,
    /// Backing file, once the archive exists on disk
    pub path: Option<PathBuf>,
}

/// Arena of archives
#[derive(Debug, Clone, Default)]
pub struct ArchiveRegistry {
    archives: Vec<RegisteredArchive>,
}

impl ArchiveRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an archive and return its handle
    pub fn register(
        &mut self,
        kind: ArchiveKind,
        name: impl Into<String>,
        path: Option<PathBuf>,
    ) -> ArchiveId {
        let id = ArchiveId(self.archives.len());
        self.archives.push(RegisteredArchive {
            kind,
            name: name.into(),
            path,
        });
        id
    }

    /// Record the file an archive was written to
    pub fn attach_path(&mut self, id: ArchiveId, path: PathBuf) {
        if let Some(slot) = self.archives.get_mut(id.0) {
            slot.path = Some(path);
        }
    }

    /// Look up an archive
    pub fn get(&self, id: ArchiveId) -> Option<&RegisteredArchive> {
        self.archives.get(id.0)
    }

    /// Backing file path, whether or not it currently exists
    pub fn path(&self, id: ArchiveId) -> Option<&Path> {
        self.get(id).and_then(|slot| slot.path.as_deref())
    }

    /// Backing file path, only if it is present on disk right now
    pub fn existing_file(&self, id: ArchiveId) -> Option<&Path> {
        self.path(id).filter(|path| path.is_file())
    }

    /// Number of registered archives
    pub fn len(&self) -> usize {
        self.archives.len()
    }

    /// Whether nothing has been registered
    pub fn is_empty(&self) -> bool {
        self.archives.is_empty()
    }

    /// Iterate over all archives with their handles
    pub fn iter(&self) -> impl Iterator<Item = (ArchiveId, &RegisteredArchive)> {
        self.archives
            .iter()
            .enumerate()
            .map(|(index, slot)| (ArchiveId(index), slot))
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_register_assigns_sequential_ids() {
        let mut registry = ArchiveRegistry::new();
        let a = registry.register(ArchiveKind::Bundle, "blob0.bundle", None);
        let b = registry.register(ArchiveKind::TextureCache, "texture.cache", None);
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get(b).unwrap().kind, ArchiveKind::TextureCache);
    }

    #[test]
    fn test_existing_file_requires_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob0.bundle");

        let mut registry = ArchiveRegistry::new();
        let id = registry.register(ArchiveKind::Bundle, "blob0.bundle", None);
        assert!(registry.existing_file(id).is_none());

        registry.attach_path(id, path.clone());
        assert_eq!(registry.path(id), Some(path.as_path()));
        assert!(registry.existing_file(id).is_none());

        std::fs::write(&path, b"x").unwrap();
        assert_eq!(registry.existing_file(id), Some(path.as_path()));
    }
}
