//! Loose files waiting to be packed

use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Separator used in depot paths built from disk paths
pub const DEPOT_SEPARATOR: char = '\\';

/// A file on disk and the depot path it will be packed under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LooseFile {
    /// Depot path inside the archive
    pub depot_path: String,
    /// File on disk
    pub path: PathBuf,
}

impl LooseFile {
    /// Pair a depot path with a disk path
    pub fn new(depot_path: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            depot_path: depot_path.into(),
            path: path.into(),
        }
    }

    /// Every regular file under `root`, with depot paths relative to `root`.
    ///
    /// Results are sorted by depot path.
    pub fn collect_dir(root: impl AsRef<Path>) -> io::Result<Vec<Self>> {
        let root = root.as_ref();
        let mut files = Vec::new();

        for dir_entry in WalkDir::new(root).sort_by_file_name() {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type().is_file() {
                continue;
            }
            let relative = dir_entry
                .path()
                .strip_prefix(root)
                .map_err(|e| io::Error::other(e.to_string()))?;
            files.push(Self::new(depot_path_of(relative), dir_entry.path()));
        }

        files.sort_by(|a, b| a.depot_path.cmp(&b.depot_path));
        Ok(files)
    }
}

/// Depot path for a relative disk path
pub fn depot_path_of(relative: &Path) -> String {
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join(&DEPOT_SEPARATOR.to_string())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_dir_builds_backslash_paths() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("characters").join("models");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("geralt.w2ent"), b"ent").unwrap();
        std::fs::write(dir.path().join("texture.dds"), b"dds").unwrap();

        let files = LooseFile::collect_dir(dir.path()).expect("Operation should succeed");
        let paths: Vec<_> = files.iter().map(|f| f.depot_path.as_str()).collect();
        assert_eq!(paths, ["characters\\models\\geralt.w2ent", "texture.dds"]);
        assert!(files[1].path.ends_with("texture.dds"));
    }
}
