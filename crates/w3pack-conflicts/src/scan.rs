//! Mod directory scanning
//!
//! Every immediate child directory of the mods directory is one mod. Under each
//! mod, every `*.bundle` and texture cache file is opened. A file that fails to
//! parse is logged and skipped; it never aborts the scan.

use crate::config::MergeConfig;
use crate::error::{ConflictError, ConflictResult};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};
use w3pack_formats::ArchiveRegistry;
use w3pack_formats::bundle::Bundle;
use w3pack_formats::texture_cache::TextureCache;

/// Archives found in one mod
#[derive(Debug, Clone)]
pub struct ModArchives {
    /// Mod directory name
    pub name: String,
    /// Mod directory
    pub dir: PathBuf,
    /// Bundles in walk order
    pub bundles: Vec<Bundle>,
    /// Texture caches in walk order
    pub caches: Vec<TextureCache>,
}

impl ModArchives {
    /// Whether no archive was found
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty() && self.caches.is_empty()
    }
}

/// An archive that could not be opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedArchive {
    /// Archive file
    pub path: PathBuf,
    /// Error message
    pub reason: String,
}

/// Result of a scan
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Mods in scan order
    pub mods: Vec<ModArchives>,
    /// Archives that failed to open
    pub skipped: Vec<SkippedArchive>,
    /// Whether the scan stopped early on the cancel flag
    pub cancelled: bool,
}

impl ScanReport {
    /// Number of bundles opened
    pub fn bundle_count(&self) -> usize {
        self.mods.iter().map(|m| m.bundles.len()).sum()
    }

    /// Number of texture caches opened
    pub fn cache_count(&self) -> usize {
        self.mods.iter().map(|m| m.caches.len()).sum()
    }
}

/// Archive file kinds the scanner picks up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveFile {
    Bundle,
    TextureCache,
}

/// Opens the archives of every mod under a mods directory
#[derive(Debug)]
pub struct ModScanner<'a> {
    config: &'a MergeConfig,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> ModScanner<'a> {
    /// Scanner for `config.mods_dir`
    pub const fn new(config: &'a MergeConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Stop between archives once `flag` is set
    #[must_use]
    pub const fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Mod directories, sorted by name ignoring case, without the merged mod
    pub fn mod_dirs(&self) -> ConflictResult<Vec<(String, PathBuf)>> {
        let root = &self.config.mods_dir;
        if !root.is_dir() {
            return Err(ConflictError::ModsDirNotFound(root.clone()));
        }

        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if self.config.is_merged_mod(&name) {
                debug!("Skipping merged mod {name}");
                continue;
            }
            dirs.push((name, entry.path()));
        }

        dirs.sort_by_cached_key(|(name, _)| name.to_lowercase());
        Ok(dirs)
    }

    /// Open every archive of every mod and register it in `registry`
    pub fn scan(&self, registry: &mut ArchiveRegistry) -> ConflictResult<ScanReport> {
        let mut report = ScanReport::default();

        'mods: for (name, dir) in self.mod_dirs()? {
            let mut archives = ModArchives {
                name,
                dir,
                bundles: Vec::new(),
                caches: Vec::new(),
            };

            for (path, kind) in self.archive_files(&archives.dir) {
                if self.is_cancelled() {
                    info!("Scan cancelled");
                    report.cancelled = true;
                    report.mods.push(archives);
                    break 'mods;
                }

                let opened = match kind {
                    ArchiveFile::Bundle => Bundle::read(&path, registry)
                        .map(|bundle| archives.bundles.push(bundle))
                        .map_err(|e| e.to_string()),
                    ArchiveFile::TextureCache => TextureCache::read(&path, registry)
                        .map(|cache| archives.caches.push(cache))
                        .map_err(|e| e.to_string()),
                };

                if let Err(reason) = opened {
                    warn!("Skipping {}: {reason}", path.display());
                    report.skipped.push(SkippedArchive { path, reason });
                }
            }

            debug!(
                "{}: {} bundles, {} texture caches",
                archives.name,
                archives.bundles.len(),
                archives.caches.len()
            );
            report.mods.push(archives);
        }

        info!(
            "Scanned {} mods: {} bundles, {} texture caches, {} skipped",
            report.mods.len(),
            report.bundle_count(),
            report.cache_count(),
            report.skipped.len()
        );
        Ok(report)
    }

    /// Archive files below a mod directory in file-name order
    fn archive_files(&self, mod_dir: &Path) -> Vec<(PathBuf, ArchiveFile)> {
        let cache_name = &self.config.pack.texture_cache_name;
        let mut files = Vec::new();

        for entry in walkdir::WalkDir::new(mod_dir).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Cannot walk {}: {e}", mod_dir.display());
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let file_name = entry.file_name().to_string_lossy();
            let kind = if file_name.eq_ignore_ascii_case(cache_name) {
                ArchiveFile::TextureCache
            } else if entry
                .path()
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("bundle"))
            {
                ArchiveFile::Bundle
            } else {
                continue;
            };
            files.push((entry.into_path(), kind));
        }

        files
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}
