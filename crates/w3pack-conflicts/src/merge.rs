//! Merged mod writer
//!
//! Winners are split into three containers: regular bundle entries, buffer
//! bundle entries and texture cache items. Each non-empty set becomes one
//! archive in `<output>/<merged mod>/content/`, followed by a metadata store
//! describing the written bundles.
//!
//! Archive bodies are streamed from the source mods while writing, so the
//! source archives must still be on disk.

use crate::config::MergeConfig;
use crate::error::ConflictResult;
use crate::resolver::{ConflictResolver, PackedEntry};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};
use w3pack_formats::ArchiveRegistry;
use w3pack_formats::bundle::{Bundle, BundleEntry};
use w3pack_formats::metadata_store::MetadataStore;
use w3pack_formats::texture_cache::{TextureCache, TextureCacheItem};

/// Files written by [`merge`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeOutcome {
    /// Merged mod archive directory
    pub content_dir: PathBuf,
    /// Bundles written, regular before buffers
    pub bundles: Vec<PathBuf>,
    /// Texture cache written, if any texture won a conflict
    pub texture_cache: Option<PathBuf>,
    /// Metadata store written, if any bundle was written
    pub metadata_store: Option<PathBuf>,
    /// Conflicts without a winner, left out of the merged mod
    pub unresolved: Vec<String>,
}

impl MergeOutcome {
    /// Whether nothing was written
    pub fn is_empty(&self) -> bool {
        self.bundles.is_empty() && self.texture_cache.is_none()
    }
}

/// Winners split by destination container
#[derive(Debug, Default)]
struct MergeSets {
    regular: Vec<BundleEntry>,
    buffers: Vec<BundleEntry>,
    textures: Vec<TextureCacheItem>,
}

impl MergeSets {
    fn collect(resolver: &ConflictResolver) -> Self {
        let mut sets = Self::default();
        for winner in resolver.winners() {
            match &winner.entry {
                PackedEntry::Bundle(entry) if entry.is_buffer() => {
                    sets.buffers.push(entry.clone());
                }
                PackedEntry::Bundle(entry) => sets.regular.push(entry.clone()),
                PackedEntry::Texture(item) => sets.textures.push(item.clone()),
            }
            sets.buffers.extend(winner.buffers.iter().cloned());
        }
        sets
    }
}

/// Write the winners of `resolver` as the merged mod described by `config`.
///
/// Unresolved conflicts are skipped and listed in the outcome. Archive names
/// from `config.pack` that the current merge does not produce are removed
/// from the content directory, so a stale archive from an earlier merge is
/// never indexed next to the new ones.
pub fn merge(
    resolver: &ConflictResolver,
    config: &MergeConfig,
    registry: &mut ArchiveRegistry,
) -> ConflictResult<MergeOutcome> {
    let mut outcome = MergeOutcome {
        content_dir: config.merged_content_dir(),
        unresolved: resolver.unresolved().map(|c| c.path.clone()).collect(),
        ..MergeOutcome::default()
    };
    for path in &outcome.unresolved {
        warn!("No winner selected for {path}, leaving it out");
    }

    let sets = MergeSets::collect(resolver);
    debug!(
        "Merging {} regular entries, {} buffers, {} textures",
        sets.regular.len(),
        sets.buffers.len(),
        sets.textures.len()
    );
    if sets.regular.is_empty() && sets.buffers.is_empty() && sets.textures.is_empty() {
        info!("Nothing to merge");
        return Ok(outcome);
    }

    let dir = &outcome.content_dir;
    std::fs::create_dir_all(dir)?;
    remove_stale(config, &sets)?;

    let mut bundles = Vec::new();
    for entries in [&sets.regular, &sets.buffers] {
        if entries.is_empty() {
            continue;
        }
        let bundle = Bundle::build_from_entries(entries, &config.pack, registry)?;
        outcome.bundles.push(bundle.write(dir, registry)?);
        bundles.push(bundle);
    }

    if !sets.textures.is_empty() {
        let cache = TextureCache::build_from_items(&sets.textures, &config.pack, registry)?;
        outcome.texture_cache = Some(cache.write(dir, registry)?);
    }

    if !bundles.is_empty() {
        let refs: Vec<&Bundle> = bundles.iter().collect();
        let store = MetadataStore::build(&refs)?;
        outcome.metadata_store = Some(store.write(dir, &config.pack)?);
    }

    info!(
        "Merged {} bundles{} into {}",
        outcome.bundles.len(),
        if outcome.texture_cache.is_some() {
            " and a texture cache"
        } else {
            ""
        },
        dir.display()
    );
    Ok(outcome)
}

fn remove_stale(config: &MergeConfig, sets: &MergeSets) -> ConflictResult<()> {
    let pack = &config.pack;
    let produced = [
        (pack.blob_bundle_name.as_str(), !sets.regular.is_empty()),
        (pack.buffer_bundle_name.as_str(), !sets.buffers.is_empty()),
        (pack.texture_cache_name.as_str(), !sets.textures.is_empty()),
        (
            pack.metadata_store_name.as_str(),
            !sets.regular.is_empty() || !sets.buffers.is_empty(),
        ),
    ];

    let dir = config.merged_content_dir();
    for (name, written) in produced {
        let path = dir.join(name);
        if !written && path.is_file() {
            debug!("Removing stale {}", path.display());
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::scan::ModScanner;
    use pretty_assertions::assert_eq;
    use w3pack_formats::bundle::LooseFile;
    use w3pack_formats::PackConfig;

    fn write_mod(mods_dir: &std::path::Path, mod_name: &str, files: &[(&str, &str)]) {
        let loose_dir = tempfile::tempdir().unwrap();
        let loose: Vec<_> = files
            .iter()
            .enumerate()
            .map(|(i, (depot_path, contents))| {
                let path = loose_dir.path().join(format!("{i}.bin"));
                std::fs::write(&path, contents).unwrap();
                LooseFile::new(*depot_path, path)
            })
            .collect();
        let (regular, buffers): (Vec<_>, Vec<_>) = loose
            .into_iter()
            .partition(|f| !w3pack_formats::entry::is_buffer_path(&f.depot_path));

        let content = mods_dir.join(mod_name).join("content");
        std::fs::create_dir_all(&content).unwrap();
        let mut registry = ArchiveRegistry::new();
        for set in [regular, buffers] {
            if !set.is_empty() {
                Bundle::build_from_files(&set, &PackConfig::default(), &mut registry)
                    .unwrap()
                    .write(&content, &mut registry)
                    .unwrap();
            }
        }
    }

    #[test]
    fn test_merge_writes_buffers_separately() {
        let mods = tempfile::tempdir().unwrap();
        write_mod(
            mods.path(),
            "modA",
            &[
                ("env\\tree.w2mesh", "mesh from a"),
                ("env\\tree.w2mesh.1.buffer", "buffer from a"),
            ],
        );
        write_mod(
            mods.path(),
            "modB",
            &[
                ("env\\tree.w2mesh", "mesh from b"),
                ("env\\tree.w2mesh.1.buffer", "buffer from b"),
            ],
        );

        let config = MergeConfig::new(mods.path());
        let mut registry = ArchiveRegistry::new();
        let report = ModScanner::new(&config).scan(&mut registry).unwrap();
        let mut resolver = ConflictResolver::from_scan(&report);
        resolver.select_mod("env\\tree.w2mesh", "modB").unwrap();

        let outcome = merge(&resolver, &config, &mut registry).expect("Operation should succeed");
        assert_eq!(outcome.bundles.len(), 2);
        assert!(outcome.texture_cache.is_none());
        assert!(outcome.metadata_store.is_some());
        assert!(outcome.unresolved.is_empty());

        let mut check = ArchiveRegistry::new();
        let blob = Bundle::read(&outcome.bundles[0], &mut check).unwrap();
        let buffers = Bundle::read(&outcome.bundles[1], &mut check).unwrap();
        assert!(!blob.is_buffer_bundle());
        assert!(buffers.is_buffer_bundle());

        let mesh = blob.entry("env\\tree.w2mesh").unwrap();
        assert_eq!(mesh.extract_to_vec(&check).unwrap(), b"mesh from b");
        let buffer = buffers.entry("env\\tree.w2mesh.1.buffer").unwrap();
        assert_eq!(buffer.extract_to_vec(&check).unwrap(), b"buffer from b");

        let store = MetadataStore::read(outcome.metadata_store.unwrap()).unwrap();
        assert_eq!(store.buffers().len(), 1);
    }

    #[test]
    fn test_merge_without_winners_writes_nothing() {
        let mods = tempfile::tempdir().unwrap();
        write_mod(mods.path(), "modA", &[("f.xml", "a")]);
        write_mod(mods.path(), "modB", &[("f.xml", "b")]);

        let config = MergeConfig::new(mods.path());
        let mut registry = ArchiveRegistry::new();
        let report = ModScanner::new(&config).scan(&mut registry).unwrap();
        let resolver = ConflictResolver::from_scan(&report);

        let outcome = merge(&resolver, &config, &mut registry).expect("Operation should succeed");
        assert!(outcome.is_empty());
        assert_eq!(outcome.unresolved, vec!["f.xml".to_string()]);
        assert!(!config.merged_content_dir().exists());
    }

    #[test]
    fn test_merge_removes_stale_buffer_bundle() {
        let mods = tempfile::tempdir().unwrap();
        write_mod(mods.path(), "modA", &[("f.xml", "a")]);
        write_mod(mods.path(), "modB", &[("f.xml", "b")]);

        let config = MergeConfig::new(mods.path());
        let stale = config.merged_content_dir().join("buffers0.bundle");
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, b"old").unwrap();

        let mut registry = ArchiveRegistry::new();
        let report = ModScanner::new(&config).scan(&mut registry).unwrap();
        let mut resolver = ConflictResolver::from_scan(&report);
        resolver.select("f.xml", 0).unwrap();

        let outcome = merge(&resolver, &config, &mut registry).expect("Operation should succeed");
        assert_eq!(outcome.bundles.len(), 1);
        assert!(!stale.exists());

        let mut check = ArchiveRegistry::new();
        let blob = Bundle::read(&outcome.bundles[0], &mut check).unwrap();
        assert_eq!(blob.len(), 1);
        assert_eq!(blob.entries()[0].size(), 1);
    }
}
