#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! End-to-end merge scenarios
//!
//! Mods are written as real bundles and texture caches under a temporary mods
//! directory, scanned, resolved and merged. The merged archives are read back
//! from disk and checked against the metadata store written next to them.

use pretty_assertions::assert_eq;
use std::path::Path;
use w3pack_conflicts::{
    ConflictResolver, MergeConfig, ModScanner, Selections, load_selections, merge,
    save_selections,
};
use w3pack_formats::bundle::{Bundle, LooseFile};
use w3pack_formats::metadata_store::MetadataStore;
use w3pack_formats::texture_cache::TextureCache;
use w3pack_formats::{ALIGNMENT, ArchiveRegistry, PackConfig};

/// Write a mod with one bundle holding `files` and, if given, a texture cache
fn write_mod(
    mods_dir: &Path,
    name: &str,
    files: &[(&str, Vec<u8>)],
    textures: &[(&str, Vec<u8>)],
) {
    let loose_dir = tempfile::tempdir().unwrap();
    let loose = |set: &[(&str, Vec<u8>)], prefix: &str| -> Vec<LooseFile> {
        set.iter()
            .enumerate()
            .map(|(i, (depot_path, bytes))| {
                let path = loose_dir.path().join(format!("{prefix}{i}.bin"));
                std::fs::write(&path, bytes).unwrap();
                LooseFile::new(*depot_path, path)
            })
            .collect()
    };

    let content = mods_dir.join(name).join("content");
    std::fs::create_dir_all(&content).unwrap();
    let config = PackConfig::default();
    let mut registry = ArchiveRegistry::new();

    if !files.is_empty() {
        Bundle::build_from_files(&loose(files, "f"), &config, &mut registry)
            .unwrap()
            .write(&content, &mut registry)
            .unwrap();
    }
    if !textures.is_empty() {
        TextureCache::build_from_files(&loose(textures, "t"), &config, &mut registry)
            .unwrap()
            .write(&content, &mut registry)
            .unwrap();
    }
}

fn scene(mod_index: u8) -> Vec<u8> {
    (0..6000u32)
        .map(|i| (i % 251) as u8 ^ mod_index)
        .collect()
}

#[test]
fn three_mods_second_wins() {
    let mods = tempfile::tempdir().unwrap();
    for (index, name) in ["modAlpha", "modBeta", "modGamma"].iter().enumerate() {
        write_mod(
            mods.path(),
            name,
            &[("quests\\quest01.w2scene", scene(index as u8))],
            &[],
        );
    }

    let config = MergeConfig::new(mods.path());
    let mut registry = ArchiveRegistry::new();
    let report = ModScanner::new(&config)
        .scan(&mut registry)
        .expect("Operation should succeed");
    assert_eq!(report.bundle_count(), 3);

    let mut resolver = ConflictResolver::from_scan(&report);
    let conflict = resolver.conflict("quests\\quest01.w2scene").unwrap();
    assert_eq!(conflict.candidates.len(), 3);
    assert_eq!(conflict.category, "quests");

    resolver
        .select("quests\\quest01.w2scene", 1)
        .expect("Operation should succeed");
    let outcome = merge(&resolver, &config, &mut registry).expect("Operation should succeed");
    assert_eq!(outcome.bundles.len(), 1);
    assert!(outcome.unresolved.is_empty());

    let mut check = ArchiveRegistry::new();
    let merged = Bundle::read(&outcome.bundles[0], &mut check).unwrap();
    assert_eq!(merged.len(), 1);

    let entry = &merged.entries()[0];
    assert_eq!(entry.depot_path(), "quests\\quest01.w2scene");
    assert_eq!(u64::from(entry.page_offset()) % ALIGNMENT, 0);
    assert_eq!(entry.extract_to_vec(&check).unwrap(), scene(1));

    let store = MetadataStore::read(outcome.metadata_store.as_ref().unwrap()).unwrap();
    assert_eq!(store.file_entries().len(), 1);
    let file_entry = store.file_entry("quests\\quest01.w2scene").unwrap();
    assert_eq!(file_entry.offset, entry.page_offset());
    assert_eq!(file_entry.size_in_bundle, entry.zsize());
    assert_eq!(
        store.bundle_name(file_entry.bundle_id).as_deref(),
        Some("blob0.bundle")
    );
}

#[test]
fn merged_mod_is_not_scanned_again() {
    let mods = tempfile::tempdir().unwrap();
    write_mod(mods.path(), "modA", &[("a\\f.xml", b"<a/>".to_vec())], &[]);
    write_mod(mods.path(), "modB", &[("a\\f.xml", b"<b/>".to_vec())], &[]);

    let config = MergeConfig::new(mods.path());
    let mut registry = ArchiveRegistry::new();
    let report = ModScanner::new(&config).scan(&mut registry).unwrap();
    let mut resolver = ConflictResolver::from_scan(&report);
    resolver.select_mod("a\\f.xml", "modB").unwrap();
    merge(&resolver, &config, &mut registry).unwrap();

    let mut rescan_registry = ArchiveRegistry::new();
    let rescan = ModScanner::new(&config).scan(&mut rescan_registry).unwrap();
    let names: Vec<_> = rescan.mods.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["modA", "modB"]);
}

#[test]
fn selections_file_drives_merge() {
    let mods = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_mod(
        mods.path(),
        "modA",
        &[
            ("gameplay\\items\\swords.xml", b"<sword a/>".repeat(50)),
            ("gameplay\\items\\armor.xml", b"<armor a/>".repeat(50)),
        ],
        &[],
    );
    write_mod(
        mods.path(),
        "modB",
        &[
            ("gameplay\\items\\swords.xml", b"<sword b/>".repeat(50)),
            ("gameplay\\items\\armor.xml", b"<armor b/>".repeat(50)),
        ],
        &[],
    );

    let mut selections = Selections::new();
    selections.insert("gameplay\\items\\swords.xml".into(), "modB".into());
    let selections_path = out.path().join("selections.json");
    save_selections(&selections_path, &selections).unwrap();

    let config = MergeConfig::new(mods.path()).with_output_dir(out.path());
    let mut registry = ArchiveRegistry::new();
    let report = ModScanner::new(&config).scan(&mut registry).unwrap();
    let mut resolver = ConflictResolver::from_scan(&report);
    resolver
        .apply_selections(&load_selections(&selections_path).unwrap())
        .unwrap();

    let outcome = merge(&resolver, &config, &mut registry).unwrap();
    assert_eq!(outcome.unresolved, vec!["gameplay\\items\\armor.xml".to_string()]);
    assert!(outcome.content_dir.starts_with(out.path()));

    let mut check = ArchiveRegistry::new();
    let merged = Bundle::read(&outcome.bundles[0], &mut check).unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(
        merged.entries()[0].extract_to_vec(&check).unwrap(),
        b"<sword b/>".repeat(50)
    );
}

#[test]
fn texture_conflict_goes_to_merged_cache() {
    let mods = tempfile::tempdir().unwrap();
    let texture = |seed: u8| -> Vec<u8> {
        (0..4096u32)
            .map(|i| (i as u8).wrapping_mul(seed))
            .collect()
    };

    write_mod(
        mods.path(),
        "modHdTextures",
        &[("readme.txt", b"hd".to_vec())],
        &[("environment\\textures\\rock.xbm", texture(3))],
    );
    write_mod(
        mods.path(),
        "modLoreTextures",
        &[],
        &[("Environment\\Textures\\Rock.xbm", texture(7))],
    );

    let config = MergeConfig::new(mods.path());
    let mut registry = ArchiveRegistry::new();
    let report = ModScanner::new(&config).scan(&mut registry).unwrap();
    assert_eq!(report.cache_count(), 2);

    let mut resolver = ConflictResolver::from_scan(&report);
    assert_eq!(resolver.conflicts().count(), 1);
    resolver
        .select_mod("environment\\textures\\rock.xbm", "modLoreTextures")
        .unwrap();

    let outcome = merge(&resolver, &config, &mut registry).unwrap();
    assert!(outcome.bundles.is_empty());
    assert!(outcome.metadata_store.is_none());

    let mut check = ArchiveRegistry::new();
    let cache = TextureCache::read(outcome.texture_cache.unwrap(), &mut check).unwrap();
    assert_eq!(cache.len(), 1);
    let item = &cache.items()[0];
    assert_eq!(item.depot_path(), "Environment\\Textures\\Rock.xbm");
    assert_eq!(item.page_offset(), 0);
    assert_eq!(item.size(), 4096);
}
