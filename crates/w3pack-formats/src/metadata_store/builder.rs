//! Building the index from a closed set of bundles
//!
//! The string table is laid out first so every offset is fixed before any
//! record refers to it:
//!
//! ```text
//! \0 | bundle name | paths of that bundle ... | ... | \0 | dir names ... | leaf names ...
//! ```

use super::error::{MetadataError, MetadataResult};
use super::records::{
    BundleInfoRecord, DirInitRecord, FileEntryRecord, FileInfoRecord, FileInitRecord, HashRecord,
};
use super::store::{METADATA_VERSION, MetadataStore};
use crate::bundle::{Bundle, BundleEntry};
use crate::entry::{buffer_owner, depot_key, path_components};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};
use w3pack_hash::Fnv1a64;

/// Append-only NUL-terminated string blob
#[derive(Debug)]
struct StringTable {
    bytes: Vec<u8>,
}

impl StringTable {
    fn new() -> Self {
        Self { bytes: vec![0] }
    }

    fn push(&mut self, value: &str) -> MetadataResult<u32> {
        let offset = to_u32(self.bytes.len())?;
        self.bytes.extend_from_slice(value.as_bytes());
        self.bytes.push(0);
        Ok(offset)
    }

    fn push_separator(&mut self) -> MetadataResult<u32> {
        let offset = to_u32(self.bytes.len())?;
        self.bytes.push(0);
        Ok(offset)
    }
}

/// Distinct names in first-seen order
#[derive(Debug, Default)]
struct NameSet<'a> {
    order: Vec<&'a str>,
    positions: HashMap<&'a str, usize>,
}

impl<'a> NameSet<'a> {
    /// Position of `name` in first-seen order
    fn insert(&mut self, name: &'a str) -> usize {
        *self.positions.entry(name).or_insert_with(|| {
            self.order.push(name);
            self.order.len() - 1
        })
    }

    /// String table offsets, indexed by the positions `insert` returned
    fn push_all(&self, strings: &mut StringTable) -> MetadataResult<Vec<u32>> {
        self.order.iter().map(|name| strings.push(name)).collect()
    }
}

/// A unique file and the bundle it was taken from
struct IndexedFile<'a> {
    bundle_index: usize,
    entry: &'a BundleEntry,
    path_offset: u32,
}

/// A non-buffer file placed in the directory tree
struct TreeLeaf {
    file_id: u32,
    dir_id: u32,
    name: usize,
}

/// Directory node before its name offset is known
struct TreeDir {
    name: usize,
    parent_id: u32,
}

pub(super) fn build(bundles: &[&Bundle]) -> MetadataResult<MetadataStore> {
    let mut strings = StringTable::new();

    // Phase 1: bundle names and unique paths, in bundle order
    let mut bundle_name_offsets = Vec::with_capacity(bundles.len());
    let mut files: Vec<IndexedFile<'_>> = Vec::new();
    let mut seen_paths = HashSet::new();
    for (bundle_index, bundle) in bundles.iter().enumerate() {
        bundle_name_offsets.push(strings.push(bundle.name())?);
        for entry in bundle.entries() {
            if !seen_paths.insert(depot_key(entry.depot_path())) {
                warn!(
                    "{}: {} is already indexed from an earlier bundle, skipping",
                    bundle.name(),
                    entry.depot_path()
                );
                continue;
            }
            files.push(IndexedFile {
                bundle_index,
                entry,
                path_offset: strings.push(entry.depot_path())?,
            });
        }
    }

    // Directory tree over non-buffer files; names are appended after a separator
    let mut dirs: Vec<TreeDir> = Vec::new();
    let mut dir_ids: HashMap<String, u32> = HashMap::new();
    let mut dir_names = NameSet::default();
    let mut leaf_names = NameSet::default();
    let mut leaves = Vec::new();

    for (index, file) in files.iter().enumerate() {
        if file.entry.is_buffer() {
            continue;
        }
        let components: Vec<&str> = path_components(file.entry.depot_path()).collect();
        let Some((&leaf, parents)) = components.split_last() else {
            warn!("empty depot path in bundle {}", bundles[file.bundle_index].name());
            continue;
        };

        let mut parent_id = 0;
        let mut prefix = String::new();
        for &component in parents {
            if !prefix.is_empty() {
                prefix.push('\\');
            }
            prefix.push_str(component);

            parent_id = if let Some(id) = dir_ids.get(&prefix) {
                *id
            } else {
                dirs.push(TreeDir {
                    name: dir_names.insert(component),
                    parent_id,
                });
                let id = to_u32(dirs.len())?;
                dir_ids.insert(prefix.clone(), id);
                id
            };
        }

        leaves.push(TreeLeaf {
            file_id: to_u32(index + 1)?,
            dir_id: parent_id,
            name: leaf_names.insert(leaf),
        });
    }

    let root_name = strings.push_separator()?;
    let dir_offsets = dir_names.push_all(&mut strings)?;
    let leaf_offsets = leaf_names.push_all(&mut strings)?;

    // Phase 2: hash table, sorted by hash
    let mut hashes = Vec::with_capacity(leaves.len());
    for (index, file) in files.iter().enumerate() {
        if !file.entry.is_buffer() {
            hashes.push(HashRecord {
                hash: Fnv1a64::hash_path(file.entry.depot_path()),
                file_id: u64::from(to_u32(index + 1)?),
            });
        }
    }
    hashes.sort_by(|a, b| a.hash.cmp(&b.hash).then(a.file_id.cmp(&b.file_id)));

    // Phase 3: directory chain, root first
    let mut dir_inits = Vec::with_capacity(dirs.len() + 1);
    dir_inits.push(DirInitRecord {
        name_offset: root_name,
        parent_id: 0,
    });
    for dir in &dirs {
        dir_inits.push(DirInitRecord {
            name_offset: dir_offsets[dir.name],
            parent_id: dir.parent_id,
        });
    }

    // Phase 4: file chain
    let file_inits = leaves
        .iter()
        .map(|leaf| FileInitRecord {
            file_id: leaf.file_id,
            dir_id: leaf.dir_id,
            name_offset: leaf_offsets[leaf.name],
        })
        .collect();

    // Buffers: flat list of 1-based file ids; owners link to their lowest-numbered buffer
    let mut buffers = Vec::new();
    let mut owner_links: HashMap<&str, (u32, u32)> = HashMap::new();
    for (index, file) in files.iter().enumerate() {
        if !file.entry.is_buffer() {
            continue;
        }
        let position = to_u32(buffers.len())?;
        buffers.push(to_u32(index + 1)?);
        if let Some((owner, number)) = buffer_owner(file.entry.depot_path()) {
            owner_links
                .entry(owner)
                .and_modify(|link| {
                    if number < link.0 {
                        *link = (number, position);
                    }
                })
                .or_insert((number, position));
        }
    }

    // Phase 5: per-file info and entries
    let mut file_infos = Vec::with_capacity(files.len());
    let mut file_entries = Vec::with_capacity(files.len());
    for (index, file) in files.iter().enumerate() {
        let file_id = to_u32(index + 1)?;
        let (buffer_id, has_buffer) = owner_links
            .get(file.entry.depot_path())
            .map_or((0, 0), |(_, position)| (*position, 1));

        file_infos.push(FileInfoRecord {
            path_offset: file.path_offset,
            path_hash: 0,
            size_in_bundle: file.entry.zsize(),
            size_in_memory: file.entry.size(),
            first_entry: file_id,
            compression: file.entry.compression_tag(),
            buffer_id,
            has_buffer,
        });
        file_entries.push(FileEntryRecord {
            file_id,
            bundle_id: to_u32(file.bundle_index + 1)?,
            offset: file.entry.page_offset(),
            size_in_bundle: file.entry.zsize(),
            next_entry: 0,
        });
    }

    // Phase 6: per-bundle info
    let mut bundle_infos = Vec::with_capacity(bundles.len());
    for (bundle_index, bundle) in bundles.iter().enumerate() {
        // Files are grouped by bundle, so the indexed ones form one contiguous range
        let first = files.iter().position(|file| file.bundle_index == bundle_index);
        let indexed = files
            .iter()
            .filter(|file| file.bundle_index == bundle_index)
            .count();
        let first_file_entry = first.map_or(Ok(0), |position| to_u32(position + 1))?;
        bundle_infos.push(BundleInfoRecord {
            name_offset: bundle_name_offsets[bundle_index],
            first_file_entry,
            num_entries: to_u32(indexed)?,
            data_block_size: bundle.header().data_block_size(),
            data_block_offset: bundle.header().data_block_offset(),
            burst_data_block_size: 0,
        });
    }

    let max_file_size_in_bundle = file_infos.iter().map(|f| f.size_in_bundle).max().unwrap_or(0);
    let max_file_size_in_memory = file_infos.iter().map(|f| f.size_in_memory).max().unwrap_or(0);

    debug!(
        "indexed {} files ({} buffers) in {} directories across {} bundles",
        files.len(),
        buffers.len(),
        dirs.len(),
        bundles.len()
    );

    Ok(MetadataStore {
        version: METADATA_VERSION,
        max_file_size_in_bundle,
        max_file_size_in_memory,
        string_table: strings.bytes,
        file_infos,
        file_entries,
        bundle_infos,
        buffers,
        dir_inits,
        file_inits,
        hashes,
    })
}

fn to_u32(value: usize) -> MetadataResult<u32> {
    u32::try_from(value).map_err(|_| MetadataError::OffsetOverflow(value as u64))
}
