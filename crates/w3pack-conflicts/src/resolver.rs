//! Conflict detection and winner selection
//!
//! Every depot path seen in the scanned mods gets one candidate per mod that
//! ships it. A path with more than one candidate is a conflict. Paths are
//! compared case-insensitively, the way the engine resolves them.
//!
//! Buffer entries (`<path>.<N>.buffer`) are not conflicts of their own: they
//! travel with the candidate of their owner from the same mod.

use crate::error::{ConflictError, ConflictResult};
use crate::scan::{ModArchives, ScanReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};
use w3pack_formats::bundle::BundleEntry;
use w3pack_formats::entry::{buffer_owner, depot_key, path_components};
use w3pack_formats::texture_cache::TextureCacheItem;
use w3pack_formats::{ArchiveEntry, ArchiveId, ArchiveKind};

/// Selections file content: depot path to winning mod name
pub type Selections = BTreeMap<String, String>;

/// A packed file from either container type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackedEntry {
    /// Entry of a bundle
    Bundle(BundleEntry),
    /// Item of a texture cache
    Texture(TextureCacheItem),
}

impl PackedEntry {
    /// Depot path
    pub fn depot_path(&self) -> &str {
        match self {
            Self::Bundle(entry) => entry.depot_path(),
            Self::Texture(item) => item.depot_path(),
        }
    }

    /// Uncompressed size
    pub fn size(&self) -> u64 {
        match self {
            Self::Bundle(entry) => ArchiveEntry::size(entry),
            Self::Texture(item) => ArchiveEntry::size(item),
        }
    }

    /// Size in the container
    pub fn zsize(&self) -> u64 {
        match self {
            Self::Bundle(entry) => ArchiveEntry::zsize(entry),
            Self::Texture(item) => ArchiveEntry::zsize(item),
        }
    }

    /// Owning archive
    pub fn owner(&self) -> ArchiveId {
        match self {
            Self::Bundle(entry) => ArchiveEntry::owner(entry),
            Self::Texture(item) => ArchiveEntry::owner(item),
        }
    }

    /// Container type the entry comes from
    pub const fn kind(&self) -> ArchiveKind {
        match self {
            Self::Bundle(_) => ArchiveKind::Bundle,
            Self::Texture(_) => ArchiveKind::TextureCache,
        }
    }
}

/// One mod's version of a depot path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Mod the entry comes from
    pub mod_name: String,
    /// The entry itself
    pub entry: PackedEntry,
    /// Buffer entries owned by this entry in the same mod
    pub buffers: Vec<BundleEntry>,
}

/// All candidates for one depot path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// Depot path as first seen
    pub path: String,
    /// First path component
    pub category: String,
    /// Last path component
    pub name: String,
    /// Candidates in mod scan order
    pub candidates: Vec<Candidate>,
    /// Index of the chosen candidate
    pub selected: Option<usize>,
}

impl Conflict {
    fn new(path: &str) -> Self {
        let mut components = path_components(path);
        let category = components.next().unwrap_or_default().to_string();
        let name = components
            .last()
            .map_or_else(|| category.clone(), str::to_string);
        Self {
            path: path.to_string(),
            category,
            name,
            candidates: Vec::new(),
            selected: None,
        }
    }

    /// Whether more than one mod ships this path
    pub fn is_conflict(&self) -> bool {
        self.candidates.len() > 1
    }

    /// Whether a winner has been chosen
    pub fn is_resolved(&self) -> bool {
        self.selected.is_some()
    }

    /// The chosen candidate
    pub fn winner(&self) -> Option<&Candidate> {
        self.selected.and_then(|index| self.candidates.get(index))
    }

    /// Names of the mods shipping this path
    pub fn mod_names(&self) -> impl Iterator<Item = &str> {
        self.candidates.iter().map(|c| c.mod_name.as_str())
    }
}

/// Case-insensitive map from depot path to candidates
#[derive(Debug, Clone, Default)]
pub struct ConflictResolver {
    paths: BTreeMap<String, Conflict>,
}

impl ConflictResolver {
    /// Empty resolver
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver holding every mod of a scan
    pub fn from_scan(report: &ScanReport) -> Self {
        let mut resolver = Self::new();
        for archives in &report.mods {
            resolver.add_mod(archives);
        }
        resolver
    }

    /// Add the entries of one mod.
    ///
    /// If the mod ships a path twice, the first occurrence in walk order wins.
    pub fn add_mod(&mut self, archives: &ModArchives) {
        let mut buffers = Vec::new();

        for bundle in &archives.bundles {
            for entry in bundle.entries() {
                if entry.is_buffer() {
                    buffers.push(entry);
                } else {
                    self.add_candidate(&archives.name, PackedEntry::Bundle(entry.clone()));
                }
            }
        }
        for cache in &archives.caches {
            for item in cache.items() {
                self.add_candidate(&archives.name, PackedEntry::Texture(item.clone()));
            }
        }

        for buffer in buffers {
            let owner = buffer_owner(buffer.depot_path())
                .and_then(|(owner, _)| self.candidate_mut(owner, &archives.name));
            if let Some(candidate) = owner {
                candidate.buffers.push(buffer.clone());
            } else {
                warn!(
                    "{}: buffer {} has no owner in this mod",
                    archives.name,
                    buffer.depot_path()
                );
                self.add_candidate(&archives.name, PackedEntry::Bundle(buffer.clone()));
            }
        }
    }

    fn add_candidate(&mut self, mod_name: &str, entry: PackedEntry) {
        let conflict = self
            .paths
            .entry(depot_key(entry.depot_path()))
            .or_insert_with(|| Conflict::new(entry.depot_path()));

        if conflict.mod_names().any(|name| name == mod_name) {
            debug!("{mod_name}: {} already seen, keeping first", entry.depot_path());
            return;
        }
        conflict.candidates.push(Candidate {
            mod_name: mod_name.to_string(),
            entry,
            buffers: Vec::new(),
        });
    }

    fn candidate_mut(&mut self, path: &str, mod_name: &str) -> Option<&mut Candidate> {
        self.paths
            .get_mut(&depot_key(path))?
            .candidates
            .iter_mut()
            .find(|c| c.mod_name == mod_name)
    }

    /// Every depot path seen, conflicting or not
    pub fn paths(&self) -> impl Iterator<Item = &Conflict> {
        self.paths.values()
    }

    /// Paths shipped by more than one mod, ordered by path
    pub fn conflicts(&self) -> impl Iterator<Item = &Conflict> {
        self.paths.values().filter(|c| c.is_conflict())
    }

    /// Conflicts grouped by category
    pub fn by_category(&self) -> BTreeMap<&str, Vec<&Conflict>> {
        let mut groups: BTreeMap<&str, Vec<&Conflict>> = BTreeMap::new();
        for conflict in self.conflicts() {
            groups
                .entry(conflict.category.as_str())
                .or_default()
                .push(conflict);
        }
        groups
    }

    /// Conflict for a depot path
    pub fn conflict(&self, path: &str) -> Option<&Conflict> {
        self.paths.get(&depot_key(path)).filter(|c| c.is_conflict())
    }

    fn conflict_mut(&mut self, path: &str) -> ConflictResult<&mut Conflict> {
        self.paths
            .get_mut(&depot_key(path))
            .filter(|c| c.is_conflict())
            .ok_or_else(|| ConflictError::UnknownPath(path.to_string()))
    }

    /// Choose the candidate at `index` as the winner of `path`
    pub fn select(&mut self, path: &str, index: usize) -> ConflictResult<()> {
        let conflict = self.conflict_mut(path)?;
        if index >= conflict.candidates.len() {
            return Err(ConflictError::IndexOutOfRange {
                path: path.to_string(),
                index,
                count: conflict.candidates.len(),
            });
        }
        conflict.selected = Some(index);
        Ok(())
    }

    /// Choose the candidate shipped by `mod_name` as the winner of `path`
    pub fn select_mod(&mut self, path: &str, mod_name: &str) -> ConflictResult<()> {
        let conflict = self.conflict_mut(path)?;
        let index = conflict
            .candidates
            .iter()
            .position(|c| c.mod_name.eq_ignore_ascii_case(mod_name))
            .ok_or_else(|| ConflictError::UnknownMod {
                path: path.to_string(),
                mod_name: mod_name.to_string(),
            })?;
        conflict.selected = Some(index);
        Ok(())
    }

    /// Forget the winner of `path`
    pub fn clear(&mut self, path: &str) -> ConflictResult<()> {
        self.conflict_mut(path)?.selected = None;
        Ok(())
    }

    /// Apply every selection of a selections file
    pub fn apply_selections(&mut self, selections: &Selections) -> ConflictResult<()> {
        for (path, mod_name) in selections {
            self.select_mod(path, mod_name)?;
        }
        Ok(())
    }

    /// Current selections, keyed by depot path as first seen
    pub fn selections(&self) -> Selections {
        self.conflicts()
            .filter_map(|c| Some((c.path.clone(), c.winner()?.mod_name.clone())))
            .collect()
    }

    /// Winning candidates of resolved conflicts
    pub fn winners(&self) -> impl Iterator<Item = &Candidate> {
        self.conflicts().filter_map(Conflict::winner)
    }

    /// Conflicts without a winner
    pub fn unresolved(&self) -> impl Iterator<Item = &Conflict> {
        self.conflicts().filter(|c| !c.is_resolved())
    }
}

/// Load a selections file
pub fn load_selections(path: impl AsRef<Path>) -> ConflictResult<Selections> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConflictError::LoadFailed {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Save selections as pretty-printed JSON
pub fn save_selections(path: impl AsRef<Path>, selections: &Selections) -> ConflictResult<()> {
    std::fs::write(path, serde_json::to_string_pretty(selections)?)?;
    Ok(())
}

/// Summary of a conflict for JSON output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictSummary {
    /// Depot path
    pub path: String,
    /// First path component
    pub category: String,
    /// Mods shipping the path
    pub mods: Vec<String>,
    /// Chosen mod
    pub selected: Option<String>,
}

impl From<&Conflict> for ConflictSummary {
    fn from(conflict: &Conflict) -> Self {
        Self {
            path: conflict.path.clone(),
            category: conflict.category.clone(),
            mods: conflict.mod_names().map(str::to_string).collect(),
            selected: conflict.winner().map(|c| c.mod_name.clone()),
        }
    }
}
