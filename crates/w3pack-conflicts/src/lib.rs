//! Conflict detection and merged-mod packing for Witcher 3 mods
//!
//! When two mods ship the same depot path, the engine loads only one of them.
//! This crate finds those collisions across a mods directory, lets the caller
//! pick a winner per path, and repacks the winners into a merged mod that
//! loads ahead of the others.
//!
//! # Workflow
//!
//! 1. [`ModScanner`] opens every bundle and texture cache of every mod.
//! 2. [`ConflictResolver`] groups their entries by depot path.
//! 3. The caller selects winners, directly or from a selections file.
//! 4. [`merge`] writes the merged bundles, texture cache and metadata store.
//!
//! ```no_run
//! use w3pack_conflicts::{ConflictResolver, MergeConfig, ModScanner, merge};
//! use w3pack_formats::ArchiveRegistry;
//!
//! let config = MergeConfig::new("Mods");
//! let mut registry = ArchiveRegistry::new();
//!
//! let report = ModScanner::new(&config).scan(&mut registry)?;
//! let mut resolver = ConflictResolver::from_scan(&report);
//! resolver.select_mod("quests\\quest01.w2scene", "modBetterQuests")?;
//!
//! let outcome = merge(&resolver, &config, &mut registry)?;
//! println!("wrote {} bundles", outcome.bundles.len());
//! # Ok::<(), w3pack_conflicts::ConflictError>(())
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod merge;
pub mod resolver;
pub mod scan;

pub use config::{DEFAULT_CONTENT_DIR_NAME, DEFAULT_MERGED_MOD_NAME, MergeConfig};
pub use error::{ConflictError, ConflictResult};
pub use merge::{MergeOutcome, merge};
pub use resolver::{
    Candidate, Conflict, ConflictResolver, ConflictSummary, PackedEntry, Selections,
    load_selections, save_selections,
};
pub use scan::{ModArchives, ModScanner, ScanReport, SkippedArchive};
