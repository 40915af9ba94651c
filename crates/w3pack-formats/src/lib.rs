//! Readers and writers for Witcher 3 archive formats
//!
#![allow(clippy::cast_possible_truncation)] // Intentional for binary format parsing
#![allow(clippy::cast_possible_wrap)] // Intentional for binary operations
#![allow(clippy::cast_lossless)] // Sometimes clearer than From
#![allow(clippy::module_name_repetitions)] // Clear naming is preferred
#![allow(clippy::similar_names)] // Domain-specific naming patterns
#![allow(clippy::needless_pass_by_value)] // Configuration types
#![allow(clippy::return_self_not_must_use)] // Builder patterns
#![allow(clippy::use_self)] // Type clarity
#![allow(clippy::map_entry)] // Error handling patterns
//! This crate provides symmetric (parser and builder) implementations for the
//! container formats a Witcher 3 mod ships, plus the index the engine needs to
//! load a merged set of them.
//!
//! # Supported Formats
//!
//! - **Bundle**: header + fixed-width ToC + page-aligned compressed bodies
//! - **Texture cache**: per-item compressed payload and mip chain, footer-anchored info tables
//! - **Metadata store**: string table, file/bundle records, directory tree and path hash table
//!
//! # Lazy Backing Stores
//!
//! Entries never own their compressed bytes unless they were produced in memory.
//! Each entry carries an [`ArchiveId`](registry::ArchiveId) handle to its owning
//! archive plus a [`BackingStore`](access::BackingStore) describing where the
//! bytes physically live. Reads go through a scoped memory map that is released
//! as soon as the bytes have been copied out.
//!
//! ```no_run
//! use w3pack_formats::bundle::Bundle;
//! use w3pack_formats::registry::ArchiveRegistry;
//!
//! let mut registry = ArchiveRegistry::new();
//! let bundle = Bundle::read("mods/modFoo/content/blob0.bundle", &mut registry)?;
//! for entry in bundle.entries() {
//!     println!("{} ({} -> {} bytes)", entry.depot_path(), entry.size(), entry.zsize());
//! }
//! # Ok::<(), w3pack_formats::bundle::BundleError>(())
//! ```

#![warn(missing_docs)]

/// Backing stores and scoped memory-mapped reads
///
/// Resolves where an entry's compressed bytes live: its owning archive, another
/// archive it was copied from, a standalone file, or an in-memory buffer.
pub mod access;
pub mod align;
/// Bundle archive (`*.bundle`) reader and writer
///
/// Bundles are a 32-byte header, a table of 320-byte ToC records and a body of
/// compressed blobs, each starting on a 4096-byte page boundary.
///
/// See the [`bundle`] module for building merged bundles from existing entries
/// or loose files.
pub mod bundle;
/// Compression codecs addressed by the on-disk compression tag
pub mod compression;
/// Immutable configuration passed to archive builders
pub mod config;
pub mod entry;
/// Metadata store (`metadata.store`) index builder and parser
///
/// The metadata store cross-references every file of a closed set of bundles:
/// string table, per-file and per-bundle records, a parent-linked directory
/// tree and a sorted FNV-1a path hash table.
pub mod metadata_store;
/// Archive registry (arena of opened and built archives)
pub mod registry;
/// Texture cache (`texture.cache`) reader and writer
///
/// The texture cache stores zlib-compressed images with their mip chains. Its
/// info tables and footer live at the end of the file and are located by a
/// backward seek from the footer.
pub mod texture_cache;

// Test utilities module
#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
pub(crate) mod test_utils;

pub use access::{BackingStore, FileAccessor};
pub use align::{ALIGNMENT, next_aligned};
pub use compression::CompressionKind;
pub use config::PackConfig;
pub use entry::ArchiveEntry;
pub use registry::{ArchiveId, ArchiveKind, ArchiveRegistry};
