//! Error types for scanning, resolving and merging

use std::path::PathBuf;
use thiserror::Error;
use w3pack_formats::bundle::BundleError;
use w3pack_formats::metadata_store::MetadataError;
use w3pack_formats::texture_cache::TextureCacheError;

/// Errors raised while scanning mods, resolving conflicts or writing the merged mod
#[derive(Debug, Error)]
pub enum ConflictError {
    /// The mods directory does not exist or is not a directory
    #[error("mods directory not found: {0}")]
    ModsDirNotFound(PathBuf),

    /// Failed to read a configuration or selections file
    #[error("failed to load {path}")]
    LoadFailed {
        /// File that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// No conflict is recorded for a depot path
    #[error("no conflict for depot path {0}")]
    UnknownPath(String),

    /// A conflict has no candidate from the named mod
    #[error("{path} has no candidate from mod {mod_name}")]
    UnknownMod {
        /// Depot path of the conflict
        path: String,
        /// Requested mod
        mod_name: String,
    },

    /// Candidate index outside the conflict's candidate list
    #[error("{path} has {count} candidates, index {index} is out of range")]
    IndexOutOfRange {
        /// Depot path of the conflict
        path: String,
        /// Requested index
        index: usize,
        /// Number of candidates
        count: usize,
    },

    /// Bundle read or write failure
    #[error(transparent)]
    Bundle(#[from] BundleError),

    /// Texture cache read or write failure
    #[error(transparent)]
    TextureCache(#[from] TextureCacheError),

    /// Metadata store build or write failure
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    /// Invalid JSON in a configuration or selections file
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for conflict operations
pub type ConflictResult<T> = Result<T, ConflictError>;
