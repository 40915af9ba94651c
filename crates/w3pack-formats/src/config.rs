//! Configuration for archive builders

use crate::compression::CompressionKind;
use serde::{Deserialize, Serialize};

/// Settings every archive-build call receives explicitly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PackConfig {
    /// Compression applied to loose files packed into bundles
    pub compression: CompressionKind,

    /// Name of a bundle holding regular files
    pub blob_bundle_name: String,

    /// Name of a bundle holding only `.buffer` entries
    pub buffer_bundle_name: String,

    /// Name of a texture cache
    pub texture_cache_name: String,

    /// Name of the metadata store written next to the bundles
    pub metadata_store_name: String,
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            compression: CompressionKind::Lz4Hc,
            blob_bundle_name: "blob0.bundle".to_string(),
            buffer_bundle_name: "buffers0.bundle".to_string(),
            texture_cache_name: "texture.cache".to_string(),
            metadata_store_name: "metadata.store".to_string(),
        }
    }
}

impl PackConfig {
    /// Set the compression used for loose files
    #[must_use]
    pub const fn with_compression(mut self, compression: CompressionKind) -> Self {
        self.compression = compression;
        self
    }

    /// Set the regular bundle name
    #[must_use]
    pub fn with_blob_bundle_name(mut self, name: impl Into<String>) -> Self {
        self.blob_bundle_name = name.into();
        self
    }

    /// Set the buffer bundle name
    #[must_use]
    pub fn with_buffer_bundle_name(mut self, name: impl Into<String>) -> Self {
        self.buffer_bundle_name = name.into();
        self
    }

    /// Set the texture cache name
    #[must_use]
    pub fn with_texture_cache_name(mut self, name: impl Into<String>) -> Self {
        self.texture_cache_name = name.into();
        self
    }

    /// Bundle name for a set of entries that are all buffers or all regular files
    pub fn bundle_name(&self, buffers: bool) -> &str {
        if buffers {
            &self.buffer_bundle_name
        } else {
            &self.blob_bundle_name
        }
    }
}
