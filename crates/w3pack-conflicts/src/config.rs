//! Merge configuration
//!
//! `MergeConfig` can be loaded from a JSON file; missing fields take their
//! defaults. The CLI layers its flags and `W3PACK_*` environment variables on
//! top of the loaded value.

use crate::error::{ConflictError, ConflictResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use w3pack_formats::PackConfig;

/// Default name of the mod the merged archives are written to
pub const DEFAULT_MERGED_MOD_NAME: &str = "mod0000_MergedFiles";

/// Default name of the archive directory inside a mod
pub const DEFAULT_CONTENT_DIR_NAME: &str = "content";

/// Where mods are scanned from and where the merged mod is written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeConfig {
    /// Directory whose immediate children are mods
    pub mods_dir: PathBuf,

    /// Directory the merged mod is created in; `mods_dir` when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Name of the merged mod. It is never scanned as a source.
    pub merged_mod_name: String,

    /// Archive directory inside the merged mod
    pub content_dir_name: String,

    /// Settings passed to every archive build
    pub pack: PackConfig,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            mods_dir: PathBuf::from("Mods"),
            output_dir: None,
            merged_mod_name: DEFAULT_MERGED_MOD_NAME.to_string(),
            content_dir_name: DEFAULT_CONTENT_DIR_NAME.to_string(),
            pack: PackConfig::default(),
        }
    }
}

impl MergeConfig {
    /// Configuration scanning `mods_dir`
    pub fn new(mods_dir: impl Into<PathBuf>) -> Self {
        Self {
            mods_dir: mods_dir.into(),
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> ConflictResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConflictError::LoadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save(&self, path: impl AsRef<Path>) -> ConflictResult<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Set the output directory
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Set the merged mod name
    #[must_use]
    pub fn with_merged_mod_name(mut self, name: impl Into<String>) -> Self {
        self.merged_mod_name = name.into();
        self
    }

    /// Set the archive build settings
    #[must_use]
    pub fn with_pack(mut self, pack: PackConfig) -> Self {
        self.pack = pack;
        self
    }

    /// Directory the merged mod is created in
    pub fn output_root(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.mods_dir)
    }

    /// `<output>/<merged mod>/<content>`
    pub fn merged_content_dir(&self) -> PathBuf {
        self.output_root()
            .join(&self.merged_mod_name)
            .join(&self.content_dir_name)
    }

    /// Whether a mod directory name refers to the merged mod
    pub fn is_merged_mod(&self, name: &str) -> bool {
        name.eq_ignore_ascii_case(&self.merged_mod_name)
    }
}
