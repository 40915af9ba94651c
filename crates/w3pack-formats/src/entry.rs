//! Behaviour shared by bundle entries and texture cache items

use crate::access::AccessError;
use crate::registry::{ArchiveId, ArchiveRegistry};
use std::collections::HashSet;
use std::io::Write;

/// Extension that marks a buffer entry
pub const BUFFER_EXTENSION: &str = "buffer";

/// One packed file record inside an archive
pub trait ArchiveEntry {
    /// Error raised when reading the entry's bytes
    type Error: std::error::Error + From<AccessError>;

    /// Logical path the engine addresses the file by
    fn depot_path(&self) -> &str;

    /// Uncompressed size
    fn size(&self) -> u64;

    /// Size of the entry's region in its container
    fn zsize(&self) -> u64;

    /// Archive this entry belongs to
    fn owner(&self) -> ArchiveId;

    /// Whether the entry is a `<path>.<N>.buffer` payload
    fn is_buffer(&self) -> bool {
        is_buffer_path(self.depot_path())
    }

    /// Copy the entry's compressed bytes into `out`
    fn get_compressed_bytes(
        &self,
        registry: &ArchiveRegistry,
        out: &mut dyn Write,
    ) -> Result<(), Self::Error>;

    /// Write the entry's decoded content into `out`
    fn extract(&self, registry: &ArchiveRegistry, out: &mut dyn Write) -> Result<(), Self::Error>;
}

/// Whether the last `.`-separated extension of `path` is `buffer`
pub fn is_buffer_path(path: &str) -> bool {
    path.rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case(BUFFER_EXTENSION))
}

/// Split `<owner>.<N>.buffer` into `(owner, N)`
///
/// ```
/// use w3pack_formats::entry::buffer_owner;
///
/// assert_eq!(
///     buffer_owner("environment\\tree.w2mesh.1.buffer"),
///     Some(("environment\\tree.w2mesh", 1))
/// );
/// assert_eq!(buffer_owner("environment\\tree.w2mesh"), None);
/// ```
pub fn buffer_owner(path: &str) -> Option<(&str, u32)> {
    let (stem, ext) = path.rsplit_once('.')?;
    if !ext.eq_ignore_ascii_case(BUFFER_EXTENSION) {
        return None;
    }
    let (owner, index) = stem.rsplit_once('.')?;
    let index = index.parse().ok()?;
    Some((owner, index))
}

/// Components of a depot path, accepting both `\` and `/` separators
pub fn path_components(path: &str) -> impl Iterator<Item = &str> {
    path.split(['\\', '/']).filter(|component| !component.is_empty())
}

/// Key the engine resolves a depot path by: lowercase with `\` separators
pub fn depot_key(path: &str) -> String {
    path.replace('/', "\\").to_lowercase()
}

/// First path whose [`depot_key`] was already seen
pub fn first_duplicate<'a>(paths: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    let mut seen = HashSet::new();
    paths.into_iter().find(|path| !seen.insert(depot_key(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_detection() {
        assert!(is_buffer_path("dlc\\bob\\data\\mesh.w2mesh.1.buffer"));
        assert!(is_buffer_path("a.BUFFER"));
        assert!(!is_buffer_path("dlc\\bob\\data\\mesh.w2mesh"));
        assert!(!is_buffer_path("buffer"));
        assert!(!is_buffer_path("gameplay\\buffer.xml"));
    }

    #[test]
    fn test_buffer_owner_requires_index() {
        assert_eq!(buffer_owner("a.w2mesh.12.buffer"), Some(("a.w2mesh", 12)));
        assert_eq!(buffer_owner("a.w2mesh.buffer"), None);
        assert_eq!(buffer_owner("a.w2mesh.x.buffer"), None);
    }

    #[test]
    fn test_path_components_mixed_separators() {
        let parts: Vec<_> = path_components("characters\\models/geralt\\\\body.w2ent").collect();
        assert_eq!(parts, ["characters", "models", "geralt", "body.w2ent"]);
    }

    #[test]
    fn test_duplicates_ignore_case_and_separator() {
        assert_eq!(depot_key("Quests/Quest01.W2SCENE"), "quests\\quest01.w2scene");
        assert_eq!(
            first_duplicate(["a\\x.xml", "a\\y.xml", "A/X.xml"]),
            Some("A/X.xml")
        );
        assert_eq!(first_duplicate(["a\\x.xml", "a\\y.xml"]), None);
    }
}
