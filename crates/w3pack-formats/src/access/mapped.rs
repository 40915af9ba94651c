//! Scoped read-only memory maps
//!
//! Every read maps exactly the region it needs, copies it out and drops the map
//! before returning, so no view outlives the call that created it.

use super::error::{AccessError, AccessResult};
use memmap2::{Mmap, MmapOptions};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Copy `len` bytes at `offset` of `path` into `out`
pub fn copy_region<W: Write + ?Sized>(
    path: &Path,
    offset: u64,
    len: u64,
    out: &mut W,
) -> AccessResult<()> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();

    let out_of_bounds = || AccessError::OutOfBounds {
        path: path.to_path_buf(),
        offset,
        len,
        file_len,
    };

    let end = offset.checked_add(len).ok_or_else(out_of_bounds)?;
    if end > file_len {
        return Err(out_of_bounds());
    }
    if len == 0 {
        return Ok(());
    }
    let map_len = usize::try_from(len).map_err(|_| out_of_bounds())?;

    #[allow(unsafe_code)]
    let mmap = unsafe { MmapOptions::new().offset(offset).len(map_len).map(&file)? };
    out.write_all(&mmap)?;
    Ok(())
}

/// Read `len` bytes at `offset` of `path` into a new buffer
pub fn read_region(path: &Path, offset: u64, len: u64) -> AccessResult<Vec<u8>> {
    let mut buf = Vec::with_capacity(usize::try_from(len).unwrap_or(0));
    copy_region(path, offset, len, &mut buf)?;
    Ok(buf)
}

/// Map an entire file for parsing.
///
/// Returns `None` for empty files, which cannot be mapped portably.
pub fn map_file(path: &Path) -> AccessResult<Option<Mmap>> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(None);
    }

    #[allow(unsafe_code)]
    let mmap = unsafe { MmapOptions::new().map(&file)? };
    Ok(Some(mmap))
}
