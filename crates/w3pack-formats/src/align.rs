//! Page alignment shared by bundles and texture caches

use std::io::{self, Write};

/// Page size every entry body starts on
pub const ALIGNMENT: u64 = 4096;

/// Next page boundary strictly after `min_pos`.
///
/// A position already on a boundary still advances a full page, so
/// `next_aligned(4096) == 8192`. Both container writers depend on this exact
/// rule for compatibility with archives produced by the official tools.
///
/// ```
/// use w3pack_formats::next_aligned;
///
/// assert_eq!(next_aligned(0), 4096);
/// assert_eq!(next_aligned(352), 4096);
/// assert_eq!(next_aligned(4096), 8192);
/// assert_eq!(next_aligned(4097), 8192);
/// ```
pub const fn next_aligned(min_pos: u64) -> u64 {
    (min_pos / ALIGNMENT) * ALIGNMENT + ALIGNMENT
}

/// Bytes of padding needed to move from `pos` to `next_aligned(pos)`
pub const fn padding_after(pos: u64) -> u64 {
    next_aligned(pos) - pos
}

/// Write zeros from `position` up to `target` and return the new position
pub fn pad_to<W: Write + ?Sized>(writer: &mut W, position: u64, target: u64) -> io::Result<u64> {
    const ZEROS: [u8; ALIGNMENT as usize] = [0; ALIGNMENT as usize];
    let mut remaining = target.saturating_sub(position);
    while remaining > 0 {
        let chunk = remaining.min(ALIGNMENT) as usize;
        writer.write_all(&ZEROS[..chunk])?;
        remaining -= chunk as u64;
    }
    Ok(target.max(position))
}
