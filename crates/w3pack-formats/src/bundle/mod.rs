//! Bundle archives
//!
//! Layout:
//!
//! ```text
//! +--------------------+ 0
//! | header (32 bytes)  |
//! +--------------------+ 32
//! | ToC (320 * n)      |
//! +--------------------+
//! | zero padding       |
//! +--------------------+ next_aligned(32 + 320 * n)
//! | body 0 | padding   |
//! +--------------------+ next_aligned(offset_0 + zsize_0)
//! | ...                |
//! | body n-1           |   (last body is not padded)
//! +--------------------+
//! ```
//!
//! A bundle holds either only `.buffer` entries or none; the two classes are
//! always written to separate containers.

mod archive;
mod entry;
mod error;
mod header;
mod loose;
mod record;

pub use archive::Bundle;
pub use entry::BundleEntry;
pub use error::{BundleError, BundleResult};
pub use header::{BUNDLE_MAGIC, BundleHeader, HEADER_SIZE, HEADER_TRAILER};
pub use loose::{DEPOT_SEPARATOR, LooseFile, depot_path_of};
pub use record::{NAME_FIELD_SIZE, PackedTimestamp, TOC_ENTRY_SIZE, TocRecord, decode_name, encode_name};
