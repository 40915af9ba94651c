//! Texture caches
//!
//! Layout:
//!
//! ```text
//! +------------------------------------+ 0
//! | item 0: sub-header | zlib | mips   |
//! | zero padding                       |
//! +------------------------------------+ next_aligned(zsize_0)
//! | ...                                |
//! +------------------------------------+ used_pages * 4096
//! | mip-offset table (u32 each)        |
//! | name table (NUL-terminated)        |
//! | entry table (52 bytes each)        |
//! | footer (32 bytes, "HCXT")          |
//! +------------------------------------+
//! ```
//!
//! Every item body, including the last, is padded to the next page. Readers
//! find the info tables by seeking back from the footer.

mod cache;
mod dds;
mod error;
mod footer;
mod format;
mod item;
pub mod mips;
mod record;

pub use cache::TextureCache;
pub use dds::{DdsHeader, DdsPixelFormat, Dx10Header};
pub use error::{TextureCacheError, TextureCacheResult};
pub use footer::{CACHE_MAGIC, CACHE_VERSION, FOOTER_SIZE, TextureCacheFooter};
pub use format::{DdsEncoding, TYPE_CODES, TextureFormat};
pub use item::TextureCacheItem;
pub use record::{ENTRY_RECORD_SIZE, ItemSubHeader, SUB_HEADER_SIZE, TextureEntryRecord};
