//! Hash and checksum primitives for Witcher 3 archive formats
//!
//! This crate provides the two digests the archive formats depend on:
//!
//! - **FNV-1a 64**: depot path hashes in the metadata store hash table and the
//!   texture cache footer checksum
//! - **CRC-32**: per-entry checksum of the uncompressed bytes in bundle ToC records
//!
//! # Examples
//!
//! ```
//! use w3pack_hash::{Crc32, Fnv1a64};
//!
//! let path_hash = Fnv1a64::hash(b"gameplay\\items\\def_item_weapons.xml");
//! println!("FNV-1a64: {path_hash}");
//!
//! let crc = Crc32::of(b"123456789");
//! assert_eq!(crc.value(), 0xCBF4_3926);
//! ```

#![warn(missing_docs)]

pub mod crc;
pub mod fnv;

pub use crc::Crc32;
pub use fnv::Fnv1a64;
