//! Fixed-width ToC record

use binrw::{BinRead, BinWrite};
use std::fmt;

/// Byte size of one ToC record
pub const TOC_ENTRY_SIZE: u64 = 320;

/// Byte size of the name field
pub const NAME_FIELD_SIZE: usize = 256;

/// One ToC record as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct TocRecord {
    /// Depot path, NUL-padded
    pub name: [u8; NAME_FIELD_SIZE],
    /// Content hash, zero in practice
    pub hash: [u8; 16],
    /// Always zero
    pub reserved: u32,
    /// Uncompressed size
    pub size: u32,
    /// Compressed size
    pub zsize: u32,
    /// Byte offset of the compressed blob
    pub page_offset: u32,
    /// Packed date
    pub date: u32,
    /// Packed time
    pub time: u32,
    /// Always zero
    pub padding: [u8; 16],
    /// CRC-32 of the uncompressed bytes
    pub crc: u32,
    /// Compression tag
    pub compression: u32,
}

/// Encode a depot path into the fixed name field, truncating past 256 bytes
pub fn encode_name(name: &str) -> [u8; NAME_FIELD_SIZE] {
    let mut field = [0u8; NAME_FIELD_SIZE];
    let bytes = name.as_bytes();
    let len = bytes.len().min(NAME_FIELD_SIZE);
    field[..len].copy_from_slice(&bytes[..len]);
    field
}

/// Decode the name field up to its first NUL
pub fn decode_name(field: &[u8; NAME_FIELD_SIZE]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(NAME_FIELD_SIZE);
    String::from_utf8_lossy(&field[..end]).into_owned()
}

/// Date and time packed into the two ToC timestamp words
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackedTimestamp {
    /// Year
    pub year: u16,
    /// Month (1-12)
    pub month: u8,
    /// Day of month
    pub day: u8,
    /// Hour
    pub hour: u8,
    /// Minute
    pub minute: u8,
    /// Second
    pub second: u8,
}

impl PackedTimestamp {
    /// Decode the two words; `None` when both are zero
    pub const fn from_packed(date: u32, time: u32) -> Option<Self> {
        if date == 0 && time == 0 {
            return None;
        }
        Some(Self {
            year: (date >> 20) as u16,
            month: ((date >> 15) & 0x1F) as u8,
            day: ((date >> 10) & 0x1F) as u8,
            hour: (time >> 22) as u8,
            minute: ((time >> 16) & 0x3F) as u8,
            second: ((time >> 10) & 0x3F) as u8,
        })
    }

    /// Encode back into `(date, time)`
    pub const fn to_packed(self) -> (u32, u32) {
        let date = ((self.year as u32) << 20)
            | (((self.month as u32) & 0x1F) << 15)
            | (((self.day as u32) & 0x1F) << 10);
        let time = ((self.hour as u32) << 22)
            | (((self.minute as u32) & 0x3F) << 16)
            | (((self.second as u32) & 0x3F) << 10);
        (date, time)
    }
}

impl fmt::Display for PackedTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second
        )
    }
}
