//! Pixel formats addressed by the entry type code

use super::error::{TextureCacheError, TextureCacheResult};
use std::fmt;

/// Pixel format of a cached texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit RGBA, uncompressed
    R8G8B8A8,
    /// BC1 (DXT1)
    Bc1,
    /// BC2 (DXT3)
    Bc2,
    /// BC3 (DXT5)
    Bc3,
    /// BC4 (ATI1)
    Bc4,
    /// BC5 (ATI2)
    Bc5,
    /// BC6H, unsigned half float
    Bc6h,
    /// BC7
    Bc7,
    /// 16-bit float RGBA
    R16G16B16A16Float,
    /// 32-bit float RGBA
    R32G32B32A32Float,
}

/// Every type code the cooker writes, in long and short form
pub const TYPE_CODES: [(u16, TextureFormat); 18] = [
    (0x3FD, TextureFormat::R8G8B8A8),
    (0x407, TextureFormat::Bc1),
    (0x408, TextureFormat::Bc3),
    (0x409, TextureFormat::Bc6h),
    (0x40A, TextureFormat::Bc7),
    (0x40B, TextureFormat::R16G16B16A16Float),
    (0x40C, TextureFormat::R32G32B32A32Float),
    (0x40D, TextureFormat::Bc2),
    (0x40E, TextureFormat::Bc4),
    (0x40F, TextureFormat::Bc5),
    (0x00, TextureFormat::R8G8B8A8),
    (0x07, TextureFormat::Bc1),
    (0x08, TextureFormat::Bc3),
    (0x0A, TextureFormat::Bc7),
    (0x0D, TextureFormat::Bc2),
    (0x0E, TextureFormat::Bc4),
    (0x0F, TextureFormat::Bc5),
    (0xFD, TextureFormat::R8G8B8A8),
];

/// How the DDS pixel-format block describes a [`TextureFormat`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdsEncoding {
    /// Legacy FourCC code
    FourCc([u8; 4]),
    /// Uncompressed RGBA bit masks
    Rgba,
    /// `DX10` FourCC plus an extended header carrying this DXGI format
    Dx10(u32),
}

impl TextureFormat {
    /// Look up a type code
    pub fn from_type_code(code: u16) -> TextureCacheResult<Self> {
        TYPE_CODES
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, format)| *format)
            .ok_or(TextureCacheError::UnknownPixelFormat(code))
    }

    /// DDS representation
    pub const fn dds_encoding(self) -> DdsEncoding {
        match self {
            Self::R8G8B8A8 => DdsEncoding::Rgba,
            Self::Bc1 => DdsEncoding::FourCc(*b"DXT1"),
            Self::Bc2 => DdsEncoding::FourCc(*b"DXT3"),
            Self::Bc3 => DdsEncoding::FourCc(*b"DXT5"),
            Self::Bc4 => DdsEncoding::FourCc(*b"ATI1"),
            Self::Bc5 => DdsEncoding::FourCc(*b"ATI2"),
            Self::Bc6h => DdsEncoding::Dx10(95),
            Self::Bc7 => DdsEncoding::Dx10(98),
            Self::R16G16B16A16Float => DdsEncoding::Dx10(10),
            Self::R32G32B32A32Float => DdsEncoding::Dx10(2),
        }
    }

    /// Bytes per 4x4 block for block-compressed formats
    pub const fn block_bytes(self) -> Option<u32> {
        match self {
            Self::Bc1 | Self::Bc4 => Some(8),
            Self::Bc2 | Self::Bc3 | Self::Bc5 | Self::Bc6h | Self::Bc7 => Some(16),
            Self::R8G8B8A8 | Self::R16G16B16A16Float | Self::R32G32B32A32Float => None,
        }
    }

    /// Bytes per pixel for uncompressed formats
    pub const fn bytes_per_pixel(self) -> Option<u32> {
        match self {
            Self::R8G8B8A8 => Some(4),
            Self::R16G16B16A16Float => Some(8),
            Self::R32G32B32A32Float => Some(16),
            _ => None,
        }
    }

    /// Whether the format is block compressed
    pub const fn is_compressed(self) -> bool {
        self.block_bytes().is_some()
    }

    /// Linear size of the top level (compressed) or row pitch (uncompressed)
    pub fn pitch_or_linear_size(self, width: u32, height: u32) -> u32 {
        match (self.block_bytes(), self.bytes_per_pixel()) {
            (Some(block), _) => {
                let blocks_wide = width.div_ceil(4).max(1);
                let blocks_high = height.div_ceil(4).max(1);
                blocks_wide.saturating_mul(blocks_high).saturating_mul(block)
            }
            (None, Some(bpp)) => width.saturating_mul(bpp),
            (None, None) => 0,
        }
    }
}

impl fmt::Display for TextureFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::R8G8B8A8 => "R8G8B8A8",
            Self::Bc1 => "BC1",
            Self::Bc2 => "BC2",
            Self::Bc3 => "BC3",
            Self::Bc4 => "BC4",
            Self::Bc5 => "BC5",
            Self::Bc6h => "BC6H",
            Self::Bc7 => "BC7",
            Self::R16G16B16A16Float => "R16G16B16A16_FLOAT",
            Self::R32G32B32A32Float => "R32G32B32A32_FLOAT",
        };
        f.write_str(name)
    }
}
