//! DDS headers for extracted textures

use super::format::{DdsEncoding, TextureFormat};
use binrw::{BinRead, BinWrite};

const DDSD_CAPS: u32 = 0x1;
const DDSD_HEIGHT: u32 = 0x2;
const DDSD_WIDTH: u32 = 0x4;
const DDSD_PITCH: u32 = 0x8;
const DDSD_PIXELFORMAT: u32 = 0x1000;
const DDSD_MIPMAPCOUNT: u32 = 0x2_0000;
const DDSD_LINEARSIZE: u32 = 0x8_0000;

const DDPF_ALPHAPIXELS: u32 = 0x1;
const DDPF_FOURCC: u32 = 0x4;
const DDPF_RGB: u32 = 0x40;

const DDSCAPS_COMPLEX: u32 = 0x8;
const DDSCAPS_TEXTURE: u32 = 0x1000;
const DDSCAPS_MIPMAP: u32 = 0x40_0000;

const DDSCAPS2_CUBEMAP_ALL_FACES: u32 = 0xFE00;

const D3D10_RESOURCE_DIMENSION_TEXTURE2D: u32 = 3;
const D3D10_RESOURCE_MISC_TEXTURECUBE: u32 = 0x4;

/// `DDS_PIXELFORMAT`
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct DdsPixelFormat {
    /// Always 32
    pub size: u32,
    /// `DDPF_*` flags
    pub flags: u32,
    /// FourCC code
    pub four_cc: [u8; 4],
    /// Bits per pixel for RGB formats
    pub rgb_bit_count: u32,
    /// Red mask
    pub r_mask: u32,
    /// Green mask
    pub g_mask: u32,
    /// Blue mask
    pub b_mask: u32,
    /// Alpha mask
    pub a_mask: u32,
}

/// `DDS_HEADER_DXT10`
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little)]
pub struct Dx10Header {
    /// DXGI format
    pub dxgi_format: u32,
    /// Resource dimension
    pub resource_dimension: u32,
    /// Misc flags (cube)
    pub misc_flag: u32,
    /// Array size
    pub array_size: u32,
    /// Alpha mode flags
    pub misc_flags2: u32,
}

/// `"DDS "` magic plus `DDS_HEADER`, followed by the DX10 header when needed
#[derive(Debug, Clone, PartialEq, Eq, BinRead, BinWrite)]
#[brw(little, magic = b"DDS ")]
pub struct DdsHeader {
    /// Always 124
    pub size: u32,
    /// `DDSD_*` flags
    pub flags: u32,
    /// Height in pixels
    pub height: u32,
    /// Width in pixels
    pub width: u32,
    /// Pitch or linear size of the top level
    pub pitch_or_linear_size: u32,
    /// Volume depth
    pub depth: u32,
    /// Mip level count
    pub mip_map_count: u32,
    /// Unused
    pub reserved1: [u32; 11],
    /// Pixel format block
    pub pixel_format: DdsPixelFormat,
    /// `DDSCAPS_*`
    pub caps: u32,
    /// `DDSCAPS2_*`
    pub caps2: u32,
    /// Unused
    pub caps3: u32,
    /// Unused
    pub caps4: u32,
    /// Unused
    pub reserved2: u32,
    /// Extended header, present when the FourCC is `DX10`
    #[br(if(pixel_format.four_cc == *b"DX10"))]
    pub dx10: Option<Dx10Header>,
}

impl DdsHeader {
    /// Header for a 2D texture or cubemap
    pub fn new(width: u32, height: u32, mips: u32, format: TextureFormat, cube: bool) -> Self {
        let mips = mips.max(1);

        let mut flags = DDSD_CAPS | DDSD_HEIGHT | DDSD_WIDTH | DDSD_PIXELFORMAT;
        flags |= if format.is_compressed() {
            DDSD_LINEARSIZE
        } else {
            DDSD_PITCH
        };
        if mips > 1 {
            flags |= DDSD_MIPMAPCOUNT;
        }

        let mut caps = DDSCAPS_TEXTURE;
        if mips > 1 {
            caps |= DDSCAPS_MIPMAP | DDSCAPS_COMPLEX;
        }
        if cube {
            caps |= DDSCAPS_COMPLEX;
        }
        let caps2 = if cube { DDSCAPS2_CUBEMAP_ALL_FACES } else { 0 };

        let (pixel_format, dx10) = match format.dds_encoding() {
            DdsEncoding::FourCc(code) => (fourcc_pixel_format(code), None),
            DdsEncoding::Rgba => (
                DdsPixelFormat {
                    size: 32,
                    flags: DDPF_RGB | DDPF_ALPHAPIXELS,
                    four_cc: [0; 4],
                    rgb_bit_count: 32,
                    r_mask: 0x0000_00FF,
                    g_mask: 0x0000_FF00,
                    b_mask: 0x00FF_0000,
                    a_mask: 0xFF00_0000,
                },
                None,
            ),
            DdsEncoding::Dx10(dxgi_format) => (
                fourcc_pixel_format(*b"DX10"),
                Some(Dx10Header {
                    dxgi_format,
                    resource_dimension: D3D10_RESOURCE_DIMENSION_TEXTURE2D,
                    misc_flag: if cube {
                        D3D10_RESOURCE_MISC_TEXTURECUBE
                    } else {
                        0
                    },
                    array_size: 1,
                    misc_flags2: 0,
                }),
            ),
        };

        Self {
            size: 124,
            flags,
            height,
            width,
            pitch_or_linear_size: format.pitch_or_linear_size(width, height),
            depth: 0,
            mip_map_count: mips,
            reserved1: [0; 11],
            pixel_format,
            caps,
            caps2,
            caps3: 0,
            caps4: 0,
            reserved2: 0,
            dx10,
        }
    }

    /// Whether a DX10 extended header follows
    pub const fn has_dx10(&self) -> bool {
        self.dx10.is_some()
    }
}

fn fourcc_pixel_format(four_cc: [u8; 4]) -> DdsPixelFormat {
    DdsPixelFormat {
        size: 32,
        flags: DDPF_FOURCC,
        four_cc,
        rgb_bit_count: 0,
        r_mask: 0,
        g_mask: 0,
        b_mask: 0,
        a_mask: 0,
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use binrw::io::Cursor;

    fn encode(header: &DdsHeader) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        header.write(&mut cursor).expect("Operation should succeed");
        cursor.into_inner()
    }

    #[test]
    fn test_legacy_header_is_128_bytes() {
        let header = DdsHeader::new(512, 512, 10, TextureFormat::Bc1, false);
        let bytes = encode(&header);
        assert_eq!(bytes.len(), 128);
        assert_eq!(&bytes[0..4], b"DDS ");
        assert_eq!(&bytes[84..88], b"DXT1");
        assert_eq!(header.caps & DDSCAPS_MIPMAP, DDSCAPS_MIPMAP);
    }

    #[test]
    fn test_dx10_header_follows_for_bc7() {
        let header = DdsHeader::new(64, 64, 1, TextureFormat::Bc7, false);
        let bytes = encode(&header);
        assert_eq!(bytes.len(), 148);
        assert_eq!(&bytes[84..88], b"DX10");
        assert_eq!(&bytes[128..132], &98u32.to_le_bytes());

        let parsed = DdsHeader::read(&mut Cursor::new(&bytes)).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_cube_caps() {
        let header = DdsHeader::new(128, 128, 1, TextureFormat::Bc3, true);
        assert_eq!(header.caps2, DDSCAPS2_CUBEMAP_ALL_FACES);
        assert_eq!(header.caps & DDSCAPS_COMPLEX, DDSCAPS_COMPLEX);

        let bc6 = DdsHeader::new(128, 128, 1, TextureFormat::Bc6h, true);
        assert_eq!(
            bc6.dx10.map(|h| h.misc_flag),
            Some(D3D10_RESOURCE_MISC_TEXTURECUBE)
        );
    }

    #[test]
    fn test_uncompressed_uses_pitch() {
        let header = DdsHeader::new(10, 10, 1, TextureFormat::R8G8B8A8, false);
        assert_eq!(header.flags & DDSD_PITCH, DDSD_PITCH);
        assert_eq!(header.pitch_or_linear_size, 40);
        assert_eq!(header.pixel_format.rgb_bit_count, 32);
    }
}
