//! IHDR, PLTE and tRNS payloads.

use alloc::format;
use alloc::vec::Vec;

use super::chunk::ChunkType;
use crate::error::PngError;
use crate::pixel::{ColorType, PixelFormat};

/// Largest width or height the format permits.
pub(crate) const MAX_DIMENSION: u32 = 0x7FFF_FFFF;

/// Parsed and validated IHDR.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Ihdr {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: ColorType,
    pub interlaced: bool,
}

impl Ihdr {
    pub(crate) fn parse(data: &[u8]) -> Result<Self, PngError> {
        let Ok(fields) = <[u8; 13]>::try_from(data) else {
            return Err(PngError::InvalidHeader(format!(
                "IHDR is {} bytes, expected 13",
                data.len()
            )));
        };
        let width = u32::from_be_bytes([fields[0], fields[1], fields[2], fields[3]]);
        let height = u32::from_be_bytes([fields[4], fields[5], fields[6], fields[7]]);
        let [bit_depth, color_code, compression, filter, interlace] =
            [fields[8], fields[9], fields[10], fields[11], fields[12]];

        if width == 0 || height == 0 || width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(PngError::InvalidHeader(format!(
                "image dimensions {width}x{height} out of range"
            )));
        }
        let color_type = ColorType::from_code(color_code).ok_or_else(|| {
            PngError::InvalidHeader(format!("unknown color type {color_code}"))
        })?;
        if !color_type.allows_depth(bit_depth) {
            return Err(PngError::Unsupported(format!(
                "bit depth {bit_depth} with color type {color_type:?}"
            )));
        }
        if compression != 0 {
            return Err(PngError::InvalidHeader(format!(
                "unknown compression method {compression}"
            )));
        }
        if filter != 0 {
            return Err(PngError::InvalidHeader(format!(
                "unknown filter method {filter}"
            )));
        }
        let interlaced = match interlace {
            0 => false,
            1 => true,
            other => {
                return Err(PngError::InvalidHeader(format!(
                    "unknown interlace method {other}"
                )));
            }
        };
        Ok(Self {
            width,
            height,
            bit_depth,
            color_type,
            interlaced,
        })
    }

    pub(crate) fn to_bytes(self) -> [u8; 13] {
        let mut out = [0u8; 13];
        out[0..4].copy_from_slice(&self.width.to_be_bytes());
        out[4..8].copy_from_slice(&self.height.to_be_bytes());
        out[8] = self.bit_depth;
        out[9] = self.color_type.code();
        out[12] = u8::from(self.interlaced);
        out
    }

    pub(crate) fn pixel_format(&self, has_transparency: bool) -> PixelFormat {
        PixelFormat {
            bit_depth: self.bit_depth,
            color_type: self.color_type,
            has_transparency,
        }
    }
}

/// PLTE entries, at most 256 and at most `2^bit_depth`.
pub(crate) fn parse_palette(data: &[u8], ihdr: &Ihdr) -> Result<Vec<[u8; 3]>, PngError> {
    if data.is_empty() || data.len() % 3 != 0 {
        return Err(PngError::malformed(
            ChunkType::PLTE,
            format!("length {} is not a positive multiple of 3", data.len()),
        ));
    }
    let entries = data.len() / 3;
    let max_entries = match ihdr.color_type {
        ColorType::Palette => 1usize << ihdr.bit_depth.min(8),
        _ => 256,
    };
    if entries > max_entries {
        return Err(PngError::malformed(
            ChunkType::PLTE,
            format!("{entries} entries exceed {max_entries}"),
        ));
    }
    Ok(data
        .chunks_exact(3)
        .map(|rgb| [rgb[0], rgb[1], rgb[2]])
        .collect())
}

/// Transparency side-channel, as declared by tRNS.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Transparency {
    /// Alpha per palette index; missing trailing entries are opaque.
    Palette(Vec<u8>),
    /// Gray sample value (at the source bit depth) that is fully transparent.
    GrayKey(u16),
    /// RGB sample triple (at the source bit depth) that is fully transparent.
    RgbKey([u16; 3]),
}

/// Parse tRNS.
///
/// Returns `Ok(None)` for chunks that must be ignored (alpha color types,
/// palette entry count exceeded); those are tolerated the way common
/// decoders tolerate them.
pub(crate) fn parse_transparency(
    data: &[u8],
    ihdr: &Ihdr,
    palette_len: Option<usize>,
) -> Result<Option<Transparency>, PngError> {
    let sample = |i: usize| u16::from_be_bytes([data[i], data[i + 1]]);
    match ihdr.color_type {
        ColorType::Palette => {
            let Some(palette_len) = palette_len else {
                return Err(PngError::malformed(ChunkType::TRNS, "appears before PLTE"));
            };
            if data.is_empty() || data.len() > palette_len {
                log::warn!(
                    "ignoring tRNS with {} entries for a {palette_len}-entry palette",
                    data.len()
                );
                return Ok(None);
            }
            Ok(Some(Transparency::Palette(data.to_vec())))
        }
        ColorType::Gray => {
            if data.len() != 2 {
                return Err(PngError::malformed(ChunkType::TRNS, "gray key must be 2 bytes"));
            }
            Ok(Some(Transparency::GrayKey(sample(0))))
        }
        ColorType::Rgb => {
            if data.len() != 6 {
                return Err(PngError::malformed(ChunkType::TRNS, "RGB key must be 6 bytes"));
            }
            Ok(Some(Transparency::RgbKey([sample(0), sample(2), sample(4)])))
        }
        ColorType::GrayAlpha | ColorType::Rgba => {
            log::warn!("ignoring tRNS on a color type that already has alpha");
            Ok(None)
        }
    }
}
