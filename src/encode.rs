use alloc::vec::Vec;

use crate::buffer::RowsRef;
use crate::error::{EncodeError, PngError};
use crate::pixel::ColorType;
use crate::png::header::{Ihdr, MAX_DIMENSION};
use crate::png::write::WriteEngine;

/// Per-row filter selection.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FilterStrategy {
    None,
    Sub,
    Up,
    Average,
    Paeth,
    /// Per row, the filter whose residuals have the smallest sum of
    /// absolute (signed) values.
    #[default]
    Adaptive,
}

/// Highest accepted compression level.
pub const MAX_COMPRESSION: u8 = 10;

/// Encode request builder.
///
/// Input pixels are always 8-bit RGBA, row-major, without padding. The
/// output is a non-interlaced RGBA8 PNG.
#[derive(Clone, Debug)]
pub struct EncodeRequest {
    compression: u8,
    filter: FilterStrategy,
}

impl Default for EncodeRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl EncodeRequest {
    pub fn new() -> Self {
        Self {
            compression: 6,
            filter: FilterStrategy::Adaptive,
        }
    }

    /// zlib compression level, 0 (stored) to 10. Larger values are clamped.
    pub fn with_compression(mut self, level: u8) -> Self {
        self.compression = level.min(MAX_COMPRESSION);
        self
    }

    pub fn with_filter(mut self, filter: FilterStrategy) -> Self {
        self.filter = filter;
        self
    }

    /// Encode `pixels` (`width * height * 4` bytes) into a complete PNG.
    pub fn encode(&self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, EncodeError> {
        self.run(pixels, width, height).map_err(|err| {
            log::debug!("encode failed: {err}");
            EncodeError::from(err)
        })
    }

    fn run(&self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, PngError> {
        // ValidateInputs
        let rows = RowsRef::new(pixels, width, height)?;
        if width > MAX_DIMENSION || height > MAX_DIMENSION {
            return Err(PngError::DimensionsTooLarge { width, height });
        }

        // BuildHeader
        let ihdr = Ihdr {
            width,
            height,
            bit_depth: 8,
            color_type: ColorType::Rgba,
            interlaced: false,
        };
        log::debug!(
            "encoding {width}x{height} RGBA8, level {}, filter {:?}",
            self.compression,
            self.filter
        );

        // ConfigureEngine
        let mut engine = WriteEngine::write_info(
            &ihdr,
            self.compression,
            self.filter,
            size_hint(pixels.len(), self.compression),
        )?;

        // WritePixelRows
        for row in rows.iter() {
            engine.write_row(row)?;
        }

        // WriteTrailer, ReleaseEngineHandles
        let encoded = engine.finish()?;
        log::debug!("encoded {} bytes", encoded.len());
        Ok(encoded)
    }
}

/// Initial output capacity guess. The writer grows past it as needed.
fn size_hint(raw_len: usize, level: u8) -> usize {
    let estimate = if level == 0 { raw_len + raw_len / 8 } else { raw_len / 2 };
    estimate.clamp(64, 1 << 20)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::png::tracking::live_engines;

    #[test]
    fn zero_dimensions_are_invalid_input() {
        for (w, h) in [(0, 1), (1, 0), (0, 0)] {
            let err = EncodeRequest::new().encode(&[], w, h).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidInput, "{w}x{h}");
        }
    }

    #[test]
    fn length_mismatch_is_invalid_input() {
        let err = EncodeRequest::new().encode(&[0; 15], 2, 2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.message().contains("need 16"));
    }

    #[test]
    fn compression_is_clamped() {
        let req = EncodeRequest::new().with_compression(200);
        assert_eq!(req.compression, MAX_COMPRESSION);
        let png = req.encode(&[1, 2, 3, 4], 1, 1).unwrap();
        assert_eq!(crate::decode(&png).unwrap().pixels(), &[1, 2, 3, 4]);
    }

    #[test]
    fn engine_released_on_success() {
        let before = live_engines();
        let png = EncodeRequest::new().encode(&[9; 4 * 6], 3, 2).unwrap();
        assert_eq!(live_engines(), before);
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn stored_level_is_not_smaller_than_input() {
        let pixels: Vec<u8> = (0..64 * 64 * 4).map(|i| (i % 251) as u8).collect();
        let stored = EncodeRequest::new()
            .with_compression(0)
            .with_filter(FilterStrategy::None)
            .encode(&pixels, 64, 64)
            .unwrap();
        let best = EncodeRequest::new()
            .with_compression(9)
            .encode(&pixels, 64, 64)
            .unwrap();
        assert!(stored.len() > pixels.len());
        assert!(best.len() < stored.len());
    }
}
