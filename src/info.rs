use crate::error::DecodeError;
use crate::normalize::TransformPlan;
use crate::pixel::PixelFormat;
use crate::png::read::ReadEngine;

/// Header summary, read without decoding pixel data.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Source format, before normalization to RGBA8.
    pub format: PixelFormat,
    /// Adam7 interlaced.
    pub interlaced: bool,
}

impl ImageInfo {
    /// Read the signature and every chunk up to the first IDAT.
    pub fn from_bytes(data: &[u8]) -> Result<Self, DecodeError> {
        let engine = ReadEngine::read_info(data)?;
        let ihdr = engine.ihdr();
        Ok(Self {
            width: ihdr.width,
            height: ihdr.height,
            format: engine.format(),
            interlaced: ihdr.interlaced,
        })
    }

    /// Steps a decode of this image runs to reach RGBA8.
    pub fn transform_plan(&self) -> TransformPlan {
        TransformPlan::for_format(self.format)
    }

    /// Byte length of the decoded RGBA8 buffer, if it fits in `usize`.
    pub fn output_len(&self) -> Option<usize> {
        crate::buffer::rgba_len(self.width, self.height)
    }
}
