use alloc::format;

use crate::error::PngError;

/// Resource limits applied to a decode before any pixel memory is allocated.
///
/// All fields default to `None`: only the PNG format's own 2^31-1 dimension
/// cap applies.
#[derive(Clone, Debug, Default)]
pub struct Limits {
    pub max_width: Option<u64>,
    pub max_height: Option<u64>,
    /// Maximum pixel count (width * height).
    pub max_pixels: Option<u64>,
    /// Maximum bytes for the RGBA8 output buffer.
    pub max_memory_bytes: Option<u64>,
}

fn enforce(what: &str, value: u64, limit: Option<u64>) -> Result<(), PngError> {
    match limit {
        Some(max) if value > max => Err(PngError::LimitExceeded(format!(
            "{what} {value} exceeds limit {max}"
        ))),
        _ => Ok(()),
    }
}

impl Limits {
    /// Reject an image whose declared geometry, or the RGBA8 buffer it
    /// would need, is over a limit.
    pub(crate) fn check(&self, width: u32, height: u32) -> Result<(), PngError> {
        let (width, height) = (u64::from(width), u64::from(height));
        enforce("width", width, self.max_width)?;
        enforce("height", height, self.max_height)?;
        enforce("pixel count", width * height, self.max_pixels)?;
        enforce("output buffer size", width * height * 4, self.max_memory_bytes)
    }
}
