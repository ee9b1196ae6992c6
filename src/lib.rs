//! # bare-png
//!
//! PNG decoder to canonical RGBA8 and RGBA8 PNG encoder.
//!
//! ## Decoding
//!
//! Every legal PNG color type and bit depth (gray 1/2/4/8/16, gray+alpha,
//! palette 1/2/4/8, RGB, RGBA, with or without tRNS, Adam7 or not) decodes
//! to four interleaved 8-bit channels per pixel, row-major, no padding.
//! The conversion is an explicit [`TransformPlan`] of ordered, predicate
//! guarded [`Transform`] steps:
//!
//! 1. 16-bit samples keep their high byte
//! 2. palette indices expand to RGB
//! 3. 1/2/4-bit gray scales up to 8 bits
//! 4. tRNS becomes an alpha channel
//! 5. images still without alpha get an opaque one
//! 6. gray replicates into RGB
//!
//! Image data is inflated one scanline at a time, and the stream is read
//! through IEND, so truncation anywhere is an error.
//!
//! ## Encoding
//!
//! Input is always RGBA8. Output is a non-interlaced 8-bit RGBA PNG with
//! configurable zlib level and filter strategy.
//!
//! ## Errors
//!
//! Faults propagate as `Result` and surface once, as a [`DecodeError`] or
//! [`EncodeError`] carrying an [`ErrorKind`] and a message of at most
//! [`MAX_MESSAGE_LEN`] bytes. Every resource held by a failed call is
//! released before it returns.
//!
//! ## Non-Goals
//!
//! - Animated PNG, color management, gamma
//! - Text and other metadata chunks (skipped)
//! - Encoding anything other than RGBA8
//!
//! ## Usage
//!
//! ```no_run
//! use bare_png::{EncodeRequest, FilterStrategy, ImageInfo};
//!
//! let data: &[u8] = &[]; // your PNG bytes
//!
//! // Read the header without decoding
//! let info = ImageInfo::from_bytes(data)?;
//! println!("{}x{} {:?}", info.width, info.height, info.format);
//!
//! let image = bare_png::decode(data)?;
//! assert_eq!(image.pixels().len(), image.width as usize * image.height as usize * 4);
//!
//! let png = EncodeRequest::new()
//!     .with_compression(9)
//!     .with_filter(FilterStrategy::Paeth)
//!     .encode(image.pixels(), image.width, image.height)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Features
//!
//! - `std`: `std::error::Error` integration through `thiserror`
//! - `rgb`, `imgref`: typed [`rgb::RGBA8`] and [`imgref::ImgRef`] access
//! - `ffi`: the `bare_png_decode` / `bare_png_encode` C ABI

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![cfg_attr(not(feature = "ffi"), forbid(unsafe_code))]
#![cfg_attr(feature = "ffi", deny(unsafe_code))]

extern crate alloc;

mod buffer;
mod decode;
mod encode;
mod error;
mod info;
mod io;
mod limits;
mod normalize;
mod pixel;
mod png;

#[cfg(feature = "ffi")]
#[allow(unsafe_code)]
pub mod ffi;

#[cfg(test)]
mod testutil;

use alloc::vec::Vec;

// Re-exports
pub use buffer::PixelBuffer;
pub use decode::{DecodeRequest, DecodedImage};
pub use encode::{EncodeRequest, FilterStrategy, MAX_COMPRESSION};
pub use error::{DecodeError, EncodeError, ErrorKind, MAX_MESSAGE_LEN, PngError};
pub use info::ImageInfo;
pub use limits::Limits;
pub use normalize::{Transform, TransformPlan};
pub use pixel::{ColorType, PixelFormat};

/// Decode a PNG stream to RGBA8 with default settings.
pub fn decode(data: &[u8]) -> Result<DecodedImage, DecodeError> {
    DecodeRequest::new(data).decode()
}

/// Encode `width * height` RGBA8 pixels with default settings (level 6,
/// adaptive filtering).
pub fn encode(pixels: &[u8], width: u32, height: u32) -> Result<Vec<u8>, EncodeError> {
    EncodeRequest::new().encode(pixels, width, height)
}

/// Encode typed RGBA8 pixels.
#[cfg(feature = "rgb")]
pub fn encode_rgba(pixels: &[rgb::RGBA8], width: u32, height: u32) -> Result<Vec<u8>, EncodeError> {
    use rgb::ComponentBytes as _;
    encode(pixels.as_bytes(), width, height)
}

/// Encode an [`imgref::ImgRef`], honoring its stride.
#[cfg(feature = "imgref")]
pub fn encode_imgref(image: imgref::ImgRef<'_, rgb::RGBA8>) -> Result<Vec<u8>, EncodeError> {
    use rgb::ComponentBytes as _;
    let (width, height) = (image.width(), image.height());
    let dims = u32::try_from(width).ok().zip(u32::try_from(height).ok());
    let Some((w, h)) = dims else {
        return Err(PngError::DimensionsOutOfRange { width, height }.into());
    };
    let len = buffer::rgba_len(w, h).ok_or(PngError::DimensionsTooLarge { width: w, height: h })?;
    let mut packed = Vec::new();
    packed
        .try_reserve_exact(len)
        .map_err(|_| PngError::AllocationFailed(len))?;
    for row in image.rows() {
        packed.extend_from_slice(row.as_bytes());
    }
    encode(&packed, w, h)
}
