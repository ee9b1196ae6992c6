//! C ABI.
//!
//! Both entry points return a [`BarePngStatus`]. On success they fill a
//! [`BarePngBuffer`] whose bytes belong to the caller until it invokes the
//! buffer's `release` callback, exactly once, with the same `data` and
//! `len`. On failure they fill the optional [`BarePngError`] with the kind
//! and a NUL-terminated message, and leave the output untouched.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::ffi::c_char;
use core::ptr;

use crate::error::{ErrorKind, MAX_MESSAGE_LEN};
use crate::{DecodeRequest, EncodeRequest};

/// Result of a C ABI call.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BarePngStatus {
    Ok = 0,
    /// A required pointer argument was null.
    NullPointer = 1,
    Bounds = 2,
    Format = 3,
    Allocation = 4,
    InvalidInput = 5,
}

impl From<ErrorKind> for BarePngStatus {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Bounds => Self::Bounds,
            ErrorKind::Format => Self::Format,
            ErrorKind::Allocation => Self::Allocation,
            ErrorKind::InvalidInput => Self::InvalidInput,
        }
    }
}

/// Release callback carried by every handed-off buffer.
pub type BarePngRelease = unsafe extern "C" fn(data: *mut u8, len: usize);

/// Bytes owned by the caller after a successful call.
#[repr(C)]
#[derive(Debug)]
pub struct BarePngBuffer {
    pub data: *mut u8,
    pub len: usize,
    /// Frees `data`. Must be called exactly once.
    pub release: Option<BarePngRelease>,
}

impl BarePngBuffer {
    const EMPTY: Self = Self {
        data: ptr::null_mut(),
        len: 0,
        release: None,
    };

    fn hand_off(bytes: Vec<u8>) -> Self {
        let boxed: Box<[u8]> = bytes.into_boxed_slice();
        let len = boxed.len();
        Self {
            data: Box::into_raw(boxed).cast::<u8>(),
            len,
            release: Some(release_boxed),
        }
    }
}

/// Decoded RGBA8 image: `pixels.len == width * height * 4`.
#[repr(C)]
#[derive(Debug)]
pub struct BarePngImage {
    pub width: u32,
    pub height: u32,
    pub pixels: BarePngBuffer,
}

/// Failure detail: kind plus a NUL-terminated message.
#[repr(C)]
#[derive(Debug)]
pub struct BarePngError {
    pub status: BarePngStatus,
    pub message: [c_char; MAX_MESSAGE_LEN + 1],
}

unsafe extern "C" fn release_boxed(data: *mut u8, len: usize) {
    if data.is_null() {
        return;
    }
    // SAFETY: `data`/`len` came from `Box::into_raw` on a `Box<[u8]>` of
    // exactly `len` bytes in `hand_off`, and the caller releases it once.
    drop(unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(data, len)) });
}

/// Release `buffer` through its callback and clear it, so a second call on
/// the same struct is a no-op.
///
/// # Safety
///
/// `buffer` is null or points to a `BarePngBuffer` filled by this library.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bare_png_buffer_release(buffer: *mut BarePngBuffer) {
    // SAFETY: caller contract.
    let Some(buffer) = (unsafe { buffer.as_mut() }) else {
        return;
    };
    let taken = core::mem::replace(buffer, BarePngBuffer::EMPTY);
    if let Some(release) = taken.release {
        // SAFETY: the buffer was produced by `hand_off` and has just been
        // cleared, so this is its only release.
        unsafe { release(taken.data, taken.len) };
    }
}

/// Fill `error` with `status` and a NUL-terminated copy of `message`.
///
/// # Safety
///
/// `error` is null or valid for writes of one `BarePngError`.
unsafe fn report(error: *mut BarePngError, status: BarePngStatus, message: &str) -> BarePngStatus {
    // SAFETY: caller contract.
    if let Some(error) = unsafe { error.as_mut() } {
        error.status = status;
        error.message = [0; MAX_MESSAGE_LEN + 1];
        for (dst, &src) in error.message.iter_mut().zip(message.as_bytes().iter().take(MAX_MESSAGE_LEN)) {
            *dst = src as c_char;
        }
    }
    status
}

/// Borrow `len` bytes at `data`; a null pointer is accepted only for `len == 0`.
///
/// # Safety
///
/// Non-null `data` is valid for reads of `len` bytes for `'a`.
unsafe fn input<'a>(data: *const u8, len: usize) -> Option<&'a [u8]> {
    if data.is_null() {
        return (len == 0).then_some(&[][..]);
    }
    // SAFETY: caller contract.
    Some(unsafe { core::slice::from_raw_parts(data, len) })
}

/// Decode a PNG stream to RGBA8.
///
/// # Safety
///
/// - `data` is valid for reads of `len` bytes (or null when `len == 0`).
/// - `out` is valid for writes of one `BarePngImage`.
/// - `error` is null or valid for writes of one `BarePngError`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bare_png_decode(
    data: *const u8,
    len: usize,
    out: *mut BarePngImage,
    error: *mut BarePngError,
) -> BarePngStatus {
    // SAFETY: caller contract.
    let Some(input) = (unsafe { input(data, len) }) else {
        // SAFETY: caller contract on `error`.
        return unsafe { report(error, BarePngStatus::NullPointer, "input pointer is null") };
    };
    if out.is_null() {
        // SAFETY: caller contract on `error`.
        return unsafe { report(error, BarePngStatus::NullPointer, "output pointer is null") };
    }
    match DecodeRequest::new(input).decode() {
        Ok(image) => {
            let (width, height) = (image.width, image.height);
            let pixels = BarePngBuffer::hand_off(image.into_pixels());
            // SAFETY: `out` is non-null and valid for writes.
            unsafe {
                out.write(BarePngImage {
                    width,
                    height,
                    pixels,
                })
            };
            BarePngStatus::Ok
        }
        // SAFETY: caller contract on `error`.
        Err(err) => unsafe { report(error, err.kind().into(), err.message()) },
    }
}

/// Encode RGBA8 pixels to PNG.
///
/// `level` is the zlib compression level, 0 to 10; larger values are
/// clamped.
///
/// # Safety
///
/// - `pixels` is valid for reads of `len` bytes (or null when `len == 0`).
/// - `out` is valid for writes of one `BarePngBuffer`.
/// - `error` is null or valid for writes of one `BarePngError`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn bare_png_encode(
    pixels: *const u8,
    len: usize,
    width: u32,
    height: u32,
    level: u32,
    out: *mut BarePngBuffer,
    error: *mut BarePngError,
) -> BarePngStatus {
    // SAFETY: caller contract.
    let Some(input) = (unsafe { input(pixels, len) }) else {
        // SAFETY: caller contract on `error`.
        return unsafe { report(error, BarePngStatus::NullPointer, "pixel pointer is null") };
    };
    if out.is_null() {
        // SAFETY: caller contract on `error`.
        return unsafe { report(error, BarePngStatus::NullPointer, "output pointer is null") };
    }
    let level = u8::try_from(level).unwrap_or(u8::MAX);
    match EncodeRequest::new()
        .with_compression(level)
        .encode(input, width, height)
    {
        Ok(encoded) => {
            // SAFETY: `out` is non-null and valid for writes.
            unsafe { out.write(BarePngBuffer::hand_off(encoded)) };
            BarePngStatus::Ok
        }
        // SAFETY: caller contract on `error`.
        Err(err) => unsafe { report(error, err.kind().into(), err.message()) },
    }
}
