//! Pixel memory and its row view.

use alloc::vec::Vec;

use crate::error::PngError;

/// One contiguous RGBA8 allocation of exactly `width * height * 4` bytes.
///
/// Rows are addressed by computed stride (`width * 4`); there is no
/// separately owned row table. Memory is committed as rows are decoded, so a
/// header that promises a large image costs nothing until its data arrives.
/// The buffer has a single owner: it is not `Clone`, and handing it over
/// ([`PixelBuffer::into_vec`]) consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    len: usize,
    width: u32,
    height: u32,
}

/// Byte length of an RGBA8 image, or `None` if it does not fit in `usize`.
pub(crate) fn rgba_len(width: u32, height: u32) -> Option<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(4))
}

impl PixelBuffer {
    /// An empty buffer for a `width` x `height` image. Nothing is allocated
    /// until the first row is written.
    pub(crate) fn new(width: u32, height: u32) -> Result<Self, PngError> {
        let len = rgba_len(width, height).ok_or(PngError::DimensionsTooLarge { width, height })?;
        Ok(Self {
            data: Vec::new(),
            len,
            width,
            height,
        })
    }

    /// Zero-extend the committed prefix to `end` bytes, growing the
    /// allocation geometrically but never past the image size.
    fn commit(&mut self, end: usize) -> Result<(), PngError> {
        if end > self.len {
            return Err(PngError::InvalidData("row outside image".into()));
        }
        if end <= self.data.len() {
            return Ok(());
        }
        if end > self.data.capacity() {
            let target = end.max(self.data.capacity().saturating_mul(2)).min(self.len);
            self.data
                .try_reserve_exact(target - self.data.len())
                .map_err(|_| PngError::AllocationFailed(target))?;
        }
        self.data.resize(end, 0);
        Ok(())
    }

    /// Commit the next row and return it for writing.
    pub(crate) fn push_row(&mut self) -> Result<&mut [u8], PngError> {
        let start = self.data.len();
        let end = start
            .checked_add(self.stride())
            .ok_or(PngError::AllocationFailed(usize::MAX))?;
        self.commit(end)?;
        Ok(&mut self.data[start..end])
    }

    /// Every row has been written.
    pub(crate) fn is_complete(&self) -> bool {
        self.data.len() == self.len
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * 4
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn row(&self, y: u32) -> Option<&[u8]> {
        let start = (y as usize).checked_mul(self.stride())?;
        self.data.get(start..start + self.stride())
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[u8]> {
        self.data.chunks_exact(self.stride())
    }

    /// Write the RGBA8 pixels of a reduced (interlace pass) row into row `y`,
    /// starting at column `x0` and stepping `dx` columns per pixel. Rows up
    /// to `y` are committed first.
    pub(crate) fn scatter_row(&mut self, y: u32, x0: u32, dx: u32, line: &[u8]) -> Result<(), PngError> {
        let stride = self.stride();
        let end = (y as usize + 1)
            .checked_mul(stride)
            .ok_or(PngError::AllocationFailed(usize::MAX))?;
        if end > self.len {
            return Err(PngError::InvalidData(alloc::format!("pass row {y} outside image")));
        }
        self.commit(end)?;
        let row = &mut self.data[end - stride..end];
        let mut x = x0 as usize * 4;
        for rgba in line.chunks_exact(4) {
            let Some(dst) = row.get_mut(x..x + 4) else {
                return Err(PngError::InvalidData("pass row wider than image".into()));
            };
            dst.copy_from_slice(rgba);
            x += dx as usize * 4;
        }
        Ok(())
    }

    /// Hand the allocation to the caller.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

/// Read-only row view over caller-owned RGBA8 pixels, used by encode.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RowsRef<'a> {
    data: &'a [u8],
    stride: usize,
}

impl<'a> RowsRef<'a> {
    /// Borrow `pixels`, which must be exactly `width * height * 4` bytes.
    pub(crate) fn new(pixels: &'a [u8], width: u32, height: u32) -> Result<Self, PngError> {
        if width == 0 || height == 0 {
            return Err(PngError::InvalidDimensions { width, height });
        }
        let needed = rgba_len(width, height).ok_or(PngError::DimensionsTooLarge { width, height })?;
        if pixels.len() != needed {
            return Err(PngError::SizeMismatch {
                needed,
                actual: pixels.len(),
            });
        }
        Ok(Self {
            data: pixels,
            stride: width as usize * 4,
        })
    }

    pub(crate) fn iter(&self) -> core::slice::ChunksExact<'a, u8> {
        self.data.chunks_exact(self.stride)
    }
}
