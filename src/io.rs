//! Bounds-checked stream adapters between the caller's buffers and the
//! chunk codec.

use alloc::vec::Vec;

use crate::error::PngError;

/// Sequential, forward-only reader over an immutable input buffer.
///
/// `offset` never exceeds the buffer length: a request that does not fit
/// fails without consuming anything.
#[derive(Debug)]
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Take the next `n` bytes, borrowed from the input.
    pub(crate) fn read(&mut self, n: usize) -> Result<&'a [u8], PngError> {
        let remaining = self.remaining();
        if n > remaining {
            return Err(PngError::OutOfBounds {
                offset: self.offset,
                requested: n,
                remaining,
            });
        }
        let bytes = &self.data[self.offset..self.offset + n];
        self.offset += n;
        Ok(bytes)
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N], PngError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read(N)?);
        Ok(out)
    }

    pub(crate) fn read_u32_be(&mut self) -> Result<u32, PngError> {
        self.read_array().map(u32::from_be_bytes)
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }
}

/// Growable, append-only in-memory sink.
///
/// Growth doubles the capacity (or jumps straight to the needed size when
/// that is larger), so appends are amortized O(1).
#[derive(Debug, Default)]
pub(crate) struct ByteWriter {
    data: Vec<u8>,
    reallocations: usize,
}

impl ByteWriter {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Result<Self, PngError> {
        let mut writer = Self::new();
        writer
            .data
            .try_reserve_exact(capacity)
            .map_err(|_| PngError::AllocationFailed(capacity))?;
        Ok(writer)
    }

    pub(crate) fn write(&mut self, bytes: &[u8]) -> Result<(), PngError> {
        let len = self.data.len();
        let capacity = self.data.capacity();
        if capacity - len < bytes.len() {
            let needed = len
                .checked_add(bytes.len())
                .ok_or(PngError::AllocationFailed(usize::MAX))?;
            let target = needed.max(capacity.saturating_mul(2));
            self.data
                .try_reserve_exact(target - len)
                .map_err(|_| PngError::AllocationFailed(target))?;
            self.reallocations += 1;
        }
        debug_assert!(self.data.capacity() - self.data.len() >= bytes.len());
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// The sink is purely in-memory.
    pub(crate) fn flush(&mut self) -> Result<(), PngError> {
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }

    /// Number of times the backing allocation has grown.
    pub(crate) fn reallocations(&self) -> usize {
        self.reallocations
    }

    pub(crate) fn into_vec(self) -> Vec<u8> {
        self.data
    }
}
