//! Encode side of the engine: filtering, streaming deflate, IDAT framing.

use alloc::boxed::Box;
use alloc::format;
use alloc::vec::Vec;

use miniz_oxide::deflate::core::{CompressorOxide, create_comp_flags_from_zip_params};
use miniz_oxide::deflate::stream::deflate;
use miniz_oxide::{MZError, MZFlush, MZStatus};

use super::SIGNATURE;
use super::chunk::{ChunkType, write_chunk};
use super::filter::{FilterType, filter_row, residual_cost};
use super::header::Ihdr;
use crate::encode::FilterStrategy;
use crate::error::PngError;
use crate::io::ByteWriter;

/// Largest IDAT payload emitted.
pub(crate) const IDAT_SIZE: usize = 32 * 1024;

/// zlib window size (2^15), positive so the stream carries a zlib header.
const WINDOW_BITS: i32 = 15;

/// Per-call encoding state. Dropping it releases the compressor and all
/// scratch buffers.
pub(crate) struct WriteEngine {
    writer: ByteWriter,
    compressor: Box<CompressorOxide>,
    strategy: FilterStrategy,
    bpp: usize,
    prev: Vec<u8>,
    /// Filter byte followed by the chosen residuals.
    line: Vec<u8>,
    /// Candidate residuals while searching filters.
    trial: Vec<u8>,
    idat: Vec<u8>,
    idat_len: usize,
    #[cfg(test)]
    _handle: super::tracking::Handle,
}

impl WriteEngine {
    /// Create the compressor and emit the signature and IHDR.
    pub(crate) fn write_info(
        ihdr: &Ihdr,
        level: u8,
        strategy: FilterStrategy,
        size_hint: usize,
    ) -> Result<Self, PngError> {
        let format = ihdr.pixel_format(false);
        let row_bytes = format
            .row_bytes(ihdr.width as usize)
            .ok_or(PngError::DimensionsTooLarge {
                width: ihdr.width,
                height: ihdr.height,
            })?;

        let mut writer = ByteWriter::with_capacity(size_hint)?;
        writer.write(&SIGNATURE)?;
        write_chunk(&mut writer, ChunkType::IHDR, &ihdr.to_bytes())?;

        let flags = create_comp_flags_from_zip_params(i32::from(level), WINDOW_BITS, 0);
        Ok(Self {
            writer,
            compressor: Box::new(CompressorOxide::new(flags)),
            strategy,
            bpp: format.filter_bpp(),
            prev: zeroed(row_bytes)?,
            line: zeroed(row_bytes + 1)?,
            trial: zeroed(row_bytes)?,
            idat: zeroed(IDAT_SIZE)?,
            idat_len: 0,
            #[cfg(test)]
            _handle: super::tracking::Handle::acquire(),
        })
    }

    /// Filter and compress one scanline.
    pub(crate) fn write_row(&mut self, row: &[u8]) -> Result<(), PngError> {
        if row.len() != self.prev.len() {
            return Err(PngError::SizeMismatch {
                needed: self.prev.len(),
                actual: row.len(),
            });
        }
        let filter = match self.strategy {
            FilterStrategy::None => FilterType::None,
            FilterStrategy::Sub => FilterType::Sub,
            FilterStrategy::Up => FilterType::Up,
            FilterStrategy::Average => FilterType::Average,
            FilterStrategy::Paeth => FilterType::Paeth,
            FilterStrategy::Adaptive => self.pick_filter(row),
        };
        self.line[0] = filter as u8;
        filter_row(filter, self.bpp, &self.prev, row, &mut self.line[1..]);
        self.prev.copy_from_slice(row);

        let line = core::mem::take(&mut self.line);
        let result = self.compress(&line, false);
        self.line = line;
        result
    }

    fn pick_filter(&mut self, row: &[u8]) -> FilterType {
        let mut best = (FilterType::None, u64::MAX);
        for filter in FilterType::ALL {
            filter_row(filter, self.bpp, &self.prev, row, &mut self.trial);
            let cost = residual_cost(&self.trial);
            if cost < best.1 {
                best = (filter, cost);
            }
        }
        best.0
    }

    fn compress(&mut self, mut input: &[u8], finish: bool) -> Result<(), PngError> {
        let flush = if finish { MZFlush::Finish } else { MZFlush::None };
        loop {
            let res = deflate(
                &mut self.compressor,
                input,
                &mut self.idat[self.idat_len..],
                flush,
            );
            input = &input[res.bytes_consumed..];
            self.idat_len += res.bytes_written;
            if self.idat_len == self.idat.len() {
                self.flush_idat()?;
            }
            let progressed = res.bytes_consumed > 0 || res.bytes_written > 0;
            match res.status {
                Ok(MZStatus::StreamEnd) => return Ok(()),
                Ok(_) | Err(MZError::Buf) if !finish && input.is_empty() => return Ok(()),
                Ok(_) | Err(MZError::Buf) if progressed => {}
                Ok(_) | Err(MZError::Buf) => {
                    return Err(PngError::InvalidData("deflate made no progress".into()));
                }
                Err(e) => return Err(PngError::InvalidData(format!("deflate failed: {e:?}"))),
            }
        }
    }

    fn flush_idat(&mut self) -> Result<(), PngError> {
        if self.idat_len > 0 {
            write_chunk(&mut self.writer, ChunkType::IDAT, &self.idat[..self.idat_len])?;
            self.idat_len = 0;
        }
        Ok(())
    }

    /// Finish the zlib stream, write the last IDAT and IEND, and hand the
    /// encoded bytes over.
    pub(crate) fn finish(mut self) -> Result<Vec<u8>, PngError> {
        self.compress(&[], true)?;
        self.flush_idat()?;
        write_chunk(&mut self.writer, ChunkType::IEND, &[])?;
        self.writer.flush()?;
        log::trace!(
            "encoder output {} bytes after {} reallocations",
            self.writer.len(),
            self.writer.reallocations()
        );
        Ok(self.writer.into_vec())
    }
}

fn zeroed(len: usize) -> Result<Vec<u8>, PngError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| PngError::AllocationFailed(len))?;
    buf.resize(len, 0);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixel::ColorType;

    fn rgba_header(width: u32, height: u32) -> Ihdr {
        Ihdr {
            width,
            height,
            bit_depth: 8,
            color_type: ColorType::Rgba,
            interlaced: false,
        }
    }

    #[test]
    fn stream_layout() {
        let ihdr = rgba_header(2, 1);
        let mut engine = WriteEngine::write_info(&ihdr, 6, FilterStrategy::Adaptive, 0).unwrap();
        engine.write_row(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let out = engine.finish().unwrap();
        assert_eq!(&out[..8], &SIGNATURE);
        assert_eq!(&out[12..16], b"IHDR");
        assert_eq!(&out[37..41], b"IDAT");
        assert_eq!(&out[out.len() - 8..out.len() - 4], b"IEND");
    }

    #[test]
    fn rejects_wrong_row_length() {
        let ihdr = rgba_header(2, 1);
        let mut engine = WriteEngine::write_info(&ihdr, 6, FilterStrategy::None, 0).unwrap();
        assert!(matches!(
            engine.write_row(&[0; 7]),
            Err(PngError::SizeMismatch { needed: 8, actual: 7 })
        ));
    }

    #[test]
    fn large_images_split_idat() {
        let ihdr = rgba_header(256, 256);
        let mut engine = WriteEngine::write_info(&ihdr, 0, FilterStrategy::None, 0).unwrap();
        let mut state = 0x1234_5678u32;
        let mut row = vec![0u8; 256 * 4];
        for _ in 0..256 {
            for b in row.iter_mut() {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                *b = state as u8;
            }
            engine.write_row(&row).unwrap();
        }
        let out = engine.finish().unwrap();
        let idats = out.windows(4).filter(|w| *w == b"IDAT").count();
        assert!(idats > 1, "expected several IDAT chunks, got {idats}");
    }
}
