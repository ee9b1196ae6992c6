//! Decode side of the engine: chunk walk, streaming inflate, unfiltering.

use alloc::boxed::Box;
use alloc::format;
use alloc::vec::Vec;

use miniz_oxide::inflate::stream::{InflateState, inflate};
use miniz_oxide::{DataFormat, MZError, MZFlush, MZStatus};

use super::SIGNATURE;
use super::chunk::{Chunk, ChunkType, read_chunk};
use super::filter::unfilter;
use super::header::{Ihdr, Transparency, parse_palette, parse_transparency};
use crate::error::PngError;
use crate::io::ByteReader;
use crate::pixel::{ColorType, PixelFormat};

/// Per-call decoding state: reader position, header tables, zlib stream and
/// scanline buffers. Dropping it releases all of them.
pub(crate) struct ReadEngine<'a> {
    reader: ByteReader<'a>,
    ihdr: Ihdr,
    palette: Option<Vec<[u8; 3]>>,
    transparency: Option<Transparency>,
    inflater: Box<InflateState>,
    /// Compressed bytes of the current IDAT not yet fed to the inflater.
    pending: &'a [u8],
    /// First chunk after the IDAT run, read while looking for more data.
    lookahead: Option<(Chunk<'a>, bool)>,
    stream_ended: bool,
    bpp: usize,
    prev: Vec<u8>,
    line: Vec<u8>,
    #[cfg(test)]
    _handle: super::tracking::Handle,
}

impl<'a> ReadEngine<'a> {
    /// Validate the signature and read every chunk up to the first IDAT.
    pub(crate) fn read_info(data: &'a [u8]) -> Result<Self, PngError> {
        let mut reader = ByteReader::new(data);
        let signature = reader.read(SIGNATURE.len()).map_err(|_| PngError::InvalidSignature)?;
        if signature != SIGNATURE {
            return Err(PngError::InvalidSignature);
        }
        if reader.remaining() == 0 {
            return Err(PngError::InvalidHeader("no IHDR chunk".into()));
        }

        let (first, _) = read_chunk(&mut reader)?;
        if first.kind != ChunkType::IHDR {
            return Err(PngError::InvalidHeader(format!(
                "first chunk is {}, expected IHDR",
                first.kind
            )));
        }
        let ihdr = Ihdr::parse(first.data)?;

        let mut palette: Option<Vec<[u8; 3]>> = None;
        let mut transparency = None;
        let first_idat = loop {
            let (chunk, crc_ok) = read_chunk(&mut reader)?;
            match chunk.kind {
                ChunkType::IDAT => break chunk.data,
                ChunkType::IHDR => return Err(PngError::malformed(chunk.kind, "duplicate")),
                ChunkType::IEND => {
                    return Err(PngError::InvalidData("IEND before any IDAT".into()));
                }
                ChunkType::PLTE => {
                    if ihdr.color_type.is_gray() {
                        return Err(PngError::malformed(chunk.kind, "not allowed for grayscale"));
                    }
                    if palette.is_some() {
                        return Err(PngError::malformed(chunk.kind, "duplicate"));
                    }
                    if transparency.is_some() {
                        return Err(PngError::malformed(chunk.kind, "after tRNS"));
                    }
                    palette = Some(parse_palette(chunk.data, &ihdr)?);
                }
                ChunkType::TRNS if crc_ok => {
                    if transparency.is_some() {
                        return Err(PngError::malformed(chunk.kind, "duplicate"));
                    }
                    transparency =
                        parse_transparency(chunk.data, &ihdr, palette.as_ref().map(Vec::len))?;
                }
                kind if kind.is_critical() => {
                    return Err(PngError::Unsupported(format!("critical chunk {kind}")));
                }
                kind => skip_ancillary(kind, crc_ok),
            }
        };

        if ihdr.color_type == ColorType::Palette && palette.is_none() {
            return Err(PngError::InvalidData("palette image without PLTE".into()));
        }
        if ihdr.color_type != ColorType::Palette {
            // Suggested palettes on truecolor images carry no pixel data.
            palette = None;
        }

        let format = ihdr.pixel_format(transparency.is_some());
        Ok(Self {
            reader,
            ihdr,
            palette,
            transparency,
            inflater: InflateState::new_boxed(DataFormat::Zlib),
            pending: first_idat,
            lookahead: None,
            stream_ended: false,
            bpp: format.filter_bpp(),
            prev: Vec::new(),
            line: Vec::new(),
            #[cfg(test)]
            _handle: super::tracking::Handle::acquire(),
        })
    }

    pub(crate) fn ihdr(&self) -> &Ihdr {
        &self.ihdr
    }

    pub(crate) fn format(&self) -> PixelFormat {
        self.ihdr.pixel_format(self.transparency.is_some())
    }

    pub(crate) fn palette(&self) -> Option<&[[u8; 3]]> {
        self.palette.as_deref()
    }

    pub(crate) fn transparency(&self) -> Option<&Transparency> {
        self.transparency.as_ref()
    }

    /// Reset the scanline buffers for a pass whose rows are `row_bytes` long.
    pub(crate) fn start_pass(&mut self, row_bytes: usize) -> Result<(), PngError> {
        let line_len = row_bytes
            .checked_add(1)
            .ok_or(PngError::AllocationFailed(usize::MAX))?;
        for (buf, len) in [(&mut self.prev, row_bytes), (&mut self.line, line_len)] {
            buf.clear();
            buf.try_reserve_exact(len)
                .map_err(|_| PngError::AllocationFailed(len))?;
            buf.resize(len, 0);
        }
        Ok(())
    }

    /// Inflate and unfilter the next scanline of the current pass.
    pub(crate) fn next_row(&mut self) -> Result<&[u8], PngError> {
        let mut line = core::mem::take(&mut self.line);
        self.inflate_exact(&mut line)?;
        let Some((&mut filter, row)) = line.split_first_mut() else {
            return Err(PngError::InvalidData("scanline buffer not configured".into()));
        };
        unfilter(filter, self.bpp, &self.prev, row)?;
        self.prev.copy_from_slice(row);
        self.line = line;
        Ok(&self.prev)
    }

    /// Fill `out` completely from the zlib stream, pulling IDAT chunks as
    /// needed.
    fn inflate_exact(&mut self, out: &mut [u8]) -> Result<(), PngError> {
        let mut filled = 0;
        while filled < out.len() {
            if self.stream_ended {
                return Err(PngError::InvalidData("image data ends early".into()));
            }
            match self.inflate_step(&mut out[filled..])? {
                Some(written) => filled += written,
                None => return Err(PngError::InvalidData("not enough image data".into())),
            }
        }
        Ok(())
    }

    /// Run the inflater once into `out` and return the bytes written.
    ///
    /// The inflater may still hold output after the compressed input is
    /// used up, so the next IDAT is only fetched once a call makes no
    /// progress. `None` means the IDAT run is exhausted.
    fn inflate_step(&mut self, out: &mut [u8]) -> Result<Option<usize>, PngError> {
        loop {
            let res = inflate(&mut self.inflater, self.pending, out, MZFlush::None);
            self.pending = &self.pending[res.bytes_consumed..];
            match res.status {
                Ok(MZStatus::StreamEnd) => {
                    self.stream_ended = true;
                    return Ok(Some(res.bytes_written));
                }
                Ok(_) | Err(MZError::Buf) => {}
                Err(e) => return Err(PngError::InvalidData(format!("zlib stream: {e:?}"))),
            }
            if res.bytes_consumed > 0 || res.bytes_written > 0 {
                return Ok(Some(res.bytes_written));
            }
            if !self.pending.is_empty() {
                return Err(PngError::InvalidData("zlib stream made no progress".into()));
            }
            match self.next_idat()? {
                Some(data) => self.pending = data,
                None => return Ok(None),
            }
        }
    }

    /// Payload of the next chunk if it continues the IDAT run.
    fn next_idat(&mut self) -> Result<Option<&'a [u8]>, PngError> {
        if self.lookahead.is_some() {
            return Ok(None);
        }
        let (chunk, crc_ok) = read_chunk(&mut self.reader)?;
        if chunk.kind == ChunkType::IDAT {
            Ok(Some(chunk.data))
        } else {
            self.lookahead = Some((chunk, crc_ok));
            Ok(None)
        }
    }

    /// Drain the rest of the zlib stream and read the trailer through IEND,
    /// releasing the engine.
    pub(crate) fn finish(mut self) -> Result<(), PngError> {
        let mut scratch = [0u8; 256];
        let mut surplus = 0usize;
        while !self.stream_ended {
            match self.inflate_step(&mut scratch)? {
                Some(written) => surplus += written,
                None => {
                    log::warn!("zlib stream not terminated before end of image data");
                    break;
                }
            }
        }
        if surplus > 0 {
            log::warn!("{surplus} bytes of extra image data ignored");
        }
        if !self.pending.is_empty() {
            log::warn!("{} compressed bytes after end of zlib stream", self.pending.len());
        }
        while self.next_idat()?.is_some() {
            log::warn!("ignoring surplus IDAT chunk");
        }

        let mut next = self.lookahead.take();
        loop {
            let (chunk, crc_ok) = match next.take() {
                Some(entry) => entry,
                None => read_chunk(&mut self.reader)?,
            };
            match chunk.kind {
                ChunkType::IEND => break,
                ChunkType::IDAT => log::warn!("ignoring IDAT chunk after other chunks"),
                ChunkType::IHDR | ChunkType::PLTE => {
                    return Err(PngError::malformed(chunk.kind, "after image data"));
                }
                kind if kind.is_critical() => {
                    return Err(PngError::Unsupported(format!("critical chunk {kind}")));
                }
                kind => skip_ancillary(kind, crc_ok),
            }
        }
        if self.reader.remaining() > 0 {
            log::warn!("{} bytes after IEND ignored", self.reader.remaining());
        }
        Ok(())
    }
}

fn skip_ancillary(kind: ChunkType, crc_ok: bool) {
    if crc_ok {
        log::trace!("skipping ancillary chunk {kind}");
    } else {
        log::warn!("dropping ancillary chunk {kind} with bad CRC");
    }
}
