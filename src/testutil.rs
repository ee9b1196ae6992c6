//! Synthetic PNG streams for unit tests.
//!
//! [`TestPng`] serializes per-sample values (one `u16` per channel, at the
//! declared bit depth) into any legal color type, depth and interlace
//! method, and computes the RGBA8 a decoder must produce for them straight
//! from the PNG rules, without going through the transform plan.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::io::ByteWriter;
use crate::pixel::ColorType;
use crate::png::SIGNATURE;
use crate::png::chunk::{ChunkType, write_chunk};
use crate::png::header::Ihdr;
use crate::png::interlace::{ADAM7, PROGRESSIVE, Pass};

#[derive(Clone, Debug)]
pub(crate) struct TestPng {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: ColorType,
    pub interlaced: bool,
    pub palette: Option<Vec<[u8; 3]>>,
    pub trns: Option<Vec<u8>>,
    /// Ancillary chunks written between IHDR and IDAT.
    pub ancillary: Vec<([u8; 4], Vec<u8>)>,
    /// Largest IDAT payload; the zlib stream is split across chunks.
    pub idat_split: usize,
}

impl TestPng {
    pub(crate) fn new(width: u32, height: u32, bit_depth: u8, color_type: ColorType) -> Self {
        Self {
            width,
            height,
            bit_depth,
            color_type,
            interlaced: false,
            palette: None,
            trns: None,
            ancillary: Vec::new(),
            idat_split: 1 << 20,
        }
    }

    pub(crate) fn interlaced(mut self) -> Self {
        self.interlaced = true;
        self
    }

    pub(crate) fn palette(mut self, entries: &[[u8; 3]]) -> Self {
        self.palette = Some(entries.to_vec());
        self
    }

    pub(crate) fn trns(mut self, data: &[u8]) -> Self {
        self.trns = Some(data.to_vec());
        self
    }

    pub(crate) fn channels(&self) -> usize {
        self.color_type.channels()
    }

    /// Deterministic pseudo-random samples that are legal at this depth
    /// (palette indices stay below the palette length).
    pub(crate) fn noise(&self, seed: u32) -> Vec<u16> {
        let count = self.width as usize * self.height as usize * self.channels();
        let max = match (&self.palette, self.color_type) {
            (Some(p), ColorType::Palette) => p.len() as u32,
            _ => 1u32 << self.bit_depth,
        };
        let mut state = seed | 1;
        (0..count)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state % max) as u16
            })
            .collect()
    }

    fn ihdr(&self) -> Ihdr {
        Ihdr {
            width: self.width,
            height: self.height,
            bit_depth: self.bit_depth,
            color_type: self.color_type,
            interlaced: self.interlaced,
        }
    }

    /// Filtered (filter type 0) scanlines of every pass, concatenated.
    pub(crate) fn raw_scanlines(&self, samples: &[u16]) -> Vec<u8> {
        let c = self.channels();
        let passes: &[Pass] = if self.interlaced { &ADAM7 } else { &[PROGRESSIVE] };
        let mut raw = Vec::new();
        for pass in passes {
            let (pw, ph) = pass.size(self.width, self.height);
            if pw == 0 {
                continue;
            }
            for py in 0..ph {
                let y = pass.y0 + py * pass.dy;
                let mut row = Vec::with_capacity(pw as usize * c);
                for px in 0..pw {
                    let x = pass.x0 + px * pass.dx;
                    let at = (y as usize * self.width as usize + x as usize) * c;
                    row.extend_from_slice(&samples[at..at + c]);
                }
                raw.push(0);
                raw.extend(pack(&row, self.bit_depth));
            }
        }
        raw
    }

    /// Serialize a complete stream.
    pub(crate) fn build(&self, samples: &[u16]) -> Vec<u8> {
        let zlib = miniz_oxide::deflate::compress_to_vec_zlib(&self.raw_scanlines(samples), 6);
        self.build_from_zlib(&zlib)
    }

    /// Serialize a stream around an arbitrary zlib payload.
    pub(crate) fn build_from_zlib(&self, zlib: &[u8]) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write(&SIGNATURE).unwrap();
        write_chunk(&mut w, ChunkType::IHDR, &self.ihdr().to_bytes()).unwrap();
        for (kind, data) in &self.ancillary {
            write_chunk(&mut w, ChunkType(*kind), data).unwrap();
        }
        if let Some(palette) = &self.palette {
            let flat: Vec<u8> = palette.iter().flatten().copied().collect();
            write_chunk(&mut w, ChunkType::PLTE, &flat).unwrap();
        }
        if let Some(trns) = &self.trns {
            write_chunk(&mut w, ChunkType::TRNS, trns).unwrap();
        }
        for part in zlib.chunks(self.idat_split.max(1)) {
            write_chunk(&mut w, ChunkType::IDAT, part).unwrap();
        }
        write_chunk(&mut w, ChunkType::IEND, &[]).unwrap();
        w.into_vec()
    }

    /// RGBA8 a conforming decoder yields for `samples`.
    pub(crate) fn expected_rgba(&self, samples: &[u16]) -> Vec<u8> {
        let depth = self.bit_depth;
        let to8 = |v: u16| -> u8 {
            match depth {
                16 => (v >> 8) as u8,
                8 => v as u8,
                d => (u32::from(v) * 255 / ((1u32 << d) - 1)) as u8,
            }
        };
        let key = |i: usize| -> Option<u16> {
            let t = self.trns.as_ref()?;
            Some(u16::from_be_bytes([t[2 * i], t[2 * i + 1]]))
        };
        let mut out = Vec::with_capacity(samples.len() * 4);
        for px in samples.chunks_exact(self.channels()) {
            let rgba = match self.color_type {
                ColorType::Gray => {
                    let g = to8(px[0]);
                    let a = if key(0) == Some(px[0]) { 0 } else { 255 };
                    [g, g, g, a]
                }
                ColorType::GrayAlpha => {
                    let g = to8(px[0]);
                    [g, g, g, to8(px[1])]
                }
                ColorType::Rgb => {
                    let transparent = (0..3).all(|i| key(i) == Some(px[i]));
                    [to8(px[0]), to8(px[1]), to8(px[2]), if transparent { 0 } else { 255 }]
                }
                ColorType::Rgba => [to8(px[0]), to8(px[1]), to8(px[2]), to8(px[3])],
                ColorType::Palette => {
                    let i = usize::from(px[0]);
                    let [r, g, b] = self
                        .palette
                        .as_ref()
                        .and_then(|p| p.get(i).copied())
                        .unwrap_or([0, 0, 0]);
                    let a = self
                        .trns
                        .as_ref()
                        .and_then(|t| t.get(i).copied())
                        .unwrap_or(255);
                    [r, g, b, a]
                }
            };
            out.extend_from_slice(&rgba);
        }
        out
    }
}

/// Pack samples MSB-first at `depth` bits, padding the last byte.
fn pack(samples: &[u16], depth: u8) -> Vec<u8> {
    match depth {
        16 => samples.iter().flat_map(|s| s.to_be_bytes()).collect(),
        8 => samples.iter().map(|&s| s as u8).collect(),
        d => {
            let per_byte = 8 / usize::from(d);
            samples
                .chunks(per_byte)
                .map(|group| {
                    group.iter().enumerate().fold(0u8, |byte, (i, &s)| {
                        byte | ((s as u8) << (8 - usize::from(d) * (i + 1)))
                    })
                })
                .collect()
        }
    }
}

/// A single serialized chunk, for splicing into a built stream.
pub(crate) fn chunk_bytes(kind: [u8; 4], data: &[u8]) -> Vec<u8> {
    let mut w = ByteWriter::new();
    write_chunk(&mut w, ChunkType(kind), data).unwrap();
    w.into_vec()
}

std::thread_local! {
    static RECORDS: RefCell<Option<Vec<(log::Level, String)>>> = const { RefCell::new(None) };
}

struct Capture;

impl log::Log for Capture {
    fn enabled(&self, _: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        RECORDS.with(|records| {
            if let Some(records) = records.borrow_mut().as_mut() {
                records.push((record.level(), record.args().to_string()));
            }
        });
    }

    fn flush(&self) {}
}

static CAPTURE: Capture = Capture;
static INSTALL: std::sync::Once = std::sync::Once::new();

/// Run `f`, returning its result and the log records it emitted on this
/// thread.
pub(crate) fn capture_logs<T>(f: impl FnOnce() -> T) -> (T, Vec<(log::Level, String)>) {
    INSTALL.call_once(|| {
        if log::set_logger(&CAPTURE).is_ok() {
            log::set_max_level(log::LevelFilter::Trace);
        }
    });
    RECORDS.with(|records| *records.borrow_mut() = Some(Vec::new()));
    let out = f();
    let records = RECORDS.with(|records| records.borrow_mut().take()).unwrap_or_default();
    (out, records)
}
