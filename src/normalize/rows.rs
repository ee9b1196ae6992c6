//! Row-at-a-time execution of a [`TransformPlan`].

use alloc::vec::Vec;

use super::{Layout, Transform, TransformPlan};
use crate::error::PngError;
use crate::png::header::Transparency;

/// Read sample `index` of an unfiltered scanline at `depth` bits per sample.
fn sample_at(row: &[u8], depth: u8, index: usize) -> u16 {
    match depth {
        16 => u16::from_be_bytes([row[2 * index], row[2 * index + 1]]),
        8 => u16::from(row[index]),
        _ => {
            let depth = usize::from(depth);
            let per_byte = 8 / depth;
            let shift = 8 - depth * (index % per_byte + 1);
            let mask = (1u16 << depth) - 1;
            (u16::from(row[index / per_byte]) >> shift) & mask
        }
    }
}

/// Unpack `out.len()` samples of 1, 2, 4 or 8 bits into one byte each,
/// multiplied by `scale`.
fn unpack_samples(depth: u8, scale: u8, packed: &[u8], out: &mut [u8]) {
    if depth == 8 {
        out.copy_from_slice(&packed[..out.len()]);
        return;
    }
    for (i, o) in out.iter_mut().enumerate() {
        *o = (sample_at(packed, depth, i) as u8).wrapping_mul(scale);
    }
}

/// Scale factor mapping the largest `depth`-bit gray value to 255.
fn gray_scale(depth: u8) -> u8 {
    match depth {
        1 => 0xFF,
        2 => 0x55,
        4 => 0x11,
        _ => 1,
    }
}

/// Two ping-pong row buffers reused across every row of one decode.
#[derive(Debug, Default)]
pub(crate) struct RowScratch {
    front: Vec<u8>,
    back: Vec<u8>,
}

enum AlphaSource {
    None,
    /// 256 alpha values, one per palette index.
    Palette(Vec<u8>),
    GrayKey(u16),
    RgbKey([u16; 3]),
}

/// A plan bound to the palette and transparency tables of one image.
pub(crate) struct RowTransformer {
    plan: TransformPlan,
    /// 256 entries; indices past the PLTE length read as black.
    palette: Vec<[u8; 3]>,
    alpha: AlphaSource,
}

impl RowTransformer {
    pub(crate) fn new(
        plan: TransformPlan,
        palette: Option<&[[u8; 3]]>,
        transparency: Option<&Transparency>,
    ) -> Result<Self, PngError> {
        if !plan.yields_rgba8() {
            return Err(PngError::Unsupported(alloc::format!(
                "no RGBA8 conversion for {:?}",
                plan.source()
            )));
        }
        let mut table = Vec::new();
        match palette {
            Some(entries) => {
                table.extend_from_slice(entries);
                table.resize(256, [0, 0, 0]);
            }
            None if plan.steps().contains(&Transform::PaletteToRgb) => {
                return Err(PngError::InvalidData("palette image without PLTE".into()));
            }
            None => {}
        }
        let alpha = match transparency {
            None => AlphaSource::None,
            Some(Transparency::Palette(alphas)) => {
                let mut full = alphas.clone();
                full.resize(256, 0xFF);
                AlphaSource::Palette(full)
            }
            Some(&Transparency::GrayKey(key)) => AlphaSource::GrayKey(key),
            Some(&Transparency::RgbKey(key)) => AlphaSource::RgbKey(key),
        };
        Ok(Self {
            plan,
            palette: table,
            alpha,
        })
    }

    /// Convert one unfiltered scanline of `width` pixels into RGBA8 `out`.
    pub(crate) fn apply(
        &self,
        source: &[u8],
        width: usize,
        scratch: &mut RowScratch,
        out: &mut [u8],
    ) -> Result<(), PngError> {
        debug_assert_eq!(out.len(), width * 4);
        let src_format = self.plan.source();
        let mut layout = self.plan.initial_layout();

        scratch.front.clear();
        scratch.front.extend_from_slice(source);

        for &step in self.plan.steps() {
            let next = step.reshape(layout);
            let input = &scratch.front;
            let output = &mut scratch.back;
            output.clear();
            output.resize(width * next.channels, 0);

            match step {
                Transform::Strip16 => {
                    for (o, pair) in output.iter_mut().zip(input.chunks_exact(2)) {
                        *o = pair[0];
                    }
                }
                Transform::PaletteToRgb => {
                    for (i, rgb) in output.chunks_exact_mut(3).enumerate() {
                        let index = sample_at(input, layout.depth, i);
                        rgb.copy_from_slice(&self.palette[usize::from(index)]);
                    }
                }
                Transform::ExpandGray => {
                    unpack_samples(layout.depth, gray_scale(layout.depth), input, output);
                }
                Transform::TransparencyToAlpha => {
                    let c = layout.channels;
                    for (i, (px, color)) in output
                        .chunks_exact_mut(c + 1)
                        .zip(input.chunks_exact(c))
                        .enumerate()
                    {
                        px[..c].copy_from_slice(color);
                        px[c] = self.alpha_at(source, src_format.bit_depth, i);
                    }
                }
                Transform::AddOpaqueAlpha => {
                    let c = layout.channels;
                    for (px, color) in output.chunks_exact_mut(c + 1).zip(input.chunks_exact(c)) {
                        px[..c].copy_from_slice(color);
                        px[c] = 0xFF;
                    }
                }
                Transform::GrayToRgb => {
                    let c = layout.channels;
                    for (px, gray) in output.chunks_exact_mut(c + 2).zip(input.chunks_exact(c)) {
                        px[..3].fill(gray[0]);
                        px[3..].copy_from_slice(&gray[1..]);
                    }
                }
            }
            core::mem::swap(&mut scratch.front, &mut scratch.back);
            layout = next;
        }

        debug_assert_eq!(
            layout,
            Layout {
                channels: 4,
                depth: 8,
                alpha: true,
                gray: false,
                indexed: false
            }
        );
        let rgba = scratch.front.get(..out.len()).ok_or_else(|| {
            PngError::InvalidData(alloc::format!("short scanline for {width} pixels"))
        })?;
        out.copy_from_slice(rgba);
        Ok(())
    }

    /// Alpha declared by tRNS for pixel `i`, judged on the source samples at
    /// their original depth.
    fn alpha_at(&self, source: &[u8], depth: u8, i: usize) -> u8 {
        let transparent = match &self.alpha {
            AlphaSource::None => false,
            AlphaSource::Palette(alphas) => {
                return alphas[usize::from(sample_at(source, depth, i))];
            }
            AlphaSource::GrayKey(key) => sample_at(source, depth, i) == *key,
            AlphaSource::RgbKey(key) => (0..3).all(|c| sample_at(source, depth, 3 * i + c) == key[c]),
        };
        if transparent { 0 } else { 0xFF }
    }
}
