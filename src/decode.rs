use alloc::vec::Vec;

#[cfg(feature = "rgb")]
use rgb::AsPixels as _;

use crate::buffer::PixelBuffer;
use crate::error::{DecodeError, PngError};
use crate::limits::Limits;
use crate::normalize::{RowScratch, RowTransformer, TransformPlan};
use crate::png::interlace::{ADAM7, PROGRESSIVE, Pass};
use crate::png::read::ReadEngine;

/// Decoded image: canonical RGBA8, `width * height * 4` bytes, row-major,
/// no row padding.
#[derive(Debug, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pixels: PixelBuffer,
}

impl DecodedImage {
    /// Access the pixel data.
    pub fn pixels(&self) -> &[u8] {
        self.pixels.as_bytes()
    }

    /// Row view over the pixel data.
    pub fn buffer(&self) -> &PixelBuffer {
        &self.pixels
    }

    /// Take ownership of the pixel data.
    pub fn into_pixels(self) -> Vec<u8> {
        self.pixels.into_vec()
    }

    /// Reinterpret the pixel data as RGBA8 pixels.
    #[cfg(feature = "rgb")]
    pub fn as_rgba(&self) -> &[rgb::RGBA8] {
        self.pixels().as_pixels()
    }

    /// Zero-copy view as an [`imgref::ImgRef`].
    #[cfg(feature = "imgref")]
    pub fn as_imgref(&self) -> imgref::ImgRef<'_, rgb::RGBA8> {
        imgref::ImgRef::new(self.as_rgba(), self.width as usize, self.height as usize)
    }

    /// Copy into an [`imgref::ImgVec`].
    #[cfg(feature = "imgref")]
    pub fn to_imgvec(&self) -> imgref::ImgVec<rgb::RGBA8> {
        imgref::ImgVec::new(
            self.as_rgba().to_vec(),
            self.width as usize,
            self.height as usize,
        )
    }
}

/// Decode request builder.
///
/// ```no_run
/// use bare_png::{DecodeRequest, Limits};
///
/// let data: &[u8] = &[]; // PNG bytes
/// let limits = Limits {
///     max_pixels: Some(16_000_000),
///     ..Default::default()
/// };
/// let image = DecodeRequest::new(data).with_limits(&limits).decode()?;
/// assert_eq!(image.pixels().len(), image.width as usize * image.height as usize * 4);
/// # Ok::<(), bare_png::DecodeError>(())
/// ```
#[derive(Clone, Copy, Debug)]
pub struct DecodeRequest<'a> {
    data: &'a [u8],
    limits: Option<&'a Limits>,
}

impl<'a> DecodeRequest<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, limits: None }
    }

    /// Reject images over `limits` before any pixel memory is allocated.
    pub fn with_limits(mut self, limits: &'a Limits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Decode to canonical RGBA8.
    pub fn decode(self) -> Result<DecodedImage, DecodeError> {
        self.run().map_err(|err| {
            log::debug!("decode failed: {err}");
            DecodeError::from(err)
        })
    }

    fn run(self) -> Result<DecodedImage, PngError> {
        // ReadHeader
        let mut engine = ReadEngine::read_info(self.data)?;
        let ihdr = *engine.ihdr();
        if let Some(limits) = self.limits {
            limits.check(ihdr.width, ihdr.height)?;
        }

        // DetermineTransformPlan
        let format = engine.format();
        let plan = TransformPlan::for_format(format);
        log::debug!(
            "decoding {}x{} {}-bit {:?}{}{}, steps {:?}",
            ihdr.width,
            ihdr.height,
            format.bit_depth,
            format.color_type,
            if format.has_transparency { " +tRNS" } else { "" },
            if ihdr.interlaced { " Adam7" } else { "" },
            plan.steps()
        );

        // ConfigureEngine
        let transformer = RowTransformer::new(plan, engine.palette(), engine.transparency())?;
        let mut pixels = PixelBuffer::new(ihdr.width, ihdr.height)?;
        let mut scratch = RowScratch::default();

        // ReadPixelRows
        let passes: &[Pass] = if ihdr.interlaced { &ADAM7 } else { &[PROGRESSIVE] };
        let mut line = Vec::new();
        for (index, pass) in passes.iter().enumerate() {
            let (pw, ph) = pass.size(ihdr.width, ihdr.height);
            if pw == 0 || ph == 0 {
                continue;
            }
            log::trace!("pass {index}: {pw}x{ph}");
            let row_bytes = format
                .row_bytes(pw as usize)
                .ok_or(PngError::DimensionsTooLarge {
                    width: ihdr.width,
                    height: ihdr.height,
                })?;
            engine.start_pass(row_bytes)?;

            if !ihdr.interlaced {
                for _ in 0..ph {
                    let row = pixels.push_row()?;
                    transformer.apply(engine.next_row()?, pw as usize, &mut scratch, row)?;
                }
                continue;
            }

            let line_len = pw as usize * 4;
            line.clear();
            line.try_reserve_exact(line_len)
                .map_err(|_| PngError::AllocationFailed(line_len))?;
            line.resize(line_len, 0);
            for py in 0..ph {
                transformer.apply(engine.next_row()?, pw as usize, &mut scratch, &mut line)?;
                pixels.scatter_row(pass.y0 + py * pass.dy, pass.x0, pass.dx, &line)?;
            }
        }

        if !pixels.is_complete() {
            return Err(PngError::InvalidData("image rows missing".into()));
        }

        // ReleaseEngineHandles
        engine.finish()?;
        log::debug!("decoded {}x{} RGBA8", ihdr.width, ihdr.height);

        Ok(DecodedImage {
            width: ihdr.width,
            height: ihdr.height,
            pixels,
        })
    }
}
