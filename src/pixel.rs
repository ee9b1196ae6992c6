/// PNG color type, as declared in IHDR.
#[non_exhaustive]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorType {
    /// Single luminance channel.
    Gray,
    /// Luminance plus alpha.
    GrayAlpha,
    /// Palette indices into PLTE.
    Palette,
    /// Red, green, blue.
    Rgb,
    /// Red, green, blue, alpha.
    Rgba,
}

impl ColorType {
    /// Parse the IHDR color type byte.
    pub(crate) fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Gray),
            2 => Some(Self::Rgb),
            3 => Some(Self::Palette),
            4 => Some(Self::GrayAlpha),
            6 => Some(Self::Rgba),
            _ => None,
        }
    }

    pub(crate) fn code(self) -> u8 {
        match self {
            Self::Gray => 0,
            Self::Rgb => 2,
            Self::Palette => 3,
            Self::GrayAlpha => 4,
            Self::Rgba => 6,
        }
    }

    /// Samples per pixel in the encoded scanline.
    pub fn channels(self) -> usize {
        match self {
            Self::Gray | Self::Palette => 1,
            Self::GrayAlpha => 2,
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, Self::GrayAlpha | Self::Rgba)
    }

    pub fn is_gray(self) -> bool {
        matches!(self, Self::Gray | Self::GrayAlpha)
    }

    /// Whether `depth` is a legal bit depth for this color type.
    pub fn allows_depth(self, depth: u8) -> bool {
        match self {
            Self::Gray => matches!(depth, 1 | 2 | 4 | 8 | 16),
            Self::Palette => matches!(depth, 1 | 2 | 4 | 8),
            Self::GrayAlpha | Self::Rgb | Self::Rgba => matches!(depth, 8 | 16),
        }
    }
}

/// Detected source pixel format of a PNG stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelFormat {
    /// Bits per sample: 1, 2, 4, 8 or 16.
    pub bit_depth: u8,
    pub color_type: ColorType,
    /// A valid tRNS chunk declares transparency without an alpha channel.
    pub has_transparency: bool,
}

impl PixelFormat {
    /// Bits per complete pixel in the encoded scanline.
    pub fn bits_per_pixel(&self) -> usize {
        self.color_type.channels() * usize::from(self.bit_depth)
    }

    /// Filter unit: bytes per complete pixel, rounded up to at least one.
    pub(crate) fn filter_bpp(&self) -> usize {
        self.bits_per_pixel().div_ceil(8)
    }

    /// Bytes in one encoded scanline of `width` pixels, filter byte excluded.
    pub(crate) fn row_bytes(&self, width: usize) -> Option<usize> {
        width
            .checked_mul(self.bits_per_pixel())
            .map(|bits| bits.div_ceil(8))
    }
}
