//! Color normalization to canonical RGBA8.
//!
//! A [`TransformPlan`] is an ordered list of [`Transform`] steps chosen for
//! one source [`PixelFormat`]. Planning walks the steps in their fixed
//! order and checks each step's precondition against the layout the
//! earlier steps produce, so conditions that hold at the same time compose
//! (a tRNS-derived alpha suppresses the opaque filler, palette expansion
//! feeds the filler an RGB layout).

mod rows;

pub(crate) use rows::{RowScratch, RowTransformer};

use alloc::vec::Vec;

use crate::pixel::{ColorType, PixelFormat};

/// One normalization step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Transform {
    /// Keep the high byte of each 16-bit sample.
    Strip16,
    /// Replace palette indices by their PLTE color.
    PaletteToRgb,
    /// Scale 1/2/4-bit gray samples up to 8 bits.
    ExpandGray,
    /// Turn the tRNS side-channel into an explicit alpha channel.
    TransparencyToAlpha,
    /// Append an opaque (0xFF) alpha channel.
    AddOpaqueAlpha,
    /// Replicate gray into red, green and blue.
    GrayToRgb,
}

impl Transform {
    /// Every step, in the order they run.
    pub const ORDER: [Self; 6] = [
        Self::Strip16,
        Self::PaletteToRgb,
        Self::ExpandGray,
        Self::TransparencyToAlpha,
        Self::AddOpaqueAlpha,
        Self::GrayToRgb,
    ];

    fn applies(self, source: &PixelFormat, layout: &Layout) -> bool {
        match self {
            Self::Strip16 => layout.depth == 16,
            Self::PaletteToRgb => layout.indexed,
            Self::ExpandGray => layout.gray && layout.depth < 8,
            Self::TransparencyToAlpha => source.has_transparency,
            Self::AddOpaqueAlpha => !layout.indexed && !layout.alpha,
            Self::GrayToRgb => layout.gray,
        }
    }

    fn reshape(self, layout: Layout) -> Layout {
        match self {
            Self::Strip16 | Self::ExpandGray => Layout { depth: 8, ..layout },
            Self::PaletteToRgb => Layout {
                channels: 3,
                depth: 8,
                indexed: false,
                ..layout
            },
            Self::TransparencyToAlpha | Self::AddOpaqueAlpha => Layout {
                channels: layout.channels + 1,
                alpha: true,
                ..layout
            },
            Self::GrayToRgb => Layout {
                channels: layout.channels + 2,
                gray: false,
                ..layout
            },
        }
    }
}

/// Sample layout of a row between steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Layout {
    pub channels: usize,
    pub depth: u8,
    pub alpha: bool,
    pub gray: bool,
    pub indexed: bool,
}

impl Layout {
    fn of(format: &PixelFormat) -> Self {
        Self {
            channels: format.color_type.channels(),
            depth: format.bit_depth,
            alpha: format.color_type.has_alpha(),
            gray: format.color_type.is_gray(),
            indexed: format.color_type == ColorType::Palette,
        }
    }
}

/// Ordered normalization steps for one source format. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransformPlan {
    source: PixelFormat,
    steps: Vec<Transform>,
    output: Layout,
}

impl TransformPlan {
    pub fn for_format(source: PixelFormat) -> Self {
        let mut layout = Layout::of(&source);
        let mut steps = Vec::with_capacity(Transform::ORDER.len());
        for step in Transform::ORDER {
            if step.applies(&source, &layout) {
                layout = step.reshape(layout);
                steps.push(step);
            }
        }
        Self {
            source,
            steps,
            output: layout,
        }
    }

    pub fn source(&self) -> PixelFormat {
        self.source
    }

    pub fn steps(&self) -> &[Transform] {
        &self.steps
    }

    /// Whether the plan ends in four 8-bit channels (RGBA8).
    pub fn yields_rgba8(&self) -> bool {
        self.output.channels == 4 && self.output.depth == 8 && self.output.alpha && !self.output.gray
    }

    pub(crate) fn initial_layout(&self) -> Layout {
        Layout::of(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Transform::*;

    fn plan(bit_depth: u8, color_type: ColorType, has_transparency: bool) -> TransformPlan {
        TransformPlan::for_format(PixelFormat {
            bit_depth,
            color_type,
            has_transparency,
        })
    }

    #[test]
    fn rgba8_needs_nothing() {
        assert!(plan(8, ColorType::Rgba, false).steps().is_empty());
        assert!(plan(8, ColorType::Rgba, false).yields_rgba8());
    }

    #[test]
    fn steps_per_format() {
        assert_eq!(plan(16, ColorType::Rgba, false).steps(), &[Strip16]);
        assert_eq!(plan(8, ColorType::Rgb, false).steps(), &[AddOpaqueAlpha]);
        assert_eq!(
            plan(16, ColorType::Rgb, true).steps(),
            &[Strip16, TransparencyToAlpha]
        );
        assert_eq!(
            plan(2, ColorType::Gray, false).steps(),
            &[ExpandGray, AddOpaqueAlpha, GrayToRgb]
        );
        assert_eq!(
            plan(4, ColorType::Gray, true).steps(),
            &[ExpandGray, TransparencyToAlpha, GrayToRgb]
        );
        assert_eq!(plan(16, ColorType::GrayAlpha, false).steps(), &[Strip16, GrayToRgb]);
        assert_eq!(plan(4, ColorType::Palette, false).steps(), &[PaletteToRgb, AddOpaqueAlpha]);
        assert_eq!(
            plan(8, ColorType::Palette, true).steps(),
            &[PaletteToRgb, TransparencyToAlpha]
        );
    }

    #[test]
    fn transparency_suppresses_opaque_filler() {
        for (depth, ct) in [(8, ColorType::Rgb), (1, ColorType::Gray), (16, ColorType::Gray)] {
            let steps = plan(depth, ct, true).steps().to_vec();
            assert!(steps.contains(&TransparencyToAlpha));
            assert!(!steps.contains(&AddOpaqueAlpha), "{depth} {ct:?}");
        }
    }

    #[test]
    fn every_legal_format_reaches_rgba8() {
        let types = [
            ColorType::Gray,
            ColorType::GrayAlpha,
            ColorType::Palette,
            ColorType::Rgb,
            ColorType::Rgba,
        ];
        for ct in types {
            for depth in [1u8, 2, 4, 8, 16] {
                if !ct.allows_depth(depth) {
                    continue;
                }
                for trns in [false, true] {
                    if trns && ct.has_alpha() {
                        continue;
                    }
                    let p = plan(depth, ct, trns);
                    assert!(p.yields_rgba8(), "{depth}-bit {ct:?} trns={trns}: {:?}", p.steps());
                    let positions: Vec<usize> = p
                        .steps()
                        .iter()
                        .map(|s| Transform::ORDER.iter().position(|o| o == s).unwrap())
                        .collect();
                    assert!(positions.windows(2).all(|w| w[0] < w[1]));
                }
            }
        }
    }
}
