//! Adam7 pass geometry.

/// One Adam7 pass: first pixel and step, in image coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Pass {
    pub x0: u32,
    pub y0: u32,
    pub dx: u32,
    pub dy: u32,
}

pub(crate) const ADAM7: [Pass; 7] = [
    Pass { x0: 0, y0: 0, dx: 8, dy: 8 },
    Pass { x0: 4, y0: 0, dx: 8, dy: 8 },
    Pass { x0: 0, y0: 4, dx: 4, dy: 8 },
    Pass { x0: 2, y0: 0, dx: 4, dy: 4 },
    Pass { x0: 0, y0: 2, dx: 2, dy: 4 },
    Pass { x0: 1, y0: 0, dx: 2, dy: 2 },
    Pass { x0: 0, y0: 1, dx: 1, dy: 2 },
];

/// The full image as a single pass.
pub(crate) const PROGRESSIVE: Pass = Pass { x0: 0, y0: 0, dx: 1, dy: 1 };

impl Pass {
    /// Reduced image size of this pass; either side may be zero.
    pub(crate) fn size(&self, width: u32, height: u32) -> (u32, u32) {
        let span = |full: u32, start: u32, step: u32| {
            if full <= start {
                0
            } else {
                (full - start).div_ceil(step)
            }
        };
        (span(width, self.x0, self.dx), span(height, self.y0, self.dy))
    }
}
