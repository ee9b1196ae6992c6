//! Scanline filters (PNG filter method 0).

use alloc::format;

use crate::error::PngError;

/// Per-row filter type byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum FilterType {
    None = 0,
    Sub = 1,
    Up = 2,
    Average = 3,
    Paeth = 4,
}

impl FilterType {
    pub(crate) const ALL: [Self; 5] = [Self::None, Self::Sub, Self::Up, Self::Average, Self::Paeth];

    fn from_byte(b: u8) -> Option<Self> {
        Self::ALL.get(usize::from(b)).copied()
    }
}

#[inline]
fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let (ia, ib, ic) = (i16::from(a), i16::from(b), i16::from(c));
    let p = ia + ib - ic;
    let (pa, pb, pc) = ((p - ia).abs(), (p - ib).abs(), (p - ic).abs());
    if pa <= pb && pa <= pc {
        a
    } else if pb <= pc {
        b
    } else {
        c
    }
}

/// Undo the filter on `row` in place.
///
/// `prev` is the previous reconstructed row of the same pass (all zeros for
/// the first row); `bpp` is the filter unit in bytes.
pub(crate) fn unfilter(filter: u8, bpp: usize, prev: &[u8], row: &mut [u8]) -> Result<(), PngError> {
    debug_assert_eq!(prev.len(), row.len());
    let Some(filter) = FilterType::from_byte(filter) else {
        return Err(PngError::InvalidData(format!("unknown filter type {filter}")));
    };
    match filter {
        FilterType::None => {}
        FilterType::Sub => {
            for i in bpp..row.len() {
                row[i] = row[i].wrapping_add(row[i - bpp]);
            }
        }
        FilterType::Up => {
            for (x, &b) in row.iter_mut().zip(prev) {
                *x = x.wrapping_add(b);
            }
        }
        FilterType::Average => {
            for i in 0..row.len() {
                let left = if i >= bpp { u16::from(row[i - bpp]) } else { 0 };
                let avg = ((left + u16::from(prev[i])) / 2) as u8;
                row[i] = row[i].wrapping_add(avg);
            }
        }
        FilterType::Paeth => {
            for i in 0..row.len() {
                let (left, upper_left) = if i >= bpp {
                    (row[i - bpp], prev[i - bpp])
                } else {
                    (0, 0)
                };
                row[i] = row[i].wrapping_add(paeth(left, prev[i], upper_left));
            }
        }
    }
    Ok(())
}

/// Apply `filter` to `row` against `prev`, writing residuals into `out`.
pub(crate) fn filter_row(filter: FilterType, bpp: usize, prev: &[u8], row: &[u8], out: &mut [u8]) {
    debug_assert!(prev.len() == row.len() && out.len() == row.len());
    match filter {
        FilterType::None => out.copy_from_slice(row),
        FilterType::Sub => {
            for i in 0..row.len() {
                let left = if i >= bpp { row[i - bpp] } else { 0 };
                out[i] = row[i].wrapping_sub(left);
            }
        }
        FilterType::Up => {
            for i in 0..row.len() {
                out[i] = row[i].wrapping_sub(prev[i]);
            }
        }
        FilterType::Average => {
            for i in 0..row.len() {
                let left = if i >= bpp { u16::from(row[i - bpp]) } else { 0 };
                out[i] = row[i].wrapping_sub(((left + u16::from(prev[i])) / 2) as u8);
            }
        }
        FilterType::Paeth => {
            for i in 0..row.len() {
                let (left, upper_left) = if i >= bpp {
                    (row[i - bpp], prev[i - bpp])
                } else {
                    (0, 0)
                };
                out[i] = row[i].wrapping_sub(paeth(left, prev[i], upper_left));
            }
        }
    }
}

/// Minimum-sum-of-absolute-differences cost, treating residuals as signed.
pub(crate) fn residual_cost(residuals: &[u8]) -> u64 {
    residuals
        .iter()
        .map(|&r| u64::from((r as i8).unsigned_abs()))
        .sum()
}
