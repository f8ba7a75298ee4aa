//! Separable grayscale filters and local texture measures.
//!
//! Dilation replaces each pixel by the darkest pixel of its
//! `(2 * radius + 1)` square neighborhood: dark (foreground) regions grow at
//! their edges and light holes up to `radius` wide fill in. Since `min` is
//! associative this runs as a horizontal pass followed by a vertical pass.
//! Box blur averages the same neighborhood with running sums, so its cost per
//! pixel does not depend on the radius. Out-of-frame neighbors repeat the
//! nearest edge pixel.
//!
//! Output never aliases input: both filters write into a separate grid and
//! use a caller-provided scratch grid for the intermediate pass. Each pass
//! hands out disjoint output rows to rayon workers.

use crate::error::Result;
use crate::models::{LumaGrid, Rect};
use rayon::prelude::*;

/// Rows with fewer qualifying downslopes than this are ignored
pub const MIN_ROW_SLOPES: usize = 2;

/// Dilate into a freshly allocated grid
pub fn dilate(input: &LumaGrid, radius: usize) -> Result<LumaGrid> {
    let mut out = LumaGrid::default();
    let mut scratch = LumaGrid::default();
    dilate_into(input, radius, &mut out, &mut scratch)?;
    Ok(out)
}

/// Dilate `input` into `out`, using `scratch` for the horizontal pass
pub fn dilate_into(
    input: &LumaGrid,
    radius: usize,
    out: &mut LumaGrid,
    scratch: &mut LumaGrid,
) -> Result<()> {
    let (width, height) = (input.width(), input.height());
    out.reshape(width, height)?;
    scratch.reshape(width, height)?;
    if input.is_empty() {
        return Ok(());
    }

    // Horizontal pass
    scratch
        .as_mut_slice()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, dst)| {
            let src = input.row(y);
            for (x, d) in dst.iter_mut().enumerate() {
                let a = x.saturating_sub(radius);
                let b = (x + radius + 1).min(width);
                *d = src[a..b].iter().copied().min().unwrap_or(src[x]);
            }
        });

    // Vertical pass
    let tmp: &LumaGrid = scratch;
    out.as_mut_slice()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, dst)| {
            let a = y.saturating_sub(radius);
            let b = (y + radius + 1).min(height);
            dst.copy_from_slice(tmp.row(a));
            for yy in a + 1..b {
                for (d, &s) in dst.iter_mut().zip(tmp.row(yy)) {
                    if s < *d {
                        *d = s;
                    }
                }
            }
        });

    Ok(())
}

/// Box blur into a freshly allocated grid
pub fn box_blur(input: &LumaGrid, radius: usize) -> Result<LumaGrid> {
    let mut out = LumaGrid::default();
    let mut scratch = LumaGrid::default();
    box_blur_into(input, radius, &mut out, &mut scratch)?;
    Ok(out)
}

/// Box blur `input` into `out`, using `scratch` for the horizontal pass.
///
/// Each output sample is the window mean rounded to nearest.
pub fn box_blur_into(
    input: &LumaGrid,
    radius: usize,
    out: &mut LumaGrid,
    scratch: &mut LumaGrid,
) -> Result<()> {
    let (width, height) = (input.width(), input.height());
    out.reshape(width, height)?;
    scratch.reshape(width, height)?;
    if input.is_empty() {
        return Ok(());
    }
    let denom = (2 * radius + 1) as u32;
    let half = radius as u32;

    // Horizontal pass: running sum along each row
    scratch
        .as_mut_slice()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, dst)| {
            let src = input.row(y);
            let at = |i: isize| src[i.clamp(0, width as isize - 1) as usize] as u32;
            let r = radius as isize;
            let mut sum = (half + 1) * src[0] as u32;
            for k in 0..r {
                sum += at(k);
            }
            for (x, d) in dst.iter_mut().enumerate() {
                let x = x as isize;
                sum = sum + at(x + r) - at(x - r - 1);
                *d = ((sum + half) / denom) as u16;
            }
        });

    // Vertical pass: running sums for all columns at once, row by row
    let tmp: &LumaGrid = scratch;
    let row_at = |i: isize| tmp.row(i.clamp(0, height as isize - 1) as usize);
    let r = radius as isize;
    let mut sums: Vec<u32> = tmp.row(0).iter().map(|&p| (half + 1) * p as u32).collect();
    for k in 0..r {
        for (s, &p) in sums.iter_mut().zip(row_at(k)) {
            *s += p as u32;
        }
    }
    for (y, dst) in out.as_mut_slice().chunks_mut(width).enumerate() {
        let y = y as isize;
        let enter = row_at(y + r);
        let leave = row_at(y - r - 1);
        for (x, d) in dst.iter_mut().enumerate() {
            sums[x] = sums[x] + enter[x] as u32 - leave[x] as u32;
            *d = ((sums[x] + half) / denom) as u16;
        }
    }

    Ok(())
}

/// Count luminance downslopes inside `rect` (clipped to the grid).
///
/// A downslope is a maximal non-increasing stretch of at least `min_width`
/// steps that falls by at least `min_depth`. Rows contributing fewer than
/// [`MIN_ROW_SLOPES`] downslopes count as zero.
pub fn rect_downslopes(grid: &LumaGrid, rect: Rect, min_width: usize, min_depth: u16) -> usize {
    let r = rect.clamp_to(grid.width(), grid.height());
    let mut total = 0;
    for y in r.y..r.y + r.h {
        let row = &grid.row(y)[r.x..r.x + r.w];
        let row_slopes = row_downslopes(row, min_width, min_depth);
        if row_slopes >= MIN_ROW_SLOPES {
            total += row_slopes;
        }
    }
    total
}

fn row_downslopes(row: &[u16], min_width: usize, min_depth: u16) -> usize {
    let mut count = 0;
    let mut p = 1;
    while p < row.len() {
        while p < row.len() && row[p] >= row[p - 1] {
            p += 1;
        }
        if p >= row.len() {
            break;
        }
        let start = p;
        while p < row.len() && row[p] <= row[p - 1] {
            p += 1;
        }
        if p - start >= min_width && row[start - 1] - row[p - 1] >= min_depth {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_grid(width: usize, height: usize) -> LumaGrid {
        let data = (0..width * height)
            .map(|i| ((i * 97 + i / width * 13) % 766) as u16)
            .collect();
        LumaGrid::from_vec(width, height, data).unwrap()
    }

    #[test]
    fn test_dilate_spreads_darkness() {
        let mut grid = LumaGrid::filled(7, 7, 700);
        grid.set(3, 3, 10);
        let out = dilate(&grid, 1).unwrap();
        for y in 0..7 {
            for x in 0..7 {
                let expect = if (2..=4).contains(&x) && (2..=4).contains(&y) { 10 } else { 700 };
                assert_eq!(out.get(x, y), expect, "at ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_dilate_never_brightens() {
        let grid = ramp_grid(23, 17);
        let out = dilate(&grid, 2).unwrap();
        for (o, i) in out.as_slice().iter().zip(grid.as_slice()) {
            assert!(o <= i);
        }
    }

    #[test]
    fn test_dilate_monotonic_in_radius() {
        let grid = ramp_grid(31, 19);
        let r1 = dilate(&grid, 1).unwrap();
        let r3 = dilate(&grid, 3).unwrap();
        for (a, b) in r3.as_slice().iter().zip(r1.as_slice()) {
            assert!(a <= b);
        }
    }

    #[test]
    fn test_dilate_zero_radius_is_identity() {
        let grid = ramp_grid(9, 5);
        assert_eq!(dilate(&grid, 0).unwrap(), grid);
    }

    #[test]
    fn test_dilate_matches_brute_force() {
        let grid = ramp_grid(12, 9);
        let radius = 2;
        let out = dilate(&grid, radius).unwrap();
        for y in 0..9usize {
            for x in 0..12usize {
                let mut best = u16::MAX;
                for yy in y.saturating_sub(radius)..(y + radius + 1).min(9) {
                    for xx in x.saturating_sub(radius)..(x + radius + 1).min(12) {
                        best = best.min(grid.get(xx, yy));
                    }
                }
                assert_eq!(out.get(x, y), best);
            }
        }
    }

    #[test]
    fn test_box_blur_preserves_constant() {
        let grid = LumaGrid::filled(13, 6, 421);
        for radius in [0, 1, 3, 20] {
            assert_eq!(box_blur(&grid, radius).unwrap(), grid);
        }
    }

    #[test]
    fn test_box_blur_averages() {
        // Single row: 0 0 30 0 0, radius 1 with edge replication
        let grid = LumaGrid::from_vec(5, 1, vec![0, 0, 30, 0, 0]).unwrap();
        let out = box_blur(&grid, 1).unwrap();
        assert_eq!(out.as_slice(), &[0, 10, 10, 10, 0]);
    }

    #[test]
    fn test_box_blur_rounds_to_nearest() {
        // Window sums 0+0+2 = 2 -> 2/3 rounds to 1
        let grid = LumaGrid::from_vec(3, 1, vec![0, 0, 2]).unwrap();
        let out = box_blur(&grid, 1).unwrap();
        assert_eq!(out.as_slice(), &[0, 1, 1]);
    }

    #[test]
    fn test_downslopes() {
        // Two clear downslopes in one row
        let row = vec![500, 400, 300, 500, 500, 200, 100, 600];
        let grid = LumaGrid::from_vec(8, 1, row).unwrap();
        assert_eq!(rect_downslopes(&grid, Rect::new(0, 0, 8, 1), 2, 100), 2);
        // Too deep a requirement leaves one, and one alone is insignificant
        assert_eq!(rect_downslopes(&grid, Rect::new(0, 0, 8, 1), 2, 250), 0);
    }

    #[test]
    fn test_downslopes_flat_row() {
        let grid = LumaGrid::filled(10, 4, 300);
        assert_eq!(rect_downslopes(&grid, Rect::new(0, 0, 10, 4), 1, 1), 0);
    }
}
