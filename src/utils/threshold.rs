//! Luminance histograms and the thresholds derived from them.

use crate::models::{LUMINANCES, LumaGrid, MAX_LUMINANCE, Rect};

/// Default share of pixels treated as very very dark (0.5%)
pub const VERY_VERY_DARK_FRACTION: f64 = 0.005;

/// A zeroed histogram with one bucket per luminance value
pub fn new_histogram() -> Vec<u32> {
    vec![0; LUMINANCES]
}

/// Histogram of the pixels of `rect`, clipped to the grid
pub fn histogram(grid: &LumaGrid, rect: Rect) -> Vec<u32> {
    let mut out = new_histogram();
    histogram_cumulative(&mut out, grid, rect);
    out
}

/// Histogram of the whole grid
pub fn histogram_full(grid: &LumaGrid) -> Vec<u32> {
    histogram(grid, Rect::new(0, 0, grid.width(), grid.height()))
}

/// Add the pixels of `rect` (clipped to the grid) into `out`.
///
/// Existing counts are kept, so several rectangles can be composed into one
/// histogram. Samples written above [`MAX_LUMINANCE`] through
/// [`LumaGrid::as_mut_slice`] count as [`MAX_LUMINANCE`].
pub fn histogram_cumulative(out: &mut [u32], grid: &LumaGrid, rect: Rect) {
    let r = rect.clamp_to(grid.width(), grid.height());
    for y in r.y..r.y + r.h {
        for &p in &grid.row(y)[r.x..r.x + r.w] {
            out[p.min(MAX_LUMINANCE) as usize] += 1;
        }
    }
}

/// Threshold between dark and light pixels using Otsu's method.
///
/// Pixels strictly below the returned level form the dark class. The level
/// maximizing `below * above * (mean_below - mean_above)^2` wins; ties keep
/// the first level. Returns 0 when no level splits the pixels.
pub fn otsu_threshold(histogram: &[u32], pixels: usize) -> u16 {
    let total = pixels as f64;
    let mut sum_above: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &c)| i as f64 * c as f64)
        .sum();
    let mut px_below = 0.0f64;
    let mut sum_below = 0.0f64;
    let mut max_var = 0.0f64;
    let mut max_lum = 0usize;

    for (i, &count) in histogram.iter().enumerate().take(LUMINANCES) {
        let md = if px_below == 0.0 || px_below >= total {
            0.0
        } else {
            sum_below / px_below - sum_above / (total - px_below)
        };
        let var = px_below * (total - px_below) * md * md;
        if var > max_var {
            max_var = var;
            max_lum = i;
        }
        let c = count as f64;
        px_below += c;
        sum_below += i as f64 * c;
        sum_above -= i as f64 * c;
    }

    max_lum as u16
}

/// Smallest level whose cumulative count reaches `fraction` of `pixels`.
///
/// Separates near-black pixels (likely code modules) from merely dark ones.
pub fn very_very_dark_threshold(histogram: &[u32], pixels: usize, fraction: f64) -> u16 {
    let breakpoint = (pixels as f64 * fraction) as u64;
    let mut count = 0u64;
    for (i, &c) in histogram.iter().enumerate().take(LUMINANCES) {
        count += c as u64;
        if count >= breakpoint {
            return i as u16;
        }
    }
    MAX_LUMINANCE
}

/// Mean luminance of `rect` (clipped), rounded half up. Zero-area rectangles give 0.
pub fn rect_mean(grid: &LumaGrid, rect: Rect) -> u16 {
    let r = rect.clamp_to(grid.width(), grid.height());
    let pixels = r.area() as u64;
    if pixels == 0 {
        return 0;
    }
    let total: u64 = (r.y..r.y + r.h)
        .map(|y| {
            grid.row(y)[r.x..r.x + r.w]
                .iter()
                .map(|&p| p as u64)
                .sum::<u64>()
        })
        .sum();
    ((total + pixels / 2) / pixels) as u16
}
