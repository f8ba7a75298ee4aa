/// Per-section statistics over a fixed grid
///
/// The frame is split into `units` x `units` cells with boundaries at
/// `i * width / units`, so cells differ in size by at most one pixel. Each
/// cell gets its mean luminance, a variegation score (qualifying downslopes
/// per row on the blurred grid) and a threshold: textured cells use Otsu
/// over their 3x3 cell neighborhood, flat cells reuse the global level.
use crate::config::AnalysisConfig;
use crate::models::{LumaGrid, Rect, Section};
use crate::utils::filters::rect_downslopes;
use crate::utils::threshold::{histogram_cumulative, new_histogram, otsu_threshold, rect_mean};

/// Smallest downslope depth ever required
const MIN_SLOPE_DEPTH: u16 = 8;

/// Computes the section grid of a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sectioner {
    /// Cells along each axis
    pub units: usize,
    /// Shortest falling edge counted as a downslope
    pub downslope_min_width: usize,
    /// Variegation at which a cell gets its own threshold
    pub variegation_floor: f64,
}

impl Sectioner {
    /// Sectioner taken from an analyzer configuration
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            units: config.section_units,
            downslope_min_width: config.downslope_min_width,
            variegation_floor: config.variegation_floor,
        }
    }

    /// Cell rectangles of a `width` x `height` frame, row-major.
    ///
    /// Cells that would be empty (frame narrower than `units`) are left out.
    pub fn cells(&self, width: usize, height: usize) -> Vec<Rect> {
        let units = self.units.max(1);
        let edge = |i: usize, len: usize| i * len / units;
        let mut out = Vec::with_capacity(units * units);
        for j in 0..units {
            let (y0, y1) = (edge(j, height), edge(j + 1, height));
            for i in 0..units {
                let (x0, x1) = (edge(i, width), edge(i + 1, width));
                if x1 > x0 && y1 > y0 {
                    out.push(Rect::new(x0, y0, x1 - x0, y1 - y0));
                }
            }
        }
        out
    }

    /// Statistics of every cell.
    ///
    /// `luma` feeds the means and local histograms, `blurred` the downslope
    /// counts. `otsu` and `very_very_dark` are the frame-wide thresholds.
    pub fn compute(
        &self,
        luma: &LumaGrid,
        blurred: &LumaGrid,
        otsu: u16,
        very_very_dark: u16,
    ) -> Vec<Section> {
        let (width, height) = (luma.width(), luma.height());
        let cells = self.cells(width, height);
        let min_depth = (otsu.saturating_sub(very_very_dark) / 2).max(MIN_SLOPE_DEPTH);
        let mut hist = new_histogram();

        let units = self.units.max(1);
        let columns = units.min(width.max(1));
        let mut sections = Vec::with_capacity(cells.len());
        for (idx, &cell) in cells.iter().enumerate() {
            let slopes = rect_downslopes(blurred, cell, self.downslope_min_width, min_depth);
            let variegation = slopes as f64 / cell.h as f64;

            let threshold = if variegation >= self.variegation_floor {
                hist.fill(0);
                let (ci, cj) = (idx % columns, idx / columns);
                let mut pixels = 0;
                for nj in cj.saturating_sub(1)..=cj + 1 {
                    for ni in ci.saturating_sub(1)..=ci + 1 {
                        if ni >= columns {
                            continue;
                        }
                        if let Some(&n) = cells.get(nj * columns + ni) {
                            histogram_cumulative(&mut hist, luma, n);
                            pixels += n.area();
                        }
                    }
                }
                match otsu_threshold(&hist, pixels) {
                    0 => otsu,
                    local => local,
                }
            } else {
                otsu
            };

            sections.push(Section {
                x: cell.x,
                y: cell.y,
                w: cell.w,
                h: cell.h,
                mean_luminance: rect_mean(luma, cell),
                variegation,
                threshold,
            });
        }
        sections
    }
}

impl Default for Sectioner {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}
