/// Run-length encoding of classified pixel rows
///
/// Every row becomes a sequence of alternating background/foreground runs.
/// All runs of a frame live in one arena in row-major order, with a parallel
/// index of where each row starts (plus one entry past the last row). The
/// arena is reused frame after frame and only grows.
use crate::error::{AnalysisError, Result};
use crate::models::{LumaGrid, PixelClass};

/// A maximal horizontal span of same-class pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// Pixel class of the span
    pub class: PixelClass,
    /// Span width in pixels
    pub width: u32,
    /// Union-find link: `None` until labeled, then itself (root) or a run nearer the root
    pub component: Option<u32>,
}

/// Decides the class of the pixel at (x, y)
pub trait Classify {
    /// Class of the pixel at (x, y)
    fn classify(&self, x: usize, y: usize) -> PixelClass;
}

impl<F> Classify for F
where
    F: Fn(usize, usize) -> PixelClass,
{
    fn classify(&self, x: usize, y: usize) -> PixelClass {
        self(x, y)
    }
}

/// Fixed threshold over a luminance grid: `pixel <= level` is foreground
pub struct Threshold<'a> {
    /// Luminance grid to encode
    pub grid: &'a LumaGrid,
    /// Pixels at or below this are foreground
    pub level: u16,
}

impl Classify for Threshold<'_> {
    #[inline]
    fn classify(&self, x: usize, y: usize) -> PixelClass {
        if self.grid.get(x, y) <= self.level {
            PixelClass::Foreground
        } else {
            PixelClass::Background
        }
    }
}

/// Reusable run storage for one frame at a time
#[derive(Debug, Default)]
pub struct RunArena {
    runs: Vec<Run>,
    starts: Vec<usize>,
    width: usize,
    height: usize,
}

impl RunArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode a `width` x `height` frame classified by `classifier`.
    ///
    /// Previous contents are discarded. A zero-sized frame leaves an arena
    /// with no runs and `height + 1` row starts. If the arena cannot grow,
    /// the previous frame's runs are left untouched and an error is returned.
    pub fn encode<C: Classify + ?Sized>(
        &mut self,
        classifier: &C,
        width: usize,
        height: usize,
    ) -> Result<()> {
        let max_runs = width * height;
        if max_runs > self.runs.capacity() {
            self.runs
                .try_reserve_exact(max_runs - self.runs.len())
                .map_err(AnalysisError::allocation(max_runs))?;
        }
        if height + 1 > self.starts.capacity() {
            self.starts
                .try_reserve_exact(height + 1 - self.starts.len())
                .map_err(AnalysisError::allocation(height + 1))?;
        }

        self.runs.clear();
        self.starts.clear();
        self.width = width;
        self.height = height;

        for y in 0..height {
            self.starts.push(self.runs.len());
            if width == 0 {
                continue;
            }
            let mut start_x = 0;
            let mut current = classifier.classify(0, y);
            for x in 1..width {
                let class = classifier.classify(x, y);
                if class != current {
                    self.push_run(current, x - start_x);
                    current = class;
                    start_x = x;
                }
            }
            self.push_run(current, width - start_x);
        }
        self.starts.push(self.runs.len());
        Ok(())
    }

    /// Encode a luminance grid against a fixed threshold
    pub fn encode_threshold(&mut self, grid: &LumaGrid, level: u16) -> Result<()> {
        self.encode(&Threshold { grid, level }, grid.width(), grid.height())
    }

    fn push_run(&mut self, class: PixelClass, width: usize) {
        self.runs.push(Run {
            class,
            width: width as u32,
            component: None,
        });
    }

    /// Width of the encoded frame
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height of the encoded frame
    pub fn height(&self) -> usize {
        self.height
    }

    /// All runs, row-major
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    /// All runs, mutable (for labeling)
    pub fn runs_mut(&mut self) -> &mut [Run] {
        &mut self.runs
    }

    /// Index of the first run of each row, followed by the total run count
    pub fn row_starts(&self) -> &[usize] {
        &self.starts
    }

    /// Runs of row `y`
    pub fn row(&self, y: usize) -> &[Run] {
        &self.runs[self.starts[y]..self.starts[y + 1]]
    }

    /// Iterate `(run index, x_start, x_end)` over row `y`
    pub fn spans(&self, y: usize) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        let first = self.starts[y];
        self.row(y).iter().enumerate().scan(0usize, move |x, (i, run)| {
            let start = *x;
            *x += run.width as usize;
            Some((first + i, start, *x))
        })
    }

    /// Expand the runs back into one class per pixel, row-major
    pub fn decode(&self) -> Vec<PixelClass> {
        let mut out = Vec::with_capacity(self.width * self.height);
        for run in &self.runs {
            out.extend(std::iter::repeat_n(run.class, run.width as usize));
        }
        out
    }
}
