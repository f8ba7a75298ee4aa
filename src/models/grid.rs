use crate::error::{AnalysisError, Result};

/// Number of distinct luminance values: the sum of three 0..=255 channels.
pub const LUMINANCES: usize = 3 * 255 + 1;

/// Largest luminance value a sample can hold.
pub const MAX_LUMINANCE: u16 = (LUMINANCES - 1) as u16;

/// Row-major grid of 16-bit luminance samples in `0..LUMINANCES`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LumaGrid {
    width: usize,
    height: usize,
    data: Vec<u16>,
}

impl LumaGrid {
    /// Create a black grid of the given size
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0)
    }

    /// Create a grid where every sample has `value`, clamped to [`MAX_LUMINANCE`]
    pub fn filled(width: usize, height: usize, value: u16) -> Self {
        Self {
            width,
            height,
            data: vec![value.min(MAX_LUMINANCE); width * height],
        }
    }

    /// Wrap existing samples. Fails if `data` does not hold exactly `width * height` samples.
    ///
    /// Samples above [`MAX_LUMINANCE`] are clamped.
    pub fn from_vec(width: usize, height: usize, mut data: Vec<u16>) -> Result<Self> {
        if data.len() != width * height {
            return Err(AnalysisError::BufferTooSmall {
                expected: width * height,
                actual: data.len(),
            });
        }
        for v in data.iter_mut() {
            *v = (*v).min(MAX_LUMINANCE);
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Grid width
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the grid holds no samples
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Sample at (x, y). Out-of-bounds reads return 0.
    pub fn get(&self, x: usize, y: usize) -> u16 {
        if x >= self.width || y >= self.height {
            return 0;
        }
        self.data[y * self.width + x]
    }

    /// Set the sample at (x, y), clamped to [`MAX_LUMINANCE`]. Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: usize, y: usize, value: u16) {
        if x >= self.width || y >= self.height {
            return;
        }
        self.data[y * self.width + x] = value.min(MAX_LUMINANCE);
    }

    /// Samples of row `y`
    pub fn row(&self, y: usize) -> &[u16] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Raw samples
    pub fn as_slice(&self) -> &[u16] {
        &self.data
    }

    /// Raw samples, mutable
    pub fn as_mut_slice(&mut self) -> &mut [u16] {
        &mut self.data
    }

    /// Give the grid a new shape, reusing its allocation.
    ///
    /// Growth goes through `try_reserve`; on failure the grid keeps its
    /// previous shape and contents.
    pub fn reshape(&mut self, width: usize, height: usize) -> Result<()> {
        let needed = width * height;
        if needed > self.data.capacity() {
            self.data
                .try_reserve_exact(needed - self.data.len())
                .map_err(AnalysisError::allocation(needed))?;
        }
        self.data.resize(needed, 0);
        self.width = width;
        self.height = height;
        Ok(())
    }
}
