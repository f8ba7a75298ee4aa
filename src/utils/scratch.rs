//! Per-frame scratch buffers, reused across frames
//!
//! Holds every grid and the run arena one analysis needs. Buffers only grow;
//! a frame of the same size as the previous one allocates nothing. The
//! scratch is owned by one analyzer, so nothing else sees it mid-frame.

use crate::detector::runs::RunArena;
use crate::error::Result;
use crate::models::LumaGrid;

/// Reusable buffers for one in-flight analysis
#[derive(Debug, Default)]
pub struct FrameScratch {
    /// Luminance of the current frame
    pub luma: LumaGrid,
    /// Dilated luminance
    pub dilated: LumaGrid,
    /// Box-blurred luminance
    pub blurred: LumaGrid,
    /// Intermediate pass of the separable filters
    pub temp: LumaGrid,
    /// Runs of the classified frame
    pub runs: RunArena,
    largest: usize,
    stats: ScratchStats,
}

/// Counters for monitoring buffer reuse
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScratchStats {
    /// Frames prepared
    pub frames: usize,
    /// Frames that needed larger grids than any before
    pub growths: usize,
}

impl FrameScratch {
    /// Create empty scratch; the first frame sizes it
    pub fn new() -> Self {
        Self::default()
    }

    /// Create scratch already sized for `width` x `height` frames
    pub fn with_capacity(width: usize, height: usize) -> Result<Self> {
        let mut scratch = Self::new();
        scratch.prepare(width, height)?;
        scratch.stats = ScratchStats::default();
        Ok(scratch)
    }

    /// Size every grid for a `width` x `height` frame.
    ///
    /// On allocation failure the grids that could not grow keep their
    /// previous contents.
    pub fn prepare(&mut self, width: usize, height: usize) -> Result<()> {
        let pixels = width * height;
        self.luma.reshape(width, height)?;
        self.dilated.reshape(width, height)?;
        self.blurred.reshape(width, height)?;
        self.temp.reshape(width, height)?;
        if pixels > self.largest {
            self.largest = pixels;
            self.stats.growths += 1;
        }
        self.stats.frames += 1;
        Ok(())
    }

    /// Reuse counters since creation
    pub fn stats(&self) -> ScratchStats {
        self.stats
    }

    /// Release all memory
    pub fn clear(&mut self) {
        *self = Self {
            stats: self.stats,
            ..Self::default()
        };
    }
}
