use super::{BoundingBox, Point};
use serde::Serialize;

/// Index of a blob within one frame's blob list
pub type BlobId = usize;

/// Pixel class of a run or blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[repr(u8)]
pub enum PixelClass {
    /// Light pixels
    #[default]
    Background = 0,
    /// Dark pixels
    Foreground = 1,
}

/// One connected component of same-class runs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Blob {
    /// Index of the representative run in the run arena
    pub root: u32,
    /// Class shared by every run of the blob
    pub class: PixelClass,
    /// Number of pixels
    pub pixel_count: usize,
    /// Number of runs
    pub run_count: usize,
    /// Inclusive pixel bounds
    pub bounds: BoundingBox,
    /// Pixels in the frame's top row
    pub top_pixels: usize,
    /// Pixels in the frame's bottom row
    pub bottom_pixels: usize,
    /// Pixels in the frame's left column
    pub left_pixels: usize,
    /// Pixels in the frame's right column
    pub right_pixels: usize,
    /// Luminance reversals inside foreground runs (coarse texture)
    pub slope_count: usize,
    /// Narrowest span between two reversals, if any were seen
    pub min_slope_width: Option<usize>,
    /// Blob immediately surrounding this one, if it does not touch the left edge of its top row
    pub parent: Option<BlobId>,
    /// Finder-pattern confidence in `[0, 1]`, set by the finder detector
    pub confidence: f32,
    /// Background blob that may be folded into an enclosing foreground blob
    pub coalescable: bool,
}

impl Blob {
    /// A blob seeded from its first run
    pub(crate) fn seed(root: u32, class: PixelClass, y: usize, x_start: usize, x_end: usize) -> Self {
        Self {
            root,
            class,
            pixel_count: 0,
            run_count: 0,
            bounds: BoundingBox::of_span(y, x_start, x_end),
            top_pixels: 0,
            bottom_pixels: 0,
            left_pixels: 0,
            right_pixels: 0,
            slope_count: 0,
            min_slope_width: None,
            parent: None,
            confidence: 0.0,
            coalescable: false,
        }
    }

    /// True for dark blobs
    pub fn is_foreground(&self) -> bool {
        self.class == PixelClass::Foreground
    }

    /// Bounding box width
    pub fn width(&self) -> usize {
        self.bounds.width()
    }

    /// Bounding box height
    pub fn height(&self) -> usize {
        self.bounds.height()
    }

    /// Center of the bounding box
    pub fn center(&self) -> Point {
        self.bounds.center()
    }

    /// Some pixel lies on row 0
    pub fn touches_top(&self) -> bool {
        self.top_pixels > 0
    }

    /// Some pixel lies on the last row
    pub fn touches_bottom(&self) -> bool {
        self.bottom_pixels > 0
    }

    /// Some pixel lies on column 0
    pub fn touches_left(&self) -> bool {
        self.left_pixels > 0
    }

    /// Some pixel lies on the last column
    pub fn touches_right(&self) -> bool {
        self.right_pixels > 0
    }

    /// True if any pixel lies on the frame border
    pub fn touches_edge(&self) -> bool {
        self.touches_top() || self.touches_bottom() || self.touches_left() || self.touches_right()
    }

    /// Short side over long side of the bounding box, in `(0, 1]`
    pub fn aspect(&self) -> f32 {
        let (w, h) = (self.width() as f32, self.height() as f32);
        w.min(h) / w.max(h)
    }
}
