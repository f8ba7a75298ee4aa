//! Core data structures for frame analysis

/// Connected components and their geometry
pub mod blob;
/// Luminance grids
pub mod grid;
/// 2D points
pub mod point;
/// Rectangles and bounding boxes
pub mod rect;
/// Per-section statistics
pub mod section;

pub use blob::{Blob, BlobId, PixelClass};
pub use grid::{LUMINANCES, LumaGrid, MAX_LUMINANCE};
pub use point::Point;
pub use rect::{BoundingBox, Rect};
pub use section::Section;
