use super::Rect;
use serde::Serialize;

/// One cell of the grid laid over a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    /// Left column
    pub x: usize,
    /// Top row
    pub y: usize,
    /// Width in pixels
    pub w: usize,
    /// Height in pixels
    pub h: usize,
    /// Mean luminance, rounded half up
    pub mean_luminance: u16,
    /// Qualifying downslopes per row, a rough texture measure
    pub variegation: f64,
    /// Dark/light threshold to use inside this cell
    pub threshold: u16,
}

impl Section {
    /// Cell area as a rectangle
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.w, self.h)
    }
}
