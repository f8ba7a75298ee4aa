use super::Point;
use serde::Serialize;

/// Axis-aligned rectangle given by origin and size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Rect {
    /// Left column
    pub x: usize,
    /// Top row
    pub y: usize,
    /// Width in pixels
    pub w: usize,
    /// Height in pixels
    pub h: usize,
}

impl Rect {
    /// Create a new rectangle
    pub fn new(x: usize, y: usize, w: usize, h: usize) -> Self {
        Self { x, y, w, h }
    }

    /// Clip to a `width` x `height` frame. The result may have zero area.
    pub fn clamp_to(&self, width: usize, height: usize) -> Rect {
        let x = self.x.min(width);
        let y = self.y.min(height);
        let w = self.w.min(width - x);
        let h = self.h.min(height - y);
        Rect { x, y, w, h }
    }

    /// Number of pixels covered
    pub fn area(&self) -> usize {
        self.w * self.h
    }
}

/// Inclusive pixel bounds of a blob or region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    /// Leftmost pixel column
    pub min_x: usize,
    /// Rightmost pixel column
    pub max_x: usize,
    /// Topmost pixel row
    pub min_y: usize,
    /// Bottommost pixel row
    pub max_y: usize,
}

impl BoundingBox {
    /// Box covering the horizontal span `[x_start, x_end)` of row `y`
    pub fn of_span(y: usize, x_start: usize, x_end: usize) -> Self {
        Self {
            min_x: x_start,
            max_x: x_end - 1,
            min_y: y,
            max_y: y,
        }
    }

    /// Grow to cover the horizontal span `[x_start, x_end)` of row `y`
    pub fn extend_span(&mut self, y: usize, x_start: usize, x_end: usize) {
        self.min_x = self.min_x.min(x_start);
        self.max_x = self.max_x.max(x_end - 1);
        self.min_y = self.min_y.min(y);
        self.max_y = self.max_y.max(y);
    }

    /// Width in pixels
    pub fn width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    /// Height in pixels
    pub fn height(&self) -> usize {
        self.max_y - self.min_y + 1
    }

    /// Longer side
    pub fn side(&self) -> usize {
        self.width().max(self.height())
    }

    /// Pixel count of the box
    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    /// Geometric center
    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) as f32 / 2.0,
            (self.min_y + self.max_y) as f32 / 2.0,
        )
    }

    /// Smallest box covering both
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min_x: self.min_x.min(other.min_x),
            max_x: self.max_x.max(other.max_x),
            min_y: self.min_y.min(other.min_y),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// True if `other` lies entirely inside this box
    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }

    /// True if `p` lies within the box, edges included
    pub fn contains_point(&self, p: &Point) -> bool {
        p.x >= self.min_x as f32
            && p.x <= self.max_x as f32
            && p.y >= self.min_y as f32
            && p.y <= self.max_y as f32
    }

    /// Number of pixels shared by both boxes
    pub fn intersection_area(&self, other: &BoundingBox) -> usize {
        let min_x = self.min_x.max(other.min_x);
        let max_x = self.max_x.min(other.max_x);
        let min_y = self.min_y.max(other.min_y);
        let max_y = self.max_y.min(other.max_y);
        if min_x > max_x || min_y > max_y {
            return 0;
        }
        (max_x - min_x + 1) * (max_y - min_y + 1)
    }

    /// As an origin/size rectangle
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.min_x, self.min_y, self.width(), self.height())
    }
}
