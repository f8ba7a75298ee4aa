//! Helpers shared by the CLI, benches and tests: image loading and a
//! synthetic frame builder.

use crate::config::ChannelOrder;
use crate::models::LumaGrid;
use crate::utils::luminance::BYTES_PER_PIXEL;
use image::GenericImageView;
use std::env;
use std::path::Path;

fn max_dim_from_env() -> Option<u32> {
    match env::var("QR_MAX_DIM") {
        Ok(value) => match value.trim().parse::<u32>() {
            Ok(0) => None,
            Ok(v) => Some(v),
            Err(_) => None,
        },
        Err(_) => None,
    }
}

/// Load an image as 4-byte pixels in `order`, with its dimensions.
///
/// `QR_MAX_DIM` downscales large images so the longer side fits.
pub fn load_pixels<P: AsRef<Path>>(
    path: P,
    order: ChannelOrder,
) -> Result<(Vec<u8>, usize, usize), image::ImageError> {
    let img = image::open(path)?;
    let img = match max_dim_from_env() {
        Some(max_dim) if img.dimensions().0.max(img.dimensions().1) > max_dim => {
            img.resize(max_dim, max_dim, image::imageops::FilterType::Triangle)
        }
        _ => img,
    };
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut pixels = rgba.into_raw();
    if order == ChannelOrder::Bgra {
        for px in pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.swap(0, 2);
        }
    }
    Ok((pixels, width as usize, height as usize))
}

/// Grayscale canvas for building test frames.
///
/// Starts white. Drawing is clipped to the canvas.
#[derive(Debug, Clone)]
pub struct SyntheticFrame {
    width: usize,
    height: usize,
    gray: Vec<u8>,
}

impl SyntheticFrame {
    /// White `width` x `height` canvas
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            gray: vec![255; width * height],
        }
    }

    /// Frame width in pixels
    pub fn width(&self) -> usize {
        self.width
    }

    /// Frame height in pixels
    pub fn height(&self) -> usize {
        self.height
    }

    /// Paint a rectangle with gray level `value`
    pub fn fill_rect(&mut self, x: usize, y: usize, w: usize, h: usize, value: u8) -> &mut Self {
        let x_end = (x + w).min(self.width);
        let y_end = (y + h).min(self.height);
        for yy in y.min(y_end)..y_end {
            let row = yy * self.width;
            self.gray[row + x.min(x_end)..row + x_end].fill(value);
        }
        self
    }

    /// Draw a finder pattern with its top-left corner at (x, y)
    pub fn finder(&mut self, x: usize, y: usize, module: usize) -> &mut Self {
        self.fill_rect(x, y, 7 * module, 7 * module, 0)
            .fill_rect(x + module, y + module, 5 * module, 5 * module, 255)
            .fill_rect(x + 2 * module, y + 2 * module, 3 * module, 3 * module, 0)
    }

    /// Draw a 21x21-module code: three finders plus pseudo-random data
    /// modules outside the finder separators.
    pub fn qr_code(&mut self, x: usize, y: usize, module: usize, seed: u32) -> &mut Self {
        const DIM: usize = 21;
        self.finder(x, y, module)
            .finder(x + (DIM - 7) * module, y, module)
            .finder(x, y + (DIM - 7) * module, module);

        let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
        for my in 0..DIM {
            for mx in 0..DIM {
                let near_left = mx < 8;
                let near_top = my < 8;
                let near_right = mx >= DIM - 8;
                let near_bottom = my >= DIM - 8;
                if (near_left && near_top) || (near_right && near_top) || (near_left && near_bottom) {
                    continue;
                }
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                if state >> 31 == 1 {
                    self.fill_rect(x + mx * module, y + my * module, module, module, 0);
                }
            }
        }
        self
    }

    /// Gray levels, row-major
    pub fn gray(&self) -> &[u8] {
        &self.gray
    }

    /// Expand to 4-byte pixels in `order` (opaque alpha)
    pub fn to_pixels(&self, order: ChannelOrder) -> Vec<u8> {
        let (r, g, b) = order.offsets();
        let mut out = vec![255u8; self.gray.len() * BYTES_PER_PIXEL];
        for (px, &v) in out.chunks_exact_mut(BYTES_PER_PIXEL).zip(&self.gray) {
            px[r] = v;
            px[g] = v;
            px[b] = v;
        }
        out
    }

    /// Crude luminance grid (sum of the three equal channels)
    pub fn to_luma(&self) -> LumaGrid {
        let mut grid = LumaGrid::new(self.width, self.height);
        for (d, &v) in grid.as_mut_slice().iter_mut().zip(&self.gray) {
            *d = 3 * v as u16;
        }
        grid
    }
}
