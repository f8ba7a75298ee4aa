/// Convert 4-byte color pixels to 16-bit luminance samples
///
/// The default (crude) model is Y = R + G + B, giving values in
/// `0..LUMINANCES`. The perceptual model uses Rec. 709 weights scaled by 3 so
/// both models share one range. Rows are converted in parallel with rayon.
use crate::config::{ChannelOrder, LuminanceModel};
use crate::error::{AnalysisError, Result};
use crate::models::{LumaGrid, MAX_LUMINANCE};
use rayon::prelude::*;

/// Bytes per pixel of the input buffers
pub const BYTES_PER_PIXEL: usize = 4;

/// Scaled Rec. 709 coefficients: Y = (653*R + 2197*G + 222*B) >> 10 ~= 3 * (0.2126R + 0.7152G + 0.0722B)
const COEF_R: u32 = 653;
const COEF_G: u32 = 2197;
const COEF_B: u32 = 222;

/// Crude luminance: the plain channel sum
#[inline]
pub fn lumi_crude(r: u8, g: u8, b: u8) -> u16 {
    r as u16 + g as u16 + b as u16
}

/// Perceptually weighted luminance in the same `0..=765` range
#[inline]
pub fn lumi_percept(r: u8, g: u8, b: u8) -> u16 {
    let lum = (COEF_R * r as u32 + COEF_G * g as u32 + COEF_B * b as u32) >> 10;
    (lum as u16).min(MAX_LUMINANCE)
}

impl LuminanceModel {
    /// Luminance of one pixel under this model
    #[inline]
    pub fn apply(self, r: u8, g: u8, b: u8) -> u16 {
        match self {
            LuminanceModel::Crude => lumi_crude(r, g, b),
            LuminanceModel::Perceptual => lumi_percept(r, g, b),
        }
    }
}

fn check_input(pixels: &[u8], width: usize, height: usize) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(AnalysisError::EmptyFrame { width, height });
    }
    let expected = width * height * BYTES_PER_PIXEL;
    if pixels.len() < expected {
        return Err(AnalysisError::BufferTooSmall {
            expected,
            actual: pixels.len(),
        });
    }
    Ok(())
}

/// Convert a color frame to a new luminance grid
pub fn to_luminance(
    pixels: &[u8],
    width: usize,
    height: usize,
    order: ChannelOrder,
    model: LuminanceModel,
) -> Result<LumaGrid> {
    let mut out = LumaGrid::default();
    to_luminance_into(pixels, width, height, order, model, &mut out)?;
    Ok(out)
}

/// Convert a color frame into a reusable grid (no allocation once warmed up)
pub fn to_luminance_into(
    pixels: &[u8],
    width: usize,
    height: usize,
    order: ChannelOrder,
    model: LuminanceModel,
    out: &mut LumaGrid,
) -> Result<()> {
    to_luminance_with(pixels, width, height, order, |r, g, b| model.apply(r, g, b), out)
}

/// Convert a color frame with a caller-supplied luminance function.
///
/// `lumi` receives `(r, g, b)` already reordered per `order`; its result is
/// clamped to the luminance range.
pub fn to_luminance_with<F>(
    pixels: &[u8],
    width: usize,
    height: usize,
    order: ChannelOrder,
    lumi: F,
    out: &mut LumaGrid,
) -> Result<()>
where
    F: Fn(u8, u8, u8) -> u16 + Sync,
{
    check_input(pixels, width, height)?;
    out.reshape(width, height)?;
    let (ri, gi, bi) = order.offsets();
    let row_bytes = width * BYTES_PER_PIXEL;

    out.as_mut_slice()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let src = &pixels[y * row_bytes..(y + 1) * row_bytes];
            for (dst, px) in row.iter_mut().zip(src.chunks_exact(BYTES_PER_PIXEL)) {
                *dst = lumi(px[ri], px[gi], px[bi]).min(MAX_LUMINANCE);
            }
        });

    Ok(())
}
