//! Pixel-level helpers for frame analysis
//!
//! - Luminance conversion (crude, perceptual or custom)
//! - Histograms, Otsu and very-very-dark thresholds, rectangle means
//! - Dilation, box blur and downslope counting
//! - Reusable per-frame scratch buffers

/// Dilation, box blur and downslopes
pub mod filters;
/// Pixel to luminance conversion
pub mod luminance;
/// Reusable per-frame buffers
pub mod scratch;
/// Histograms and thresholds
pub mod threshold;
