//! qr_tally - count QR codes in live camera frames
//!
//! Locates code-like regions well enough to count them, including codes too
//! distorted, distant or angled to decode. Each frame goes through
//! luminance conversion, thresholding, dilation, run-length encoding,
//! union-find blob extraction, finder pattern scoring, QR-region assembly and
//! per-section statistics. Payload decoding is left to other crates.

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Tunable pipeline constants
pub mod config;
/// Frame analysis stages (runs, blobs, finders, regions, sections)
pub mod detector;
/// Error types
pub mod error;
/// Optional persistence of analyzed frames
pub mod frame_log;
/// Majority vote over per-frame counts
pub mod majority;
/// Core data structures (grids, blobs, boxes, sections)
pub mod models;
/// The per-frame analysis facade
pub mod pipeline;
/// Image loading and synthetic frames for tools, tests and benches
pub mod tools;
/// Pixel-level helpers (luminance, thresholds, filters, scratch)
pub mod utils;

pub use config::{AnalysisConfig, ChannelOrder, LuminanceModel};
pub use detector::qr_region::QrRegion;
pub use error::{AnalysisError, Result};
pub use frame_log::{FrameLogError, FrameSink, PngFrameSink};
pub use majority::{MajorityTracker, Vote};
pub use models::{Blob, BlobId, BoundingBox, LumaGrid, PixelClass, Point, Rect, Section};
pub use pipeline::{Analysis, Analyzer, Stage, Thresholds};

/// Analyze one RGBA frame with the default configuration
///
/// # Arguments
/// * `pixels` - Raw RGBA bytes (4 bytes per pixel)
/// * `width` - Frame width in pixels
/// * `height` - Frame height in pixels
///
/// Never fails: unusable input gives a degenerate [`Analysis`].
pub fn analyze(pixels: &[u8], width: usize, height: usize) -> Analysis {
    Analyzer::default().analyze(pixels, width, height)
}

/// Number of QR codes in one RGBA frame
pub fn count_qr_codes(pixels: &[u8], width: usize, height: usize) -> usize {
    analyze(pixels, width, height).qr_count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_empty() {
        // Black 10x10 RGBA frame
        let image = vec![0u8; 400];
        let analysis = analyze(&image, 10, 10);
        assert!(!analysis.is_degenerate());
        assert_eq!(analysis.qr_count(), 0);
    }

    #[test]
    fn test_count_rejects_short_buffer() {
        assert_eq!(count_qr_codes(&[0u8; 10], 10, 10), 0);
        assert!(analyze(&[0u8; 10], 10, 10).is_degenerate());
    }
}
