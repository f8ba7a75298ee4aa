//! Tunable constants of the analysis pipeline.
//!
//! Every knob has a default that works for 640x480-ish camera frames and can
//! be overridden with a `QR_*` environment variable through
//! [`AnalysisConfig::from_env`].

use crate::error::{AnalysisError, Result};
use serde::{Deserialize, Serialize};

/// Byte order of the color channels in a 4-byte pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    /// Red, green, blue, alpha (desktop captures, decoded image files)
    #[default]
    Rgba,
    /// Blue, green, red, alpha (typical mobile video capture)
    Bgra,
}

impl ChannelOrder {
    /// Byte offsets of red, green and blue inside one pixel
    pub fn offsets(self) -> (usize, usize, usize) {
        match self {
            ChannelOrder::Rgba => (0, 1, 2),
            ChannelOrder::Bgra => (2, 1, 0),
        }
    }
}

/// How three color channels collapse into one luminance sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LuminanceModel {
    /// `r + g + b`
    #[default]
    Crude,
    /// Rec. 709 weights scaled to the same `0..=765` range
    Perceptual,
}

/// Configuration for one [`Analyzer`](crate::Analyzer)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Byte layout of input pixels
    pub channel_order: ChannelOrder,
    /// Pixel to luminance conversion
    pub luminance_model: LuminanceModel,
    /// Smallest QR region side, in frame pixels
    pub min_qr_size: usize,
    /// Largest QR region side, in frame pixels
    pub max_qr_size: usize,
    /// Radius of the darkest-neighbour (minimum) filter feeding region density
    pub dilation_radius: usize,
    /// Radius of the box blur feeding variegation
    pub blur_radius: usize,
    /// Section grid cells along each axis
    pub section_units: usize,
    /// Finder candidates scoring below this are dropped
    pub finder_min_confidence: f32,
    /// QR regions scoring below this are dropped
    pub region_min_confidence: f32,
    /// Fraction of pixels at or below the very-very-dark threshold
    pub very_very_dark_fraction: f64,
    /// Smallest finder side (one pixel per module)
    pub finder_min_side: usize,
    /// Allowed deviation of a finder's aspect ratio from 1
    pub finder_aspect_tolerance: f32,
    /// Shortest downslope counted by the sectioner
    pub downslope_min_width: usize,
    /// Sections at or above this variegation get their own threshold
    pub variegation_floor: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            channel_order: ChannelOrder::Rgba,
            luminance_model: LuminanceModel::Crude,
            min_qr_size: 40,
            max_qr_size: 300,
            dilation_radius: 1,
            blur_radius: 1,
            section_units: 8,
            finder_min_confidence: 0.35,
            region_min_confidence: 0.2,
            very_very_dark_fraction: 0.005,
            finder_min_side: 7,
            finder_aspect_tolerance: 0.35,
            downslope_min_width: 2,
            variegation_floor: 0.5,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

impl AnalysisConfig {
    /// Defaults overlaid with `QR_*` environment variables
    pub fn from_env() -> Self {
        let base = Self::default();
        let channel_order = match std::env::var("QR_CHANNEL_ORDER") {
            Ok(v) if v.trim().eq_ignore_ascii_case("bgra") => ChannelOrder::Bgra,
            Ok(v) if v.trim().eq_ignore_ascii_case("rgba") => ChannelOrder::Rgba,
            _ => base.channel_order,
        };
        let luminance_model = match std::env::var("QR_LUMINANCE") {
            Ok(v) if v.trim().eq_ignore_ascii_case("perceptual") => LuminanceModel::Perceptual,
            Ok(v) if v.trim().eq_ignore_ascii_case("crude") => LuminanceModel::Crude,
            _ => base.luminance_model,
        };
        Self {
            channel_order,
            luminance_model,
            min_qr_size: parse_env("QR_MIN_SIZE", base.min_qr_size),
            max_qr_size: parse_env("QR_MAX_SIZE", base.max_qr_size),
            dilation_radius: parse_env("QR_DILATION_RADIUS", base.dilation_radius).min(16),
            blur_radius: parse_env("QR_BLUR_RADIUS", base.blur_radius).min(16),
            section_units: parse_env("QR_SECTION_UNITS", base.section_units).clamp(1, 64),
            finder_min_confidence: parse_env("QR_FINDER_MIN_CONFIDENCE", base.finder_min_confidence),
            region_min_confidence: parse_env("QR_REGION_MIN_CONFIDENCE", base.region_min_confidence),
            very_very_dark_fraction: parse_env("QR_VVD_FRACTION", base.very_very_dark_fraction),
            finder_min_side: parse_env("QR_FINDER_MIN_SIDE", base.finder_min_side),
            finder_aspect_tolerance: parse_env(
                "QR_FINDER_ASPECT_TOLERANCE",
                base.finder_aspect_tolerance,
            ),
            downslope_min_width: parse_env("QR_DOWNSLOPE_MIN_WIDTH", base.downslope_min_width),
            variegation_floor: parse_env("QR_VARIEGATION_FLOOR", base.variegation_floor),
        }
    }

    /// Largest finder side worth considering: a version 1 code at `max_qr_size`
    pub fn finder_max_side(&self) -> usize {
        (self.max_qr_size * 7).div_ceil(21)
    }

    /// Reject contradictory settings
    pub fn validate(&self) -> Result<()> {
        if self.min_qr_size > self.max_qr_size {
            return Err(AnalysisError::InvalidConfig(format!(
                "min_qr_size {} exceeds max_qr_size {}",
                self.min_qr_size, self.max_qr_size
            )));
        }
        if self.section_units == 0 {
            return Err(AnalysisError::InvalidConfig("section_units must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.very_very_dark_fraction) {
            return Err(AnalysisError::InvalidConfig(format!(
                "very_very_dark_fraction {} outside [0, 1]",
                self.very_very_dark_fraction
            )));
        }
        for (name, value) in [
            ("finder_min_confidence", self.finder_min_confidence),
            ("region_min_confidence", self.region_min_confidence),
            ("finder_aspect_tolerance", self.finder_aspect_tolerance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(AnalysisError::InvalidConfig(format!("{name} {value} outside [0, 1]")));
            }
        }
        if self.finder_min_side == 0 || self.finder_min_side > self.finder_max_side() {
            return Err(AnalysisError::InvalidConfig(format!(
                "finder_min_side {} outside 1..={}",
                self.finder_min_side,
                self.finder_max_side()
            )));
        }
        Ok(())
    }
}
