/// Finder pattern detection over blobs
///
/// A QR finder pattern is a dark 7x7-module square ring, around a light
/// 5x5 ring, around a dark 3x3 core. In blob terms: a foreground blob whose
/// main enclosed background blob itself encloses one foreground blob, with
/// side ratios near 7:5:3. Candidates are scored in `[0, 1]` instead of
/// accepted or rejected outright, since codes are counted even when they
/// are too distorted to decode.
use super::blobs::BlobSet;
use crate::config::AnalysisConfig;
use crate::models::{Blob, BlobId};

/// Outer ring side : light ring side : core side
const RING_RATIO: f32 = 5.0 / 7.0;
const CORE_RATIO: f32 = 3.0 / 7.0;

/// Noise holes up to this share of the enclosing blob's pixels are absorbed
const HOLE_FRACTION: f32 = 0.1;

/// Tolerances for finder detection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinderParams {
    /// Smallest finder side in pixels
    pub min_side: usize,
    /// Largest finder side in pixels
    pub max_side: usize,
    /// Largest allowed `1 - aspect` of the outer ring's bounding box
    pub aspect_tolerance: f32,
    /// Candidates scoring below this are dropped
    pub min_confidence: f32,
}

impl FinderParams {
    /// Parameters taken from an analyzer configuration
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            min_side: config.finder_min_side,
            max_side: config.finder_max_side(),
            aspect_tolerance: config.finder_aspect_tolerance,
            min_confidence: config.finder_min_confidence,
        }
    }
}

impl Default for FinderParams {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

/// The blobs nested inside one finder candidate
#[derive(Debug, Clone, PartialEq)]
pub struct FinderNesting {
    /// Light ring directly inside the outer dark ring
    pub ring: BlobId,
    /// Dark core inside the light ring
    pub core: BlobId,
    /// Noise holes folded into the outer ring or the core
    pub absorbed: Vec<BlobId>,
}

/// Score of a ratio against its ideal value, 1 when exact
fn ratio_score(actual: f32, expected: f32) -> f32 {
    (1.0 - (actual / expected - 1.0).abs()).clamp(0.0, 1.0)
}

fn largest(blobs: &BlobSet, ids: &[BlobId]) -> Option<BlobId> {
    ids.iter().copied().max_by_key(|&id| blobs.get(id).pixel_count)
}

/// Small children of `id` other than `keep`, with their total pixel count
fn noise_holes(blobs: &BlobSet, id: BlobId, keep: Option<BlobId>) -> (Vec<BlobId>, usize) {
    let limit = (blobs.get(id).pixel_count as f32 * HOLE_FRACTION) as usize;
    let holes: Vec<BlobId> = blobs
        .children(id)
        .iter()
        .copied()
        .filter(|&c| Some(c) != keep && blobs.get(c).pixel_count <= limit)
        .collect();
    let pixels = holes.iter().map(|&h| blobs.get(h).pixel_count).sum();
    (holes, pixels)
}

/// Scores foreground blobs as finder patterns
pub struct FinderDetector;

impl FinderDetector {
    /// Score every foreground blob and return the ones above the confidence floor.
    ///
    /// Writes `confidence` on every scored blob and `coalescable` on the noise
    /// holes absorbed by accepted finders.
    pub fn detect(blobs: &mut BlobSet, params: &FinderParams) -> Vec<BlobId> {
        let mut finders = Vec::new();
        for id in 0..blobs.len() {
            if !blobs.get(id).is_foreground() {
                continue;
            }
            let Some((confidence, nesting)) = Self::score(blobs, id, params) else {
                continue;
            };
            blobs.blobs_mut()[id].confidence = confidence;
            if confidence < params.min_confidence {
                log::trace!("finder candidate {id} rejected, confidence {confidence:.2}");
                continue;
            }
            for &hole in &nesting.absorbed {
                blobs.blobs_mut()[hole].coalescable = true;
            }
            finders.push(id);
        }
        finders
    }

    /// Confidence that blob `id` is a finder pattern, with the nesting it relies on.
    ///
    /// `None` when the blob is outside the size window, too far from square,
    /// or lacks the light-ring/dark-core nesting.
    pub fn score(blobs: &BlobSet, id: BlobId, params: &FinderParams) -> Option<(f32, FinderNesting)> {
        let outer: &Blob = blobs.get(id);
        let side = outer.bounds.side();
        if side < params.min_side || side > params.max_side {
            return None;
        }
        let aspect = outer.aspect();
        if 1.0 - aspect > params.aspect_tolerance {
            return None;
        }

        let ring_id = largest(blobs, blobs.children(id))?;
        let core_id = largest(blobs, blobs.children(ring_id))?;
        let ring = blobs.get(ring_id);
        let core = blobs.get(core_id);

        let (mut absorbed, outer_holes) = noise_holes(blobs, id, Some(ring_id));
        let (core_hole_ids, core_holes) = noise_holes(blobs, core_id, None);
        absorbed.extend(core_hole_ids);

        let (ow, oh) = (outer.width() as f32, outer.height() as f32);
        let aspect_score = 1.0 - 0.5 * (1.0 - aspect) / params.aspect_tolerance.max(f32::EPSILON);
        let ring_score = ratio_score(ring.width() as f32 / ow, RING_RATIO)
            * ratio_score(ring.height() as f32 / oh, RING_RATIO);
        let core_score = ratio_score(core.width() as f32 / ow, CORE_RATIO)
            * ratio_score(core.height() as f32 / oh, CORE_RATIO);

        let offset = outer.center().distance(&core.center()) / (side as f32 / 2.0);
        let center_score = (1.0 - offset).clamp(0.0, 1.0);

        let core_fill =
            ((core.pixel_count + core_holes) as f32 / core.bounds.area() as f32).min(1.0);
        let expected_outer = outer.bounds.area().saturating_sub(ring.bounds.area()).max(1);
        let outer_fill = ratio_score(
            (outer.pixel_count + outer_holes) as f32 / expected_outer as f32,
            1.0,
        );

        let confidence = (aspect_score * ring_score * core_score * center_score * core_fill * outer_fill)
            .clamp(0.0, 1.0);
        Some((
            confidence,
            FinderNesting {
                ring: ring_id,
                core: core_id,
                absorbed,
            },
        ))
    }

    /// Estimated module size of a finder blob: its side spans 7 modules
    pub fn module_size(blob: &Blob) -> f32 {
        (blob.width() + blob.height()) as f32 / 14.0
    }
}
