/// QR-region assembly from finder patterns
///
/// Three finder patterns of similar module size sitting at the corners of a
/// right angle make one code. The region box covers the three finders plus
/// the fourth corner implied by the parallelogram they span. Candidates are
/// scored, then overlapping ones are reduced to the most confident.
use super::blobs::BlobSet;
use super::finder::FinderDetector;
use crate::config::AnalysisConfig;
use crate::models::{BlobId, BoundingBox, LumaGrid, Point};
use serde::Serialize;

/// Finders considered per frame, most confident first
const MAX_FINDERS: usize = 60;
/// Largest `|cos|` accepted for the corner angle
const MAX_CORNER_COS: f32 = 0.3;
/// Largest ratio between finder module sizes, and between the two legs
const MAX_SCALE_RATIO: f32 = 1.5;
/// Largest difference of the dimension estimates along both legs
const MAX_DIMENSION_SKEW: usize = 4;
/// Shortest leg, in modules plus the 7 of one finder; a version 1 code has 21
const MIN_RAW_DIMENSION: f32 = 20.0;
/// Candidates sharing more than this share of the smaller box overlap
const OVERLAP_FRACTION: f32 = 0.25;
/// Dark pixel share at which a region counts as fully populated
const FULL_DENSITY: f32 = 0.4;

/// A located code
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QrRegion {
    /// Bounds in frame pixels, clipped to the frame
    pub bounds: BoundingBox,
    /// Score in `[0, 1]`
    pub confidence: f32,
    /// Finder blobs: corner, then top-right and bottom-left for an upright code
    pub finders: [BlobId; 3],
}

/// Tolerances for region assembly
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionParams {
    /// Smallest region side in pixels
    pub min_side: usize,
    /// Largest region side in pixels
    pub max_side: usize,
    /// Regions scoring below this are dropped
    pub min_confidence: f32,
}

impl RegionParams {
    /// Parameters taken from an analyzer configuration
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            min_side: config.min_qr_size,
            max_side: config.max_qr_size,
            min_confidence: config.region_min_confidence,
        }
    }
}

impl Default for RegionParams {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

#[derive(Debug, Clone, Copy)]
struct FinderGeom {
    id: BlobId,
    center: Point,
    module_size: f32,
    half_side: f32,
    bounds: BoundingBox,
    confidence: f32,
}

/// Corner-first ordering of a finder triple, with its shape scores
struct Arrangement {
    corner: usize,
    first: usize,
    second: usize,
    corner_cos: f32,
    leg_ratio: f32,
}

/// Code dimension in modules implied by the distance between two finder centers
fn estimate_dimension_from_distance(distance: f32, module_size: f32) -> Option<usize> {
    if module_size <= 0.0 {
        return None;
    }
    let raw_dim = distance / module_size + 7.0;
    if raw_dim < MIN_RAW_DIMENSION {
        return None;
    }
    let version = ((raw_dim - 17.0) / 4.0).round().clamp(1.0, 40.0) as usize;
    Some(17 + 4 * version)
}

fn order_finder_patterns(g: &[FinderGeom; 3]) -> Option<Arrangement> {
    let mut best: Option<(usize, f32)> = None;
    for i in 0..3 {
        let p = g[i].center;
        let p1 = g[(i + 1) % 3].center;
        let p2 = g[(i + 2) % 3].center;
        let (v1x, v1y) = (p1.x - p.x, p1.y - p.y);
        let (v2x, v2y) = (p2.x - p.x, p2.y - p.y);
        let denom = (v1x * v1x + v1y * v1y).sqrt() * (v2x * v2x + v2y * v2y).sqrt();
        if denom == 0.0 {
            continue;
        }
        let cos = ((v1x * v2x + v1y * v2y) / denom).abs();
        if best.is_none_or(|(_, c)| cos < c) {
            best = Some((i, cos));
        }
    }
    let (corner, corner_cos) = best?;
    if corner_cos >= MAX_CORNER_COS {
        return None;
    }

    let (p1, p2) = ((corner + 1) % 3, (corner + 2) % 3);
    let c = g[corner].center;
    let cross = (g[p1].center.x - c.x) * (g[p2].center.y - c.y)
        - (g[p1].center.y - c.y) * (g[p2].center.x - c.x);
    // With y pointing down, `first` is the top-right finder of an upright code
    let (first, second) = if cross > 0.0 { (p1, p2) } else { (p2, p1) };
    let avg_module = g.iter().map(|f| f.module_size).sum::<f32>() / 3.0;
    let d1 = g[corner].center.distance(&g[first].center);
    let d2 = g[corner].center.distance(&g[second].center);
    let dim1 = estimate_dimension_from_distance(d1, avg_module)?;
    let dim2 = estimate_dimension_from_distance(d2, avg_module)?;
    if dim1.abs_diff(dim2) > MAX_DIMENSION_SKEW {
        return None;
    }
    let leg_ratio = d1.max(d2) / d1.min(d2);
    if leg_ratio > MAX_SCALE_RATIO {
        return None;
    }

    Some(Arrangement {
        corner,
        first,
        second,
        corner_cos,
        leg_ratio,
    })
}

fn clamp_box(center: Point, half: f32, width: usize, height: usize) -> Option<BoundingBox> {
    if width == 0 || height == 0 {
        return None;
    }
    let (max_x, max_y) = (width as f32 - 1.0, height as f32 - 1.0);
    let x0 = (center.x - half).round().clamp(0.0, max_x);
    let x1 = (center.x + half).round().clamp(0.0, max_x);
    let y0 = (center.y - half).round().clamp(0.0, max_y);
    let y1 = (center.y + half).round().clamp(0.0, max_y);
    Some(BoundingBox {
        min_x: x0 as usize,
        max_x: x1 as usize,
        min_y: y0 as usize,
        max_y: y1 as usize,
    })
}

/// Share of pixels in `bounds` at or below the foreground level
fn dark_fraction(grid: &LumaGrid, bounds: &BoundingBox, level: u16) -> f32 {
    let r = bounds.to_rect().clamp_to(grid.width(), grid.height());
    if r.area() == 0 {
        return 0.0;
    }
    let dark: usize = (r.y..r.y + r.h)
        .map(|y| grid.row(y)[r.x..r.x + r.w].iter().filter(|&&p| p <= level).count())
        .sum();
    dark as f32 / r.area() as f32
}

/// A finder of similar scale, not part of `triple`, whose center lies inside the region.
///
/// Three finders spanning several codes enclose the finders of those codes;
/// a real code holds only its own three.
fn foreign_finder(region: &QrRegion, triple: &[FinderGeom; 3], geoms: &[FinderGeom]) -> Option<BlobId> {
    let module = triple.iter().map(|f| f.module_size).sum::<f32>() / 3.0;
    geoms
        .iter()
        .filter(|g| !region.finders.contains(&g.id))
        .filter(|g| {
            let ratio = g.module_size.max(module) / g.module_size.min(module).max(f32::EPSILON);
            ratio <= MAX_SCALE_RATIO
        })
        .find(|g| region.bounds.contains_point(&g.center))
        .map(|g| g.id)
}

/// Builds QR regions out of the finders of one frame
pub struct QrRegionAssembler<'a> {
    params: RegionParams,
    width: usize,
    height: usize,
    density: Option<(&'a LumaGrid, u16)>,
}

impl<'a> QrRegionAssembler<'a> {
    /// Assembler for a `width` x `height` frame
    pub fn new(params: RegionParams, width: usize, height: usize) -> Self {
        Self {
            params,
            width,
            height,
            density: None,
        }
    }

    /// Weigh candidates by how much of their box is dark on `grid`
    pub fn with_density(mut self, grid: &'a LumaGrid, foreground: u16) -> Self {
        self.density = Some((grid, foreground));
        self
    }

    /// Assemble, deduplicate and return the regions of one frame.
    ///
    /// Background blobs lying inside an accepted region are marked
    /// coalescable.
    pub fn assemble(&self, blobs: &mut BlobSet, finders: &[BlobId]) -> Vec<QrRegion> {
        let regions = dedupe(self.candidates(blobs, finders));
        for blob in blobs.blobs_mut() {
            if !blob.is_foreground() && regions.iter().any(|r| r.bounds.contains(&blob.bounds)) {
                blob.coalescable = true;
            }
        }
        regions
    }

    /// Every finder triple that passes the geometric checks, scored
    pub fn candidates(&self, blobs: &BlobSet, finders: &[BlobId]) -> Vec<QrRegion> {
        if finders.len() < 3 {
            return Vec::new();
        }
        let mut geoms: Vec<FinderGeom> = finders
            .iter()
            .map(|&id| {
                let blob = blobs.get(id);
                FinderGeom {
                    id,
                    center: blob.center(),
                    module_size: FinderDetector::module_size(blob),
                    half_side: (blob.width() + blob.height() - 2) as f32 / 4.0,
                    bounds: blob.bounds,
                    confidence: blob.confidence,
                }
            })
            .collect();
        geoms.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        geoms.truncate(MAX_FINDERS);

        let mut out = Vec::new();
        for i in 0..geoms.len() {
            for j in i + 1..geoms.len() {
                for k in j + 1..geoms.len() {
                    let triple = [geoms[i], geoms[j], geoms[k]];
                    let Some(region) = self.score_triple(&triple) else {
                        continue;
                    };
                    if let Some(other) = foreign_finder(&region, &triple, &geoms) {
                        log::trace!(
                            "region of finders {:?} rejected, encloses finder {other}",
                            region.finders
                        );
                        continue;
                    }
                    out.push(region);
                }
            }
        }
        log::trace!("{} region candidates from {} finders", out.len(), geoms.len());
        out
    }

    fn score_triple(&self, g: &[FinderGeom; 3]) -> Option<QrRegion> {
        let sizes = [g[0].module_size, g[1].module_size, g[2].module_size];
        let min_size = sizes.iter().fold(f32::INFINITY, |a, &b| a.min(b));
        let max_size = sizes.iter().fold(0.0f32, |a, &b| a.max(b));
        if min_size <= 0.0 || max_size / min_size > MAX_SCALE_RATIO {
            return None;
        }

        let arr = order_finder_patterns(g)?;
        let (corner, a, b) = (&g[arr.corner], &g[arr.first], &g[arr.second]);
        let implied = corner.center.complete_parallelogram(&a.center, &b.center);
        let half = (a.half_side + b.half_side) / 2.0;
        let fourth = clamp_box(implied, half, self.width, self.height)?;
        let bounds = corner.bounds.union(&a.bounds).union(&b.bounds).union(&fourth);

        let side = bounds.side();
        if side < self.params.min_side || side > self.params.max_side {
            log::trace!(
                "region of finders {:?} rejected, side {side}",
                [corner.id, a.id, b.id]
            );
            return None;
        }

        let finder_score = (corner.confidence + a.confidence + b.confidence) / 3.0;
        let angle_score = 1.0 - arr.corner_cos;
        let leg_score = 1.0 / arr.leg_ratio;
        let module_score = min_size / max_size;
        let density_score = match self.density {
            Some((grid, level)) => {
                0.5 + 0.5 * (dark_fraction(grid, &bounds, level) / FULL_DENSITY).min(1.0)
            }
            None => 1.0,
        };
        let confidence =
            (finder_score * angle_score * leg_score * module_score * density_score).clamp(0.0, 1.0);
        if confidence < self.params.min_confidence {
            return None;
        }

        Some(QrRegion {
            bounds,
            confidence,
            finders: [corner.id, a.id, b.id],
        })
    }
}

/// Keep the most confident of any overlapping candidates.
///
/// Candidates are taken by decreasing confidence, the smaller box first on
/// ties; one that reuses a finder of, or substantially overlaps, an already
/// kept region is dropped. The result is ordered by position (top to
/// bottom, then left to right).
pub fn dedupe(mut candidates: Vec<QrRegion>) -> Vec<QrRegion> {
    candidates.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.bounds.area().cmp(&b.bounds.area()))
    });
    let mut kept: Vec<QrRegion> = Vec::new();
    for cand in candidates {
        let clashes = kept.iter().any(|k| {
            let shares_finder = cand.finders.iter().any(|f| k.finders.contains(f));
            let overlap = k.bounds.intersection_area(&cand.bounds) as f32;
            let smaller = k.bounds.area().min(cand.bounds.area()) as f32;
            shares_finder || overlap > OVERLAP_FRACTION * smaller
        });
        if clashes {
            log::trace!("region {:?} dropped as duplicate", cand.bounds);
        } else {
            kept.push(cand);
        }
    }
    kept.sort_by_key(|r| (r.bounds.min_y, r.bounds.min_x));
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::blobs::label_components;
    use crate::detector::finder::FinderParams;
    use crate::detector::runs::RunArena;
    use crate::tools::SyntheticFrame;

    fn finders_of(frame: &SyntheticFrame) -> (BlobSet, Vec<BlobId>) {
        let grid = frame.to_luma();
        let mut arena = RunArena::new();
        arena.encode_threshold(&grid, 300).unwrap();
        label_components(&mut arena);
        let mut blobs = BlobSet::build(&mut arena, Some(&grid));
        let finders = FinderDetector::detect(&mut blobs, &FinderParams::default());
        (blobs, finders)
    }

    fn region(min_x: usize, min_y: usize, side: usize, confidence: f32, finders: [BlobId; 3]) -> QrRegion {
        QrRegion {
            bounds: BoundingBox {
                min_x,
                max_x: min_x + side - 1,
                min_y,
                max_y: min_y + side - 1,
            },
            confidence,
            finders,
        }
    }

    #[test]
    fn test_estimate_dimension() {
        assert_eq!(estimate_dimension_from_distance(56.0, 4.0), Some(21));
        assert_eq!(estimate_dimension_from_distance(72.0, 4.0), Some(25));
        assert_eq!(estimate_dimension_from_distance(20.0, 4.0), None);
        // 11 modules between centers is shorter than any code
        assert_eq!(estimate_dimension_from_distance(44.0, 4.0), None);
        assert_eq!(estimate_dimension_from_distance(20.0, 0.0), None);
    }

    #[test]
    fn test_l_of_three_finders_makes_one_region() {
        let mut frame = SyntheticFrame::new(200, 200);
        frame.finder(40, 40, 4).finder(96, 40, 4).finder(40, 96, 4);
        let (mut blobs, finders) = finders_of(&frame);
        assert_eq!(finders.len(), 3);

        let assembler = QrRegionAssembler::new(RegionParams::default(), 200, 200);
        let regions = assembler.assemble(&mut blobs, &finders);
        assert_eq!(regions.len(), 1);
        let r = &regions[0];
        assert_eq!((r.bounds.min_x, r.bounds.max_x), (40, 123));
        assert_eq!((r.bounds.min_y, r.bounds.max_y), (40, 123));
        for &f in &r.finders {
            assert!(r.bounds.contains(&blobs.get(f).bounds));
        }
        let origin = |id: BlobId| (blobs.get(id).bounds.min_x, blobs.get(id).bounds.min_y);
        assert_eq!(r.finders.map(origin), [(40, 40), (96, 40), (40, 96)]);
        assert!(r.confidence > 0.9);
    }

    #[test]
    fn test_isolated_finder_gives_nothing() {
        let mut frame = SyntheticFrame::new(120, 120);
        frame.finder(40, 40, 4);
        let (mut blobs, finders) = finders_of(&frame);
        assert_eq!(finders.len(), 1);
        let assembler = QrRegionAssembler::new(RegionParams::default(), 120, 120);
        assert!(assembler.assemble(&mut blobs, &finders).is_empty());
    }

    #[test]
    fn test_collinear_finders_rejected() {
        let mut frame = SyntheticFrame::new(260, 80);
        frame.finder(20, 20, 4).finder(90, 20, 4).finder(160, 20, 4);
        let (blobs, finders) = finders_of(&frame);
        assert_eq!(finders.len(), 3);
        let assembler = QrRegionAssembler::new(RegionParams::default(), 260, 80);
        assert!(assembler.candidates(&blobs, &finders).is_empty());
    }

    #[test]
    fn test_mismatched_scale_rejected() {
        let mut frame = SyntheticFrame::new(300, 300);
        frame.finder(40, 40, 4).finder(96, 40, 4).finder(40, 150, 9);
        let (blobs, finders) = finders_of(&frame);
        assert_eq!(finders.len(), 3);
        let assembler = QrRegionAssembler::new(RegionParams::default(), 300, 300);
        assert!(assembler.candidates(&blobs, &finders).is_empty());
    }

    #[test]
    fn test_size_bounds() {
        let mut frame = SyntheticFrame::new(200, 200);
        frame.finder(40, 40, 4).finder(96, 40, 4).finder(40, 96, 4);
        let (blobs, finders) = finders_of(&frame);
        let params = RegionParams {
            max_side: 80,
            ..RegionParams::default()
        };
        let assembler = QrRegionAssembler::new(params, 200, 200);
        assert!(assembler.candidates(&blobs, &finders).is_empty());
    }

    #[test]
    fn test_background_inside_region_becomes_coalescable() {
        let mut frame = SyntheticFrame::new(200, 200);
        frame.finder(40, 40, 4).finder(96, 40, 4).finder(40, 96, 4);
        let (mut blobs, finders) = finders_of(&frame);
        let assembler = QrRegionAssembler::new(RegionParams::default(), 200, 200);
        let regions = assembler.assemble(&mut blobs, &finders);
        let bounds = regions[0].bounds;
        for blob in blobs.blobs().iter().filter(|b| !b.is_foreground()) {
            assert_eq!(blob.coalescable, bounds.contains(&blob.bounds));
        }
    }

    #[test]
    fn test_region_enclosing_another_finder_rejected() {
        // A fourth finder where a code only has data
        let mut frame = SyntheticFrame::new(200, 200);
        frame
            .finder(40, 40, 4)
            .finder(96, 40, 4)
            .finder(40, 96, 4)
            .finder(96, 96, 4);
        let (blobs, finders) = finders_of(&frame);
        assert_eq!(finders.len(), 4);
        let assembler = QrRegionAssembler::new(RegionParams::default(), 200, 200);
        assert!(assembler.candidates(&blobs, &finders).is_empty());
    }

    #[test]
    fn test_grid_of_codes_keeps_finders_apart() {
        // Four L-arrangements 16px apart: cross-code triples line up too
        let mut frame = SyntheticFrame::new(240, 240);
        for (x, y) in [(20, 20), (120, 20), (20, 120), (120, 120)] {
            frame.finder(x, y, 4).finder(x + 56, y, 4).finder(x, y + 56, 4);
        }
        let (mut blobs, finders) = finders_of(&frame);
        assert_eq!(finders.len(), 12);

        let assembler = QrRegionAssembler::new(RegionParams::default(), 240, 240);
        let regions = assembler.assemble(&mut blobs, &finders);
        assert_eq!(regions.len(), 4);
        let quadrant = |id: BlobId| {
            let b = blobs.get(id).bounds;
            (b.min_x >= 120, b.min_y >= 120)
        };
        for r in &regions {
            let q = quadrant(r.finders[0]);
            assert!(r.finders.iter().all(|&f| quadrant(f) == q), "{r:?}");
            assert_eq!(r.bounds.side(), 84);
        }
    }

    #[test]
    fn test_confidence_tie_prefers_smaller_region() {
        let spanning = region(16, 16, 184, 1.0, [0, 1, 2]);
        let code = region(16, 16, 84, 1.0, [0, 3, 4]);
        assert_eq!(dedupe(vec![spanning, code.clone()]), vec![code]);
    }

    #[test]
    fn test_overlapping_candidates_keep_most_confident() {
        let weak = region(10, 10, 80, 0.4, [0, 1, 2]);
        let strong = region(20, 15, 80, 0.9, [3, 4, 5]);
        let kept = dedupe(vec![weak, strong.clone()]);
        assert_eq!(kept, vec![strong]);
    }

    #[test]
    fn test_shared_finder_is_a_duplicate() {
        let a = region(0, 0, 50, 0.8, [0, 1, 2]);
        let b = region(200, 200, 50, 0.7, [2, 3, 4]);
        assert_eq!(dedupe(vec![a.clone(), b]), vec![a]);
    }

    #[test]
    fn test_disjoint_regions_survive_in_reading_order() {
        let right = region(220, 20, 84, 0.7, [3, 4, 5]);
        let left = region(20, 20, 84, 0.9, [0, 1, 2]);
        let kept = dedupe(vec![right.clone(), left.clone()]);
        assert_eq!(kept, vec![left, right]);
    }
}
