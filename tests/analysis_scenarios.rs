//! End-to-end scenarios for frame analysis
//!
//! Frames are drawn with the synthetic frame builder and run through the
//! whole pipeline with the default configuration.

use qr_tally::tools::SyntheticFrame;
use qr_tally::utils::threshold::{histogram_full, otsu_threshold};
use qr_tally::{
    AnalysisConfig, AnalysisError, Analyzer, ChannelOrder, LumaGrid, LuminanceModel, PixelClass,
    Stage, analyze, count_qr_codes,
};

fn analyze_frame(frame: &SyntheticFrame) -> qr_tally::Analysis {
    analyze(&frame.to_pixels(ChannelOrder::Rgba), frame.width(), frame.height())
}

#[test]
fn test_white_frame_is_one_background_blob() {
    let analysis = analyze_frame(&SyntheticFrame::new(64, 64));

    assert!(!analysis.is_degenerate());
    assert_eq!(analysis.blobs().len(), 1);
    let blob = &analysis.blobs()[0];
    assert_eq!(blob.class, PixelClass::Background);
    assert_eq!(blob.pixel_count, 64 * 64);
    assert_eq!((blob.width(), blob.height()), (64, 64));
    assert_eq!(analysis.foreground_count(), 0);
    assert_eq!(analysis.finder_ids().len(), 0);
    assert_eq!(analysis.qr_count(), 0);
}

#[test]
fn test_three_finders_in_l_make_one_region() {
    let mut frame = SyntheticFrame::new(200, 200);
    frame.finder(40, 40, 4).finder(96, 40, 4).finder(40, 96, 4);
    let analysis = analyze_frame(&frame);
    let config = AnalysisConfig::default();

    assert_eq!(analysis.finder_ids().len(), 3);
    assert_eq!(analysis.qr_count(), 1);
    let region = &analysis.qr_regions()[0];
    for finder in analysis.finder_blobs() {
        assert!(region.bounds.contains(&finder.bounds));
    }
    let side = region.bounds.side();
    assert!(side >= config.min_qr_size && side <= config.max_qr_size);
    assert_eq!((region.bounds.min_x, region.bounds.max_x), (40, 123));
    assert!(region.confidence >= config.region_min_confidence);
}

#[test]
fn test_isolated_finder_is_not_a_code() {
    let mut frame = SyntheticFrame::new(120, 120);
    frame.finder(40, 40, 4);
    let analysis = analyze_frame(&frame);

    assert_eq!(analysis.finder_ids().len(), 1);
    assert_eq!(analysis.qr_count(), 0);
}

#[test]
fn test_two_codes_side_by_side() {
    let mut frame = SyntheticFrame::new(400, 200);
    for x in [20, 220] {
        frame.finder(x, 40, 4).finder(x + 56, 40, 4).finder(x, 96, 4);
    }
    let analysis = analyze_frame(&frame);

    assert_eq!(analysis.qr_count(), 2);
    let regions = analysis.qr_regions();
    assert!(regions[0].bounds.max_x < regions[1].bounds.min_x);
    assert_eq!(regions[0].bounds.intersection_area(&regions[1].bounds), 0);
}

#[test]
fn test_full_synthetic_codes_are_counted() {
    for seed in [1, 7, 42] {
        let mut frame = SyntheticFrame::new(240, 240);
        frame.qr_code(40, 40, 6, seed);
        assert_eq!(
            count_qr_codes(&frame.to_pixels(ChannelOrder::Rgba), 240, 240),
            1,
            "seed {seed}"
        );
    }
}

#[test]
fn test_grid_of_four_codes_is_counted() {
    // 21-module codes, 4px modules, 4 modules apart
    let mut frame = SyntheticFrame::new(216, 216);
    let origins = [(16, 16), (116, 16), (16, 116), (116, 116)];
    for (seed, &(x, y)) in [3, 5, 11, 13].iter().zip(&origins) {
        frame.qr_code(x, y, 4, *seed);
    }
    // Slightly wider top-right and bottom-left finders on the second code
    frame.fill_rect(200, 16, 1, 28, 0).fill_rect(144, 72, 1, 28, 0);
    let analysis = analyze_frame(&frame);

    assert_eq!(analysis.finder_ids().len(), 12);
    assert_eq!(analysis.qr_count(), 4);
    for (region, &(x, y)) in analysis.qr_regions().iter().zip(&origins) {
        assert_eq!((region.bounds.min_x, region.bounds.min_y), (x, y));
        assert!(region.bounds.side() < 100, "{region:?}");
    }
}

#[test]
fn test_grid_of_finder_triples_pairs_within_each_code() {
    let mut frame = SyntheticFrame::new(240, 240);
    for (x, y) in [(20, 20), (120, 20), (20, 120), (120, 120)] {
        frame.finder(x, y, 4).finder(x + 56, y, 4).finder(x, y + 56, 4);
    }
    let analysis = analyze_frame(&frame);

    assert_eq!(analysis.finder_ids().len(), 12);
    assert_eq!(analysis.qr_count(), 4);
    let blobs = analysis.blobs();
    let quadrant = |id: usize| (blobs[id].bounds.min_x >= 120, blobs[id].bounds.min_y >= 120);
    for region in analysis.qr_regions() {
        let q = quadrant(region.finders[0]);
        assert!(region.finders.iter().all(|&f| quadrant(f) == q), "{region:?}");
        for &f in &region.finders {
            assert!(region.bounds.contains(&blobs[f].bounds));
        }
    }
}

#[test]
fn test_channel_order_is_honored() {
    // Reddish dark squares on a light background, written in both orders
    let (width, height) = (48, 48);
    let mut rgba = vec![230u8; width * height * 4];
    for y in 10..30 {
        for x in 10..30 {
            let i = (y * width + x) * 4;
            rgba[i..i + 3].copy_from_slice(&[120, 10, 30]);
        }
    }
    let mut bgra = rgba.clone();
    for px in bgra.chunks_exact_mut(4) {
        px.swap(0, 2);
    }

    let config = |channel_order| AnalysisConfig {
        channel_order,
        luminance_model: LuminanceModel::Perceptual,
        ..AnalysisConfig::default()
    };
    let a = Analyzer::new(config(ChannelOrder::Rgba)).unwrap().analyze(&rgba, width, height);
    let b = Analyzer::new(config(ChannelOrder::Bgra)).unwrap().analyze(&bgra, width, height);

    assert_eq!(a.thresholds(), b.thresholds());
    assert_eq!(a.sections(), b.sections());
    assert_eq!(a.foreground_count(), 1);
    assert_eq!(b.foreground_count(), 1);

    // Reading BGRA bytes as RGBA changes the perceptual luminance
    let c = Analyzer::new(config(ChannelOrder::Rgba)).unwrap().analyze(&bgra, width, height);
    assert_ne!(a.sections(), c.sections());
}

#[test]
fn test_bad_frames_are_degenerate() {
    let mut analyzer = Analyzer::default();

    let empty = analyzer.analyze(&[], 0, 48);
    assert!(empty.is_degenerate());
    assert!(empty.blobs().is_empty() && empty.sections().is_empty());

    let short = analyzer.analyze(&[255; 100], 10, 10);
    assert!(short.is_degenerate());
    assert_eq!(short.qr_count(), 0);
    assert!(matches!(
        analyzer.try_analyze(&[255; 100], 10, 10),
        Err(AnalysisError::BufferTooSmall { expected: 400, actual: 100 })
    ));

    // The analyzer keeps working after aborted frames
    let frame = SyntheticFrame::new(16, 16);
    let ok = analyzer.analyze(&frame.to_pixels(ChannelOrder::Rgba), 16, 16);
    assert!(!ok.is_degenerate());
    assert_eq!(analyzer.stage(), Stage::Done);
}

#[test]
fn test_reused_analyzer_matches_fresh_one() {
    let mut big = SyntheticFrame::new(200, 200);
    big.finder(40, 40, 4).finder(96, 40, 4).finder(40, 96, 4);
    let mut small = SyntheticFrame::new(90, 70);
    small.finder(10, 10, 3);

    let mut analyzer = Analyzer::default();
    analyzer.analyze(&big.to_pixels(ChannelOrder::Rgba), 200, 200);
    let reused = analyzer.analyze(&small.to_pixels(ChannelOrder::Rgba), 90, 70);
    let fresh = analyze_frame(&small);

    assert_eq!(reused.row_starts(), fresh.row_starts());
    assert_eq!(reused.blobs(), fresh.blobs());
    assert_eq!(reused.sections(), fresh.sections());
    assert_eq!(analyzer.scratch_stats().frames, 2);
}

#[test]
fn test_row_starts_index_every_row() {
    let mut frame = SyntheticFrame::new(30, 20);
    frame.fill_rect(5, 5, 10, 10, 0);
    let analysis = analyze_frame(&frame);

    let starts = analysis.row_starts();
    assert_eq!(starts.len(), 21);
    assert!(starts.windows(2).all(|w| w[0] < w[1]));
    // Rows crossing the square hold three runs, the others one
    assert_eq!(starts[1] - starts[0], 1);
    assert_eq!(starts[6] - starts[5], 3);
}

#[test]
fn test_histogram_and_otsu_ranges() {
    let mut state = 99u32;
    let data: Vec<u16> = (0..37 * 23)
        .map(|_| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            ((state >> 8) % 766) as u16
        })
        .collect();
    let grid = LumaGrid::from_vec(37, 23, data).unwrap();
    let hist = histogram_full(&grid);
    assert_eq!(hist.iter().map(|&c| c as usize).sum::<usize>(), 37 * 23);
    assert!(otsu_threshold(&hist, 37 * 23) < 766);
}
