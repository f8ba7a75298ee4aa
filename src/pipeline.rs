//! Per-frame analysis facade.
//!
//! [`Analyzer`] owns the scratch buffers and drives one frame through every
//! stage in a fixed order:
//!
//! ```text
//! Idle -> LuminanceComputed -> ThresholdsComputed -> Dilated -> RunEncoded
//!      -> BlobsBuilt -> FindersDetected -> QrRegionsAssembled
//!      -> SectionsComputed -> Done
//! ```
//!
//! There is no branching or retry. A failing stage aborts the frame; through
//! [`Analyzer::analyze`] that yields a degenerate [`Analysis`] instead of an
//! error, so one bad frame never stops a live capture loop.

use crate::config::AnalysisConfig;
use crate::detector::blobs::{BlobSet, label_components};
use crate::detector::finder::{FinderDetector, FinderParams};
use crate::detector::qr_region::{QrRegion, QrRegionAssembler, RegionParams};
use crate::detector::sections::Sectioner;
use crate::error::Result;
use crate::frame_log::FrameSink;
use crate::models::{Blob, BlobId, PixelClass, Section};
use crate::utils::filters::{box_blur_into, dilate_into};
use crate::utils::luminance::{to_luminance_into, to_luminance_with};
use crate::utils::scratch::{FrameScratch, ScratchStats};
use crate::utils::threshold::{histogram_full, otsu_threshold, very_very_dark_threshold};
use serde::Serialize;

/// Caller-supplied luminance function over `(r, g, b)`
pub type LuminanceFn = Box<dyn Fn(u8, u8, u8) -> u16 + Send + Sync>;

/// Position of the analyzer in the per-frame sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    /// No frame in flight
    Idle,
    /// Luminance grid filled
    LuminanceComputed,
    /// Otsu, very-very-dark and foreground levels known
    ThresholdsComputed,
    /// Dilated and blurred grids filled
    Dilated,
    /// Run arena holds the classified frame
    RunEncoded,
    /// Components labeled and blobs aggregated
    BlobsBuilt,
    /// Finder patterns scored
    FindersDetected,
    /// QR regions assembled and deduplicated
    QrRegionsAssembled,
    /// Section statistics computed
    SectionsComputed,
    /// Result handed out
    Done,
}

impl Stage {
    /// The stage after this one; `Done` stays `Done`
    pub fn next(self) -> Stage {
        match self {
            Stage::Idle => Stage::LuminanceComputed,
            Stage::LuminanceComputed => Stage::ThresholdsComputed,
            Stage::ThresholdsComputed => Stage::Dilated,
            Stage::Dilated => Stage::RunEncoded,
            Stage::RunEncoded => Stage::BlobsBuilt,
            Stage::BlobsBuilt => Stage::FindersDetected,
            Stage::FindersDetected => Stage::QrRegionsAssembled,
            Stage::QrRegionsAssembled => Stage::SectionsComputed,
            Stage::SectionsComputed => Stage::Done,
            Stage::Done => Stage::Done,
        }
    }
}

/// Frame-wide luminance thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Thresholds {
    /// Otsu split: pixels below are dark
    pub otsu: u16,
    /// Level under which the darkest 0.5% (by default) of pixels fall
    pub very_very_dark: u16,
    /// Pixels at or below this level are foreground; `None` when the frame
    /// has no dark class at all
    pub foreground: Option<u16>,
}

impl Thresholds {
    fn from_otsu(otsu: u16, very_very_dark: u16) -> Self {
        Self {
            otsu,
            very_very_dark,
            foreground: otsu.checked_sub(1),
        }
    }
}

/// Everything found in one frame
#[derive(Debug, Clone, Default, Serialize)]
pub struct Analysis {
    width: usize,
    height: usize,
    thresholds: Thresholds,
    row_starts: Vec<usize>,
    blobs: Vec<Blob>,
    finders: Vec<BlobId>,
    qr_regions: Vec<QrRegion>,
    sections: Vec<Section>,
    degenerate: bool,
}

impl Analysis {
    /// Empty result for a frame that could not be analyzed
    pub fn degenerate(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            degenerate: true,
            ..Self::default()
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

    /// True if the frame was aborted and every list is empty
    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    /// Frame-wide thresholds
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    /// Index of the first run of each row, plus the total run count
    pub fn row_starts(&self) -> &[usize] {
        &self.row_starts
    }

    /// All blobs, indexed by [`BlobId`]
    pub fn blobs(&self) -> &[Blob] {
        &self.blobs
    }

    /// Ids of the blobs accepted as finder patterns
    pub fn finder_ids(&self) -> &[BlobId] {
        &self.finders
    }

    /// Blobs accepted as finder patterns
    pub fn finder_blobs(&self) -> impl Iterator<Item = &Blob> + '_ {
        self.finders.iter().map(|&id| &self.blobs[id])
    }

    /// Located codes, top to bottom then left to right
    pub fn qr_regions(&self) -> &[QrRegion] {
        &self.qr_regions
    }

    /// Number of codes in view
    pub fn qr_count(&self) -> usize {
        self.qr_regions.len()
    }

    /// Section grid, row-major
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Number of foreground blobs
    pub fn foreground_count(&self) -> usize {
        self.blobs.iter().filter(|b| b.class == PixelClass::Foreground).count()
    }

    fn annotation(&self) -> String {
        format!(
            "{}x{} qr={} finders={} blobs={} otsu={} vvd={}",
            self.width,
            self.height,
            self.qr_count(),
            self.finders.len(),
            self.blobs.len(),
            self.thresholds.otsu,
            self.thresholds.very_very_dark
        )
    }
}

/// Runs the analysis pipeline frame after frame, reusing its buffers
pub struct Analyzer {
    config: AnalysisConfig,
    scratch: FrameScratch,
    stage: Stage,
    frames: u64,
    luminance: Option<LuminanceFn>,
    sink: Option<Box<dyn FrameSink>>,
}

impl Analyzer {
    /// Analyzer with a validated configuration
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            scratch: FrameScratch::new(),
            stage: Stage::Idle,
            frames: 0,
            luminance: None,
            sink: None,
        })
    }

    /// Replace the configured luminance model with a custom function
    pub fn with_luminance<F>(mut self, lumi: F) -> Self
    where
        F: Fn(u8, u8, u8) -> u16 + Send + Sync + 'static,
    {
        self.luminance = Some(Box::new(lumi));
        self
    }

    /// Forward every analyzed frame to `sink`
    pub fn with_sink(mut self, sink: Box<dyn FrameSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Active configuration
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Stage reached by the last frame
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Frames analyzed so far, including aborted ones
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Buffer reuse counters
    pub fn scratch_stats(&self) -> ScratchStats {
        self.scratch.stats()
    }

    /// Flush and detach the frame sink
    pub fn take_sink(&mut self) -> Option<Box<dyn FrameSink>> {
        let mut sink = self.sink.take()?;
        if let Err(e) = sink.save() {
            log::warn!("frame sink save failed: {e}");
        }
        Some(sink)
    }

    /// Analyze one frame of 4-byte pixels; never fails.
    ///
    /// Any error aborts the frame and gives a degenerate result.
    pub fn analyze(&mut self, pixels: &[u8], width: usize, height: usize) -> Analysis {
        match self.try_analyze(pixels, width, height) {
            Ok(analysis) => analysis,
            Err(e) => {
                log::warn!("frame {} aborted after {:?}: {e}", self.frames, self.stage);
                self.stage = Stage::Idle;
                Analysis::degenerate(width, height)
            }
        }
    }

    /// Analyze one frame, reporting why it was aborted
    pub fn try_analyze(&mut self, pixels: &[u8], width: usize, height: usize) -> Result<Analysis> {
        self.frames += 1;
        self.stage = Stage::Idle;
        let config = &self.config;
        let scratch = &mut self.scratch;

        match &self.luminance {
            Some(lumi) => to_luminance_with(
                pixels,
                width,
                height,
                config.channel_order,
                |r, g, b| lumi(r, g, b),
                &mut scratch.luma,
            )?,
            None => to_luminance_into(
                pixels,
                width,
                height,
                config.channel_order,
                config.luminance_model,
                &mut scratch.luma,
            )?,
        }
        scratch.prepare(width, height)?;
        Self::advance(&mut self.stage, self.frames);

        let hist = histogram_full(&scratch.luma);
        let pixel_count = width * height;
        let thresholds = Thresholds::from_otsu(
            otsu_threshold(&hist, pixel_count),
            very_very_dark_threshold(&hist, pixel_count, config.very_very_dark_fraction),
        );
        log::debug!("thresholds {thresholds:?}");
        Self::advance(&mut self.stage, self.frames);

        dilate_into(&scratch.luma, config.dilation_radius, &mut scratch.dilated, &mut scratch.temp)?;
        box_blur_into(&scratch.luma, config.blur_radius, &mut scratch.blurred, &mut scratch.temp)?;
        Self::advance(&mut self.stage, self.frames);

        match thresholds.foreground {
            Some(level) => scratch.runs.encode_threshold(&scratch.luma, level)?,
            None => scratch
                .runs
                .encode(&|_x: usize, _y: usize| PixelClass::Background, width, height)?,
        }
        Self::advance(&mut self.stage, self.frames);

        label_components(&mut scratch.runs);
        let mut blobs = BlobSet::build(&mut scratch.runs, Some(&scratch.luma));
        log::debug!("{} blobs from {} runs", blobs.len(), scratch.runs.runs().len());
        Self::advance(&mut self.stage, self.frames);

        let finders = FinderDetector::detect(&mut blobs, &FinderParams::from_config(config));
        log::debug!("{} finder patterns", finders.len());
        Self::advance(&mut self.stage, self.frames);

        let assembler = QrRegionAssembler::new(RegionParams::from_config(config), width, height);
        let assembler = match thresholds.foreground {
            Some(level) => assembler.with_density(&scratch.dilated, level),
            None => assembler,
        };
        let qr_regions = assembler.assemble(&mut blobs, &finders);
        log::debug!("{} QR regions", qr_regions.len());
        Self::advance(&mut self.stage, self.frames);

        let sections = Sectioner::from_config(config).compute(
            &scratch.luma,
            &scratch.blurred,
            thresholds.otsu,
            thresholds.very_very_dark,
        );
        Self::advance(&mut self.stage, self.frames);

        let analysis = Analysis {
            width,
            height,
            thresholds,
            row_starts: scratch.runs.row_starts().to_vec(),
            blobs: blobs.into_blobs(),
            finders,
            qr_regions,
            sections,
            degenerate: false,
        };

        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.log_frame(pixels, width, height, &analysis.annotation()) {
                log::warn!("frame sink failed: {e}");
            }
        }
        Self::advance(&mut self.stage, self.frames);
        Ok(analysis)
    }

    fn advance(stage: &mut Stage, frame: u64) {
        let next = stage.next();
        log::debug!("frame {frame}: {stage:?} -> {next:?}");
        *stage = next;
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self {
            config: AnalysisConfig::default(),
            scratch: FrameScratch::new(),
            stage: Stage::Idle,
            frames: 0,
            luminance: None,
            sink: None,
        }
    }
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("config", &self.config)
            .field("stage", &self.stage)
            .field("frames", &self.frames)
            .field("custom_luminance", &self.luminance.is_some())
            .field("sink", &self.sink.is_some())
            .finish()
    }
}
