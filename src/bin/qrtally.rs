use clap::{Parser, Subcommand};
use qr_tally::tools::load_pixels;
use qr_tally::{AnalysisConfig, Analyzer, ChannelOrder, MajorityTracker, PngFrameSink, Vote};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "qrtally", version, about = "Count QR codes in images")]
struct Cli {
    /// Feed frames to the analyzer in BGRA channel order
    #[arg(long, global = true)]
    bgra: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Count QR regions in one or more frames
    Count {
        images: Vec<PathBuf>,
        /// Print the analyses as JSON
        #[arg(long)]
        json: bool,
        /// Frames a count must dominate before it is reported
        #[arg(long, default_value_t = 3)]
        quorum: usize,
        /// Write every analyzed frame as PNG into this directory
        #[arg(long)]
        log_frames: Option<PathBuf>,
    },
    /// Print the section grid of a frame
    Sections {
        image: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Print thresholds and blob/finder statistics of a frame
    Inspect { image: PathBuf },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = AnalysisConfig::from_env();
    if cli.bgra {
        config.channel_order = ChannelOrder::Bgra;
    }
    let analyzer = match Analyzer::new(config) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command {
        Command::Count {
            images,
            json,
            quorum,
            log_frames,
        } => count_cmd(analyzer, &images, json, quorum, log_frames.as_deref()),
        Command::Sections { image, json } => sections_cmd(analyzer, &image, json),
        Command::Inspect { image } => inspect_cmd(analyzer, &image),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

fn count_cmd(
    mut analyzer: Analyzer,
    images: &[PathBuf],
    json: bool,
    quorum: usize,
    log_frames: Option<&Path>,
) -> CmdResult {
    let order = analyzer.config().channel_order;
    if let Some(dir) = log_frames {
        analyzer = analyzer.with_sink(Box::new(PngFrameSink::new(dir, order)?));
    }
    let mut tracker = MajorityTracker::new(quorum, 8, 16);
    let mut analyses = Vec::with_capacity(images.len());

    for image in images {
        let (pixels, width, height) = load_pixels(image, order)?;
        let start = Instant::now();
        let analysis = analyzer.analyze(&pixels, width, height);
        let elapsed = start.elapsed();
        let vote = tracker.push(analysis.qr_count() as u32);

        if !json {
            println!(
                "{} ({}x{}): {} QR regions in {:.2?}, vote {}",
                image.display(),
                width,
                height,
                analysis.qr_count(),
                elapsed,
                describe(vote)
            );
            for (i, region) in analysis.qr_regions().iter().enumerate() {
                let b = region.bounds;
                println!(
                    "  region {}: x={}..={} y={}..={} confidence={:.2}",
                    i, b.min_x, b.max_x, b.min_y, b.max_y, region.confidence
                );
            }
        }
        analyses.push(analysis);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&analyses)?);
    }
    analyzer.take_sink();
    Ok(())
}

fn describe(vote: Vote) -> String {
    match vote {
        Vote::NoQuorum => "pending".to_string(),
        Vote::NoMajority => "unsettled".to_string(),
        Vote::Value(n) => n.to_string(),
    }
}

fn sections_cmd(mut analyzer: Analyzer, image: &Path, json: bool) -> CmdResult {
    let (pixels, width, height) = load_pixels(image, analyzer.config().channel_order)?;
    let analysis = analyzer.analyze(&pixels, width, height);
    if json {
        println!("{}", serde_json::to_string_pretty(analysis.sections())?);
        return Ok(());
    }
    println!("{:>5} {:>5} {:>5} {:>5} {:>6} {:>8} {:>6}", "x", "y", "w", "h", "mean", "varieg", "thresh");
    for s in analysis.sections() {
        println!(
            "{:>5} {:>5} {:>5} {:>5} {:>6} {:>8.2} {:>6}",
            s.x, s.y, s.w, s.h, s.mean_luminance, s.variegation, s.threshold
        );
    }
    Ok(())
}

fn inspect_cmd(mut analyzer: Analyzer, image: &Path) -> CmdResult {
    let (pixels, width, height) = load_pixels(image, analyzer.config().channel_order)?;
    let analysis = analyzer.analyze(&pixels, width, height);
    let t = analysis.thresholds();
    println!("Image: {} ({}x{})", image.display(), width, height);
    if analysis.is_degenerate() {
        println!("Frame could not be analyzed");
        return Ok(());
    }
    println!(
        "Thresholds: otsu={} very_very_dark={} foreground={:?}",
        t.otsu, t.very_very_dark, t.foreground
    );
    let runs = analysis.row_starts().last().copied().unwrap_or(0);
    println!(
        "Runs: {}  Blobs: {} ({} foreground)",
        runs,
        analysis.blobs().len(),
        analysis.foreground_count()
    );
    println!("Finder patterns: {}", analysis.finder_ids().len());
    for blob in analysis.finder_blobs() {
        let c = blob.center();
        println!(
            "  ({:.1}, {:.1}) side={} confidence={:.2}",
            c.x,
            c.y,
            blob.bounds.side(),
            blob.confidence
        );
    }
    println!("QR regions: {}", analysis.qr_count());
    Ok(())
}
