//! Optional persistence of analyzed frames.
//!
//! The analyzer hands every frame, with a one-line annotation of what it
//! found, to a [`FrameSink`]. Sinks are for offline inspection; a failing
//! sink never affects the analysis.

use crate::config::ChannelOrder;
use crate::utils::luminance::BYTES_PER_PIXEL;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Errors raised while persisting frames
#[derive(thiserror::Error, Debug)]
pub enum FrameLogError {
    /// Filesystem failure
    #[error("frame log I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// Image encoding failure
    #[error("frame encoding failed: {0}")]
    Image(#[from] image::ImageError),
    /// Pixel buffer shorter than the frame size says
    #[error("frame buffer holds {actual} bytes, expected {expected}")]
    BufferTooSmall {
        /// Bytes the frame needs
        expected: usize,
        /// Bytes supplied
        actual: usize,
    },
}

/// Receives analyzed frames for optional persistence
pub trait FrameSink: Send {
    /// Record one frame of 4-byte pixels with its annotation
    fn log_frame(
        &mut self,
        pixels: &[u8],
        width: usize,
        height: usize,
        annotation: &str,
    ) -> Result<(), FrameLogError>;

    /// Flush anything buffered
    fn save(&mut self) -> Result<(), FrameLogError> {
        Ok(())
    }
}

/// Writes frames as numbered PNG files plus an annotation index
#[derive(Debug)]
pub struct PngFrameSink {
    dir: PathBuf,
    order: ChannelOrder,
    max_frames: Option<usize>,
    written: usize,
    next_index: usize,
    annotations: Vec<(String, String)>,
}

/// Index after the highest `frame-NNNNN.png` already in `dir`
fn next_frame_index(dir: &Path) -> std::io::Result<usize> {
    let mut next = 0;
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let index = name
            .to_str()
            .and_then(|n| n.strip_prefix("frame-"))
            .and_then(|n| n.strip_suffix(".png"))
            .and_then(|n| n.parse::<usize>().ok());
        if let Some(index) = index {
            next = next.max(index + 1);
        }
    }
    Ok(next)
}

impl PngFrameSink {
    /// Sink writing into `dir` (created if missing).
    ///
    /// Numbering continues after frames a previous sink left in `dir`.
    pub fn new<P: AsRef<Path>>(dir: P, order: ChannelOrder) -> Result<Self, FrameLogError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let next_index = next_frame_index(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            order,
            max_frames: None,
            written: 0,
            next_index,
            annotations: Vec::new(),
        })
    }

    /// Stop writing after `max` frames
    pub fn with_limit(mut self, max: usize) -> Self {
        self.max_frames = Some(max);
        self
    }

    /// Frames written by this sink so far
    pub fn written(&self) -> usize {
        self.written
    }
}

impl FrameSink for PngFrameSink {
    fn log_frame(
        &mut self,
        pixels: &[u8],
        width: usize,
        height: usize,
        annotation: &str,
    ) -> Result<(), FrameLogError> {
        if self.max_frames.is_some_and(|max| self.written >= max) {
            return Ok(());
        }
        let expected = width * height * BYTES_PER_PIXEL;
        if pixels.len() < expected {
            return Err(FrameLogError::BufferTooSmall {
                expected,
                actual: pixels.len(),
            });
        }

        let mut rgba = pixels[..expected].to_vec();
        if self.order == ChannelOrder::Bgra {
            for px in rgba.chunks_exact_mut(BYTES_PER_PIXEL) {
                px.swap(0, 2);
            }
        }
        let name = format!("frame-{:05}.png", self.next_index);
        image::save_buffer(
            self.dir.join(&name),
            &rgba,
            width as u32,
            height as u32,
            image::ColorType::Rgba8,
        )?;
        self.annotations.push((name, annotation.to_string()));
        self.written += 1;
        self.next_index += 1;
        Ok(())
    }

    /// Append the collected annotations to `annotations.txt`
    fn save(&mut self) -> Result<(), FrameLogError> {
        if self.annotations.is_empty() {
            return Ok(());
        }
        let file = File::options()
            .create(true)
            .append(true)
            .open(self.dir.join("annotations.txt"))?;
        let mut out = BufWriter::new(file);
        for (name, annotation) in self.annotations.drain(..) {
            writeln!(out, "{name}\t{annotation}")?;
        }
        out.flush()?;
        Ok(())
    }
}
