//! Error types for frame analysis.

use std::collections::TryReserveError;

/// Errors that abort the analysis of one frame.
///
/// None of these cross the frame boundary when going through
/// [`Analyzer::analyze`](crate::Analyzer::analyze): the frame is reported as
/// degenerate instead.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// Growing a scratch buffer failed. The buffer keeps its previous contents.
    #[error("scratch buffer growth failed ({requested} elements requested)")]
    AllocationFailure { requested: usize },
    /// The frame has no pixels.
    #[error("frame has zero area ({width}x{height})")]
    EmptyFrame { width: usize, height: usize },
    /// The pixel buffer is shorter than `width * height * 4`.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferTooSmall { expected: usize, actual: usize },
    /// Configuration values contradict each other.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AnalysisError {
    pub(crate) fn allocation(requested: usize) -> impl FnOnce(TryReserveError) -> Self {
        move |_| AnalysisError::AllocationFailure { requested }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AnalysisError>;
