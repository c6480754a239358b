use thiserror::Error;

use crate::progress::format_bytes;
use crate::transcoder::TranscoderError;

use super::search::Sample;

/// Errors from the size search engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error(transparent)]
    Transcoder(TranscoderError),

    #[error("{0}")]
    Convergence(ConvergenceFailure),

    #[error("Encode cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Creates an InvalidRequest error.
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Returns true if this error means the run was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

// Cancellation is normalized so callers observe a single kind no matter
// where the flag was noticed.
impl From<TranscoderError> for EngineError {
    fn from(err: TranscoderError) -> Self {
        match err {
            TranscoderError::Cancelled => Self::Cancelled,
            other => Self::Transcoder(other),
        }
    }
}

/// Diagnostics for a search that never produced a file at or under the
/// target size.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvergenceFailure {
    /// Trial encodes performed before giving up.
    pub iterations: u32,
    /// Size of the last trial in bytes.
    pub final_size_bytes: u64,
    /// Smallest over-target trial seen, if any.
    pub closest_over: Option<Sample>,
}

impl std::fmt::Display for ConvergenceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.closest_over {
            Some(sample) => write!(
                f,
                "Could not reach target size after {} iterations. Closest over-target result was {} at {:.0} kbps.",
                self.iterations,
                format_bytes(sample.size_bytes),
                sample.bitrate_kbps
            ),
            None => write!(
                f,
                "Could not reach target size after {} iterations. Final result was {}.",
                self.iterations,
                format_bytes(self.final_size_bytes)
            ),
        }
    }
}
