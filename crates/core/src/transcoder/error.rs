//! Error types for the transcoder module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while probing or encoding.
#[derive(Debug, Error)]
pub enum TranscoderError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {path}")]
    FfprobeNotFound { path: PathBuf },

    /// Input file not found.
    #[error("Input file not found: {path}")]
    InputNotFound { path: PathBuf },

    /// Probing the input failed or produced unusable output.
    #[error("Failed to probe video: {reason}")]
    ProbeFailed { reason: String },

    /// The encode process failed.
    #[error("Encode failed: {reason}")]
    EncodeFailed {
        reason: String,
        /// Last diagnostic line the encoder printed, when any.
        detail: Option<String>,
    },

    /// The encode was cancelled and the encoder torn down.
    #[error("Encode cancelled")]
    Cancelled,

    /// I/O error while driving the external process.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscoderError {
    /// Creates a new probe failed error.
    pub fn probe_failed(reason: impl Into<String>) -> Self {
        Self::ProbeFailed {
            reason: reason.into(),
        }
    }

    /// Creates a new encode failed error with the last diagnostic line.
    pub fn encode_failed(reason: impl Into<String>, detail: Option<String>) -> Self {
        Self::EncodeFailed {
            reason: reason.into(),
            detail,
        }
    }

    /// Whether this error means a required binary is missing.
    pub fn is_missing_binary(&self) -> bool {
        matches!(
            self,
            Self::FfmpegNotFound { .. } | Self::FfprobeNotFound { .. }
        )
    }
}
