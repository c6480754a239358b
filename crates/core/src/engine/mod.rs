//! The size search engine.
//!
//! Takes an [`EncodeRequest`] and drives a [`Transcoder`] through trial
//! encodes, bracketing the video bitrate until the output file lands
//! within the tolerance window below the target size. Progress streams
//! through an optional channel; a run spawned in the background is
//! cancelled and joined through its [`EncodeHandle`].
//!
//! [`Transcoder`]: crate::transcoder::Transcoder
//!
//! # Example
//!
//! ```ignore
//! use shrinkray_core::engine::{EncodeRequest, EngineConfig, SizeSearchEngine};
//! use shrinkray_core::transcoder::FfmpegTranscoder;
//!
//! let engine = SizeSearchEngine::new(EngineConfig::default(), FfmpegTranscoder::with_defaults());
//! let request = EncodeRequest::new("input.mkv", "output.mp4", 10);
//!
//! let handle = engine.spawn(request, None);
//! let result = handle.join().await?;
//! println!("{} bytes in {} iterations", result.file_size_bytes, result.iterations);
//! ```

mod config;
mod error;
mod planner;
mod runner;
mod search;
mod types;

pub use config::EngineConfig;
pub use error::{ConvergenceFailure, EngineError};
pub use planner::BitratePlan;
pub use runner::{EncodeHandle, SizeSearchEngine};
pub use search::{Sample, SearchState, StepOutcome};
pub use types::{
    EncodeRequest, EncodeResult, BYTES_PER_MEGABYTE, CONTAINER_OVERHEAD,
    DEFAULT_AUDIO_BITRATE_KBPS, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE_PERCENT,
    MIN_AUDIO_BITRATE_KBPS, MIN_VIDEO_BITRATE_KBPS,
};
