//! Media transcoding via external ffmpeg/ffprobe processes.
//!
//! The [`Transcoder`] trait covers the two operations the engine needs:
//! probing a source file for duration and bitrate, and running a single
//! bitrate-constrained encode while streaming progress updates.
//! [`FfmpegTranscoder`] is the production implementation.
//!
//! # Example
//!
//! ```ignore
//! use shrinkray_core::transcoder::{FfmpegTranscoder, Transcoder, TranscoderConfig};
//!
//! let transcoder = FfmpegTranscoder::new(TranscoderConfig::default());
//! transcoder.validate().await?;
//! let info = transcoder.probe(Path::new("input.mkv")).await?;
//! println!("duration: {}s", info.duration_secs);
//! ```

mod config;
mod error;
mod ffmpeg;
mod traits;
mod types;

pub use config::TranscoderConfig;
pub use error::TranscoderError;
pub use ffmpeg::FfmpegTranscoder;
pub use traits::Transcoder;
pub use types::{EncodeJob, Quality, VideoInfo};
