//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides a mock transcoder so the full search loop can be
//! exercised without ffmpeg installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use shrinkray_core::testing::MockTranscoder;
//!
//! let transcoder = MockTranscoder::new();
//!
//! // Configure mock responses
//! transcoder.set_probe_result(fixtures::video_info(120.0)).await;
//! transcoder.set_bytes_per_kbps(10_000.0).await;
//!
//! // Hand a clone to the engine, keep this one for assertions...
//! ```

mod mock_transcoder;

pub use mock_transcoder::{MockTranscoder, RecordedEncode};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::transcoder::VideoInfo;

    /// Create a probe result for a typical high-bitrate source.
    pub fn video_info(duration_secs: f64) -> VideoInfo {
        VideoInfo {
            duration_secs,
            source_bitrate_kbps: Some(5000.0),
        }
    }

    /// Create a probe result whose container reports no bitrate.
    pub fn video_info_without_bitrate(duration_secs: f64) -> VideoInfo {
        VideoInfo {
            duration_secs,
            source_bitrate_kbps: None,
        }
    }
}
