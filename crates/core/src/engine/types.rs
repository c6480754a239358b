use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::transcoder::Quality;

/// Bytes in one megabyte, as users of video sites count them.
pub const BYTES_PER_MEGABYTE: u64 = 1024 * 1024;

/// Lowest video bitrate worth encoding at. Below this the output is
/// unwatchable and the search gives up instead.
pub const MIN_VIDEO_BITRATE_KBPS: f64 = 100.0;

/// Lowest audio bitrate the planner will assign.
pub const MIN_AUDIO_BITRATE_KBPS: u32 = 32;

/// Audio bitrate used whenever the size budget allows it.
pub const DEFAULT_AUDIO_BITRATE_KBPS: u32 = 128;

/// Fraction of the byte budget available to streams after container
/// overhead.
pub const CONTAINER_OVERHEAD: f64 = 0.97;

/// Default tolerance below the target size, in percent.
pub const DEFAULT_TOLERANCE_PERCENT: f64 = 2.0;

/// Default cap on trial encodes per request.
pub const DEFAULT_MAX_ITERATIONS: u32 = 15;

fn default_tolerance() -> f64 {
    DEFAULT_TOLERANCE_PERCENT
}

fn default_max_iterations() -> u32 {
    DEFAULT_MAX_ITERATIONS
}

/// A request to compress one video to a target size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeRequest {
    /// Source video path.
    pub input_path: PathBuf,
    /// Where the final output should land.
    pub output_path: PathBuf,
    /// Desired output size in megabytes.
    pub target_size_mb: u64,
    /// Acceptable undershoot below the target, in percent (0, 50].
    #[serde(default = "default_tolerance")]
    pub tolerance_percent: f64,
    /// Cap on trial encodes before settling for the best result so far.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
    /// Codec/preset selection.
    #[serde(default)]
    pub quality: Quality,
}

impl EncodeRequest {
    /// Creates a request with default tolerance, iteration cap and quality.
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        target_size_mb: u64,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            target_size_mb,
            tolerance_percent: default_tolerance(),
            max_iterations: default_max_iterations(),
            quality: Quality::default(),
        }
    }

    /// Sets the tolerance percentage.
    pub fn with_tolerance(mut self, tolerance_percent: f64) -> Self {
        self.tolerance_percent = tolerance_percent;
        self
    }

    /// Sets the iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Sets the quality level.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Target size in bytes.
    pub fn target_size_bytes(&self) -> u64 {
        self.target_size_mb * BYTES_PER_MEGABYTE
    }

    /// Width of the acceptance window in bytes.
    pub fn tolerance_bytes(&self) -> f64 {
        self.target_size_bytes() as f64 * self.tolerance_percent / 100.0
    }
}

/// Outcome of a completed encode run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeResult {
    /// Whether the output landed inside the tolerance window. `false`
    /// means the iteration cap was hit and the best under-target trial
    /// was delivered instead.
    pub success: bool,
    /// Path of the delivered file.
    pub file_path: PathBuf,
    /// Size of the delivered file in bytes.
    pub file_size_bytes: u64,
    /// The size that was asked for, in bytes.
    pub target_size_bytes: u64,
    /// Trial encodes performed.
    pub iterations: u32,
    /// Video bitrate of the delivered file in kbps. Zero when the input
    /// was already small enough and no encode ran.
    pub video_bitrate_kbps: f64,
    /// Wall-clock time of the whole run.
    pub elapsed_seconds: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = EncodeRequest::new("/in.mkv", "/out.mp4", 10);
        assert_eq!(request.tolerance_percent, 2.0);
        assert_eq!(request.max_iterations, 15);
        assert_eq!(request.quality, Quality::H264Medium);
    }

    #[test]
    fn test_request_builders() {
        let request = EncodeRequest::new("/in.mkv", "/out.mp4", 10)
            .with_tolerance(5.0)
            .with_max_iterations(8)
            .with_quality(Quality::H265Slow);
        assert_eq!(request.tolerance_percent, 5.0);
        assert_eq!(request.max_iterations, 8);
        assert_eq!(request.quality, Quality::H265Slow);
    }

    #[test]
    fn test_target_size_bytes() {
        let request = EncodeRequest::new("/in.mkv", "/out.mp4", 10);
        assert_eq!(request.target_size_bytes(), 10 * 1024 * 1024);
    }

    #[test]
    fn test_tolerance_bytes() {
        let request = EncodeRequest::new("/in.mkv", "/out.mp4", 10).with_tolerance(2.0);
        let expected = 10.0 * 1024.0 * 1024.0 * 0.02;
        assert!((request.tolerance_bytes() - expected).abs() < 1e-6);
    }

    #[test]
    fn test_request_deserializes_with_defaults() {
        let json = r#"{
            "input_path": "/in.mkv",
            "output_path": "/out.mp4",
            "target_size_mb": 25
        }"#;
        let request: EncodeRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.target_size_mb, 25);
        assert_eq!(request.tolerance_percent, 2.0);
        assert_eq!(request.max_iterations, 15);
        assert_eq!(request.quality, Quality::H264Medium);
    }

    #[test]
    fn test_result_round_trip() {
        let result = EncodeResult {
            success: true,
            file_path: PathBuf::from("/out.mp4"),
            file_size_bytes: 10_300_000,
            target_size_bytes: 10_485_760,
            iterations: 3,
            video_bitrate_kbps: 1180.0,
            elapsed_seconds: 42.5,
        };
        let json = serde_json::to_string(&result).unwrap();
        let parsed: EncodeResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }
}
