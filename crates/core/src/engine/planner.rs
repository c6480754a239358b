//! Initial bitrate budget computation.

use super::error::EngineError;
use super::types::{
    CONTAINER_OVERHEAD, DEFAULT_AUDIO_BITRATE_KBPS, MIN_AUDIO_BITRATE_KBPS,
    MIN_VIDEO_BITRATE_KBPS,
};

/// The audio/video bitrate split and search bounds for one request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BitratePlan {
    /// Audio bitrate, fixed for the whole search.
    pub audio_bitrate_kbps: u32,
    /// First trial video bitrate.
    pub video_bitrate_kbps: f64,
    /// Lower search bound.
    pub min_bitrate_kbps: f64,
    /// Upper search bound.
    pub max_bitrate_kbps: f64,
}

impl BitratePlan {
    /// Computes the plan from the target size and probed video info.
    ///
    /// Deterministic: the same inputs always produce the same plan.
    pub fn compute(
        duration_secs: f64,
        target_size_bytes: u64,
        source_bitrate_kbps: Option<f64>,
    ) -> Result<Self, EngineError> {
        if duration_secs <= 0.0 {
            return Err(EngineError::invalid_request(format!(
                "duration must be positive, got {}",
                duration_secs
            )));
        }

        let total_kbps = target_size_bytes as f64 * 8.0 / duration_secs / 1000.0;
        let audio_bitrate_kbps = select_audio_bitrate(total_kbps);

        let video_bitrate_kbps =
            ((total_kbps - audio_bitrate_kbps as f64) * CONTAINER_OVERHEAD).max(MIN_VIDEO_BITRATE_KBPS);

        let min_bitrate_kbps = MIN_VIDEO_BITRATE_KBPS;
        let mut max_bitrate_kbps = video_bitrate_kbps * 2.0;

        // The source bitrate caps the search. Encoding much above what the
        // source carries cannot grow the file, so trials up there only
        // waste iterations.
        if let Some(source) = source_bitrate_kbps.filter(|s| *s > 0.0) {
            let source_video = (source - audio_bitrate_kbps as f64).max(MIN_VIDEO_BITRATE_KBPS);
            max_bitrate_kbps = max_bitrate_kbps.min(source_video * 1.1);
        }

        // The first trial must sit inside the bounds.
        max_bitrate_kbps = max_bitrate_kbps.max(video_bitrate_kbps);

        Ok(Self {
            audio_bitrate_kbps,
            video_bitrate_kbps,
            min_bitrate_kbps,
            max_bitrate_kbps,
        })
    }
}

/// Picks the audio bitrate a total budget can support.
///
/// Audio gets the default 128 kbps when the budget allows it, otherwise it
/// shrinks so the video floor stays intact, never below 32 kbps.
fn select_audio_bitrate(total_kbps: f64) -> u32 {
    let max_audio = total_kbps - MIN_VIDEO_BITRATE_KBPS / CONTAINER_OVERHEAD;
    if max_audio >= DEFAULT_AUDIO_BITRATE_KBPS as f64 {
        DEFAULT_AUDIO_BITRATE_KBPS
    } else if max_audio <= 0.0 {
        MIN_AUDIO_BITRATE_KBPS
    } else {
        (max_audio as u32).max(MIN_AUDIO_BITRATE_KBPS)
    }
}
