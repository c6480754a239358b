//! Types for the transcoder module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Encode quality level, trading encode time for compression efficiency.
///
/// Serialized as its numeric level (1-4); higher levels squeeze more quality
/// into the same bitrate at the cost of much slower encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Quality {
    /// Level 1: H.264, medium preset. Fastest.
    H264Medium,
    /// Level 2: H.265, medium preset.
    H265Medium,
    /// Level 3: H.265, slow preset.
    H265Slow,
    /// Level 4: H.265, veryslow preset. Best quality per bit.
    H265VerySlow,
}

impl Quality {
    /// Returns the quality for a numeric level between 1 and 4.
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            1 => Some(Self::H264Medium),
            2 => Some(Self::H265Medium),
            3 => Some(Self::H265Slow),
            4 => Some(Self::H265VerySlow),
            _ => None,
        }
    }

    /// Returns the numeric level for this quality.
    pub fn level(&self) -> u8 {
        match self {
            Self::H264Medium => 1,
            Self::H265Medium => 2,
            Self::H265Slow => 3,
            Self::H265VerySlow => 4,
        }
    }

    /// Returns the ffmpeg video codec name for this quality.
    pub fn video_codec(&self) -> &'static str {
        match self {
            Self::H264Medium => "libx264",
            Self::H265Medium | Self::H265Slow | Self::H265VerySlow => "libx265",
        }
    }

    /// Returns the ffmpeg preset name for this quality.
    pub fn preset(&self) -> &'static str {
        match self {
            Self::H264Medium | Self::H265Medium => "medium",
            Self::H265Slow => "slow",
            Self::H265VerySlow => "veryslow",
        }
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self::H264Medium
    }
}

impl TryFrom<u8> for Quality {
    type Error = String;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        Self::from_level(level).ok_or_else(|| format!("quality level must be 1-4, got {}", level))
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.level()
    }
}

/// Media facts gathered by probing the input container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Total duration in seconds.
    pub duration_secs: f64,
    /// Container bitrate in kbps, when the container reports one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_bitrate_kbps: Option<f64>,
}

/// One trial encode: the input, a scratch output, and the rates to encode at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeJob {
    /// Source video.
    pub input_path: PathBuf,
    /// Where the encoder writes; promoted by the caller afterwards.
    pub output_path: PathBuf,
    /// Video bitrate in kbps; rendered integer-rounded on the command line.
    pub video_bitrate_kbps: f64,
    /// Audio bitrate in kbps, fixed for the whole search.
    pub audio_bitrate_kbps: u32,
    /// Codec and preset selection.
    pub quality: Quality,
    /// Input duration in seconds, used to derive percent-complete and ETA.
    pub duration_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_level_mapping() {
        assert_eq!(Quality::from_level(1), Some(Quality::H264Medium));
        assert_eq!(Quality::from_level(2), Some(Quality::H265Medium));
        assert_eq!(Quality::from_level(3), Some(Quality::H265Slow));
        assert_eq!(Quality::from_level(4), Some(Quality::H265VerySlow));
        assert_eq!(Quality::from_level(0), None);
        assert_eq!(Quality::from_level(5), None);
    }

    #[test]
    fn test_quality_codec_and_preset() {
        assert_eq!(Quality::H264Medium.video_codec(), "libx264");
        assert_eq!(Quality::H264Medium.preset(), "medium");
        assert_eq!(Quality::H265Medium.video_codec(), "libx265");
        assert_eq!(Quality::H265Medium.preset(), "medium");
        assert_eq!(Quality::H265Slow.preset(), "slow");
        assert_eq!(Quality::H265VerySlow.preset(), "veryslow");
    }

    #[test]
    fn test_quality_round_trips_through_level() {
        for level in 1..=4u8 {
            let quality = Quality::from_level(level).unwrap();
            assert_eq!(quality.level(), level);
        }
    }

    #[test]
    fn test_quality_serializes_as_level() {
        let json = serde_json::to_string(&Quality::H265Slow).unwrap();
        assert_eq!(json, "3");
        let quality: Quality = serde_json::from_str("2").unwrap();
        assert_eq!(quality, Quality::H265Medium);
    }

    #[test]
    fn test_quality_rejects_out_of_range_level() {
        let result: Result<Quality, _> = serde_json::from_str("7");
        assert!(result.is_err());
    }

    #[test]
    fn test_video_info_serde_skips_missing_bitrate() {
        let info = VideoInfo {
            duration_secs: 60.0,
            source_bitrate_kbps: None,
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(!json.contains("source_bitrate_kbps"));
    }
}
