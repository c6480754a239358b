//! Trait definitions for the transcoder module.

use async_trait::async_trait;
use std::path::Path;
use tokio::sync::mpsc;

use crate::cancel::CancelFlag;
use crate::progress::ProgressUpdate;

use super::error::TranscoderError;
use super::types::{EncodeJob, VideoInfo};

/// An external tool that can probe and encode video files.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Probes a video file for its duration and container bitrate.
    async fn probe(&self, path: &Path) -> Result<VideoInfo, TranscoderError>;

    /// Runs one trial encode and returns the output size in bytes.
    ///
    /// Progress updates are sent non-blockingly; a full or closed channel
    /// drops updates rather than stalling the encode. The cancel flag is
    /// polled per progress line, and a set flag force-kills the encoder
    /// before `TranscoderError::Cancelled` is returned.
    async fn encode(
        &self,
        job: &EncodeJob,
        progress_tx: Option<mpsc::Sender<ProgressUpdate>>,
        cancel: &CancelFlag,
    ) -> Result<u64, TranscoderError>;

    /// Validates that the transcoder binaries are available.
    async fn validate(&self) -> Result<(), TranscoderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    struct NullTranscoder;

    #[async_trait]
    impl Transcoder for NullTranscoder {
        fn name(&self) -> &str {
            "null"
        }

        async fn probe(&self, _path: &Path) -> Result<VideoInfo, TranscoderError> {
            Ok(VideoInfo {
                duration_secs: 120.0,
                source_bitrate_kbps: Some(4500.0),
            })
        }

        async fn encode(
            &self,
            _job: &EncodeJob,
            _progress_tx: Option<mpsc::Sender<ProgressUpdate>>,
            _cancel: &CancelFlag,
        ) -> Result<u64, TranscoderError> {
            Ok(1024)
        }

        async fn validate(&self) -> Result<(), TranscoderError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_transcoder_is_object_safe() {
        let transcoder: Box<dyn Transcoder> = Box::new(NullTranscoder);
        assert_eq!(transcoder.name(), "null");

        let info = transcoder.probe(Path::new("/test/file.mp4")).await.unwrap();
        assert_eq!(info.duration_secs, 120.0);

        let job = EncodeJob {
            input_path: PathBuf::from("/test/input.mp4"),
            output_path: PathBuf::from("/test/output.mp4"),
            video_bitrate_kbps: 1200.0,
            audio_bitrate_kbps: 128,
            quality: crate::transcoder::Quality::H264Medium,
            duration_secs: 120.0,
        };
        let size = transcoder
            .encode(&job, None, &CancelFlag::new())
            .await
            .unwrap();
        assert_eq!(size, 1024);
    }
}
