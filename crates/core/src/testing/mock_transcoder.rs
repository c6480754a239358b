//! Mock transcoder for testing.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};

use crate::cancel::CancelFlag;
use crate::progress::ProgressUpdate;
use crate::transcoder::{EncodeJob, Transcoder, TranscoderError, VideoInfo};

/// A recorded encode job for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedEncode {
    /// The job that was submitted.
    pub job: EncodeJob,
    /// Whether the encode succeeded.
    pub success: bool,
}

/// Mock implementation of the Transcoder trait.
///
/// Provides controllable behavior for testing:
/// - Track encode jobs for assertions
/// - Model output size as linear in bitrate, or script exact sizes
/// - Control probe results
/// - Simulate progress updates and record forced kills
///
/// Clones share state, so a test can hand one clone to the engine and
/// keep another for assertions.
///
/// # Example
///
/// ```rust,ignore
/// use shrinkray_core::testing::MockTranscoder;
///
/// let transcoder = MockTranscoder::new();
/// transcoder.set_bytes_per_kbps(10_000.0).await;
///
/// // Run the engine against it...
///
/// let encodes = transcoder.recorded_encodes().await;
/// assert!(!encodes.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct MockTranscoder {
    /// Recorded encodes.
    encodes: Arc<RwLock<Vec<RecordedEncode>>>,
    /// Pre-configured probe result.
    probe_result: Arc<RwLock<Option<VideoInfo>>>,
    /// Number of probe calls.
    probe_calls: Arc<RwLock<usize>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<TranscoderError>>>,
    /// Output bytes produced per kbps of video bitrate.
    bytes_per_kbps: Arc<RwLock<f64>>,
    /// Exact sizes to return, consumed front to back before the linear
    /// model applies.
    scripted_sizes: Arc<RwLock<Vec<u64>>>,
    /// Progress updates sent per encode.
    progress_steps: Arc<RwLock<u32>>,
    /// Number of encodes terminated by cancellation.
    kills: Arc<RwLock<usize>>,
}

impl Default for MockTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscoder {
    /// Create a new mock transcoder.
    pub fn new() -> Self {
        Self {
            encodes: Arc::new(RwLock::new(Vec::new())),
            probe_result: Arc::new(RwLock::new(None)),
            probe_calls: Arc::new(RwLock::new(0)),
            next_error: Arc::new(RwLock::new(None)),
            bytes_per_kbps: Arc::new(RwLock::new(10_000.0)),
            scripted_sizes: Arc::new(RwLock::new(Vec::new())),
            progress_steps: Arc::new(RwLock::new(3)),
            kills: Arc::new(RwLock::new(0)),
        }
    }

    /// Get all recorded encodes.
    pub async fn recorded_encodes(&self) -> Vec<RecordedEncode> {
        self.encodes.read().await.clone()
    }

    /// Get the number of encodes attempted.
    pub async fn encode_count(&self) -> usize {
        self.encodes.read().await.len()
    }

    /// Get the number of probe calls.
    pub async fn probe_count(&self) -> usize {
        *self.probe_calls.read().await
    }

    /// Get the number of encodes terminated by cancellation.
    pub async fn kill_count(&self) -> usize {
        *self.kills.read().await
    }

    /// Set the probe result returned for any path.
    pub async fn set_probe_result(&self, info: VideoInfo) {
        *self.probe_result.write().await = Some(info);
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: TranscoderError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set how many output bytes one kbps of video bitrate produces.
    pub async fn set_bytes_per_kbps(&self, bytes: f64) {
        *self.bytes_per_kbps.write().await = bytes;
    }

    /// Script exact output sizes for the next encodes.
    pub async fn set_scripted_sizes(&self, sizes: Vec<u64>) {
        *self.scripted_sizes.write().await = sizes;
    }

    /// Set the number of progress updates sent per encode.
    pub async fn set_progress_steps(&self, steps: u32) {
        *self.progress_steps.write().await = steps;
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<TranscoderError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(&self, _path: &Path) -> Result<VideoInfo, TranscoderError> {
        *self.probe_calls.write().await += 1;

        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        if let Some(info) = self.probe_result.read().await.as_ref() {
            return Ok(info.clone());
        }

        Ok(VideoInfo {
            duration_secs: 60.0,
            source_bitrate_kbps: Some(5000.0),
        })
    }

    async fn encode(
        &self,
        job: &EncodeJob,
        progress_tx: Option<mpsc::Sender<ProgressUpdate>>,
        cancel: &CancelFlag,
    ) -> Result<u64, TranscoderError> {
        if let Some(err) = self.take_error().await {
            self.encodes.write().await.push(RecordedEncode {
                job: job.clone(),
                success: false,
            });
            return Err(err);
        }

        let steps = *self.progress_steps.read().await;
        for i in 0..steps {
            if cancel.is_cancelled() {
                *self.kills.write().await += 1;
                self.encodes.write().await.push(RecordedEncode {
                    job: job.clone(),
                    success: false,
                });
                return Err(TranscoderError::Cancelled);
            }

            if let Some(ref tx) = progress_tx {
                let _ = tx.try_send(ProgressUpdate {
                    percent: ((i + 1) * 100 / steps).min(100) as u8,
                    message: format!("Encoding at {:.0} kbps", job.video_bitrate_kbps),
                });
            }

            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        let size_bytes = {
            let mut scripted = self.scripted_sizes.write().await;
            if scripted.is_empty() {
                let bytes_per_kbps = *self.bytes_per_kbps.read().await;
                (job.video_bitrate_kbps * bytes_per_kbps) as u64
            } else {
                scripted.remove(0)
            }
        };

        // A sparse file of the reported size stands in for real output.
        let file = tokio::fs::File::create(&job.output_path).await?;
        file.set_len(size_bytes).await?;

        self.encodes.write().await.push(RecordedEncode {
            job: job.clone(),
            success: true,
        });

        Ok(size_bytes)
    }

    async fn validate(&self) -> Result<(), TranscoderError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok(())
    }
}
