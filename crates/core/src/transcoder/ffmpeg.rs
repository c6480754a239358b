//! FFmpeg-based transcoder implementation.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::cancel::CancelFlag;
use crate::progress::{ProgressSnapshot, ProgressUpdate};

use super::config::TranscoderConfig;
use super::error::TranscoderError;
use super::traits::Transcoder;
use super::types::{EncodeJob, VideoInfo};

/// FFmpeg-based transcoder implementation.
pub struct FfmpegTranscoder {
    config: TranscoderConfig,
}

impl FfmpegTranscoder {
    /// Creates a new FFmpeg transcoder with the given configuration.
    pub fn new(config: TranscoderConfig) -> Self {
        Self { config }
    }

    /// Creates a transcoder with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(TranscoderConfig::default())
    }

    /// Builds ffprobe arguments for the line-oriented format query.
    fn build_probe_args(input_path: &Path) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-show_entries".to_string(),
            "format=duration,bit_rate".to_string(),
            "-of".to_string(),
            "default=noprint_wrappers=1:nokey=1".to_string(),
            input_path.to_string_lossy().to_string(),
        ]
    }

    /// Builds ffmpeg arguments for a trial encode.
    fn build_encode_args(&self, job: &EncodeJob) -> Vec<String> {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            self.config.ffmpeg_log_level.clone(),
            "-y".to_string(), // Overwrite output
            "-i".to_string(),
            job.input_path.to_string_lossy().to_string(),
            "-b:v".to_string(),
            format!("{:.0}k", job.video_bitrate_kbps),
            "-b:a".to_string(),
            format!("{}k", job.audio_bitrate_kbps),
        ];

        // Fixed output normalization
        args.extend([
            "-c:a".to_string(),
            "aac".to_string(),
            "-profile:v".to_string(),
            "main".to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ]);

        // Codec and preset from the quality level
        args.extend([
            "-c:v".to_string(),
            job.quality.video_codec().to_string(),
            "-preset".to_string(),
            job.quality.preset().to_string(),
        ]);

        // Extra args
        args.extend(self.config.extra_ffmpeg_args.iter().cloned());

        // Progress key=value stream on stderr, no rolling stats line
        args.extend([
            "-progress".to_string(),
            "pipe:2".to_string(),
            "-nostats".to_string(),
        ]);

        // Output
        args.push(job.output_path.to_string_lossy().to_string());

        args
    }

    /// Parses the line-oriented ffprobe output into VideoInfo.
    ///
    /// Line 1 is the duration in seconds, line 2 the container bitrate in
    /// bits per second or `N/A`.
    fn parse_probe_output(output: &str) -> Result<VideoInfo, TranscoderError> {
        let mut lines = output.lines().map(str::trim).filter(|l| !l.is_empty());

        let duration_line = lines
            .next()
            .ok_or_else(|| TranscoderError::probe_failed("ffprobe produced no output"))?;
        let duration_secs = duration_line.parse::<f64>().map_err(|_| {
            TranscoderError::probe_failed(format!("invalid duration value: {}", duration_line))
        })?;
        if duration_secs <= 0.0 {
            return Err(TranscoderError::probe_failed(format!(
                "input duration must be positive, got {}",
                duration_secs
            )));
        }

        let source_bitrate_kbps = lines.next().and_then(|raw| {
            if raw.eq_ignore_ascii_case("n/a") {
                None
            } else {
                raw.parse::<f64>().ok().map(|bps| bps / 1000.0)
            }
        });

        Ok(VideoInfo {
            duration_secs,
            source_bitrate_kbps,
        })
    }

    /// Runs the encode, streaming progress until the encoder exits.
    async fn run_encode(
        &self,
        job: &EncodeJob,
        progress_tx: Option<mpsc::Sender<ProgressUpdate>>,
        cancel: &CancelFlag,
    ) -> Result<u64, TranscoderError> {
        // Ensure output directory exists
        if let Some(parent) = job.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let args = self.build_encode_args(job);

        let mut child = Command::new(&self.config.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscoderError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    TranscoderError::Io(e)
                }
            })?;

        let stderr = child.stderr.take().expect("stderr should be captured");
        let mut reader = BufReader::new(stderr).lines();

        let mut snapshot = ProgressSnapshot::new();
        let mut last_message: Option<String> = None;

        while let Ok(Some(line)) = reader.next_line().await {
            if cancel.is_cancelled() {
                // Force-kill so no orphan outlives the cancellation
                let _ = child.kill().await;
                return Err(TranscoderError::Cancelled);
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            // Lines without a key=value shape are encoder diagnostics; keep
            // the most recent one for error reporting.
            let Some((key, value)) = line
                .split_once('=')
                .filter(|(key, _)| !key.trim().is_empty())
            else {
                last_message = Some(line.to_string());
                continue;
            };

            snapshot.insert(key, value);

            if key.trim() == "progress" && value.trim() == "continue" {
                if let Some(ref tx) = progress_tx {
                    let update = ProgressUpdate {
                        percent: snapshot.percent(job.duration_secs),
                        message: snapshot.status_line(job.duration_secs),
                    };
                    // Non-blocking send
                    let _ = tx.try_send(update);
                }
            }
        }

        let status = child.wait().await?;

        if !status.success() {
            return Err(TranscoderError::encode_failed(
                format!("FFmpeg exited with code: {:?}", status.code()),
                last_message,
            ));
        }

        // Verify output exists and get size
        let metadata = tokio::fs::metadata(&job.output_path)
            .await
            .map_err(|_| TranscoderError::encode_failed("Output file not created", None))?;

        Ok(metadata.len())
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn probe(&self, path: &Path) -> Result<VideoInfo, TranscoderError> {
        if !path.exists() {
            return Err(TranscoderError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let output = Command::new(&self.config.ffprobe_path)
            .args(Self::build_probe_args(path))
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscoderError::FfprobeNotFound {
                        path: self.config.ffprobe_path.clone(),
                    }
                } else {
                    TranscoderError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(TranscoderError::probe_failed(format!(
                "ffprobe failed: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Self::parse_probe_output(&stdout)
    }

    async fn encode(
        &self,
        job: &EncodeJob,
        progress_tx: Option<mpsc::Sender<ProgressUpdate>>,
        cancel: &CancelFlag,
    ) -> Result<u64, TranscoderError> {
        self.run_encode(job, progress_tx, cancel).await
    }

    async fn validate(&self) -> Result<(), TranscoderError> {
        // Check ffmpeg exists
        let ffmpeg_result = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffmpeg_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(TranscoderError::FfmpegNotFound {
                    path: self.config.ffmpeg_path.clone(),
                });
            }
            return Err(TranscoderError::Io(e));
        }

        // Check ffprobe exists
        let ffprobe_result = Command::new(&self.config.ffprobe_path)
            .arg("-version")
            .output()
            .await;

        if let Err(e) = ffprobe_result {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(TranscoderError::FfprobeNotFound {
                    path: self.config.ffprobe_path.clone(),
                });
            }
            return Err(TranscoderError::Io(e));
        }

        Ok(())
    }
}
