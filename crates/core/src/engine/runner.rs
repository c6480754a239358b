//! The convergence loop that drives the transcoder.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::cancel::CancelFlag;
use crate::progress::ProgressUpdate;
use crate::transcoder::{EncodeJob, Transcoder, TranscoderError};

use super::config::EngineConfig;
use super::error::{ConvergenceFailure, EngineError};
use super::planner::BitratePlan;
use super::search::{Sample, SearchState, StepOutcome};
use super::types::{EncodeRequest, EncodeResult};

/// Drives repeated trial encodes until the output lands within the
/// tolerance window below the target size.
pub struct SizeSearchEngine<T: Transcoder> {
    config: EngineConfig,
    transcoder: Arc<T>,
}

/// What the search loop delivered to the output path.
struct SearchOutcome {
    success: bool,
    delivered: Sample,
    iterations: u32,
}

impl<T: Transcoder + 'static> SizeSearchEngine<T> {
    /// Creates a new engine.
    pub fn new(config: EngineConfig, transcoder: T) -> Self {
        Self {
            config,
            transcoder: Arc::new(transcoder),
        }
    }

    /// Starts the request on a background task.
    ///
    /// The returned handle cancels and joins the run; progress arrives on
    /// the channel from the background task, so the receiver must not
    /// assume caller-thread delivery.
    pub fn spawn(
        &self,
        request: EncodeRequest,
        progress_tx: Option<mpsc::Sender<ProgressUpdate>>,
    ) -> EncodeHandle {
        let engine = Self {
            config: self.config.clone(),
            transcoder: Arc::clone(&self.transcoder),
        };
        let cancel = CancelFlag::new();
        let task_cancel = cancel.clone();
        let task =
            tokio::spawn(async move { engine.run(request, progress_tx, task_cancel).await });

        EncodeHandle { cancel, task }
    }

    /// Runs the request to completion on the current task.
    pub async fn run(
        &self,
        request: EncodeRequest,
        progress_tx: Option<mpsc::Sender<ProgressUpdate>>,
        cancel: CancelFlag,
    ) -> Result<EncodeResult, EngineError> {
        let started = Instant::now();

        validate_request(&request)?;
        self.transcoder.validate().await?;

        let input_size = tokio::fs::metadata(&request.input_path).await?.len();
        let target_bytes = request.target_size_bytes();

        // Already small enough: deliver the original untouched, no
        // transcoder involved.
        if input_size <= target_bytes {
            info!(
                "{} is already within {} MB, skipping encode",
                request.input_path.display(),
                request.target_size_mb
            );
            send_update(&progress_tx, 100, "Already within target size".to_string());
            return Ok(EncodeResult {
                success: true,
                file_path: request.input_path.clone(),
                file_size_bytes: input_size,
                target_size_bytes: target_bytes,
                iterations: 0,
                video_bitrate_kbps: 0.0,
                elapsed_seconds: started.elapsed().as_secs_f64(),
            });
        }

        let video_info = self.transcoder.probe(&request.input_path).await?;
        if video_info.duration_secs <= 0.0 {
            return Err(TranscoderError::probe_failed(format!(
                "input duration must be positive, got {}",
                video_info.duration_secs
            ))
            .into());
        }

        // A container without a bitrate entry still has a knowable average
        // bitrate; estimate it from the size so the planner can cap the
        // search ceiling.
        let source_bitrate_kbps = video_info
            .source_bitrate_kbps
            .unwrap_or_else(|| input_size as f64 * 8.0 / video_info.duration_secs / 1000.0);

        let plan = BitratePlan::compute(
            video_info.duration_secs,
            target_bytes,
            Some(source_bitrate_kbps),
        )?;
        info!(
            "Searching for {} MB over {:.1}s: video {:.0} kbps, audio {} kbps, bounds [{:.0}, {:.0}]",
            request.target_size_mb,
            video_info.duration_secs,
            plan.video_bitrate_kbps,
            plan.audio_bitrate_kbps,
            plan.min_bitrate_kbps,
            plan.max_bitrate_kbps
        );

        tokio::fs::create_dir_all(&self.config.temp_dir).await?;
        let scratch = self
            .config
            .temp_dir
            .join(format!("shrinkray-{}.mp4", Uuid::new_v4()));

        let outcome = self
            .search_loop(
                &request,
                &plan,
                video_info.duration_secs,
                &scratch,
                &progress_tx,
                &cancel,
            )
            .await;

        // Promotion renames the scratch file away, so this is a no-op on
        // terminating iterations.
        remove_if_exists(&scratch).await;

        let outcome = outcome?;
        let elapsed_seconds = started.elapsed().as_secs_f64();
        info!(
            "Delivered {} ({} bytes, {:.0} kbps) after {} iterations in {:.1}s",
            request.output_path.display(),
            outcome.delivered.size_bytes,
            outcome.delivered.bitrate_kbps,
            outcome.iterations,
            elapsed_seconds
        );

        Ok(EncodeResult {
            success: outcome.success,
            file_path: request.output_path.clone(),
            file_size_bytes: outcome.delivered.size_bytes,
            target_size_bytes: target_bytes,
            iterations: outcome.iterations,
            video_bitrate_kbps: outcome.delivered.bitrate_kbps,
            elapsed_seconds,
        })
    }

    /// The iteration loop: encode, classify, rebracket, repeat.
    async fn search_loop(
        &self,
        request: &EncodeRequest,
        plan: &BitratePlan,
        duration_secs: f64,
        scratch: &Path,
        progress_tx: &Option<mpsc::Sender<ProgressUpdate>>,
        cancel: &CancelFlag,
    ) -> Result<SearchOutcome, EngineError> {
        let target_bytes = request.target_size_bytes();
        let mut state = SearchState::new(
            target_bytes,
            request.tolerance_bytes(),
            plan.min_bitrate_kbps,
            plan.max_bitrate_kbps,
        );
        let mut bitrate = plan.video_bitrate_kbps;
        let mut last: Option<Sample> = None;
        let mut iterations = 0;

        for iteration in 1..=request.max_iterations {
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }

            send_update(
                progress_tx,
                0,
                format!(
                    "Iteration {}/{} at {:.0} kbps",
                    iteration, request.max_iterations, bitrate
                ),
            );

            let job = EncodeJob {
                input_path: request.input_path.clone(),
                output_path: scratch.to_path_buf(),
                video_bitrate_kbps: bitrate,
                audio_bitrate_kbps: plan.audio_bitrate_kbps,
                quality: request.quality,
                duration_secs,
            };
            let size_bytes = self
                .transcoder
                .encode(&job, progress_tx.clone(), cancel)
                .await?;

            iterations = iteration;
            let sample = Sample {
                bitrate_kbps: bitrate,
                size_bytes,
            };
            last = Some(sample);
            debug!(
                "Iteration {}: {:.0} kbps produced {} bytes (target {})",
                iteration, bitrate, size_bytes, target_bytes
            );

            send_update(
                progress_tx,
                100,
                format!("Iteration {}/{} complete", iteration, request.max_iterations),
            );

            let (next_state, outcome) = state.step(sample);
            state = next_state;
            match outcome {
                StepOutcome::WithinTolerance => {
                    self.promote(scratch, &request.output_path).await?;
                    return Ok(SearchOutcome {
                        success: true,
                        delivered: sample,
                        iterations,
                    });
                }
                StepOutcome::Continue { next_bitrate_kbps } => {
                    bitrate = next_bitrate_kbps;
                }
                StepOutcome::FloorReached => {
                    debug!("Next estimate fell below the bitrate floor, stopping early");
                    break;
                }
            }
        }

        let Some(last) = last else {
            // Unreachable once max_iterations >= 1 has been validated.
            return Err(EngineError::invalid_request("no trial encode was run"));
        };

        // Out of iterations. A last trial at or under target is still
        // worth delivering; anything else is a failure.
        if last.size_bytes <= target_bytes {
            warn!(
                "Iteration budget exhausted, delivering best effort: {} bytes for a {} byte target",
                last.size_bytes, target_bytes
            );
            self.promote(scratch, &request.output_path).await?;
            return Ok(SearchOutcome {
                success: false,
                delivered: last,
                iterations,
            });
        }

        Err(EngineError::Convergence(ConvergenceFailure {
            iterations,
            final_size_bytes: last.size_bytes,
            closest_over: state.best_over(),
        }))
    }

    /// Moves the scratch file onto the output path, replacing any
    /// previous file there.
    async fn promote(&self, scratch: &Path, output: &Path) -> Result<(), EngineError> {
        if let Some(parent) = output.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        try_atomic_move(scratch, output).await?;
        Ok(())
    }
}

/// Handle to an encode running on a background task.
pub struct EncodeHandle {
    cancel: CancelFlag,
    task: JoinHandle<Result<EncodeResult, EngineError>>,
}

impl EncodeHandle {
    /// Requests cancellation. The run notices at the next poll point and
    /// force-kills any in-flight encoder process.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The flag shared with the running task.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Waits for the run to finish.
    pub async fn join(self) -> Result<EncodeResult, EngineError> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(EngineError::Cancelled),
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        }
    }
}

fn validate_request(request: &EncodeRequest) -> Result<(), EngineError> {
    if !request.input_path.is_file() {
        return Err(EngineError::invalid_request(format!(
            "input file not found: {}",
            request.input_path.display()
        )));
    }
    if request.target_size_mb == 0 {
        return Err(EngineError::invalid_request(
            "target size must be at least 1 MB",
        ));
    }
    if !(request.tolerance_percent > 0.0 && request.tolerance_percent <= 50.0) {
        return Err(EngineError::invalid_request(format!(
            "tolerance must be in (0, 50], got {}",
            request.tolerance_percent
        )));
    }
    if request.max_iterations == 0 {
        return Err(EngineError::invalid_request(
            "max iterations must be at least 1",
        ));
    }
    if points_at_input(&request.input_path, &request.output_path) {
        return Err(EngineError::invalid_request(
            "output path must differ from the input path",
        ));
    }
    Ok(())
}

/// Whether the output path resolves to the input file. The output rarely
/// exists yet, so its parent is normalized instead.
fn points_at_input(input: &Path, output: &Path) -> bool {
    let Ok(input) = std::fs::canonicalize(input) else {
        return false;
    };
    if let Ok(output) = std::fs::canonicalize(output) {
        return input == output;
    }
    let Some(name) = output.file_name() else {
        return false;
    };
    match output.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => std::fs::canonicalize(parent)
            .map(|p| p.join(name) == input)
            .unwrap_or(false),
        None => false,
    }
}

fn send_update(tx: &Option<mpsc::Sender<ProgressUpdate>>, percent: u8, message: String) {
    if let Some(tx) = tx {
        // Non-blocking send
        let _ = tx.try_send(ProgressUpdate { percent, message });
    }
}

/// Moves a file, falling back to copy and delete when the rename crosses
/// filesystems (EXDEV).
async fn try_atomic_move(from: &Path, to: &Path) -> std::io::Result<()> {
    match tokio::fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(e)
            if e.kind() == std::io::ErrorKind::CrossesDevices
                || e.raw_os_error() == Some(18) =>
        {
            tokio::fs::copy(from, to).await?;
            tokio::fs::remove_file(from).await?;
            Ok(())
        }
        Err(e) => Err(e),
    }
}

async fn remove_if_exists(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove scratch file {}: {}", path.display(), e),
    }
}
