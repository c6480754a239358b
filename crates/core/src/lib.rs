pub mod cancel;
pub mod config;
pub mod engine;
pub mod progress;
pub mod testing;
pub mod transcoder;

pub use cancel::CancelFlag;
pub use config::{load_config, load_config_from_str, validate_config, Config, ConfigError};
pub use engine::{
    BitratePlan, ConvergenceFailure, EncodeHandle, EncodeRequest, EncodeResult, EngineConfig,
    EngineError, SizeSearchEngine,
};
pub use progress::ProgressUpdate;
pub use transcoder::{
    EncodeJob, FfmpegTranscoder, Quality, Transcoder, TranscoderConfig, TranscoderError, VideoInfo,
};
