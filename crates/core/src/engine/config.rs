use serde::{Deserialize, Serialize};
use std::path::PathBuf;

fn default_temp_dir() -> PathBuf {
    std::env::temp_dir().join("shrinkray")
}

/// Configuration for the size search engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Directory for trial encode scratch files.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            temp_dir: default_temp_dir(),
        }
    }
}

impl EngineConfig {
    /// Sets the scratch directory.
    pub fn with_temp_dir(mut self, temp_dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = temp_dir.into();
        self
    }
}
