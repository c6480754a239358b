use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - ffmpeg/ffprobe paths are not empty
/// - The scratch directory is not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.transcoder.ffmpeg_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "transcoder.ffmpeg_path cannot be empty".to_string(),
        ));
    }

    if config.transcoder.ffprobe_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "transcoder.ffprobe_path cannot be empty".to_string(),
        ));
    }

    if config.engine.temp_dir.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "engine.temp_dir cannot be empty".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_empty_ffmpeg_path_fails() {
        let mut config = Config::default();
        config.transcoder.ffmpeg_path = PathBuf::new();
        let result = validate_config(&config);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_empty_ffprobe_path_fails() {
        let mut config = Config::default();
        config.transcoder.ffprobe_path = PathBuf::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_empty_temp_dir_fails() {
        let mut config = Config::default();
        config.engine.temp_dir = PathBuf::new();
        assert!(validate_config(&config).is_err());
    }
}
