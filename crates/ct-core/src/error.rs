//! Error types for the citrine front-end

use std::path::PathBuf;
use thiserror::Error;

/// Session construction and lifecycle errors
///
/// The `Display` text of these errors is what the host shows the user before
/// closing the emulation view.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("No game present to launch")]
    NoContent,

    #[error("Unsupported content type: {}", .0.display())]
    UnsupportedContent(PathBuf),

    #[error("Content not found: {}", .0.display())]
    ContentNotFound(PathBuf),

    #[error("Failed to spawn emulation thread: {0}")]
    ThreadSpawn(String),

    #[error("Emulation thread already running")]
    WorkerAlive,
}

/// Errors reported by the emulation engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine failed to start {}: {reason}", path.display())]
    StartFailed { path: PathBuf, reason: String },

    #[error("Engine aborted: {0}")]
    Aborted(String),
}

/// Configuration file errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SessionError::NoContent;
        assert_eq!(format!("{}", err), "No game present to launch");

        let err = SessionError::UnsupportedContent(PathBuf::from("/games/readme.txt"));
        assert_eq!(
            format!("{}", err),
            "Unsupported content type: /games/readme.txt"
        );

        let err = EngineError::StartFailed {
            path: PathBuf::from("game.3ds"),
            reason: "bad header".to_string(),
        };
        assert_eq!(
            format!("{}", err),
            "Engine failed to start game.3ds: bad header"
        );
    }

    #[test]
    fn test_config_error_conversion() {
        let parse = toml::from_str::<crate::Config>("[general").unwrap_err();
        let err: ConfigError = parse.into();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(format!("{}", err).starts_with("Invalid config:"));
    }
}
