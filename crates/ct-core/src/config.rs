//! Configuration system for the citrine front-end

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub session: SessionConfig,
    pub content: ContentConfig,
    pub perf_overlay: PerfOverlayConfig,
    pub debug: DebugConfig,
}

/// General front-end settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub start_paused: bool,
    pub confirm_exit: bool,
}

/// Session lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Display refresh rate driving the frame scheduler
    pub refresh_rate_hz: u32,
    /// Name given to the engine worker thread
    pub worker_thread_name: String,
    /// Stack size for the engine worker thread, platform default when unset
    pub worker_stack_size: Option<usize>,
}

/// Accepted content settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// File extensions (without the dot) the engine can execute
    pub extensions: Vec<String>,
}

/// Performance overlay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerfOverlayConfig {
    pub enable: bool,
    pub show_fps: bool,
    pub show_frame_time: bool,
    pub show_speed: bool,
    pub interval_ms: u64,
}

/// Debug settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub log_level: LogLevel,
    pub log_to_file: bool,
    pub log_path: PathBuf,
}

/// Logging level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`
    pub fn as_directive(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

// Default implementations

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            start_paused: false,
            confirm_exit: true,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_rate_hz: 60,
            worker_thread_name: "NativeEmulation".to_string(),
            worker_stack_size: None,
        }
    }
}

impl SessionConfig {
    /// Interval between two display refresh ticks
    pub fn refresh_interval(&self) -> Duration {
        let hz = self.refresh_rate_hz.max(1);
        Duration::from_nanos(1_000_000_000 / hz as u64)
    }
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            extensions: ["3ds", "3dsx", "app", "axf", "cci", "cia", "cxi", "elf"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl ContentConfig {
    /// Whether `path` carries one of the accepted extensions (case-insensitive)
    pub fn accepts(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions.iter().any(|known| known.eq_ignore_ascii_case(ext))
    }
}

impl Default for PerfOverlayConfig {
    fn default() -> Self {
        Self {
            enable: false,
            show_fps: true,
            show_frame_time: false,
            show_speed: true,
            interval_ms: 1000,
        }
    }
}

impl PerfOverlayConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            log_to_file: false,
            log_path: PathBuf::from("citrine.log"),
        }
    }
}

impl Config {
    /// Load configuration from the default location, or create it if it doesn't exist
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Load configuration from `path`, writing defaults there when missing
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            tracing::debug!("Loading config from {}", path.display());
            Ok(toml::from_str(&content)?)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Created default config at {}", path.display());
            Ok(config)
        }
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(write_err)?;
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("citrine")
            .join("config.toml")
    }
}
