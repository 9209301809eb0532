//! TOML-based configuration for the display server.
//!
//! ```toml
//! [server]
//! port = "5569"
//! fps = 30.0
//! cached_images = 2
//! log_level = "info"
//! frame_output = "latest_frame.raw"
//! diagnostics_dir = "diag"
//!
//! [comm]
//! poll_timeout_ms = 500
//! stats_dump_every = 30
//! ```
//!
//! Every field has a serde default, so an empty or partial file is valid and
//! a missing file yields [`AppConfig::default()`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use relay_comm::{CommSettings, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub comm: CommSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// TCP port to listen on.  `"0"` lets the OS pick one.
    #[serde(default = "default_port")]
    pub port: String,
    /// Display loop rate in ticks per second.
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Number of most recent images kept by the frame intake.
    #[serde(default = "default_cached_images")]
    pub cached_images: usize,
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// When set, every displayed frame overwrites this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_output: Option<PathBuf>,
    /// Where counter snapshots are written.  No snapshots when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics_dir: Option<PathBuf>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

const MIN_TICK_SECS: f64 = 0.001;
const MAX_TICK_SECS: f64 = 3600.0;

fn default_port() -> String {
    DEFAULT_PORT.to_string()
}
fn default_fps() -> f64 {
    30.0
}
fn default_cached_images() -> usize {
    2
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            fps: default_fps(),
            cached_images: default_cached_images(),
            log_level: default_log_level(),
            frame_output: None,
            diagnostics_dir: None,
        }
    }
}

impl AppConfig {
    /// Loads the config at `path`, returning defaults if the file does not
    /// exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] for file-system errors other than "not
    /// found", and [`ConfigError::Parse`] if the TOML is malformed.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Writes the config to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] for file-system failures or
    /// [`ConfigError::Serialize`] if serialization fails.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Transport settings with the server's diagnostics directory filled in
    /// when `[comm]` does not name its own.
    pub fn comm_settings(&self) -> CommSettings {
        let mut comm = self.comm.clone();
        if comm.diagnostics_dir.is_none() {
            comm.diagnostics_dir = self.server.diagnostics_dir.clone();
        }
        comm
    }

    /// Display tick period.  Rates that are not finite and positive fall back to
    /// the default; the period is clamped to between 1 ms and one hour.
    pub fn tick_period(&self) -> Duration {
        let fps = self.server.fps;
        let fps = if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            default_fps()
        };
        Duration::from_secs_f64((1.0 / fps).clamp(MIN_TICK_SECS, MAX_TICK_SECS))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_listens_on_5569_at_30_fps() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.server.port, "5569");
        assert_eq!(cfg.server.fps, 30.0);
        assert_eq!(cfg.server.cached_images, 2);
        assert_eq!(cfg.server.log_level, "info");
        assert!(cfg.server.frame_output.is_none());
        assert_eq!(cfg.comm, CommSettings::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults_for_missing_fields() {
        let cfg: AppConfig = toml::from_str("[server]\nfps = 60.0\n").unwrap();
        assert_eq!(cfg.server.fps, 60.0);
        assert_eq!(cfg.server.port, "5569");
        assert_eq!(cfg.comm.poll_timeout_ms, 500);
    }

    #[test]
    fn test_load_from_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_load_from_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();
        let result = AppConfig::load_from(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_save_then_load_restores_config() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("server.toml");
        let mut cfg = AppConfig::default();
        cfg.server.port = "6000".to_string();
        cfg.server.frame_output = Some(PathBuf::from("out.raw"));
        cfg.comm.stats_dump_every = 5;

        // Act
        cfg.save_to(&path).unwrap();
        let restored = AppConfig::load_from(&path).unwrap();

        // Assert
        assert_eq!(restored, cfg);
    }

    #[test]
    fn test_comm_settings_inherits_server_diagnostics_dir() {
        let mut cfg = AppConfig::default();
        cfg.server.diagnostics_dir = Some(PathBuf::from("diag"));
        assert_eq!(cfg.comm_settings().diagnostics_dir, Some(PathBuf::from("diag")));

        cfg.comm.diagnostics_dir = Some(PathBuf::from("comm"));
        assert_eq!(cfg.comm_settings().diagnostics_dir, Some(PathBuf::from("comm")));
    }

    #[test]
    fn test_tick_period_falls_back_on_zero_fps() {
        let mut cfg = AppConfig::default();
        cfg.server.fps = 0.0;
        assert_eq!(cfg.tick_period(), Duration::from_secs_f64(1.0 / 30.0));
    }

    #[test]
    fn test_tick_period_rejects_non_finite_fps() {
        // Arrange
        let mut cfg = AppConfig::default();
        let fallback = Duration::from_secs_f64(1.0 / default_fps());

        for fps in [f64::INFINITY, f64::NAN, f64::NEG_INFINITY] {
            // Act
            cfg.server.fps = fps;

            // Assert
            assert_eq!(cfg.tick_period(), fallback, "fps {fps}");
        }
    }

    #[test]
    fn test_tick_period_clamps_extreme_rates() {
        // Arrange
        let mut cfg = AppConfig::default();

        // Act / Assert – tiny rates stop at an hour, huge ones at a millisecond
        cfg.server.fps = 1e-300;
        assert_eq!(cfg.tick_period(), Duration::from_secs(3600));
        cfg.server.fps = f64::MAX;
        assert_eq!(cfg.tick_period(), Duration::from_millis(1));
    }
}
