//! TOML-based configuration for the relay client.
//!
//! ```toml
//! [client]
//! fps = 30.0
//! frame_dir = "frames"
//! names = ["Noise_Gn 60 Fade_Tme 38", "Noise_Gn 20 Fade_Tme 10"]
//! repeat_count = 0
//!
//! [[peers]]
//! host = "10.0.0.5"
//! port = "5569"
//!
//! [[peers]]
//! host = "10.0.0.6"
//! port = "5569"
//! ```
//!
//! Each `[[peers]]` table is one display server.  With no peers the client
//! connects to `127.0.0.1:5569`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use relay_comm::{CommSettings, DEFAULT_HOST, DEFAULT_PORT};
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
    pub client: ClientConfig,
    #[serde(default)]
    pub peers: Vec<PeerEntry>,
    #[serde(default)]
    pub comm: CommSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Frames broadcast per second.
    #[serde(default = "default_fps")]
    pub fps: f64,
    /// Directory of raw frame files.  A synthetic frame is used when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_dir: Option<PathBuf>,
    #[serde(default = "default_frame_width")]
    pub frame_width: usize,
    #[serde(default = "default_frame_height")]
    pub frame_height: usize,
    /// Image name per peer, in peer order.
    #[serde(default)]
    pub names: Vec<String>,
    /// Follow every image with a display request.
    #[serde(default = "default_true")]
    pub send_display_now: bool,
    /// Frames to send before exiting; 0 runs until Ctrl+C.
    #[serde(default)]
    pub repeat_count: u64,
    /// `tracing` filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// One display server to connect to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeerEntry {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

const MIN_TICK_SECS: f64 = 0.001;
const MAX_TICK_SECS: f64 = 3600.0;

fn default_fps() -> f64 {
    30.0
}
fn default_frame_width() -> usize {
    1024
}
fn default_frame_height() -> usize {
    768
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> String {
    DEFAULT_PORT.to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            frame_dir: None,
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
            names: Vec::new(),
            send_display_now: default_true(),
            repeat_count: 0,
            log_level: default_log_level(),
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

    /// Splits the peer table into the parallel host and port lists taken by
    /// `relay_comm::start_clients`.
    pub fn peer_lists(&self) -> (Vec<String>, Vec<String>) {
        self.peers
            .iter()
            .map(|p| (p.host.clone(), p.port.clone()))
            .unzip()
    }

    pub fn frame_len(&self) -> usize {
        self.client.frame_width * self.client.frame_height
    }

    /// Broadcast period.  Rates that are not finite and positive fall back to
    /// the default; the period is clamped to between 1 ms and one hour.
    pub fn tick_period(&self) -> Duration {
        let fps = self.client.fps;
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
    fn test_default_config_has_expected_frame_geometry() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.client.frame_width, 1024);
        assert_eq!(cfg.client.frame_height, 768);
        assert_eq!(cfg.frame_len(), 1024 * 768);
        assert!(cfg.client.send_display_now);
        assert_eq!(cfg.client.repeat_count, 0);
        assert!(cfg.peers.is_empty());
    }

    #[test]
    fn test_peer_tables_parse_with_defaults() {
        // Arrange
        let text = r#"
            [[peers]]
            host = "10.0.0.5"

            [[peers]]
            port = "6000"
        "#;

        // Act
        let cfg: AppConfig = toml::from_str(text).unwrap();

        // Assert
        assert_eq!(
            cfg.peers,
            vec![
                PeerEntry {
                    host: "10.0.0.5".to_string(),
                    port: "5569".to_string()
                },
                PeerEntry {
                    host: "127.0.0.1".to_string(),
                    port: "6000".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_peer_lists_are_parallel() {
        let mut cfg = AppConfig::default();
        cfg.peers = vec![
            PeerEntry {
                host: "a".into(),
                port: "1".into(),
            },
            PeerEntry {
                host: "b".into(),
                port: "2".into(),
            },
        ];
        let (ips, ports) = cfg.peer_lists();
        assert_eq!(ips, vec!["a", "b"]);
        assert_eq!(ports, vec!["1", "2"]);
    }

    #[test]
    fn test_save_then_load_restores_config() {
        // Arrange
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        let mut cfg = AppConfig::default();
        cfg.client.names = vec!["Noise_Gn 5".to_string()];
        cfg.client.frame_dir = Some(PathBuf::from("frames"));
        cfg.peers.push(PeerEntry {
            host: "h".into(),
            port: "9".into(),
        });

        // Act
        cfg.save_to(&path).unwrap();
        let restored = AppConfig::load_from(&path).unwrap();

        // Assert
        assert_eq!(restored, cfg);
    }

    #[test]
    fn test_load_from_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AppConfig::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_tick_period_rejects_non_finite_fps() {
        // Arrange
        let mut cfg = AppConfig::default();
        let fallback = Duration::from_secs_f64(1.0 / default_fps());

        for fps in [f64::INFINITY, f64::NAN, f64::NEG_INFINITY] {
            // Act
            cfg.client.fps = fps;

            // Assert
            assert_eq!(cfg.tick_period(), fallback, "fps {fps}");
        }
    }

    #[test]
    fn test_tick_period_clamps_extreme_rates() {
        // Arrange
        let mut cfg = AppConfig::default();

        // Act / Assert – tiny rates stop at an hour, huge ones at a millisecond
        cfg.client.fps = 1e-300;
        assert_eq!(cfg.tick_period(), Duration::from_secs(3600));
        cfg.client.fps = f64::MAX;
        assert_eq!(cfg.tick_period(), Duration::from_millis(1));
    }
}
