//! Command-line arguments for `relay-server`.
//!
//! ```text
//! relay-server [OPTIONS]
//!
//! Options:
//!   -p, --port   <PORT>  TCP port to listen on [default: 5569]
//!   -c, --config <FILE>  TOML config file [default: relay-server.toml]
//! ```
//!
//! Values given on the command line override the config file.

use std::path::PathBuf;

use clap::Parser;

use crate::infrastructure::config::AppConfig;

/// frame-relay display server.
#[derive(Debug, Parser)]
#[command(
    name = "relay-server",
    about = "Receives frames from relay clients and routes them to a renderer",
    version
)]
pub struct Cli {
    /// TCP port to listen on.  Overrides `[server] port`.
    #[arg(short, long, env = "RELAY_SERVER_PORT")]
    pub port: Option<String>,

    /// Path of the TOML config file.  A missing file means defaults.
    #[arg(short, long, default_value = "relay-server.toml", env = "RELAY_SERVER_CONFIG")]
    pub config: PathBuf,

    /// Display loop rate.  Overrides `[server] fps`.
    #[arg(short, long)]
    pub fps: Option<f64>,
}

impl Cli {
    /// Folds the command-line overrides into `config`.
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(port) = &self.port {
            config.server.port = port.clone();
        }
        if let Some(fps) = self.fps {
            config.server.fps = fps;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_leave_config_untouched() {
        // Arrange
        let cli = Cli::parse_from(["relay-server"]);
        let mut cfg = AppConfig::default();

        // Act
        cli.apply_to(&mut cfg);

        // Assert
        assert_eq!(cli.config, PathBuf::from("relay-server.toml"));
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_cli_short_port_overrides_config() {
        let cli = Cli::parse_from(["relay-server", "-p", "6001"]);
        let mut cfg = AppConfig::default();
        cli.apply_to(&mut cfg);
        assert_eq!(cfg.server.port, "6001");
    }

    #[test]
    fn test_cli_long_options() {
        let cli = Cli::parse_from([
            "relay-server",
            "--port",
            "7000",
            "--config",
            "/etc/relay.toml",
            "--fps",
            "60",
        ]);
        assert_eq!(cli.port.as_deref(), Some("7000"));
        assert_eq!(cli.config, PathBuf::from("/etc/relay.toml"));
        assert_eq!(cli.fps, Some(60.0));
    }

    #[test]
    fn test_cli_rejects_second_port() {
        let result = Cli::try_parse_from(["relay-server", "-p", "1", "-p", "2"]);
        assert!(result.is_err());
    }
}
