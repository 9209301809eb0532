//! Command-line arguments for `relay-client`.
//!
//! ```text
//! relay-client [OPTIONS]
//!
//! Options:
//!   -i, --ip     <HOST>  Server address; repeat once per server
//!   -p, --port   <PORT>  Server port; repeat once per server
//!   -n, --name   <NAME>  Image name; repeat once per server
//!   -r, --repeat <N>     Frames to send, 0 = until Ctrl+C
//!   -f, --fps    <RATE>  Frames per second
//!   -c, --config <FILE>  TOML config file [default: relay-client.toml]
//! ```
//!
//! `-i` and `-p` pair up by position: the second `-p` goes with the second
//! `-i`.  A port without a matching address uses `127.0.0.1`; addresses
//! without any port connect the first address on port 5569.  When either
//! list is given it replaces the `[[peers]]` from the config file.

use std::path::PathBuf;

use clap::Parser;
use relay_comm::{DEFAULT_HOST, DEFAULT_PORT};

use crate::infrastructure::config::{AppConfig, PeerEntry};

/// frame-relay camera client.
#[derive(Debug, Parser)]
#[command(
    name = "relay-client",
    about = "Streams frames to one or more relay display servers",
    version
)]
pub struct Cli {
    /// Server address.  Repeat once per server.
    #[arg(short, long = "ip", value_name = "HOST")]
    pub ips: Vec<String>,

    /// Server port.  Repeat once per server.
    #[arg(short, long = "port", value_name = "PORT")]
    pub ports: Vec<String>,

    /// Image name for the server at the same position.
    #[arg(short, long = "name", value_name = "NAME")]
    pub names: Vec<String>,

    /// Number of frames to send; 0 runs until Ctrl+C.
    #[arg(short, long)]
    pub repeat: Option<u64>,

    /// Frames per second.
    #[arg(short, long)]
    pub fps: Option<f64>,

    /// Path of the TOML config file.  A missing file means defaults.
    #[arg(short, long, default_value = "relay-client.toml", env = "RELAY_CLIENT_CONFIG")]
    pub config: PathBuf,
}

impl Cli {
    /// Folds the command-line overrides into `config`.
    pub fn apply_to(&self, config: &mut AppConfig) {
        if !self.ips.is_empty() || !self.ports.is_empty() {
            config.peers = self.peers();
        }
        if !self.names.is_empty() {
            config.client.names = self.names.clone();
        }
        if let Some(repeat) = self.repeat {
            config.client.repeat_count = repeat;
        }
        if let Some(fps) = self.fps {
            config.client.fps = fps;
        }
    }

    fn peers(&self) -> Vec<PeerEntry> {
        if self.ports.is_empty() {
            let host = self.ips.first().map_or(DEFAULT_HOST, String::as_str);
            return vec![PeerEntry {
                host: host.to_string(),
                port: DEFAULT_PORT.to_string(),
            }];
        }
        self.ports
            .iter()
            .enumerate()
            .map(|(i, port)| PeerEntry {
                host: self.ips.get(i).map_or(DEFAULT_HOST, String::as_str).to_string(),
                port: port.clone(),
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_keep_config_peers() {
        // Arrange
        let cli = Cli::parse_from(["relay-client"]);
        let mut cfg = AppConfig::default();
        cfg.peers.push(PeerEntry {
            host: "10.1.1.1".into(),
            port: "7000".into(),
        });
        let before = cfg.clone();

        // Act
        cli.apply_to(&mut cfg);

        // Assert
        assert_eq!(cfg, before);
        assert_eq!(cli.config, PathBuf::from("relay-client.toml"));
    }

    #[test]
    fn test_repeated_ip_and_port_pair_by_position() {
        // Arrange
        let cli = Cli::parse_from([
            "relay-client",
            "-i",
            "10.0.0.1",
            "-p",
            "5001",
            "-i",
            "10.0.0.2",
            "-p",
            "5002",
            "-p",
            "5003",
        ]);
        let mut cfg = AppConfig::default();

        // Act
        cli.apply_to(&mut cfg);

        // Assert
        let pairs: Vec<(&str, &str)> = cfg
            .peers
            .iter()
            .map(|p| (p.host.as_str(), p.port.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("10.0.0.1", "5001"),
                ("10.0.0.2", "5002"),
                ("127.0.0.1", "5003")
            ]
        );
    }

    #[test]
    fn test_ip_without_port_uses_default_port() {
        let cli = Cli::parse_from(["relay-client", "--ip", "192.168.0.9"]);
        let mut cfg = AppConfig::default();
        cli.apply_to(&mut cfg);
        assert_eq!(
            cfg.peers,
            vec![PeerEntry {
                host: "192.168.0.9".into(),
                port: "5569".into()
            }]
        );
    }

    #[test]
    fn test_scalar_overrides() {
        let cli = Cli::parse_from(["relay-client", "-r", "10", "-f", "15", "-n", "Noise_Gn 3"]);
        let mut cfg = AppConfig::default();
        cli.apply_to(&mut cfg);
        assert_eq!(cfg.client.repeat_count, 10);
        assert_eq!(cfg.client.fps, 15.0);
        assert_eq!(cfg.client.names, vec!["Noise_Gn 3"]);
    }
}
