//! Transport tuning knobs, loadable from the `[comm]` table of an app config.
//!
//! Every field has a serde default, so an empty `[comm]` table (or none at
//! all) yields the values the protocol was designed around:
//!
//! ```toml
//! [comm]
//! poll_timeout_ms = 500
//! send_retry_limit = 100
//! send_retry_delay_us = 10
//! diagnostics_dir = "/tmp/relay"
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommSettings {
    /// Upper bound on any single blocking read or write.
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    /// Extra attempts after a send attempt times out.
    #[serde(default = "default_send_retry_limit")]
    pub send_retry_limit: u32,
    #[serde(default = "default_send_retry_delay_us")]
    pub send_retry_delay_us: u64,
    /// Sleep of the send worker when its queue is empty.
    #[serde(default = "default_send_idle_us")]
    pub send_idle_us: u64,
    /// Sleep of the accept loop when no candidate is waiting.
    #[serde(default = "default_accept_interval_us")]
    pub accept_interval_us: u64,
    /// Per-candidate bound on a client connect attempt.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_receive_buffer_size")]
    pub receive_buffer_size: usize,
    /// Write a receive-cadence snapshot every N display-now messages; 0 disables.
    #[serde(default = "default_stats_dump_every")]
    pub stats_dump_every: u64,
    /// Directory for snapshot files.  No snapshots are written when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostics_dir: Option<PathBuf>,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_poll_timeout_ms() -> u64 {
    500
}
fn default_send_retry_limit() -> u32 {
    100
}
fn default_send_retry_delay_us() -> u64 {
    10
}
fn default_send_idle_us() -> u64 {
    10
}
fn default_accept_interval_us() -> u64 {
    100
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_receive_buffer_size() -> usize {
    16 * 1024
}
fn default_stats_dump_every() -> u64 {
    30
}

impl Default for CommSettings {
    fn default() -> Self {
        Self {
            poll_timeout_ms: default_poll_timeout_ms(),
            send_retry_limit: default_send_retry_limit(),
            send_retry_delay_us: default_send_retry_delay_us(),
            send_idle_us: default_send_idle_us(),
            accept_interval_us: default_accept_interval_us(),
            connect_timeout_ms: default_connect_timeout_ms(),
            receive_buffer_size: default_receive_buffer_size(),
            stats_dump_every: default_stats_dump_every(),
            diagnostics_dir: None,
        }
    }
}

impl CommSettings {
    /// Poll timeout as a `Duration`; zero is raised to 1 ms because a zero
    /// socket timeout means "block forever".
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms.max(1))
    }

    pub fn send_retry_delay(&self) -> Duration {
        Duration::from_micros(self.send_retry_delay_us)
    }

    pub fn send_idle(&self) -> Duration {
        Duration::from_micros(self.send_idle_us)
    }

    pub fn accept_interval(&self) -> Duration {
        Duration::from_micros(self.accept_interval_us)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms.max(1))
    }
}
