//! Daemon connection settings.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where a daemon speaking the `DSD1` frame protocol listens by default.
///
/// The system mDNSResponder socket speaks a different protocol and must
/// not be used here.
pub const DEFAULT_SOCKET_PATH: &str = "/run/dnssd/dsd1.sock";

/// Where the daemon listens and how long to wait for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Unix domain socket the daemon accepts clients on.
    pub socket_path: PathBuf,
    /// Give up connecting after this many milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            connect_timeout_ms: 5000,
        }
    }
}

impl ClientConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
