//! Daemon settings.
//!
//! Settings are read from an optional JSON file, by default
//! `$XDG_CONFIG_HOME/hyperflow/config.json`.  This is separate from the
//! rule document (`workflows.json`), which the rule editor owns.
//!
//! # Example
//!
//! ```json
//! {
//!   "rules_path": "/home/me/.config/hyperflow/workflows.json",
//!   "poll_interval_ms": 1000,
//!   "reconnect_backoff_ms": 1000,
//!   "control_socket": "/run/user/1000/hyperflow.sock",
//!   "event_socket": null
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolve the config directory (`$XDG_CONFIG_HOME/hyperflow`).
pub fn config_dir() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        format!("{}/.config", home)
    });
    PathBuf::from(base).join("hyperflow")
}

/// Default control socket path (`$XDG_RUNTIME_DIR/hyperflow.sock`).
pub fn default_socket_path() -> PathBuf {
    let runtime = std::env::var("XDG_RUNTIME_DIR").unwrap_or_else(|_| "/tmp".into());
    PathBuf::from(runtime).join("hyperflow.sock")
}

/// Location of the PID file read by the CLI wrapper.
pub fn pid_file_path() -> PathBuf {
    config_dir().join("hyperflow.pid")
}

/// Top-level settings.  Every field is optional; `{}` is a valid file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rule document.  Defaults to `<config dir>/workflows.json`.
    pub rules_path: Option<PathBuf>,
    /// How often the rule document is checked for changes (ms).
    pub poll_interval_ms: u64,
    /// Delay between reconnect attempts to the event socket (ms).
    pub reconnect_backoff_ms: u64,
    /// Control socket.  Defaults to `$XDG_RUNTIME_DIR/hyperflow.sock`.
    pub control_socket: Option<PathBuf>,
    /// Hyprland event socket.  Resolved from the environment on every
    /// connect when unset.
    pub event_socket: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules_path: None,
            poll_interval_ms: 1000,
            reconnect_backoff_ms: 1000,
            control_socket: None,
            event_socket: None,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }

    pub fn rules_path(&self) -> PathBuf {
        self.rules_path
            .clone()
            .unwrap_or_else(|| config_dir().join("workflows.json"))
    }

    pub fn control_socket(&self) -> PathBuf {
        self.control_socket
            .clone()
            .unwrap_or_else(default_socket_path)
    }

    /// Poll interval, never below 10 ms.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(10))
    }

    /// Reconnect backoff, never below 10 ms.
    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms.max(10))
    }
}

/// Error from loading or parsing the settings file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
