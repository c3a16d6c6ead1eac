//! Configuration vault – reads/writes `~/.velolink/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Persisted user configuration stored in `~/.velolink/config.toml`.
///
/// Defaults match the reference deployment: telemetry out to
/// `127.0.0.1:7000`, commands in on `127.0.0.1:7001`, one sample every
/// 100 ms.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// IP the telemetry sender dials to reach the balancer.
    #[serde(default = "default_send_ip")]
    pub send_ip: String,

    /// Port the telemetry sender dials.
    #[serde(default = "default_send_port")]
    pub send_port: u16,

    /// IP the command receiver listens on.
    #[serde(default = "default_receive_ip")]
    pub receive_ip: String,

    /// Port the command receiver listens on.
    #[serde(default = "default_receive_port")]
    pub receive_port: u16,

    /// Simulation tick period in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

fn default_send_ip() -> String {
    "127.0.0.1".to_string()
}
fn default_send_port() -> u16 {
    7000
}
fn default_receive_ip() -> String {
    "127.0.0.1".to_string()
}
fn default_receive_port() -> u16 {
    7001
}
fn default_tick_ms() -> u64 {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            send_ip: default_send_ip(),
            send_port: default_send_port(),
            receive_ip: default_receive_ip(),
            receive_port: default_receive_port(),
            tick_ms: default_tick_ms(),
        }
    }
}

impl Config {
    /// The balancer address as a socket address.
    pub fn send_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.send_ip, self.send_port)
            .parse()
            .map_err(|e| format!("invalid send address: {e}"))
    }

    /// The command-listener address as a socket address.
    pub fn receive_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.receive_ip, self.receive_port)
            .parse()
            .map_err(|e| format!("invalid receive address: {e}"))
    }
}

/// Return the path to `~/.velolink/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
/// Extracted for testability without mutating environment variables.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".velolink").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &PathBuf) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `VELOLINK_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `VELOLINK_SEND_IP` | `send_ip` |
/// | `VELOLINK_SEND_PORT` | `send_port` |
/// | `VELOLINK_RECEIVE_IP` | `receive_ip` |
/// | `VELOLINK_RECEIVE_PORT` | `receive_port` |
/// | `VELOLINK_TICK_MS` | `tick_ms` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("VELOLINK_SEND_IP") {
        cfg.send_ip = v;
    }
    if let Ok(v) = std::env::var("VELOLINK_SEND_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.send_port = port;
    }
    if let Ok(v) = std::env::var("VELOLINK_RECEIVE_IP") {
        cfg.receive_ip = v;
    }
    if let Ok(v) = std::env::var("VELOLINK_RECEIVE_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.receive_port = port;
    }
    if let Ok(v) = std::env::var("VELOLINK_TICK_MS")
        && let Ok(ms) = v.parse::<u64>()
    {
        cfg.tick_ms = ms;
    }
}

/// Save the config to disk, creating `~/.velolink/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &PathBuf) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    fs::write(path, raw).map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}
