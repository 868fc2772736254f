//! Server configuration.
//!
//! Loaded from a TOML file where every field has a default, then overridden
//! by `VPN_DASH_*` environment variables, then by CLI flags.
//!
//! ```rust
//! use vpn_dash::config::AppConfig;
//!
//! let config: AppConfig = toml::from_str("[probe]\ntimeout_secs = 10\n").unwrap();
//! assert_eq!(config.probe.timeout_secs, 10);
//! assert_eq!(config.services.wireguard_interface, "wg0");
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::Service;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for '{field}': {message}")]
    Validation { field: String, message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub probe: ProbeConfig,
    pub services: ServiceUnits,
    pub paths: PathsConfig,
    pub performance: PerformanceConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Directory of static dashboard assets served for unmatched paths.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:5000".to_string(),
            static_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Per-command timeout.
    pub timeout_secs: u64,
    /// Upper bound for the `lines` parameter of `/logs`.
    pub max_log_lines: usize,
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_log_lines: 1000,
        }
    }
}

/// systemd unit names of the monitored services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceUnits {
    pub wireguard: String,
    pub openvpn: String,
    pub haproxy: String,
    pub fail2ban: String,
    /// Interface passed to `wg show`.
    pub wireguard_interface: String,
}

impl ServiceUnits {
    pub fn unit(&self, service: Service) -> &str {
        match service {
            Service::WireGuard => &self.wireguard,
            Service::OpenVpn => &self.openvpn,
            Service::HaProxy => &self.haproxy,
            Service::Fail2ban => &self.fail2ban,
        }
    }
}

impl Default for ServiceUnits {
    fn default() -> Self {
        Self {
            wireguard: "wg-quick@wg0".to_string(),
            openvpn: "openvpn@server".to_string(),
            haproxy: "haproxy".to_string(),
            fail2ban: "fail2ban".to_string(),
            wireguard_interface: "wg0".to_string(),
        }
    }
}

/// Host files and directories read by the probes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub openvpn_status_log: PathBuf,
    pub openvpn_log: PathBuf,
    pub security_log: PathBuf,
    pub auth_log: PathBuf,
    pub proc_net_dev: PathBuf,
    pub backup_sources: Vec<PathBuf>,
    pub backup_staging_root: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            openvpn_status_log: PathBuf::from("/etc/openvpn/openvpn-status.log"),
            openvpn_log: PathBuf::from("/var/log/openvpn.log"),
            security_log: PathBuf::from("/var/log/vpn-security.log"),
            auth_log: PathBuf::from("/var/log/auth.log"),
            proc_net_dev: PathBuf::from("/proc/net/dev"),
            backup_sources: vec![
                PathBuf::from("/etc/wireguard"),
                PathBuf::from("/etc/openvpn"),
            ],
            backup_staging_root: PathBuf::from("/tmp"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Interfaces reported from `/proc/net/dev`.
    pub interfaces: Vec<String>,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            interfaces: vec!["wg0".to_string(), "tun0".to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `vpn_dash=debug,tower_http=info`.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file; `None` yields defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                let content = std::fs::read_to_string(p)?;
                toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Self::default()),
        }
    }

    /// Apply `VPN_DASH_*` overrides. Unparseable values are ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(bind) = std::env::var("VPN_DASH_BIND") {
            self.server.bind = bind;
        }
        if let Ok(level) = std::env::var("VPN_DASH_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(format) = std::env::var("VPN_DASH_LOG_FORMAT") {
            if let Ok(f) = format.parse() {
                self.logging.format = f;
            }
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.probe.timeout_secs == 0 {
            return Err(ConfigError::Validation {
                field: "probe.timeout_secs".to_string(),
                message: "timeout must be non-zero".to_string(),
            });
        }
        if self.probe.max_log_lines == 0 {
            return Err(ConfigError::Validation {
                field: "probe.max_log_lines".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        for service in Service::ALL {
            if self.services.unit(service).trim().is_empty() {
                return Err(ConfigError::Validation {
                    field: format!("services.{}", unit_field(service)),
                    message: "unit name cannot be empty".to_string(),
                });
            }
        }
        if self.services.wireguard_interface.trim().is_empty() {
            return Err(ConfigError::Validation {
                field: "services.wireguard_interface".to_string(),
                message: "interface name cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn unit_field(service: Service) -> &'static str {
    match service {
        Service::WireGuard => "wireguard",
        Service::OpenVpn => "openvpn",
        Service::HaProxy => "haproxy",
        Service::Fail2ban => "fail2ban",
    }
}
