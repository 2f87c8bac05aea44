//! Connection settings loaded from a YAML file.
//!
//! ```yaml
//! slave: 1
//! tcp:
//!   host: boiler.local
//!   port: 502
//! serial:
//!   device: /dev/ttyUSB0
//! timeout: 1s
//! cache_ttl: 10s
//! ```
//!
//! When both `tcp` and `serial` are present TCP is used.

use crate::{cache, protocol as proto};
use serde::{Deserialize, Serialize};
use std::{fs::File, path::Path, time::Duration};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Neither a TCP nor a serial connection is configured")]
    MissingConnection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TcpConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SerialConfig {
    pub device: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BoilerConfig {
    #[serde(default = "default_slave")]
    pub slave: u8,
    #[serde(default)]
    pub tcp: Option<TcpConfig>,
    #[serde(default)]
    pub serial: Option<SerialConfig>,
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_cache_ttl", with = "humantime_serde")]
    pub cache_ttl: Duration,
}

fn default_port() -> u16 {
    proto::DEFAULT_TCP_PORT
}

fn default_slave() -> u8 {
    proto::DEFAULT_SLAVE
}

fn default_timeout() -> Duration {
    Duration::from_secs(1)
}

fn default_cache_ttl() -> Duration {
    cache::DEFAULT_TTL
}

/// The transport selected by a [`BoilerConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connection<'a> {
    Tcp { host: &'a str, port: u16 },
    Serial { device: &'a str },
}

impl BoilerConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        log::debug!("Loading config file from {path:?}");
        let file = File::open(path)?;
        Ok(serde_yaml::from_reader(file)?)
    }

    /// TCP takes precedence over serial.
    pub fn connection(&self) -> Result<Connection<'_>, ConfigError> {
        match (&self.tcp, &self.serial) {
            (Some(tcp), _) => Ok(Connection::Tcp {
                host: &tcp.host,
                port: tcp.port,
            }),
            (None, Some(serial)) => Ok(Connection::Serial {
                device: &serial.device,
            }),
            (None, None) => Err(ConfigError::MissingConnection),
        }
    }
}
