//! TOML configuration file for the relay.
//!
//! ```toml
//! [kafka]
//! broker_url = "my.kafka:9092"
//! registry_url = "https://registry.my.kafka/"
//! partitions = 1
//! replication_factor = 3
//! wait_for_ack = "1"
//!
//! [hop]
//! scimma_hostname = "kafka.scimma.org"
//! topic = "sys.heartbeat"
//! start_at = "latest"
//!
//! [logging]
//! level = 20
//! ```
//!
//! Every key is optional; command-line flags override the file.

use std::path::{Path, PathBuf};

use hop_client_kafka::{StartPosition, WaitForAck};
use serde::{Deserialize, Serialize};

use crate::producer::{DEFAULT_HOP_TOPIC, DEFAULT_SCIMMA_HOSTNAME};
use crate::{Error, Result};

/// Directory name used under the platform config directory.
pub const PROJECT_NAME: &str = "ts-hop-client";

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "HOP_CLIENT_CONFIG";

/// Python-style INFO level.
pub const DEFAULT_LOG_LEVEL: u8 = 20;

/// Whole configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HopClientConfig {
    /// Rubin Kafka cluster
    pub kafka: KafkaSection,
    /// SCiMMA Hopskotch side
    pub hop: HopSection,
    /// Logging
    pub logging: LoggingSection,
}

/// `[kafka]` section.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaSection {
    /// Broker address without transport
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_url: Option<String>,
    /// SASL username
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// SASL password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Schema Registry URL including transport
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_url: Option<String>,
    /// Partitions per created topic
    pub partitions: i32,
    /// Replicas per partition
    pub replication_factor: i32,
    /// Producer acknowledgements
    pub wait_for_ack: WaitForAck,
}

impl Default for KafkaSection {
    fn default() -> Self {
        Self {
            broker_url: None,
            username: None,
            password: None,
            registry_url: None,
            partitions: 1,
            replication_factor: 3,
            wait_for_ack: WaitForAck::One,
        }
    }
}

impl std::fmt::Debug for KafkaSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KafkaSection")
            .field("broker_url", &self.broker_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("registry_url", &self.registry_url)
            .field("partitions", &self.partitions)
            .field("replication_factor", &self.replication_factor)
            .field("wait_for_ack", &self.wait_for_ack)
            .finish()
    }
}

/// `[hop]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HopSection {
    /// Hopskotch host
    pub scimma_hostname: String,
    /// Hopskotch topic
    pub topic: String,
    /// Subscription start
    pub start_at: StartPosition,
    /// Connect without credentials
    pub no_auth: bool,
    /// hop `auth.toml` to read instead of the default
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_file: Option<PathBuf>,
}

impl Default for HopSection {
    fn default() -> Self {
        Self {
            scimma_hostname: DEFAULT_SCIMMA_HOSTNAME.to_string(),
            topic: DEFAULT_HOP_TOPIC.to_string(),
            start_at: StartPosition::Latest,
            no_auth: false,
            auth_file: None,
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Python-style numeric level
    pub level: u8,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
        }
    }
}

impl HopClientConfig {
    /// `<config dir>/ts-hop-client/config.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(PROJECT_NAME).join("config.toml"))
    }

    /// The explicit path if given, else the default location.
    pub fn resolve_config_path(explicit: Option<&str>) -> Option<PathBuf> {
        match explicit {
            Some(path) => Some(PathBuf::from(path)),
            None => Self::default_config_path(),
        }
    }

    /// Load the configuration.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load(explicit: Option<&str>) -> Result<Self> {
        let Some(path) = Self::resolve_config_path(explicit) else {
            return Ok(Self::default());
        };
        if !path.exists() {
            if explicit.is_some() {
                return Err(Error::config(format!(
                    "Config file {} does not exist",
                    path.display()
                )));
            }
            return Ok(Self::default());
        }
        Self::from_file(&path)
    }

    /// Parse a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io_with_path(e, path))?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse {}: {e}", path.display())))?;
        tracing::debug!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Parse TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(e.to_string()))
    }

    /// Render as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }
}
