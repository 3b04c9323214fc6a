//! Connection and topic settings for the Rubin Kafka cluster.

use std::fmt;
use std::str::FromStr;

use rdkafka::ClientConfig;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How many broker acknowledgements a produce call waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WaitForAck {
    /// Do not wait for any broker (unsafe).
    #[serde(rename = "0")]
    None,
    /// Wait for the partition leader.
    #[default]
    #[serde(rename = "1")]
    One,
    /// Wait for all in-sync replicas.
    #[serde(rename = "all")]
    All,
}

impl WaitForAck {
    /// Value of the librdkafka `acks` property.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "0",
            Self::One => "1",
            Self::All => "all",
        }
    }
}

impl fmt::Display for WaitForAck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaitForAck {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "0" => Ok(Self::None),
            "1" => Ok(Self::One),
            "all" => Ok(Self::All),
            other => Err(Error::config(format!(
                "invalid wait-for-ack value '{other}' (expected 0, 1 or all)"
            ))),
        }
    }
}

/// Settings for producing to the Rubin Kafka cluster.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KafkaConfiguration {
    /// Broker address without transport, e.g. `my.kafka:9000`.
    pub broker_url: String,
    /// SASL username; set together with the password.
    pub sasl_plain_username: Option<String>,
    /// SASL password; set together with the username.
    pub sasl_plain_password: Option<String>,
    /// Schema Registry URL including transport.
    pub registry_url: String,
    /// Partitions for each created topic.
    pub partitions: i32,
    /// Replicas for each partition.
    pub replication_factor: i32,
    /// Producer acknowledgement level.
    pub wait_for_ack: WaitForAck,
}

impl KafkaConfiguration {
    /// Check the settings for consistency.
    pub fn validate(&self) -> Result<()> {
        if self.broker_url.trim().is_empty() {
            return Err(Error::config("broker URL must not be empty"));
        }
        if self.registry_url.trim().is_empty() {
            return Err(Error::config("Schema Registry URL must not be empty"));
        }
        if self.partitions <= 0 {
            return Err(Error::config(format!(
                "partitions={} must be positive",
                self.partitions
            )));
        }
        if self.replication_factor <= 0 {
            return Err(Error::config(format!(
                "replication_factor={} must be positive",
                self.replication_factor
            )));
        }
        match (&self.sasl_plain_username, &self.sasl_plain_password) {
            (Some(_), None) => Err(Error::config(
                "a SASL password is required when a username is set",
            )),
            (None, Some(_)) => Err(Error::config(
                "a SASL username is required when a password is set",
            )),
            _ => Ok(()),
        }
    }

    /// Base client settings shared by the admin client and producers.
    pub fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig::new();
        config.set("bootstrap.servers", &self.broker_url);
        if let (Some(username), Some(password)) =
            (&self.sasl_plain_username, &self.sasl_plain_password)
        {
            config
                .set("security.protocol", "SASL_PLAINTEXT")
                .set("sasl.mechanism", "SCRAM-SHA-512")
                .set("sasl.username", username)
                .set("sasl.password", password);
        }
        config
    }

    /// Producer settings: the base settings plus acknowledgements.
    pub fn producer_config(&self) -> ClientConfig {
        let mut config = self.client_config();
        config.set("acks", self.wait_for_ack.as_str());
        config
    }
}

impl fmt::Debug for KafkaConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KafkaConfiguration")
            .field("broker_url", &self.broker_url)
            .field("sasl_plain_username", &self.sasl_plain_username)
            .field(
                "sasl_plain_password",
                &self.sasl_plain_password.as_ref().map(|_| "<redacted>"),
            )
            .field("registry_url", &self.registry_url)
            .field("partitions", &self.partitions)
            .field("replication_factor", &self.replication_factor)
            .field("wait_for_ack", &self.wait_for_ack)
            .finish()
    }
}
