//! Reading SCiMMA Hopskotch topics.
//!
//! Hopskotch addresses topics with `kafka://host[:port]/topic[,topic...]`
//! URLs. [`HopStream::open`] turns one of those into a [`HopSource`] backed
//! by an rdkafka [`StreamConsumer`].

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{Headers, Message};
use rdkafka::ClientConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::auth::AuthChoice;
use crate::{Error, Result};

/// Port used when a hop URL does not name one.
pub const DEFAULT_KAFKA_PORT: u16 = 9092;

/// Header hop-client uses to tag the message model.
pub const FORMAT_HEADER: &str = "_format";

/// Where a new subscription starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartPosition {
    /// Replay everything retained on the topic, then follow new messages.
    Earliest,
    /// Only messages produced after subscribing.
    #[default]
    Latest,
}

impl StartPosition {
    /// Value of the librdkafka `auto.offset.reset` property.
    pub fn as_offset_reset(&self) -> &'static str {
        match self {
            Self::Earliest => "earliest",
            Self::Latest => "latest",
        }
    }
}

impl fmt::Display for StartPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_offset_reset())
    }
}

impl FromStr for StartPosition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "earliest" => Ok(Self::Earliest),
            "latest" => Ok(Self::Latest),
            other => Err(Error::config(format!(
                "invalid start position '{other}' (expected earliest or latest)"
            ))),
        }
    }
}

/// A parsed `kafka://` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HopUrl {
    /// Broker host name
    pub hostname: String,
    /// Broker port
    pub port: u16,
    /// Topics to subscribe to
    pub topics: Vec<String>,
}

impl HopUrl {
    /// Parse `kafka://host[:port]/topic[,topic...]`.
    pub fn parse(url: &str) -> Result<Self> {
        let rest = url
            .strip_prefix("kafka://")
            .ok_or_else(|| Error::config(format!("'{url}' is not a kafka:// URL")))?;
        let (authority, path) = rest
            .split_once('/')
            .ok_or_else(|| Error::config(format!("'{url}' names no topic")))?;

        let (hostname, port) = match authority.rsplit_once(':') {
            Some((host, port)) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| Error::config(format!("invalid port '{port}' in '{url}'")))?;
                (host, port)
            }
            None => (authority, DEFAULT_KAFKA_PORT),
        };
        if hostname.is_empty() {
            return Err(Error::config(format!("'{url}' names no host")));
        }

        let topics: Vec<String> = path
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .collect();
        if topics.is_empty() {
            return Err(Error::config(format!("'{url}' names no topic")));
        }

        Ok(Self {
            hostname: hostname.to_string(),
            port,
            topics,
        })
    }

    /// `host:port` for `bootstrap.servers`.
    pub fn bootstrap(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

impl fmt::Display for HopUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "kafka://{}:{}/{}",
            self.hostname,
            self.port,
            self.topics.join(",")
        )
    }
}

/// A decoded Hopskotch message.
#[derive(Debug, Clone, PartialEq)]
pub struct HopMessage {
    /// JSON object carried by the message
    pub content: Map<String, Value>,
    /// hop-client message model, when the producer declared one
    pub format: Option<String>,
}

impl HopMessage {
    /// Decode a message payload.
    ///
    /// Accepts a bare JSON object and the older hop-client envelope
    /// `{"format": ..., "content": {...}}`.
    pub fn from_payload(payload: &[u8], format: Option<String>) -> Result<Self> {
        if payload.is_empty() {
            return Err(Error::message("empty payload"));
        }
        let value: Value = serde_json::from_slice(payload)
            .map_err(|e| Error::message(format!("payload is not JSON: {e}")))?;
        let Value::Object(mut object) = value else {
            return Err(Error::message("payload is not a JSON object"));
        };

        if object.len() == 2 && matches!(object.get("content"), Some(Value::Object(_))) {
            if let Some(Value::String(envelope_format)) = object.get("format").cloned() {
                if let Some(Value::Object(content)) = object.remove("content") {
                    return Ok(Self {
                        content,
                        format: format.or(Some(envelope_format)),
                    });
                }
            }
        }

        Ok(Self {
            content: object,
            format,
        })
    }
}

/// A stream of Hopskotch messages.
#[async_trait]
pub trait HopSource: Send {
    /// Next message, or `None` once the stream has ended.
    async fn next_message(&mut self) -> Result<Option<HopMessage>>;
}

/// Opens Hopskotch streams.
pub trait SourceOpener: Send + Sync {
    /// Open `url` for reading from `start`.
    fn open_source(&self, url: &str, start: StartPosition) -> Result<Box<dyn HopSource>>;
}

/// Entry point for opening Kafka-backed Hopskotch streams.
#[derive(Debug, Clone, Default)]
pub struct HopStream {
    auth: AuthChoice,
}

impl HopStream {
    /// Streams that authenticate with `auth`.
    pub fn new(auth: AuthChoice) -> Self {
        Self { auth }
    }

    /// Subscribe to the topics in `url`.
    pub fn open(url: &str, auth: &AuthChoice, start: StartPosition) -> Result<KafkaHopSource> {
        let url = HopUrl::parse(url)?;
        let auth = auth.resolve(&url.hostname)?;

        // Hopskotch ACLs require consumer groups to be prefixed with the user name.
        let prefix = auth.as_ref().map_or("hop", |a| a.username.as_str());
        let group_id = format!("{prefix}-{}", uuid::Uuid::new_v4());

        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", url.bootstrap())
            .set("group.id", &group_id)
            .set("auto.offset.reset", start.as_offset_reset())
            .set("enable.auto.commit", "true");
        if let Some(auth) = &auth {
            auth.apply(&mut config);
        }

        let consumer: StreamConsumer = config.create()?;
        let topics: Vec<&str> = url.topics.iter().map(String::as_str).collect();
        consumer.subscribe(&topics)?;

        tracing::info!(url = %url, group_id = %group_id, start = %start, "Opened hop stream");
        Ok(KafkaHopSource { consumer })
    }
}

impl SourceOpener for HopStream {
    fn open_source(&self, url: &str, start: StartPosition) -> Result<Box<dyn HopSource>> {
        Ok(Box::new(HopStream::open(url, &self.auth, start)?))
    }
}

/// [`HopSource`] reading from an rdkafka consumer. Never ends on its own.
pub struct KafkaHopSource {
    consumer: StreamConsumer,
}

#[async_trait]
impl HopSource for KafkaHopSource {
    async fn next_message(&mut self) -> Result<Option<HopMessage>> {
        let message = self.consumer.recv().await?;
        let format = message.headers().and_then(format_from_headers);
        let payload = message.payload().unwrap_or_default();
        HopMessage::from_payload(payload, format).map(Some)
    }
}

/// Value of the `_format` header, if present and UTF-8.
pub fn format_from_headers<H: Headers>(headers: &H) -> Option<String> {
    headers
        .iter()
        .find(|h| h.key == FORMAT_HEADER)
        .and_then(|h| h.value)
        .and_then(|v| std::str::from_utf8(v).ok())
        .map(str::to_owned)
}
