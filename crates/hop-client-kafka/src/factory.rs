//! Topic creation and Avro producers for the Rubin cluster.
//!
//! [`ProducerFactory`] and [`AvroSink`] are the seams the relay talks to;
//! [`KafkaProducerFactory`] is the rdkafka-backed implementation.

use std::time::Duration;

use apache_avro::Schema;
use async_trait::async_trait;
use backon::ExponentialBuilder;
use hop_client_core::{encode_confluent, parse_schema, to_avro_record};
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::client::DefaultClientContext;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::types::RDKafkaErrorCode;
use rdkafka::util::Timeout;
use serde_json::{Map, Value};

use crate::config::KafkaConfiguration;
use crate::registry::{default_retry_policy, subject_for_topic, SchemaRegistryClient};
use crate::{Error, Result};

/// How long a produce call may wait for queue space and acknowledgement.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(30);

/// Something that accepts JSON content and delivers it as an Avro record.
#[async_trait]
pub trait AvroSink: Send + Sync {
    /// Encode `content` and send it to `topic`, waiting for delivery.
    async fn send_and_wait(&self, topic: &str, content: &Map<String, Value>) -> Result<()>;
}

/// Creates topics and Avro producers.
#[async_trait]
pub trait ProducerFactory: Send + Sync {
    /// Create `topics`; topics that already exist are left alone.
    async fn make_kafka_topics(&self, topics: &[String]) -> Result<()>;

    /// Register `avro_schema` for `topic` and return a sink that encodes with it.
    async fn make_producer(&self, topic: &str, avro_schema: &Value) -> Result<Box<dyn AvroSink>>;
}

/// rdkafka + Schema Registry implementation of [`ProducerFactory`].
#[derive(Debug)]
pub struct KafkaProducerFactory {
    config: KafkaConfiguration,
    registry: SchemaRegistryClient,
    registry_retry: ExponentialBuilder,
    send_timeout: Duration,
}

impl KafkaProducerFactory {
    /// Create a factory after validating `config`.
    pub fn new(config: KafkaConfiguration) -> Result<Self> {
        config.validate()?;
        let registry = SchemaRegistryClient::new(config.registry_url.clone());
        Ok(Self {
            config,
            registry,
            registry_retry: default_retry_policy(),
            send_timeout: DEFAULT_SEND_TIMEOUT,
        })
    }

    /// Override the backoff used when registering schemas.
    pub fn with_registry_retry(mut self, policy: ExponentialBuilder) -> Self {
        self.registry_retry = policy;
        self
    }

    /// Override the produce timeout.
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// The validated configuration.
    pub fn config(&self) -> &KafkaConfiguration {
        &self.config
    }
}

#[async_trait]
impl ProducerFactory for KafkaProducerFactory {
    async fn make_kafka_topics(&self, topics: &[String]) -> Result<()> {
        let admin: AdminClient<DefaultClientContext> = self.config.client_config().create()?;
        let new_topics: Vec<NewTopic<'_>> = topics
            .iter()
            .map(|topic| {
                NewTopic::new(
                    topic,
                    self.config.partitions,
                    TopicReplication::Fixed(self.config.replication_factor),
                )
            })
            .collect();

        let results = admin
            .create_topics(&new_topics, &AdminOptions::new())
            .await?;

        for result in results {
            match result {
                Ok(topic) => tracing::info!(topic = %topic, "Created Kafka topic"),
                Err((topic, RDKafkaErrorCode::TopicAlreadyExists)) => {
                    tracing::debug!(topic = %topic, "Kafka topic already exists")
                }
                Err((topic, code)) => {
                    return Err(Error::kafka(format!(
                        "could not create topic '{topic}': {code}"
                    )));
                }
            }
        }
        Ok(())
    }

    async fn make_producer(&self, topic: &str, avro_schema: &Value) -> Result<Box<dyn AvroSink>> {
        let schema = parse_schema(avro_schema)?;
        let schema_id = self
            .registry
            .register_with_retry(&subject_for_topic(topic), avro_schema, self.registry_retry)
            .await?;
        let producer: FutureProducer = self.config.producer_config().create()?;

        Ok(Box::new(KafkaAvroSink {
            producer,
            schema,
            schema_id,
            send_timeout: self.send_timeout,
        }))
    }
}

/// Produces Confluent-framed Avro records with an rdkafka [`FutureProducer`].
pub struct KafkaAvroSink {
    producer: FutureProducer,
    schema: Schema,
    schema_id: u32,
    send_timeout: Duration,
}

impl KafkaAvroSink {
    /// Registry id the records are framed with.
    pub fn schema_id(&self) -> u32 {
        self.schema_id
    }
}

#[async_trait]
impl AvroSink for KafkaAvroSink {
    async fn send_and_wait(&self, topic: &str, content: &Map<String, Value>) -> Result<()> {
        let record = to_avro_record(&self.schema, content)?;
        let payload = encode_confluent(self.schema_id, &self.schema, record)?;

        let delivery = self
            .producer
            .send(
                FutureRecord::<(), Vec<u8>>::to(topic).payload(&payload),
                Timeout::After(self.send_timeout),
            )
            .await;

        match delivery {
            Ok(_) => Ok(()),
            Err((err, _message)) => Err(err.into()),
        }
    }
}
