//! The Hopskotch to Rubin Kafka relay.
//!
//! [`HopProducer`] reads a SCiMMA topic and produces every message, as an
//! Avro heartbeat record, to the Rubin cluster.
//!
//! ```rust,ignore
//! let factory = Arc::new(KafkaProducerFactory::new(kafka_config)?);
//! let opener = Arc::new(HopStream::new(AuthChoice::Current));
//! let mut producer = HopProducer::new(factory, opener, HopProducerConfig::default()).await?;
//! let finished_cleanly = producer.run().await?;
//! ```

use std::future::Future;
use std::sync::Arc;

use hop_client_core::{
    make_avro_schema_heartbeat, ServiceHandle, ServiceState, HEARTBEAT_TOPIC_NAME,
};
use hop_client_kafka::{AvroSink, HopSource, ProducerFactory, SourceOpener, StartPosition};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{Error, Result};

/// Hopskotch production host.
pub const DEFAULT_SCIMMA_HOSTNAME: &str = "kafka.scimma.org";

/// Hopskotch system heartbeat topic.
pub const DEFAULT_HOP_TOPIC: &str = "sys.heartbeat";

/// Settings for a [`HopProducer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HopProducerConfig {
    /// Hopskotch host to subscribe to (`dev.hop.scimma.org` for development)
    pub scimma_hostname: String,
    /// Hopskotch topic to read
    pub topic: String,
    /// Where the subscription starts
    pub start_position: StartPosition,
}

impl Default for HopProducerConfig {
    fn default() -> Self {
        Self {
            scimma_hostname: DEFAULT_SCIMMA_HOSTNAME.to_string(),
            topic: DEFAULT_HOP_TOPIC.to_string(),
            start_position: StartPosition::Latest,
        }
    }
}

impl HopProducerConfig {
    /// `kafka://` URL of the topic to read.
    pub fn stream_url(&self) -> String {
        format!("kafka://{}/{}", self.scimma_hostname, self.topic)
    }
}

/// Outcome of the read loop: `Some(Ok(true))` when the stream ended,
/// `Some(Ok(false))` when it never ran or was cancelled, `None` while running.
type DoneState = Option<std::result::Result<bool, String>>;

/// Produce Kafka messages from SCiMMA Hopskotch topics.
pub struct HopProducer {
    factory: Arc<dyn ProducerFactory>,
    opener: Arc<dyn SourceOpener>,
    config: HopProducerConfig,
    avro_schema: Value,
    service: ServiceHandle,
    sink: Option<Arc<dyn AvroSink>>,
    read_task: Option<JoinHandle<()>>,
    done: Arc<watch::Sender<DoneState>>,
}

impl HopProducer {
    /// Create the relay and make sure the destination topic exists.
    pub async fn new(
        factory: Arc<dyn ProducerFactory>,
        opener: Arc<dyn SourceOpener>,
        config: HopProducerConfig,
    ) -> Result<Self> {
        factory
            .make_kafka_topics(&[HEARTBEAT_TOPIC_NAME.to_string()])
            .await?;

        let (done, _rx) = watch::channel(Some(Ok(false)));
        Ok(Self {
            factory,
            opener,
            config,
            avro_schema: make_avro_schema_heartbeat(),
            service: ServiceHandle::new("hop-producer"),
            sink: None,
            read_task: None,
            done: Arc::new(done),
        })
    }

    /// Start offset that replays everything retained on the topic.
    pub fn earliest_offset() -> StartPosition {
        StartPosition::Earliest
    }

    /// Start offset that only sees new messages.
    pub fn latest_offset() -> StartPosition {
        StartPosition::Latest
    }

    /// Avro schema the records are produced with.
    pub fn avro_schema(&self) -> &Value {
        &self.avro_schema
    }

    /// Relay settings.
    pub fn config(&self) -> &HopProducerConfig {
        &self.config
    }

    /// Lifecycle handle; clones observe the same state.
    pub fn service(&self) -> &ServiceHandle {
        &self.service
    }

    /// Make the Avro producer, open the Hopskotch stream and start relaying.
    pub async fn start(&mut self) -> Result<()> {
        if self.sink.is_some() {
            return Err(Error::AlreadyStarted);
        }

        self.service.set_state(ServiceState::Starting);
        match self.open().await {
            Ok((sink, source)) => {
                self.done.send_replace(None);
                // The read loop may finish at once; its final state must win.
                self.service.set_state(ServiceState::Ready);
                let task = tokio::spawn(read_topic(
                    source,
                    Arc::clone(&sink),
                    Arc::clone(&self.done),
                    self.service.clone(),
                ));
                self.sink = Some(sink);
                self.read_task = Some(task);
                Ok(())
            }
            Err(err) => {
                self.service.set_state(ServiceState::Failed(err.to_string()));
                Err(err)
            }
        }
    }

    async fn open(&self) -> Result<(Arc<dyn AvroSink>, Box<dyn HopSource>)> {
        let sink: Arc<dyn AvroSink> = Arc::from(
            self.factory
                .make_producer(HEARTBEAT_TOPIC_NAME, &self.avro_schema)
                .await?,
        );
        let source = self
            .opener
            .open_source(&self.config.stream_url(), self.config.start_position)?;
        Ok((sink, source))
    }

    /// Stop the read loop and release the producer.
    ///
    /// If the loop had not finished, `done` resolves to `Ok(false)`.
    pub async fn close(&mut self) {
        if let Some(task) = self.read_task.take() {
            if !task.is_finished() {
                tracing::info!("Read topic task still running, cancelling.");
                self.service.set_state(ServiceState::Stopping);
                task.abort();
            }
            match task.await {
                Ok(()) => {}
                Err(err) if err.is_cancelled() => {}
                Err(err) => {
                    tracing::error!(
                        error = %err,
                        "Unexpected error cancelling read topic task. Ignoring."
                    );
                }
            }
        }

        if self.done.borrow().is_none() {
            tracing::warn!("Done task not set.");
            self.done.send_replace(Some(Ok(false)));
        }
        if !self.service.state().is_terminal() {
            self.service.set_state(ServiceState::Stopped);
        }
        self.sink = None;
    }

    /// Wait for the read loop to finish.
    ///
    /// Returns `true` when the stream ended, `false` if the relay never ran
    /// or was closed first.
    pub async fn done(&self) -> Result<bool> {
        let mut rx = self.done.subscribe();
        let state = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| Error::ReadTopic {
                message: "done channel closed".to_string(),
            })?
            .clone();

        match state {
            Some(Ok(clean)) => Ok(clean),
            Some(Err(message)) => Err(Error::ReadTopic { message }),
            None => Ok(false),
        }
    }

    /// Start, wait until done, and close.
    pub async fn run(&mut self) -> Result<bool> {
        self.run_until(std::future::pending()).await
    }

    /// Start, wait until done or `shutdown` completes, and close.
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<bool>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;
        let outcome = tokio::select! {
            outcome = self.done() => outcome,
            () = shutdown => {
                tracing::info!("Shutdown requested");
                Ok(false)
            }
        };
        self.close().await;
        outcome
    }
}

impl std::fmt::Debug for HopProducer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HopProducer")
            .field("config", &self.config)
            .field("service", &self.service)
            .field("started", &self.sink.is_some())
            .finish()
    }
}

async fn read_topic(
    mut source: Box<dyn HopSource>,
    sink: Arc<dyn AvroSink>,
    done: Arc<watch::Sender<DoneState>>,
    service: ServiceHandle,
) {
    match relay(source.as_mut(), sink.as_ref()).await {
        Ok(sent) => {
            tracing::info!(sent, "Exiting read topic loop, setting done task.");
            service.set_state(ServiceState::Stopped);
            done.send_replace(Some(Ok(true)));
        }
        Err(err) => {
            tracing::error!(error = %err, "Error reading/sending scimma topic.");
            service.set_state(ServiceState::Failed(err.to_string()));
            done.send_replace(Some(Err(err.to_string())));
        }
    }
}

async fn relay(source: &mut dyn HopSource, sink: &dyn AvroSink) -> Result<u64> {
    let mut sent = 0;
    loop {
        let message = match source.next_message().await {
            Ok(Some(message)) => message,
            Ok(None) => return Ok(sent),
            Err(err) if err.is_malformed_message() => {
                tracing::warn!(error = %err, "Skipping undecodable message");
                continue;
            }
            Err(err) => return Err(err.into()),
        };

        tracing::debug!(content = ?message.content, format = ?message.format, "Sending message");
        sink.send_and_wait(HEARTBEAT_TOPIC_NAME, &message.content).await?;
        sent += 1;
    }
}
