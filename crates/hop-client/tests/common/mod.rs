//! In-memory stand-ins for the Kafka side of the relay.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hop_client::{HopProducer, HopProducerConfig};
use hop_client_core::{parse_schema, to_avro_record};
use hop_client_kafka::{
    AvroSink, Error, HopMessage, HopSource, ProducerFactory, Result, SourceOpener, StartPosition,
};
use serde_json::{json, Map, Value};

/// One scripted step of a fake Hopskotch stream.
#[derive(Debug, Clone)]
pub enum Step {
    /// Deliver a message with this content
    Message(Map<String, Value>),
    /// Deliver a payload that fails to decode
    Malformed,
    /// Fail the stream
    Fatal,
}

/// A message with heartbeat-shaped content.
pub fn heartbeat(count: i64) -> Step {
    Step::Message(content(json!({
        "timestamp": 1_700_000_000 + count,
        "count": count,
        "beat": format!("beat {count}"),
    })))
}

/// Unwrap a JSON object literal.
pub fn content(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

/// Records what the relay sent.
#[derive(Default)]
pub struct SinkLog {
    /// `(topic, content)` in send order
    pub sent: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl SinkLog {
    pub fn sent(&self) -> Vec<(String, Map<String, Value>)> {
        self.sent.lock().unwrap().clone()
    }
}

struct FakeSink {
    schema: apache_avro::Schema,
    log: Arc<SinkLog>,
    fail_after: Option<usize>,
}

#[async_trait]
impl AvroSink for FakeSink {
    async fn send_and_wait(&self, topic: &str, content: &Map<String, Value>) -> Result<()> {
        let mut sent = self.log.sent.lock().unwrap();
        if self.fail_after.is_some_and(|limit| sent.len() >= limit) {
            return Err(Error::kafka("Message production error: QueueFull"));
        }
        to_avro_record(&self.schema, content)?;
        sent.push((topic.to_string(), content.clone()));
        Ok(())
    }
}

/// Producer factory that records calls and hands out [`FakeSink`]s.
#[derive(Default)]
pub struct FakeFactory {
    pub topics: Mutex<Vec<String>>,
    pub registered: Mutex<Vec<(String, Value)>>,
    pub log: Arc<SinkLog>,
    pub fail_after: Option<usize>,
    pub reject_schema: bool,
}

#[async_trait]
impl ProducerFactory for FakeFactory {
    async fn make_kafka_topics(&self, topics: &[String]) -> Result<()> {
        self.topics.lock().unwrap().extend_from_slice(topics);
        Ok(())
    }

    async fn make_producer(&self, topic: &str, avro_schema: &Value) -> Result<Box<dyn AvroSink>> {
        if self.reject_schema {
            return Err(Error::registry(
                Some(422),
                "Schema being registered is incompatible with an earlier schema",
            ));
        }
        self.registered
            .lock()
            .unwrap()
            .push((topic.to_string(), avro_schema.clone()));
        Ok(Box::new(FakeSink {
            schema: parse_schema(avro_schema)?,
            log: Arc::clone(&self.log),
            fail_after: self.fail_after,
        }))
    }
}

struct ScriptedSource {
    steps: std::vec::IntoIter<Step>,
    hold_open: bool,
}

#[async_trait]
impl HopSource for ScriptedSource {
    async fn next_message(&mut self) -> Result<Option<HopMessage>> {
        match self.steps.next() {
            Some(Step::Message(content)) => Ok(Some(HopMessage {
                content,
                format: Some("json".to_string()),
            })),
            Some(Step::Malformed) => HopMessage::from_payload(b"not json", None).map(Some),
            Some(Step::Fatal) => Err(Error::kafka("Broker transport failure")),
            None if self.hold_open => std::future::pending().await,
            None => Ok(None),
        }
    }
}

/// Opens a fresh copy of the same script on every call.
#[derive(Default)]
pub struct FakeOpener {
    pub steps: Vec<Step>,
    pub hold_open: bool,
    pub opened: Mutex<Vec<(String, StartPosition)>>,
}

impl FakeOpener {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Keep the stream open once the script runs out.
    pub fn held_open(mut self) -> Self {
        self.hold_open = true;
        self
    }
}

impl SourceOpener for FakeOpener {
    fn open_source(&self, url: &str, start: StartPosition) -> Result<Box<dyn HopSource>> {
        self.opened.lock().unwrap().push((url.to_string(), start));
        Ok(Box::new(ScriptedSource {
            steps: self.steps.clone().into_iter(),
            hold_open: self.hold_open,
        }))
    }
}

/// Build a relay over the given fakes.
pub async fn producer(factory: &Arc<FakeFactory>, opener: &Arc<FakeOpener>) -> HopProducer {
    HopProducer::new(
        Arc::clone(factory) as Arc<dyn ProducerFactory>,
        Arc::clone(opener) as Arc<dyn SourceOpener>,
        HopProducerConfig::default(),
    )
    .await
    .expect("relay should build")
}
