//! Messages flowing from the Hopskotch source to the Avro sink.

use std::sync::Arc;

use hop_client::Error;
use hop_client_core::{make_avro_schema_heartbeat, ServiceState, HEARTBEAT_TOPIC_NAME};
use hop_client_kafka::StartPosition;
use serde_json::json;

use crate::common::{content, heartbeat, producer, FakeFactory, FakeOpener, Step};

#[tokio::test]
async fn test_new_creates_heartbeat_topic() {
    let factory = Arc::new(FakeFactory::default());
    let opener = Arc::new(FakeOpener::default());

    let relay = producer(&factory, &opener).await;

    assert_eq!(*factory.topics.lock().unwrap(), vec![HEARTBEAT_TOPIC_NAME]);
    assert_eq!(relay.avro_schema(), &make_avro_schema_heartbeat());
    assert!(factory.registered.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_run_relays_every_message_in_order() {
    let factory = Arc::new(FakeFactory::default());
    let opener = Arc::new(FakeOpener::new(vec![heartbeat(1), heartbeat(2), heartbeat(3)]));
    let mut relay = producer(&factory, &opener).await;

    let clean = relay.run().await.expect("relay should finish");

    assert!(clean);
    let sent = factory.log.sent();
    assert_eq!(sent.len(), 3);
    for (index, (topic, message)) in sent.iter().enumerate() {
        assert_eq!(topic, HEARTBEAT_TOPIC_NAME);
        assert_eq!(message["count"], json!(index as i64 + 1));
    }
    assert_eq!(relay.service().state(), ServiceState::Stopped);
}

#[tokio::test]
async fn test_run_registers_heartbeat_schema() {
    let factory = Arc::new(FakeFactory::default());
    let opener = Arc::new(FakeOpener::new(vec![heartbeat(1)]));
    let mut relay = producer(&factory, &opener).await;

    relay.run().await.unwrap();

    let registered = factory.registered.lock().unwrap();
    assert_eq!(registered.len(), 1);
    assert_eq!(registered[0].0, HEARTBEAT_TOPIC_NAME);
    assert_eq!(registered[0].1, make_avro_schema_heartbeat());
}

#[tokio::test]
async fn test_opens_configured_stream() {
    let factory = Arc::new(FakeFactory::default());
    let opener = Arc::new(FakeOpener::default());
    let mut relay = producer(&factory, &opener).await;

    relay.run().await.unwrap();

    assert_eq!(
        *opener.opened.lock().unwrap(),
        vec![(
            "kafka://kafka.scimma.org/sys.heartbeat".to_string(),
            StartPosition::Latest
        )]
    );
}

#[tokio::test]
async fn test_content_without_heartbeat_fields_uses_defaults() {
    let factory = Arc::new(FakeFactory::default());
    let opener = Arc::new(FakeOpener::new(vec![Step::Message(content(json!({
        "alert": "GCN notice",
        "count": 7,
    })))]));
    let mut relay = producer(&factory, &opener).await;

    assert!(relay.run().await.unwrap());
    assert_eq!(factory.log.sent().len(), 1);
}

#[tokio::test]
async fn test_malformed_messages_are_skipped() {
    let factory = Arc::new(FakeFactory::default());
    let opener = Arc::new(FakeOpener::new(vec![
        heartbeat(1),
        Step::Malformed,
        heartbeat(2),
    ]));
    let mut relay = producer(&factory, &opener).await;

    assert!(relay.run().await.unwrap());
    let counts: Vec<_> = factory
        .log
        .sent()
        .into_iter()
        .map(|(_, message)| message["count"].clone())
        .collect();
    assert_eq!(counts, vec![json!(1), json!(2)]);
}

#[tokio::test]
async fn test_source_failure_stops_relay() {
    let factory = Arc::new(FakeFactory::default());
    let opener = Arc::new(FakeOpener::new(vec![heartbeat(1), Step::Fatal, heartbeat(2)]));
    let mut relay = producer(&factory, &opener).await;

    let err = relay.run().await.unwrap_err();

    assert!(matches!(err, Error::ReadTopic { .. }));
    assert!(err.to_string().contains("Broker transport failure"));
    assert_eq!(factory.log.sent().len(), 1);
    assert!(matches!(relay.service().state(), ServiceState::Failed(_)));
}

#[tokio::test]
async fn test_send_failure_stops_relay() {
    let factory = Arc::new(FakeFactory {
        fail_after: Some(1),
        ..FakeFactory::default()
    });
    let opener = Arc::new(FakeOpener::new(vec![heartbeat(1), heartbeat(2), heartbeat(3)]));
    let mut relay = producer(&factory, &opener).await;

    let err = relay.run().await.unwrap_err();

    assert!(err.to_string().contains("QueueFull"));
    assert_eq!(factory.log.sent().len(), 1);
}

#[tokio::test]
async fn test_mistyped_content_stops_relay() {
    let factory = Arc::new(FakeFactory::default());
    let opener = Arc::new(FakeOpener::new(vec![Step::Message(content(json!({
        "count": "three",
    })))]));
    let mut relay = producer(&factory, &opener).await;

    assert!(relay.run().await.is_err());
    assert!(factory.log.sent().is_empty());
}
