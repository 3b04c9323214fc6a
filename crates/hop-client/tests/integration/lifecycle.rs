//! Start, close and restart behaviour.

use std::sync::Arc;
use std::time::Duration;

use hop_client::{Error, HopProducer};
use hop_client_core::ServiceState;
use hop_client_kafka::StartPosition;

use crate::common::{heartbeat, producer, FakeFactory, FakeOpener, Step};

#[test]
fn test_offset_helpers() {
    assert_eq!(HopProducer::earliest_offset(), StartPosition::Earliest);
    assert_eq!(HopProducer::latest_offset(), StartPosition::Latest);
}

#[tokio::test]
async fn test_done_before_start_is_false() {
    let factory = Arc::new(FakeFactory::default());
    let opener = Arc::new(FakeOpener::default());
    let relay = producer(&factory, &opener).await;

    assert!(!relay.done().await.unwrap());
}

#[tokio::test]
async fn test_start_twice_fails() {
    let factory = Arc::new(FakeFactory::default());
    let opener = Arc::new(FakeOpener::default().held_open());
    let mut relay = producer(&factory, &opener).await;

    relay.start().await.unwrap();
    assert_eq!(relay.service().state(), ServiceState::Ready);

    let err = relay.start().await.unwrap_err();
    assert!(matches!(err, Error::AlreadyStarted));
    assert_eq!(err.to_string(), "Kafka producer already started.");
    assert_eq!(opener.opened.lock().unwrap().len(), 1);

    relay.close().await;
}

#[tokio::test]
async fn test_done_waits_while_stream_is_open() {
    let factory = Arc::new(FakeFactory::default());
    let opener = Arc::new(FakeOpener::new(vec![heartbeat(1)]).held_open());
    let mut relay = producer(&factory, &opener).await;

    relay.start().await.unwrap();
    let waited = tokio::time::timeout(Duration::from_millis(50), relay.done()).await;
    assert!(waited.is_err(), "done resolved while the stream was open");

    relay.close().await;
}

#[tokio::test]
async fn test_close_cancels_running_relay() {
    let factory = Arc::new(FakeFactory::default());
    let opener = Arc::new(FakeOpener::new(vec![heartbeat(1)]).held_open());
    let mut relay = producer(&factory, &opener).await;

    relay.start().await.unwrap();
    relay.close().await;

    assert!(!relay.done().await.unwrap());
    assert_eq!(relay.service().state(), ServiceState::Stopped);
}

#[tokio::test]
async fn test_close_without_start_is_harmless() {
    let factory = Arc::new(FakeFactory::default());
    let opener = Arc::new(FakeOpener::default());
    let mut relay = producer(&factory, &opener).await;

    relay.close().await;
    relay.close().await;

    assert!(!relay.done().await.unwrap());
}

#[tokio::test]
async fn test_restart_after_close() {
    let factory = Arc::new(FakeFactory::default());
    let opener = Arc::new(FakeOpener::new(vec![heartbeat(1)]));
    let mut relay = producer(&factory, &opener).await;

    assert!(relay.run().await.unwrap());
    assert!(relay.run().await.unwrap());

    assert_eq!(opener.opened.lock().unwrap().len(), 2);
    assert_eq!(factory.log.sent().len(), 2);
}

#[tokio::test]
async fn test_run_until_shutdown() {
    let factory = Arc::new(FakeFactory::default());
    let opener = Arc::new(FakeOpener::default().held_open());
    let mut relay = producer(&factory, &opener).await;

    let clean = relay
        .run_until(tokio::time::sleep(Duration::from_millis(20)))
        .await
        .unwrap();

    assert!(!clean);
    assert_eq!(relay.service().state(), ServiceState::Stopped);
}

#[tokio::test]
async fn test_schema_rejection_fails_start() {
    let factory = Arc::new(FakeFactory {
        reject_schema: true,
        ..FakeFactory::default()
    });
    let opener = Arc::new(FakeOpener::default());
    let mut relay = producer(&factory, &opener).await;

    let err = relay.start().await.unwrap_err();

    assert!(err.to_string().contains("incompatible"));
    assert!(matches!(relay.service().state(), ServiceState::Failed(_)));
    assert!(opener.opened.lock().unwrap().is_empty());
    assert!(!relay.done().await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stream_ending_at_once_leaves_relay_stopped() {
    for _ in 0..20 {
        let factory = Arc::new(FakeFactory::default());
        let opener = Arc::new(FakeOpener::default());
        let mut relay = producer(&factory, &opener).await;

        relay.start().await.unwrap();
        assert!(relay.done().await.unwrap());

        assert_eq!(relay.service().state(), ServiceState::Stopped);
        assert_eq!(relay.service().wait_terminal().await, ServiceState::Stopped);
        relay.close().await;
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stream_failing_at_once_keeps_failure_reason() {
    for _ in 0..20 {
        let factory = Arc::new(FakeFactory::default());
        let opener = Arc::new(FakeOpener::new(vec![Step::Fatal]));
        let mut relay = producer(&factory, &opener).await;

        relay.start().await.unwrap();
        assert!(relay.done().await.is_err());

        let ServiceState::Failed(reason) = relay.service().state() else {
            panic!("relay should have failed");
        };
        assert!(reason.contains("Broker transport failure"));
        relay.close().await;
    }
}
