//! Integration tests for the recovery engine
//!
//! Drives a `RecoveryStage` through its channels with decoded feed messages
//! and checks the recovery calls and the producers-change announcements.

mod common;

use common::*;
use feedlink::{Delivery, ShutdownSignal};
use oddsfeed::application::{Producers, RecoveryStage};
use oddsfeed::domain::{Alive, ProducerChange, SnapshotComplete};
use oddsfeed::{
    decode, Body, ConnectionStatus, ErrorKind, FeedError, Message, MessageReceiver, MessageSender,
    MessageType, Producer, ProducerStatus, RecoverySeed, Stage, StageContext,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

struct Harness {
    input: MessageSender,
    output: MessageReceiver,
    errors: mpsc::UnboundedReceiver<FeedError>,
    shutdown: ShutdownSignal,
    handle: JoinHandle<()>,
}

impl Harness {
    fn start(api: Arc<MockApi>, seeds: Vec<RecoverySeed>, tick: Duration) -> Self {
        let shutdown = ShutdownSignal::new();
        let (errors_tx, errors) = mpsc::unbounded_channel();
        let ctx = StageContext::new("recovery", shutdown.clone(), errors_tx);
        let (input, input_rx) = mpsc::channel(16);
        let (output_tx, output) = mpsc::channel(16);
        let stage = Box::new(RecoveryStage::new(api, seeds, Some(7)).with_tick(tick));
        let handle = tokio::spawn(stage.run(ctx, input_rx, output_tx));
        Self {
            input,
            output,
            errors,
            shutdown,
            handle,
        }
    }

    async fn send(&self, msg: Message) {
        self.input.send(msg).await.unwrap();
    }

    async fn send_feed(&self, routing_key: &str, xml: String) {
        let msg = decode(&Delivery::new(routing_key, xml.into_bytes()), now_ms()).unwrap();
        self.send(msg).await;
    }

    /// Messages up to and including the next one of `message_type`
    async fn until(&mut self, message_type: MessageType) -> Vec<Message> {
        recv_until(&mut self.output, |m| m.is(message_type)).await
    }

    async fn stop(self) {
        self.shutdown.trigger();
        self.handle.await.unwrap();
    }
}

fn changes(messages: &[Message]) -> Vec<Vec<ProducerChange>> {
    messages
        .iter()
        .filter_map(|m| match &m.body {
            Some(Body::ProducersChange(changes)) => Some(changes.clone()),
            _ => None,
        })
        .collect()
}

fn change_of(changes: &[ProducerChange], producer: Producer) -> &ProducerChange {
    changes
        .iter()
        .find(|c| c.producer == producer)
        .expect("producer missing from change")
}

fn request_of(api: &MockApi, producer: Producer) -> Vec<(i64, u64)> {
    api.recoveries()
        .into_iter()
        .filter_map(|c| match c {
            Call::Recovery {
                producer: p,
                after,
                request_id,
                ..
            } if p == producer => Some((after, request_id)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_recovery_happy_path() {
    verbose_println!("Testing connection up, recovery requests and snapshot complete...");

    let t = now_ms() - 60_000;
    let api = shared(MockApi::new());
    let mut harness = Harness::start(
        Arc::clone(&api),
        vec![
            RecoverySeed::new(Producer::Prematch, t),
            RecoverySeed::new(Producer::LiveOdds, t + 1),
        ],
        Duration::from_secs(60),
    );

    harness.send(Message::connection(ConnectionStatus::Up, now_ms())).await;
    let seen = harness.until(MessageType::Connection).await;
    assert!(seen[0].is(MessageType::ProducersChange), "change precedes the trigger");

    assert!(eventually(|| api.recoveries().len() == 2).await);
    let prematch = request_of(&api, Producer::Prematch);
    let live = request_of(&api, Producer::LiveOdds);
    verbose_println!("  prematch {:?}, live {:?}", prematch, live);
    assert_eq!(prematch[0].0, t);
    assert_eq!(live[0].0, t + 1);
    assert_ne!(prematch[0].1, live[0].1);
    assert!(api
        .recoveries()
        .iter()
        .all(|c| matches!(c, Call::Recovery { node_id: Some(7), .. })));

    let first = &changes(&seen)[0];
    assert_eq!(change_of(first, Producer::Prematch).status, ProducerStatus::InRecovery);
    assert_eq!(change_of(first, Producer::Prematch).request_id, prematch[0].1);
    assert_eq!(change_of(first, Producer::LiveOdds).status, ProducerStatus::InRecovery);

    harness
        .send_feed(SNAPSHOT_KEY, snapshot_complete_xml(Producer::Prematch, prematch[0].1, t))
        .await;
    let seen = harness.until(MessageType::SnapshotComplete).await;
    let after = &changes(&seen)[0];
    let state = change_of(after, Producer::Prematch);
    assert_eq!(state.status, ProducerStatus::Active);
    assert_eq!(state.request_id, 0);
    assert_eq!(change_of(after, Producer::LiveOdds).status, ProducerStatus::InRecovery);

    harness.stop().await;
}

#[tokio::test]
async fn test_alive_unsubscribed_restarts_recovery() {
    verbose_println!("Testing alive with subscribed=0...");

    let t = now_ms() - 10_000;
    let api = shared(MockApi::new());
    let mut harness = Harness::start(
        Arc::clone(&api),
        vec![RecoverySeed::new(Producer::Prematch, t)],
        Duration::from_secs(60),
    );

    harness.send(Message::connection(ConnectionStatus::Up, now_ms())).await;
    harness.until(MessageType::Connection).await;
    assert!(eventually(|| api.recoveries().len() == 1).await);
    let (_, first_id) = request_of(&api, Producer::Prematch)[0];

    harness
        .send_feed(SNAPSHOT_KEY, snapshot_complete_xml(Producer::Prematch, first_id, t - 5))
        .await;
    let seen = harness.until(MessageType::SnapshotComplete).await;
    assert_eq!(change_of(&changes(&seen)[0], Producer::Prematch).status, ProducerStatus::Active);

    harness.send_feed(ALIVE_KEY, alive_xml(Producer::Prematch, t + 2, false)).await;
    let seen = harness.until(MessageType::Alive).await;
    let state = change_of(&changes(&seen)[0], Producer::Prematch).clone();
    assert_eq!(state.status, ProducerStatus::InRecovery);

    assert!(eventually(|| api.recoveries().len() == 2).await);
    let (after, second_id) = request_of(&api, Producer::Prematch)[1];
    assert_eq!(after, t);
    assert!(second_id > first_id);
    assert_eq!(state.request_id, second_id);

    harness.stop().await;
}

#[tokio::test]
async fn test_mismatched_snapshot_is_ignored() {
    let api = shared(MockApi::new());
    let mut harness = Harness::start(
        Arc::clone(&api),
        vec![RecoverySeed::new(Producer::LiveOdds, 0)],
        Duration::from_secs(60),
    );

    harness.send(Message::connection(ConnectionStatus::Up, now_ms())).await;
    harness.until(MessageType::Connection).await;
    assert!(eventually(|| api.recoveries().len() == 1).await);
    let (after, request_id) = request_of(&api, Producer::LiveOdds)[0];
    assert_eq!(after, 0, "a zero seed asks for a full snapshot");

    harness
        .send_feed(SNAPSHOT_KEY, snapshot_complete_xml(Producer::LiveOdds, request_id + 1000, 1))
        .await;
    let seen = harness.until(MessageType::SnapshotComplete).await;
    assert_eq!(seen.len(), 1, "no producers change for a foreign snapshot");

    harness.stop().await;
}

#[tokio::test]
async fn test_other_node_snapshot_is_ignored() {
    verbose_println!("Testing snapshot complete routed to another node...");

    let api = shared(MockApi::new());
    let mut harness = Harness::start(
        Arc::clone(&api),
        vec![RecoverySeed::new(Producer::Prematch, 0)],
        Duration::from_secs(60),
    );

    harness.send(Message::connection(ConnectionStatus::Up, now_ms())).await;
    harness.until(MessageType::Connection).await;
    assert!(eventually(|| api.recoveries().len() == 1).await);
    let (_, request_id) = request_of(&api, Producer::Prematch)[0];

    harness
        .send_feed(
            &snapshot_key(Some(9)),
            snapshot_complete_xml(Producer::Prematch, request_id, 1),
        )
        .await;
    let seen = harness.until(MessageType::SnapshotComplete).await;
    assert_eq!(seen.len(), 1, "another node's snapshot changes nothing");

    harness
        .send_feed(
            &snapshot_key(Some(7)),
            snapshot_complete_xml(Producer::Prematch, request_id, 1),
        )
        .await;
    let seen = harness.until(MessageType::SnapshotComplete).await;
    let state = change_of(&changes(&seen)[0], Producer::Prematch).clone();
    assert_eq!(state.status, ProducerStatus::Active);

    harness.stop().await;
}

#[tokio::test]
async fn test_connection_down_marks_everything_down() {
    let api = shared(MockApi::new());
    let mut harness = Harness::start(Arc::clone(&api), Vec::new(), Duration::from_secs(60));

    harness.send(Message::connection(ConnectionStatus::Up, now_ms())).await;
    harness.until(MessageType::Connection).await;
    assert!(eventually(|| api.recoveries().len() == 2).await);

    harness.send(Message::connection(ConnectionStatus::Down, now_ms())).await;
    let seen = harness.until(MessageType::Connection).await;
    let down = &changes(&seen)[0];
    assert_eq!(down.len(), 2);
    assert!(down
        .iter()
        .all(|c| c.status == ProducerStatus::Down && c.request_id == 0));

    harness.stop().await;
}

#[tokio::test]
async fn test_failed_request_is_retried_on_tick() {
    verbose_println!("Testing recovery retry after an API failure...");

    let api = shared(MockApi::new().failing_recoveries(1));
    let mut harness = Harness::start(
        Arc::clone(&api),
        vec![RecoverySeed::new(Producer::Prematch, now_ms())],
        Duration::from_millis(50),
    );

    harness.send(Message::connection(ConnectionStatus::Up, now_ms())).await;
    harness.until(MessageType::Connection).await;

    let err = tokio::time::timeout(Duration::from_secs(2), harness.errors.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(err.is_notice());
    assert!(matches!(
        err.kind,
        ErrorKind::Recovery {
            producer: Producer::Prematch,
            ..
        }
    ));

    assert!(eventually(|| api.recoveries().len() >= 2).await);
    let requests = request_of(&api, Producer::Prematch);
    assert!(requests[1].1 > requests[0].1);

    harness.stop().await;
}

#[tokio::test]
async fn test_zero_tick_runs() {
    let api = shared(MockApi::new());
    let mut harness = Harness::start(
        Arc::clone(&api),
        vec![RecoverySeed::new(Producer::LiveOdds, 0)],
        Duration::ZERO,
    );

    harness.send(Message::connection(ConnectionStatus::Up, now_ms())).await;
    harness.until(MessageType::Connection).await;
    assert!(eventually(|| api.recoveries().len() == 1).await);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(api.recoveries().len(), 1, "in-flight request is not repeated");

    harness.stop().await;
}

#[test]
fn test_stale_active_producer_requests_full_recovery() {
    let t0 = 1_700_000_000_000;
    let window = Producer::Prematch.recovery_window();
    let mut producers = Producers::new(&[RecoverySeed::new(Producer::Prematch, t0)]);

    let effects = producers.connection_up(t0 + 1_000);
    let request_id = effects.requests[0].request_id;
    let snapshot = SnapshotComplete {
        product: Producer::Prematch.id(),
        request_id,
        timestamp: t0,
    };
    producers.on_snapshot_complete(&snapshot, t0 + 2_000);
    assert_eq!(producers.get(Producer::Prematch).unwrap().status, ProducerStatus::Active);

    assert!(producers.on_tick(t0 + window - 1).is_empty());

    let effects = producers.on_tick(t0 + window);
    assert_eq!(effects.requests.len(), 1);
    assert_eq!(effects.requests[0].after, 0);
    assert_eq!(
        producers.get(Producer::Prematch).unwrap().status,
        ProducerStatus::InRecovery
    );
}

#[test]
fn test_alive_keeps_active_producer_fresh() {
    let t0 = 1_700_000_000_000;
    let window = Producer::LiveOdds.recovery_window();
    let mut producers = Producers::new(&[RecoverySeed::new(Producer::LiveOdds, t0)]);
    let request_id = producers.connection_up(t0).requests[0].request_id;
    producers.on_snapshot_complete(
        &SnapshotComplete {
            product: Producer::LiveOdds.id(),
            request_id,
            timestamp: t0,
        },
        t0,
    );

    let alive = Alive {
        product: Producer::LiveOdds.id(),
        timestamp: t0 + window / 2,
        subscribed: true,
    };
    assert!(producers.on_alive(&alive, t0 + window / 2).is_empty());
    assert!(producers.on_tick(t0 + window).is_empty());
    assert_eq!(producers.get(Producer::LiveOdds).unwrap().last_alive, t0 + window / 2);
}
