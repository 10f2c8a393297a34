//! Common test utilities for FeedLink integration tests
//!
//! Provides a scripted connector so the client loop can be driven without a broker.

#![allow(dead_code)]

use async_trait::async_trait;
use feedlink::{BrokerClient, BrokerError, ClientEvent, Connector, Delivery, DeliveryStream};
use futures::StreamExt;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// One scripted dial outcome
pub enum Script {
    /// Dial fails with this error
    Fail(BrokerError),
    /// Dial succeeds, yields the deliveries, then the stream ends
    Drop(Vec<Delivery>),
    /// Dial succeeds, yields the deliveries, then stays open
    Hold(Vec<Delivery>),
}

/// Connector that replays a fixed script; once exhausted, dials never complete
#[derive(Clone)]
pub struct MockConnector {
    scripts: Arc<Mutex<VecDeque<Script>>>,
    dials: Arc<AtomicUsize>,
}

impl MockConnector {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Arc::new(Mutex::new(scripts.into())),
            dials: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self) -> feedlink::Result<DeliveryStream> {
        self.dials.fetch_add(1, Ordering::SeqCst);
        let next = self.scripts.lock().unwrap().pop_front();
        match next {
            Some(Script::Fail(e)) => Err(e),
            Some(Script::Drop(deliveries)) => {
                Ok(futures::stream::iter(deliveries.into_iter().map(Ok)).boxed())
            }
            Some(Script::Hold(deliveries)) => Ok(futures::stream::iter(
                deliveries.into_iter().map(Ok),
            )
            .chain(futures::stream::pending())
            .boxed()),
            None => futures::future::pending().await,
        }
    }

    fn describe(&self) -> String {
        "mock-broker".to_string()
    }
}

pub fn delivery(routing_key: &str, body: &str) -> Delivery {
    Delivery::new(routing_key, body.as_bytes().to_vec())
}

/// Next event, failing the test if none arrives in time
pub async fn next_event(client: &mut BrokerClient) -> Option<ClientEvent> {
    tokio::time::timeout(Duration::from_secs(2), client.recv())
        .await
        .expect("timed out waiting for client event")
}
