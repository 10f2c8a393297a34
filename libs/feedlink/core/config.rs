use crate::shutdown::ShutdownSignal;
use crate::traits::*;
use std::sync::Arc;

/// Configuration for BrokerClient
///
/// Built with the type-state builder; holds everything the client task
/// needs for the lifetime of the feed.
pub struct ClientConfig {
    /// Dials the broker on every (re)connection
    pub(crate) connector: Arc<dyn Connector>,

    /// Reconnection strategy
    pub(crate) reconnect_strategy: Box<dyn ReconnectionStrategy>,

    /// Cancels dialing, consuming and backoff waits
    pub(crate) shutdown: ShutdownSignal,

    /// Capacity of the event channel handed to the consumer
    pub(crate) event_capacity: usize,
}

impl ClientConfig {
    /// Target of the connector, for logs
    pub fn target(&self) -> String {
        self.connector.describe()
    }

    pub fn event_capacity(&self) -> usize {
        self.event_capacity
    }

    pub fn shutdown(&self) -> &ShutdownSignal {
        &self.shutdown
    }
}
