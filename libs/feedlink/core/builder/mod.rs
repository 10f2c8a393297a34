pub mod states;

use crate::client::BrokerClient;
use crate::config::ClientConfig;
use crate::shutdown::ShutdownSignal;
use crate::traits::*;
use states::*;
use std::marker::PhantomData;
use std::sync::Arc;

/// Default capacity of the client event channel
const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Type-state builder for BrokerClient
///
/// This builder uses Rust's type system to enforce that the
/// connector is set before the client can be built.
pub struct BrokerClientBuilder<C>
where
    C: ConnectorState,
{
    _state: PhantomData<C>,
    connector: Option<Arc<dyn Connector>>,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
    shutdown: Option<ShutdownSignal>,
    event_capacity: usize,
}

impl BrokerClientBuilder<NoConnector> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: PhantomData,
            connector: None,
            reconnect_strategy: None,
            shutdown: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    pub fn connector(self, connector: impl Connector) -> BrokerClientBuilder<HasConnector> {
        self.shared_connector(Arc::new(connector))
    }

    pub fn shared_connector(self, connector: Arc<dyn Connector>) -> BrokerClientBuilder<HasConnector> {
        BrokerClientBuilder {
            _state: PhantomData,
            connector: Some(connector),
            reconnect_strategy: self.reconnect_strategy,
            shutdown: self.shutdown,
            event_capacity: self.event_capacity,
        }
    }
}

impl Default for BrokerClientBuilder<NoConnector> {
    fn default() -> Self {
        Self::new()
    }
}

// Optional configuration methods
impl<C> BrokerClientBuilder<C>
where
    C: ConnectorState,
{
    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.reconnect_strategy = Some(Box::new(strategy));
        self
    }

    /// Share a shutdown signal with the rest of the application
    ///
    /// By default the client creates its own signal; pass one in to
    /// cancel the client together with the pipeline that consumes it.
    pub fn shutdown(mut self, signal: ShutdownSignal) -> Self {
        self.shutdown = Some(signal);
        self
    }

    /// Bound of the event channel; a slow consumer slows the broker reader
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }
}

// Build method - only available when the connector is set
impl BrokerClientBuilder<HasConnector> {
    pub async fn build(self) -> Result<BrokerClient> {
        let connector = self
            .connector
            .ok_or_else(|| BrokerError::Configuration("connector must be set".into()))?;

        let reconnect_strategy = self
            .reconnect_strategy
            .unwrap_or_else(|| Box::new(ExponentialBackoff::feed_default()));

        let config = ClientConfig {
            connector,
            reconnect_strategy,
            shutdown: self.shutdown.unwrap_or_default(),
            event_capacity: self.event_capacity,
        };

        Ok(BrokerClient::start(config))
    }
}
