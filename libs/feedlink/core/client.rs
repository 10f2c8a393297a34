use crate::config::ClientConfig;
use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::shutdown::ShutdownSignal;
use crate::traits::*;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Events produced by the client task
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// A dial succeeded (emitted once per successful dial)
    Connected,
    /// An established connection dropped (emitted once per drop)
    Disconnected,
    /// Reconnecting (attempt number)
    Reconnecting(usize),
    /// Raw frame from the broker
    Delivery(Delivery),
    /// Transport error; terminal errors are followed by the end of the stream
    Error(BrokerError),
}

/// Client metrics snapshot
#[derive(Debug, Clone)]
pub struct Metrics {
    pub deliveries_received: u64,
    pub connections: u64,
    pub reconnect_count: u64,
    pub connection_state: ConnectionState,
}

/// How a consuming session ended
enum SessionEnd {
    Shutdown,
    ConsumerGone,
    Lost(BrokerError),
}

/// Reconnecting broker consumer
///
/// Owns one tokio task that dials through the configured [`Connector`],
/// forwards deliveries as [`ClientEvent`]s over a bounded channel and
/// backs off between attempts according to the reconnection strategy.
pub struct BrokerClient {
    /// Atomic connection state
    state: Arc<AtomicConnectionState>,
    /// Atomic metrics
    metrics: Arc<AtomicMetrics>,
    /// Event channel receiver (taken by the consumer of the feed)
    event_rx: Option<mpsc::Receiver<ClientEvent>>,
    /// Main task handle
    task_handle: Option<JoinHandle<Result<()>>>,
    /// Shutdown signal shared with the task
    shutdown: ShutdownSignal,
}

impl BrokerClient {
    /// Spawn the client task
    ///
    /// This is called by the builder's `build()` method.
    pub(crate) fn start(config: ClientConfig) -> Self {
        let state = Arc::new(AtomicConnectionState::new(ConnectionState::Disconnected));
        let metrics = Arc::new(AtomicMetrics::new());
        let shutdown = config.shutdown.clone();

        let (event_tx, event_rx) = mpsc::channel(config.event_capacity);

        let task_handle = {
            let state = Arc::clone(&state);
            let metrics = Arc::clone(&metrics);
            tokio::spawn(async move { run_client(config, state, metrics, event_tx).await })
        };

        Self {
            state,
            metrics,
            event_rx: Some(event_rx),
            task_handle: Some(task_handle),
            shutdown,
        }
    }

    /// Receive the next event; `None` once the client task has exited
    pub async fn recv(&mut self) -> Option<ClientEvent> {
        match self.event_rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }

    /// Hand the event receiver to another task
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<ClientEvent>> {
        self.event_rx.take()
    }

    /// Get current connection state
    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Check if connected
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        Metrics {
            deliveries_received: self.metrics.deliveries_received(),
            connections: self.metrics.connections(),
            reconnect_count: self.metrics.reconnect_count(),
            connection_state: self.state.get(),
        }
    }

    /// Get a reference to the shutdown signal
    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Wait for the client task to finish on its own
    ///
    /// Returns the terminal error when reconnection gave up or the
    /// broker refused the credentials.
    pub async fn join(mut self) -> Result<()> {
        match self.task_handle.take() {
            Some(handle) => handle
                .await
                .map_err(|e| BrokerError::Other(format!("client task panicked: {}", e)))?,
            None => Ok(()),
        }
    }

    /// Shutdown the client
    pub async fn shutdown(mut self) -> Result<()> {
        info!("Shutting down broker client");

        self.state.set(ConnectionState::ShuttingDown);
        self.shutdown.trigger();

        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
        Ok(())
    }
}

/// Send an event unless the consumer is gone or shutdown was requested
async fn emit(
    event_tx: &mpsc::Sender<ClientEvent>,
    shutdown: &ShutdownSignal,
    event: ClientEvent,
) -> bool {
    tokio::select! {
        sent = event_tx.send(event) => sent.is_ok(),
        _ = shutdown.cancelled() => false,
    }
}

/// Main client task loop
async fn run_client(
    config: ClientConfig,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    event_tx: mpsc::Sender<ClientEvent>,
) -> Result<()> {
    let ClientConfig {
        connector,
        mut reconnect_strategy,
        shutdown,
        ..
    } = config;
    let target = connector.describe();

    let mut reconnect_attempt = 0usize;
    let mut outage_started: Option<Instant> = None;
    let mut last_error = String::new();

    loop {
        if shutdown.is_triggered() {
            debug!("Shutdown requested, exiting broker loop");
            break;
        }

        state.set(if reconnect_attempt == 0 {
            ConnectionState::Connecting
        } else {
            ConnectionState::Reconnecting
        });

        if reconnect_attempt > 0
            && !emit(&event_tx, &shutdown, ClientEvent::Reconnecting(reconnect_attempt)).await
        {
            break;
        }

        let dialed = tokio::select! {
            result = connector.connect() => Some(result),
            _ = shutdown.cancelled() => None,
        };
        let Some(result) = dialed else {
            break;
        };

        match result {
            Ok(stream) => {
                info!(target = %target, "Connected to broker");
                state.set(ConnectionState::Connected);
                metrics.increment_connections();
                reconnect_attempt = 0;
                outage_started = None;
                reconnect_strategy.reset();

                if !emit(&event_tx, &shutdown, ClientEvent::Connected).await {
                    break;
                }

                match consume(stream, &shutdown, &metrics, &event_tx).await {
                    SessionEnd::Shutdown | SessionEnd::ConsumerGone => break,
                    SessionEnd::Lost(e) => {
                        warn!(target = %target, error = %e, "Broker connection lost");
                        state.set(ConnectionState::Disconnected);
                        last_error = e.to_string();
                        let terminal = e.is_terminal();
                        if !emit(&event_tx, &shutdown, ClientEvent::Disconnected).await {
                            break;
                        }
                        if !emit(&event_tx, &shutdown, ClientEvent::Error(e.clone())).await {
                            break;
                        }
                        if terminal {
                            return Err(e);
                        }
                    }
                }
            }
            Err(e) if e.is_terminal() => {
                error!(target = %target, error = %e, "Broker refused connection");
                state.set(ConnectionState::Disconnected);
                let _ = emit(&event_tx, &shutdown, ClientEvent::Error(e.clone())).await;
                return Err(e);
            }
            Err(e) => {
                error!(target = %target, error = %e, "Failed to connect");
                state.set(ConnectionState::Disconnected);
                last_error = e.to_string();
                if !emit(&event_tx, &shutdown, ClientEvent::Error(e)).await {
                    break;
                }
            }
        }

        if shutdown.is_triggered() {
            debug!("Shutdown requested during connection, stopping reconnection");
            break;
        }

        let started = *outage_started.get_or_insert_with(Instant::now);
        let elapsed = started.elapsed();

        match reconnect_strategy.next_delay(reconnect_attempt, elapsed) {
            Some(delay) => {
                info!(
                    "Reconnecting in {:?} (attempt {})",
                    delay,
                    reconnect_attempt + 1
                );
                if !shutdown.sleep(delay).await {
                    debug!("Shutdown requested during reconnection delay");
                    break;
                }
                reconnect_attempt += 1;
                metrics.increment_reconnects();
            }
            None => {
                warn!("Reconnection strategy exhausted, stopping");
                let err = BrokerError::ReconnectionFailed {
                    attempts: reconnect_attempt,
                    elapsed,
                    reason: last_error,
                };
                let _ = emit(&event_tx, &shutdown, ClientEvent::Error(err.clone())).await;
                return Err(err);
            }
        }
    }

    state.set(ConnectionState::Disconnected);
    info!("Broker client task exiting");
    Ok(())
}

/// Forward deliveries until the session ends
async fn consume(
    mut stream: DeliveryStream,
    shutdown: &ShutdownSignal,
    metrics: &AtomicMetrics,
    event_tx: &mpsc::Sender<ClientEvent>,
) -> SessionEnd {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => return SessionEnd::Shutdown,
            next = stream.next() => match next {
                Some(Ok(delivery)) => {
                    metrics.increment_received();
                    if !emit(event_tx, shutdown, ClientEvent::Delivery(delivery)).await {
                        return if shutdown.is_triggered() {
                            SessionEnd::Shutdown
                        } else {
                            SessionEnd::ConsumerGone
                        };
                    }
                }
                Some(Err(e)) => return SessionEnd::Lost(e),
                None => {
                    return SessionEnd::Lost(BrokerError::ConnectionClosed(
                        "delivery stream ended".into(),
                    ))
                }
            }
        }
    }
}
