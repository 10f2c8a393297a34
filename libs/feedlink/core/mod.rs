//! # FeedLink core
//!
//! ## Example
//!
//! ```rust,ignore
//! use feedlink::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let shutdown = ShutdownSignal::new();
//!     let mut client = feedlink::builder()
//!         .connector(MyAmqpConnector::new(params))
//!         .reconnect_strategy(ExponentialBackoff::feed_default())
//!         .shutdown(shutdown.clone())
//!         .build()
//!         .await?;
//!
//!     while let Some(event) = client.recv().await {
//!         println!("Event: {:?}", event);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub mod shutdown;

// Re-export main types
pub use builder::{states, BrokerClientBuilder};
pub use client::{BrokerClient, ClientEvent, Metrics};
pub use config::ClientConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
pub use shutdown::ShutdownSignal;

// Re-export traits for convenience
pub use crate::traits::*;

/// Create a new broker client builder
pub fn builder() -> BrokerClientBuilder<states::NoConnector> {
    BrokerClientBuilder::new()
}
