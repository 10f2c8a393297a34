//! # FeedLink Traits
//!
//! Core traits and types shared by the broker client and its embedders:
//!
//! - **Connector**: dial the broker and expose the delivery stream
//! - **ReconnectionStrategy**: control reconnection behaviour
//! - **Delivery**: a raw frame with its routing key
//! - **BrokerError**: transport failures

pub mod connector;
pub mod delivery;
pub mod error;
pub mod reconnect;

// Re-export commonly used types
pub use connector::{topology, ConnectionParams, Connector, DeliveryStream};
pub use delivery::Delivery;
pub use error::{BrokerError, Result};
pub use reconnect::{ExponentialBackoff, FixedDelay, NeverReconnect, ReconnectionStrategy};
