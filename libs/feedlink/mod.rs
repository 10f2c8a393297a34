//! # FeedLink
//!
//! Transport layer of the odds feed SDK: a reconnecting consumer for a
//! topic-exchange message broker.
//!
//! ## Features
//!
//! - **Transport-agnostic**: the concrete AMQP session is supplied through the
//!   [`Connector`] trait, which returns a stream of raw [`Delivery`] frames
//! - **Exponential backoff**: delays double per attempt up to a cap, with a
//!   total retry horizon before a terminal error is surfaced
//! - **Connection events**: exactly one `Connected` per successful dial and one
//!   `Disconnected` per dropped connection
//! - **Cooperative shutdown**: every wait honours a shared [`ShutdownSignal`]

pub mod traits;
pub mod core;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use self::core::{
    builder, client, config, connection_state, shutdown,
    builder::{states, BrokerClientBuilder},
    client::{BrokerClient, ClientEvent, Metrics},
    config::ClientConfig,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
    shutdown::ShutdownSignal,
};

// Convenience function
pub use self::core::builder as client_builder;

/// Type alias for Result with BrokerError
pub type Result<T> = std::result::Result<T, traits::BrokerError>;
