use std::time::Duration;
use thiserror::Error;

/// Main error type for the broker transport
#[derive(Error, Debug, Clone)]
pub enum BrokerError {
    /// Dialing the broker failed
    #[error("Dial error: {0}")]
    Dial(String),

    /// Connection closed unexpectedly
    #[error("Connection closed: {0}")]
    ConnectionClosed(String),

    /// Broker refused the credentials (AMQP 403)
    #[error("Access refused: {0}")]
    AccessRefused(String),

    /// Reading from the delivery stream failed
    #[error("Consume error: {0}")]
    Consume(String),

    /// Channel send error
    #[error("Channel send error: {0}")]
    ChannelSend(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Reconnection gave up
    #[error("Reconnection failed after {attempts} attempts in {elapsed:?}: {reason}")]
    ReconnectionFailed {
        attempts: usize,
        elapsed: Duration,
        reason: String,
    },

    /// Generic error
    #[error("Error: {0}")]
    Other(String),
}

impl BrokerError {
    /// Errors after which the client stops instead of reconnecting
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BrokerError::AccessRefused(_)
                | BrokerError::Configuration(_)
                | BrokerError::ReconnectionFailed { .. }
        )
    }
}

/// Result type for broker operations
pub type Result<T> = std::result::Result<T, BrokerError>;
