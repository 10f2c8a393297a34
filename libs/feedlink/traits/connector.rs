use crate::error::Result;
use crate::Delivery;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Stream of deliveries for one broker session.
///
/// The stream ends (or yields an error) when the session is lost.
pub type DeliveryStream = BoxStream<'static, Result<Delivery>>;

/// Trait for dialing the broker
///
/// Implement this trait on top of an AMQP client. The implementation is
/// expected to declare the queue and bind it as described in [`topology`]
/// and return the consumer stream. `connect` is called once per dial,
/// including every reconnection.
///
/// # Example
/// ```ignore
/// struct AmqpConnector {
///     params: ConnectionParams,
/// }
///
/// #[async_trait::async_trait]
/// impl Connector for AmqpConnector {
///     async fn connect(&self) -> Result<DeliveryStream> {
///         let conn = amqp::connect(&self.params.uri()).await
///             .map_err(|e| BrokerError::Dial(e.to_string()))?;
///         // declare exclusive queue, bind to topology::EXCHANGE with topology::BINDING_KEY
///         Ok(Box::pin(consumer_stream))
///     }
/// }
/// ```
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Dial the broker and start consuming
    ///
    /// # Returns
    /// * `Ok(stream)` - Session established, deliveries follow
    /// * `Err(BrokerError::AccessRefused)` - Credentials rejected, do not retry
    /// * `Err(_)` - Transient failure, the client backs off and retries
    async fn connect(&self) -> Result<DeliveryStream>;

    /// Human readable target for logs
    fn describe(&self) -> String {
        "broker".to_string()
    }
}

/// Broker topology used by the odds feed
pub mod topology {
    /// Topic exchange the provider publishes to
    pub const EXCHANGE: &str = "unifiedfeed";

    /// Binding pattern (all routing keys)
    pub const BINDING_KEY: &str = "#";

    /// Queue declaration flags: server-named, exclusive, auto-delete, non-durable
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct QueueOptions {
        pub exclusive: bool,
        pub auto_delete: bool,
        pub durable: bool,
    }

    pub const QUEUE_OPTIONS: QueueOptions = QueueOptions {
        exclusive: true,
        auto_delete: true,
        durable: false,
    };
}

/// Parameters needed to dial the provider's broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionParams {
    pub host: String,
    pub token: String,
    pub bookmaker_id: String,
    /// TLS server name override (defaults to `host`)
    pub server_name: Option<String>,
}

impl ConnectionParams {
    pub fn new(
        host: impl Into<String>,
        token: impl Into<String>,
        bookmaker_id: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            token: token.into(),
            bookmaker_id: bookmaker_id.into(),
            server_name: None,
        }
    }

    pub fn with_server_name(mut self, server_name: impl Into<String>) -> Self {
        self.server_name = Some(server_name.into());
        self
    }

    /// AMQP URI: the access token is the user, the bookmaker id the vhost segment
    pub fn uri(&self) -> String {
        format!(
            "amqps://{}:@{}//unifiedfeed/{}",
            self.token, self.host, self.bookmaker_id
        )
    }

    /// Virtual host the queue lives in
    pub fn vhost(&self) -> String {
        format!("/unifiedfeed/{}", self.bookmaker_id)
    }

    /// Name presented during the TLS handshake
    pub fn tls_server_name(&self) -> &str {
        self.server_name.as_deref().unwrap_or(&self.host)
    }
}
