//! Odds Feed SDK
//!
//! Consumes the unified odds feed, drives the producer recovery protocol
//! and delivers one ordered stream of typed, enriched messages.

pub mod application;
pub mod codec;
pub mod domain;
pub mod error;
pub mod infrastructure;

// Re-export commonly used items
pub use application::{
    decode, BetStopStage, BufferedConsumer, CompetitorStage, Consumer, ErrorListener, FixtureStage,
    FnConsumer, MarketsStage, MessageReceiver, MessageSender, Pipeline, PlayerStage,
    RecoveryStage, Sdk, SdkBuilder, Simple, Stage, StageContext,
};
pub use domain::{
    Body, ConnectionStatus, Header, Lang, Message, MessageKind, MessageType, Priority, Producer,
    ProducerChange, ProducerStatus, Scope, Urn, UrnType,
};
pub use error::{ApiError, DecodeError, ErrorKind, FeedError, Severity};
pub use infrastructure::{
    init_tracing, init_tracing_with_level, ConfigError, Environment, ExpiringMap, FeedApi,
    HttpApi, RateLimiter, RecoverySeed, SdkConfig, ShutdownManager,
};

pub use feedlink::{
    BrokerError, ConnectionParams, Connector, Delivery, DeliveryStream, ExponentialBackoff,
    ShutdownSignal,
};
