//! Application Facade
//!
//! Public entry point for embedders: configure the feed with
//! [`Sdk::builder`], then [`run`](SdkBuilder::run) it until shutdown.
//!
//! ```rust,ignore
//! let shutdown = ShutdownSignal::new();
//! Sdk::builder()
//!     .credentials(bookmaker_id, token, None)
//!     .environment(Environment::Staging)
//!     .connector(my_amqp_connector)
//!     .buffered_consumer(100, Duration::from_secs(1), |batch| store(batch))
//!     .error_listener(|err| { warn!("{}", err); Ok(()) })
//!     .run(shutdown)
//!     .await?;
//! ```

use super::bet_stop::BetStopStage;
use super::competitor::CompetitorStage;
use super::consumer::{BufferedConsumer, Consumer, FnConsumer, Simple};
use super::fixture::FixtureStage;
use super::markets::MarketsStage;
use super::pipeline::Pipeline;
use super::player::PlayerStage;
use super::recovery::RecoveryStage;
use super::stage::{MessageReceiver, Stage};
use crate::domain::{Lang, Message};
use crate::error::{FeedError, Severity};
use crate::infrastructure::config::default_channel_capacity;
use crate::infrastructure::{
    Environment, FeedApi, HttpApi, RateLimiter, RecoverySeed, SdkConfig, ShutdownManager,
    DEFAULT_CONCURRENT_API_CALLS,
};
use anyhow::Context;
use chrono::{DateTime, Utc};
use feedlink::{ConnectionParams, Connector, ExponentialBackoff, ReconnectionStrategy, ShutdownSignal};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Receives every pipeline error; returning `Err` stops the feed
pub type ErrorListener = Box<dyn FnMut(&FeedError) -> anyhow::Result<()> + Send>;

/// Configured feed, ready to run
pub struct Sdk {
    connector: Arc<dyn Connector>,
    api: Arc<dyn FeedApi>,
    reconnect: Box<dyn ReconnectionStrategy>,
    node_id: Option<i64>,
    languages: Vec<Lang>,
    seeds: Vec<RecoverySeed>,
    preload: Option<DateTime<Utc>>,
    consumer: Option<Box<dyn Consumer>>,
    stages: Vec<Box<dyn Stage>>,
    listener: Option<ErrorListener>,
    concurrent_api_calls: usize,
    channel_capacity: usize,
    recovery_tick: Option<Duration>,
}

impl Sdk {
    pub fn builder() -> SdkBuilder {
        SdkBuilder::default()
    }

    /// Run until `shutdown` fires or a fatal error occurs
    ///
    /// Fatal errors are a terminal broker error (credentials refused,
    /// reconnection horizon exhausted) and an `Err` from the error
    /// listener. The first one is returned after every stage drained;
    /// shutdown alone returns `Ok(())`.
    pub async fn run(self, shutdown: ShutdownSignal) -> anyhow::Result<()> {
        let Sdk {
            connector,
            api,
            reconnect,
            node_id,
            languages,
            seeds,
            preload,
            consumer,
            stages,
            mut listener,
            concurrent_api_calls,
            channel_capacity,
            recovery_tick,
        } = self;

        info!(
            target = %connector.describe(),
            languages = %languages.iter().map(|l| l.as_str()).collect::<Vec<_>>().join(","),
            producers = seeds.len(),
            "Starting odds feed"
        );

        let mut client = feedlink::builder()
            .shared_connector(connector)
            .reconnect_strategy(reconnect)
            .shutdown(shutdown.clone())
            .event_capacity(channel_capacity)
            .build()
            .await
            .context("failed to start broker client")?;
        let events = client
            .take_events()
            .context("broker client events already taken")?;

        let mut recovery = RecoveryStage::new(Arc::clone(&api), seeds, node_id);
        if let Some(tick) = recovery_tick {
            recovery = recovery.with_tick(tick);
        }
        let limiter = || RateLimiter::new(concurrent_api_calls);

        let mut pipeline = Pipeline::new(shutdown.clone(), channel_capacity);
        let mut rx = pipeline.source(events);
        rx = pipeline.stage(rx, Box::new(recovery));
        rx = pipeline.stage(rx, Box::new(MarketsStage::new(Arc::clone(&api), languages.clone(), limiter())));
        rx = pipeline.stage(
            rx,
            Box::new(FixtureStage::new(Arc::clone(&api), languages.clone(), limiter()).with_preload(preload)),
        );
        rx = pipeline.stage(rx, Box::new(PlayerStage::new(Arc::clone(&api), languages.clone(), limiter())));
        rx = pipeline.stage(rx, Box::new(CompetitorStage::new(Arc::clone(&api), languages.clone(), limiter())));
        rx = pipeline.stage(rx, Box::new(BetStopStage::new(&languages)));
        for stage in stages {
            rx = pipeline.stage(rx, stage);
        }
        match consumer {
            Some(consumer) => pipeline.consumer(rx, consumer),
            None => pipeline.drain(rx),
        }

        let (mut errors, mut tasks) = pipeline.into_parts();
        let mut fatal: Option<anyhow::Error> = None;

        let client_done = client.join();
        tokio::pin!(client_done);
        let mut client_running = true;

        loop {
            tokio::select! {
                err = errors.recv() => {
                    let Some(err) = err else { break };
                    match err.severity {
                        Severity::Notice => warn!(op = err.op, "{}", err.kind),
                        Severity::Log => debug!(op = err.op, "{}", err.kind),
                    }
                    if let Some(listener) = listener.as_mut() {
                        if let Err(e) = listener(&err) {
                            error!("Error listener stopped the feed: {:#}", e);
                            fatal.get_or_insert(e);
                            shutdown.trigger();
                        }
                    }
                }
                result = &mut client_done, if client_running => {
                    client_running = false;
                    if let Err(e) = result {
                        error!("Broker client stopped: {}", e);
                        fatal.get_or_insert(anyhow::Error::new(e));
                    }
                    shutdown.trigger();
                }
            }
        }

        if client_running {
            if let Err(e) = client_done.await {
                fatal.get_or_insert(anyhow::Error::new(e));
            }
        }
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                if e.is_panic() {
                    error!("Pipeline task panicked: {}", e);
                    fatal.get_or_insert_with(|| anyhow::anyhow!("pipeline task panicked: {}", e));
                }
            }
        }

        info!("Odds feed stopped");
        match fatal {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Collects the feed configuration
pub struct SdkBuilder {
    environment: Environment,
    bookmaker_id: Option<u64>,
    token: String,
    node_id: Option<i64>,
    server_name: Option<String>,
    languages: Vec<Lang>,
    seeds: Vec<RecoverySeed>,
    preload: Option<DateTime<Utc>>,
    connector: Option<Arc<dyn Connector>>,
    api: Option<Arc<dyn FeedApi>>,
    reconnect: Box<dyn ReconnectionStrategy>,
    consumer: Option<Box<dyn Consumer>>,
    stages: Vec<Box<dyn Stage>>,
    listener: Option<ErrorListener>,
    concurrent_api_calls: usize,
    channel_capacity: usize,
    recovery_tick: Option<Duration>,
}

impl Default for SdkBuilder {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            bookmaker_id: None,
            token: String::new(),
            node_id: None,
            server_name: None,
            languages: vec![Lang::En],
            seeds: Vec::new(),
            preload: None,
            connector: None,
            api: None,
            reconnect: Box::new(ExponentialBackoff::feed_default()),
            consumer: None,
            stages: Vec::new(),
            listener: None,
            concurrent_api_calls: DEFAULT_CONCURRENT_API_CALLS,
            channel_capacity: default_channel_capacity(),
            recovery_tick: None,
        }
    }
}

impl SdkBuilder {
    pub fn credentials(mut self, bookmaker_id: u64, token: impl Into<String>, node_id: Option<i64>) -> Self {
        self.bookmaker_id = Some(bookmaker_id);
        self.token = token.into();
        self.node_id = node_id;
        self
    }

    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    /// Languages of lexicon messages; the first one feeds the bet-stop groups
    pub fn languages(mut self, languages: Vec<Lang>) -> Self {
        self.languages = languages;
        self
    }

    /// Producers to manage and their last known alive timestamps
    pub fn recovery(mut self, seeds: Vec<RecoverySeed>) -> Self {
        self.seeds = seeds;
        self
    }

    /// Load every fixture scheduled before `to` at startup
    pub fn preload(mut self, to: DateTime<Utc>) -> Self {
        self.preload = Some(to);
        self
    }

    /// TLS server name override for the broker
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    /// Take every field of a loaded configuration file
    pub fn config(mut self, config: &SdkConfig) -> Self {
        self.environment = config.environment;
        self.bookmaker_id = Some(config.bookmaker_id);
        self.token = config.token.clone();
        self.node_id = config.node_id;
        self.server_name = config.server_name.clone();
        self.languages = config.languages.clone();
        self.seeds = config.recovery.clone();
        self.preload = config.preload_to(Utc::now());
        self.concurrent_api_calls = config.concurrent_api_calls;
        self.channel_capacity = config.channel_capacity;
        self
    }

    pub fn connector(self, connector: impl Connector) -> Self {
        self.shared_connector(Arc::new(connector))
    }

    pub fn shared_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Replace the HTTP API client
    pub fn api(mut self, api: Arc<dyn FeedApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// Broker reconnection policy, [`ExponentialBackoff::feed_default`] unless set
    pub fn reconnect(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.reconnect = Box::new(strategy);
        self
    }

    /// Final reader of the stream; replaces any previous consumer
    pub fn consumer(mut self, consumer: impl Consumer) -> Self {
        self.consumer = Some(Box::new(consumer));
        self
    }

    /// Consume the raw receiver with an async closure
    pub fn consumer_fn<F, Fut>(self, f: F) -> Self
    where
        F: FnOnce(MessageReceiver) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.consumer(FnConsumer::new(f))
    }

    pub fn buffered_consumer<F>(self, size: usize, interval: Duration, handler: F) -> Self
    where
        F: FnMut(Vec<Message>) -> anyhow::Result<()> + Send + 'static,
    {
        self.consumer(BufferedConsumer::new(size, interval, handler))
    }

    /// Per-message callback, called in order with every other stage
    pub fn callback<F>(self, handler: F) -> Self
    where
        F: FnMut(&Message) -> anyhow::Result<()> + Send + 'static,
    {
        self.stage(Simple::new(handler))
    }

    /// Custom stage after the bet-stop stage, in call order
    pub fn stage(mut self, stage: impl Stage) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn error_listener<F>(mut self, listener: F) -> Self
    where
        F: FnMut(&FeedError) -> anyhow::Result<()> + Send + 'static,
    {
        self.listener = Some(Box::new(listener));
        self
    }

    pub fn concurrent_api_calls(mut self, limit: usize) -> Self {
        self.concurrent_api_calls = limit;
        self
    }

    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Period of the recovery engine's staleness check
    pub fn recovery_tick(mut self, tick: Duration) -> Self {
        self.recovery_tick = Some(tick);
        self
    }

    /// Broker dial parameters for the configured credentials
    ///
    /// Hand these to the AMQP connector.
    pub fn connection_params(&self) -> anyhow::Result<ConnectionParams> {
        let bookmaker_id = self.bookmaker_id.context("credentials are not set")?;
        let params = ConnectionParams::new(
            self.environment.broker_host(),
            self.token.clone(),
            bookmaker_id.to_string(),
        );
        Ok(match &self.server_name {
            Some(name) => params.with_server_name(name.clone()),
            None => params,
        })
    }

    pub fn build(self) -> anyhow::Result<Sdk> {
        let connector = self.connector.context("a broker connector is required")?;
        anyhow::ensure!(!self.languages.is_empty(), "at least one language is required");
        anyhow::ensure!(self.concurrent_api_calls > 0, "concurrent_api_calls must be positive");
        anyhow::ensure!(
            self.recovery_tick.map_or(true, |tick| !tick.is_zero()),
            "recovery_tick must be positive"
        );

        let api = match self.api {
            Some(api) => api,
            None => {
                anyhow::ensure!(!self.token.is_empty(), "an access token is required");
                Arc::new(HttpApi::for_environment(self.environment, self.token)) as Arc<dyn FeedApi>
            }
        };

        let mut languages = self.languages;
        dedup_keep_order(&mut languages);

        Ok(Sdk {
            connector,
            api,
            reconnect: self.reconnect,
            node_id: self.node_id,
            languages,
            seeds: self.seeds,
            preload: self.preload,
            consumer: self.consumer,
            stages: self.stages,
            listener: self.listener,
            concurrent_api_calls: self.concurrent_api_calls,
            channel_capacity: self.channel_capacity,
            recovery_tick: self.recovery_tick,
        })
    }

    pub async fn run(self, shutdown: ShutdownSignal) -> anyhow::Result<()> {
        self.build()?.run(shutdown).await
    }

    /// Run until Ctrl+C or a fatal error
    pub async fn run_until_ctrl_c(self) -> anyhow::Result<()> {
        let sdk = self.build()?;
        let manager = ShutdownManager::new();
        manager.spawn_signal_handler();
        sdk.run(manager.signal()).await
    }
}

fn dedup_keep_order(languages: &mut Vec<Lang>) {
    let mut seen = Vec::with_capacity(languages.len());
    languages.retain(|lang| {
        if seen.contains(lang) {
            false
        } else {
            seen.push(*lang);
            true
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use feedlink::DeliveryStream;

    struct NoBroker;

    #[async_trait]
    impl Connector for NoBroker {
        async fn connect(&self) -> feedlink::Result<DeliveryStream> {
            Err(feedlink::BrokerError::AccessRefused("no broker".into()))
        }
    }

    #[test]
    fn test_build_requires_connector_and_token() {
        let err = Sdk::builder().credentials(1, "token", None).build().err().unwrap();
        assert!(err.to_string().contains("connector"));

        let err = Sdk::builder().connector(NoBroker).build().err().unwrap();
        assert!(err.to_string().contains("token"));

        let err = Sdk::builder()
            .connector(NoBroker)
            .credentials(1, "token", None)
            .languages(Vec::new())
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("language"));

        let err = Sdk::builder()
            .connector(NoBroker)
            .credentials(1, "token", None)
            .recovery_tick(Duration::ZERO)
            .build()
            .err()
            .unwrap();
        assert!(err.to_string().contains("recovery_tick"));

        assert!(Sdk::builder().connector(NoBroker).credentials(1, "token", None).build().is_ok());
    }

    #[tokio::test]
    async fn test_run_until_ctrl_c_reports_refused_broker() {
        let err = Sdk::builder()
            .connector(NoBroker)
            .credentials(1, "token", None)
            .run_until_ctrl_c()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Access refused"));
    }

    #[test]
    fn test_connection_params() {
        let params = Sdk::builder()
            .credentials(42, "secret", Some(3))
            .environment(Environment::Production)
            .server_name("mq.example.com")
            .connection_params()
            .unwrap();
        assert_eq!(params.uri(), "amqps://secret:@mq.betradar.com//unifiedfeed/42");
        assert_eq!(params.tls_server_name(), "mq.example.com");

        assert!(Sdk::builder().connection_params().is_err());
    }

    #[test]
    fn test_languages_are_deduplicated_in_order() {
        let mut languages = vec![Lang::De, Lang::En, Lang::De];
        dedup_keep_order(&mut languages);
        assert_eq!(languages, vec![Lang::De, Lang::En]);
    }
}
