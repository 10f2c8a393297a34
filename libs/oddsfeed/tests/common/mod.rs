//! Common test utilities for oddsfeed integration tests
//!
//! A recording API double, a broker connector fed from the test through a
//! channel and builders for feed XML.

#![allow(dead_code)]

use async_trait::async_trait;
use feedlink::{BrokerError, Connector, Delivery, DeliveryStream};
use futures::StreamExt;
use oddsfeed::domain::{
    Competitor, Fixture, FixtureCompetitor, MarketDescription, Player, Tournament,
};
use oddsfeed::{ApiError, FeedApi, Lang, Message, MessageReceiver, Producer, Urn};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// One recorded API call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Markets(Lang),
    Variant(Lang, u64, String),
    Fixture(Lang, String),
    LiveSchedule(Lang),
    Schedule(Lang, usize),
    Player(Lang, u64),
    Competitor(Lang, u64),
    Recovery {
        producer: Producer,
        after: i64,
        request_id: u64,
        node_id: Option<i64>,
    },
}

/// API double that records every call
#[derive(Default)]
pub struct MockApi {
    calls: Mutex<Vec<Call>>,
    catalogue: Vec<MarketDescription>,
    failing_recoveries: AtomicUsize,
    failing_markets: AtomicUsize,
    failing_profiles: AtomicUsize,
    profile_delay: Option<Duration>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalogue(mut self, catalogue: Vec<MarketDescription>) -> Self {
        self.catalogue = catalogue;
        self
    }

    /// The next `n` recovery requests fail
    pub fn failing_recoveries(self, n: usize) -> Self {
        self.failing_recoveries.store(n, Ordering::SeqCst);
        self
    }

    /// The next `n` catalogue requests fail
    pub fn failing_markets(self, n: usize) -> Self {
        self.failing_markets.store(n, Ordering::SeqCst);
        self
    }

    /// The next `n` player or competitor requests fail
    pub fn failing_profiles(self, n: usize) -> Self {
        self.failing_profiles.store(n, Ordering::SeqCst);
        self
    }

    /// Profile calls take this long
    pub fn with_profile_delay(mut self, delay: Duration) -> Self {
        self.profile_delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn recoveries(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Recovery { .. }))
            .collect()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    async fn profile_call(&self, url: &str) -> Result<(), ApiError> {
        if let Some(delay) = self.profile_delay {
            tokio::time::sleep(delay).await;
        }
        if Self::take_failure(&self.failing_profiles) {
            return Err(ApiError::status("GET", url, 500, "boom"));
        }
        Ok(())
    }
}

#[async_trait]
impl FeedApi for MockApi {
    async fn markets(&self, lang: Lang) -> Result<Vec<MarketDescription>, ApiError> {
        self.record(Call::Markets(lang));
        if Self::take_failure(&self.failing_markets) {
            return Err(ApiError::status("GET", "/descriptions/markets.xml", 503, "busy"));
        }
        Ok(self.catalogue.clone())
    }

    async fn market_variant(
        &self,
        lang: Lang,
        market_id: u64,
        variant: &str,
    ) -> Result<Vec<MarketDescription>, ApiError> {
        self.record(Call::Variant(lang, market_id, variant.to_string()));
        Ok(vec![market(market_id, &[])])
    }

    async fn fixture(&self, lang: Lang, urn: &Urn) -> Result<Fixture, ApiError> {
        self.record(Call::Fixture(lang, urn.to_string()));
        Ok(fixture(urn.id(), None))
    }

    async fn live_schedule(&self, lang: Lang) -> Result<Vec<Fixture>, ApiError> {
        self.record(Call::LiveSchedule(lang));
        Ok(Vec::new())
    }

    async fn schedule(&self, lang: Lang, start: usize, _limit: usize) -> Result<Vec<Fixture>, ApiError> {
        self.record(Call::Schedule(lang, start));
        Ok(Vec::new())
    }

    async fn player(&self, lang: Lang, id: u64) -> Result<Player, ApiError> {
        self.record(Call::Player(lang, id));
        self.profile_call("/players").await?;
        Ok(Player {
            id,
            name: format!("Player {}", id),
            full_name: format!("Player Number {}", id),
            nationality: None,
            player_type: None,
            date_of_birth: None,
        })
    }

    async fn competitor(&self, lang: Lang, id: u64) -> Result<Competitor, ApiError> {
        self.record(Call::Competitor(lang, id));
        self.profile_call("/competitors").await?;
        Ok(Competitor {
            id,
            name: format!("Team {}", id),
            abbreviation: None,
            country: None,
            players: Vec::new(),
        })
    }

    async fn request_recovery(
        &self,
        producer: Producer,
        after: i64,
        request_id: u64,
        node_id: Option<i64>,
    ) -> Result<(), ApiError> {
        self.record(Call::Recovery {
            producer,
            after,
            request_id,
            node_id,
        });
        if Self::take_failure(&self.failing_recoveries) {
            return Err(ApiError::status("POST", "/recovery/initiate_request", 403, "forbidden"));
        }
        Ok(())
    }
}

/// Connector whose single session is fed by a [`FeedHandle`]
///
/// Later dials never complete.
pub struct ChannelConnector {
    session: Mutex<Option<mpsc::UnboundedReceiver<Delivery>>>,
}

/// Test side of a [`ChannelConnector`]
#[derive(Clone)]
pub struct FeedHandle {
    tx: mpsc::UnboundedSender<Delivery>,
}

impl FeedHandle {
    pub fn send(&self, routing_key: &str, body: impl Into<String>) {
        let _ = self.tx.send(Delivery::new(routing_key, body.into().into_bytes()));
    }
}

pub fn channel_connector() -> (ChannelConnector, FeedHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ChannelConnector {
            session: Mutex::new(Some(rx)),
        },
        FeedHandle { tx },
    )
}

#[async_trait]
impl Connector for ChannelConnector {
    async fn connect(&self) -> feedlink::Result<DeliveryStream> {
        let session = self.session.lock().take();
        match session {
            Some(rx) => Ok(futures::stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|d| (Ok::<_, BrokerError>(d), rx))
            })
            .boxed()),
            None => futures::future::pending().await,
        }
    }

    fn describe(&self) -> String {
        "channel-broker".to_string()
    }
}

/// Collect messages until `pred` holds for one of them
pub async fn recv_until(rx: &mut MessageReceiver, pred: impl Fn(&Message) -> bool) -> Vec<Message> {
    let mut seen = Vec::new();
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out waiting for message")
            .expect("stream closed");
        let done = pred(&msg);
        seen.push(msg);
        if done {
            return seen;
        }
    }
}

/// Poll `check` until it holds or two seconds pass
pub async fn eventually(check: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

pub fn market(id: u64, groups: &[&str]) -> MarketDescription {
    MarketDescription {
        id,
        name: format!("Market {}", id),
        groups: groups.iter().map(|g| g.to_string()).collect(),
        variant: None,
        outcomes: Vec::new(),
        specifiers: Vec::new(),
    }
}

pub fn fixture(event_id: u64, competitors: Option<(&str, &str)>) -> Fixture {
    let competitors = competitors
        .map(|(home, away)| {
            vec![
                FixtureCompetitor {
                    id: 1,
                    name: home.to_string(),
                    abbreviation: None,
                    qualifier: Some("home".to_string()),
                },
                FixtureCompetitor {
                    id: 2,
                    name: away.to_string(),
                    abbreviation: None,
                    qualifier: Some("away".to_string()),
                },
            ]
        })
        .unwrap_or_default();
    Fixture {
        urn: Urn::event(event_id),
        name: String::new(),
        scheduled: None,
        start_time: None,
        status: None,
        tournament: Some(Tournament {
            urn: Urn::from_raw("sr:tournament:1"),
            name: "League".to_string(),
        }),
        competitors,
    }
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// Feed XML builders

pub const ALIVE_KEY: &str = "-.-.-.alive.-.-.-.-";
pub const SNAPSHOT_KEY: &str = "-.-.-.snapshot_complete.-.-.-.-";

/// Snapshot-complete key, optionally addressed to a node
pub fn snapshot_key(node_id: Option<i64>) -> String {
    match node_id {
        Some(node) => format!("-.-.-.snapshot_complete.-.-.-.{}", node),
        None => SNAPSHOT_KEY.to_string(),
    }
}

pub fn odds_change_key(event_id: u64) -> String {
    format!("hi.-.live.odds_change.1.sr:match.{}.-", event_id)
}

pub fn bet_stop_key(event_id: u64) -> String {
    format!("hi.-.live.bet_stop.1.sr:match.{}.-", event_id)
}

pub fn fixture_change_key(event_id: u64) -> String {
    format!("hi.pre.-.fixture_change.1.sr:match.{}.-", event_id)
}

pub fn alive_xml(producer: Producer, timestamp: i64, subscribed: bool) -> String {
    format!(
        r#"<alive product="{}" timestamp="{}" subscribed="{}"/>"#,
        producer.id(),
        timestamp,
        u8::from(subscribed)
    )
}

pub fn snapshot_complete_xml(producer: Producer, request_id: u64, timestamp: i64) -> String {
    format!(
        r#"<snapshot_complete product="{}" request_id="{}" timestamp="{}"/>"#,
        producer.id(),
        request_id,
        timestamp
    )
}

/// Odds change with a player market and a two-competitor outcome
pub fn odds_change_xml(event_id: u64, player_id: u64, competitors: (u64, u64)) -> String {
    format!(
        r#"<odds_change product="1" event_id="sr:match:{event}" timestamp="1">
  <odds>
    <market id="40" specifiers="player=sr:player:{player}">
      <outcome id="sr:player:{player}" odds="3.5"/>
    </market>
    <market id="100" specifiers="variant=sr:exact_goals:4+">
      <outcome id="sr:competitor:{a},sr:competitor:{b}" odds="2.0"/>
    </market>
  </odds>
</odds_change>"#,
        event = event_id,
        player = player_id,
        a = competitors.0,
        b = competitors.1,
    )
}

/// Odds change without markets
pub fn empty_odds_change_xml(event_id: u64, timestamp: i64) -> String {
    format!(
        r#"<odds_change product="1" event_id="sr:match:{}" timestamp="{}"/>"#,
        event_id, timestamp
    )
}

pub fn bet_stop_xml(event_id: u64, groups: &[&str]) -> String {
    format!(
        r#"<bet_stop product="1" event_id="sr:match:{}" timestamp="1" groups="{}"/>"#,
        event_id,
        groups.join("|")
    )
}

pub fn fixture_change_xml(event_id: u64) -> String {
    format!(
        r#"<fixture_change product="3" event_id="sr:match:{}" change_type="5" timestamp="1"/>"#,
        event_id
    )
}

pub fn shared(api: MockApi) -> Arc<MockApi> {
    Arc::new(api)
}
