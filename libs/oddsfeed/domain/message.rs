//! The unit of flow through the pipeline

use super::entities::*;
use super::lang::Lang;
use super::producer::{Producer, ProducerStatus};
use super::urn::Urn;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Tied to a sport event
    Event,
    /// Reference data in one language
    Lexicon,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    // broker messages
    Alive,
    BetCancel,
    BetSettlement,
    BetStop,
    FixtureChange,
    OddsChange,
    RollbackBetCancel,
    RollbackBetSettlement,
    SnapshotComplete,
    ProducerDown,
    // api responses
    Fixture,
    Markets,
    Player,
    Competitor,
    // synthesised
    Connection,
    ProducersChange,
}

const ROUTED_TYPES: [MessageType; 10] = [
    MessageType::Alive,
    MessageType::BetCancel,
    MessageType::BetSettlement,
    MessageType::BetStop,
    MessageType::FixtureChange,
    MessageType::OddsChange,
    MessageType::RollbackBetCancel,
    MessageType::RollbackBetSettlement,
    MessageType::SnapshotComplete,
    MessageType::ProducerDown,
];

impl MessageType {
    pub fn kind(&self) -> MessageKind {
        match self {
            MessageType::Alive
            | MessageType::SnapshotComplete
            | MessageType::ProducerDown
            | MessageType::Connection
            | MessageType::ProducersChange => MessageKind::System,
            MessageType::Markets | MessageType::Player | MessageType::Competitor => {
                MessageKind::Lexicon
            }
            _ => MessageKind::Event,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Alive => "alive",
            MessageType::BetCancel => "bet_cancel",
            MessageType::BetSettlement => "bet_settlement",
            MessageType::BetStop => "bet_stop",
            MessageType::FixtureChange => "fixture_change",
            MessageType::OddsChange => "odds_change",
            MessageType::RollbackBetCancel => "rollback_bet_cancel",
            MessageType::RollbackBetSettlement => "rollback_bet_settlement",
            MessageType::SnapshotComplete => "snapshot_complete",
            MessageType::ProducerDown => "producer_down",
            MessageType::Fixture => "fixture",
            MessageType::Markets => "markets",
            MessageType::Player => "player",
            MessageType::Competitor => "competitor",
            MessageType::Connection => "connection",
            MessageType::ProducersChange => "producers_change",
        }
    }

    /// Types that may appear in a routing key
    pub fn from_routing(s: &str) -> Option<MessageType> {
        ROUTED_TYPES.iter().copied().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audience of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scope {
    Prematch,
    Live,
    PrematchAndLive,
    Virtuals,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub kind: MessageKind,
    pub message_type: MessageType,
    pub scope: Scope,
    pub priority: Priority,
    /// Set on lexicon and enrichment messages
    pub lang: Option<Lang>,
    pub sport_id: Option<u32>,
    pub event_id: Option<u64>,
    pub event_urn: Option<Urn>,
    /// Node id from the eighth routing key field
    pub node_id: Option<i64>,
    /// Milliseconds since epoch
    pub received_at: i64,
}

impl Header {
    pub fn new(message_type: MessageType, scope: Scope, received_at: i64) -> Self {
        Self {
            kind: message_type.kind(),
            message_type,
            scope,
            priority: Priority::Low,
            lang: None,
            sport_id: None,
            event_id: None,
            event_urn: None,
            node_id: None,
            received_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub status: ConnectionStatus,
    pub timestamp: i64,
}

/// Recovery snapshot of one producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProducerChange {
    pub producer: Producer,
    pub status: ProducerStatus,
    /// In-flight recovery request, 0 when none
    pub request_id: u64,
    /// Last alive timestamp seen from the producer
    pub timestamp: i64,
    pub status_changed_at: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Body {
    Alive(Alive),
    OddsChange(OddsChange),
    BetStop(BetStop),
    BetSettlement(BetSettlement),
    BetCancel(BetCancel),
    RollbackBetSettlement(RollbackBetSettlement),
    RollbackBetCancel(RollbackBetCancel),
    FixtureChange(FixtureChange),
    SnapshotComplete(SnapshotComplete),
    Fixture(Fixture),
    Markets(MarketDescriptions),
    Player(Player),
    Competitor(Competitor),
    ProducersChange(Vec<ProducerChange>),
    Connection(Connection),
}

/// Header plus typed body
///
/// `raw` keeps the broker payload of feed messages; it is empty for
/// messages produced by the SDK itself. `body` is `None` only for types
/// without a typed body (`producer_down`).
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub header: Header,
    pub raw: Vec<u8>,
    pub body: Option<Body>,
}

impl Message {
    pub fn new(header: Header, raw: Vec<u8>, body: Option<Body>) -> Self {
        Self { header, raw, body }
    }

    pub fn connection(status: ConnectionStatus, timestamp: i64) -> Self {
        let header = Header::new(MessageType::Connection, Scope::System, timestamp);
        Self::new(header, Vec::new(), Some(Body::Connection(Connection { status, timestamp })))
    }

    pub fn producers_change(changes: Vec<ProducerChange>, timestamp: i64) -> Self {
        let header = Header::new(MessageType::ProducersChange, Scope::System, timestamp);
        Self::new(header, Vec::new(), Some(Body::ProducersChange(changes)))
    }

    /// Fixture fetched because of `source`, inheriting its event fields
    pub fn fixture_for(source: &Header, lang: Lang, fixture: Fixture) -> Self {
        let header = Header {
            kind: MessageKind::Event,
            message_type: MessageType::Fixture,
            lang: Some(lang),
            ..source.clone()
        };
        Self::new(header, Vec::new(), Some(Body::Fixture(fixture)))
    }

    /// Fixture loaded outside of any feed message (preload)
    pub fn fixture(lang: Lang, fixture: Fixture, timestamp: i64) -> Self {
        let mut header = Header::new(MessageType::Fixture, Scope::Prematch, timestamp);
        header.kind = MessageKind::Lexicon;
        header.lang = Some(lang);
        header.event_id = Some(fixture.id());
        header.event_urn = Some(fixture.urn.clone());
        Self::new(header, Vec::new(), Some(Body::Fixture(fixture)))
    }

    pub fn markets(lang: Lang, markets: MarketDescriptions, timestamp: i64) -> Self {
        Self::lexicon(MessageType::Markets, lang, Body::Markets(markets), timestamp)
    }

    pub fn player(lang: Lang, player: Player, timestamp: i64) -> Self {
        Self::lexicon(MessageType::Player, lang, Body::Player(player), timestamp)
    }

    pub fn competitor(lang: Lang, competitor: Competitor, timestamp: i64) -> Self {
        Self::lexicon(MessageType::Competitor, lang, Body::Competitor(competitor), timestamp)
    }

    fn lexicon(message_type: MessageType, lang: Lang, body: Body, timestamp: i64) -> Self {
        let mut header = Header::new(message_type, Scope::System, timestamp);
        header.lang = Some(lang);
        Self::new(header, Vec::new(), Some(body))
    }

    #[inline]
    pub fn message_type(&self) -> MessageType {
        self.header.message_type
    }

    #[inline]
    pub fn is(&self, message_type: MessageType) -> bool {
        self.header.message_type == message_type
    }
}
