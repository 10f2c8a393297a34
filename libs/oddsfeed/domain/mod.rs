//! Domain Layer
//!
//! Pure feed model: identifiers, producers, messages and the decoding rules
//! that do not depend on any transport.

pub mod entities;
pub mod hash;
pub mod lang;
pub mod market;
pub mod message;
pub mod names;
pub mod producer;
pub mod routing;
pub mod urn;

pub use entities::{
    Alive, BetCancel, BetSettlement, BetStop, Competitor, CompetitorPlayer, Fixture,
    FixtureChange, FixtureCompetitor, MarketDescription, MarketDescriptions, MarketLine,
    OddsChange, OutcomeDescription, Player, RollbackBetCancel, RollbackBetSettlement,
    SettledMarket, SettledOutcome, SnapshotComplete, SpecifierDescription, SportEventStatus,
    Tournament,
};
pub use lang::{uid_with_lang, Lang};
pub use market::{Market, MarketStatus, Outcome, OutcomeResult, Specifiers};
pub use message::{
    Body, Connection, ConnectionStatus, Header, Message, MessageKind, MessageType, Priority,
    ProducerChange, Scope,
};
pub use names::{interpolate, NameContext};
pub use producer::{Producer, ProducerStatus};
pub use routing::{encode_routing_key, parse_routing_key};
pub use urn::{Urn, UrnType};
