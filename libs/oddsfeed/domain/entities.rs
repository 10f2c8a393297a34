//! Typed message bodies
//!
//! Feed bodies keep the identifier fields needed by the pipeline; the
//! remaining payload is carried as decoded, without further interpretation.

use super::market::{Market, MarketStatus, OutcomeResult, Specifiers};
use super::producer::Producer;
use super::urn::Urn;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Heartbeat of a producer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alive {
    /// `product` attribute, the producer id
    pub product: u32,
    pub timestamp: i64,
    pub subscribed: bool,
}

impl Alive {
    pub fn producer(&self) -> Option<Producer> {
        Producer::from_id(self.product)
    }
}

/// End of a recovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotComplete {
    pub product: u32,
    pub request_id: u64,
    pub timestamp: i64,
}

impl SnapshotComplete {
    pub fn producer(&self) -> Option<Producer> {
        Producer::from_id(self.product)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SportEventStatus {
    pub status: i32,
    pub match_status: Option<i32>,
    pub home_score: Option<f64>,
    pub away_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsChange {
    pub product: u32,
    pub event_urn: Urn,
    pub timestamp: i64,
    pub request_id: Option<u64>,
    pub odds_change_reason: Option<i32>,
    pub betting_status: Option<i32>,
    pub betstop_reason: Option<i32>,
    pub sport_event_status: Option<SportEventStatus>,
    pub markets: Vec<Market>,
}

impl OddsChange {
    pub fn player_ids(&self) -> Vec<u64> {
        super::market::dedup(self.markets.iter().flat_map(|m| m.player_ids()).collect())
    }

    pub fn competitor_ids(&self) -> Vec<u64> {
        super::market::dedup(self.markets.iter().flat_map(|m| m.competitor_ids()).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetStop {
    pub product: u32,
    pub event_urn: Urn,
    pub timestamp: i64,
    pub request_id: Option<u64>,
    /// Market group labels
    pub groups: Vec<String>,
    pub market_status: MarketStatus,
    /// Market ids of all named groups, filled by the bet-stop stage
    pub market_ids: Vec<u64>,
}

/// Market line reference used by cancellations and rollbacks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketLine {
    pub id: u64,
    pub line_id: u32,
    pub specifiers: Specifiers,
    pub void_reason: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettledOutcome {
    pub id: u64,
    pub player_id: Option<u64>,
    pub result: OutcomeResult,
    pub void_factor: f64,
    pub dead_heat_factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettledMarket {
    pub line: MarketLine,
    pub outcomes: Vec<SettledOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetSettlement {
    pub product: u32,
    pub event_urn: Urn,
    pub timestamp: i64,
    pub request_id: Option<u64>,
    pub certainty: Option<i32>,
    pub markets: Vec<SettledMarket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetCancel {
    pub product: u32,
    pub event_urn: Urn,
    pub timestamp: i64,
    pub request_id: Option<u64>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub superceded_by: Option<Urn>,
    pub markets: Vec<MarketLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackBetSettlement {
    pub product: u32,
    pub event_urn: Urn,
    pub timestamp: i64,
    pub request_id: Option<u64>,
    pub markets: Vec<MarketLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackBetCancel {
    pub product: u32,
    pub event_urn: Urn,
    pub timestamp: i64,
    pub request_id: Option<u64>,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub markets: Vec<MarketLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureChange {
    pub product: u32,
    pub event_urn: Urn,
    pub timestamp: i64,
    pub request_id: Option<u64>,
    pub change_type: Option<i32>,
    pub start_time: Option<i64>,
}

// Lexicon entities

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    pub urn: Urn,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureCompetitor {
    pub id: u64,
    pub name: String,
    pub abbreviation: Option<String>,
    /// `home` or `away`
    pub qualifier: Option<String>,
}

/// Sport event fixture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub urn: Urn,
    pub name: String,
    pub scheduled: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub tournament: Option<Tournament>,
    pub competitors: Vec<FixtureCompetitor>,
}

impl Fixture {
    pub fn id(&self) -> u64 {
        self.urn.id()
    }

    /// Start time, falling back to the scheduled time
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        self.start_time.or(self.scheduled)
    }

    /// Explicit name, or `home vs. away` built from the competitors
    pub fn display_name(&self) -> String {
        if !self.name.is_empty() {
            return self.name.clone();
        }
        self.competitors
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(" vs. ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub nationality: Option<String>,
    pub player_type: Option<String>,
    pub date_of_birth: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorPlayer {
    pub id: u64,
    pub name: String,
}

/// Competitor profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Competitor {
    pub id: u64,
    pub name: String,
    pub abbreviation: Option<String>,
    pub country: Option<String>,
    pub players: Vec<CompetitorPlayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeDescription {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecifierDescription {
    pub name: String,
    pub kind: String,
}

/// Descriptor of a market: name template, groups, outcomes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDescription {
    pub id: u64,
    pub name: String,
    pub groups: Vec<String>,
    pub variant: Option<String>,
    pub outcomes: Vec<OutcomeDescription>,
    pub specifiers: Vec<SpecifierDescription>,
}

/// Body of a markets lexicon message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketDescriptions {
    pub markets: Vec<MarketDescription>,
    /// Full catalogue, as opposed to a single variant lookup
    pub complete: bool,
}

impl MarketDescriptions {
    pub fn catalogue(markets: Vec<MarketDescription>) -> Self {
        Self { markets, complete: true }
    }

    pub fn variant(markets: Vec<MarketDescription>) -> Self {
        Self { markets, complete: false }
    }
}
