//! Broker message payloads

use crate::domain::market::{
    competitor_ids, line_id, merge_specifiers, outcome_id, outcome_player_id,
};
use crate::domain::*;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct AliveXml {
    #[serde(rename = "@product")]
    product: u32,
    #[serde(rename = "@timestamp")]
    timestamp: i64,
    #[serde(rename = "@subscribed", default)]
    subscribed: Option<i32>,
}

impl From<AliveXml> for Alive {
    fn from(x: AliveXml) -> Self {
        Alive {
            product: x.product,
            timestamp: x.timestamp,
            subscribed: x.subscribed.unwrap_or(1) != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SnapshotCompleteXml {
    #[serde(rename = "@product")]
    product: u32,
    #[serde(rename = "@request_id")]
    request_id: u64,
    #[serde(rename = "@timestamp")]
    timestamp: i64,
}

impl From<SnapshotCompleteXml> for SnapshotComplete {
    fn from(x: SnapshotCompleteXml) -> Self {
        SnapshotComplete {
            product: x.product,
            request_id: x.request_id,
            timestamp: x.timestamp,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SportEventStatusXml {
    #[serde(rename = "@status")]
    status: i32,
    #[serde(rename = "@match_status", default)]
    match_status: Option<i32>,
    #[serde(rename = "@home_score", default)]
    home_score: Option<f64>,
    #[serde(rename = "@away_score", default)]
    away_score: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OutcomeXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@odds", default)]
    odds: Option<f64>,
    #[serde(rename = "@probabilities", default)]
    probabilities: Option<f64>,
    #[serde(rename = "@active", default)]
    active: Option<i32>,
}

impl From<OutcomeXml> for Outcome {
    fn from(x: OutcomeXml) -> Self {
        Outcome {
            id: outcome_id(&x.id),
            player_id: outcome_player_id(&x.id),
            competitor_ids: competitor_ids(&x.id),
            odds: x.odds,
            probability: x.probabilities,
            active: x.active.unwrap_or(1) != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OddsMarketXml {
    #[serde(rename = "@id")]
    id: u64,
    #[serde(rename = "@specifiers", default)]
    specifiers: String,
    #[serde(rename = "@extended_specifiers", default)]
    extended_specifiers: String,
    #[serde(rename = "@status", default)]
    status: Option<i32>,
    #[serde(rename = "@favourite", default)]
    favourite: Option<i32>,
    #[serde(rename = "outcome", default)]
    outcomes: Vec<OutcomeXml>,
}

impl From<OddsMarketXml> for Market {
    fn from(x: OddsMarketXml) -> Self {
        Market {
            id: x.id,
            line_id: line_id(&x.specifiers),
            specifiers: merge_specifiers(&x.specifiers, &x.extended_specifiers),
            status: MarketStatus::for_odds_change(x.status),
            favourite: x.favourite.unwrap_or(0) == 1,
            outcomes: x.outcomes.into_iter().map(Outcome::from).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OddsXml {
    #[serde(rename = "@betstop_reason", default)]
    betstop_reason: Option<i32>,
    #[serde(rename = "@betting_status", default)]
    betting_status: Option<i32>,
    #[serde(rename = "market", default)]
    markets: Vec<OddsMarketXml>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OddsChangeXml {
    #[serde(rename = "@product")]
    product: u32,
    #[serde(rename = "@event_id")]
    event_id: String,
    #[serde(rename = "@timestamp")]
    timestamp: i64,
    #[serde(rename = "@request_id", default)]
    request_id: Option<u64>,
    #[serde(rename = "@odds_change_reason", default)]
    odds_change_reason: Option<i32>,
    #[serde(default)]
    sport_event_status: Option<SportEventStatusXml>,
    #[serde(default)]
    odds: Option<OddsXml>,
}

impl From<OddsChangeXml> for OddsChange {
    fn from(x: OddsChangeXml) -> Self {
        let (betstop_reason, betting_status, markets) = match x.odds {
            Some(odds) => (
                odds.betstop_reason,
                odds.betting_status,
                odds.markets.into_iter().map(Market::from).collect(),
            ),
            None => (None, None, Vec::new()),
        };
        OddsChange {
            product: x.product,
            event_urn: Urn::from_raw(x.event_id),
            timestamp: x.timestamp,
            request_id: x.request_id,
            odds_change_reason: x.odds_change_reason,
            betting_status,
            betstop_reason,
            sport_event_status: x.sport_event_status.map(|s| SportEventStatus {
                status: s.status,
                match_status: s.match_status,
                home_score: s.home_score,
                away_score: s.away_score,
            }),
            markets,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BetStopXml {
    #[serde(rename = "@product")]
    product: u32,
    #[serde(rename = "@event_id")]
    event_id: String,
    #[serde(rename = "@timestamp")]
    timestamp: i64,
    #[serde(rename = "@request_id", default)]
    request_id: Option<u64>,
    #[serde(rename = "@groups", default)]
    groups: String,
    #[serde(rename = "@market_status", default)]
    market_status: Option<i32>,
}

impl From<BetStopXml> for BetStop {
    fn from(x: BetStopXml) -> Self {
        BetStop {
            product: x.product,
            event_urn: Urn::from_raw(x.event_id),
            timestamp: x.timestamp,
            request_id: x.request_id,
            groups: x
                .groups
                .split('|')
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect(),
            market_status: MarketStatus::for_bet_stop(x.market_status),
            market_ids: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SettledOutcomeXml {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@result", default)]
    result: Option<i32>,
    #[serde(rename = "@void_factor", default)]
    void_factor: Option<f64>,
    #[serde(rename = "@dead_heat_factor", default)]
    dead_heat_factor: Option<f64>,
}

impl From<SettledOutcomeXml> for SettledOutcome {
    fn from(x: SettledOutcomeXml) -> Self {
        let result = x.result.unwrap_or(-1);
        let void_factor = x.void_factor.unwrap_or(0.0);
        let dead_heat_factor = x.dead_heat_factor.unwrap_or(0.0);
        SettledOutcome {
            id: outcome_id(&x.id),
            player_id: outcome_player_id(&x.id),
            result: OutcomeResult::derive(result, void_factor, dead_heat_factor),
            void_factor,
            dead_heat_factor,
        }
    }
}

#[derive(Debug, Deserialize)]
struct MarketLineXml {
    #[serde(rename = "@id")]
    id: u64,
    #[serde(rename = "@specifiers", default)]
    specifiers: String,
    #[serde(rename = "@extended_specifiers", default)]
    extended_specifiers: String,
    #[serde(rename = "@void_reason", default)]
    void_reason: Option<i32>,
    #[serde(rename = "outcome", default)]
    outcomes: Vec<SettledOutcomeXml>,
}

impl MarketLineXml {
    fn line(&self) -> MarketLine {
        MarketLine {
            id: self.id,
            line_id: line_id(&self.specifiers),
            specifiers: merge_specifiers(&self.specifiers, &self.extended_specifiers),
            void_reason: self.void_reason,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct SettlementOutcomesXml {
    #[serde(rename = "market", default)]
    markets: Vec<MarketLineXml>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct BetSettlementXml {
    #[serde(rename = "@product")]
    product: u32,
    #[serde(rename = "@event_id")]
    event_id: String,
    #[serde(rename = "@timestamp")]
    timestamp: i64,
    #[serde(rename = "@request_id", default)]
    request_id: Option<u64>,
    #[serde(rename = "@certainty", default)]
    certainty: Option<i32>,
    #[serde(default)]
    outcomes: SettlementOutcomesXml,
}

impl From<BetSettlementXml> for BetSettlement {
    fn from(x: BetSettlementXml) -> Self {
        BetSettlement {
            product: x.product,
            event_urn: Urn::from_raw(x.event_id),
            timestamp: x.timestamp,
            request_id: x.request_id,
            certainty: x.certainty,
            markets: x
                .outcomes
                .markets
                .into_iter()
                .map(|m| SettledMarket {
                    line: m.line(),
                    outcomes: m.outcomes.into_iter().map(SettledOutcome::from).collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct BetCancelXml {
    #[serde(rename = "@product")]
    product: u32,
    #[serde(rename = "@event_id")]
    event_id: String,
    #[serde(rename = "@timestamp")]
    timestamp: i64,
    #[serde(rename = "@request_id", default)]
    request_id: Option<u64>,
    #[serde(rename = "@start_time", default)]
    start_time: Option<i64>,
    #[serde(rename = "@end_time", default)]
    end_time: Option<i64>,
    #[serde(rename = "@superceded_by", default)]
    superceded_by: Option<String>,
    #[serde(rename = "market", default)]
    markets: Vec<MarketLineXml>,
}

impl From<BetCancelXml> for BetCancel {
    fn from(x: BetCancelXml) -> Self {
        BetCancel {
            product: x.product,
            event_urn: Urn::from_raw(x.event_id),
            timestamp: x.timestamp,
            request_id: x.request_id,
            start_time: x.start_time,
            end_time: x.end_time,
            superceded_by: x.superceded_by.map(Urn::from_raw),
            markets: x.markets.iter().map(MarketLineXml::line).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RollbackXml {
    #[serde(rename = "@product")]
    product: u32,
    #[serde(rename = "@event_id")]
    event_id: String,
    #[serde(rename = "@timestamp")]
    timestamp: i64,
    #[serde(rename = "@request_id", default)]
    request_id: Option<u64>,
    #[serde(rename = "@start_time", default)]
    start_time: Option<i64>,
    #[serde(rename = "@end_time", default)]
    end_time: Option<i64>,
    #[serde(rename = "market", default)]
    markets: Vec<MarketLineXml>,
}

impl From<RollbackXml> for RollbackBetSettlement {
    fn from(x: RollbackXml) -> Self {
        RollbackBetSettlement {
            product: x.product,
            event_urn: Urn::from_raw(x.event_id),
            timestamp: x.timestamp,
            request_id: x.request_id,
            markets: x.markets.iter().map(MarketLineXml::line).collect(),
        }
    }
}

impl From<RollbackXml> for RollbackBetCancel {
    fn from(x: RollbackXml) -> Self {
        RollbackBetCancel {
            product: x.product,
            event_urn: Urn::from_raw(x.event_id),
            timestamp: x.timestamp,
            request_id: x.request_id,
            start_time: x.start_time,
            end_time: x.end_time,
            markets: x.markets.iter().map(MarketLineXml::line).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FixtureChangeXml {
    #[serde(rename = "@product")]
    product: u32,
    #[serde(rename = "@event_id")]
    event_id: String,
    #[serde(rename = "@timestamp")]
    timestamp: i64,
    #[serde(rename = "@request_id", default)]
    request_id: Option<u64>,
    #[serde(rename = "@change_type", default)]
    change_type: Option<i32>,
    #[serde(rename = "@start_time", default)]
    start_time: Option<i64>,
}

impl From<FixtureChangeXml> for FixtureChange {
    fn from(x: FixtureChangeXml) -> Self {
        FixtureChange {
            product: x.product,
            event_urn: Urn::from_raw(x.event_id),
            timestamp: x.timestamp,
            request_id: x.request_id,
            change_type: x.change_type,
            start_time: x.start_time,
        }
    }
}
