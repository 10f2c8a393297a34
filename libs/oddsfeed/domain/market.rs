//! Markets, outcomes and the pure decoding rules around them

use super::hash::fnv1a32;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type Specifiers = BTreeMap<String, String>;

const PLAYER_PREFIX: &str = "sr:player:";
const COMPETITOR_PREFIX: &str = "sr:competitor:";

/// Status of a market line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketStatus {
    Inactive,
    Active,
    Suspended,
    HandedOver,
    Settled,
    Cancelled,
}

impl MarketStatus {
    /// Numeric status from the feed; unknown values are inactive
    pub fn from_code(code: i32) -> MarketStatus {
        match code {
            1 => MarketStatus::Active,
            -1 => MarketStatus::Suspended,
            -2 => MarketStatus::HandedOver,
            -3 => MarketStatus::Settled,
            -4 => MarketStatus::Cancelled,
            _ => MarketStatus::Inactive,
        }
    }

    pub fn code(&self) -> i32 {
        match self {
            MarketStatus::Inactive => 0,
            MarketStatus::Active => 1,
            MarketStatus::Suspended => -1,
            MarketStatus::HandedOver => -2,
            MarketStatus::Settled => -3,
            MarketStatus::Cancelled => -4,
        }
    }

    /// Status of an odds-change market; absent means active
    pub fn for_odds_change(code: Option<i32>) -> MarketStatus {
        code.map(MarketStatus::from_code).unwrap_or(MarketStatus::Active)
    }

    /// Status carried by a bet stop; absent means suspended
    pub fn for_bet_stop(code: Option<i32>) -> MarketStatus {
        code.map(MarketStatus::from_code)
            .unwrap_or(MarketStatus::Suspended)
    }
}

/// Settlement result of one outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeResult {
    Unknown,
    Lose,
    Win,
    WinWithDeadHeat,
    HalfWin,
    HalfLose,
    Void,
}

impl OutcomeResult {
    pub fn derive(result: i32, void_factor: f64, dead_heat_factor: f64) -> OutcomeResult {
        match (result, void_factor) {
            (1, v) if v == 0.0 => {
                if dead_heat_factor > 0.0 {
                    OutcomeResult::WinWithDeadHeat
                } else {
                    OutcomeResult::Win
                }
            }
            (0, v) if v == 0.0 => OutcomeResult::Lose,
            (0, v) if v == 1.0 => OutcomeResult::Void,
            (1, v) if v == 0.5 => OutcomeResult::HalfWin,
            (0, v) if v == 0.5 => OutcomeResult::HalfLose,
            _ => OutcomeResult::Unknown,
        }
    }
}

/// One priced outcome of a market line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    pub id: u64,
    /// Set when the outcome is a player (`sr:player:N`)
    pub player_id: Option<u64>,
    /// Set when the outcome names competitors (`sr:competitor:N[,...]`)
    pub competitor_ids: Vec<u64>,
    pub odds: Option<f64>,
    pub probability: Option<f64>,
    pub active: bool,
}

/// A market line as carried by odds changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub id: u64,
    pub line_id: u32,
    /// Specifiers unioned with extended specifiers
    pub specifiers: Specifiers,
    pub status: MarketStatus,
    pub favourite: bool,
    pub outcomes: Vec<Outcome>,
}

impl Market {
    /// `variant` specifier when it names a concrete variant
    pub fn variant(&self) -> Option<&str> {
        self.specifiers
            .get("variant")
            .map(String::as_str)
            .filter(|v| !v.is_empty() && !v.starts_with('{'))
    }

    /// Players referenced by outcomes and by the `player` specifier
    pub fn player_ids(&self) -> Vec<u64> {
        let from_outcomes = self.outcomes.iter().filter_map(|o| o.player_id);
        let from_specifier = self
            .specifiers
            .get("player")
            .and_then(|v| v.parse::<u64>().ok());
        dedup(from_outcomes.chain(from_specifier).collect())
    }

    /// Competitors referenced by outcomes and by the `competitor` specifier
    pub fn competitor_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self
            .outcomes
            .iter()
            .flat_map(|o| o.competitor_ids.iter().copied())
            .collect();
        if let Some(v) = self.specifiers.get("competitor") {
            ids.extend(competitor_ids(v));
        }
        dedup(ids)
    }
}

/// Parse `k1=v1|k2=v2`; empty or malformed segments are skipped and
/// `sr:player:` values are reduced to the bare id
pub fn parse_specifiers(s: &str) -> Specifiers {
    s.split('|')
        .filter_map(|segment| segment.split_once('='))
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| {
            let v = v.strip_prefix(PLAYER_PREFIX).unwrap_or(v);
            (k.to_string(), v.to_string())
        })
        .collect()
}

/// Specifiers of a market line including its extended specifiers
pub fn merge_specifiers(specifiers: &str, extended: &str) -> Specifiers {
    match (specifiers.is_empty(), extended.is_empty()) {
        (_, true) => parse_specifiers(specifiers),
        (true, false) => parse_specifiers(extended),
        (false, false) => parse_specifiers(&format!("{}|{}", specifiers, extended)),
    }
}

/// Serialise specifiers back to `k1=v1|k2=v2`
pub fn format_specifiers(specifiers: &Specifiers) -> String {
    specifiers
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("|")
}

/// Line identifier of the raw (non-extended) specifier string; 0 when empty
pub fn line_id(specifiers: &str) -> u32 {
    if specifiers.is_empty() {
        0
    } else {
        fnv1a32(specifiers)
    }
}

/// Outcome id: player id, numeric id or the hash of the raw id
pub fn outcome_id(raw: &str) -> u64 {
    if let Some(id) = raw.strip_prefix(PLAYER_PREFIX).and_then(|id| id.parse().ok()) {
        return id;
    }
    raw.parse().unwrap_or_else(|_| fnv1a32(raw) as u64)
}

/// Player id of an `sr:player:N` outcome
pub fn outcome_player_id(raw: &str) -> Option<u64> {
    raw.strip_prefix(PLAYER_PREFIX)?.parse().ok()
}

/// Sorted competitor ids of a comma separated `sr:competitor:N` list
pub fn competitor_ids(raw: &str) -> Vec<u64> {
    dedup(
        raw.split(',')
            .filter_map(|part| part.trim().strip_prefix(COMPETITOR_PREFIX))
            .filter_map(|id| id.parse().ok())
            .collect(),
    )
}

/// Sorted, duplicate free
pub fn dedup(mut ids: Vec<u64>) -> Vec<u64> {
    ids.sort_unstable();
    ids.dedup();
    ids
}
