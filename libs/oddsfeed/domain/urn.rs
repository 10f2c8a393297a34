//! `prefix:type:id` identifiers

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Entity type encoded in the middle segment of a URN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrnType {
    Match,
    Stage,
    Tournament,
    SimpleTournament,
    Season,
    Draw,
    Lottery,
    Player,
    Competitor,
    Unknown,
}

impl UrnType {
    pub const KNOWN: [UrnType; 9] = [
        UrnType::Match,
        UrnType::Stage,
        UrnType::Tournament,
        UrnType::SimpleTournament,
        UrnType::Season,
        UrnType::Draw,
        UrnType::Lottery,
        UrnType::Player,
        UrnType::Competitor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            UrnType::Match => "match",
            UrnType::Stage => "stage",
            UrnType::Tournament => "tournament",
            UrnType::SimpleTournament => "simple_tournament",
            UrnType::Season => "season",
            UrnType::Draw => "draw",
            UrnType::Lottery => "lottery",
            UrnType::Player => "player",
            UrnType::Competitor => "competitor",
            UrnType::Unknown => "unknown",
        }
    }

    fn from_segment(s: &str) -> UrnType {
        UrnType::KNOWN
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .unwrap_or(UrnType::Unknown)
    }
}

impl fmt::Display for UrnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain identifier such as `sr:match:12345`
///
/// Values coming from the feed are kept verbatim; [`Urn::parse`] is the
/// strict constructor that only accepts well-formed identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Urn(String);

impl Urn {
    /// Build a URN from its parts
    pub fn new(prefix: &str, urn_type: UrnType, id: u64) -> Self {
        Urn(format!("{}:{}:{}", prefix, urn_type.as_str(), id))
    }

    pub fn event(id: u64) -> Self {
        Self::new("sr", UrnType::Match, id)
    }

    pub fn player(id: u64) -> Self {
        Self::new("sr", UrnType::Player, id)
    }

    pub fn competitor(id: u64) -> Self {
        Self::new("sr", UrnType::Competitor, id)
    }

    /// Wrap a raw identifier without validation
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Urn(raw.into())
    }

    /// Parse a well-formed URN: three segments, a known type and a numeric id
    pub fn parse(s: &str) -> Result<Self, DecodeError> {
        let mut parts = s.split(':');
        let (Some(prefix), Some(kind), Some(id), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(DecodeError::BadUrn(s.to_string()));
        };
        if prefix.is_empty() || UrnType::from_segment(kind) == UrnType::Unknown {
            return Err(DecodeError::BadUrn(s.to_string()));
        }
        id.parse::<u64>()
            .map_err(|_| DecodeError::BadUrn(s.to_string()))?;
        Ok(Urn(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Numeric part; 0 when the URN is malformed
    pub fn id(&self) -> u64 {
        self.0
            .rsplit(':')
            .next()
            .and_then(|id| id.parse().ok())
            .unwrap_or(0)
    }

    pub fn urn_type(&self) -> UrnType {
        let mut parts = self.0.split(':');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(_), Some(kind), Some(_), None) => UrnType::from_segment(kind),
            _ => UrnType::Unknown,
        }
    }
}

impl fmt::Display for Urn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Urn {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Urn::parse(s)
    }
}
