//! XML codec
//!
//! Payloads are deserialised into private DTOs mirroring the documents and
//! then mapped onto the domain types, deriving line ids, specifier maps and
//! numeric ids on the way.

mod api;
mod feed;

use crate::domain::*;
use crate::error::DecodeError;
use serde::de::DeserializeOwned;

fn from_xml<T: DeserializeOwned>(what: &str, raw: &[u8]) -> Result<T, DecodeError> {
    let text = std::str::from_utf8(raw).map_err(|e| DecodeError::malformed(what, e))?;
    quick_xml::de::from_str(text).map_err(|e| DecodeError::malformed(what, e))
}

/// Decode the payload of a broker message of the given type
///
/// Types without a typed body decode to `None`.
pub fn decode_body(message_type: MessageType, raw: &[u8]) -> Result<Option<Body>, DecodeError> {
    let what = message_type.as_str();
    let body = match message_type {
        MessageType::Alive => Body::Alive(from_xml::<feed::AliveXml>(what, raw)?.into()),
        MessageType::SnapshotComplete => {
            Body::SnapshotComplete(from_xml::<feed::SnapshotCompleteXml>(what, raw)?.into())
        }
        MessageType::OddsChange => {
            Body::OddsChange(from_xml::<feed::OddsChangeXml>(what, raw)?.into())
        }
        MessageType::BetStop => Body::BetStop(from_xml::<feed::BetStopXml>(what, raw)?.into()),
        MessageType::BetSettlement => {
            Body::BetSettlement(from_xml::<feed::BetSettlementXml>(what, raw)?.into())
        }
        MessageType::BetCancel => {
            Body::BetCancel(from_xml::<feed::BetCancelXml>(what, raw)?.into())
        }
        MessageType::RollbackBetSettlement => {
            Body::RollbackBetSettlement(from_xml::<feed::RollbackXml>(what, raw)?.into())
        }
        MessageType::RollbackBetCancel => {
            Body::RollbackBetCancel(from_xml::<feed::RollbackXml>(what, raw)?.into())
        }
        MessageType::FixtureChange => {
            Body::FixtureChange(from_xml::<feed::FixtureChangeXml>(what, raw)?.into())
        }
        _ => return Ok(None),
    };
    Ok(Some(body))
}

/// `market_descriptions` document (catalogue or single variant)
pub fn decode_markets(raw: &[u8]) -> Result<Vec<MarketDescription>, DecodeError> {
    Ok(from_xml::<api::MarketDescriptionsXml>("market_descriptions", raw)?.into_markets())
}

/// `fixtures_fixture` document
pub fn decode_fixture(raw: &[u8]) -> Result<Fixture, DecodeError> {
    Ok(from_xml::<api::FixtureDocumentXml>("fixtures_fixture", raw)?
        .fixture
        .into())
}

/// `schedule` document, live or prematch
pub fn decode_schedule(raw: &[u8]) -> Result<Vec<Fixture>, DecodeError> {
    Ok(from_xml::<api::ScheduleXml>("schedule", raw)?
        .events
        .into_iter()
        .map(Fixture::from)
        .collect())
}

/// `player_profile` document
pub fn decode_player(raw: &[u8]) -> Result<Player, DecodeError> {
    Ok(from_xml::<api::PlayerProfileXml>("player_profile", raw)?.into())
}

/// `competitor_profile` document
pub fn decode_competitor(raw: &[u8]) -> Result<Competitor, DecodeError> {
    Ok(from_xml::<api::CompetitorProfileXml>("competitor_profile", raw)?.into())
}
