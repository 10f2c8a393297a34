//! Routing key grammar
//!
//! `priority.prematchInterest.liveInterest.messageType.sportID.eventURNPrefix.eventID[.nodeID]`
//! where `-` marks a field that does not apply.

use super::message::{Header, MessageType, Priority, Scope};
use super::urn::Urn;
use crate::error::DecodeError;

const NONE: &str = "-";

/// Parse a routing key into a message header
pub fn parse_routing_key(key: &str, received_at: i64) -> Result<Header, DecodeError> {
    let fields: Vec<&str> = key.split('.').collect();
    if fields.len() != 7 && fields.len() != 8 {
        return Err(DecodeError::routing(
            key,
            format!("expected 7 or 8 fields, found {}", fields.len()),
        ));
    }

    let message_type = MessageType::from_routing(fields[3])
        .ok_or_else(|| DecodeError::routing(key, format!("unknown message type {:?}", fields[3])))?;

    let scope = match (fields[1], fields[2]) {
        ("pre", "live") => Scope::PrematchAndLive,
        ("pre", NONE) => Scope::Prematch,
        (NONE, "live") => Scope::Live,
        ("virt", NONE) => Scope::Virtuals,
        (NONE, NONE) => Scope::System,
        (pre, live) => {
            return Err(DecodeError::routing(
                key,
                format!("unknown interest {}.{}", pre, live),
            ))
        }
    };

    let mut header = Header::new(message_type, scope, received_at);
    header.priority = if fields[0] == "hi" {
        Priority::High
    } else {
        Priority::Low
    };
    header.sport_id = optional_number(key, fields[4], "sport id")?;

    let (prefix, event_id) = (fields[5], fields[6]);
    if prefix != NONE && event_id != NONE && !prefix.is_empty() && !event_id.is_empty() {
        let id: u64 = event_id
            .parse()
            .map_err(|_| DecodeError::routing(key, format!("bad event id {:?}", event_id)))?;
        header.event_id = Some(id);
        header.event_urn = Some(Urn::from_raw(format!("{}:{}", prefix, id)));
    }

    if let Some(node) = fields.get(7) {
        header.node_id = optional_number(key, node, "node id")?;
    }

    Ok(header)
}

fn optional_number<T: std::str::FromStr>(
    key: &str,
    field: &str,
    what: &str,
) -> Result<Option<T>, DecodeError> {
    if field == NONE || field.is_empty() {
        return Ok(None);
    }
    field
        .parse()
        .map(Some)
        .map_err(|_| DecodeError::routing(key, format!("bad {} {:?}", what, field)))
}

/// Render a header back into its eight-field routing key
pub fn encode_routing_key(header: &Header) -> String {
    let priority = match header.priority {
        Priority::High => "hi",
        Priority::Low => "lo",
    };
    let (pre, live) = match header.scope {
        Scope::PrematchAndLive => ("pre", "live"),
        Scope::Prematch => ("pre", NONE),
        Scope::Live => (NONE, "live"),
        Scope::Virtuals => ("virt", NONE),
        Scope::System => (NONE, NONE),
    };
    let sport = header
        .sport_id
        .map(|s| s.to_string())
        .unwrap_or_else(|| NONE.to_string());
    let (prefix, event_id) = match (&header.event_urn, header.event_id) {
        (Some(urn), Some(id)) => {
            let raw = urn.as_str();
            let prefix = raw.rsplit_once(':').map(|(p, _)| p).unwrap_or(raw);
            (prefix.to_string(), id.to_string())
        }
        _ => (NONE.to_string(), NONE.to_string()),
    };
    let node = header
        .node_id
        .map(|n| n.to_string())
        .unwrap_or_else(|| NONE.to_string());

    format!(
        "{}.{}.{}.{}.{}.{}.{}.{}",
        priority,
        pre,
        live,
        header.message_type.as_str(),
        sport,
        prefix,
        event_id,
        node
    )
}
