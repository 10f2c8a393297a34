//! Broker events to messages
//!
//! First stage of every pipeline: turns the broker client's events into
//! [`Message`]s. Connection changes become synthetic connection messages,
//! deliveries are routed and decoded, transport errors go to the fan-in.

use super::stage::{MessageSender, StageContext};
use crate::codec;
use crate::domain::{parse_routing_key, ConnectionStatus, Message};
use crate::error::{DecodeError, FeedError, Severity};
use chrono::Utc;
use feedlink::{ClientEvent, Delivery};
use tokio::sync::mpsc;
use tracing::{debug, info};

pub(crate) const NAME: &str = "decoder";

/// Current time in milliseconds since epoch
pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Route and decode one delivery
pub fn decode(delivery: &Delivery, received_at: i64) -> Result<Message, DecodeError> {
    let header = parse_routing_key(&delivery.routing_key, received_at)?;
    let body = codec::decode_body(header.message_type, &delivery.body)?;
    Ok(Message::new(header, delivery.body.clone(), body))
}

pub(crate) async fn run(
    ctx: StageContext,
    mut events: mpsc::Receiver<ClientEvent>,
    output: MessageSender,
) {
    loop {
        let event = tokio::select! {
            biased;
            _ = ctx.shutdown().cancelled() => break,
            event = events.recv() => match event {
                Some(event) => event,
                None => break,
            },
        };

        let msg = match event {
            ClientEvent::Connected => {
                info!("Broker connection up");
                Message::connection(ConnectionStatus::Up, now_ms())
            }
            ClientEvent::Disconnected => {
                info!("Broker connection down");
                Message::connection(ConnectionStatus::Down, now_ms())
            }
            ClientEvent::Reconnecting(attempt) => {
                debug!(attempt, "Reconnecting to broker");
                continue;
            }
            ClientEvent::Error(e) => {
                let severity = if e.is_terminal() {
                    Severity::Notice
                } else {
                    Severity::Log
                };
                ctx.report(FeedError::new(severity, "broker", e));
                continue;
            }
            ClientEvent::Delivery(delivery) => {
                let received_at = delivery.timestamp.unwrap_or_else(now_ms);
                match decode(&delivery, received_at) {
                    Ok(msg) => msg,
                    Err(e) => {
                        ctx.log(NAME, e);
                        continue;
                    }
                }
            }
        };

        if !ctx.forward(&output, msg).await {
            break;
        }
    }
    debug!("Decoder stopped");
}
