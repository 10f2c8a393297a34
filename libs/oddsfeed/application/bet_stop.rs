//! Bet-stop market ids
//!
//! Bet stops name market groups. The stage keeps a group → market id table
//! built from the latest full catalogue in the primary language and fills
//! `market_ids` of every bet stop before forwarding it.

use super::stage::{MessageReceiver, MessageSender, Stage, StageContext};
use crate::domain::{market, Body, Lang, MarketDescription, MarketDescriptions, Message};
use async_trait::async_trait;
use std::collections::HashMap;
use tracing::debug;

const NAME: &str = "bet_stop";
/// Implicit group of every market, never resolved
const ALL_GROUP: &str = "all";

/// Group label → market ids
#[derive(Debug, Default, Clone)]
pub struct GroupTable {
    groups: HashMap<String, Vec<u64>>,
}

impl GroupTable {
    pub fn build(markets: &[MarketDescription]) -> Self {
        let mut groups: HashMap<String, Vec<u64>> = HashMap::new();
        for m in markets {
            for group in m.groups.iter().filter(|g| g.as_str() != ALL_GROUP) {
                groups.entry(group.clone()).or_default().push(m.id);
            }
        }
        Self { groups }
    }

    /// Sorted, unique market ids of every named group
    ///
    /// Unknown groups resolve to nothing; the result may be empty.
    pub fn resolve(&self, names: &[String]) -> Vec<u64> {
        let ids = names
            .iter()
            .filter_map(|name| self.groups.get(name))
            .flatten()
            .copied()
            .collect();
        market::dedup(ids)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

pub struct BetStopStage {
    primary: Option<Lang>,
    table: GroupTable,
}

impl BetStopStage {
    /// The first language is the one whose catalogue feeds the table
    pub fn new(languages: &[Lang]) -> Self {
        Self {
            primary: languages.first().copied(),
            table: GroupTable::default(),
        }
    }

    fn refresh(&mut self, lang: Option<Lang>, markets: &MarketDescriptions) {
        if !markets.complete || lang != self.primary {
            return;
        }
        self.table = GroupTable::build(&markets.markets);
        debug!(groups = self.table.len(), "Market groups rebuilt");
    }

    fn enrich(&self, msg: &mut Message) {
        if let Some(Body::BetStop(stop)) = &mut msg.body {
            stop.market_ids = self.table.resolve(&stop.groups);
        }
    }
}

#[async_trait]
impl Stage for BetStopStage {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(self: Box<Self>, ctx: StageContext, mut input: MessageReceiver, output: MessageSender) {
        let mut stage = *self;
        while let Some(mut msg) = ctx.recv(&mut input).await {
            if let Some(Body::Markets(markets)) = &msg.body {
                stage.refresh(msg.header.lang, markets);
            }
            stage.enrich(&mut msg);
            if !ctx.forward(&output, msg).await {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BetStop, Header, MarketStatus, MessageType, Scope, Urn};
    use feedlink::ShutdownSignal;
    use tokio::sync::mpsc;

    fn description(id: u64, groups: &[&str]) -> MarketDescription {
        MarketDescription {
            id,
            name: format!("market {}", id),
            groups: groups.iter().map(|g| g.to_string()).collect(),
            variant: None,
            outcomes: Vec::new(),
            specifiers: Vec::new(),
        }
    }

    /// 217 regular play markets, one penalties market and 54 corners or
    /// 15 minute markets
    fn catalogue() -> Vec<MarketDescription> {
        let mut markets: Vec<_> = (1..=217).map(|id| description(id, &["all", "regular_play"])).collect();
        markets.push(description(300, &["all", "penalties"]));
        markets.extend((400..430).map(|id| description(id, &["all", "corners"])));
        markets.extend((500..523).map(|id| description(id, &["all", "15_min"])));
        // in two groups at once
        markets.push(description(600, &["corners", "15_min"]));
        markets
    }

    fn groups(names: &[&str]) -> Vec<String> {
        names.iter().map(|g| g.to_string()).collect()
    }

    fn bet_stop(names: &[&str]) -> Message {
        let stop = BetStop {
            product: 1,
            event_urn: Urn::event(1),
            timestamp: 1,
            request_id: None,
            groups: groups(names),
            market_status: MarketStatus::Suspended,
            market_ids: Vec::new(),
        };
        let mut header = Header::new(MessageType::BetStop, Scope::Live, 1);
        header.event_id = Some(1);
        Message::new(header, Vec::new(), Some(Body::BetStop(stop)))
    }

    fn market_ids(msg: &Message) -> &[u64] {
        match &msg.body {
            Some(Body::BetStop(stop)) => &stop.market_ids,
            other => panic!("expected bet stop, got {:?}", other),
        }
    }

    #[test]
    fn test_group_resolution() {
        let table = GroupTable::build(&catalogue());
        assert_eq!(table.resolve(&groups(&["regular_play"])).len(), 217);
        assert_eq!(table.resolve(&groups(&["regular_play", "penalties"])).len(), 218);
        assert_eq!(table.resolve(&groups(&["corners", "15_min"])).len(), 54);
        assert!(table.resolve(&groups(&["all"])).is_empty());
        assert!(table.resolve(&groups(&["unknown"])).is_empty());

        let ids = table.resolve(&groups(&["15_min", "corners"]));
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_only_primary_catalogue_is_used() {
        let mut stage = BetStopStage::new(&[Lang::En, Lang::De]);
        stage.refresh(Some(Lang::De), &MarketDescriptions::catalogue(catalogue()));
        assert!(stage.table.is_empty());

        stage.refresh(Some(Lang::En), &MarketDescriptions::variant(catalogue()));
        assert!(stage.table.is_empty());

        stage.refresh(Some(Lang::En), &MarketDescriptions::catalogue(catalogue()));
        assert!(!stage.table.is_empty());
    }

    #[tokio::test]
    async fn test_stage_fills_market_ids() {
        let (errors, _errors_rx) = mpsc::unbounded_channel();
        let ctx = StageContext::new(NAME, ShutdownSignal::new(), errors);
        let (in_tx, in_rx) = mpsc::channel(8);
        let (out_tx, mut out_rx) = mpsc::channel(8);
        let stage = Box::new(BetStopStage::new(&[Lang::En]));
        let handle = tokio::spawn(stage.run(ctx, in_rx, out_tx));

        // no catalogue yet
        in_tx.send(bet_stop(&["regular_play"])).await.unwrap();
        let msg = out_rx.recv().await.unwrap();
        assert!(market_ids(&msg).is_empty());

        let markets = Message::markets(Lang::En, MarketDescriptions::catalogue(catalogue()), 2);
        in_tx.send(markets).await.unwrap();
        assert!(out_rx.recv().await.unwrap().is(MessageType::Markets));

        in_tx.send(bet_stop(&["regular_play"])).await.unwrap();
        assert_eq!(market_ids(&out_rx.recv().await.unwrap()).len(), 217);
        in_tx.send(bet_stop(&["regular_play", "penalties"])).await.unwrap();
        assert_eq!(market_ids(&out_rx.recv().await.unwrap()).len(), 218);

        drop(in_tx);
        handle.await.unwrap();
        assert!(out_rx.recv().await.is_none());
    }
}
