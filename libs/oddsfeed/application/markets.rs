//! Market descriptions
//!
//! The full catalogue is fetched once per language when the stage starts;
//! a failed language is retried on the next message. Odds changes naming a concrete `variant` specifier trigger a variant
//! lookup per language, at most once per day and key.

use super::decoder::now_ms;
use super::enrich::Enricher;
use super::stage::{MessageReceiver, MessageSender, Stage, StageContext, TaskPool};
use crate::domain::{Body, Lang, MarketDescriptions, Message, OddsChange};
use crate::infrastructure::{FeedApi, RateLimiter};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const NAME: &str = "markets";
const VARIANT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
/// The variant endpoint returns nothing usable for these
const UNSUPPORTED_VARIANT: &str = "pre:playerprops";

pub struct MarketsStage {
    api: Arc<dyn FeedApi>,
    languages: Vec<Lang>,
    catalogues: Enricher<Lang>,
    variants: Enricher<(u64, String, Lang)>,
}

impl MarketsStage {
    pub fn new(api: Arc<dyn FeedApi>, languages: Vec<Lang>, limiter: RateLimiter) -> Self {
        Self {
            api,
            languages,
            catalogues: Enricher::new(Duration::MAX, limiter.clone()),
            variants: Enricher::new(VARIANT_TTL, limiter),
        }
    }

    /// Languages whose catalogue is loaded or loading are skipped
    fn fetch_catalogues(&self, ctx: &StageContext, pool: &mut TaskPool, output: &MessageSender) {
        for &lang in &self.languages {
            let api = Arc::clone(&self.api);
            self.catalogues.fetch(
                ctx,
                pool,
                output,
                lang,
                "markets",
                move || async move { api.markets(lang).await },
                move |markets| {
                    info!(lang = %lang, markets = markets.len(), "Market catalogue loaded");
                    Message::markets(lang, MarketDescriptions::catalogue(markets), now_ms())
                },
            );
        }
    }

    fn fetch_variants(
        &self,
        ctx: &StageContext,
        pool: &mut TaskPool,
        output: &MessageSender,
        variants: Vec<(u64, String)>,
    ) {
        for (market_id, variant) in variants {
            for &lang in &self.languages {
                let api = Arc::clone(&self.api);
                let owned = variant.clone();
                self.variants.fetch(
                    ctx,
                    pool,
                    output,
                    (market_id, variant.clone(), lang),
                    "market_variant",
                    move || async move { api.market_variant(lang, market_id, &owned).await },
                    move |markets| {
                        Message::markets(lang, MarketDescriptions::variant(markets), now_ms())
                    },
                );
            }
        }
    }
}

/// Concrete variants referenced by an odds change
fn variants(odds: &OddsChange) -> Vec<(u64, String)> {
    let mut out = Vec::new();
    for market in &odds.markets {
        let Some(variant) = market.variant() else {
            continue;
        };
        if variant.starts_with(UNSUPPORTED_VARIANT) {
            debug!(market = market.id, variant, "Skipping player props variant");
            continue;
        }
        let entry = (market.id, variant.to_string());
        if !out.contains(&entry) {
            out.push(entry);
        }
    }
    out
}

#[async_trait]
impl Stage for MarketsStage {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(self: Box<Self>, ctx: StageContext, mut input: MessageReceiver, output: MessageSender) {
        let mut pool = ctx.pool();
        let sweeper = self.variants.spawn_sweeper(ctx.shutdown().clone());
        self.fetch_catalogues(&ctx, &mut pool, &output);

        while let Some(msg) = ctx.recv(&mut input).await {
            let wanted = match &msg.body {
                Some(Body::OddsChange(odds)) => variants(odds),
                _ => Vec::new(),
            };
            if !ctx.forward(&output, msg).await {
                break;
            }
            self.fetch_catalogues(&ctx, &mut pool, &output);
            if !wanted.is_empty() {
                self.fetch_variants(&ctx, &mut pool, &output, wanted);
            }
        }

        pool.drain().await;
        sweeper.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::domain::market::parse_specifiers;
    use crate::domain::{Market, MarketStatus, Urn};

    fn market(id: u64, specifiers: &str) -> Market {
        Market {
            id,
            line_id: 0,
            specifiers: parse_specifiers(specifiers),
            status: MarketStatus::Active,
            favourite: false,
            outcomes: vec![],
        }
    }

    #[test]
    fn test_variants_of_odds_change() {
        let odds = OddsChange {
            product: 1,
            event_urn: Urn::event(1),
            timestamp: 0,
            request_id: None,
            odds_change_reason: None,
            betting_status: None,
            betstop_reason: None,
            sport_event_status: None,
            markets: vec![
                market(18, "total=2.5"),
                market(100, "variant=sr:exact_goals:4+"),
                market(100, "variant=sr:exact_goals:4+|total=1"),
                market(101, "variant={variant}"),
                market(102, "variant=pre:playerprops:35432:830"),
                market(103, "variant=sr:correct_score:after:2"),
            ],
        };
        assert_eq!(
            variants(&odds),
            vec![
                (100, "sr:exact_goals:4+".to_string()),
                (103, "sr:correct_score:after:2".to_string()),
            ]
        );
    }
}
