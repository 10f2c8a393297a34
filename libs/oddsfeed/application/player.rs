//! Player profiles referenced by odds changes

use super::decoder::now_ms;
use super::enrich::Enricher;
use super::stage::{MessageReceiver, MessageSender, Stage, StageContext};
use crate::domain::{uid_with_lang, Body, Lang, Message};
use crate::infrastructure::{FeedApi, RateLimiter};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

const NAME: &str = "player";
const PROFILE_TTL: Duration = Duration::from_secs(60 * 60);

pub struct PlayerStage {
    api: Arc<dyn FeedApi>,
    languages: Vec<Lang>,
    players: Enricher<u64>,
}

impl PlayerStage {
    pub fn new(api: Arc<dyn FeedApi>, languages: Vec<Lang>, limiter: RateLimiter) -> Self {
        Self {
            api,
            languages,
            players: Enricher::new(PROFILE_TTL, limiter),
        }
    }
}

#[async_trait]
impl Stage for PlayerStage {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(self: Box<Self>, ctx: StageContext, mut input: MessageReceiver, output: MessageSender) {
        let mut pool = ctx.pool();
        let sweeper = self.players.spawn_sweeper(ctx.shutdown().clone());

        while let Some(msg) = ctx.recv(&mut input).await {
            let ids = match &msg.body {
                Some(Body::OddsChange(odds)) => odds.player_ids(),
                _ => Vec::new(),
            };
            if !ctx.forward(&output, msg).await {
                break;
            }
            for id in ids {
                for &lang in &self.languages {
                    let api = Arc::clone(&self.api);
                    self.players.fetch(
                        &ctx,
                        &mut pool,
                        &output,
                        uid_with_lang(id, lang),
                        "player",
                        move || async move { api.player(lang, id).await },
                        move |player| Message::player(lang, player, now_ms()),
                    );
                }
            }
        }

        pool.drain().await;
        sweeper.abort();
    }
}
