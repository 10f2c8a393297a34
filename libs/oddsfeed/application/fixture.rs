//! Fixture refresh and preload

use super::decoder::now_ms;
use super::enrich::Enricher;
use super::stage::{MessageReceiver, MessageSender, Stage, StageContext, TaskPool};
use crate::domain::{Body, Fixture, Header, Lang, Message, Urn};
use crate::infrastructure::{ExpiringMap, FeedApi, RateLimiter};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const NAME: &str = "fixture";
const DEBOUNCE: Duration = Duration::from_secs(60);
const SCHEDULE_PAGE: usize = 1000;

/// Re-fetches the fixture of every fixture change, per language
///
/// Requests for the same event and language are debounced for a minute.
/// With a preload cutoff the stage also loads the live schedule and every
/// prematch fixture starting before the cutoff when it starts.
pub struct FixtureStage {
    api: Arc<dyn FeedApi>,
    languages: Vec<Lang>,
    preload_to: Option<DateTime<Utc>>,
    fixtures: Enricher<(Urn, Lang)>,
}

impl FixtureStage {
    pub fn new(api: Arc<dyn FeedApi>, languages: Vec<Lang>, limiter: RateLimiter) -> Self {
        Self {
            api,
            languages,
            preload_to: None,
            fixtures: Enricher::new(DEBOUNCE, limiter),
        }
    }

    pub fn with_preload(mut self, to: Option<DateTime<Utc>>) -> Self {
        self.preload_to = to;
        self
    }

    fn spawn_preload(&self, ctx: &StageContext, pool: &mut TaskPool, output: &MessageSender) {
        let Some(to) = self.preload_to else {
            return;
        };
        for &lang in &self.languages {
            let preload = Preload {
                api: Arc::clone(&self.api),
                limiter: self.fixtures.limiter().clone(),
                debounce: Arc::clone(self.fixtures.cache()),
                ctx: ctx.clone(),
                output: output.clone(),
                lang,
                to,
            };
            pool.spawn(preload.run());
        }
    }

    fn refresh(
        &self,
        ctx: &StageContext,
        pool: &mut TaskPool,
        output: &MessageSender,
        source: &Header,
        urn: &Urn,
    ) {
        for &lang in &self.languages {
            let api = Arc::clone(&self.api);
            let owned = urn.clone();
            let header = source.clone();
            self.fixtures.fetch(
                ctx,
                pool,
                output,
                (urn.clone(), lang),
                "fixture",
                move || async move { api.fixture(lang, &owned).await },
                move |fixture| Message::fixture_for(&header, lang, fixture),
            );
        }
    }
}

struct Preload {
    api: Arc<dyn FeedApi>,
    limiter: RateLimiter,
    debounce: Arc<ExpiringMap<(Urn, Lang)>>,
    ctx: StageContext,
    output: MessageSender,
    lang: Lang,
    to: DateTime<Utc>,
}

impl Preload {
    async fn run(self) {
        let mut loaded = 0;

        match self.live().await {
            Ok(fixtures) => {
                for fixture in fixtures {
                    if !self.emit(fixture).await {
                        return;
                    }
                    loaded += 1;
                }
            }
            Err(e) => self.ctx.notice("preload", e),
        }

        let mut start = 0;
        loop {
            let page = match self.page(start).await {
                Ok(page) => page,
                Err(e) => {
                    self.ctx.notice("preload", e);
                    break;
                }
            };
            if page.is_empty() {
                break;
            }
            start += page.len();

            let mut before_cutoff = false;
            for fixture in page {
                if fixture.starts_at().is_some_and(|at| at > self.to) {
                    continue;
                }
                before_cutoff = true;
                if !self.emit(fixture).await {
                    return;
                }
                loaded += 1;
            }
            if !before_cutoff {
                break;
            }
        }

        info!(lang = %self.lang, fixtures = loaded, to = %self.to, "Fixtures preloaded");
    }

    async fn live(&self) -> Result<Vec<Fixture>, crate::error::ApiError> {
        let _permit = self.limiter.acquire().await;
        self.api.live_schedule(self.lang).await
    }

    async fn page(&self, start: usize) -> Result<Vec<Fixture>, crate::error::ApiError> {
        let _permit = self.limiter.acquire().await;
        debug!(lang = %self.lang, start, "Loading schedule page");
        self.api.schedule(self.lang, start, SCHEDULE_PAGE).await
    }

    async fn emit(&self, fixture: Fixture) -> bool {
        self.debounce.insert((fixture.urn.clone(), self.lang));
        self.ctx
            .forward(&self.output, Message::fixture(self.lang, fixture, now_ms()))
            .await
    }
}

#[async_trait]
impl Stage for FixtureStage {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn run(self: Box<Self>, ctx: StageContext, mut input: MessageReceiver, output: MessageSender) {
        let mut pool = ctx.pool();
        let sweeper = self.fixtures.spawn_sweeper(ctx.shutdown().clone());
        self.spawn_preload(&ctx, &mut pool, &output);

        while let Some(msg) = ctx.recv(&mut input).await {
            let changed = match &msg.body {
                Some(Body::FixtureChange(change)) => {
                    Some((msg.header.clone(), change.event_urn.clone()))
                }
                _ => None,
            };
            if !ctx.forward(&output, msg).await {
                break;
            }
            if let Some((header, urn)) = changed {
                self.refresh(&ctx, &mut pool, &output, &header, &urn);
            }
        }

        pool.drain().await;
        sweeper.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Competitor, FixtureChange, MarketDescription, MessageKind, MessageType, Player, Producer,
        Scope,
    };
    use crate::error::ApiError;
    use feedlink::ShutdownSignal;
    use parking_lot::Mutex;
    use tokio::sync::mpsc;

    /// Schedule API serving fixed pages
    struct PagedApi {
        live: Vec<Fixture>,
        pages: Vec<Vec<Fixture>>,
        starts: Mutex<Vec<usize>>,
        fetched: Mutex<Vec<Urn>>,
    }

    fn fixture_at(id: u64, at: DateTime<Utc>) -> Fixture {
        Fixture {
            urn: Urn::event(id),
            name: String::new(),
            scheduled: Some(at),
            start_time: None,
            status: None,
            tournament: None,
            competitors: vec![],
        }
    }

    #[async_trait]
    impl FeedApi for PagedApi {
        async fn markets(&self, _: Lang) -> Result<Vec<MarketDescription>, ApiError> {
            Ok(vec![])
        }
        async fn market_variant(&self, _: Lang, _: u64, _: &str) -> Result<Vec<MarketDescription>, ApiError> {
            Ok(vec![])
        }
        async fn fixture(&self, _: Lang, urn: &Urn) -> Result<Fixture, ApiError> {
            self.fetched.lock().push(urn.clone());
            Ok(fixture_at(urn.id(), Utc::now()))
        }
        async fn live_schedule(&self, _: Lang) -> Result<Vec<Fixture>, ApiError> {
            Ok(self.live.clone())
        }
        async fn schedule(&self, _: Lang, start: usize, _: usize) -> Result<Vec<Fixture>, ApiError> {
            let mut starts = self.starts.lock();
            let page = self.pages.get(starts.len()).cloned().unwrap_or_default();
            starts.push(start);
            Ok(page)
        }
        async fn player(&self, _: Lang, _: u64) -> Result<Player, ApiError> {
            Err(ApiError::status("GET", "/players", 404, ""))
        }
        async fn competitor(&self, _: Lang, _: u64) -> Result<Competitor, ApiError> {
            Err(ApiError::status("GET", "/competitors", 404, ""))
        }
        async fn request_recovery(&self, _: Producer, _: i64, _: u64, _: Option<i64>) -> Result<(), ApiError> {
            Ok(())
        }
    }

    fn fixture_ids(messages: &[Message]) -> Vec<u64> {
        messages
            .iter()
            .filter_map(|m| match &m.body {
                Some(Body::Fixture(f)) => Some(f.id()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_preload_pages_until_cutoff() {
        let now = Utc::now();
        let hour = chrono::Duration::hours(1);
        let api = Arc::new(PagedApi {
            live: vec![fixture_at(1, now - hour)],
            pages: vec![
                vec![fixture_at(2, now + hour), fixture_at(3, now + hour * 5)],
                vec![fixture_at(4, now + hour * 6)],
                vec![fixture_at(5, now + hour)],
            ],
            starts: Mutex::new(vec![]),
            fetched: Mutex::new(vec![]),
        });

        let (errors_tx, _errors) = mpsc::unbounded_channel();
        let ctx = StageContext::new(NAME, ShutdownSignal::new(), errors_tx);
        let stage = FixtureStage::new(api.clone(), vec![Lang::En], RateLimiter::new(2))
            .with_preload(Some(now + hour * 2));
        let (input_tx, input_rx) = mpsc::channel(8);
        let (output_tx, mut output_rx) = mpsc::channel(8);
        let handle = tokio::spawn(Box::new(stage).run(ctx, input_rx, output_tx));

        drop(input_tx);
        handle.await.unwrap();

        let mut messages = vec![];
        while let Ok(msg) = output_rx.try_recv() {
            messages.push(msg);
        }
        assert_eq!(fixture_ids(&messages), vec![1, 2]);
        assert!(messages.iter().all(|m| m.header.kind == MessageKind::Lexicon));
        assert_eq!(*api.starts.lock(), vec![0, 2]);
    }

    #[tokio::test]
    async fn test_change_refreshes_fixture_once_per_language() {
        let api = Arc::new(PagedApi {
            live: vec![],
            pages: vec![],
            starts: Mutex::new(vec![]),
            fetched: Mutex::new(vec![]),
        });

        let (errors_tx, _errors) = mpsc::unbounded_channel();
        let ctx = StageContext::new(NAME, ShutdownSignal::new(), errors_tx);
        let stage = FixtureStage::new(api.clone(), vec![Lang::En, Lang::De], RateLimiter::new(2));
        let (input_tx, input_rx) = mpsc::channel(8);
        let (output_tx, mut output_rx) = mpsc::channel(16);
        let handle = tokio::spawn(Box::new(stage).run(ctx, input_rx, output_tx));

        let change = |ts| {
            let mut header = Header::new(MessageType::FixtureChange, Scope::Prematch, ts);
            header.event_urn = Some(Urn::event(9));
            header.event_id = Some(9);
            Message::new(
                header,
                Vec::new(),
                Some(Body::FixtureChange(FixtureChange {
                    product: 3,
                    event_urn: Urn::event(9),
                    timestamp: ts,
                    request_id: None,
                    change_type: None,
                    start_time: None,
                })),
            )
        };
        input_tx.send(change(1)).await.unwrap();
        input_tx.send(change(2)).await.unwrap();
        drop(input_tx);
        handle.await.unwrap();

        let mut messages = vec![];
        while let Ok(msg) = output_rx.try_recv() {
            messages.push(msg);
        }
        let fixtures: Vec<_> = messages
            .iter()
            .filter(|m| matches!(m.body, Some(Body::Fixture(_))))
            .collect();
        assert_eq!(fixtures.len(), 2);
        assert!(fixtures.iter().all(|m| m.header.event_id == Some(9)));
        assert_eq!(api.fetched.lock().len(), 2);
    }
}
