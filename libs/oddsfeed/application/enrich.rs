//! Deduplicated API fetches shared by the enrichment stages

use super::stage::{MessageSender, StageContext, TaskPool};
use crate::domain::Message;
use crate::error::ApiError;
use crate::infrastructure::{ExpiringMap, RateLimiter};
use feedlink::ShutdownSignal;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Cache plus rate limiter of one stage
pub(crate) struct Enricher<K> {
    cache: Arc<ExpiringMap<K>>,
    limiter: RateLimiter,
}

impl<K> Enricher<K>
where
    K: Eq + Hash + Clone + std::fmt::Debug + Send + Sync + 'static,
{
    pub(crate) fn new(ttl: Duration, limiter: RateLimiter) -> Self {
        Self {
            cache: Arc::new(ExpiringMap::new(ttl)),
            limiter,
        }
    }

    pub(crate) fn cache(&self) -> &Arc<ExpiringMap<K>> {
        &self.cache
    }

    pub(crate) fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub(crate) fn spawn_sweeper(&self, shutdown: ShutdownSignal) -> JoinHandle<()> {
        self.cache.spawn_sweeper(self.cache.ttl(), shutdown)
    }

    /// Fetch `key` unless it is fresh, forwarding the wrapped result
    ///
    /// The key is committed only after a successful call and released on
    /// failure, so a later trigger retries.
    pub(crate) fn fetch<T, C, Fut, W>(
        &self,
        ctx: &StageContext,
        pool: &mut TaskPool,
        output: &MessageSender,
        key: K,
        op: &'static str,
        call: C,
        wrap: W,
    ) where
        C: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
        T: Send + 'static,
        W: FnOnce(T) -> Message + Send + 'static,
    {
        if !self.cache.try_claim(key.clone()) {
            return;
        }
        debug!(stage = ctx.name(), key = ?key, "Fetching");

        let request = call();
        let cache = Arc::clone(&self.cache);
        let limiter = self.limiter.clone();
        let ctx = ctx.clone();
        let output = output.clone();
        pool.spawn(async move {
            let Some(_permit) = limiter.acquire().await else {
                cache.release(&key);
                return;
            };
            match request.await {
                Ok(value) => {
                    cache.commit(key);
                    ctx.forward(&output, wrap(value)).await;
                }
                Err(e) => {
                    cache.release(&key);
                    ctx.log(op, e);
                }
            }
        });
    }
}
