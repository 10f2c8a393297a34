//! Provider HTTP API
//!
//! [`FeedApi`] is the seam the enrichment stages and the recovery engine
//! call through; [`HttpApi`] is the reqwest implementation. Tests swap in
//! recording doubles.

use super::environment::Environment;
use crate::codec;
use crate::domain::{Competitor, Fixture, Lang, MarketDescription, Player, Producer, Urn};
use crate::error::{ApiError, DecodeError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

const ACCESS_TOKEN_HEADER: &str = "x-access-token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub type Result<T> = std::result::Result<T, ApiError>;

/// Calls the SDK makes against the provider's API
#[async_trait]
pub trait FeedApi: Send + Sync + 'static {
    /// Full market description catalogue
    async fn markets(&self, lang: Lang) -> Result<Vec<MarketDescription>>;

    /// Descriptions of one market variant
    async fn market_variant(
        &self,
        lang: Lang,
        market_id: u64,
        variant: &str,
    ) -> Result<Vec<MarketDescription>>;

    async fn fixture(&self, lang: Lang, urn: &Urn) -> Result<Fixture>;

    /// Events currently live
    async fn live_schedule(&self, lang: Lang) -> Result<Vec<Fixture>>;

    /// One page of the prematch schedule
    async fn schedule(&self, lang: Lang, start: usize, limit: usize) -> Result<Vec<Fixture>>;

    async fn player(&self, lang: Lang, id: u64) -> Result<Player>;

    async fn competitor(&self, lang: Lang, id: u64) -> Result<Competitor>;

    /// Ask `producer` to replay messages since `after` (0 for a full snapshot)
    async fn request_recovery(
        &self,
        producer: Producer,
        after: i64,
        request_id: u64,
        node_id: Option<i64>,
    ) -> Result<()>;
}

/// reqwest client for the provider API
#[derive(Debug, Clone)]
pub struct HttpApi {
    base_url: String,
    token: String,
    client: Client,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self::with_client(base_url, token, client)
    }

    pub fn for_environment(env: Environment, token: impl Into<String>) -> Self {
        Self::new(env.api_url(), token)
    }

    pub fn with_client(base_url: impl Into<String>, token: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T>(&self, path: String, decode: fn(&[u8]) -> std::result::Result<T, DecodeError>) -> Result<T> {
        let url = self.url(&path);
        debug!(url = %url, "GET");

        let response = self
            .client
            .get(&url)
            .header(ACCESS_TOKEN_HEADER, &self.token)
            .send()
            .await
            .map_err(|e| ApiError::transport("GET", url.clone(), e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| ApiError::transport("GET", url.clone(), e))?;

        if status != StatusCode::OK {
            return Err(ApiError::status(
                "GET",
                url,
                status.as_u16(),
                String::from_utf8_lossy(&body),
            ));
        }

        decode(&body).map_err(|e| ApiError::decode("GET", url, String::from_utf8_lossy(&body), e))
    }

    fn recovery_path(producer: Producer, after: i64, request_id: u64, node_id: Option<i64>) -> String {
        let mut path = format!("/v1/{}/recovery/initiate_request?", producer.code());
        if after > 0 {
            path.push_str(&format!("after={}&", after));
        }
        path.push_str(&format!("request_id={}", request_id));
        if let Some(node_id) = node_id {
            path.push_str(&format!("&node_id={}", node_id));
        }
        path
    }
}

#[async_trait]
impl FeedApi for HttpApi {
    async fn markets(&self, lang: Lang) -> Result<Vec<MarketDescription>> {
        self.get(
            format!("/v1/descriptions/{}/markets.xml?include_mappings=false", lang),
            codec::decode_markets,
        )
        .await
    }

    async fn market_variant(
        &self,
        lang: Lang,
        market_id: u64,
        variant: &str,
    ) -> Result<Vec<MarketDescription>> {
        self.get(
            format!(
                "/v1/descriptions/{}/markets/{}/variants/{}?include_mappings=false",
                lang, market_id, variant
            ),
            codec::decode_markets,
        )
        .await
    }

    async fn fixture(&self, lang: Lang, urn: &Urn) -> Result<Fixture> {
        self.get(
            format!("/v1/sports/{}/sport_events/{}/fixture.xml", lang, urn),
            codec::decode_fixture,
        )
        .await
    }

    async fn live_schedule(&self, lang: Lang) -> Result<Vec<Fixture>> {
        self.get(
            format!("/v1/sports/{}/schedules/live/schedule.xml", lang),
            codec::decode_schedule,
        )
        .await
    }

    async fn schedule(&self, lang: Lang, start: usize, limit: usize) -> Result<Vec<Fixture>> {
        self.get(
            format!(
                "/v1/sports/{}/schedules/pre/schedule.xml?start={}&limit={}",
                lang, start, limit
            ),
            codec::decode_schedule,
        )
        .await
    }

    async fn player(&self, lang: Lang, id: u64) -> Result<Player> {
        self.get(
            format!("/v1/sports/{}/players/{}/profile.xml", lang, Urn::player(id)),
            codec::decode_player,
        )
        .await
    }

    async fn competitor(&self, lang: Lang, id: u64) -> Result<Competitor> {
        self.get(
            format!("/v1/sports/{}/competitors/{}/profile.xml", lang, Urn::competitor(id)),
            codec::decode_competitor,
        )
        .await
    }

    async fn request_recovery(
        &self,
        producer: Producer,
        after: i64,
        request_id: u64,
        node_id: Option<i64>,
    ) -> Result<()> {
        let url = self.url(&Self::recovery_path(producer, after, request_id, node_id));
        debug!(url = %url, "POST");

        let response = self
            .client
            .post(&url)
            .header(ACCESS_TOKEN_HEADER, &self.token)
            .send()
            .await
            .map_err(|e| ApiError::transport("POST", url.clone(), e))?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::status("POST", url, status.as_u16(), body));
        }
        Ok(())
    }
}
