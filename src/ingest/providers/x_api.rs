//! X API v2 read client: recent search and list timelines.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::histogram;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::ingest::types::{FeedReader, RawItem, ReadError};

pub const DEFAULT_BASE_URL: &str = "https://api.twitter.com";

const TWEET_FIELDS: &str = "created_at,public_metrics,entities";

/// Used when a 429 arrives without a usable reset header (one 15 min window).
const FALLBACK_RESET_SECS: i64 = 15 * 60;

#[derive(Debug, Deserialize)]
struct TweetsResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    #[serde(default)]
    id: String,
    #[serde(default)]
    text: String,
    created_at: Option<DateTime<Utc>>,
    public_metrics: Option<PublicMetrics>,
    entities: Option<Entities>,
}

#[derive(Debug, Deserialize)]
struct PublicMetrics {
    like_count: Option<u64>,
    retweet_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Entities {
    #[serde(default)]
    hashtags: Vec<Hashtag>,
}

#[derive(Debug, Deserialize)]
struct Hashtag {
    tag: String,
}

impl Tweet {
    fn into_raw(self, fetched_at: DateTime<Utc>) -> Option<RawItem> {
        if self.id.trim().is_empty() {
            return None;
        }
        let (like_count, repost_count) = match self.public_metrics {
            Some(m) => (m.like_count, m.retweet_count),
            None => (None, None),
        };
        let tags = self
            .entities
            .map(|e| e.hashtags.into_iter().map(|h| h.tag).collect::<Vec<_>>());
        Some(RawItem {
            external_id: self.id,
            text: self.text,
            like_count,
            repost_count,
            created_at: self.created_at.unwrap_or(fetched_at),
            tags,
        })
    }
}

pub struct XApiReader {
    client: reqwest::Client,
    base_url: String,
    bearer_token: String,
}

impl XApiReader {
    pub fn new(bearer_token: String) -> Self {
        let client = reqwest::Client::builder()
            .user_agent("donkee/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            bearer_token,
        }
    }

    /// Point the client at another host (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// `{base}/2/{segments...}` with each segment percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url, ReadError> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| ReadError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| ReadError::InvalidUrl(format!("{} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .push("2")
            .extend(segments);
        Ok(url)
    }

    async fn get_page(
        &self,
        url: reqwest::Url,
        params: &[(&str, String)],
    ) -> Result<(Vec<RawItem>, Option<String>), ReadError> {
        let t0 = std::time::Instant::now();
        let resp = self
            .client
            .get(url)
            .bearer_auth(&self.bearer_token)
            .query(params)
            .send()
            .await?;
        histogram!("ingest_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let reset_at = rate_limit_reset(resp.headers(), Utc::now());
            tracing::debug!(url = %resp.url(), %reset_at, "x api rate limited");
            return Err(ReadError::RateLimited { reset_at });
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ReadError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        let parsed: TweetsResponse = serde_json::from_str(&body)?;
        let now = Utc::now();
        let items: Vec<RawItem> = parsed
            .data
            .into_iter()
            .filter_map(|t| t.into_raw(now))
            .collect();
        let next = parsed
            .meta
            .and_then(|m| m.next_token)
            .filter(|t| !t.is_empty());
        Ok((items, next))
    }

    /// Follows pagination until `limit` posts are collected or the feed runs out.
    ///
    /// Each request asks for the remaining count, clamped to `page_bounds`
    /// (the endpoint's accepted `max_results` range). The cursor goes back
    /// under `cursor_param`. The result never exceeds `limit`.
    async fn get_tweets(
        &self,
        url: reqwest::Url,
        base_params: Vec<(&'static str, String)>,
        limit: u32,
        page_bounds: (u32, u32),
        cursor_param: &'static str,
    ) -> Result<Vec<RawItem>, ReadError> {
        let limit = limit as usize;
        let mut items: Vec<RawItem> = Vec::new();
        let mut cursor: Option<String> = None;

        while items.len() < limit {
            let remaining = (limit - items.len()) as u32;
            let mut params = base_params.clone();
            params.push((
                "max_results",
                remaining.clamp(page_bounds.0, page_bounds.1).to_string(),
            ));
            if let Some(token) = cursor.take() {
                params.push((cursor_param, token));
            }

            let (page, next) = self.get_page(url.clone(), &params).await?;
            let got = page.len();
            items.extend(page);
            match next {
                Some(token) if got > 0 => cursor = Some(token),
                _ => break,
            }
        }

        items.truncate(limit);
        Ok(items)
    }
}

#[async_trait]
impl FeedReader for XApiReader {
    async fn search(&self, query: &str, limit: u32) -> Result<Vec<RawItem>, ReadError> {
        let url = self.endpoint(&["tweets", "search", "recent"])?;
        let params = vec![
            ("query", query.to_string()),
            ("tweet.fields", TWEET_FIELDS.to_string()),
        ];
        self.get_tweets(url, params, limit, (10, 100), "next_token")
            .await
    }

    async fn read_list(&self, list_id: &str, limit: u32) -> Result<Vec<RawItem>, ReadError> {
        let url = self.endpoint(&["lists", list_id, "tweets"])?;
        let params = vec![("tweet.fields", TWEET_FIELDS.to_string())];
        self.get_tweets(url, params, limit, (1, 100), "pagination_token")
            .await
    }

    fn name(&self) -> &'static str {
        "x-api-v2"
    }
}

/// Reset instant from `x-rate-limit-reset` (unix seconds).
fn rate_limit_reset(headers: &HeaderMap, now: DateTime<Utc>) -> DateTime<Utc> {
    headers
        .get("x-rate-limit-reset")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(|| now + chrono::Duration::seconds(FALLBACK_RESET_SECS))
}
