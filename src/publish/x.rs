use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{PublishError, Publisher};
use crate::ingest::providers::x_api::DEFAULT_BASE_URL;

/// Posts through `POST /2/tweets` with a user-context access token.
#[derive(Clone)]
pub struct XPublisher {
    base_url: String,
    user_token: String,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl XPublisher {
    pub fn new(user_token: String) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_token,
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }
}

#[async_trait]
impl Publisher for XPublisher {
    async fn publish(&self, text: &str, reply_to: Option<&str>) -> Result<String, PublishError> {
        if text.trim().is_empty() {
            return Err(PublishError::EmptyText);
        }

        let payload = CreateTweet {
            text,
            reply: reply_to.map(|id| ReplyTo {
                in_reply_to_tweet_id: id,
            }),
        };
        let url = format!("{}/2/tweets", self.base_url);

        // Server errors and transport failures are retried; 4xx is final.
        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let res = self
                .client
                .post(&url)
                .bearer_auth(&self.user_token)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            match res {
                Ok(rsp) => {
                    let status = rsp.status();
                    if status.is_server_error() && attempt < self.max_retries {
                        tracing::warn!(status = status.as_u16(), attempt, "x publish server error, retrying");
                        tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                        continue;
                    }
                    if !status.is_success() {
                        let body = rsp.text().await.unwrap_or_default();
                        return Err(PublishError::Api {
                            status: status.as_u16(),
                            message: body,
                        });
                    }
                    let created: CreateTweetResponse = rsp
                        .json()
                        .await
                        .map_err(|e| PublishError::Parse(e.to_string()))?;
                    return Ok(created.data.id);
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
                        continue;
                    }
                    return Err(PublishError::Network(e.to_string()));
                }
            }
        }
    }

    fn name(&self) -> &'static str {
        "x-api-v2"
    }
}

#[derive(Serialize)]
struct CreateTweet<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<ReplyTo<'a>>,
}

#[derive(Serialize)]
struct ReplyTo<'a> {
    in_reply_to_tweet_id: &'a str,
}

#[derive(Deserialize)]
struct CreateTweetResponse {
    data: CreatedTweet,
}

#[derive(Deserialize)]
struct CreatedTweet {
    id: String,
}
