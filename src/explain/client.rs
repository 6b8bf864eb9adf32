use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::config::config::LlmCfg;

#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("explanation request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("explanation API error: {0}")]
    Api(String),
    /// Distinguished so callers can stop retrying within a session.
    #[error("explanation quota exceeded: {0}")]
    QuotaExceeded(String),
}

impl ExplainError {
    pub fn is_quota(&self) -> bool {
        matches!(self, ExplainError::QuotaExceeded(_))
    }
}

#[async_trait]
pub trait ExplanationClient: Send + Sync + 'static {
    /// Turn a prompt into explanation text. Model, token budget and
    /// temperature are construction-time configuration, not per-call inputs.
    async fn generate(&self, prompt: &str) -> Result<String, ExplainError>;
}

/// OpenAI-compatible chat-completions client with a direct rate limiter in
/// front of it, so a burst of run explanations cannot flood the provider.
pub struct LlmExplanationClient {
    client: Client,
    cfg: LlmCfg,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl LlmExplanationClient {
    pub fn new(cfg: LlmCfg, client: Client) -> Self {
        let rpm = NonZeroU32::new(cfg.rate_limit_rpm).unwrap_or(NonZeroU32::MIN);
        let limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rpm)));
        Self {
            client,
            cfg,
            limiter,
        }
    }
}

#[async_trait]
impl ExplanationClient for LlmExplanationClient {
    async fn generate(&self, prompt: &str) -> Result<String, ExplainError> {
        if self.cfg.api_key.is_empty() {
            return Err(ExplainError::Api(
                "llm.apiKey is not set; populate it (or OPENAI_API_KEY) before requesting explanations"
                    .to_string(),
            ));
        }

        self.limiter.until_ready().await;

        let body = json!({
            "model": self.cfg.model,
            "temperature": self.cfg.temperature,
            "max_tokens": self.cfg.max_tokens,
            "messages": [
                {
                    "role": "system",
                    "content": "You are a neutral financial historian. Only describe historical price movements. \
                        Never predict future performance or offer investment recommendations. \
                        Avoid directives such as 'you should buy/sell/hold.'"
                },
                {"role": "user", "content": prompt}
            ]
        });

        let url = format!("{}/chat/completions", self.cfg.base_url);
        info!("Requesting explanation from {} with model {}", url, self.cfg.model);

        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.cfg.api_key))
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            if status == StatusCode::TOO_MANY_REQUESTS || err_text.contains("insufficient_quota") {
                return Err(ExplainError::QuotaExceeded(err_text));
            }
            return Err(ExplainError::Api(format!("{status}: {err_text}")));
        }

        let resp_json: serde_json::Value = res.json().await?;
        let content = resp_json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .trim()
            .to_string();

        Ok(content)
    }
}
