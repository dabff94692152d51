//! Anthropic Messages API completion adapter.
//!
//! Sends one user turn per completion request and joins the returned text
//! blocks. Requests are throttled client-side with a `governor` token bucket
//! and bounded by the HTTP client timeout. Error classification:
//!
//! - 429 → [`CompletionError::RateLimited`]
//! - client timeout → [`CompletionError::Timeout`]
//! - 401/403 → [`CompletionError::NotConfigured`]
//! - unparseable or empty body → [`CompletionError::MalformedOutput`]

use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::StatusCode;
use serde::Deserialize;
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::domain::models::CompletionConfig;
use crate::domain::ports::completion::{CompletionError, CompletionRequest, CompletionService};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Completion service backed by the Anthropic Messages API.
pub struct AnthropicCompletionService {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
    limiter: DefaultDirectRateLimiter,
}

impl AnthropicCompletionService {
    /// Build the client. A missing API key is fatal.
    pub fn new(config: &CompletionConfig) -> Result<Self, CompletionError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                CompletionError::NotConfigured(
                    "API key required. Set completion.api_key or ANTHROPIC_API_KEY env var."
                        .to_string(),
                )
            })?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| CompletionError::NotConfigured(format!("Failed to build HTTP client: {}", e)))?;

        let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            http_client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            limiter: RateLimiter::direct(Quota::per_second(rps)),
        })
    }
}

#[async_trait]
impl CompletionService for AnthropicCompletionService {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError> {
        self.limiter.until_ready().await;

        let mut body = serde_json::json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": [
                {
                    "role": "user",
                    "content": request.user_prompt
                }
            ]
        });
        if !request.system_prompt.is_empty() {
            body["system"] = serde_json::Value::String(request.system_prompt.clone());
        }

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .header("content-type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CompletionError::Timeout
                } else {
                    CompletionError::Backend(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::TOO_MANY_REQUESTS => CompletionError::RateLimited(text),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    CompletionError::NotConfigured(format!("Authentication failed ({}): {}", status, text))
                }
                StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => CompletionError::Timeout,
                _ => CompletionError::Backend(format!("API error {}: {}", status, text)),
            });
        }

        let message: MessageResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::MalformedOutput(format!("Failed to parse API response: {}", e)))?;

        let text = message
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(CompletionError::MalformedOutput(
                "API returned no text content".to_string(),
            ));
        }

        debug!(chars = text.len(), "Completion received");
        Ok(text)
    }
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}
