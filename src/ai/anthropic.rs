//! Anthropic Claude messages-API client.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use super::http::{self, RequestPolicy, MAX_TOKENS, TEMPERATURE};
use super::{AiRequest, ProviderClient};
use crate::config::ApiProvider;
use crate::error::AiResult;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ClaudeContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ClaudeContentBlock {
    text: Option<String>,
}

pub struct AnthropicClient {
    api_key: String,
    base_url: String,
    policy: RequestPolicy,
    client: Client,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, policy: RequestPolicy) -> Self {
        let client = http::build_client(&policy);
        Self {
            api_key: api_key.into(),
            base_url: ANTHROPIC_API_URL.to_string(),
            policy,
            client,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// One user message: the text block first, then one base64 image block per screenshot.
    fn build_request_body(request: &AiRequest, model: &str) -> serde_json::Value {
        let mut content = vec![serde_json::json!({
            "type": "text",
            "text": request.combined_text()
        })];
        for image in &request.images {
            content.push(serde_json::json!({
                "type": "image",
                "source": {
                    "type": "base64",
                    "media_type": image.media_type,
                    "data": image.data
                }
            }));
        }

        serde_json::json!({
            "model": model,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "messages": [{
                "role": "user",
                "content": content
            }]
        })
    }
}

#[async_trait]
impl ProviderClient for AnthropicClient {
    fn provider(&self) -> ApiProvider {
        ApiProvider::Anthropic
    }

    async fn send(
        &self,
        request: &AiRequest,
        model: &str,
        cancel: &CancellationToken,
    ) -> AiResult<String> {
        let body = Self::build_request_body(request, model);
        let url = format!("{}/v1/messages", self.base_url);

        log::debug!(
            "Claude {:?} request: model={}, images={}",
            request.stage,
            model,
            request.images.len()
        );

        let response: ClaudeResponse =
            http::send_json(ApiProvider::Anthropic, &self.policy, cancel, || {
                self.client
                    .post(&url)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .header("Content-Type", "application/json")
                    .json(&body)
            })
            .await?;

        let text = response.content.into_iter().next().and_then(|b| b.text);
        http::require_text(ApiProvider::Anthropic, text)
    }
}
