use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::http::{self, RequestPolicy, MAX_TOKENS, TEMPERATURE};
use super::{AiRequest, ProviderClient};
use crate::config::ApiProvider;
use crate::error::AiResult;

const OPENAI_API_URL: &str = "https://api.openai.com";

#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    #[serde(default)]
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIMessageResponse,
}

#[derive(Debug, Deserialize)]
struct OpenAIMessageResponse {
    content: Option<String>,
}

/// Chat-completions client. Screenshots travel as `image_url` content blocks.
pub struct OpenAIClient {
    api_key: String,
    base_url: String,
    policy: RequestPolicy,
    client: Client,
}

impl OpenAIClient {
    pub fn new(api_key: impl Into<String>, policy: RequestPolicy) -> Self {
        let client = http::build_client(&policy);
        Self {
            api_key: api_key.into(),
            base_url: OPENAI_API_URL.to_string(),
            policy,
            client,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request(request: &AiRequest, model: &str) -> OpenAIRequest {
        let mut user_content = vec![serde_json::json!({
            "type": "text",
            "text": request.prompt
        })];
        for image in &request.images {
            user_content.push(serde_json::json!({
                "type": "image_url",
                "image_url": { "url": image.data_uri() }
            }));
        }

        OpenAIRequest {
            model: model.to_string(),
            messages: vec![
                OpenAIMessage {
                    role: "system".to_string(),
                    content: serde_json::Value::String(request.system_prompt.clone()),
                },
                OpenAIMessage {
                    role: "user".to_string(),
                    content: serde_json::Value::Array(user_content),
                },
            ],
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }
}

#[async_trait]
impl ProviderClient for OpenAIClient {
    fn provider(&self) -> ApiProvider {
        ApiProvider::OpenAI
    }

    async fn send(
        &self,
        request: &AiRequest,
        model: &str,
        cancel: &CancellationToken,
    ) -> AiResult<String> {
        let body = Self::build_request(request, model);
        let url = format!("{}/v1/chat/completions", self.base_url);

        log::debug!(
            "OpenAI {:?} request: model={}, images={}",
            request.stage,
            model,
            request.images.len()
        );

        let response: OpenAIResponse =
            http::send_json(ApiProvider::OpenAI, &self.policy, cancel, || {
                self.client
                    .post(&url)
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .header("Content-Type", "application/json")
                    .json(&body)
            })
            .await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content);

        http::require_text(ApiProvider::OpenAI, content)
    }
}
