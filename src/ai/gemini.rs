use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::http::{self, RequestPolicy, MAX_TOKENS, TEMPERATURE};
use super::{AiRequest, ProviderClient};
use crate::config::ApiProvider;
use crate::error::AiResult;

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com";
const GEMINI_API_VERSION: &str = "v1beta";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text {
        text: String,
    },
    #[serde(rename_all = "camelCase")]
    Image {
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiCandidateContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

/// `generateContent` client. The key travels as a query parameter and the
/// stage instruction is folded into the first text part.
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    policy: RequestPolicy,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, policy: RequestPolicy) -> Self {
        let client = http::build_client(&policy);
        Self {
            api_key: api_key.into(),
            base_url: GEMINI_API_URL.to_string(),
            policy,
            client,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_request(request: &AiRequest) -> GeminiRequest {
        let mut parts = vec![GeminiPart::Text {
            text: request.combined_text(),
        }];
        parts.extend(request.images.iter().map(|image| GeminiPart::Image {
            inline_data: InlineData {
                mime_type: image.media_type.to_string(),
                data: image.data.clone(),
            },
        }));

        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_TOKENS,
            },
        }
    }
}

#[async_trait]
impl ProviderClient for GeminiClient {
    fn provider(&self) -> ApiProvider {
        ApiProvider::Gemini
    }

    async fn send(
        &self,
        request: &AiRequest,
        model: &str,
        cancel: &CancellationToken,
    ) -> AiResult<String> {
        let body = Self::build_request(request);
        let url = format!(
            "{}/{}/models/{}:generateContent",
            self.base_url, GEMINI_API_VERSION, model
        );

        log::debug!(
            "Gemini {:?} request: model={}, images={}",
            request.stage,
            model,
            request.images.len()
        );

        let response: GeminiResponse =
            http::send_json(ApiProvider::Gemini, &self.policy, cancel, || {
                self.client
                    .post(&url)
                    .query(&[("key", self.api_key.as_str())])
                    .json(&body)
            })
            .await?;

        let text = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .and_then(|c| c.parts.into_iter().next())
            .and_then(|p| p.text);

        http::require_text(ApiProvider::Gemini, text)
    }
}
