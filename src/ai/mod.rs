pub mod anthropic;
pub mod gemini;
pub mod http;
pub mod openai;
pub mod parser;
pub mod prompts;
pub mod router;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::config::ApiProvider;
use crate::error::AiResult;

/// One request/response cycle of the pipeline, each with its own prompt and parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Extraction,
    Solution,
    Debugging,
}

impl Stage {
    pub fn progress_message(self) -> &'static str {
        match self {
            Stage::Extraction => "Analyzing problem from screenshots...",
            Stage::Solution => "Creating optimal solution with detailed explanations...",
            Stage::Debugging => "Analyzing code and generating debug feedback...",
        }
    }

    pub fn progress_percent(self) -> u8 {
        match self {
            Stage::Extraction => 20,
            Stage::Solution | Stage::Debugging => 60,
        }
    }
}

/// A base64-encoded screenshot plus its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub data: String,
    pub media_type: &'static str,
}

impl ImageData {
    pub fn png(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            media_type: "image/png",
        }
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

#[derive(Debug, Clone)]
pub struct AiRequest {
    pub stage: Stage,
    /// Stage instruction. Sent as a system message where the vendor has one,
    /// otherwise prepended to the prompt.
    pub system_prompt: String,
    pub prompt: String,
    pub images: Vec<ImageData>,
}

impl AiRequest {
    /// System instruction and prompt folded into one text block.
    pub fn combined_text(&self) -> String {
        if self.system_prompt.is_empty() {
            self.prompt.clone()
        } else {
            format!("{}\n\n{}", self.system_prompt, self.prompt)
        }
    }
}

/// Uniform call over the vendor-specific wire formats.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    fn provider(&self) -> ApiProvider;

    async fn send(
        &self,
        request: &AiRequest,
        model: &str,
        cancel: &CancellationToken,
    ) -> AiResult<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub provider: ApiProvider,
    pub name: String,
    pub models: Vec<String>,
}

pub fn available_providers() -> Vec<ProviderInfo> {
    vec![
        ProviderInfo {
            provider: ApiProvider::OpenAI,
            name: ApiProvider::OpenAI.display_name().to_string(),
            models: vec!["gpt-4o".to_string(), "gpt-4o-mini".to_string()],
        },
        ProviderInfo {
            provider: ApiProvider::Gemini,
            name: ApiProvider::Gemini.display_name().to_string(),
            models: vec![
                "gemini-2.0-flash".to_string(),
                "gemini-1.5-pro".to_string(),
            ],
        },
        ProviderInfo {
            provider: ApiProvider::Anthropic,
            name: ApiProvider::Anthropic.display_name().to_string(),
            models: vec![
                "claude-3-7-sonnet-20250219".to_string(),
                "claude-3-5-sonnet-20241022".to_string(),
                "claude-3-opus-20240229".to_string(),
            ],
        },
    ]
}
