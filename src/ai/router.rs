use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::anthropic::AnthropicClient;
use super::gemini::GeminiClient;
use super::http::RequestPolicy;
use super::openai::OpenAIClient;
use super::{AiRequest, ProviderClient, Stage};
use crate::config::{AppConfig, ApiProvider};
use crate::error::{AiResult, ProviderError};
use crate::events::StatusSink;

/// The three vendor adapters behind one discriminant.
pub enum ProviderAdapter {
    OpenAI(OpenAIClient),
    Gemini(GeminiClient),
    Anthropic(AnthropicClient),
}

impl ProviderAdapter {
    /// Builds the adapter for the configured provider, or `None` when it has no key.
    pub fn from_config(config: &AppConfig) -> Option<Self> {
        let provider = config.api_provider;
        let key = config.api_key_for(provider).trim();
        if key.is_empty() {
            return None;
        }
        let policy = RequestPolicy::default();
        Some(match provider {
            ApiProvider::OpenAI => ProviderAdapter::OpenAI(OpenAIClient::new(key, policy)),
            ApiProvider::Gemini => ProviderAdapter::Gemini(GeminiClient::new(key, policy)),
            ApiProvider::Anthropic => {
                ProviderAdapter::Anthropic(AnthropicClient::new(key, policy))
            }
        })
    }
}

#[async_trait]
impl ProviderClient for ProviderAdapter {
    fn provider(&self) -> ApiProvider {
        match self {
            ProviderAdapter::OpenAI(_) => ApiProvider::OpenAI,
            ProviderAdapter::Gemini(_) => ApiProvider::Gemini,
            ProviderAdapter::Anthropic(_) => ApiProvider::Anthropic,
        }
    }

    async fn send(
        &self,
        request: &AiRequest,
        model: &str,
        cancel: &CancellationToken,
    ) -> AiResult<String> {
        match self {
            ProviderAdapter::OpenAI(client) => client.send(request, model, cancel).await,
            ProviderAdapter::Gemini(client) => client.send(request, model, cancel).await,
            ProviderAdapter::Anthropic(client) => client.send(request, model, cancel).await,
        }
    }
}

/// Model names resolved for each stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageModels {
    pub extraction: String,
    pub solution: String,
    pub debugging: String,
}

impl StageModels {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            extraction: config.model_for(Stage::Extraction),
            solution: config.model_for(Stage::Solution),
            debugging: config.model_for(Stage::Debugging),
        }
    }

    pub fn defaults(provider: ApiProvider) -> Self {
        Self {
            extraction: provider.default_model(Stage::Extraction).to_string(),
            solution: provider.default_model(Stage::Solution).to_string(),
            debugging: provider.default_model(Stage::Debugging).to_string(),
        }
    }

    pub fn for_stage(&self, stage: Stage) -> &str {
        match stage {
            Stage::Extraction => &self.extraction,
            Stage::Solution => &self.solution,
            Stage::Debugging => &self.debugging,
        }
    }
}

/// Picks the provider and per-stage model from a config snapshot and forwards
/// each stage request to the matching adapter. Never retries on its own.
pub struct ModelRouter {
    provider: ApiProvider,
    client: Option<Arc<dyn ProviderClient>>,
    models: StageModels,
    sink: Arc<dyn StatusSink>,
}

impl ModelRouter {
    pub fn from_config(config: &AppConfig, sink: Arc<dyn StatusSink>) -> Self {
        let client = ProviderAdapter::from_config(config)
            .map(|adapter| Arc::new(adapter) as Arc<dyn ProviderClient>);
        if client.is_none() {
            log::warn!(
                "No API key configured for {}",
                config.api_provider.display_name()
            );
        }
        Self {
            provider: config.api_provider,
            client,
            models: StageModels::from_config(config),
            sink,
        }
    }

    pub fn with_client(
        client: Arc<dyn ProviderClient>,
        models: StageModels,
        sink: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            provider: client.provider(),
            client: Some(client),
            models,
            sink,
        }
    }

    pub fn provider(&self) -> ApiProvider {
        self.provider
    }

    pub fn has_credentials(&self) -> bool {
        self.client.is_some()
    }

    pub fn model_for(&self, stage: Stage) -> &str {
        self.models.for_stage(stage)
    }

    pub async fn dispatch(
        &self,
        request: &AiRequest,
        cancel: &CancellationToken,
    ) -> AiResult<String> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| ProviderError::missing_credential(self.provider.display_name()))?;

        let stage = request.stage;
        let model = self.models.for_stage(stage);
        self.sink
            .notify(stage.progress_message(), stage.progress_percent());

        log::info!(
            "Dispatching {:?} stage to {} ({})",
            stage,
            self.provider.display_name(),
            model
        );
        client.send(request, model, cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::events::{ChannelSink, StatusUpdate};
    use parking_lot::Mutex;

    struct RecordingClient {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ProviderClient for RecordingClient {
        fn provider(&self) -> ApiProvider {
            ApiProvider::Gemini
        }

        async fn send(
            &self,
            _request: &AiRequest,
            model: &str,
            _cancel: &CancellationToken,
        ) -> AiResult<String> {
            self.calls.lock().push(model.to_string());
            Ok("ok".to_string())
        }
    }

    fn request(stage: Stage) -> AiRequest {
        AiRequest {
            stage,
            system_prompt: String::new(),
            prompt: "p".to_string(),
            images: vec![],
        }
    }

    #[test]
    fn test_adapter_requires_key() {
        let config = AppConfig::default();
        assert!(ProviderAdapter::from_config(&config).is_none());

        let config = AppConfig {
            api_provider: ApiProvider::Anthropic,
            anthropic_api_key: "sk-ant-xyz".to_string(),
            ..AppConfig::default()
        };
        let adapter = ProviderAdapter::from_config(&config).unwrap();
        assert_eq!(adapter.provider(), ApiProvider::Anthropic);
    }

    #[tokio::test]
    async fn test_missing_credential_before_any_notification() {
        let (sink, mut rx) = ChannelSink::new();
        let router = ModelRouter::from_config(&AppConfig::default(), Arc::new(sink));
        assert!(!router.has_credentials());

        let err = router
            .dispatch(&request(Stage::Extraction), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingCredential);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dispatch_uses_stage_model_and_notifies() {
        let (sink, mut rx) = ChannelSink::new();
        let client = Arc::new(RecordingClient {
            calls: Mutex::new(Vec::new()),
        });
        let models = StageModels {
            extraction: "fast".to_string(),
            solution: "smart".to_string(),
            debugging: "smart".to_string(),
        };
        let router = ModelRouter::with_client(client.clone(), models, Arc::new(sink));
        assert_eq!(router.provider(), ApiProvider::Gemini);

        router
            .dispatch(&request(Stage::Solution), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(*client.calls.lock(), vec!["smart".to_string()]);
        match rx.try_recv().unwrap() {
            StatusUpdate::Progress { percent, .. } => assert_eq!(percent, 60),
            other => panic!("unexpected update: {:?}", other),
        }
    }

    #[test]
    fn test_stage_models_defaults() {
        let models = StageModels::defaults(ApiProvider::OpenAI);
        assert_eq!(models.for_stage(Stage::Debugging), "gpt-4o");
    }
}
