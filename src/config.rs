use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ai::Stage;

const CONFIG_FILE: &str = "config.json";
pub const DEFAULT_LANGUAGE: &str = "python";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_provider: ApiProvider,
    pub openai_api_key: String,
    pub gemini_api_key: String,
    pub anthropic_api_key: String,
    pub extraction_model: Option<String>,
    pub solution_model: Option<String>,
    pub debugging_model: Option<String>,
    pub language: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiProvider {
    OpenAI,
    Gemini,
    Anthropic,
}

impl ApiProvider {
    pub fn display_name(self) -> &'static str {
        match self {
            ApiProvider::OpenAI => "OpenAI",
            ApiProvider::Gemini => "Gemini",
            ApiProvider::Anthropic => "Claude",
        }
    }

    /// Model used for every stage when the config does not name one.
    pub fn default_model(self, _stage: Stage) -> &'static str {
        match self {
            ApiProvider::OpenAI => "gpt-4o",
            ApiProvider::Gemini => "gemini-2.0-flash",
            ApiProvider::Anthropic => "claude-3-7-sonnet-20250219",
        }
    }

    fn key_env_var(self) -> &'static str {
        match self {
            ApiProvider::OpenAI => "OPENAI_API_KEY",
            ApiProvider::Gemini => "GEMINI_API_KEY",
            ApiProvider::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_provider: ApiProvider::OpenAI,
            openai_api_key: String::new(),
            gemini_api_key: String::new(),
            anthropic_api_key: String::new(),
            extraction_model: None,
            solution_model: None,
            debugging_model: None,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl AppConfig {
    /// Platform config directory used when the embedder does not supply one.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("codeshot-assistant"))
    }

    pub fn load(config_dir: &Path) -> Self {
        let config_path = config_dir.join(CONFIG_FILE);
        let mut config = if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                    log::warn!("Ignoring unreadable config {}: {}", config_path.display(), e);
                    Self::default()
                }),
                Err(_) => Self::default(),
            }
        } else {
            let c = Self::default();
            if let Err(e) = c.save(config_dir) {
                log::warn!("Could not write default config: {:#}", e);
            }
            c
        };

        // Environment keys win over whatever is on disk
        for provider in [ApiProvider::OpenAI, ApiProvider::Gemini, ApiProvider::Anthropic] {
            if let Ok(key) = std::env::var(provider.key_env_var()) {
                if !key.is_empty() {
                    *config.api_key_slot(provider) = key;
                }
            }
        }

        config
    }

    pub fn save(&self, config_dir: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(config_dir)
            .with_context(|| format!("creating {}", config_dir.display()))?;
        let config_path = config_dir.join(CONFIG_FILE);
        let content = serde_json::to_string_pretty(self).context("serializing config")?;
        std::fs::write(&config_path, content)
            .with_context(|| format!("writing {}", config_path.display()))?;
        Ok(())
    }

    pub fn api_key_for(&self, provider: ApiProvider) -> &str {
        match provider {
            ApiProvider::OpenAI => &self.openai_api_key,
            ApiProvider::Gemini => &self.gemini_api_key,
            ApiProvider::Anthropic => &self.anthropic_api_key,
        }
    }

    fn api_key_slot(&mut self, provider: ApiProvider) -> &mut String {
        match provider {
            ApiProvider::OpenAI => &mut self.openai_api_key,
            ApiProvider::Gemini => &mut self.gemini_api_key,
            ApiProvider::Anthropic => &mut self.anthropic_api_key,
        }
    }

    /// True when the active provider has a key configured.
    pub fn has_api_key(&self) -> bool {
        !self.api_key_for(self.api_provider).trim().is_empty()
    }

    /// Per-stage model override, ignoring blank entries.
    pub fn model_override(&self, stage: Stage) -> Option<&str> {
        let slot = match stage {
            Stage::Extraction => &self.extraction_model,
            Stage::Solution => &self.solution_model,
            Stage::Debugging => &self.debugging_model,
        };
        slot.as_deref().map(str::trim).filter(|m| !m.is_empty())
    }

    pub fn model_for(&self, stage: Stage) -> String {
        self.model_override(stage)
            .unwrap_or_else(|| self.api_provider.default_model(stage))
            .to_string()
    }

    /// Target language for generated code, `python` when unset.
    pub fn language(&self) -> &str {
        let lang = self.language.trim();
        if lang.is_empty() {
            DEFAULT_LANGUAGE
        } else {
            lang
        }
    }
}

/// Cheap shape check on a key before it is stored. Does not contact the vendor.
pub fn validate_api_key_format(provider: ApiProvider, key: &str) -> bool {
    let key = key.trim();
    match provider {
        ApiProvider::OpenAI => key.starts_with("sk-") && key.len() > 20,
        ApiProvider::Anthropic => key.starts_with("sk-ant-") && key.len() > 20,
        ApiProvider::Gemini => key.len() >= 10,
    }
}

pub type ConfigState = std::sync::Arc<parking_lot::Mutex<AppConfig>>;
