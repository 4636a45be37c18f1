//! HTTP plumbing shared by the provider adapters.
//!
//! Every adapter goes through [`send_json`], which races the request against the
//! caller's cancellation token, retries transient transport failures a bounded
//! number of times, and maps vendor status codes onto [`ErrorKind`]s.

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::ApiProvider;
use crate::error::{AiResult, ErrorKind, ProviderError};

pub const TEMPERATURE: f32 = 0.2;
pub const MAX_TOKENS: u32 = 4000;

const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Timeout and retry budget, shared by every provider adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPolicy {
    pub timeout: Duration,
    /// Extra attempts after a connect error or timeout. HTTP statuses are never retried.
    pub max_retries: u32,
}

impl Default for RequestPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300),
            max_retries: 2,
        }
    }
}

pub fn build_client(policy: &RequestPolicy) -> Client {
    Client::builder()
        .timeout(policy.timeout)
        .build()
        .unwrap_or_else(|e| {
            log::warn!("Falling back to default HTTP client: {}", e);
            Client::new()
        })
}

/// Maps a non-success vendor status to an error carrying a provider-specific message.
pub fn classify_status(provider: ApiProvider, status: StatusCode, body: &str) -> ProviderError {
    let name = provider.display_name();
    match status.as_u16() {
        401 => ProviderError::new(
            ErrorKind::InvalidCredential,
            format!("Invalid {} API key. Please check your settings.", name),
        ),
        429 => ProviderError::new(ErrorKind::RateLimited, rate_limit_message(provider)),
        413 => ProviderError::new(
            ErrorKind::PayloadTooLarge,
            format!(
                "Your screenshots are too large for the {} API. Please use fewer or smaller images, or switch to {}.",
                name,
                alternatives(provider)
            ),
        ),
        500..=599 => ProviderError::new(
            ErrorKind::VendorServerError,
            format!("{} server error ({}). Please try again later.", name, status),
        ),
        _ => ProviderError::generic(format!("{} API error ({}): {}", name, status, body)),
    }
}

fn rate_limit_message(provider: ApiProvider) -> &'static str {
    match provider {
        ApiProvider::OpenAI => {
            "OpenAI API rate limit exceeded or insufficient credits. Please try again later."
        }
        ApiProvider::Gemini => "Gemini API rate limit exceeded. Please try again later.",
        ApiProvider::Anthropic => {
            "Claude API rate limit exceeded. Please wait a few minutes before trying again."
        }
    }
}

fn alternatives(provider: ApiProvider) -> &'static str {
    match provider {
        ApiProvider::OpenAI => "Gemini or Claude",
        ApiProvider::Gemini => "OpenAI or Claude",
        ApiProvider::Anthropic => "OpenAI or Gemini",
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_connect() || err.is_timeout()
}

/// Sends the request built by `build` and decodes a JSON body of type `T`.
///
/// `build` is called once per attempt since a `RequestBuilder` cannot be reused.
pub async fn send_json<T, F>(
    provider: ApiProvider,
    policy: &RequestPolicy,
    cancel: &CancellationToken,
    build: F,
) -> AiResult<T>
where
    T: DeserializeOwned,
    F: Fn() -> RequestBuilder,
{
    let name = provider.display_name();
    let mut attempt = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(ProviderError::canceled());
        }

        let exchange = async {
            let response = build().send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderError::canceled()),
            outcome = exchange => outcome,
        };

        match outcome {
            Ok((status, body)) => {
                if !status.is_success() {
                    log::warn!("{} returned {}", name, status);
                    return Err(classify_status(provider, status, &body));
                }
                return serde_json::from_str(&body).map_err(|e| {
                    ProviderError::generic(format!("Failed to parse {} response: {}", name, e))
                });
            }
            Err(e) if is_transient(&e) && attempt < policy.max_retries => {
                attempt += 1;
                log::warn!(
                    "{} request failed ({}), retry {}/{}",
                    name,
                    e,
                    attempt,
                    policy.max_retries
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Err(ProviderError::canceled()),
                    _ = tokio::time::sleep(RETRY_BACKOFF * attempt) => {}
                }
            }
            Err(e) => {
                return Err(ProviderError::generic(format!(
                    "{} request failed: {}",
                    name, e
                )));
            }
        }
    }
}

/// Returns the text if present and non-blank, otherwise a `NoContent` error.
pub fn require_text(provider: ApiProvider, text: Option<String>) -> AiResult<String> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ProviderError::no_content(provider.display_name())),
    }
}
