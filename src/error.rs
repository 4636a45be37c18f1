use thiserror::Error;

/// Failure categories surfaced by the provider adapters and the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Provider selected without a configured key. Raised before any network call.
    MissingCredential,
    /// Vendor answered 401.
    InvalidCredential,
    /// Vendor answered 429.
    RateLimited,
    /// Vendor answered 413.
    PayloadTooLarge,
    /// Vendor answered 5xx.
    VendorServerError,
    /// The cancellation token fired while the request was in flight.
    Canceled,
    /// Structured JSON could not be read out of the model text.
    ParseFailure,
    /// Vendor returned no text content.
    NoContent,
    Generic,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Generic, message)
    }

    pub fn canceled() -> Self {
        Self::new(ErrorKind::Canceled, "Request was canceled")
    }

    pub fn no_content(provider: &str) -> Self {
        Self::new(
            ErrorKind::NoContent,
            format!("No response content from {}", provider),
        )
    }

    pub fn missing_credential(provider: &str) -> Self {
        Self::new(
            ErrorKind::MissingCredential,
            format!("{} API key not configured. Go to Settings to add your key.", provider),
        )
    }

    pub fn is_canceled(&self) -> bool {
        self.kind == ErrorKind::Canceled
    }

    /// Whether the UI should route this failure to the API-key prompt instead of
    /// showing it as a plain processing error.
    pub fn looks_like_credential_problem(&self) -> bool {
        match self.kind {
            ErrorKind::MissingCredential | ErrorKind::InvalidCredential => true,
            ErrorKind::Generic => {
                let lowered = self.message.to_lowercase();
                ["api key", "openai", "gemini", "anthropic", "claude"]
                    .iter()
                    .any(|needle| lowered.contains(needle))
            }
            _ => false,
        }
    }
}

pub type AiResult<T> = Result<T, ProviderError>;
