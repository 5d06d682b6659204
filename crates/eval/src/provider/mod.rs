//! Generation providers: the external text-generation backends consulted by
//! the synthesis step.
//!
//! [`GenerationProvider`] is the seam. Concrete backends (Ollama, Gemini,
//! Anthropic, offline) implement it; [`RetryingProvider`] wraps any of them
//! with bounded rate-limit retries and an overall timeout.

#[cfg(feature = "http")]
mod anthropic;
#[cfg(feature = "http")]
mod gemini;
#[cfg(feature = "http")]
mod http;
mod offline;
#[cfg(feature = "http")]
mod ollama;
mod retry;

#[cfg(feature = "http")]
pub use anthropic::{AnthropicProvider, DEFAULT_ANTHROPIC_MODEL};
#[cfg(feature = "http")]
pub use gemini::{GeminiProvider, DEFAULT_GEMINI_MODEL};
pub use offline::OfflineProvider;
#[cfg(feature = "http")]
pub use ollama::{OllamaProvider, DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL};
pub use retry::{backoff_delay, RetryPolicy, RetryingProvider};

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Per-call generation bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationLimits {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationLimits {
    fn default() -> Self {
        GenerationLimits {
            max_tokens: 4096,
            temperature: 0.0,
        }
    }
}

/// What a provider reports about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub provider: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Unparsed provider text with its provenance.
///
/// Consumed once by recovery and then kept only as an attachment on the
/// synthesis step's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    pub text: String,
    pub prompt_chars: usize,
    pub provider: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Connection failures and other transport errors.
    #[error("provider network error: {0}")]
    Network(String),
    /// The backend answered with a non-success status.
    #[error("provider API error ({status}): {message}")]
    Api { status: u16, message: String },
    /// The backend asked us to slow down. The only retryable error.
    #[error("provider rate limited: {0}")]
    RateLimited(String),
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),
    /// The backend answered but the body had no usable text.
    #[error("provider response malformed: {0}")]
    Malformed(String),
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::RateLimited(_))
    }
}

/// A text-generation backend.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate a completion for `prompt` within `limits`.
    async fn generate(&self, prompt: &str, limits: &GenerationLimits)
        -> Result<String, ProviderError>;

    /// True if the backend is reachable and usable right now.
    async fn check_health(&self) -> bool;

    fn describe(&self) -> ProviderInfo;
}

#[async_trait]
impl<P: GenerationProvider + ?Sized> GenerationProvider for std::sync::Arc<P> {
    async fn generate(
        &self,
        prompt: &str,
        limits: &GenerationLimits,
    ) -> Result<String, ProviderError> {
        (**self).generate(prompt, limits).await
    }

    async fn check_health(&self) -> bool {
        (**self).check_health().await
    }

    fn describe(&self) -> ProviderInfo {
        (**self).describe()
    }
}

#[async_trait]
impl<P: GenerationProvider + ?Sized> GenerationProvider for Box<P> {
    async fn generate(
        &self,
        prompt: &str,
        limits: &GenerationLimits,
    ) -> Result<String, ProviderError> {
        (**self).generate(prompt, limits).await
    }

    async fn check_health(&self) -> bool {
        (**self).check_health().await
    }

    fn describe(&self) -> ProviderInfo {
        (**self).describe()
    }
}
