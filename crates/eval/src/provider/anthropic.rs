use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::http::post_json;
use super::{GenerationLimits, GenerationProvider, ProviderError, ProviderInfo};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com";

/// Required API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";

/// Anthropic Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model: &str, timeout: Duration) -> Self {
        AnthropicProvider {
            api_key,
            model: model.to_string(),
            base_url: ANTHROPIC_API_URL.to_string(),
            timeout,
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

/// Concatenate the `text` content blocks.
fn content_text(response: &Value) -> Option<String> {
    let blocks = response["content"].as_array()?;
    let text: String = blocks
        .iter()
        .filter(|b| b["type"] == "text")
        .filter_map(|b| b["text"].as_str())
        .collect();
    (!text.trim().is_empty()).then_some(text)
}

#[async_trait]
impl GenerationProvider for AnthropicProvider {
    async fn generate(
        &self,
        prompt: &str,
        limits: &GenerationLimits,
    ) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.model,
            "max_tokens": limits.max_tokens,
            "temperature": limits.temperature,
            "messages": [{"role": "user", "content": prompt}],
        });
        let headers = vec![
            ("x-api-key", self.api_key.clone()),
            ("anthropic-version", ANTHROPIC_VERSION.to_string()),
        ];
        let url = format!("{}/v1/messages", self.base_url);
        let response = post_json(url, headers, body, self.timeout).await?;
        content_text(&response)
            .ok_or_else(|| ProviderError::Malformed("no text content in response".to_string()))
    }

    /// Health is a configuration check only; there is no free health endpoint.
    async fn check_health(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    fn describe(&self) -> ProviderInfo {
        ProviderInfo {
            provider: "anthropic".to_string(),
            model: self.model.clone(),
            endpoint: Some(self.base_url.clone()),
        }
    }
}
