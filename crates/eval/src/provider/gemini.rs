use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::http::{get_ok, post_json};
use super::{GenerationLimits, GenerationProvider, ProviderError, ProviderInfo};

const GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-flash-latest";

/// Google Gemini over the `generateContent` REST endpoint.
///
/// Quota exhaustion comes back as HTTP 429 and surfaces as
/// [`ProviderError::RateLimited`].
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: &str, timeout: Duration) -> Self {
        GeminiProvider {
            api_key,
            model: model.to_string(),
            base_url: GEMINI_API_URL.to_string(),
            timeout,
        }
    }

    /// Point at a different API root (proxies, test servers).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn model_url(&self) -> String {
        format!("{}/models/{}", self.base_url, self.model)
    }
}

/// Concatenate the text parts of the first candidate.
fn candidate_text(response: &Value) -> Option<String> {
    let parts = response["candidates"].get(0)?["content"]["parts"].as_array()?;
    let text: String = parts.iter().filter_map(|p| p["text"].as_str()).collect();
    (!text.trim().is_empty()).then_some(text)
}

#[async_trait]
impl GenerationProvider for GeminiProvider {
    async fn generate(
        &self,
        prompt: &str,
        limits: &GenerationLimits,
    ) -> Result<String, ProviderError> {
        let body = json!({
            "contents": [{"parts": [{"text": prompt}]}],
            "generationConfig": {
                "maxOutputTokens": limits.max_tokens,
                "temperature": limits.temperature,
            },
        });
        let url = format!("{}:generateContent", self.model_url());
        let headers = vec![("x-goog-api-key", self.api_key.clone())];
        let response = post_json(url, headers, body, self.timeout).await?;
        candidate_text(&response)
            .ok_or_else(|| ProviderError::Malformed("no candidate text in response".to_string()))
    }

    async fn check_health(&self) -> bool {
        let headers = vec![("x-goog-api-key", self.api_key.clone())];
        get_ok(self.model_url(), headers, Duration::from_secs(5)).await
    }

    fn describe(&self) -> ProviderInfo {
        ProviderInfo {
            provider: "gemini".to_string(),
            model: self.model.clone(),
            endpoint: Some(self.base_url.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_candidate_parts() {
        let response = json!({
            "candidates": [{"content": {"parts": [{"text": "{\"a\":"}, {"text": " 1}"}]}}]
        });
        assert_eq!(candidate_text(&response).as_deref(), Some("{\"a\": 1}"));
    }

    #[test]
    fn empty_candidates_are_malformed() {
        assert!(candidate_text(&json!({"candidates": []})).is_none());
        assert!(candidate_text(&json!({"promptFeedback": {"blockReason": "SAFETY"}})).is_none());
    }
}
