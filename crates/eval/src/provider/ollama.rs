use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::http::{base_url, get_ok, post_json};
use super::{GenerationLimits, GenerationProvider, ProviderError, ProviderInfo};

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3.2:1b";

/// Local model served by an Ollama daemon.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaProvider {
    pub fn new(url: &str, model: &str, timeout: Duration) -> Self {
        OllamaProvider {
            base_url: base_url(url),
            model: model.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl GenerationProvider for OllamaProvider {
    async fn generate(
        &self,
        prompt: &str,
        limits: &GenerationLimits,
    ) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": {
                "num_predict": limits.max_tokens,
                "temperature": limits.temperature,
            },
        });
        let url = format!("{}/api/generate", self.base_url);
        let response = post_json(url, Vec::new(), body, self.timeout).await?;
        response["response"]
            .as_str()
            .map(|s| s.trim().to_string())
            .ok_or_else(|| ProviderError::Malformed("no `response` field".to_string()))
    }

    async fn check_health(&self) -> bool {
        get_ok(
            format!("{}/api/tags", self.base_url),
            Vec::new(),
            Duration::from_secs(5),
        )
        .await
    }

    fn describe(&self) -> ProviderInfo {
        ProviderInfo {
            provider: "ollama".to_string(),
            model: self.model.clone(),
            endpoint: Some(self.base_url.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_reports_model_and_endpoint() {
        let p = OllamaProvider::new(
            "http://localhost:11434/",
            DEFAULT_OLLAMA_MODEL,
            Duration::from_secs(60),
        );
        let info = p.describe();
        assert_eq!(info.provider, "ollama");
        assert_eq!(info.model, "llama3.2:1b");
        assert_eq!(info.endpoint.as_deref(), Some("http://localhost:11434"));
    }
}
