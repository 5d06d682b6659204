use async_trait::async_trait;

use super::{GenerationLimits, GenerationProvider, ProviderError, ProviderInfo};

const OFFLINE_RESPONSE: &str = r#"{
  "reasoning_chain": [
    "Step 1: No generation backend is configured; the offline provider answered.",
    "Step 2: Deterministic step outputs are the only evidence available."
  ],
  "performance_assessment": "Not assessed by a model (offline mode).",
  "risk_factors": ["No model-based review was performed"],
  "strengths": ["Deterministic checks completed"],
  "recommendation": "MONITOR",
  "confidence_level": "LOW",
  "justification": "Offline mode cannot weigh qualitative evidence; keep observing the vendor.",
  "alternative_consideration": "Re-run with a configured provider for a reasoned recommendation."
}"#;

/// Provider that never leaves the process. Returns a fixed response.
///
/// Used for dry runs, CI, and air-gapped installs.
#[derive(Debug, Clone)]
pub struct OfflineProvider {
    response: String,
}

impl OfflineProvider {
    pub fn new() -> Self {
        OfflineProvider {
            response: OFFLINE_RESPONSE.to_string(),
        }
    }

    /// Answer every prompt with `response` instead of the built-in text.
    pub fn with_response(response: impl Into<String>) -> Self {
        OfflineProvider {
            response: response.into(),
        }
    }
}

impl Default for OfflineProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerationProvider for OfflineProvider {
    async fn generate(
        &self,
        _prompt: &str,
        _limits: &GenerationLimits,
    ) -> Result<String, ProviderError> {
        Ok(self.response.clone())
    }

    async fn check_health(&self) -> bool {
        true
    }

    fn describe(&self) -> ProviderInfo {
        ProviderInfo {
            provider: "offline".to_string(),
            model: "none".to_string(),
            endpoint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recovery::recover;
    use arbiter_core::{ConfidenceLevel, Recommendation, RecoveryPath};

    #[tokio::test]
    async fn built_in_response_recovers_cleanly() {
        let text = OfflineProvider::new()
            .generate("anything", &GenerationLimits::default())
            .await
            .unwrap();
        let d = recover(&text);
        assert_eq!(d.recovery, RecoveryPath::Parsed);
        assert_eq!(d.recommendation, Recommendation::Monitor);
        assert_eq!(d.confidence_level, ConfidenceLevel::Low);
    }
}
