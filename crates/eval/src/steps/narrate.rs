//! Short provider-written summaries for the deterministic steps.

use std::sync::Arc;

use crate::provider::{GenerationLimits, GenerationProvider};

/// Replies shorter than this are treated as empty.
const MIN_NARRATIVE_CHARS: usize = 10;

/// Asks a provider for a one- or two-sentence summary of figures a step has
/// already computed. The figures never depend on the reply.
#[derive(Clone)]
pub struct Narrator {
    provider: Arc<dyn GenerationProvider>,
    limits: GenerationLimits,
}

impl Narrator {
    pub fn new(provider: Arc<dyn GenerationProvider>, max_tokens: u32) -> Self {
        Narrator {
            provider,
            limits: GenerationLimits {
                max_tokens,
                temperature: 0.0,
            },
        }
    }

    /// The trimmed reply, or `fallback` when the call fails or the reply is
    /// too short to be a summary.
    pub async fn narrate(&self, step: &str, prompt: &str, fallback: String) -> String {
        match self.provider.generate(prompt, &self.limits).await {
            Ok(text) if text.trim().chars().count() >= MIN_NARRATIVE_CHARS => {
                text.trim().to_string()
            }
            Ok(_) => {
                tracing::debug!(step, "narrative reply too short, using fallback");
                fallback
            }
            Err(err) => {
                tracing::warn!(step, error = %err, "narrative call failed, using fallback");
                fallback
            }
        }
    }
}

/// Uses the narrator when there is one, else the fallback text.
pub(crate) async fn narrate_or(
    narrator: Option<&Narrator>,
    step: &str,
    prompt: impl FnOnce() -> String,
    fallback: String,
) -> String {
    match narrator {
        Some(n) => n.narrate(step, &prompt(), fallback).await,
        None => fallback,
    }
}
