//! `arbiter.toml` configuration with environment overrides.
//!
//! ```toml
//! [ledger]
//! path = "data/audit_logs.jsonl"
//!
//! [provider]
//! kind = "ollama"            # ollama | gemini | anthropic | offline
//! model = "llama3.2:1b"
//! base_url = "http://localhost:11434"
//! max_tokens = 4096
//! temperature = 0.3
//! timeout_secs = 300
//! max_retries = 2
//! initial_backoff_ms = 20000
//! narrate = false            # provider also writes scoring and risk summaries
//!
//! [intake]
//! confidence_threshold = 0.7
//! ```
//!
//! API keys are only read from the environment.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use arbiter_eval::provider::{
    AnthropicProvider, GeminiProvider, GenerationProvider, OfflineProvider, OllamaProvider,
    RetryPolicy, RetryingProvider, DEFAULT_ANTHROPIC_MODEL, DEFAULT_GEMINI_MODEL,
    DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL,
};
use arbiter_eval::steps::{DEFAULT_CONFIDENCE_THRESHOLD, SYNTHESIS_TEMPERATURE};
use arbiter_eval::PipelineSettings;

pub const DEFAULT_CONFIG_FILE: &str = "arbiter.toml";
pub const DEFAULT_LEDGER_PATH: &str = "data/audit_logs.jsonl";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config '{}': {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {key}: '{value}'")]
    Invalid { key: &'static str, value: String },
    #[error("{0} is not set")]
    MissingSecret(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Ollama,
    Gemini,
    Anthropic,
    Offline,
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "gemini" => Ok(ProviderKind::Gemini),
            "anthropic" => Ok(ProviderKind::Anthropic),
            "offline" => Ok(ProviderKind::Offline),
            _ => Err(ConfigError::Invalid {
                key: "provider.kind",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::Offline => "offline",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub ledger: LedgerConfig,
    pub provider: ProviderConfig,
    pub intake: IntakeConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LedgerConfig {
    pub path: PathBuf,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        LedgerConfig {
            path: PathBuf::from(DEFAULT_LEDGER_PATH),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub narrate: bool,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        ProviderConfig {
            kind: ProviderKind::default(),
            model: None,
            base_url: None,
            max_tokens: 4096,
            temperature: SYNTHESIS_TEMPERATURE,
            timeout_secs: retry.timeout.as_secs(),
            max_retries: retry.max_retries,
            initial_backoff_ms: retry.initial_backoff.as_millis() as u64,
            narrate: false,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntakeConfig {
    pub confidence_threshold: f64,
}

impl Default for IntakeConfig {
    fn default() -> Self {
        IntakeConfig {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
        }
    }
}

impl Config {
    /// Load from `path`, or from `arbiter.toml` in the working directory.
    /// An explicit path must exist; the implicit one may be absent.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        let mut config = match std::fs::read_to_string(&path) {
            Ok(text) => Self::parse(&text, &path)?,
            Err(e) if !required && e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(source) => return Err(ConfigError::Read { path, source }),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn parse(text: &str, path: &Path) -> Result<Config, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(kind) = get("ARBITER_PROVIDER") {
            self.provider.kind = kind.parse()?;
        }
        if let Some(model) = get("ARBITER_MODEL") {
            self.provider.model = Some(model);
        }
        if let Some(path) = get("ARBITER_LEDGER") {
            self.ledger.path = PathBuf::from(path);
        }
        match self.provider.kind {
            ProviderKind::Ollama => {
                if let Some(url) = get("OLLAMA_BASE_URL") {
                    self.provider.base_url = Some(url);
                }
            }
            ProviderKind::Gemini => self.provider.api_key = get("GEMINI_API_KEY"),
            ProviderKind::Anthropic => self.provider.api_key = get("ANTHROPIC_API_KEY"),
            ProviderKind::Offline => {}
        }
        Ok(())
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            confidence_threshold: self.intake.confidence_threshold,
            max_tokens: self.provider.max_tokens,
            temperature: self.provider.temperature,
            narrate: self.provider.narrate,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.provider.max_retries,
            initial_backoff: Duration::from_millis(self.provider.initial_backoff_ms),
            timeout: Duration::from_secs(self.provider.timeout_secs),
        }
    }

    /// The configured provider wrapped in the retry policy.
    pub fn build_provider(&self) -> Result<Arc<dyn GenerationProvider>, ConfigError> {
        let p = &self.provider;
        let timeout = Duration::from_secs(p.timeout_secs);
        let policy = self.retry_policy();
        let provider: Arc<dyn GenerationProvider> = match p.kind {
            ProviderKind::Ollama => Arc::new(RetryingProvider::new(
                OllamaProvider::new(
                    p.base_url.as_deref().unwrap_or(DEFAULT_OLLAMA_URL),
                    p.model.as_deref().unwrap_or(DEFAULT_OLLAMA_MODEL),
                    timeout,
                ),
                policy,
            )),
            ProviderKind::Gemini => {
                let key = p
                    .api_key
                    .clone()
                    .ok_or(ConfigError::MissingSecret("GEMINI_API_KEY"))?;
                let model = p.model.as_deref().unwrap_or(DEFAULT_GEMINI_MODEL);
                let mut provider = GeminiProvider::new(key, model, timeout);
                if let Some(url) = p.base_url.as_deref() {
                    provider = provider.with_base_url(url);
                }
                Arc::new(RetryingProvider::new(provider, policy))
            }
            ProviderKind::Anthropic => {
                let key = p
                    .api_key
                    .clone()
                    .ok_or(ConfigError::MissingSecret("ANTHROPIC_API_KEY"))?;
                let mut provider = AnthropicProvider::new(
                    key,
                    p.model.as_deref().unwrap_or(DEFAULT_ANTHROPIC_MODEL),
                    timeout,
                );
                if let Some(url) = p.base_url.as_deref() {
                    provider = provider.with_base_url(url);
                }
                Arc::new(RetryingProvider::new(provider, policy))
            }
            ProviderKind::Offline => Arc::new(OfflineProvider::new()),
        };
        Ok(provider)
    }
}
