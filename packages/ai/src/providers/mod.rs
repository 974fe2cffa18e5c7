//! LLM provider abstraction and implementations.
//!
//! Supports Anthropic Claude and `OpenAI`-compatible chat APIs via a
//! common trait.

pub mod anthropic;
pub mod openai;

use crate::AiError;

/// Maximum tokens requested per completion.
pub const MAX_TOKENS: u32 = 2048;

/// Trait for LLM providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider and model label (e.g. `"anthropic/claude-sonnet-4"`),
    /// used to attribute generated content.
    fn label(&self) -> String;

    /// Sends a single-turn completion request and returns the model's text.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the response has no text.
    async fn complete(&self, system_prompt: &str, prompt: &str) -> Result<String, AiError>;
}

/// Which provider API to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Anthropic Messages API.
    Anthropic,
    /// `OpenAI` Chat Completions API (or a compatible server).
    OpenAi,
}

/// Resolved provider configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Provider API.
    pub kind: ProviderKind,
    /// API credential.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Endpoint override; `None` uses the provider's public API.
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// Resolves configuration from environment variables.
    ///
    /// If `AI_PROVIDER` is explicitly set, uses that provider. Otherwise
    /// auto-detects from available credentials:
    ///
    /// 1. `ANTHROPIC_API_KEY` set -> Anthropic Claude
    /// 2. `OPENAI_API_KEY` set -> `OpenAI`
    ///
    /// Returns `Ok(None)` when no credential is available: an unconfigured
    /// AI source is a valid state, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] if `AI_PROVIDER` names an unknown
    /// provider.
    pub fn from_env() -> Result<Option<Self>, AiError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`] but reads variables through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] if `AI_PROVIDER` names an unknown
    /// provider.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Option<Self>, AiError> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let kind = match non_empty("AI_PROVIDER") {
            Some(explicit) => match explicit.to_lowercase().as_str() {
                "anthropic" | "claude" => ProviderKind::Anthropic,
                "openai" | "gpt" => ProviderKind::OpenAi,
                other => {
                    return Err(AiError::Config {
                        message: format!(
                            "Unknown AI provider: {other}. Use 'anthropic' or 'openai'."
                        ),
                    });
                }
            },
            None => {
                if non_empty("ANTHROPIC_API_KEY").is_some() {
                    log::info!("Auto-detected AI provider: Anthropic (ANTHROPIC_API_KEY found)");
                    ProviderKind::Anthropic
                } else if non_empty("OPENAI_API_KEY").is_some() {
                    log::info!("Auto-detected AI provider: OpenAI (OPENAI_API_KEY found)");
                    ProviderKind::OpenAi
                } else {
                    log::info!("No AI credentials detected; AI source disabled");
                    return Ok(None);
                }
            }
        };

        let (key_var, default_model) = match kind {
            ProviderKind::Anthropic => ("ANTHROPIC_API_KEY", "claude-sonnet-4-20250514"),
            ProviderKind::OpenAi => ("OPENAI_API_KEY", "gpt-4o"),
        };

        let Some(api_key) = non_empty(key_var) else {
            log::warn!("AI provider {kind:?} selected but {key_var} is not set; AI source disabled");
            return Ok(None);
        };

        Ok(Some(Self {
            kind,
            api_key,
            model: non_empty("AI_MODEL").unwrap_or_else(|| default_model.to_string()),
            base_url: non_empty("AI_BASE_URL"),
        }))
    }

    /// Builds the provider described by this configuration.
    #[must_use]
    pub fn build(self) -> Box<dyn LlmProvider> {
        match self.kind {
            ProviderKind::Anthropic => {
                let provider = anthropic::AnthropicProvider::new(self.api_key, self.model);
                Box::new(match self.base_url {
                    Some(url) => provider.with_base_url(url),
                    None => provider,
                })
            }
            ProviderKind::OpenAi => {
                let provider = openai::OpenAiProvider::new(self.api_key, self.model);
                Box::new(match self.base_url {
                    Some(url) => provider.with_base_url(url),
                    None => provider,
                })
            }
        }
    }
}

/// Creates an LLM provider from environment variables, or `None` if no
/// credentials are configured.
///
/// # Errors
///
/// Returns [`AiError::Config`] if `AI_PROVIDER` names an unknown provider.
pub fn create_provider_from_env() -> Result<Option<Box<dyn LlmProvider>>, AiError> {
    Ok(ProviderConfig::from_env()?.map(ProviderConfig::build))
}
