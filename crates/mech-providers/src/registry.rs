//! Provider registry.
//!
//! Constructs and holds all configured LLM provider instances. At startup the
//! registry reads the [`LlmConfig`], resolves authentication, and
//! instantiates the OpenAI-compatible adapter for each configured provider.

use crate::openai_compat::OpenAiCompatProvider;
use crate::traits::LlmProvider;
use mech_domain::config::{LlmConfig, ProviderKind};
use mech_domain::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ProviderRegistry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Holds all instantiated LLM providers, keyed by config id.
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
    /// Providers that failed to initialize, with error messages.
    init_errors: Vec<ProviderInitError>,
    /// Namespaced `"<provider_id>/<model>"` -> `"<provider_id>/<model>"`
    /// rate-limit fallback map, merged from every `ProviderConfig`'s
    /// `rate_limit_fallback` table (spec.md §4.C). Unlike the constructed
    /// `Arc<dyn LlmProvider>`s, this is plain data the registry can retain
    /// after `from_config` without needing a trait-object getter back onto
    /// `ProviderConfig`.
    rate_limit_fallback: HashMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ProviderInitError {
    pub provider_id: String,
    pub error: String,
}

/// Mask substrings that look like API keys or bearer tokens in an error
/// message, so raw secrets never leak into logs or doctor output.
fn mask_secrets(msg: &str) -> String {
    let mut result = msg.to_string();
    for word in msg.split(|c: char| c.is_whitespace() || c == '\'' || c == '"' || c == ',') {
        let trimmed = word.trim();
        if trimmed.len() >= 20
            && trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            let masked = if trimmed.len() > 8 {
                format!("{}...{}", &trimmed[..4], &trimmed[trimmed.len() - 4..])
            } else {
                "***masked***".to_string()
            };
            result = result.replace(trimmed, &masked);
        }
    }
    result
}

impl ProviderRegistry {
    /// Build the registry from the application's [`LlmConfig`]. Providers
    /// that fail to initialize are logged and skipped rather than aborting
    /// startup, unless `require_provider` is set and none succeed.
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let mut providers: HashMap<String, Arc<dyn LlmProvider>> = HashMap::new();
        let mut init_errors: Vec<ProviderInitError> = Vec::new();
        let mut rate_limit_fallback: HashMap<String, String> = HashMap::new();

        for pc in &config.providers {
            for (model, fallback) in &pc.rate_limit_fallback {
                rate_limit_fallback.insert(format!("{}/{model}", pc.id), fallback.clone());
            }

            let result: Result<Arc<dyn LlmProvider>> = match pc.kind {
                ProviderKind::OpenaiCompat => {
                    OpenAiCompatProvider::from_config(pc).map(|p| Arc::new(p) as Arc<dyn LlmProvider>)
                }
            };

            match result {
                Ok(provider) => {
                    tracing::info!(provider_id = %pc.id, "registered LLM provider");
                    providers.insert(pc.id.clone(), provider);
                }
                Err(e) => {
                    let safe_error = mask_secrets(&e.to_string());
                    tracing::warn!(
                        provider_id = %pc.id,
                        error = %safe_error,
                        "failed to initialize LLM provider, skipping"
                    );
                    init_errors.push(ProviderInitError { provider_id: pc.id.clone(), error: safe_error });
                }
            }
        }

        if providers.is_empty() && !config.providers.is_empty() && config.require_provider {
            return Err(Error::Config(
                "all configured LLM providers failed to initialize (require_provider = true)".into(),
            ));
        }

        Ok(Self { providers, init_errors, rate_limit_fallback })
    }

    /// Look up a provider by its config id.
    pub fn get(&self, provider_id: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(provider_id).cloned()
    }

    /// Insert a provider directly (used to register the in-process mock
    /// provider in tests, bypassing config).
    pub fn insert(&mut self, id: impl Into<String>, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(id.into(), provider);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Arc<dyn LlmProvider>)> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn list_providers(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.providers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn init_errors(&self) -> &[ProviderInitError] {
        &self.init_errors
    }

    /// The namespaced `"<provider_id>/<model>"` -> `"<provider_id>/<model>"`
    /// rate-limit fallback map merged from every configured provider
    /// (spec.md §4.C), consumed by the Streaming Runner's fallback policy.
    pub fn rate_limit_fallback(&self) -> &HashMap<String, String> {
        &self.rate_limit_fallback
    }

    /// Register a rate-limit fallback entry directly (used by tests that
    /// build a registry via [`Self::insert`] rather than `from_config`).
    pub fn insert_rate_limit_fallback(&mut self, model_id: impl Into<String>, fallback_id: impl Into<String>) {
        self.rate_limit_fallback.insert(model_id.into(), fallback_id.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_yields_empty_registry() {
        let config = LlmConfig::default();
        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn mask_secrets_redacts_long_tokens() {
        let masked = mask_secrets("auth failed for key sk-abcdefghijklmnopqrstuvwxyz1234");
        assert!(!masked.contains("sk-abcdefghijklmnopqrstuvwxyz1234"));
    }

    #[test]
    fn mask_secrets_leaves_short_words_alone() {
        let masked = mask_secrets("auth failed, status 401");
        assert_eq!(masked, "auth failed, status 401");
    }
}
