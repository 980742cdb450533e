//! Provider clients and the credential-driven registry.
//!
//! Each external AI provider is an opaque adapter behind [`ProviderClient`]:
//! given one subtopic query it returns a structured [`AiResponse`] or fails
//! with an error whose message the scheduler categorizes. Adapters speak
//! plain HTTP via `reqwest`; all share the prompt and parsing in [`shared`].

pub mod anthropic;
pub mod gemini;
pub mod grok;
pub mod openai;
pub mod perplexity;
pub mod shared;

use crate::config::ProvidersConfig;
use crate::types::{AiResponse, ProviderId, Result};
use async_trait::async_trait;
use std::sync::Arc;

/// One external AI provider, able to analyze a single query.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Which provider this is.
    fn id(&self) -> ProviderId;

    /// Model identifier reported in responses.
    fn model(&self) -> &str;

    /// Analyze one subtopic query. Errors reject with a message suitable for
    /// failure categorization.
    async fn analyze(&self, query: &str) -> Result<AiResponse>;
}

/// A plain text completion with token accounting.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Minimal completion seam used by query expansion, so the expander can be
/// tested without a network.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<Completion>;
}

/// Build the provider list from available credentials, in fixed enumeration
/// order. A provider is enabled iff its key is configured; there is no other
/// registry machinery.
pub fn configured_providers(config: &ProvidersConfig) -> Vec<Arc<dyn ProviderClient>> {
    let mut providers: Vec<Arc<dyn ProviderClient>> = Vec::new();

    if let Some(key) = &config.anthropic_api_key {
        providers.push(Arc::new(anthropic::AnthropicClient::new(key.clone())));
    }
    if let Some(key) = &config.openai_api_key {
        providers.push(Arc::new(openai::OpenAiClient::new(key.clone())));
    }
    if let Some(key) = &config.google_ai_api_key {
        providers.push(Arc::new(gemini::GeminiClient::new(key.clone())));
    }
    if let Some(key) = &config.perplexity_api_key {
        providers.push(Arc::new(perplexity::PerplexityClient::new(key.clone())));
    }
    if let Some(key) = &config.xai_api_key {
        providers.push(Arc::new(grok::GrokClient::new(key.clone())));
    }

    providers
}

/// Completion client for query expansion, if an expansion key is configured.
pub fn expansion_client(config: &ProvidersConfig) -> Option<Arc<dyn CompletionClient>> {
    config.anthropic_expansion_api_key.as_ref().map(|key| {
        Arc::new(anthropic::AnthropicClient::with_model(
            key.clone(),
            anthropic::EXPANSION_MODEL,
        )) as Arc<dyn CompletionClient>
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_is_empty_without_credentials() {
        let providers = configured_providers(&ProvidersConfig::default());
        assert!(providers.is_empty());
        assert!(expansion_client(&ProvidersConfig::default()).is_none());
    }

    #[test]
    fn registry_follows_fixed_enumeration_order() {
        let config = ProvidersConfig {
            xai_api_key: Some("x".into()),
            anthropic_api_key: Some("a".into()),
            perplexity_api_key: Some("p".into()),
            ..Default::default()
        };

        let ids: Vec<ProviderId> = configured_providers(&config)
            .iter()
            .map(|p| p.id())
            .collect();
        assert_eq!(
            ids,
            vec![ProviderId::Claude, ProviderId::Perplexity, ProviderId::Grok]
        );
    }
}
