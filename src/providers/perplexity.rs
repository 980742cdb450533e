//! Perplexity adapter (OpenAI-compatible API).
//!
//! Extension field: `related_questions`, requested via the
//! `return_related_questions` parameter and carried through on the response.

use crate::providers::openai::ChatApi;
use crate::providers::shared::{analysis_prompt, extract_raw_text, parse_structured_data};
use crate::providers::ProviderClient;
use crate::types::{AiResponse, ProviderId, Result, TokenUsage};
use async_trait::async_trait;
use serde_json::json;

const DEFAULT_BASE_URL: &str = "https://api.perplexity.ai";
const ANALYSIS_MODEL: &str = "sonar";

pub struct PerplexityClient {
    api: ChatApi,
    model: String,
}

impl PerplexityClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api: ChatApi::new(DEFAULT_BASE_URL, api_key, "Perplexity"),
            model: ANALYSIS_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.set_base_url(base_url);
        self
    }
}

#[async_trait]
impl ProviderClient for PerplexityClient {
    fn id(&self) -> ProviderId {
        ProviderId::Perplexity
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, query: &str) -> Result<AiResponse> {
        let (completion, chat) = self
            .api
            .send(
                &self.model,
                &analysis_prompt(query),
                Some(json!({ "return_related_questions": true })),
            )
            .await?;

        tracing::info!(
            provider = "perplexity",
            query = %query.chars().take(60).collect::<String>(),
            input_tokens = completion.input_tokens,
            output_tokens = completion.output_tokens,
            "analysis call finished"
        );

        let data = parse_structured_data(&completion.text, "perplexity");

        Ok(AiResponse {
            provider: ProviderId::Perplexity,
            raw_text: extract_raw_text(&completion.text),
            entities: data.entities,
            citations: data.citations,
            key_themes: data.key_themes,
            model: self.model.clone(),
            usage: vec![TokenUsage::analysis(
                completion.input_tokens,
                completion.output_tokens,
            )],
            related_questions: chat.related_questions,
            quoted_phrases: None,
        })
    }
}
