//! x.ai Grok adapter (OpenAI-compatible API).
//!
//! Extension field: `quoted_phrases`, requested via an addendum to the shared
//! analysis prompt and parsed out of the structured JSON block.

use crate::providers::openai::ChatApi;
use crate::providers::shared::{
    analysis_prompt, extract_raw_text, parse_structured_data, quoted_phrases_addendum,
};
use crate::providers::ProviderClient;
use crate::types::{AiResponse, ProviderId, Result, TokenUsage};
use async_trait::async_trait;

const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1";
const ANALYSIS_MODEL: &str = "grok-3";

pub struct GrokClient {
    api: ChatApi,
    model: String,
}

impl GrokClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api: ChatApi::new(DEFAULT_BASE_URL, api_key, "Grok"),
            model: ANALYSIS_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.set_base_url(base_url);
        self
    }
}

#[async_trait]
impl ProviderClient for GrokClient {
    fn id(&self) -> ProviderId {
        ProviderId::Grok
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, query: &str) -> Result<AiResponse> {
        let prompt = format!("{}{}", analysis_prompt(query), quoted_phrases_addendum());
        let (completion, _) = self.api.send(&self.model, &prompt, None).await?;

        tracing::info!(
            provider = "grok",
            query = %query.chars().take(60).collect::<String>(),
            input_tokens = completion.input_tokens,
            output_tokens = completion.output_tokens,
            "analysis call finished"
        );

        let data = parse_structured_data(&completion.text, "grok");

        Ok(AiResponse {
            provider: ProviderId::Grok,
            raw_text: extract_raw_text(&completion.text),
            entities: data.entities,
            citations: data.citations,
            key_themes: data.key_themes,
            model: self.model.clone(),
            usage: vec![TokenUsage::analysis(
                completion.input_tokens,
                completion.output_tokens,
            )],
            related_questions: None,
            quoted_phrases: Some(data.quoted_phrases),
        })
    }
}
