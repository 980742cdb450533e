//! Anthropic Claude adapter (messages API).
//!
//! Also hosts the [`CompletionClient`] implementation used by query
//! expansion, which runs on a cheaper Haiku-class model.

use crate::providers::shared::{analysis_prompt, extract_raw_text, parse_structured_data};
use crate::providers::{Completion, CompletionClient, ProviderClient};
use crate::types::{AiResponse, AppError, ProviderId, Result, TokenUsage};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const ANALYSIS_MODEL: &str = "claude-haiku-4-5-20251001";
pub const EXPANSION_MODEL: &str = "claude-haiku-4-5-20251001";
const MAX_TOKENS: u32 = 8192;

pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

impl AnthropicClient {
    pub fn new(api_key: String) -> Self {
        Self::with_model(api_key, ANALYSIS_MODEL)
    }

    pub fn with_model(api_key: String, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model: model.to_string(),
        }
    }

    /// Point the adapter at a different API host (tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn send_message(&self, prompt: &str, max_tokens: u32) -> Result<Completion> {
        let response = self
            .http
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&json!({
                "model": self.model,
                "max_tokens": max_tokens,
                "messages": [{ "role": "user", "content": prompt }],
            }))
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Anthropic request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "Anthropic API error {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let message: MessagesResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Anthropic response decode failed: {}", e)))?;

        let text = message
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(Completion {
            text,
            input_tokens: message.usage.input_tokens,
            output_tokens: message.usage.output_tokens,
        })
    }
}

#[async_trait]
impl ProviderClient for AnthropicClient {
    fn id(&self) -> ProviderId {
        ProviderId::Claude
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, query: &str) -> Result<AiResponse> {
        let completion = self
            .send_message(&analysis_prompt(query), MAX_TOKENS)
            .await?;

        tracing::info!(
            provider = "claude",
            query = %query.chars().take(60).collect::<String>(),
            input_tokens = completion.input_tokens,
            output_tokens = completion.output_tokens,
            "analysis call finished"
        );

        let data = parse_structured_data(&completion.text, "claude");

        Ok(AiResponse {
            provider: ProviderId::Claude,
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
            quoted_phrases: None,
        })
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(&self, prompt: &str) -> Result<Completion> {
        self.send_message(prompt, 300).await
    }
}
