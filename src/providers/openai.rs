//! OpenAI adapter (chat completions API).
//!
//! The chat-completions wire format is also spoken by Perplexity and x.ai, so
//! the request plumbing lives here as [`ChatApi`] and those adapters reuse it.

use crate::providers::shared::{analysis_prompt, extract_raw_text, parse_structured_data};
use crate::providers::{Completion, ProviderClient};
use crate::types::{AiResponse, AppError, ProviderId, Result, TokenUsage};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const ANALYSIS_MODEL: &str = "gpt-4o";
const MAX_TOKENS: u32 = 8192;

/// Thin client for any OpenAI-compatible chat-completions endpoint.
pub(crate) struct ChatApi {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    /// Provider label used in error messages, e.g. "OpenAI" or "Perplexity".
    label: &'static str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChatResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
    /// Perplexity extension; absent everywhere else.
    #[serde(default)]
    pub(crate) related_questions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

impl ChatApi {
    pub(crate) fn new(base_url: &str, api_key: String, label: &'static str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.to_string(),
            api_key,
            label,
        }
    }

    pub(crate) fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.base_url = base_url.into();
    }

    /// Send one user message; `extra` merges provider-specific request fields
    /// into the body.
    pub(crate) async fn send(
        &self,
        model: &str,
        prompt: &str,
        extra: Option<serde_json::Value>,
    ) -> Result<(Completion, ChatResponse)> {
        let mut body = json!({
            "model": model,
            "max_tokens": MAX_TOKENS,
            "messages": [{ "role": "user", "content": prompt }],
        });
        if let (Some(obj), Some(extra)) = (body.as_object_mut(), extra.and_then(|e| match e {
            serde_json::Value::Object(map) => Some(map),
            _ => None,
        })) {
            obj.extend(extra);
        }

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("{} request failed: {}", self.label, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "{} API error {}: {}",
                self.label,
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            AppError::Provider(format!("{} response decode failed: {}", self.label, e))
        })?;

        let first = chat
            .choices
            .first()
            .ok_or_else(|| AppError::Provider(format!("{} returned no choices", self.label)))?;

        if first.finish_reason.as_deref() == Some("length") {
            tracing::warn!(
                provider = self.label,
                "response was truncated at the max_tokens limit"
            );
        }

        let text = first.message.content.clone().unwrap_or_default();
        let (input_tokens, output_tokens) = chat
            .usage
            .as_ref()
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));

        Ok((
            Completion {
                text,
                input_tokens,
                output_tokens,
            },
            chat,
        ))
    }
}

pub struct OpenAiClient {
    api: ChatApi,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api: ChatApi::new(DEFAULT_BASE_URL, api_key, "OpenAI"),
            model: ANALYSIS_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.api.set_base_url(base_url);
        self
    }
}

#[async_trait]
impl ProviderClient for OpenAiClient {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, query: &str) -> Result<AiResponse> {
        let (completion, _) = self
            .api
            .send(&self.model, &analysis_prompt(query), None)
            .await?;

        tracing::info!(
            provider = "openai",
            query = %query.chars().take(60).collect::<String>(),
            input_tokens = completion.input_tokens,
            output_tokens = completion.output_tokens,
            "analysis call finished"
        );

        let data = parse_structured_data(&completion.text, "openai");

        Ok(AiResponse {
            provider: ProviderId::OpenAi,
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
