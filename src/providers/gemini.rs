//! Google Gemini adapter (`generateContent` API).

use crate::providers::shared::{analysis_prompt, extract_raw_text, parse_structured_data};
use crate::providers::ProviderClient;
use crate::types::{AiResponse, AppError, ProviderId, Result, TokenUsage};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const ANALYSIS_MODEL: &str = "gemini-2.0-flash";

pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key,
            model: ANALYSIS_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl ProviderClient for GeminiClient {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn analyze(&self, query: &str) -> Result<AiResponse> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let response = self
            .http
            .post(&url)
            .json(&json!({
                "contents": [{ "parts": [{ "text": analysis_prompt(query) }] }],
            }))
            .send()
            .await
            .map_err(|e| AppError::Provider(format!("Gemini request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Provider(format!(
                "Gemini API error {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let generated: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AppError::Provider(format!("Gemini response decode failed: {}", e)))?;

        let text = generated
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        let (input_tokens, output_tokens) = generated
            .usage_metadata
            .map(|u| (u.prompt_token_count, u.candidates_token_count))
            .unwrap_or((0, 0));

        tracing::info!(
            provider = "gemini",
            query = %query.chars().take(60).collect::<String>(),
            input_tokens,
            output_tokens,
            "analysis call finished"
        );

        let data = parse_structured_data(&text, "gemini");

        Ok(AiResponse {
            provider: ProviderId::Gemini,
            raw_text: extract_raw_text(&text),
            entities: data.entities,
            citations: data.citations,
            key_themes: data.key_themes,
            model: self.model.clone(),
            usage: vec![TokenUsage::analysis(input_tokens, output_tokens)],
            related_questions: None,
            quoted_phrases: None,
        })
    }
}
