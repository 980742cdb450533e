//! Common types and error handling shared across the crate.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============= Providers =============

/// One independent external AI provider queried for topic analysis.
///
/// The variant order here is the fixed enumeration order used everywhere a
/// per-provider map is filled: results are assembled in this order regardless
/// of which provider finished first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Claude,
    OpenAi,
    Gemini,
    Perplexity,
    Grok,
}

impl ProviderId {
    /// All providers in fixed enumeration order.
    pub const ALL: [ProviderId; 5] = [
        ProviderId::Claude,
        ProviderId::OpenAi,
        ProviderId::Gemini,
        ProviderId::Perplexity,
        ProviderId::Grok,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Claude => "claude",
            ProviderId::OpenAi => "openai",
            ProviderId::Gemini => "gemini",
            ProviderId::Perplexity => "perplexity",
            ProviderId::Grok => "grok",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============= Provider Response Types =============

/// A named entity extracted from a provider's analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Entity {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Entities grouped by category, as returned by a single provider.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExtractedEntities {
    pub people: Vec<Entity>,
    pub organizations: Vec<Entity>,
}

/// A source a provider recommends for learning more about the topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Citation {
    pub title: String,
    pub url: String,
}

/// A short phrase capturing a salient concept, scored 1-5 for relevance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct KeyTheme {
    pub phrase: String,
    pub relevance: u8,
}

/// A notable phrase a provider quoted, scored 1-5 for frequency.
///
/// Provider-specific extension field (Grok).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QuotedPhrase {
    pub phrase: String,
    pub frequency: u8,
}

/// What a token-spending call was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TokenPurpose {
    Expansion,
    Analysis,
}

/// Token accounting for one provider or expansion call. Purely additive,
/// never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub purpose: TokenPurpose,
}

impl TokenUsage {
    pub fn expansion(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            purpose: TokenPurpose::Expansion,
        }
    }

    pub fn analysis(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            purpose: TokenPurpose::Analysis,
        }
    }
}

/// One provider's structured answer for a query.
///
/// For a multi-query analysis this is also the collapsed per-provider shape:
/// the scheduler merges several per-query responses into one of these before
/// the cross-provider merge runs.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AiResponse {
    pub provider: ProviderId,
    pub raw_text: String,
    pub entities: ExtractedEntities,
    pub citations: Vec<Citation>,
    pub key_themes: Vec<KeyTheme>,
    pub model: String,
    pub usage: Vec<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_questions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted_phrases: Option<Vec<QuotedPhrase>>,
}

// ============= Merged Views =============

/// A word and how often it appeared across provider analyses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WordFrequency {
    pub word: String,
    pub count: u64,
}

/// An entity deduplicated across providers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CombinedEntity {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// How many times any provider mentioned this entity.
    pub mentions: u64,
    /// Distinct providers that mentioned it.
    pub providers: Vec<ProviderId>,
}

/// Deduplicated, ranked entities per category.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CombinedEntities {
    pub people: Vec<CombinedEntity>,
    pub organizations: Vec<CombinedEntity>,
}

/// A source URL deduplicated across providers, annotated with which
/// providers independently suggested it and its normalized domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CombinedCitation {
    pub title: String,
    pub url: String,
    pub domain: String,
    pub providers: Vec<ProviderId>,
}

// ============= Analysis Result =============

/// Fixed-shape map of provider to collapsed response.
///
/// Invariant (paired with [`ProviderErrors`]): every configured provider ends
/// an analysis with exactly one of a response or an error recorded, never
/// both, never neither.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProviderResponses {
    pub claude: Option<AiResponse>,
    pub openai: Option<AiResponse>,
    pub gemini: Option<AiResponse>,
    pub perplexity: Option<AiResponse>,
    pub grok: Option<AiResponse>,
}

impl ProviderResponses {
    pub fn set(&mut self, provider: ProviderId, response: AiResponse) {
        match provider {
            ProviderId::Claude => self.claude = Some(response),
            ProviderId::OpenAi => self.openai = Some(response),
            ProviderId::Gemini => self.gemini = Some(response),
            ProviderId::Perplexity => self.perplexity = Some(response),
            ProviderId::Grok => self.grok = Some(response),
        }
    }

    pub fn get(&self, provider: ProviderId) -> Option<&AiResponse> {
        match provider {
            ProviderId::Claude => self.claude.as_ref(),
            ProviderId::OpenAi => self.openai.as_ref(),
            ProviderId::Gemini => self.gemini.as_ref(),
            ProviderId::Perplexity => self.perplexity.as_ref(),
            ProviderId::Grok => self.grok.as_ref(),
        }
    }

    /// Responses present, in fixed enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (ProviderId, &AiResponse)> {
        ProviderId::ALL
            .iter()
            .filter_map(|p| self.get(*p).map(|r| (*p, r)))
    }

    pub fn success_count(&self) -> usize {
        self.iter().count()
    }
}

/// Fixed-shape map of provider to categorized failure reason.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ProviderErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claude: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gemini: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub perplexity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grok: Option<String>,
}

impl ProviderErrors {
    pub fn set(&mut self, provider: ProviderId, message: String) {
        match provider {
            ProviderId::Claude => self.claude = Some(message),
            ProviderId::OpenAi => self.openai = Some(message),
            ProviderId::Gemini => self.gemini = Some(message),
            ProviderId::Perplexity => self.perplexity = Some(message),
            ProviderId::Grok => self.grok = Some(message),
        }
    }

    pub fn get(&self, provider: ProviderId) -> Option<&str> {
        match provider {
            ProviderId::Claude => self.claude.as_deref(),
            ProviderId::OpenAi => self.openai.as_deref(),
            ProviderId::Gemini => self.gemini.as_deref(),
            ProviderId::Perplexity => self.perplexity.as_deref(),
            ProviderId::Grok => self.grok.as_deref(),
        }
    }

    /// Failures recorded, in fixed enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (ProviderId, &str)> {
        ProviderId::ALL
            .iter()
            .filter_map(|p| self.get(*p).map(|e| (*p, e)))
    }
}

/// The persisted unit: one topic analyzed across all configured providers,
/// merged. Created once, immutable after persistence.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResult {
    pub topic: String,
    pub expanded_queries: Vec<String>,
    pub responses: ProviderResponses,
    pub errors: ProviderErrors,
    pub combined_word_frequencies: Vec<WordFrequency>,
    pub combined_key_themes: Vec<KeyTheme>,
    pub combined_entities: CombinedEntities,
    pub combined_citations: Vec<CombinedCitation>,
    pub token_usage: Vec<TokenUsage>,
}

/// Persisted record layout: retrievable by generated id.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StoredAnalysis {
    pub id: String,
    pub topic: String,
    pub result: AnalysisResult,
}

// ============= API Request/Response Types =============

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    pub topic: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeResponse {
    pub id: String,
    #[serde(flatten)]
    pub result: AnalysisResult,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Analysis is temporarily unavailable")]
    Disabled,

    #[error("{0}")]
    RateLimited(String),

    #[error("No AI providers are configured")]
    NoProviders,

    #[error("All AI providers failed")]
    AllProvidersFailed(ProviderErrors),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let (status, body) = match self {
            AppError::InvalidInput(msg) => {
                (StatusCode::BAD_REQUEST, serde_json::json!({ "error": msg }))
            }
            AppError::Disabled => (
                StatusCode::SERVICE_UNAVAILABLE,
                serde_json::json!({ "error": "Analysis is temporarily unavailable" }),
            ),
            AppError::RateLimited(msg) => (
                StatusCode::TOO_MANY_REQUESTS,
                serde_json::json!({ "error": msg }),
            ),
            AppError::NoProviders => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": "No AI providers are configured" }),
            ),
            AppError::AllProvidersFailed(details) => (
                StatusCode::BAD_GATEWAY,
                serde_json::json!({ "error": "All AI providers failed", "details": details }),
            ),
            AppError::Provider(msg) => (StatusCode::BAD_GATEWAY, serde_json::json!({ "error": msg })),
            AppError::Database(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": msg }),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, serde_json::json!({ "error": msg })),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({ "error": msg }),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_ids_serialize_lowercase() {
        assert_eq!(
            serde_json::to_string(&ProviderId::OpenAi).unwrap(),
            "\"openai\""
        );
        assert_eq!(ProviderId::Perplexity.to_string(), "perplexity");
    }

    #[test]
    fn provider_responses_iterate_in_fixed_order() {
        let mut responses = ProviderResponses::default();
        let mk = |p: ProviderId| AiResponse {
            provider: p,
            raw_text: String::new(),
            entities: ExtractedEntities::default(),
            citations: vec![],
            key_themes: vec![],
            model: "m".into(),
            usage: vec![],
            related_questions: None,
            quoted_phrases: None,
        };
        // Insert out of order; iteration must come back in enumeration order.
        responses.set(ProviderId::Grok, mk(ProviderId::Grok));
        responses.set(ProviderId::Claude, mk(ProviderId::Claude));

        let order: Vec<ProviderId> = responses.iter().map(|(p, _)| p).collect();
        assert_eq!(order, vec![ProviderId::Claude, ProviderId::Grok]);
        assert_eq!(responses.success_count(), 2);
    }

    #[test]
    fn provider_errors_skip_absent_slots_in_json() {
        let mut errors = ProviderErrors::default();
        errors.set(ProviderId::Gemini, "Timed out after 50s".into());

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json, serde_json::json!({ "gemini": "Timed out after 50s" }));
    }
}
