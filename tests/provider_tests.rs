//! Provider adapter tests with mocked network responses.
//!
//! These tests use wiremock to stand in for each provider's API and validate:
//! - Request shapes (paths, auth, provider-specific parameters)
//! - Response parsing into the shared structured form
//! - Error surfacing suitable for failure categorization

use hivemind::analysis::categorize_provider_error;
use hivemind::providers::anthropic::AnthropicClient;
use hivemind::providers::gemini::GeminiClient;
use hivemind::providers::grok::GrokClient;
use hivemind::providers::openai::OpenAiClient;
use hivemind::providers::perplexity::PerplexityClient;
use hivemind::providers::{CompletionClient, ProviderClient};
use hivemind::types::TokenPurpose;
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============= Helper Functions =============

/// An analysis answer: prose followed by the fenced structured block.
fn analysis_text(prose: &str) -> String {
    format!(
        r#"{prose}

```json
{{
  "entities": {{
    "people": [{{"name": "Jane Goodall", "url": "https://en.wikipedia.org/wiki/Jane_Goodall"}}],
    "organizations": [{{"name": "WWF"}}]
  }},
  "citations": [{{"title": "Conservation Primer", "url": "https://example.com/primer"}}],
  "keyThemes": [{{"phrase": "habitat loss", "relevance": 4}}]
}}
```"#
    )
}

fn chat_completions_body(text: &str) -> serde_json::Value {
    json!({
        "choices": [{
            "message": { "role": "assistant", "content": text },
            "finish_reason": "stop"
        }],
        "usage": { "prompt_tokens": 120, "completion_tokens": 340 }
    })
}

// ============= Anthropic =============

#[tokio::test]
async fn anthropic_parses_the_structured_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": analysis_text("Wildlife analysis prose.") }],
            "usage": { "input_tokens": 120, "output_tokens": 340 }
        })))
        .mount(&server)
        .await;

    let client = AnthropicClient::new("test-key".to_string()).with_base_url(server.uri());
    let response = client.analyze("wildlife conservation").await.unwrap();

    assert_eq!(response.raw_text, "Wildlife analysis prose.");
    assert_eq!(response.entities.people[0].name, "Jane Goodall");
    assert_eq!(response.entities.organizations[0].name, "WWF");
    assert_eq!(response.citations[0].url, "https://example.com/primer");
    assert_eq!(response.key_themes[0].phrase, "habitat loss");
    assert_eq!(response.usage[0].input_tokens, 120);
    assert_eq!(response.usage[0].purpose, TokenPurpose::Analysis);
}

#[tokio::test]
async fn anthropic_http_errors_categorize_cleanly() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
        .mount(&server)
        .await;

    let client = AnthropicClient::new("test-key".to_string()).with_base_url(server.uri());
    let err = client.analyze("wildlife conservation").await.unwrap_err();

    assert_eq!(
        categorize_provider_error(&err.to_string()),
        "Rate limited by the provider"
    );
}

#[tokio::test]
async fn anthropic_completion_uses_the_small_token_budget() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(body_partial_json(json!({ "max_tokens": 300 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": r#"["subtopic one", "subtopic two"]"# }],
            "usage": { "input_tokens": 15, "output_tokens": 30 }
        })))
        .mount(&server)
        .await;

    let client = AnthropicClient::new("test-key".to_string()).with_base_url(server.uri());
    let completion = client.complete("expand this").await.unwrap();

    assert!(completion.text.contains("subtopic one"));
    assert_eq!(completion.output_tokens, 30);
}

// ============= OpenAI-Compatible =============

#[tokio::test]
async fn openai_parses_chat_completions() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_completions_body(&analysis_text("OpenAI prose."))),
        )
        .mount(&server)
        .await;

    let client = OpenAiClient::new("test-key".to_string()).with_base_url(server.uri());
    let response = client.analyze("wildlife conservation").await.unwrap();

    assert_eq!(response.raw_text, "OpenAI prose.");
    assert_eq!(response.key_themes.len(), 1);
    assert_eq!(response.usage[0].input_tokens, 120);
    assert_eq!(response.usage[0].output_tokens, 340);
    assert!(response.related_questions.is_none());
}

#[tokio::test]
async fn perplexity_requests_and_carries_related_questions() {
    let server = MockServer::start().await;
    let mut body = chat_completions_body(&analysis_text("Perplexity prose."));
    body["related_questions"] = json!(["What about poaching?", "Which treaties apply?"]);

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({ "return_related_questions": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let client = PerplexityClient::new("test-key".to_string()).with_base_url(server.uri());
    let response = client.analyze("wildlife conservation").await.unwrap();

    assert_eq!(
        response.related_questions,
        Some(vec![
            "What about poaching?".to_string(),
            "Which treaties apply?".to_string()
        ])
    );
}

#[tokio::test]
async fn perplexity_leaves_related_questions_unset_when_the_api_omits_them() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(chat_completions_body(&analysis_text("Perplexity prose."))),
        )
        .mount(&server)
        .await;

    let client = PerplexityClient::new("test-key".to_string()).with_base_url(server.uri());
    let response = client.analyze("wildlife conservation").await.unwrap();

    assert_eq!(response.related_questions, None);
}

#[tokio::test]
async fn grok_asks_for_and_parses_quoted_phrases() {
    let server = MockServer::start().await;
    let text = r#"Grok prose.

```json
{
  "entities": {"people": [], "organizations": []},
  "citations": [],
  "keyThemes": [],
  "quotedPhrases": [{"phrase": "save the whales", "frequency": 5}]
}
```"#;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("quotedPhrases"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_completions_body(text)))
        .mount(&server)
        .await;

    let client = GrokClient::new("test-key".to_string()).with_base_url(server.uri());
    let response = client.analyze("wildlife conservation").await.unwrap();

    let phrases = response.quoted_phrases.unwrap();
    assert_eq!(phrases[0].phrase, "save the whales");
    assert_eq!(phrases[0].frequency, 5);
}

// ============= Gemini =============

#[tokio::test]
async fn gemini_parses_generate_content() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "parts": [{ "text": analysis_text("Gemini prose.") }] }
            }],
            "usageMetadata": { "promptTokenCount": 80, "candidatesTokenCount": 160 }
        })))
        .mount(&server)
        .await;

    let client = GeminiClient::new("test-key".to_string()).with_base_url(server.uri());
    let response = client.analyze("wildlife conservation").await.unwrap();

    assert_eq!(response.raw_text, "Gemini prose.");
    assert_eq!(response.entities.people[0].name, "Jane Goodall");
    assert_eq!(response.usage[0].input_tokens, 80);
    assert_eq!(response.usage[0].output_tokens, 160);
}

#[tokio::test]
async fn gemini_empty_candidates_degrade_to_an_empty_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1beta/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
        .mount(&server)
        .await;

    let client = GeminiClient::new("test-key".to_string()).with_base_url(server.uri());
    let response = client.analyze("wildlife conservation").await.unwrap();

    assert!(response.raw_text.is_empty());
    assert!(response.entities.people.is_empty());
    assert_eq!(response.usage[0].input_tokens, 0);
}
