//! Prompt template and response parsing shared by every provider adapter.
//!
//! All providers receive the same analysis prompt and are expected to answer
//! with free-form analysis text followed by a fenced JSON block carrying the
//! structured fields. Parsing is best-effort: a malformed block degrades to an
//! empty structure, never to a failed call.

use crate::types::{Citation, Entity, ExtractedEntities, KeyTheme, QuotedPhrase};
use serde::Deserialize;

/// Build the analysis prompt for one subtopic query.
pub fn analysis_prompt(query: &str) -> String {
    format!(
        r#"Analyze the topic: "{query}"

Provide a comprehensive, fact-rich analysis of this topic. Include key facts, current context, major entities involved, and important developments.

After your analysis, output a JSON block (and nothing else after it) in exactly this format:

```json
{{
  "entities": {{
    "people": [{{"name": "Person Name", "url": "https://en.wikipedia.org/wiki/Person_Name"}}],
    "organizations": [{{"name": "Org Name", "url": "https://example.com"}}]
  }},
  "citations": [
    {{"title": "Source Title", "url": "https://example.com/article"}}
  ],
  "keyThemes": [
    {{"phrase": "carbon tax policy", "relevance": 5}},
    {{"phrase": "water contamination risks", "relevance": 4}}
  ]
}}
```

For entities, only include proper nouns (specific people and named organizations). Provide Wikipedia or official website URLs where possible. For citations, list 5-10 real sources you would recommend for learning more about this topic. For keyThemes, identify 15-20 key themes as short 2-4 word phrases that capture the most important specific concepts in your analysis. These should be meaningful and specific (e.g. "methane flaring regulations" not "environmental issues"). Score each 1-5 for relevance to the topic."#
    )
}

/// Extra instruction appended to the prompt for providers that support the
/// quoted-phrases extension field.
pub fn quoted_phrases_addendum() -> &'static str {
    r#" Additionally include a "quotedPhrases" array in the JSON block: 5-15 short phrases quoted verbatim from public discussion of this topic, each as {"phrase": "...", "frequency": 1-5} where frequency scores how often the phrase appears."#
}

/// Structured fields parsed out of a provider response.
#[derive(Debug, Default)]
pub struct StructuredData {
    pub entities: ExtractedEntities,
    pub citations: Vec<Citation>,
    pub key_themes: Vec<KeyTheme>,
    pub quoted_phrases: Vec<QuotedPhrase>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParsedJson {
    #[serde(default)]
    entities: ParsedEntities,
    #[serde(default)]
    citations: Vec<Citation>,
    #[serde(default)]
    key_themes: Vec<ParsedTheme>,
    #[serde(default)]
    quoted_phrases: Vec<ParsedQuoted>,
}

#[derive(Debug, Default, Deserialize)]
struct ParsedEntities {
    #[serde(default)]
    people: Vec<Entity>,
    #[serde(default)]
    organizations: Vec<Entity>,
}

// Relevance/frequency come back from models as numbers of unpredictable kind;
// accept anything numeric and clamp to the 1-5 range.
#[derive(Debug, Deserialize)]
struct ParsedTheme {
    phrase: String,
    #[serde(default)]
    relevance: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ParsedQuoted {
    phrase: String,
    #[serde(default)]
    frequency: f64,
}

fn clamp_score(raw: f64) -> u8 {
    raw.round().clamp(1.0, 5.0) as u8
}

/// Parse the structured JSON block out of a provider's response text.
///
/// Tries the fenced ```json block first, then falls back to the widest raw
/// object mentioning `"entities"`. Returns an empty structure when neither
/// parses; extraction problems are logged, not surfaced.
pub fn parse_structured_data(text: &str, provider_name: &str) -> StructuredData {
    let candidate = extract_json_block(text).or_else(|| extract_raw_object(text));

    let parsed = match candidate {
        Some(json) => match serde_json::from_str::<ParsedJson>(json) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(
                    provider = provider_name,
                    error = %e,
                    "failed to parse structured JSON from provider response"
                );
                ParsedJson::default()
            }
        },
        None => ParsedJson::default(),
    };

    StructuredData {
        entities: ExtractedEntities {
            people: parsed.entities.people,
            organizations: parsed.entities.organizations,
        },
        citations: parsed.citations,
        key_themes: parsed
            .key_themes
            .into_iter()
            .map(|t| KeyTheme {
                phrase: t.phrase,
                relevance: clamp_score(t.relevance),
            })
            .collect(),
        quoted_phrases: parsed
            .quoted_phrases
            .into_iter()
            .map(|q| QuotedPhrase {
                phrase: q.phrase,
                frequency: clamp_score(q.frequency),
            })
            .collect(),
    }
}

/// Strip the fenced JSON block, leaving just the analysis prose.
pub fn extract_raw_text(text: &str) -> String {
    match (text.find("```json"), text.rfind("```")) {
        (Some(start), Some(end)) if end > start => {
            let mut out = String::with_capacity(text.len());
            out.push_str(&text[..start]);
            out.push_str(&text[end + 3..]);
            out.trim().to_string()
        }
        _ => text.trim().to_string(),
    }
}

fn extract_json_block(text: &str) -> Option<&str> {
    let start = text.find("```json")? + "```json".len();
    let end = text[start..].find("```")? + start;
    Some(text[start..end].trim())
}

fn extract_raw_object(text: &str) -> Option<&str> {
    if !text.contains("\"entities\"") {
        return None;
    }
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"Rust is a systems language with a growing ecosystem.

```json
{
  "entities": {
    "people": [{"name": "Graydon Hoare"}],
    "organizations": [{"name": "Rust Foundation", "url": "https://rustfoundation.org"}]
  },
  "citations": [{"title": "The Rust Book", "url": "https://doc.rust-lang.org/book/"}],
  "keyThemes": [{"phrase": "memory safety", "relevance": 5}]
}
```"#;

    #[test]
    fn parses_fenced_json_block() {
        let data = parse_structured_data(RESPONSE, "test");
        assert_eq!(data.entities.people[0].name, "Graydon Hoare");
        assert_eq!(
            data.entities.organizations[0].url.as_deref(),
            Some("https://rustfoundation.org")
        );
        assert_eq!(data.citations.len(), 1);
        assert_eq!(data.key_themes[0].phrase, "memory safety");
        assert_eq!(data.key_themes[0].relevance, 5);
        assert!(data.quoted_phrases.is_empty());
    }

    #[test]
    fn raw_text_drops_the_json_block() {
        let raw = extract_raw_text(RESPONSE);
        assert!(raw.starts_with("Rust is a systems language"));
        assert!(!raw.contains("```"));
        assert!(!raw.contains("keyThemes"));
    }

    #[test]
    fn falls_back_to_raw_object_without_fences() {
        let text = r#"Analysis text. {"entities": {"people": [{"name": "Ada Lovelace"}], "organizations": []}, "citations": [], "keyThemes": []}"#;
        let data = parse_structured_data(text, "test");
        assert_eq!(data.entities.people[0].name, "Ada Lovelace");
    }

    #[test]
    fn malformed_json_degrades_to_empty() {
        let text = "No structure here at all.";
        let data = parse_structured_data(text, "test");
        assert!(data.entities.people.is_empty());
        assert!(data.citations.is_empty());
        assert!(data.key_themes.is_empty());
    }

    #[test]
    fn scores_are_clamped_to_one_through_five() {
        let text = r#"```json
{"entities": {"people": [], "organizations": []}, "citations": [], "keyThemes": [{"phrase": "overscored theme", "relevance": 11}, {"phrase": "underscored theme", "relevance": 0}]}
```"#;
        let data = parse_structured_data(text, "test");
        assert_eq!(data.key_themes[0].relevance, 5);
        assert_eq!(data.key_themes[1].relevance, 1);
    }
}
