//! Query expansion: broaden a topic into several subtopic queries before the
//! fan-out.
//!
//! Expansion is strictly best-effort. Missing configuration, a failed call,
//! or an unparseable response all fall back to `[topic]`; expansion must
//! never abort the overall analysis.

use crate::providers::CompletionClient;
use crate::types::TokenUsage;
use std::sync::Arc;

const MAX_SUBTOPICS: usize = 4;

fn expansion_prompt(topic: &str) -> String {
    format!(
        r#"Given the topic: "{topic}"

Generate 3-4 distinct subtopic queries that would provide comprehensive coverage of this topic. Each query should explore a different angle or dimension — for example, different aspects like history, current state, key players, controversies, technical details, societal impact, etc.

Return ONLY a JSON array of strings, no other text:
["subtopic query 1", "subtopic query 2", "subtopic query 3"]"#
    )
}

/// Result of expanding one topic.
#[derive(Debug, Clone)]
pub struct Expansion {
    /// Subtopic queries; the original topic is always the first element.
    pub queries: Vec<String>,
    pub usage: TokenUsage,
}

pub struct QueryExpander {
    client: Option<Arc<dyn CompletionClient>>,
}

impl QueryExpander {
    pub fn new(client: Option<Arc<dyn CompletionClient>>) -> Self {
        Self { client }
    }

    /// Expand `topic` into subtopic queries. Infallible: every failure path
    /// degrades to the single original topic.
    pub async fn expand(&self, topic: &str) -> Expansion {
        let Some(client) = &self.client else {
            return Expansion {
                queries: vec![topic.to_string()],
                usage: TokenUsage::expansion(0, 0),
            };
        };

        let completion = match client.complete(&expansion_prompt(topic)).await {
            Ok(completion) => completion,
            Err(e) => {
                tracing::warn!(error = %e, "query expansion call failed, using original topic");
                return Expansion {
                    queries: vec![topic.to_string()],
                    usage: TokenUsage::expansion(0, 0),
                };
            }
        };

        let usage = TokenUsage::expansion(completion.input_tokens, completion.output_tokens);
        tracing::info!(
            input_tokens = usage.input_tokens,
            output_tokens = usage.output_tokens,
            "query expansion finished"
        );

        match parse_query_array(&completion.text) {
            Some(subtopics) => {
                let mut queries = vec![topic.to_string()];
                queries.extend(subtopics.into_iter().take(MAX_SUBTOPICS));
                Expansion { queries, usage }
            }
            None => {
                tracing::warn!("failed to parse query expansion response, using original topic");
                Expansion {
                    queries: vec![topic.to_string()],
                    usage,
                }
            }
        }
    }
}

/// Parse the first JSON-array-shaped substring of `text` as a non-empty list
/// of strings.
fn parse_query_array(text: &str) -> Option<Vec<String>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }

    let queries: Vec<String> = serde_json::from_str(&text[start..=end]).ok()?;
    let queries: Vec<String> = queries
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect();

    (!queries.is_empty()).then_some(queries)
}
