//! The fan-out scheduler: the core state machine of an analysis run.
//!
//! Two nested levels of fan-out run concurrently: one task per configured
//! provider (outer), and within each provider one timed call per subtopic
//! query (inner). Both levels wait for every call to settle; a failure never
//! short-circuits its siblings. A provider succeeds if at least one of its
//! subtopic calls succeeds; the analysis succeeds if at least one provider
//! succeeds.

use crate::analysis::expansion::QueryExpander;
use crate::analysis::progress::{ProgressEvent, ProgressSink};
use crate::analysis::timeout::with_timeout;
use crate::analysis::{citations, entities, themes, word_frequency};
use crate::providers::ProviderClient;
use crate::types::{
    AiResponse, AnalysisResult, AppError, ProviderErrors, ProviderId, ProviderResponses,
    QuotedPhrase, Result, StoredAnalysis,
};
use crate::store::AnalysisStore;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const MAX_EXTENSION_ITEMS: usize = 15;
const PERSIST_RETRY_BACKOFF: Duration = Duration::from_millis(500);
const PASSTHROUGH_ERROR_LIMIT: usize = 120;

pub struct AnalysisScheduler {
    providers: Vec<Arc<dyn ProviderClient>>,
    expander: QueryExpander,
    store: Arc<dyn AnalysisStore>,
    call_timeout: Duration,
}

impl AnalysisScheduler {
    pub fn new(
        providers: Vec<Arc<dyn ProviderClient>>,
        expander: QueryExpander,
        store: Arc<dyn AnalysisStore>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            providers,
            expander,
            store,
            call_timeout,
        }
    }

    pub fn provider_ids(&self) -> Vec<ProviderId> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    /// Run one full analysis: expand, fan out, merge, persist.
    ///
    /// Returns `Ok(None)` when the caller cancelled at a checkpoint (before
    /// dispatch or before persistence): a clean abort, not an error.
    pub async fn run(
        &self,
        topic: &str,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Result<Option<StoredAnalysis>> {
        if self.providers.is_empty() {
            return Err(AppError::NoProviders);
        }

        sink.emit(ProgressEvent::Expanding);
        let expansion = self.expander.expand(topic).await;
        let queries = expansion.queries.clone();

        sink.emit(ProgressEvent::Querying {
            providers: self.provider_ids(),
            queries: queries.clone(),
        });

        // Checkpoint: the caller may already be gone before any provider
        // spend happens.
        if cancel.is_cancelled() {
            tracing::debug!(topic, "analysis cancelled before dispatch");
            return Ok(None);
        }

        let outcomes = join_all(
            self.providers
                .iter()
                .map(|provider| self.run_provider(provider.clone(), &queries, sink)),
        )
        .await;

        let mut responses = ProviderResponses::default();
        let mut errors = ProviderErrors::default();
        for (provider, outcome) in self.providers.iter().zip(outcomes) {
            match outcome {
                Ok(response) => responses.set(provider.id(), response),
                Err(reason) => errors.set(provider.id(), reason),
            }
        }

        if responses.success_count() == 0 {
            sink.emit(ProgressEvent::Error {
                message: "All AI providers failed".to_string(),
            });
            return Err(AppError::AllProvidersFailed(errors));
        }

        sink.emit(ProgressEvent::Merging);
        let result = merge_analysis(topic, queries, responses, errors, expansion.usage);

        // Checkpoint: nothing has been persisted yet; a disconnected caller
        // silently drops the analysis here.
        if cancel.is_cancelled() {
            tracing::debug!(topic, "analysis cancelled before persistence");
            return Ok(None);
        }

        let record = StoredAnalysis {
            id: uuid::Uuid::new_v4().to_string(),
            topic: topic.to_string(),
            result,
        };

        if let Err(e) = self.persist(&record).await {
            sink.emit(ProgressEvent::Error {
                message: "Analysis completed but could not be saved".to_string(),
            });
            return Err(e);
        }

        sink.emit(ProgressEvent::Complete {
            id: record.id.clone(),
        });
        Ok(Some(record))
    }

    /// Inner fan-out: all subtopic calls for one provider, concurrently, each
    /// bounded by the call timeout. All calls settle before this returns.
    async fn run_provider(
        &self,
        provider: Arc<dyn ProviderClient>,
        queries: &[String],
        sink: &dyn ProgressSink,
    ) -> std::result::Result<AiResponse, String> {
        let id = provider.id();
        let calls = queries.iter().enumerate().map(|(i, query)| {
            let provider = provider.clone();
            async move {
                with_timeout(
                    provider.analyze(query),
                    self.call_timeout,
                    &format!("{} query {}", id, i + 1),
                )
                .await
            }
        });

        let settled = join_all(calls).await;

        let mut successes = Vec::new();
        let mut first_failure: Option<String> = None;
        for outcome in settled {
            match outcome {
                Ok(response) => successes.push(response),
                Err(e) => {
                    if first_failure.is_none() {
                        first_failure = Some(e.to_string());
                    }
                }
            }
        }

        if successes.is_empty() {
            let reason = categorize_provider_error(
                &first_failure.unwrap_or_else(|| "all subtopic queries failed".to_string()),
            );
            tracing::warn!(provider = %id, reason, "provider failed for every subtopic query");
            sink.emit(ProgressEvent::ProviderFailed {
                provider: id,
                error: reason.clone(),
            });
            return Err(reason);
        }

        tracing::info!(
            provider = %id,
            successes = successes.len(),
            queries = queries.len(),
            "provider finished"
        );
        sink.emit(ProgressEvent::ProviderDone { provider: id });
        Ok(collapse_responses(id, successes))
    }

    async fn persist(&self, record: &StoredAnalysis) -> Result<()> {
        match self.store.save(record).await {
            Ok(()) => Ok(()),
            Err(first) => {
                tracing::warn!(error = %first, id = %record.id, "persist failed, retrying once");
                tokio::time::sleep(PERSIST_RETRY_BACKOFF).await;
                self.store.save(record).await
            }
        }
    }
}

/// Collapse one provider's per-query responses into a single response:
/// raw texts joined by a blank line, structured fields merged, extension
/// fields deduplicated and capped.
fn collapse_responses(provider: ProviderId, responses: Vec<AiResponse>) -> AiResponse {
    debug_assert!(!responses.is_empty());

    let model = responses[0].model.clone();

    let raw_text = responses
        .iter()
        .map(|r| r.raw_text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    let entity_lists: Vec<_> = responses
        .iter()
        .map(|r| (provider, r.entities.clone()))
        .collect();
    let combined = entities::merge_entities(&entity_lists);
    let entities = crate::types::ExtractedEntities {
        people: combined
            .people
            .into_iter()
            .map(|e| crate::types::Entity {
                name: e.name,
                url: e.url,
            })
            .collect(),
        organizations: combined
            .organizations
            .into_iter()
            .map(|e| crate::types::Entity {
                name: e.name,
                url: e.url,
            })
            .collect(),
    };

    let citations = responses
        .iter()
        .flat_map(|r| r.citations.iter().cloned())
        .collect();

    let theme_lists: Vec<_> = responses.iter().map(|r| r.key_themes.clone()).collect();
    let key_themes = themes::merge_key_themes(&theme_lists);

    let usage = responses.iter().flat_map(|r| r.usage.iter().cloned()).collect();

    let related_questions = merge_related_questions(&responses);
    let quoted_phrases = merge_quoted_phrases(&responses);

    AiResponse {
        provider,
        raw_text,
        entities,
        citations,
        key_themes,
        model,
        usage,
        related_questions,
        quoted_phrases,
    }
}

/// First-seen dedup (case-insensitive), capped.
fn merge_related_questions(responses: &[AiResponse]) -> Option<Vec<String>> {
    if responses.iter().all(|r| r.related_questions.is_none()) {
        return None;
    }

    let mut seen = std::collections::HashSet::new();
    let mut questions = Vec::new();
    for question in responses
        .iter()
        .filter_map(|r| r.related_questions.as_ref())
        .flatten()
    {
        let key = question.trim().to_lowercase();
        if !key.is_empty() && seen.insert(key) {
            questions.push(question.clone());
        }
    }
    questions.truncate(MAX_EXTENSION_ITEMS);
    Some(questions)
}

/// Dedup by phrase keeping the highest frequency, ranked by frequency, capped.
fn merge_quoted_phrases(responses: &[AiResponse]) -> Option<Vec<QuotedPhrase>> {
    if responses.iter().all(|r| r.quoted_phrases.is_none()) {
        return None;
    }

    let mut order: Vec<QuotedPhrase> = Vec::new();
    let mut index: std::collections::HashMap<String, usize> = std::collections::HashMap::new();
    for phrase in responses
        .iter()
        .filter_map(|r| r.quoted_phrases.as_ref())
        .flatten()
    {
        let key = phrase.phrase.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        match index.get(&key) {
            Some(&i) => order[i].frequency = order[i].frequency.max(phrase.frequency),
            None => {
                index.insert(key, order.len());
                order.push(phrase.clone());
            }
        }
    }
    order.sort_by(|a, b| b.frequency.cmp(&a.frequency));
    order.truncate(MAX_EXTENSION_ITEMS);
    Some(order)
}

/// Build the final merged result from the per-provider maps.
fn merge_analysis(
    topic: &str,
    expanded_queries: Vec<String>,
    responses: ProviderResponses,
    errors: ProviderErrors,
    expansion_usage: crate::types::TokenUsage,
) -> AnalysisResult {
    let topic_words = word_frequency::tokenize(topic);

    let word_freq_lists: Vec<_> = responses
        .iter()
        .map(|(_, r)| word_frequency::calculate(&r.raw_text, &topic_words))
        .collect();
    let entity_lists: Vec<_> = responses
        .iter()
        .map(|(p, r)| (p, r.entities.clone()))
        .collect();
    let citation_lists: Vec<_> = responses
        .iter()
        .map(|(p, r)| (p, r.citations.clone()))
        .collect();
    let theme_lists: Vec<_> = responses.iter().map(|(_, r)| r.key_themes.clone()).collect();

    let mut token_usage = vec![expansion_usage];
    for (_, response) in responses.iter() {
        token_usage.extend(response.usage.iter().cloned());
    }

    AnalysisResult {
        topic: topic.to_string(),
        expanded_queries,
        combined_word_frequencies: word_frequency::merge(&word_freq_lists),
        combined_key_themes: themes::merge_key_themes(&theme_lists),
        combined_entities: entities::merge_entities(&entity_lists),
        combined_citations: citations::merge_citations(&citation_lists),
        responses,
        errors,
        token_usage,
    }
}

/// Map a raw provider error message onto a short human-readable reason.
/// Unmatched messages pass through truncated to a bounded length.
pub fn categorize_provider_error(message: &str) -> String {
    let lower = message.to_lowercase();

    if lower.contains("timed out") {
        "Timed out waiting for a response".to_string()
    } else if lower.contains("rate limit") || lower.contains("429") {
        "Rate limited by the provider".to_string()
    } else if lower.contains("overloaded") || lower.contains("529") {
        "Provider is overloaded".to_string()
    } else if lower.contains("401")
        || lower.contains("unauthorized")
        || lower.contains("authentication")
        || lower.contains("api key")
    {
        "Authentication failed".to_string()
    } else if lower.contains("403") || lower.contains("forbidden") || lower.contains("permission") {
        "Permission denied".to_string()
    } else if lower.contains("500")
        || lower.contains("502")
        || lower.contains("503")
        || lower.contains("internal server")
    {
        "Provider internal error".to_string()
    } else if lower.contains("network")
        || lower.contains("connect")
        || lower.contains("dns")
        || lower.contains("unreachable")
    {
        "Network unreachable".to_string()
    } else if lower.contains("all subtopic queries failed") {
        message.to_string()
    } else if message.chars().count() > PASSTHROUGH_ERROR_LIMIT {
        let truncated: String = message.chars().take(PASSTHROUGH_ERROR_LIMIT).collect();
        format!("{truncated}…")
    } else {
        message.to_string()
    }
}
