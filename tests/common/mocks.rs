//! Mock implementations for testing.
//!
//! Provides mock provider clients, a scripted completion backend, and an
//! in-memory store with failure injection, shared across test files without
//! duplication.

use async_trait::async_trait;
use hivemind::providers::{Completion, CompletionClient, ProviderClient};
use hivemind::store::AnalysisStore;
use hivemind::types::{
    AiResponse, AppError, Citation, ExtractedEntities, ProviderId, Result, StoredAnalysis,
    TokenUsage,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Mock provider client with configurable behavior.
///
/// Can be configured to return a fixed analysis text, to fail every call with
/// a given raw error message, or to hang forever (for timeout tests). Call
/// counts are tracked so tests can assert fan-out shapes.
pub struct MockProvider {
    id: ProviderId,
    text: String,
    citations: Vec<Citation>,
    failure: Option<String>,
    hang: bool,
    calls: AtomicUsize,
}

impl MockProvider {
    /// A provider that answers every query with the given analysis text.
    pub fn new(id: ProviderId, text: &str) -> Self {
        Self {
            id,
            text: text.to_string(),
            citations: vec![],
            failure: None,
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// A provider that fails every call with the given raw error message.
    pub fn failing(id: ProviderId, message: &str) -> Self {
        Self {
            id,
            text: String::new(),
            citations: vec![],
            failure: Some(message.to_string()),
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// A provider whose calls never complete.
    pub fn hanging(id: ProviderId) -> Self {
        Self {
            id,
            text: String::new(),
            citations: vec![],
            failure: None,
            hang: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// Attach citations to every successful response.
    pub fn with_citations(mut self, citations: Vec<(&str, &str)>) -> Self {
        self.citations = citations
            .into_iter()
            .map(|(title, url)| Citation {
                title: title.to_string(),
                url: url.to_string(),
            })
            .collect();
        self
    }

    /// How many analyze calls this provider has received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProviderClient for MockProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn analyze(&self, _query: &str) -> Result<AiResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if self.hang {
            std::future::pending::<()>().await;
        }
        if let Some(message) = &self.failure {
            return Err(AppError::Provider(message.clone()));
        }

        Ok(AiResponse {
            provider: self.id,
            raw_text: self.text.clone(),
            entities: ExtractedEntities::default(),
            citations: self.citations.clone(),
            key_themes: vec![],
            model: "mock-model".to_string(),
            usage: vec![TokenUsage::analysis(10, 20)],
            related_questions: None,
            quoted_phrases: None,
        })
    }
}

/// Scripted completion backend for query expansion.
pub struct MockCompletion {
    text: String,
    should_fail: bool,
}

impl MockCompletion {
    /// A backend that answers every prompt with the given text.
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            should_fail: false,
        }
    }

    /// A backend that always returns an error.
    pub fn failing() -> Self {
        Self {
            text: String::new(),
            should_fail: true,
        }
    }
}

#[async_trait]
impl CompletionClient for MockCompletion {
    async fn complete(&self, _prompt: &str) -> Result<Completion> {
        if self.should_fail {
            return Err(AppError::Provider("Mock completion failure".to_string()));
        }
        Ok(Completion {
            text: self.text.clone(),
            input_tokens: 7,
            output_tokens: 21,
        })
    }
}

/// In-memory store with failure injection for persistence-retry tests.
pub struct MemoryStore {
    records: Mutex<HashMap<String, StoredAnalysis>>,
    failures_left: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::failing_times(0)
    }

    /// A store whose first `n` save calls fail.
    pub fn failing_times(n: usize) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            failures_left: AtomicUsize::new(n),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl AnalysisStore for MemoryStore {
    async fn save(&self, record: &StoredAnalysis) -> Result<()> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(AppError::Database("injected save failure".to_string()));
        }
        self.records
            .lock()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<Option<StoredAnalysis>> {
        Ok(self.records.lock().get(id).cloned())
    }
}
