//! # Hivemind
//!
//! Ask several independent AI providers what they "know" about a topic and
//! merge their answers into one ranked, deduplicated view: key themes, named
//! entities, citations, and word-cloud data.
//!
//! ## Overview
//!
//! A request flows through the analysis orchestration core:
//!
//! 1. **Query expansion**: the topic is broadened into 2-5 subtopic queries
//!    (falling back to the topic alone on any failure).
//! 2. **Fan-out**: every (provider, subtopic query) call runs concurrently,
//!    each bounded by a per-call timeout; failures never abort siblings.
//! 3. **Per-provider collapse**: each provider's subtopic answers merge into
//!    one response.
//! 4. **Cross-provider merge**: word frequencies, entities, citations, and
//!    key themes are deduplicated and ranked across providers.
//! 5. **Persistence**: the merged result is stored under a generated id and
//!    progress events stream to the caller throughout.
//!
//! Partial success is a normal terminal state: the result records, for every
//! configured provider, either its merged response or a categorized failure
//! reason.
//!
//! ## Modules
//!
//! - [`analysis`] - Orchestration core: expansion, fan-out scheduler, mergers
//! - [`api`] - REST API handlers and routes
//! - [`providers`] - Provider adapters behind the `ProviderClient` trait
//! - [`rate_limit`] - Sliding-window per-IP rate limiting
//! - [`store`] - Analysis persistence (libsql)
//! - [`types`] - Common types and error handling

/// Analysis orchestration core.
pub mod analysis;
/// HTTP API handlers and routes.
pub mod api;
/// Environment-driven configuration.
pub mod config;
/// Provider clients and the credential-driven registry.
pub mod providers;
/// Per-IP sliding-window rate limiting.
pub mod rate_limit;
/// Analysis persistence.
pub mod store;
/// Common types (requests, responses, errors).
pub mod types;

// Re-export commonly used types
pub use analysis::{AnalysisScheduler, ProgressEvent, ProgressSink, QueryExpander};
pub use config::Config;
pub use providers::{configured_providers, expansion_client, ProviderClient};
pub use rate_limit::{RateLimitDecision, RateLimiter};
pub use store::{AnalysisStore, LibsqlStore};
pub use types::{AppError, Result};

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Environment-driven configuration
    pub config: Arc<Config>,
    /// The fan-out scheduler
    pub scheduler: Arc<AnalysisScheduler>,
    /// Analysis store (also used directly by the fetch-by-id handler)
    pub store: Arc<dyn AnalysisStore>,
    /// Per-IP rate limiter
    pub rate_limiter: Arc<RateLimiter>,
}
