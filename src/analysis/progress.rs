//! Lifecycle progress events streamed to the caller while an analysis runs.
//!
//! The event vocabulary is the contract; the transport (SSE here) is not.
//! A well-formed sequence is `expanding`, `querying`,
//! `{provider_done | provider_failed}*`, `merging`, then `complete` or
//! `error`.

use crate::types::ProviderId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum ProgressEvent {
    Expanding,
    Querying {
        providers: Vec<ProviderId>,
        queries: Vec<String>,
    },
    ProviderDone {
        provider: ProviderId,
    },
    ProviderFailed {
        provider: ProviderId,
        error: String,
    },
    Merging,
    Complete {
        id: String,
    },
    Error {
        message: String,
    },
}

/// Where progress events go. Emission is infallible by contract: a sink that
/// can no longer deliver (caller disconnected) swallows the event, and must
/// never affect scheduling.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event. Used by the synchronous endpoint.
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Forwards events into a tokio mpsc channel; a closed receiver drops the
/// event silently.
pub struct ChannelSink {
    tx: tokio::sync::mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(tx: tokio::sync::mpsc::UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}
