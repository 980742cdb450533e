//! The analysis orchestration core: query expansion, two-level fan-out
//! across providers, result merging, and progress reporting.

pub mod citations;
pub mod entities;
pub mod expansion;
pub mod progress;
pub mod scheduler;
pub mod themes;
pub mod timeout;
pub mod word_frequency;

pub use expansion::{Expansion, QueryExpander};
pub use progress::{ChannelSink, NullSink, ProgressEvent, ProgressSink};
pub use scheduler::{categorize_provider_error, AnalysisScheduler};
