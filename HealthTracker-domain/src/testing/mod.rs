// Testing utilities for crates that build on the domain layer
// This module is only available when the "mock" feature is enabled

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;

use health_tracker_data::database::DeletePolicy;
use health_tracker_data::models::HealthData;
use health_tracker_data::repository::Repositories;

use crate::clients::Summarizer;
use crate::config::AggregationConfig;
use crate::services::{create_services, Services};

/// Summarizer that answers with a fixed text and counts its calls
#[derive(Debug)]
pub struct StaticSummarizer {
    summary: String,
    configured: bool,
    calls: AtomicUsize,
}

impl StaticSummarizer {
    /// A configured summarizer that always returns `summary`
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            configured: true,
            calls: AtomicUsize::new(0),
        }
    }

    /// An unconfigured summarizer returning the fallback text
    pub fn unconfigured() -> Self {
        Self {
            summary: crate::clients::FALLBACK_SUMMARY.to_string(),
            configured: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of summaries requested so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Summarizer for StaticSummarizer {
    async fn summarize(&self, _data: &IndexMap<String, Vec<HealthData>>) -> String {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.summary.clone()
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

/// Services over fresh in-memory storage, with the default aggregation settings
pub fn in_memory_services(delete_policy: DeletePolicy, summarizer: Arc<dyn Summarizer>) -> Services {
    create_services(
        Repositories::in_memory(delete_policy),
        summarizer,
        AggregationConfig::default(),
    )
}
