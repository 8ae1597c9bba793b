use crate::domain::session::ProcessingReport;
use crate::domain::tiers::DeliveryStrategy;
use crate::error::PipelineError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of a successful merge, as reported to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    pub video_url: String,
    pub public_id: String,
    pub videos_processed: usize,
    pub file_size: u64,
    pub processing: ProcessingReport,
    pub upload_type: DeliveryStrategy,
    pub timestamp: DateTime<Utc>,
}

/// Entry point the inbound surface drives.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MergePort: Send + Sync {
    /// Fetch, join, and deliver `urls` in order.
    async fn merge(&self, urls: Vec<String>) -> Result<MergeResult, PipelineError>;
}
