use crate::domain::tiers::DeliveryStrategy;
use crate::error::DeliveryFailure;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::error::Error;
use std::path::Path;

/// Parameters of one upload attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Identifier relative to `folder`.
    pub public_id: String,
    pub folder: String,
    pub strategy: DeliveryStrategy,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedAsset {
    /// Full identifier including the folder.
    pub public_id: String,
    pub url: String,
    pub bytes: u64,
}

/// An artifact already delivered to remote storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAsset {
    pub public_id: String,
    pub created_at: DateTime<Utc>,
    pub bytes: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Upload a local file using the operation matching `request.strategy`.
    async fn upload(
        &self,
        local_path: &Path,
        request: &UploadRequest,
    ) -> Result<UploadedAsset, DeliveryFailure>;

    /// List every asset stored under `folder`.
    async fn list_assets(
        &self,
        folder: &str,
    ) -> Result<Vec<RemoteAsset>, Box<dyn Error + Send + Sync>>;

    /// Delete one asset by its full identifier.
    async fn delete(&self, public_id: &str) -> Result<(), Box<dyn Error + Send + Sync>>;
}
