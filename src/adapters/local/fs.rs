use crate::error::DeliveryFailure;
use crate::ports::storage::{RemoteAsset, RemoteStorage, UploadRequest, UploadedAsset};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::error::Error;
use std::path::{Path, PathBuf};

/// Stores delivered artifacts in a local directory served under `base_url`.
/// Every strategy is a plain copy; the file modification time stands in for
/// the creation timestamp.
#[derive(Clone, Debug)]
pub struct FsStorage {
    root: PathBuf,
    base_url: String,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.into(),
        }
    }

    fn asset_path(&self, public_id: &str) -> PathBuf {
        self.root.join(format!("{}.mp4", public_id))
    }
}

#[async_trait]
impl RemoteStorage for FsStorage {
    async fn upload(
        &self,
        local_path: &Path,
        request: &UploadRequest,
    ) -> Result<UploadedAsset, DeliveryFailure> {
        let public_id = format!("{}/{}", request.folder, request.public_id);
        let dest = self.asset_path(&public_id);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = tokio::fs::copy(local_path, &dest).await?;

        Ok(UploadedAsset {
            url: format!(
                "{}/{}.mp4",
                self.base_url.trim_end_matches('/'),
                public_id
            ),
            public_id,
            bytes,
        })
    }

    async fn list_assets(
        &self,
        folder: &str,
    ) -> Result<Vec<RemoteAsset>, Box<dyn Error + Send + Sync>> {
        let dir = self.root.join(folder);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut assets = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            assets.push(RemoteAsset {
                public_id: format!("{}/{}", folder, stem),
                created_at: DateTime::<Utc>::from(metadata.modified()?),
                bytes: metadata.len(),
            });
        }
        Ok(assets)
    }

    async fn delete(&self, public_id: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
        if public_id.contains("..") {
            return Err(format!("invalid public id {}", public_id).into());
        }
        match tokio::fs::remove_file(self.asset_path(public_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
