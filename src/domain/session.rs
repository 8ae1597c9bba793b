use super::tiers::DeliveryStrategy;
use serde::Serialize;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One pipeline run. Every local path it names lives directly under the
/// staging root and is prefixed with the session id, so concurrent sessions
/// never collide.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub source_urls: Vec<String>,
    pub staged_files: Vec<PathBuf>,
    pub concatenated: Option<PathBuf>,
    pub final_output: Option<PathBuf>,
    pub strategy: Option<DeliveryStrategy>,
    pub sizes: StageSizes,
    pub outcome: Option<Outcome>,
    staging_root: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Byte size observed after each stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSizes {
    pub fetched: u64,
    pub concatenated: u64,
    pub delivered: u64,
}

impl Session {
    pub fn new(staging_root: impl Into<PathBuf>, source_urls: Vec<String>) -> Self {
        Self::with_id(
            Uuid::new_v4().simple().to_string(),
            staging_root,
            source_urls,
        )
    }

    pub fn with_id(
        id: impl Into<String>,
        staging_root: impl Into<PathBuf>,
        source_urls: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_urls,
            staged_files: Vec::new(),
            concatenated: None,
            final_output: None,
            strategy: None,
            sizes: StageSizes::default(),
            outcome: None,
            staging_root: staging_root.into(),
        }
    }

    pub fn staging_root(&self) -> &Path {
        &self.staging_root
    }

    /// Local path for the source at `index` in the input list.
    pub fn staged_path(&self, index: usize) -> PathBuf {
        self.staging_root
            .join(format!("{}_input_{:02}.mp4", self.id, index))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.staging_root.join(format!("{}_concat.txt", self.id))
    }

    pub fn concatenated_path(&self) -> PathBuf {
        self.staging_root.join(format!("{}_merged.mp4", self.id))
    }

    pub fn resized_path(&self) -> PathBuf {
        self.staging_root.join(format!("{}_resized.mp4", self.id))
    }

    pub fn compressed_path(&self) -> PathBuf {
        self.staging_root.join(format!("{}_compressed.mp4", self.id))
    }

    /// Remote identifier of the delivered artifact, relative to the folder.
    pub fn public_name(&self) -> String {
        format!("merged_{}", self.id)
    }
}

/// What the transform stage did to the concatenated artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingReport {
    pub applied: bool,
    pub method: Option<String>,
    pub original_size: u64,
    pub final_size: u64,
    pub error: Option<String>,
}

impl ProcessingReport {
    pub fn untouched(size: u64) -> Self {
        Self {
            applied: false,
            method: None,
            original_size: size,
            final_size: size,
            error: None,
        }
    }
}
