//! Configuration for the merge service.
//!
//! `ServerConfig` and `CloudConfig` come from the environment. The pipeline
//! and retention policies are plain structs handed to the services that use
//! them, so tests can inject their own thresholds.

use crate::domain::av::transform::Resolution;
use crate::domain::request::MAX_VIDEO_URLS;
use crate::domain::tiers::{TierTable, MB};
use chrono::NaiveTime;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Cloud,
    Local,
}

/// Process-level settings.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: String,
    /// Directory for per-session staging files
    pub staging_dir: PathBuf,
    pub backend: StorageBackend,
    /// Destination directory when `backend` is `Local`
    pub local_storage_dir: PathBuf,
    /// Base URL under which `local_storage_dir` is served
    pub local_public_base_url: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let backend = match env::var("STORAGE_BACKEND").as_deref() {
            Ok("local") => StorageBackend::Local,
            _ => StorageBackend::Cloud,
        };

        Self {
            addr: env::var("ADDR").unwrap_or_else(|_| String::from("127.0.0.1")),
            port: env::var("PORT").unwrap_or_else(|_| String::from("3000")),
            staging_dir: env::var("STAGING_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| env::temp_dir().join("video-merge")),
            backend,
            local_storage_dir: env::var("LOCAL_STORAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./delivered")),
            local_public_base_url: env::var("LOCAL_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| String::from("http://127.0.0.1:3000/media")),
        }
    }
}

/// Credentials and endpoints of the remote media storage service.
#[derive(Clone, Debug)]
pub struct CloudConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    /// Preset used by the unsigned fallback upload
    pub upload_preset: String,
    pub api_base: String,
}

impl CloudConfig {
    /// Load credentials from environment variables. Returns an error naming
    /// every missing variable.
    pub fn from_env() -> Result<Self, String> {
        dotenv::dotenv().ok();

        let required = ["CLOUD_NAME", "CLOUD_API_KEY", "CLOUD_API_SECRET"];
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|name| env::var(name).map(|v| v.is_empty()).unwrap_or(true))
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "missing storage credentials: {}",
                missing.join(", ")
            ));
        }

        Ok(Self {
            cloud_name: env::var("CLOUD_NAME").unwrap_or_default(),
            api_key: env::var("CLOUD_API_KEY").unwrap_or_default(),
            api_secret: env::var("CLOUD_API_SECRET").unwrap_or_default(),
            upload_preset: env::var("CLOUD_UPLOAD_PRESET")
                .unwrap_or_else(|_| String::from("ml_default")),
            api_base: env::var("CLOUD_API_BASE")
                .unwrap_or_else(|_| String::from("https://api.cloudinary.com")),
        })
    }
}

/// Thresholds and targets for one merge pipeline.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub staging_root: PathBuf,
    /// Remote folder every merged artifact is delivered to
    pub folder: String,
    pub tiers: TierTable,
    pub max_urls: usize,
    pub resize_target: Resolution,
    pub compress_target_bytes: u64,
    pub compress_audio_kbps: u32,
    /// Fraction a transform must shave off to count as a reduction
    pub min_reduction: f64,
}

impl PipelineConfig {
    pub fn with_staging_root(staging_root: impl Into<PathBuf>) -> Self {
        Self {
            staging_root: staging_root.into(),
            ..Default::default()
        }
    }

    /// Whether `new_size` is a meaningful reduction of `old_size`.
    pub fn is_reduction(&self, old_size: u64, new_size: u64) -> bool {
        (new_size as f64) < (old_size as f64) * (1.0 - self.min_reduction)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            staging_root: env::temp_dir().join("video-merge"),
            folder: String::from("merged-videos"),
            tiers: TierTable::default(),
            max_urls: MAX_VIDEO_URLS,
            resize_target: Resolution {
                width: 1280,
                height: 720,
            },
            compress_target_bytes: 90 * MB,
            compress_audio_kbps: 128,
            min_reduction: 0.05,
        }
    }
}

/// Retention policy for delivered artifacts. A fixed policy; not read from
/// the environment.
#[derive(Clone, Debug)]
pub struct RetentionConfig {
    pub folder: String,
    pub max_age: Duration,
    /// Daily run time, UTC
    pub run_at: NaiveTime,
}

impl RetentionConfig {
    /// Sweeps the folder the pipeline delivers into.
    pub fn for_pipeline(pipeline: &PipelineConfig) -> Self {
        Self {
            folder: pipeline.folder.clone(),
            max_age: Duration::from_secs(30 * 24 * 60 * 60),
            run_at: NaiveTime::from_hms_opt(2, 0, 0).unwrap_or(NaiveTime::MIN),
        }
    }
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self::for_pipeline(&PipelineConfig::default())
    }
}
