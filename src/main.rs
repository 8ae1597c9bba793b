//! Merge server binary
//!
//! Wires up:
//! - Encoder and HTTP fetch adapters
//! - Remote storage (cloud service, or local directory for development)
//! - Merge pipeline behind the HTTP API
//! - Daily retention sweep

use reelmerge::adapters::cloud::CloudStorage;
use reelmerge::adapters::http::{router, AppState, HttpFetcher};
use reelmerge::adapters::local::{FfmpegRunner, FsStorage};
use reelmerge::config::{
    CloudConfig, PipelineConfig, RetentionConfig, ServerConfig, StorageBackend,
};
use reelmerge::ports::storage::RemoteStorage;
use reelmerge::{MergeService, RetentionSweeper};
use std::error::Error;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = ServerConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 1. Adapters
    let client = reqwest::Client::builder().build()?;
    let fetcher = Arc::new(HttpFetcher::new(client.clone()));
    let encoder = Arc::new(FfmpegRunner::new());
    let pipeline = PipelineConfig::with_staging_root(&config.staging_dir);

    // 2. Storage backend, pipeline and sweeper
    let state = match config.backend {
        StorageBackend::Local => {
            let storage = Arc::new(FsStorage::new(
                &config.local_storage_dir,
                &config.local_public_base_url,
            ));
            start(fetcher, encoder, storage, pipeline)
        }
        StorageBackend::Cloud => match CloudConfig::from_env() {
            Ok(cloud) => {
                let storage = Arc::new(CloudStorage::new(client, cloud));
                start(fetcher, encoder, storage, pipeline)
            }
            Err(reason) => {
                warn!(%reason, "Storage is not configured, merge requests will fail");
                AppState::misconfigured(reason, pipeline.max_urls)
            }
        },
    };

    // 3. HTTP layer
    let mut app = router(state);
    if config.backend == StorageBackend::Local {
        app = app.nest_service("/media", ServeDir::new(&config.local_storage_dir));
    }

    // 4. Start server
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.addr, config.port)).await?;
    info!(addr = %config.addr, port = %config.port, "Listening");
    axum::serve(listener, app).await?;
    Ok(())
}

fn start<S: RemoteStorage + 'static>(
    fetcher: Arc<HttpFetcher>,
    encoder: Arc<FfmpegRunner>,
    storage: Arc<S>,
    pipeline: PipelineConfig,
) -> AppState {
    let max_urls = pipeline.max_urls;
    RetentionSweeper::new(storage.clone(), RetentionConfig::for_pipeline(&pipeline)).spawn();
    let merger = MergeService::new(fetcher, encoder, storage, pipeline);
    AppState::ready(Arc::new(merger), max_urls)
}
