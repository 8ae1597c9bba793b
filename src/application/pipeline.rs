use super::concat::Concatenator;
use super::delivery::DeliveryClient;
use super::planner::DeliveryPlanner;
use super::scope::SessionScope;
use crate::config::PipelineConfig;
use crate::domain::request::ValidationError;
use crate::domain::session::{Outcome, Session};
use crate::error::PipelineError;
use crate::ports::encoder::EncoderRunner;
use crate::ports::fetch::SourceFetcher;
use crate::ports::merge::{MergePort, MergeResult};
use crate::ports::storage::{RemoteStorage, UploadRequest};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

/// Runs one merge request end to end: fetch, concatenate, plan, deliver,
/// then remove every local file the session created.
pub struct MergeService<F, E, S> {
    fetcher: Arc<F>,
    concatenator: Concatenator<E>,
    planner: DeliveryPlanner<E>,
    delivery: DeliveryClient<S>,
    config: Arc<PipelineConfig>,
}

impl<F, E, S> MergeService<F, E, S>
where
    F: SourceFetcher,
    E: EncoderRunner,
    S: RemoteStorage,
{
    pub fn new(fetcher: Arc<F>, encoder: Arc<E>, storage: Arc<S>, config: PipelineConfig) -> Self {
        let config = Arc::new(config);
        Self {
            fetcher,
            concatenator: Concatenator::new(encoder.clone()),
            planner: DeliveryPlanner::new(encoder, config.clone()),
            delivery: DeliveryClient::new(storage),
            config,
        }
    }

    pub async fn merge(&self, urls: Vec<String>) -> Result<MergeResult, PipelineError> {
        if urls.is_empty() {
            return Err(ValidationError::Empty.into());
        }
        if urls.len() > self.config.max_urls {
            return Err(ValidationError::TooMany {
                max: self.config.max_urls,
                got: urls.len(),
            }
            .into());
        }

        tokio::fs::create_dir_all(&self.config.staging_root).await?;
        let mut session = Session::new(&self.config.staging_root, urls);
        let mut scope = SessionScope::new(session.id.clone());
        info!(session_id = %session.id, videos = session.source_urls.len(), "Merge started");

        let result = self.run(&mut session, &mut scope).await;

        session.outcome = Some(match result {
            Ok(_) => Outcome::Success,
            Err(_) => Outcome::Failure,
        });
        let removed = scope.release().await;

        match &result {
            Ok(merged) => info!(
                session_id = %session.id,
                public_id = %merged.public_id,
                fetched = session.sizes.fetched,
                concatenated = session.sizes.concatenated,
                delivered = session.sizes.delivered,
                removed,
                "Merge completed"
            ),
            Err(e) => error!(session_id = %session.id, error = %e, removed, "Merge failed"),
        }
        result
    }

    async fn run(
        &self,
        session: &mut Session,
        scope: &mut SessionScope,
    ) -> Result<MergeResult, PipelineError> {
        // Strictly one at a time; concat order depends on it.
        for index in 0..session.source_urls.len() {
            let path = scope.track(session.staged_path(index));
            let url = &session.source_urls[index];
            let bytes = self.fetcher.fetch(url, &path).await?;
            info!(session_id = %session.id, index, bytes, "Fetched source");
            session.staged_files.push(path);
            session.sizes.fetched += bytes;
        }

        let manifest = scope.track(session.manifest_path());
        let concatenated = scope.track(session.concatenated_path());
        let size = self
            .concatenator
            .concatenate(&session.staged_files, &manifest, &concatenated)
            .await?;
        session.concatenated = Some(concatenated.clone());
        session.sizes.concatenated = size;

        let plan = self.planner.plan(session, scope, &concatenated, size).await;
        session.strategy = Some(plan.strategy);
        session.final_output = Some(plan.artifact.clone());

        let request = UploadRequest {
            public_id: session.public_name(),
            folder: self.config.folder.clone(),
            strategy: plan.strategy,
            size: plan.size,
        };
        let (asset, strategy) = self.delivery.deliver(&plan.artifact, request).await?;
        session.strategy = Some(strategy);
        session.sizes.delivered = asset.bytes;

        Ok(MergeResult {
            video_url: asset.url,
            public_id: asset.public_id,
            videos_processed: session.staged_files.len(),
            file_size: asset.bytes,
            processing: plan.processing,
            upload_type: strategy,
            timestamp: Utc::now(),
        })
    }
}

#[async_trait]
impl<F, E, S> MergePort for MergeService<F, E, S>
where
    F: SourceFetcher,
    E: EncoderRunner,
    S: RemoteStorage,
{
    async fn merge(&self, urls: Vec<String>) -> Result<MergeResult, PipelineError> {
        MergeService::merge(self, urls).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::test_support::{fake_concat, fake_transcode, is_concat};
    use crate::domain::tiers::{DeliveryStrategy, MB};
    use crate::error::{DeliveryErrorKind, DeliveryFailure, FetchError};
    use crate::ports::encoder::{EncoderExit, MockEncoderRunner};
    use crate::ports::fetch::MockSourceFetcher;
    use crate::ports::storage::{MockRemoteStorage, UploadedAsset};
    use mockall::Sequence;
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://src.test/{}.mp4", i)).collect()
    }

    fn uploaded(path: &Path, req: &UploadRequest) -> UploadedAsset {
        UploadedAsset {
            public_id: format!("{}/{}", req.folder, req.public_id),
            url: format!("https://cdn.test/{}.mp4", req.public_id),
            bytes: std::fs::metadata(path).map(|m| m.len()).unwrap_or(0),
        }
    }

    /// Writes `[<last path segment>]` for every URL, so the merged output
    /// shows the order sources were joined in.
    fn marker_fetcher(expected: usize) -> MockSourceFetcher {
        let mut fetcher = MockSourceFetcher::new();
        fetcher
            .expect_fetch()
            .times(expected)
            .returning(|url, path| {
                let marker = format!("[{}]", url.rsplit('/').next().unwrap_or(url));
                std::fs::write(path, &marker).unwrap();
                Ok(marker.len() as u64)
            });
        fetcher
    }

    fn concat_encoder() -> MockEncoderRunner {
        let mut encoder = MockEncoderRunner::new();
        encoder
            .expect_run_ffmpeg()
            .withf(|args| is_concat(args))
            .returning(|args| fake_concat(&args));
        encoder
    }

    fn service(
        dir: &TempDir,
        fetcher: MockSourceFetcher,
        encoder: MockEncoderRunner,
        storage: MockRemoteStorage,
    ) -> MergeService<MockSourceFetcher, MockEncoderRunner, MockRemoteStorage> {
        MergeService::new(
            Arc::new(fetcher),
            Arc::new(encoder),
            Arc::new(storage),
            PipelineConfig::with_staging_root(dir.path()),
        )
    }

    fn staging_is_empty(dir: &TempDir) -> bool {
        std::fs::read_dir(dir.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_merge_joins_in_input_order_and_cleans_up() {
        let dir = tempdir().unwrap();
        let seen = Arc::new(Mutex::new(String::new()));
        let captured = seen.clone();

        let mut storage = MockRemoteStorage::new();
        storage
            .expect_upload()
            .withf(|_, req| req.strategy == DeliveryStrategy::Direct)
            .times(1)
            .returning(move |path, req| {
                *captured.lock().unwrap() = std::fs::read_to_string(path).unwrap();
                Ok(uploaded(path, req))
            });

        let result = service(&dir, marker_fetcher(3), concat_encoder(), storage)
            .merge(urls(3))
            .await
            .unwrap();

        assert_eq!(seen.lock().unwrap().as_str(), "[0.mp4][1.mp4][2.mp4]");
        assert_eq!(result.videos_processed, 3);
        assert_eq!(result.upload_type, DeliveryStrategy::Direct);
        assert_eq!(result.file_size, 21);
        assert!(result.public_id.starts_with("merged-videos/merged_"));
        assert!(!result.processing.applied);
        assert!(staging_is_empty(&dir), "no session file may outlive the merge");
    }

    #[tokio::test]
    async fn test_fetches_run_sequentially_in_order() {
        let dir = tempdir().unwrap();
        let mut fetcher = MockSourceFetcher::new();
        let mut seq = Sequence::new();
        for (i, url) in urls(4).into_iter().enumerate() {
            fetcher
                .expect_fetch()
                .withf(move |u, path| {
                    u == url
                        && path
                            .to_string_lossy()
                            .ends_with(&format!("_input_{:02}.mp4", i))
                })
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, path| {
                    std::fs::write(path, b"x").unwrap();
                    Ok(1)
                });
        }
        let mut storage = MockRemoteStorage::new();
        storage
            .expect_upload()
            .returning(|path, req| Ok(uploaded(path, req)));

        let result = service(&dir, fetcher, concat_encoder(), storage)
            .merge(urls(4))
            .await
            .unwrap();

        assert_eq!(result.videos_processed, 4);
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_and_removes_partial_files() {
        let dir = tempdir().unwrap();
        let mut fetcher = MockSourceFetcher::new();
        let mut seq = Sequence::new();
        fetcher
            .expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, path| {
                std::fs::write(path, b"first").unwrap();
                Ok(5)
            });
        fetcher
            .expect_fetch()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|url, path| {
                std::fs::write(path, b"trunc").unwrap();
                Err(FetchError::Status {
                    url: url.to_string(),
                    status: 404,
                })
            });
        let mut encoder = MockEncoderRunner::new();
        encoder.expect_run_ffmpeg().never();
        let mut storage = MockRemoteStorage::new();
        storage.expect_upload().never();

        let err = service(&dir, fetcher, encoder, storage)
            .merge(urls(3))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Fetch(_)));
        assert_eq!(err.category(), "Download failed");
        assert!(staging_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_concat_failure_cleans_every_staged_file() {
        let dir = tempdir().unwrap();
        let mut encoder = MockEncoderRunner::new();
        encoder
            .expect_run_ffmpeg()
            .returning(|_| Ok(EncoderExit::failed(1, "Invalid data found")));
        let mut storage = MockRemoteStorage::new();
        storage.expect_upload().never();

        let err = service(&dir, marker_fetcher(5), encoder, storage)
            .merge(urls(5))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Concatenation { code: Some(1), .. }
        ));
        assert!(staging_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_transform_error_still_delivers_original() {
        let dir = tempdir().unwrap();
        let mut encoder = MockEncoderRunner::new();
        encoder.expect_run_ffmpeg().returning(|args| {
            if is_concat(&args) {
                fake_transcode(&args, 120 * MB)
            } else {
                Ok(EncoderExit::failed(1, "Error reinitializing filters"))
            }
        });
        let mut storage = MockRemoteStorage::new();
        storage
            .expect_upload()
            .withf(|path, req| {
                req.strategy == DeliveryStrategy::Chunked
                    && path.to_string_lossy().ends_with("_merged.mp4")
            })
            .times(1)
            .returning(|path, req| Ok(uploaded(path, req)));

        let result = service(&dir, marker_fetcher(2), encoder, storage)
            .merge(urls(2))
            .await
            .unwrap();

        assert!(!result.processing.applied);
        assert_eq!(result.processing.original_size, 120 * MB);
        assert!(result.processing.error.is_some());
        assert_eq!(result.upload_type, DeliveryStrategy::Chunked);
        assert!(staging_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_size_failures_fall_back_to_unsigned_upload() {
        let dir = tempdir().unwrap();
        let mut storage = MockRemoteStorage::new();
        let mut seq = Sequence::new();
        for strategy in [DeliveryStrategy::Direct, DeliveryStrategy::RawFallback] {
            storage
                .expect_upload()
                .withf(move |_, req| req.strategy == strategy)
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| {
                    Err(DeliveryFailure::new(
                        DeliveryErrorKind::SizeExceeded,
                        "File size too large",
                    ))
                });
        }
        storage
            .expect_upload()
            .withf(|_, req| req.strategy == DeliveryStrategy::UnsignedFallback)
            .times(1)
            .in_sequence(&mut seq)
            .returning(|path, req| Ok(uploaded(path, req)));

        let result = service(&dir, marker_fetcher(1), concat_encoder(), storage)
            .merge(urls(1))
            .await
            .unwrap();

        assert_eq!(result.upload_type, DeliveryStrategy::UnsignedFallback);
        assert!(staging_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_exhausted_delivery_fails_request_and_cleans_up() {
        let dir = tempdir().unwrap();
        let mut storage = MockRemoteStorage::new();
        storage.expect_upload().times(3).returning(|_, _| {
            Err(DeliveryFailure::new(
                DeliveryErrorKind::SyncNotSupported,
                "Video is too large to process synchronously",
            ))
        });

        let err = service(&dir, marker_fetcher(2), concat_encoder(), storage)
            .merge(urls(2))
            .await
            .unwrap_err();

        match err {
            PipelineError::Delivery(e) => assert_eq!(e.attempts().len(), 3),
            other => panic!("unexpected error {:?}", other),
        }
        assert!(staging_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_rejects_bad_counts_before_creating_anything() {
        let dir = tempdir().unwrap();
        let staging = dir.path().join("stage");
        let mut fetcher = MockSourceFetcher::new();
        fetcher.expect_fetch().never();
        let service = MergeService::new(
            Arc::new(fetcher),
            Arc::new(MockEncoderRunner::new()),
            Arc::new(MockRemoteStorage::new()),
            PipelineConfig::with_staging_root(&staging),
        );

        let err = service.merge(vec![]).await.unwrap_err();
        assert!(err.is_client_error());
        let err = service.merge(urls(11)).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Validation(ValidationError::TooMany { max: 10, got: 11 })
        ));
        assert!(!staging.exists());
    }
}
