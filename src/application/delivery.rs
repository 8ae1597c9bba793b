use crate::domain::tiers::DeliveryStrategy;
use crate::error::{AttemptFailure, DeliveryError};
use crate::ports::storage::{RemoteStorage, UploadRequest, UploadedAsset};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Strategies tried after the tiered one, in order.
const FALLBACK_CHAIN: [DeliveryStrategy; 2] = [
    DeliveryStrategy::RawFallback,
    DeliveryStrategy::UnsignedFallback,
];

/// Uploads an artifact with its tiered strategy, falling back to a raw and
/// then an unsigned upload when the failure is size or sync related.
pub struct DeliveryClient<S> {
    storage: Arc<S>,
}

impl<S: RemoteStorage> DeliveryClient<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Returns the uploaded asset and the strategy that succeeded.
    pub async fn deliver(
        &self,
        artifact: &Path,
        request: UploadRequest,
    ) -> Result<(UploadedAsset, DeliveryStrategy), DeliveryError> {
        let chain = std::iter::once(request.strategy).chain(
            FALLBACK_CHAIN
                .iter()
                .copied()
                .filter(|s| *s != request.strategy),
        );

        let mut attempts = Vec::new();
        for strategy in chain {
            let attempt = UploadRequest {
                strategy,
                ..request.clone()
            };
            match self.storage.upload(artifact, &attempt).await {
                Ok(asset) => {
                    info!(
                        strategy = %strategy,
                        public_id = %asset.public_id,
                        attempts = attempts.len() + 1,
                        "Delivered"
                    );
                    return Ok((asset, strategy));
                }
                Err(failure) => {
                    warn!(strategy = %strategy, error = %failure, "Upload attempt failed");
                    let retryable = failure.kind.is_retryable();
                    attempts.push(AttemptFailure { strategy, failure });
                    if !retryable {
                        return Err(DeliveryError::Fatal { attempts });
                    }
                }
            }
        }

        Err(DeliveryError::Exhausted { attempts })
    }
}
