use super::scope::SessionScope;
use super::transform::Transformer;
use crate::config::PipelineConfig;
use crate::domain::session::{ProcessingReport, Session};
use crate::domain::tiers::DeliveryStrategy;
use crate::ports::encoder::EncoderRunner;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// The artifact to deliver and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryPlan {
    pub artifact: PathBuf,
    pub size: u64,
    pub strategy: DeliveryStrategy,
    pub processing: ProcessingReport,
}

/// Decides whether to transform the concatenated artifact before upload and
/// which strategy delivers the result. Transform failures never fail the
/// plan; they fall back to the best artifact produced so far.
pub struct DeliveryPlanner<E> {
    transformer: Transformer<E>,
    config: Arc<PipelineConfig>,
}

impl<E: EncoderRunner> DeliveryPlanner<E> {
    pub fn new(encoder: Arc<E>, config: Arc<PipelineConfig>) -> Self {
        Self {
            transformer: Transformer::new(encoder),
            config,
        }
    }

    pub async fn plan(
        &self,
        session: &Session,
        scope: &mut SessionScope,
        concatenated: &Path,
        size: u64,
    ) -> DeliveryPlan {
        let hint = self.config.tiers.transform_for(size);
        let mut artifact = concatenated.to_path_buf();
        let mut current = size;
        let mut methods: Vec<&str> = Vec::new();
        let mut errors: Vec<String> = Vec::new();

        if hint.allows_resize() {
            let output = scope.track(session.resized_path());
            match self
                .transformer
                .resize(&artifact, &output, self.config.resize_target)
                .await
            {
                Ok(new_size) if self.config.is_reduction(current, new_size) => {
                    info!(session_id = %session.id, from = current, to = new_size, "Resize reduced artifact");
                    artifact = output;
                    current = new_size;
                    methods.push("resize");
                }
                Ok(new_size) => {
                    info!(session_id = %session.id, from = current, to = new_size, "Resize did not reduce artifact, keeping original");
                }
                Err(e) => {
                    warn!(session_id = %session.id, error = %e, "Resize failed, keeping original");
                    errors.push(format!("resize: {}", e));
                }
            }
        }

        let still_large = self
            .config
            .tiers
            .compress_mark()
            .is_some_and(|mark| current > mark);
        if hint.allows_compress() && still_large {
            let output = scope.track(session.compressed_path());
            match self
                .transformer
                .compress(
                    &artifact,
                    &output,
                    self.config.compress_target_bytes,
                    self.config.compress_audio_kbps,
                )
                .await
            {
                Ok(new_size) if self.config.is_reduction(current, new_size) => {
                    info!(session_id = %session.id, from = current, to = new_size, "Compress reduced artifact");
                    artifact = output;
                    current = new_size;
                    methods.push("compress");
                }
                Ok(new_size) => {
                    info!(session_id = %session.id, from = current, to = new_size, "Compress did not reduce artifact");
                }
                Err(e) => {
                    warn!(session_id = %session.id, error = %e, "Compress failed");
                    errors.push(format!("compress: {}", e));
                }
            }
        }

        let processing = ProcessingReport {
            applied: !methods.is_empty(),
            method: (!methods.is_empty()).then(|| methods.join("+")),
            original_size: size,
            final_size: current,
            error: (!errors.is_empty()).then(|| errors.join("; ")),
        };

        DeliveryPlan {
            strategy: self.config.tiers.strategy_for(current),
            artifact,
            size: current,
            processing,
        }
    }
}
