use super::scope::discard;
use crate::domain::av::concat::{concat_args, concat_manifest};
use crate::error::PipelineError;
use crate::ports::encoder::EncoderRunner;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

/// Joins staged files back-to-back with a stream-copy encoder run.
pub struct Concatenator<E> {
    encoder: Arc<E>,
}

impl<E: EncoderRunner> Concatenator<E> {
    pub fn new(encoder: Arc<E>) -> Self {
        Self { encoder }
    }

    /// Writes `manifest`, runs the encoder, and always removes `manifest`
    /// afterwards. On failure `output` is discarded. Returns the size of
    /// `output` in bytes.
    pub async fn concatenate(
        &self,
        inputs: &[PathBuf],
        manifest: &Path,
        output: &Path,
    ) -> Result<u64, PipelineError> {
        if inputs.is_empty() {
            return Err(PipelineError::Concatenation {
                code: None,
                message: "no inputs to concatenate".to_string(),
            });
        }

        tokio::fs::write(manifest, concat_manifest(inputs)).await?;
        info!(inputs = inputs.len(), manifest = %manifest.display(), "Concatenating");

        let result = self
            .encoder
            .run_ffmpeg(concat_args(manifest, output))
            .await;

        discard(manifest).await;

        let exit = match result {
            Ok(exit) => exit,
            Err(e) => {
                discard(output).await;
                return Err(PipelineError::Concatenation {
                    code: None,
                    message: format!("encoder could not be started: {}", e),
                });
            }
        };

        if !exit.success() {
            error!(code = ?exit.code, "Encoder concat failed");
            discard(output).await;
            return Err(PipelineError::Concatenation {
                code: exit.code,
                message: exit.stderr_tail(),
            });
        }

        match tokio::fs::metadata(output).await {
            Ok(metadata) => Ok(metadata.len()),
            Err(_) => Err(PipelineError::Concatenation {
                code: exit.code,
                message: "encoder exited cleanly but wrote no output".to_string(),
            }),
        }
    }
}
