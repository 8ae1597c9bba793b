use crate::domain::av::transform::{
    compress_args, compress_bitrate_kbps, parse_duration, resize_args, Resolution,
};
use crate::error::TransformError;
use crate::ports::encoder::{EncoderExit, EncoderRunner};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Re-encodes an artifact toward a smaller resolution or bitrate.
pub struct Transformer<E> {
    encoder: Arc<E>,
}

impl<E: EncoderRunner> Transformer<E> {
    pub fn new(encoder: Arc<E>) -> Self {
        Self { encoder }
    }

    /// Returns the size of the resized output.
    pub async fn resize(
        &self,
        input: &Path,
        output: &Path,
        max: Resolution,
    ) -> Result<u64, TransformError> {
        info!(max_width = max.width, max_height = max.height, "Resizing");
        let exit = self
            .encoder
            .run_ffmpeg(resize_args(input, output, max))
            .await
            .map_err(TransformError::Spawn)?;
        Self::output_size(exit, output).await
    }

    /// Returns the size of the compressed output.
    pub async fn compress(
        &self,
        input: &Path,
        output: &Path,
        target_bytes: u64,
        audio_kbps: u32,
    ) -> Result<u64, TransformError> {
        let probe = self
            .encoder
            .run_ffprobe_for_duration(input)
            .await
            .map_err(TransformError::Spawn)?;
        let duration = probe
            .success()
            .then(|| parse_duration(&probe.stdout))
            .flatten()
            .ok_or_else(|| TransformError::UnknownDuration(input.display().to_string()))?;

        let video_kbps = compress_bitrate_kbps(target_bytes, duration, audio_kbps);
        info!(duration, video_kbps, "Compressing");

        let exit = self
            .encoder
            .run_ffmpeg(compress_args(input, output, video_kbps, audio_kbps))
            .await
            .map_err(TransformError::Spawn)?;
        Self::output_size(exit, output).await
    }

    async fn output_size(exit: EncoderExit, output: &Path) -> Result<u64, TransformError> {
        if !exit.success() {
            return Err(TransformError::Encoder {
                code: exit.code,
                stderr: exit.stderr_tail(),
            });
        }
        match tokio::fs::metadata(output).await {
            Ok(metadata) if metadata.len() > 0 => Ok(metadata.len()),
            _ => Err(TransformError::MissingOutput),
        }
    }
}
