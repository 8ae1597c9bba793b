use crate::ports::encoder::{EncoderExit, EncoderRunner};
use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;

/// Runs `ffmpeg`/`ffprobe` as child processes and waits for them to exit.
#[derive(Clone, Debug)]
pub struct FfmpegRunner {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl FfmpegRunner {
    pub fn new() -> Self {
        Self::with_binaries("ffmpeg", "ffprobe")
    }

    pub fn with_binaries(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn to_exit(output: Output) -> EncoderExit {
    EncoderExit {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

#[async_trait]
impl EncoderRunner for FfmpegRunner {
    async fn run_ffmpeg(&self, args: Vec<OsString>) -> io::Result<EncoderExit> {
        let output = Command::new(&self.ffmpeg)
            .arg("-hide_banner")
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await?;
        Ok(to_exit(output))
    }

    async fn run_ffprobe_for_duration(&self, media_path: &Path) -> io::Result<EncoderExit> {
        let output = Command::new(&self.ffprobe)
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(media_path)
            .kill_on_drop(true)
            .output()
            .await?;
        Ok(to_exit(output))
    }
}
