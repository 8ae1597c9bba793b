use async_trait::async_trait;
use std::ffi::OsString;
use std::io;
use std::path::Path;

/// Exit status and captured output of an encoder or prober run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncoderExit {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl EncoderExit {
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            ..Default::default()
        }
    }

    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Last few lines of stderr, which is where ffmpeg puts the actual error.
    pub fn stderr_tail(&self) -> String {
        let lines: Vec<&str> = self.stderr.lines().collect();
        let start = lines.len().saturating_sub(5);
        lines[start..].join("\n")
    }
}

/// Runs the external encoder. `Err` means the process could not be started.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EncoderRunner: Send + Sync {
    async fn run_ffmpeg(&self, args: Vec<OsString>) -> io::Result<EncoderExit>;

    async fn run_ffprobe_for_duration(&self, media_path: &Path) -> io::Result<EncoderExit>;
}
