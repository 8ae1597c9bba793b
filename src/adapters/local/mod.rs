//! Local adapters: encoder subprocesses and filesystem delivery.

pub mod ffmpeg;
pub mod fs;

pub use ffmpeg::FfmpegRunner;
pub use fs::FsStorage;
