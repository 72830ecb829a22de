//! Clipscribe - download media from video platforms and turn it into text
//!
//! This library provides a download orchestrator built on yt-dlp, a pluggable
//! ASR provider contract with content-addressed cache keys and per-instance
//! rate limiting, and a pipeline that ties the two together with guaranteed
//! cleanup of downloaded artifacts.

pub mod asr;
pub mod cli;
pub mod config;
pub mod download;
pub mod pipeline;
pub mod utils;

pub use asr::{AsrData, AsrDataSeg, AsrProvider, AudioSource, ProgressCallback};
pub use cli::{Cli, Commands};
pub use config::Config;
pub use download::{DownloadResult, MediaDownloader, MediaTarget};
pub use pipeline::TranscriptionPipeline;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to clipscribe
#[derive(thiserror::Error, Debug)]
pub enum ScribeError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Download timed out after {0} seconds")]
    Timeout(u64),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),
}
