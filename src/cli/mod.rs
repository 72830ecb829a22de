use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "clipscribe",
    about = "Download media from video platforms and turn it into text",
    version,
    long_about = "Downloads video or audio from platforms supported by yt-dlp and \
transcribes it through a pluggable ASR backend (local whisper, an OpenAI-compatible \
API, or AWS Transcribe)."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download full media from a platform URL
    DownloadVideo {
        /// Platform URL (YouTube, Bilibili, TikTok, Twitter/X, ...)
        url: String,
    },

    /// Download the audio track of a platform URL
    DownloadAudio {
        /// Platform URL
        url: String,
    },

    /// Transcribe a local audio or video file
    ExtractText {
        /// Path to the media file
        path: PathBuf,

        /// ASR backend to use (overrides the configured one)
        #[arg(short, long, value_name = "NAME")]
        provider: Option<String>,
    },

    /// Download the audio of a URL, transcribe it, and clean up
    Transcribe {
        /// Platform URL
        url: String,

        /// ASR backend to use (overrides the configured one)
        #[arg(short, long, value_name = "NAME")]
        provider: Option<String>,
    },

    /// Show the resolved configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}
