use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

use super::{MediaFetcher, MediaTarget};
use crate::config::Config;
use crate::{Result, ScribeError};

/// Fetch collaborator backed by the yt-dlp executable.
///
/// yt-dlp is invoked with `--print filename` so it reports the
/// pre-post-processing output path; resolving the true artifact after
/// conversion is the orchestrator's job, not this one's. Retries happen
/// entirely inside yt-dlp according to the configured counts; once they are
/// exhausted the failure propagates as a download error.
pub struct YtDlpFetcher {
    binary: String,
    output_dir: PathBuf,
    retries: u32,
    fragment_retries: u32,
    socket_timeout: u32,
}

impl YtDlpFetcher {
    pub fn new(config: &Config) -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            output_dir: config.storage.temp_dir.clone(),
            retries: config.download.retries,
            fragment_retries: config.download.fragment_retries,
            socket_timeout: config.download.socket_timeout_seconds,
        }
    }

    fn build_command(&self, url: &str, target: &MediaTarget) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["--no-playlist", "--no-warnings", "--ignore-errors"])
            .arg("--no-check-certificates")
            .args(["--retries", &self.retries.to_string()])
            .args(["--fragment-retries", &self.fragment_retries.to_string()])
            .args(["--socket-timeout", &self.socket_timeout.to_string()])
            // Report the pre-conversion filename; the orchestrator resolves
            // the post-processed output itself.
            .args(["--no-simulate", "--print", "filename"])
            .args([
                "--output",
                &format!("{}/%(id)s.%(ext)s", self.output_dir.display()),
            ]);

        match target {
            MediaTarget::Video => {
                cmd.args(["--format", "bestvideo+bestaudio/best"]);
            }
            MediaTarget::Audio { codec, quality } => {
                cmd.args(["--format", "bestaudio"])
                    .arg("--extract-audio")
                    .args(["--audio-format", codec])
                    .args(["--audio-quality", quality]);
            }
        }

        cmd.arg(url);
        cmd
    }

    /// Forward only error-level downloader output to our own logs; debug,
    /// info and warning noise is dropped so it never reaches the operator's
    /// log stream.
    fn forward_errors(stderr: &str) -> Option<String> {
        let mut last_error = None;
        for line in stderr.lines() {
            if line.starts_with("ERROR") {
                tracing::error!(target: "clipscribe::ytdlp", "{}", line);
                last_error = Some(line.to_string());
            }
        }
        last_error
    }
}

#[async_trait]
impl MediaFetcher for YtDlpFetcher {
    async fn fetch(&self, url: &str, target: &MediaTarget) -> Result<PathBuf> {
        tracing::info!("starting download: {}", url);

        let output = self
            .build_command(url, target)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                ScribeError::DownloadFailed(format!("failed to run {}: {}", self.binary, e))
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        let last_error = Self::forward_errors(&stderr);

        if !output.status.success() {
            let detail =
                last_error.unwrap_or_else(|| format!("{} exited with {}", self.binary, output.status));
            return Err(ScribeError::DownloadFailed(detail).into());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reported = stdout
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .ok_or_else(|| {
                ScribeError::DownloadFailed("downloader reported no output path".to_string())
            })?;

        tracing::info!("download finished, post-processing starts");
        Ok(PathBuf::from(reported))
    }
}
