use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::Config;
use crate::{Result, ScribeError};

pub mod ytdlp;

/// What to fetch from the remote platform
#[derive(Debug, Clone)]
pub enum MediaTarget {
    /// Full media download, no post-processing
    Video,
    /// Audio-only download with conversion to the given codec/quality
    Audio { codec: String, quality: String },
}

impl MediaTarget {
    /// Target codec extension, when audio conversion was requested
    pub fn audio_codec(&self) -> Option<&str> {
        match self {
            MediaTarget::Video => None,
            MediaTarget::Audio { codec, .. } => Some(codec),
        }
    }
}

/// Resolved local artifact of a successful fetch.
///
/// The path exists on disk at the moment this is returned; ownership (and
/// the duty of eventual deletion) passes to the caller.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    /// Final absolute path inside the storage directory
    pub path: PathBuf,

    /// Synthetic unique identifier the artifact was renamed to
    pub id: Uuid,

    /// Extension of the resolved artifact
    pub extension: String,
}

/// External collaborator that performs the actual network fetch and optional
/// format conversion, reporting the pre-post-processing output path.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaFetcher: Send + Sync {
    async fn fetch(&self, url: &str, target: &MediaTarget) -> Result<PathBuf>;
}

/// Download orchestrator: delegates the fetch, resolves the true output
/// file after post-processing, and claims it under a collision-free name.
pub struct MediaDownloader {
    fetcher: Arc<dyn MediaFetcher>,
    storage_dir: PathBuf,
    timeout: Duration,
}

impl MediaDownloader {
    pub fn new(config: &Config) -> Self {
        Self {
            fetcher: Arc::new(ytdlp::YtDlpFetcher::new(config)),
            storage_dir: config.storage.temp_dir.clone(),
            timeout: Duration::from_secs(config.download.timeout_seconds),
        }
    }

    /// Build a downloader over a custom fetch collaborator
    pub fn with_fetcher(
        fetcher: Arc<dyn MediaFetcher>,
        storage_dir: PathBuf,
        timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            storage_dir,
            timeout,
        }
    }

    /// Fetch `url` and return the resolved, uniquely-named local artifact.
    ///
    /// The whole fetch-and-resolve sequence runs under one deadline; the
    /// fetch itself executes on a spawned task so concurrent callers stay
    /// responsive. Exceeding the deadline stops the wait (the in-flight
    /// fetch is not halted) and surfaces `ScribeError::Timeout`, distinct
    /// from other fetch failures.
    pub async fn fetch(&self, url: &str, target: MediaTarget) -> Result<DownloadResult> {
        fs_err::create_dir_all(&self.storage_dir)?;

        let fetcher = Arc::clone(&self.fetcher);
        let fetch_url = url.to_string();
        let fetch_target = target.clone();
        let job =
            tokio::spawn(async move { fetcher.fetch(&fetch_url, &fetch_target).await });

        let reported = match tokio::time::timeout(self.timeout, job).await {
            Err(_) => return Err(ScribeError::Timeout(self.timeout.as_secs()).into()),
            Ok(Err(join_error)) => {
                return Err(
                    ScribeError::DownloadFailed(format!("fetch task failed: {}", join_error))
                        .into(),
                )
            }
            Ok(Ok(result)) => result?,
        };

        let resolved = self.resolve_output(&reported, target.audio_codec())?;
        self.claim(&resolved)
    }

    /// Determine which on-disk file is the true output of the fetch.
    ///
    /// When audio conversion was requested the converted path (reported path
    /// with the codec extension swapped in) is probed first, then the
    /// reported path itself - the conversion step may have failed and left
    /// the original behind. Only these two candidates are probed; a
    /// conversion naming scheme that does anything else fails resolution.
    fn resolve_output(&self, reported: &Path, conversion: Option<&str>) -> Result<PathBuf> {
        let mut candidates = Vec::new();
        if let Some(codec) = conversion {
            candidates.push(reported.with_extension(codec));
        }
        candidates.push(reported.to_path_buf());

        for candidate in &candidates {
            tracing::debug!("probing {}", candidate.display());
            if candidate.is_file() {
                return Ok(candidate.clone());
            }
        }

        // Capture the directory listing for diagnostics; callers only see
        // the summary message.
        let dir = reported.parent().unwrap_or_else(|| Path::new("."));
        let listing: Vec<String> = fs_err::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|entry| entry.ok())
                    .map(|entry| entry.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default();
        tracing::error!(
            dir = %dir.display(),
            ?listing,
            ?candidates,
            "expected download output missing"
        );

        Err(ScribeError::DownloadFailed("expected output missing".to_string()).into())
    }

    /// Rename the resolved artifact to a fresh synthetic identifier inside
    /// the storage directory. Random names keep concurrent requests from
    /// colliding and keep upstream naming schemes off the filesystem.
    fn claim(&self, resolved: &Path) -> Result<DownloadResult> {
        let extension = resolved
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default();
        let id = Uuid::new_v4();
        let file_name = if extension.is_empty() {
            id.to_string()
        } else {
            format!("{}.{}", id, extension)
        };
        let final_path = self.storage_dir.join(file_name);

        fs_err::rename(resolved, &final_path)?;
        tracing::info!("download complete: {}", final_path.display());

        Ok(DownloadResult {
            path: final_path,
            id,
            extension,
        })
    }
}
