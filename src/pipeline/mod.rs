use std::path::{Path, PathBuf};

use crate::asr::{self, AudioSource, ProgressCallback};
use crate::config::Config;
use crate::download::{MediaDownloader, MediaTarget};
use crate::utils;
use crate::{Result, ScribeError};

/// Composes the download orchestrator and the ASR provider contract into
/// "download, transcribe, cleanup", with cleanup guaranteed on every exit
/// path.
pub struct TranscriptionPipeline {
    config: Config,
    downloader: MediaDownloader,
}

impl TranscriptionPipeline {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        fs_err::create_dir_all(&config.storage.temp_dir)?;
        let downloader = MediaDownloader::new(&config);
        Ok(Self { config, downloader })
    }

    /// Download full media from a platform URL.
    ///
    /// Returns the path of the uniquely-named local artifact; the caller
    /// owns the file from here on.
    pub async fn download_video(&self, url: &str) -> Result<PathBuf> {
        utils::validate_url(url)?;
        let result = self.downloader.fetch(url, MediaTarget::Video).await?;
        Ok(result.path)
    }

    /// Download the audio track of a platform URL, converted to the
    /// configured codec and quality.
    pub async fn download_audio(&self, url: &str) -> Result<PathBuf> {
        utils::validate_url(url)?;
        let target = MediaTarget::Audio {
            codec: self.config.youtube.download.audio_format.clone(),
            quality: self.config.youtube.download.audio_quality.clone(),
        };
        let result = self.downloader.fetch(url, target).await?;
        Ok(result.path)
    }

    /// Transcribe a local media file with the configured ASR provider.
    pub async fn extract_text(
        &self,
        path: &Path,
        callback: Option<&ProgressCallback>,
    ) -> Result<String> {
        if !path.exists() {
            return Err(ScribeError::NotFound(path.display().to_string()).into());
        }

        let provider = asr::create_provider(
            &self.config.asr.provider,
            AudioSource::Path(path.to_path_buf()),
            self.config.asr.use_cache,
            &self.config,
        )
        .await?;

        tracing::debug!(cache_key = %provider.cache_key(), "running transcription");
        let data = provider.run(callback).await?;
        Ok(data.text)
    }

    /// Download the audio of `url`, transcribe it, and delete the artifact.
    ///
    /// The downloaded file is removed regardless of the transcription
    /// outcome; a failed removal is logged and never replaces the
    /// transcription result or error the caller observes.
    pub async fn transcribe_from_url(
        &self,
        url: &str,
        callback: Option<&ProgressCallback>,
    ) -> Result<String> {
        let artifact = self.download_audio(url).await?;

        if fs_err::metadata(&artifact)?.len() == 0 {
            Self::cleanup(&artifact);
            return Err(
                ScribeError::DownloadFailed("downloaded artifact is empty".to_string()).into(),
            );
        }

        let outcome = self.extract_text(&artifact, callback).await;
        Self::cleanup(&artifact);
        outcome
    }

    fn cleanup(path: &Path) {
        if let Err(error) = fs_err::remove_file(path) {
            tracing::warn!(path = %path.display(), %error, "failed to clean up downloaded artifact");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::{MediaFetcher, MediaTarget};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::Duration;

    /// Fetcher that fabricates a downloaded file inside the storage dir
    struct FakeFetcher {
        dir: PathBuf,
        content: &'static [u8],
    }

    #[async_trait]
    impl MediaFetcher for FakeFetcher {
        async fn fetch(&self, _url: &str, _target: &MediaTarget) -> Result<PathBuf> {
            let path = self.dir.join("remote123.mp3");
            fs_err::write(&path, self.content)?;
            Ok(path)
        }
    }

    fn pipeline_with(dir: &Path, content: &'static [u8], provider: &str) -> TranscriptionPipeline {
        let mut config = Config::default();
        config.storage.temp_dir = dir.to_path_buf();
        config.asr.provider = provider.to_string();

        let downloader = MediaDownloader::with_fetcher(
            Arc::new(FakeFetcher {
                dir: dir.to_path_buf(),
                content,
            }),
            dir.to_path_buf(),
            Duration::from_secs(300),
        );
        TranscriptionPipeline { config, downloader }
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        fs_err::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_failed_transcription_still_cleans_up_artifact() {
        let dir = tempfile::tempdir().unwrap();
        // An unknown provider makes the transcription step fail
        // deterministically after the download has succeeded.
        let pipeline = pipeline_with(dir.path(), b"audio bytes", "bogus");

        let err = pipeline
            .transcribe_from_url("https://example.com/watch?v=1", None)
            .await
            .unwrap_err();

        // The caller sees the transcription-side error, not a cleanup error
        assert!(matches!(
            err.downcast_ref::<ScribeError>(),
            Some(ScribeError::InvalidInput(_))
        ));
        // And the storage directory holds no leftover artifact
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_empty_download_fails_without_transcribing() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(dir.path(), b"", "whisper");

        let err = pipeline
            .transcribe_from_url("https://example.com/watch?v=1", None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScribeError>(),
            Some(ScribeError::DownloadFailed(_))
        ));
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_extract_text_missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(dir.path(), b"audio bytes", "whisper");

        let err = pipeline
            .extract_text(Path::new("/nonexistent/audio.mp3"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScribeError>(),
            Some(ScribeError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_url_is_rejected_before_fetching() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(dir.path(), b"audio bytes", "whisper");

        assert!(pipeline.download_audio("not-a-url").await.is_err());
        assert!(pipeline.download_video("ftp://example.com/x").await.is_err());
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_download_audio_returns_existing_unique_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline_with(dir.path(), b"audio bytes", "whisper");

        let first = pipeline
            .download_audio("https://example.com/watch?v=1")
            .await
            .unwrap();
        let second = pipeline
            .download_audio("https://example.com/watch?v=1")
            .await
            .unwrap();

        assert!(first.is_file());
        assert!(second.is_file());
        assert_ne!(first, second);
    }
}
