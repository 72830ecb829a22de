use std::path::PathBuf;

use crate::asr::fingerprint::fingerprint;
use crate::asr::ratelimit::RateLimiter;
use crate::{Result, ScribeError};

/// Where an audio payload comes from
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Path to an existing audio file on disk
    Path(PathBuf),
    /// Raw audio bytes already in memory
    Bytes(Vec<u8>),
}

impl From<PathBuf> for AudioSource {
    fn from(path: PathBuf) -> Self {
        AudioSource::Path(path)
    }
}

impl From<Vec<u8>> for AudioSource {
    fn from(bytes: Vec<u8>) -> Self {
        AudioSource::Bytes(bytes)
    }
}

/// Audio payload shared by every ASR provider instance.
///
/// The payload is loaded eagerly at construction and is immutable for the
/// instance's lifetime; its fingerprint combined with the provider name
/// forms the content-addressed cache key. The embedded rate limiter is
/// scoped to this instance - concurrent provider instances do not share a
/// call budget.
#[derive(Debug)]
pub struct AudioPayload {
    data: Vec<u8>,
    fingerprint: String,
    file_name: Option<String>,
    use_cache: bool,
    limiter: RateLimiter,
}

impl AudioPayload {
    /// Load a payload from a file path or raw bytes.
    ///
    /// Fails with `ScribeError::NotFound` if the path does not resolve to an
    /// existing file, and with `ScribeError::InvalidInput` for an empty byte
    /// payload.
    pub fn load(source: AudioSource, use_cache: bool) -> Result<Self> {
        let (data, file_name) = match source {
            AudioSource::Path(path) => {
                if !path.is_file() {
                    return Err(ScribeError::NotFound(path.display().to_string()).into());
                }
                let name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned());
                (fs_err::read(&path)?, name)
            }
            AudioSource::Bytes(bytes) => {
                if bytes.is_empty() {
                    return Err(
                        ScribeError::InvalidInput("empty audio payload".to_string()).into()
                    );
                }
                (bytes, None)
            }
        };

        let fingerprint = fingerprint(&data);

        Ok(Self {
            data,
            fingerprint,
            file_name,
            use_cache,
            limiter: RateLimiter::default(),
        })
    }

    /// Raw audio bytes
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Content fingerprint (8 lowercase hex digits)
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Original file name, when the payload was loaded from a path
    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Whether the caller asked for cached results to be used
    pub fn use_cache(&self) -> bool {
        self.use_cache
    }

    /// The per-instance call limiter
    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_bytes() {
        let payload = AudioPayload::load(AudioSource::Bytes(b"123456789".to_vec()), false)
            .expect("load from bytes");
        assert_eq!(payload.len(), 9);
        assert_eq!(payload.fingerprint(), "cbf43926");
        assert!(!payload.use_cache());
    }

    #[test]
    fn test_load_from_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"123456789").unwrap();

        let payload =
            AudioPayload::load(AudioSource::Path(file.path().to_path_buf()), true).unwrap();
        assert_eq!(payload.bytes(), b"123456789");
        assert_eq!(payload.fingerprint(), "cbf43926");
        assert!(payload.use_cache());
    }

    #[test]
    fn test_missing_path_is_not_found() {
        let err = AudioPayload::load(
            AudioSource::Path(PathBuf::from("/nonexistent/audio.mp3")),
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScribeError>(),
            Some(ScribeError::NotFound(_))
        ));
    }

    #[test]
    fn test_empty_bytes_are_invalid_input() {
        let err = AudioPayload::load(AudioSource::Bytes(Vec::new()), false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScribeError>(),
            Some(ScribeError::InvalidInput(_))
        ));
    }
}
