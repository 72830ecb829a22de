use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod aws;
pub mod fingerprint;
pub mod openai;
pub mod payload;
pub mod ratelimit;
pub mod status;
pub mod whisper;

use crate::config::Config;
use crate::{Result, ScribeError};

pub use payload::{AudioPayload, AudioSource};
pub use status::AsrStage;

/// Progress callback invoked with `(progress 0-100, message)`
pub type ProgressCallback = Box<dyn Fn(u8, &str) + Send + Sync>;

/// One timed transcript fragment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsrDataSeg {
    /// Fragment text
    pub text: String,

    /// Start offset in seconds
    pub start_time: f64,

    /// End offset in seconds
    pub end_time: f64,
}

/// Aggregated transcription result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsrData {
    /// Full text: the segments' text joined by newline, in segment order
    pub text: String,

    /// Ordered transcript segments
    pub segments: Vec<AsrDataSeg>,
}

impl AsrData {
    /// Assemble the result from ordered segments.
    ///
    /// This is the only constructor, so `text` always equals the
    /// newline-join of the segments' text.
    pub fn from_segments(segments: Vec<AsrDataSeg>) -> Self {
        let text = segments
            .iter()
            .map(|seg| seg.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        Self { text, segments }
    }
}

/// Uniform contract over heterogeneous transcription backends.
///
/// Concrete providers implement only the two primitive operations:
/// `execute` drives whatever protocol the backend needs (local inference, or
/// upload/submit/poll against a remote API) and `extract_segments` parses the
/// raw result into the uniform segment model. The shared `run` logic and
/// cache-key derivation are provided here.
///
/// Backend failures propagate unmodified out of `run`; this layer never
/// retries. Retry policy, if any, belongs to the concrete backend and is
/// documented per variant.
#[async_trait]
pub trait AsrProvider: std::fmt::Debug + Send + Sync {
    /// Backend discriminator used in the cache key
    fn name(&self) -> &'static str;

    /// The audio payload this instance was constructed with
    fn payload(&self) -> &AudioPayload;

    /// Drive the backend protocol, emitting status updates via `callback`
    /// and consulting the payload's rate limiter before each outbound
    /// network call. Returns the backend's raw response.
    async fn execute(&self, callback: Option<&ProgressCallback>) -> Result<Value>;

    /// Parse the raw backend response into chronologically ordered segments
    fn extract_segments(&self, response: &Value) -> Result<Vec<AsrDataSeg>>;

    /// Cache key for an external content-addressed cache store
    fn cache_key(&self) -> String {
        format!("{}-{}", self.name(), self.payload().fingerprint())
    }

    /// Run the transcription and assemble the aggregated result
    async fn run(&self, callback: Option<&ProgressCallback>) -> Result<AsrData> {
        let response = self.execute(callback).await?;
        let segments = self.extract_segments(&response)?;
        Ok(AsrData::from_segments(segments))
    }
}

/// Construct the provider selected by `name`.
///
/// An unrecognized name fails fast with `ScribeError::InvalidInput` and is
/// never retried.
pub async fn create_provider(
    name: &str,
    source: AudioSource,
    use_cache: bool,
    config: &Config,
) -> Result<Box<dyn AsrProvider>> {
    match name {
        "whisper" => Ok(Box::new(whisper::WhisperAsr::new(
            source,
            use_cache,
            &config.whisper,
            config.asr.need_word_time_stamp,
        )?)),
        "openai" => Ok(Box::new(openai::OpenAiAsr::new(
            source,
            use_cache,
            &config.openai,
        )?)),
        "aws" => Ok(Box::new(
            aws::AwsTranscribeAsr::new(source, use_cache, &config.aws).await?,
        )),
        other => {
            Err(ScribeError::InvalidInput(format!("unsupported ASR provider: {}", other)).into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct StubAsr {
        payload: AudioPayload,
    }

    impl StubAsr {
        fn new(bytes: &[u8]) -> Self {
            Self {
                payload: AudioPayload::load(AudioSource::Bytes(bytes.to_vec()), false).unwrap(),
            }
        }
    }

    #[async_trait]
    impl AsrProvider for StubAsr {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn payload(&self) -> &AudioPayload {
            &self.payload
        }

        async fn execute(&self, callback: Option<&ProgressCallback>) -> Result<Value> {
            AsrStage::Transcribing.emit(callback);
            AsrStage::Completed.emit(callback);
            Ok(serde_json::json!({
                "segments": [
                    {"text": "hello", "start": 0.0, "end": 1.5},
                    {"text": "world", "start": 1.5, "end": 2.0},
                ]
            }))
        }

        fn extract_segments(&self, response: &Value) -> Result<Vec<AsrDataSeg>> {
            let segments = response["segments"]
                .as_array()
                .expect("stub response always has segments")
                .iter()
                .map(|seg| AsrDataSeg {
                    text: seg["text"].as_str().unwrap_or_default().to_string(),
                    start_time: seg["start"].as_f64().unwrap_or_default(),
                    end_time: seg["end"].as_f64().unwrap_or_default(),
                })
                .collect();
            Ok(segments)
        }
    }

    fn seg(text: &str, start: f64, end: f64) -> AsrDataSeg {
        AsrDataSeg {
            text: text.to_string(),
            start_time: start,
            end_time: end,
        }
    }

    #[test]
    fn test_text_is_newline_join_of_segments() {
        let data = AsrData::from_segments(vec![
            seg("first", 0.0, 1.0),
            seg("second", 1.0, 2.0),
            seg("third", 2.0, 3.0),
        ]);
        assert_eq!(data.text, "first\nsecond\nthird");
    }

    #[test]
    fn test_single_segment_join() {
        let data = AsrData::from_segments(vec![seg("only", 0.0, 1.0)]);
        assert_eq!(data.text, "only");
        assert_eq!(data.segments.len(), 1);
    }

    #[test]
    fn test_empty_segment_list_yields_empty_text() {
        let data = AsrData::from_segments(Vec::new());
        assert_eq!(data.text, "");
        assert!(data.segments.is_empty());
    }

    #[tokio::test]
    async fn test_run_assembles_result_from_primitives() {
        let provider = StubAsr::new(b"payload");
        let data = provider.run(None).await.unwrap();
        assert_eq!(data.text, "hello\nworld");
        assert_eq!(data.segments[1], seg("world", 1.5, 2.0));
    }

    #[test]
    fn test_cache_key_combines_name_and_fingerprint() {
        let provider = StubAsr::new(b"123456789");
        assert_eq!(provider.cache_key(), "stub-cbf43926");
    }

    #[tokio::test]
    async fn test_unknown_provider_is_invalid_input() {
        let config = Config::default();
        let err = create_provider(
            "nope",
            AudioSource::Bytes(b"audio".to_vec()),
            false,
            &config,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScribeError>(),
            Some(ScribeError::InvalidInput(_))
        ));
    }
}
