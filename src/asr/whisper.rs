use async_trait::async_trait;
use serde_json::Value;
use std::io::Write;
use std::process::Stdio;
use tokio::process::Command;

use super::{AsrDataSeg, AsrProvider, AsrStage, AudioPayload, AudioSource, ProgressCallback};
use crate::config::WhisperConfig;
use crate::{Result, ScribeError};

/// Local-model backend driven by the `whisper` executable.
///
/// The payload is written to a scratch file and handed to whisper with JSON
/// output; the emitted JSON is the raw response. Runs entirely offline, so
/// the rate limiter is never consulted. Failed runs are not retried.
#[derive(Debug)]
pub struct WhisperAsr {
    payload: AudioPayload,
    model: String,
    language: String,
    word_timestamps: bool,
    binary: String,
}

impl WhisperAsr {
    pub fn new(
        source: AudioSource,
        use_cache: bool,
        config: &WhisperConfig,
        word_timestamps: bool,
    ) -> Result<Self> {
        Ok(Self {
            payload: AudioPayload::load(source, use_cache)?,
            model: config.model.clone(),
            language: config.language.clone(),
            word_timestamps,
            binary: "whisper".to_string(),
        })
    }
}

#[async_trait]
impl AsrProvider for WhisperAsr {
    fn name(&self) -> &'static str {
        "WhisperAsr"
    }

    fn payload(&self) -> &AudioPayload {
        &self.payload
    }

    async fn execute(&self, callback: Option<&ProgressCallback>) -> Result<Value> {
        let workdir = tempfile::tempdir()?;
        let audio_path = workdir.path().join("audio.media");
        {
            let mut file = fs_err::File::create(&audio_path)?;
            file.write_all(self.payload.bytes())?;
        }

        AsrStage::Transcribing.emit(callback);

        let mut cmd = Command::new(&self.binary);
        cmd.arg(&audio_path)
            .args(["--model", &self.model])
            .args(["--output_format", "json"])
            .args(["--output_dir", &workdir.path().to_string_lossy()])
            .args(["--verbose", "False"]);
        if self.language != "auto" {
            cmd.args(["--language", &self.language]);
        }
        if self.word_timestamps {
            cmd.args(["--word_timestamps", "True"]);
        }

        tracing::debug!(model = %self.model, "running whisper");
        let output = cmd
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            return Err(
                ScribeError::TranscriptionFailed(format!("whisper failed: {}", error.trim()))
                    .into(),
            );
        }

        // Whisper writes <input stem>.json next to the requested output dir
        let result_path = workdir.path().join("audio.json");
        let raw = fs_err::read_to_string(&result_path)?;
        let response: Value = serde_json::from_str(&raw)?;

        AsrStage::Completed.emit(callback);
        Ok(response)
    }

    fn extract_segments(&self, response: &Value) -> Result<Vec<AsrDataSeg>> {
        let segments = response["segments"].as_array().ok_or_else(|| {
            ScribeError::TranscriptionFailed("whisper output has no segments".to_string())
        })?;

        Ok(segments
            .iter()
            .map(|seg| AsrDataSeg {
                text: seg["text"].as_str().unwrap_or_default().trim().to_string(),
                start_time: seg["start"].as_f64().unwrap_or_default(),
                end_time: seg["end"].as_f64().unwrap_or_default(),
            })
            .collect())
    }
}
