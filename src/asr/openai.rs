use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;

use super::{AsrDataSeg, AsrProvider, AsrStage, AudioPayload, AudioSource, ProgressCallback};
use crate::config::OpenAiConfig;
use crate::{Result, ScribeError};

/// Remote backend against an OpenAI-compatible transcription API.
///
/// A single multipart POST to `{base_url}/audio/transcriptions` with
/// `response_format=verbose_json`; the JSON body is the raw response.
/// HTTP and API errors propagate unmodified - this backend performs no
/// retries of its own.
#[derive(Debug)]
pub struct OpenAiAsr {
    payload: AudioPayload,
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
}

impl OpenAiAsr {
    pub fn new(source: AudioSource, use_cache: bool, config: &OpenAiConfig) -> Result<Self> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            ScribeError::InvalidInput("openai.api_key is not configured".to_string())
        })?;

        Ok(Self {
            payload: AudioPayload::load(source, use_cache)?,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client: reqwest::Client::new(),
        })
    }
}

#[async_trait]
impl AsrProvider for OpenAiAsr {
    fn name(&self) -> &'static str {
        "OpenAiAsr"
    }

    fn payload(&self) -> &AudioPayload {
        &self.payload
    }

    async fn execute(&self, callback: Option<&ProgressCallback>) -> Result<Value> {
        self.payload.limiter().acquire().await;

        AsrStage::Uploading.emit(callback);
        let file_name = self
            .payload
            .file_name()
            .unwrap_or("audio.mp3")
            .to_string();
        let part = reqwest::multipart::Part::bytes(self.payload.bytes().to_vec())
            .file_name(file_name);
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        AsrStage::Submitting.emit(callback);
        let url = format!("{}/audio/transcriptions", self.base_url);
        tracing::debug!(%url, bytes = self.payload.len(), "submitting audio for transcription");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .context("Failed to reach transcription API")?;

        AsrStage::QueryingResult.emit(callback);
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScribeError::TranscriptionFailed(format!(
                "API returned HTTP {}: {}",
                status,
                body.trim()
            ))
            .into());
        }

        let body: Value = response
            .json()
            .await
            .context("Failed to parse transcription response")?;

        AsrStage::Completed.emit(callback);
        Ok(body)
    }

    fn extract_segments(&self, response: &Value) -> Result<Vec<AsrDataSeg>> {
        if let Some(segments) = response["segments"].as_array() {
            return Ok(segments
                .iter()
                .map(|seg| AsrDataSeg {
                    text: seg["text"].as_str().unwrap_or_default().trim().to_string(),
                    start_time: seg["start"].as_f64().unwrap_or_default(),
                    end_time: seg["end"].as_f64().unwrap_or_default(),
                })
                .collect());
        }

        // Some compatible servers return plain text without segmentation
        let text = response["text"].as_str().ok_or_else(|| {
            ScribeError::TranscriptionFailed("response has neither segments nor text".to_string())
        })?;
        let duration = response["duration"].as_f64().unwrap_or_default();

        Ok(vec![AsrDataSeg {
            text: text.trim().to_string(),
            start_time: 0.0,
            end_time: duration,
        }])
    }
}
