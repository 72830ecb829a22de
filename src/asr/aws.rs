use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_transcribe::types::{Media, MediaFormat, TranscriptionJobStatus};
use aws_sdk_transcribe::Client as TranscribeClient;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

use super::{AsrDataSeg, AsrProvider, AsrStage, AudioPayload, AudioSource, ProgressCallback};
use crate::config::AwsConfig;
use crate::{Result, ScribeError};

/// Remote job-based backend against AWS Transcribe.
///
/// The payload is staged in S3, a transcription job is created and polled to
/// completion, and the transcript JSON is fetched over HTTP; that JSON is
/// the raw response. The staged S3 object is removed best-effort once the
/// job finishes. Only the AWS SDK's built-in transport retries apply - this
/// layer performs no retries of its own.
#[derive(Debug)]
pub struct AwsTranscribeAsr {
    payload: AudioPayload,
    s3_client: S3Client,
    transcribe_client: TranscribeClient,
    bucket: String,
    key_prefix: String,
    language: Option<String>,
}

/// AWS Transcribe transcript format (the fields this backend consumes)
#[derive(Debug, Deserialize)]
struct AwsTranscript {
    results: TranscriptResults,
}

#[derive(Debug, Deserialize)]
struct TranscriptResults {
    items: Vec<TranscriptItem>,
}

#[derive(Debug, Deserialize)]
struct TranscriptItem {
    start_time: Option<String>,
    end_time: Option<String>,
    #[serde(rename = "type")]
    item_type: String,
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    content: String,
}

impl AwsTranscribeAsr {
    pub async fn new(source: AudioSource, use_cache: bool, config: &AwsConfig) -> Result<Self> {
        if config.s3_bucket.is_empty() {
            return Err(ScribeError::InvalidInput(
                "aws.s3_bucket is not configured".to_string(),
            )
            .into());
        }

        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()))
            .load()
            .await;

        Ok(Self {
            payload: AudioPayload::load(source, use_cache)?,
            s3_client: S3Client::new(&aws_config),
            transcribe_client: TranscribeClient::new(&aws_config),
            bucket: config.s3_bucket.clone(),
            key_prefix: config.s3_key_prefix.clone().unwrap_or_default(),
            language: config.language.clone(),
        })
    }

    fn media_format(&self) -> MediaFormat {
        let extension = self
            .payload
            .file_name()
            .and_then(|name| name.rsplit('.').next())
            .unwrap_or("mp3");
        match extension.to_lowercase().as_str() {
            "m4a" | "mp4" => MediaFormat::Mp4,
            "wav" => MediaFormat::Wav,
            "flac" => MediaFormat::Flac,
            "ogg" | "opus" => MediaFormat::Ogg,
            "webm" => MediaFormat::Webm,
            _ => MediaFormat::Mp3,
        }
    }

    async fn upload_audio(&self) -> Result<String> {
        let key = format!(
            "{}audio_{}_{}.{}",
            self.key_prefix,
            Uuid::new_v4(),
            chrono::Utc::now().format("%Y%m%d_%H%M%S"),
            self.media_format().as_str()
        );

        tracing::info!("uploading audio to s3://{}/{}", self.bucket, key);
        self.s3_client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(self.payload.bytes().to_vec().into())
            .send()
            .await
            .context("Failed to upload audio to S3")?;

        Ok(key)
    }

    async fn start_job(&self, s3_key: &str) -> Result<String> {
        let job_name = format!("clipscribe_{}", Uuid::new_v4());
        let media = Media::builder()
            .media_file_uri(format!("s3://{}/{}", self.bucket, s3_key))
            .build();

        let mut job_builder = self
            .transcribe_client
            .start_transcription_job()
            .transcription_job_name(&job_name)
            .media_format(self.media_format())
            .media(media);

        if let Some(lang) = &self.language {
            job_builder = job_builder.language_code(lang.parse()?);
        } else {
            job_builder = job_builder.identify_language(true);
        }

        tracing::info!(%job_name, "starting transcription job");
        job_builder
            .send()
            .await
            .context("Failed to start transcription job")?;

        Ok(job_name)
    }

    async fn poll_job(
        &self,
        job_name: &str,
        callback: Option<&ProgressCallback>,
    ) -> Result<String> {
        let mut check_count: u64 = 0;
        loop {
            check_count += 1;
            self.payload.limiter().acquire().await;

            let response = self
                .transcribe_client
                .get_transcription_job()
                .transcription_job_name(job_name)
                .send()
                .await
                .context("Failed to get transcription job status")?;
            let job = response
                .transcription_job()
                .ok_or_else(|| anyhow::anyhow!("Transcription job not found"))?;

            match job.transcription_job_status() {
                Some(TranscriptionJobStatus::InProgress) | Some(TranscriptionJobStatus::Queued) => {
                    // Climb from 60 toward 99 while the remote job runs
                    let progress = std::cmp::min(60 + check_count * 2, 99) as u8;
                    AsrStage::Transcribing.emit_with_progress(callback, progress);

                    let wait = std::cmp::min(5 + (check_count - 1) * 2, 30);
                    sleep(Duration::from_secs(wait)).await;
                }
                Some(TranscriptionJobStatus::Completed) => {
                    let uri = job
                        .transcript()
                        .and_then(|t| t.transcript_file_uri())
                        .ok_or_else(|| anyhow::anyhow!("No transcript URI found"))?;
                    return Ok(uri.to_string());
                }
                Some(TranscriptionJobStatus::Failed) => {
                    let reason = job.failure_reason().unwrap_or("Unknown error");
                    return Err(ScribeError::TranscriptionFailed(format!(
                        "transcription job failed: {}",
                        reason
                    ))
                    .into());
                }
                _ => {
                    return Err(ScribeError::TranscriptionFailed(
                        "unexpected transcription job status".to_string(),
                    )
                    .into());
                }
            }
        }
    }

    async fn fetch_transcript(&self, uri: &str) -> Result<Value> {
        self.payload.limiter().acquire().await;

        let response = reqwest::get(uri)
            .await
            .context("Failed to download transcript")?;
        if !response.status().is_success() {
            return Err(ScribeError::TranscriptionFailed(format!(
                "transcript download returned HTTP {}",
                response.status()
            ))
            .into());
        }

        let body = response
            .text()
            .await
            .context("Failed to read transcript content")?;
        serde_json::from_str(&body).context("Failed to parse transcript JSON")
    }

    async fn cleanup_staging(&self, s3_key: &str) {
        tracing::debug!("cleaning up s3://{}/{}", self.bucket, s3_key);
        if let Err(error) = self
            .s3_client
            .delete_object()
            .bucket(&self.bucket)
            .key(s3_key)
            .send()
            .await
        {
            tracing::warn!(%s3_key, %error, "failed to clean up staged S3 object");
        }
    }
}

#[async_trait]
impl AsrProvider for AwsTranscribeAsr {
    fn name(&self) -> &'static str {
        "AwsTranscribeAsr"
    }

    fn payload(&self) -> &AudioPayload {
        &self.payload
    }

    async fn execute(&self, callback: Option<&ProgressCallback>) -> Result<Value> {
        self.payload.limiter().acquire().await;
        AsrStage::Uploading.emit(callback);
        let s3_key = self.upload_audio().await?;

        self.payload.limiter().acquire().await;
        AsrStage::CreatingTask.emit(callback);
        let job_name = match self.start_job(&s3_key).await {
            Ok(job_name) => job_name,
            Err(error) => {
                self.cleanup_staging(&s3_key).await;
                return Err(error);
            }
        };

        AsrStage::Transcribing.emit(callback);
        let result = match self.poll_job(&job_name, callback).await {
            Ok(uri) => self.fetch_transcript(&uri).await,
            Err(error) => Err(error),
        };
        self.cleanup_staging(&s3_key).await;

        let transcript = result?;
        AsrStage::Completed.emit(callback);
        Ok(transcript)
    }

    fn extract_segments(&self, response: &Value) -> Result<Vec<AsrDataSeg>> {
        let transcript: AwsTranscript = serde_json::from_value(response.clone())
            .context("Failed to parse transcript JSON")?;
        Ok(group_segments(&transcript))
    }
}

/// Group word-level transcript items into timed segments, splitting at
/// sentence-ending punctuation and at silence gaps longer than one second.
fn group_segments(transcript: &AwsTranscript) -> Vec<AsrDataSeg> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut seg_start: Option<f64> = None;
    let mut seg_end: Option<f64> = None;

    let mut flush = |text: &mut String, seg_start: &mut Option<f64>, seg_end: &mut Option<f64>| {
        if !text.is_empty() {
            if let (Some(start), Some(end)) = (*seg_start, *seg_end) {
                segments.push(AsrDataSeg {
                    text: std::mem::take(text),
                    start_time: start,
                    end_time: end,
                });
            } else {
                text.clear();
            }
        }
        *seg_start = None;
        *seg_end = None;
    };

    for item in &transcript.results.items {
        let content = match item.alternatives.first() {
            Some(alt) => alt.content.as_str(),
            None => continue,
        };

        match item.item_type.as_str() {
            "pronunciation" => {
                let start = item.start_time.as_deref().and_then(|s| s.parse().ok());
                let end = item.end_time.as_deref().and_then(|s| s.parse().ok());

                let gap = seg_end
                    .zip(start)
                    .map(|(prev, next): (f64, f64)| next - prev > 1.0)
                    .unwrap_or(false);
                if gap {
                    flush(&mut text, &mut seg_start, &mut seg_end);
                }

                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(content);
                if seg_start.is_none() {
                    seg_start = start;
                }
                seg_end = end.or(seg_end);
            }
            "punctuation" => {
                text.push_str(content);
                if content.ends_with('.') || content.ends_with('!') || content.ends_with('?') {
                    flush(&mut text, &mut seg_start, &mut seg_end);
                }
            }
            _ => {}
        }
    }
    flush(&mut text, &mut seg_start, &mut seg_end);

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments_of(response: Value) -> Vec<AsrDataSeg> {
        let transcript: AwsTranscript = serde_json::from_value(response).unwrap();
        group_segments(&transcript)
    }

    fn sample_transcript() -> Value {
        serde_json::json!({
            "jobName": "clipscribe_test",
            "accountId": "123",
            "status": "COMPLETED",
            "results": {
                "transcripts": [{"transcript": "Hello there. General Kenobi."}],
                "items": [
                    {"type": "pronunciation", "start_time": "0.0", "end_time": "0.6",
                     "alternatives": [{"confidence": "0.99", "content": "Hello"}]},
                    {"type": "pronunciation", "start_time": "0.6", "end_time": "1.1",
                     "alternatives": [{"confidence": "0.98", "content": "there"}]},
                    {"type": "punctuation",
                     "alternatives": [{"confidence": "0.0", "content": "."}]},
                    {"type": "pronunciation", "start_time": "1.8", "end_time": "2.4",
                     "alternatives": [{"confidence": "0.97", "content": "General"}]},
                    {"type": "pronunciation", "start_time": "2.4", "end_time": "3.0",
                     "alternatives": [{"confidence": "0.99", "content": "Kenobi"}]},
                    {"type": "punctuation",
                     "alternatives": [{"confidence": "0.0", "content": "."}]}
                ]
            }
        })
    }

    #[test]
    fn test_segments_split_at_sentence_punctuation() {
        let segments = segments_of(sample_transcript());
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "Hello there.");
        assert_eq!(segments[0].start_time, 0.0);
        assert_eq!(segments[0].end_time, 1.1);
        assert_eq!(segments[1].text, "General Kenobi.");
        assert_eq!(segments[1].start_time, 1.8);
    }

    #[test]
    fn test_segments_split_at_long_silence_gap() {
        let response = serde_json::json!({
            "results": {
                "items": [
                    {"type": "pronunciation", "start_time": "0.0", "end_time": "0.5",
                     "alternatives": [{"content": "one"}]},
                    {"type": "pronunciation", "start_time": "5.0", "end_time": "5.5",
                     "alternatives": [{"content": "two"}]}
                ]
            }
        });
        let segments = segments_of(response);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "one");
        assert_eq!(segments[1].text, "two");
        assert_eq!(segments[1].start_time, 5.0);
    }

    #[test]
    fn test_empty_item_list_yields_no_segments() {
        let response = serde_json::json!({"results": {"items": []}});
        assert!(segments_of(response).is_empty());
    }

    #[test]
    fn test_commas_do_not_split_segments() {
        let response = serde_json::json!({
            "results": {
                "items": [
                    {"type": "pronunciation", "start_time": "0.0", "end_time": "0.4",
                     "alternatives": [{"content": "well"}]},
                    {"type": "punctuation", "alternatives": [{"content": ","}]},
                    {"type": "pronunciation", "start_time": "0.5", "end_time": "0.9",
                     "alternatives": [{"content": "yes"}]}
                ]
            }
        });
        let segments = segments_of(response);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].text, "well, yes");
    }
}
