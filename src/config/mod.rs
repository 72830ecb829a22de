use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Resolved configuration for the whole pipeline.
///
/// Precedence is resolved once at load time, not at read time: hard-coded
/// defaults, then the YAML file, then environment variables. Explicit CLI
/// overrides are applied on top by the caller.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub asr: AsrConfig,
    pub whisper: WhisperConfig,
    pub openai: OpenAiConfig,
    pub aws: AwsConfig,
    pub youtube: YoutubeConfig,
    pub storage: StorageConfig,
    pub download: DownloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AsrConfig {
    /// Selected backend: "whisper", "openai" or "aws"
    pub provider: String,

    /// Whether providers should consult an external result cache
    pub use_cache: bool,

    /// Request word-level timestamps from backends that support them
    pub need_word_time_stamp: bool,
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            provider: "whisper".to_string(),
            use_cache: false,
            need_word_time_stamp: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhisperConfig {
    /// Model name passed to the whisper executable
    pub model: String,

    /// Language code, or "auto" for detection
    pub language: String,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model: "base".to_string(),
            language: "auto".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// API key; usually supplied via OPENAI_API_KEY
    pub api_key: Option<String>,

    /// API base URL
    pub base_url: String,

    /// Transcription model
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "whisper-1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    /// AWS region
    pub region: String,

    /// S3 bucket for temporary audio staging
    pub s3_bucket: String,

    /// Optional S3 key prefix
    pub s3_key_prefix: Option<String>,

    /// Language code, or None for automatic identification
    pub language: Option<String>,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            s3_bucket: String::new(),
            s3_key_prefix: Some("clipscribe/".to_string()),
            language: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct YoutubeConfig {
    pub download: YoutubeDownloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeDownloadConfig {
    /// Target audio codec for extracted audio
    pub audio_format: String,

    /// Target audio quality
    pub audio_quality: String,
}

impl Default for YoutubeDownloadConfig {
    fn default() -> Self {
        Self {
            audio_format: "mp3".to_string(),
            audio_quality: "192".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory that holds downloaded artifacts until cleanup
    pub temp_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from("/tmp/clipscribe"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Retry count for the whole download job
    pub retries: u32,

    /// Retry count for individual fragment failures
    pub fragment_retries: u32,

    /// Socket-level timeout handed to the downloader
    pub socket_timeout_seconds: u32,

    /// Deadline for the whole fetch-and-resolve sequence
    pub timeout_seconds: u64,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            fragment_retries: 5,
            socket_timeout_seconds: 60,
            timeout_seconds: 300,
        }
    }
}

impl Config {
    /// Load configuration: defaults, then the YAML file if present, then
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) => {
                let content = fs_err::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                serde_yaml::from_str(&content)
                    .with_context(|| format!("Failed to parse config file {}", path.display()))?
            }
            None => {
                tracing::info!("no config file found, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Locate the config file: working directory first, then the platform
    /// config directory.
    fn config_path() -> Option<PathBuf> {
        let local = PathBuf::from("config.yaml");
        if local.exists() {
            return Some(local);
        }

        let global = dirs::config_dir()?.join("clipscribe").join("config.yaml");
        global.exists().then_some(global)
    }

    /// Apply environment overrides through an injectable lookup.
    ///
    /// Unparsable numeric or boolean values are ignored with a warning
    /// rather than aborting startup.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(value) = lookup("ASR_PROVIDER") {
            self.asr.provider = value;
        }
        if let Some(value) = lookup("ASR_USE_CACHE") {
            match value.parse() {
                Ok(flag) => self.asr.use_cache = flag,
                Err(_) => tracing::warn!(value = %value, "ignoring unparsable ASR_USE_CACHE"),
            }
        }
        if let Some(value) = lookup("WHISPER_MODEL") {
            self.whisper.model = value;
        }
        if let Some(value) = lookup("WHISPER_LANGUAGE") {
            self.whisper.language = value;
        }
        if let Some(value) = lookup("OPENAI_API_KEY") {
            self.openai.api_key = Some(value);
        }
        if let Some(value) = lookup("AUDIO_FORMAT") {
            self.youtube.download.audio_format = value;
        }
        if let Some(value) = lookup("AUDIO_QUALITY") {
            self.youtube.download.audio_quality = value;
        }
        if let Some(value) = lookup("TEMP_DIR") {
            self.storage.temp_dir = PathBuf::from(value);
        }
        for (name, slot) in [
            ("DOWNLOAD_RETRIES", &mut self.download.retries),
            ("FRAGMENT_RETRIES", &mut self.download.fragment_retries),
            ("SOCKET_TIMEOUT", &mut self.download.socket_timeout_seconds),
        ] {
            if let Some(value) = lookup(name) {
                match value.parse() {
                    Ok(parsed) => *slot = parsed,
                    Err(_) => tracing::warn!(name, value = %value, "ignoring unparsable override"),
                }
            }
        }
    }

    /// Validate that the selected provider has what it needs
    pub fn validate(&self) -> Result<()> {
        if self.asr.provider == "aws" && self.aws.s3_bucket.is_empty() {
            anyhow::bail!("aws.s3_bucket must be configured for the aws provider");
        }
        Ok(())
    }

    /// Display resolved configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  ASR Provider: {}", self.asr.provider);
        println!("  Use Cache: {}", self.asr.use_cache);
        println!("  Whisper Model: {}", self.whisper.model);
        println!("  Whisper Language: {}", self.whisper.language);
        println!("  Audio Format: {}", self.youtube.download.audio_format);
        println!("  Audio Quality: {}", self.youtube.download.audio_quality);
        println!("  Temp Dir: {}", self.storage.temp_dir.display());
        println!("  Download Retries: {}", self.download.retries);
        println!("  Fragment Retries: {}", self.download.fragment_retries);
        println!("  Socket Timeout: {}s", self.download.socket_timeout_seconds);
        println!("  Download Deadline: {}s", self.download.timeout_seconds);
    }
}
