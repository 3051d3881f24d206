//! Configuration module
//!
//! Settings are read from the environment (a `.env` file is honoured) with
//! typed defaults, then validated once at startup.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use std::time::Duration;

use crate::storage_types::StorageBackend;

const SERVER_PORT: u16 = 3000;
const MAX_CONNECTIONS: u32 = 10;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const MAX_UPLOAD_SIZE_MB: usize = 500;
const PRESIGNED_URL_TTL_SECS: u64 = 3600;
const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-haiku-latest";

// Job monitor: 720 polls at 60s is roughly 12 hours, 600 roughly 10 hours.
const JOB_POLL_INTERVAL_SECS: u64 = 60;
const TRANSCRIPTION_MAX_ATTEMPTS: i32 = 720;
const VIDEO_LABEL_MAX_ATTEMPTS: i32 = 600;
const JOB_MONITOR_MAX_WORKERS: usize = 8;
const JOB_MONITOR_TICK_MS: u64 = 1000;

/// Which capability turns text into tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPhraseProvider {
    /// AWS Comprehend `DetectKeyPhrases`
    Comprehend,
    /// Comma-separated tags produced by a text completion
    Claude,
}

impl FromStr for KeyPhraseProvider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "comprehend" | "aws" => Ok(KeyPhraseProvider::Comprehend),
            "claude" | "anthropic" | "llm" => Ok(KeyPhraseProvider::Claude),
            _ => Err(anyhow::anyhow!("Invalid key phrase provider: {}", s)),
        }
    }
}

impl Display for KeyPhraseProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            KeyPhraseProvider::Comprehend => write!(f, "comprehend"),
            KeyPhraseProvider::Claude => write!(f, "claude"),
        }
    }
}

/// Thresholds used by the tag extraction strategies and fusion.
#[derive(Clone, Debug)]
pub struct ExtractionConfig {
    /// Max labels requested from image label detection
    pub image_max_labels: i32,
    /// Confidence floor sent with the image label request
    pub image_request_min_confidence: f32,
    /// Labels below this confidence are dropped before ranking
    pub image_keep_min_confidence: f32,
    pub image_top_n: usize,
    pub text_top_n: usize,
    pub key_phrase_min_score: f32,
    /// Input limit of the key phrase capability, in bytes
    pub key_phrase_max_bytes: usize,
    /// Below this many characters a PDF is treated as having no text layer
    pub pdf_min_text_chars: usize,
    pub ocr_min_text_chars: usize,
    /// Shorter transcripts count as "no speech" and yield no tags
    pub transcript_min_chars: usize,
    pub video_label_min_confidence: f32,
    pub video_label_top_n: usize,
    pub fused_max_tags: usize,
    pub transcribe_language_code: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            image_max_labels: 20,
            image_request_min_confidence: 70.0,
            image_keep_min_confidence: 90.0,
            image_top_n: 6,
            text_top_n: 8,
            key_phrase_min_score: 0.8,
            key_phrase_max_bytes: 4500,
            pdf_min_text_chars: 50,
            ocr_min_text_chars: 20,
            transcript_min_chars: 10,
            video_label_min_confidence: 80.0,
            video_label_top_n: 6,
            fused_max_tags: 15,
            transcribe_language_code: "en-US".to_string(),
        }
    }
}

/// Background job monitor settings.
#[derive(Clone, Debug)]
pub struct JobMonitorConfig {
    /// Delay between two polls of the same provider job
    pub poll_interval: Duration,
    pub transcription_max_attempts: i32,
    pub video_label_max_attempts: i32,
    pub max_workers: usize,
    /// How often the monitor looks for due jobs
    pub tick: Duration,
}

impl Default for JobMonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(JOB_POLL_INTERVAL_SECS),
            transcription_max_attempts: TRANSCRIPTION_MAX_ATTEMPTS,
            video_label_max_attempts: VIDEO_LABEL_MAX_ATTEMPTS,
            max_workers: JOB_MONITOR_MAX_WORKERS,
            tick: Duration::from_millis(JOB_MONITOR_TICK_MS),
        }
    }
}

#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
    pub log_format: String,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            server_port: SERVER_PORT,
            cors_origins: vec!["*".to_string()],
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            environment: "development".to_string(),
            log_format: "compact".to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct MediaTagConfig {
    pub base: BaseConfig,
    /// Absent means metadata and jobs live in process memory
    pub database_url: Option<String>,
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub url_signing_secret: Option<String>,
    pub presigned_url_ttl_secs: u64,
    pub max_upload_size_bytes: usize,
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub key_phrase_provider: KeyPhraseProvider,
    pub extraction: ExtractionConfig,
    pub jobs: JobMonitorConfig,
}

impl Default for MediaTagConfig {
    fn default() -> Self {
        Self {
            base: BaseConfig::default(),
            database_url: None,
            storage_backend: StorageBackend::Memory,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_path: None,
            local_storage_base_url: None,
            url_signing_secret: None,
            presigned_url_ttl_secs: PRESIGNED_URL_TTL_SECS,
            max_upload_size_bytes: MAX_UPLOAD_SIZE_MB * 1024 * 1024,
            anthropic_api_key: None,
            anthropic_model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            key_phrase_provider: KeyPhraseProvider::Comprehend,
            extraction: ExtractionConfig::default(),
            jobs: JobMonitorConfig::default(),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<MediaTagConfig>);

impl Config {
    pub fn new(inner: MediaTagConfig) -> Self {
        Config(Box::new(inner))
    }

    fn inner(&self) -> &MediaTagConfig {
        &self.0
    }

    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = MediaTagConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn log_format(&self) -> &str {
        &self.inner().base.log_format
    }

    pub fn database_url(&self) -> Option<&str> {
        self.inner().database_url.as_deref()
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.inner().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.inner().aws_region.as_deref()
    }

    /// Region for AWS provider clients, preferring `AWS_REGION`.
    pub fn provider_region(&self) -> Option<&str> {
        self.aws_region().or_else(|| self.s3_region())
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.inner().local_storage_base_url.as_deref()
    }

    pub fn url_signing_secret(&self) -> Option<&str> {
        self.inner().url_signing_secret.as_deref()
    }

    pub fn presigned_url_ttl(&self) -> Duration {
        Duration::from_secs(self.inner().presigned_url_ttl_secs)
    }

    pub fn max_upload_size_bytes(&self) -> usize {
        self.inner().max_upload_size_bytes
    }

    pub fn anthropic_api_key(&self) -> Option<&str> {
        self.inner().anthropic_api_key.as_deref()
    }

    pub fn anthropic_model(&self) -> &str {
        &self.inner().anthropic_model
    }

    pub fn key_phrase_provider(&self) -> KeyPhraseProvider {
        self.inner().key_phrase_provider
    }

    pub fn extraction(&self) -> &ExtractionConfig {
        &self.inner().extraction
    }

    pub fn jobs(&self) -> &JobMonitorConfig {
        &self.inner().jobs
    }
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn env_parse<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl MediaTagConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: env::var("SERVER_PORT")
                .or_else(|_| env::var("PORT"))
                .unwrap_or_else(|_| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("SERVER_PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", MAX_CONNECTIONS),
            db_timeout_seconds: env_parse("DB_TIMEOUT_SECONDS", CONNECTION_TIMEOUT_SECS),
            environment,
            log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "compact".to_string()),
        };

        let storage_backend = match env_opt("STORAGE_BACKEND") {
            Some(value) => value.parse()?,
            None => StorageBackend::S3,
        };

        let key_phrase_provider = match env_opt("KEY_PHRASE_PROVIDER") {
            Some(value) => value.parse()?,
            None => KeyPhraseProvider::Comprehend,
        };

        let defaults = ExtractionConfig::default();
        let extraction = ExtractionConfig {
            transcribe_language_code: env::var("TRANSCRIBE_LANGUAGE_CODE")
                .unwrap_or(defaults.transcribe_language_code.clone()),
            ..defaults
        };

        let jobs = JobMonitorConfig {
            poll_interval: Duration::from_secs(env_parse(
                "JOB_POLL_INTERVAL_SECS",
                JOB_POLL_INTERVAL_SECS,
            )),
            transcription_max_attempts: env_parse(
                "TRANSCRIPTION_MAX_ATTEMPTS",
                TRANSCRIPTION_MAX_ATTEMPTS,
            ),
            video_label_max_attempts: env_parse(
                "VIDEO_LABEL_MAX_ATTEMPTS",
                VIDEO_LABEL_MAX_ATTEMPTS,
            ),
            max_workers: env_parse("JOB_MONITOR_MAX_WORKERS", JOB_MONITOR_MAX_WORKERS),
            tick: Duration::from_millis(env_parse("JOB_MONITOR_TICK_MS", JOB_MONITOR_TICK_MS)),
        };

        let config = MediaTagConfig {
            base,
            database_url: env_opt("DATABASE_URL"),
            storage_backend,
            s3_bucket: env_opt("S3_BUCKET"),
            s3_region: env_opt("S3_REGION"),
            s3_endpoint: env_opt("S3_ENDPOINT"),
            aws_region: env_opt("AWS_REGION"),
            local_storage_path: env_opt("LOCAL_STORAGE_PATH"),
            local_storage_base_url: env_opt("LOCAL_STORAGE_BASE_URL"),
            url_signing_secret: env_opt("URL_SIGNING_SECRET"),
            presigned_url_ttl_secs: env_parse("PRESIGNED_URL_TTL_SECS", PRESIGNED_URL_TTL_SECS),
            max_upload_size_bytes: env_parse("MAX_UPLOAD_SIZE_MB", MAX_UPLOAD_SIZE_MB) * 1024 * 1024,
            anthropic_api_key: env_opt("ANTHROPIC_API_KEY"),
            anthropic_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| DEFAULT_ANTHROPIC_MODEL.to_string()),
            key_phrase_provider,
            extraction,
            jobs,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let env = self.base.environment.to_lowercase();
        let is_production = env == "production" || env == "prod";
        if is_production && self.base.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
                match &self.url_signing_secret {
                    Some(secret) if secret.len() >= 32 => {}
                    _ => {
                        return Err(anyhow::anyhow!(
                            "URL_SIGNING_SECRET must be at least 32 characters for local storage"
                        ))
                    }
                }
            }
            StorageBackend::Memory => {}
        }

        if self.key_phrase_provider == KeyPhraseProvider::Claude
            && self.anthropic_api_key.is_none()
        {
            return Err(anyhow::anyhow!(
                "KEY_PHRASE_PROVIDER=claude requires ANTHROPIC_API_KEY"
            ));
        }

        if self.presigned_url_ttl_secs == 0 {
            return Err(anyhow::anyhow!("PRESIGNED_URL_TTL_SECS must be positive"));
        }

        if self.jobs.poll_interval.is_zero() || self.jobs.max_workers == 0 {
            return Err(anyhow::anyhow!(
                "JOB_POLL_INTERVAL_SECS and JOB_MONITOR_MAX_WORKERS must be positive"
            ));
        }

        if self.jobs.transcription_max_attempts <= 0 || self.jobs.video_label_max_attempts <= 0 {
            return Err(anyhow::anyhow!("Job max attempts must be positive"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_design_targets() {
        let extraction = ExtractionConfig::default();
        assert_eq!(extraction.image_top_n, 6);
        assert_eq!(extraction.text_top_n, 8);
        assert_eq!(extraction.fused_max_tags, 15);
        assert_eq!(extraction.pdf_min_text_chars, 50);
        assert_eq!(extraction.ocr_min_text_chars, 20);

        let jobs = JobMonitorConfig::default();
        assert_eq!(jobs.poll_interval, Duration::from_secs(60));
        assert_eq!(jobs.transcription_max_attempts, 720);
        assert_eq!(jobs.video_label_max_attempts, 600);
    }

    #[test]
    fn test_memory_backend_validates_without_credentials() {
        let config = MediaTagConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_s3_backend_requires_bucket_and_region() {
        let mut config = MediaTagConfig {
            storage_backend: StorageBackend::S3,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.s3_bucket = Some("media".to_string());
        assert!(config.validate().is_err());

        config.aws_region = Some("us-east-1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_local_backend_requires_signing_secret() {
        let mut config = MediaTagConfig {
            storage_backend: StorageBackend::Local,
            local_storage_path: Some("/tmp/mediatag".to_string()),
            local_storage_base_url: Some("http://localhost:3000/files".to_string()),
            url_signing_secret: Some("short".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.url_signing_secret = Some("x".repeat(32));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_claude_key_phrases_require_api_key() {
        let config = MediaTagConfig {
            key_phrase_provider: KeyPhraseProvider::Claude,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_wildcard_cors_rejected_in_production() {
        let mut config = MediaTagConfig::default();
        config.base.environment = "production".to_string();
        assert!(config.validate().is_err());
    }
}
