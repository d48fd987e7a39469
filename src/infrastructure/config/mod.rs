use crate::domain::narration::NarrationSettings;
use crate::infrastructure::repositories::google_tts_repository::GOOGLE_TTS_ENDPOINT;
use crate::infrastructure::repositories::AudioEncoding;
use anyhow::{anyhow, Context};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Voices offered when `VOICES` is not set
pub const DEFAULT_VOICES: &[&str] = &[
    "uk-UA-Standard-A",
    "en-US-Standard-C",
    "en-US-Wavenet-F",
    "en-GB-Standard-A",
    "ru-RU-Standard-A",
    "de-DE-Standard-A",
    "fr-FR-Standard-A",
    "pl-PL-Standard-A",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub log_format: LogFormat,
    // Google Text-to-Speech
    pub google_tts_api_key: String,
    pub google_tts_endpoint: String,
    pub audio_encoding: AudioEncoding,
    pub synthesis_delay_ms: u64,
    pub voices: Vec<String>,
    // Pipeline limits
    pub max_text_chars: usize,
    pub direct_synthesis_max_chars: usize,
    pub chunk_max_chars: usize,
    /// Google refuses input over 5000 bytes whatever the character count
    pub chunk_max_bytes: usize,
    pub merge_block_size: usize,
    pub max_upload_bytes: usize,
    // Workspaces
    pub workspace_root: PathBuf,
    pub workspace_ttl_secs: u64,
    pub workspace_sweep_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Config {
            host: get_or("HOST", "0.0.0.0"),
            port: parse_var(&lookup, "PORT", 8080)?,
            environment: match get_or("ENVIRONMENT", "development").as_str() {
                "production" => Environment::Production,
                _ => Environment::Development,
            },
            log_format: match get_or("LOG_FORMAT", "pretty").as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
            google_tts_api_key: lookup("GOOGLE_TTS_API_KEY")
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| anyhow!("GOOGLE_TTS_API_KEY must be set"))?,
            google_tts_endpoint: get_or("GOOGLE_TTS_ENDPOINT", GOOGLE_TTS_ENDPOINT),
            audio_encoding: AudioEncoding::from_str(&get_or("SYNTHESIS_AUDIO_ENCODING", "mp3"))
                .map_err(|e| anyhow!("SYNTHESIS_AUDIO_ENCODING: {}", e))?,
            synthesis_delay_ms: parse_var(&lookup, "SYNTHESIS_DELAY_MS", 500)?,
            voices: match lookup("VOICES") {
                Some(list) => list
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(String::from)
                    .collect(),
                None => DEFAULT_VOICES.iter().map(|v| v.to_string()).collect(),
            },
            max_text_chars: parse_var(&lookup, "MAX_TEXT_CHARS", 50_000)?,
            direct_synthesis_max_chars: parse_var(&lookup, "DIRECT_SYNTHESIS_MAX_CHARS", 1_000)?,
            chunk_max_chars: parse_var(&lookup, "CHUNK_MAX_CHARS", 4_800)?,
            chunk_max_bytes: parse_var(&lookup, "CHUNK_MAX_BYTES", 5_000)?,
            merge_block_size: parse_var(&lookup, "MERGE_BLOCK_SIZE", 5)?,
            max_upload_bytes: parse_var(&lookup, "MAX_UPLOAD_BYTES", 2 * 1024 * 1024)?,
            workspace_root: lookup("WORKSPACE_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| env::temp_dir().join("narrator")),
            workspace_ttl_secs: parse_var(&lookup, "WORKSPACE_TTL_SECS", 3_600)?,
            workspace_sweep_secs: parse_var(&lookup, "WORKSPACE_SWEEP_SECS", 60)?,
        };

        if config.chunk_max_chars == 0 {
            return Err(anyhow!("CHUNK_MAX_CHARS must be greater than zero"));
        }
        if config.chunk_max_bytes == 0 {
            return Err(anyhow!("CHUNK_MAX_BYTES must be greater than zero"));
        }
        if config.merge_block_size == 0 {
            return Err(anyhow!("MERGE_BLOCK_SIZE must be greater than zero"));
        }

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn narration_settings(&self) -> NarrationSettings {
        NarrationSettings {
            max_text_chars: self.max_text_chars,
            direct_max_chars: self.direct_synthesis_max_chars,
            chunk_max_chars: self.chunk_max_chars,
            chunk_max_bytes: self.chunk_max_bytes,
            merge_block_size: self.merge_block_size,
            synthesis_delay: Duration::from_millis(self.synthesis_delay_ms),
            audio_encoding: self.audio_encoding,
        }
    }

    pub fn workspace_ttl(&self) -> Duration {
        Duration::from_secs(self.workspace_ttl_secs)
    }

    pub fn workspace_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.workspace_sweep_secs.max(1))
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value '{}'", key, value)),
        None => Ok(default),
    }
}
