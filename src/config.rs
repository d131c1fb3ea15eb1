//! # Configuration Management
//!
//! This module handles loading and managing application configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP__ prefix)
//! - Default values (built into the code)
//!
//! ## Configuration Priority (highest to lowest):
//! 1. Deployment overrides (`HOST`, `PORT`, `OPENAI_API_KEY`)
//! 2. Environment variables (`APP__SERVER__PORT`, `APP__CACHE__TTL_SECS`, etc.)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)
//!
//! The double-underscore separator is needed because several keys contain a
//! single underscore themselves (`ttl_secs`, `max_upload_bytes`, ...).

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Main application configuration that contains all settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub cache: CacheConfig,
    pub audio: AudioConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Upstream AI provider settings.
///
/// An empty `openai_api_key` leaves the adapters unconfigured: text translation and
/// transcription then fail with an upstream error, speech synthesis falls back to a
/// placeholder artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub translation_model: String,
    pub transcription_model: String,
    pub tts_model: String,
    /// Upper bound for every single upstream call
    pub request_timeout_secs: u64,
}

/// Translation cache policy (one policy for every surface).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of memoized translations
    pub capacity: usize,
    /// Entry lifetime in seconds; 0 disables expiry (capacity-only eviction)
    pub ttl_secs: u64,
}

/// Audio upload and synthesized-output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Where uploads are staged for the duration of a transcription call
    pub temp_dir: String,
    /// Where synthesized speech is written
    pub output_dir: String,
    /// URL prefix under which synthesized files are served
    pub public_url_prefix: String,
    pub max_upload_bytes: usize,
    /// Synthesized files older than this are removed by the cleanup task
    pub output_max_age_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            providers: ProvidersConfig {
                openai_api_key: String::new(),
                openai_base_url: "https://api.openai.com/v1".to_string(),
                translation_model: "gpt-4o-mini".to_string(),
                transcription_model: "whisper-1".to_string(),
                tts_model: "tts-1".to_string(),
                request_timeout_secs: 30,
            },
            cache: CacheConfig {
                capacity: 1000,
                ttl_secs: 300, // 5 minutes
            },
            audio: AudioConfig {
                temp_dir: std::env::temp_dir().to_string_lossy().into_owned(),
                output_dir: "public/audio".to_string(),
                public_url_prefix: "/audio".to_string(),
                max_upload_bytes: 10 * 1024 * 1024, // 10MB
                output_max_age_secs: 60 * 60,
                cleanup_interval_secs: 10 * 60,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Environment Variable Examples:
    /// - `APP__SERVER__HOST=0.0.0.0`: Override server host
    /// - `APP__CACHE__CAPACITY=500`: Override cache capacity
    /// - `HOST=0.0.0.0` / `PORT=3000`: Special cases for deployment platforms
    /// - `OPENAI_API_KEY=sk-...`: Conventional provider key variable
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("__")
                    .separator("__"),
            );

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        if let Ok(key) = env::var("OPENAI_API_KEY") {
            settings = settings.set_override("providers.openai_api_key", key)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.cache.capacity == 0 {
            return Err(anyhow::anyhow!("Cache capacity must be greater than 0"));
        }

        if self.providers.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("Upstream request timeout must be greater than 0"));
        }

        if self.audio.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("Maximum upload size must be greater than 0"));
        }

        if self.audio.cleanup_interval_secs == 0 {
            return Err(anyhow::anyhow!("Cleanup interval must be greater than 0"));
        }

        Ok(())
    }

    pub fn upstream_timeout(&self) -> Duration {
        Duration::from_secs(self.providers.request_timeout_secs)
    }

    /// `None` means entries never expire.
    pub fn cache_ttl(&self) -> Option<Duration> {
        match self.cache.ttl_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn providers_configured(&self) -> bool {
        !self.providers.openai_api_key.trim().is_empty()
    }
}
