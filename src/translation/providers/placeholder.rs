//! Placeholder speech artifacts, substituted when real synthesis is unavailable.
//!
//! The file is a bare MP3 frame header followed by padding: enough for players to
//! accept it, silent in practice.

use super::artifact_location;
use crate::error::{AppError, AppResult};
use crate::translation::languages::Language;
use crate::translation::types::SynthesizedAudio;
use std::path::PathBuf;
use tracing::warn;

const PLACEHOLDER_MP3: [u8; 16] = [
    0xFF, 0xFB, 0x90, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Why the placeholder is being produced; determines the reported provider id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderReason {
    /// No synthesis adapter is configured
    NotConfigured,
    /// The adapter errored or timed out
    ProviderFailed,
}

impl PlaceholderReason {
    pub fn provider_id(&self) -> &'static str {
        match self {
            PlaceholderReason::NotConfigured => "mock-tts",
            PlaceholderReason::ProviderFailed => "mock-fallback",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlaceholderSynthesizer {
    output_dir: PathBuf,
    public_url_prefix: String,
}

impl PlaceholderSynthesizer {
    pub fn new(output_dir: impl Into<PathBuf>, public_url_prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            public_url_prefix: public_url_prefix.into(),
        }
    }

    pub async fn produce(
        &self,
        text: &str,
        language: &Language,
        voice: &str,
        reason: PlaceholderReason,
    ) -> AppResult<SynthesizedAudio> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let (path, url) = artifact_location(&self.output_dir, &self.public_url_prefix, language);
        tokio::fs::write(&path, PLACEHOLDER_MP3)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to write placeholder audio: {}", e)))?;

        warn!(
            file = %path.display(),
            provider = reason.provider_id(),
            "Placeholder speech artifact generated"
        );

        Ok(SynthesizedAudio {
            audio_path: path.to_string_lossy().into_owned(),
            audio_url: url,
            language: language.code.to_string(),
            voice: voice.to_string(),
            duration_secs: (text.chars().count() as f64 * 0.05).ceil() as u32,
            file_size: PLACEHOLDER_MP3.len(),
            provider: reason.provider_id().to_string(),
        })
    }
}
