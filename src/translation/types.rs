//! Result types produced by the translation pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Provider id of the identity translation.
pub const SAME_LANGUAGE_PROVIDER: &str = "same-language";

/// Outcome of one text translation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationResult {
    pub original_text: String,
    pub translated_text: String,
    /// Upper-case two-letter codes
    pub source_language: String,
    pub target_language: String,
    /// 0.0 to 1.0
    pub confidence: f32,
    pub provider: String,
    pub processing_time_ms: u64,
    pub from_cache: bool,
    pub timestamp: DateTime<Utc>,
}

impl TranslationResult {
    /// Identity translation for equal source and target languages.
    pub fn identity(text: &str, code: &str) -> Self {
        Self {
            original_text: text.to_string(),
            translated_text: text.to_string(),
            source_language: code.to_string(),
            target_language: code.to_string(),
            confidence: 1.0,
            provider: SAME_LANGUAGE_PROVIDER.to_string(),
            processing_time_ms: 0,
            from_cache: false,
            timestamp: Utc::now(),
        }
    }
}

/// A synthesized speech artifact on disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynthesizedAudio {
    pub audio_path: String,
    /// Public URL under which the file is served
    pub audio_url: String,
    pub language: String,
    pub voice: String,
    /// Rough estimate in seconds
    pub duration_secs: u32,
    pub file_size: usize,
    pub provider: String,
}

impl SynthesizedAudio {
    /// True when the artifact is a placeholder rather than real speech.
    pub fn is_placeholder(&self) -> bool {
        self.provider.starts_with("mock")
    }
}

/// Per-stage timings of a voice translation, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StageTimings {
    pub transcription_ms: u64,
    pub translation_ms: u64,
    pub synthesis_ms: u64,
}

/// Outcome of the STT → translate → TTS pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoiceTranslationResult {
    pub transcript: String,
    pub translated_text: String,
    pub source_language: String,
    pub target_language: String,
    pub confidence: f32,
    pub transcription_provider: String,
    pub translation_provider: String,
    pub from_cache: bool,
    /// Reference of the input audio the transcript came from
    pub source_audio: String,
    pub audio: SynthesizedAudio,
    pub timings: StageTimings,
    pub processing_time_ms: u64,
    pub timestamp: DateTime<Utc>,
}

/// Outcome of language detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageDetection {
    pub code: String,
    pub confidence: f32,
    pub provider: String,
}
