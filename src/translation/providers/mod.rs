//! # Upstream Adapters
//!
//! Capability traits for the external AI services the pipeline depends on. The
//! orchestrator only ever talks to these traits; concrete vendors live in submodules.
//!
//! ## Capabilities:
//! - [`SpeechToText`]: audio file → transcript
//! - [`TextTranslator`]: text → text in another language
//! - [`SpeechSynthesizer`]: text → audio artifact on disk
//! - [`LanguageClassifier`]: text → raw language-code answer
//!
//! Adapters do not enforce time budgets; the orchestrator wraps every call in a timeout.

pub mod openai;
pub mod placeholder;

#[cfg(test)]
pub mod fakes;

use crate::error::AppError;
use crate::translation::languages::Language;
use crate::translation::types::SynthesizedAudio;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

pub use openai::OpenAiProvider;
pub use placeholder::PlaceholderSynthesizer;

/// Raw transcription returned by a speech-to-text adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub text: String,
    /// Language reported by the adapter, if any
    pub language: Option<String>,
    pub confidence: f32,
}

/// Raw translation returned by a text-translation adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct Translated {
    pub text: String,
    pub confidence: f32,
}

/// Adapter failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// No credentials configured for this adapter
    NotConfigured,
    /// Network or transport level failure
    Request(String),
    /// Non-success HTTP status from the provider
    Status { status: u16, body: String },
    /// Response did not have the expected shape
    InvalidResponse(String),
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::NotConfigured => write!(f, "provider is not configured"),
            ProviderError::Request(msg) => write!(f, "request failed: {}", msg),
            ProviderError::Status { status, body } => write!(f, "HTTP {}: {}", status, body),
            ProviderError::InvalidResponse(msg) => write!(f, "invalid response: {}", msg),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        AppError::UpstreamFailure(err.to_string())
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        ProviderError::Request(err.to_string())
    }
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    fn name(&self) -> &str;

    /// Transcribe the audio file at `audio`, hinting the expected spoken language.
    async fn transcribe(&self, audio: &Path, hint: &Language) -> Result<Transcript, ProviderError>;
}

#[async_trait]
pub trait TextTranslator: Send + Sync {
    fn name(&self) -> &str;

    async fn translate(
        &self,
        text: &str,
        from: &Language,
        to: &Language,
    ) -> Result<Translated, ProviderError>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    /// Synthesize `text` with `voice` and write the artifact to disk.
    async fn synthesize(
        &self,
        text: &str,
        language: &Language,
        voice: &str,
    ) -> Result<SynthesizedAudio, ProviderError>;
}

#[async_trait]
pub trait LanguageClassifier: Send + Sync {
    fn name(&self) -> &str;

    /// Ask which of `candidates` the text is written in. The answer is returned raw;
    /// interpreting it is up to the caller.
    async fn classify(&self, text: &str, candidates: &[&str]) -> Result<String, ProviderError>;
}

/// System instruction for the translation adapter.
///
/// The same language pair always yields the same prompt.
pub fn translation_instruction(from: &Language, to: &Language) -> String {
    format!(
        "You are a professional translator. Translate the user's text from {} to {}. \
         Preserve tone, meaning and formatting. Respond with the translation only, \
         without quotes, explanations or commentary.",
        from.name, to.name
    )
}

/// System instruction for the language classifier.
pub fn classification_instruction(candidates: &[&str]) -> String {
    format!(
        "Identify the language of the user's text. Answer with exactly one of these \
         two-letter codes and nothing else: {}.",
        candidates.join(", ")
    )
}

/// Rough spoken duration: about 150 words per minute, at least one second.
pub fn estimate_speech_secs(text: &str) -> u32 {
    let words = text.split_whitespace().count() as f64;
    ((words / 150.0) * 60.0).ceil().max(1.0) as u32
}

/// Fresh file path and public URL for a synthesized artifact.
///
/// Names look like `tts_<uuid>_<lang>.mp3` so concurrent syntheses never collide.
pub fn artifact_location(output_dir: &Path, url_prefix: &str, language: &Language) -> (PathBuf, String) {
    let filename = format!(
        "tts_{}_{}.mp3",
        uuid::Uuid::new_v4().simple(),
        language.code.to_lowercase()
    );
    let url = format!("{}/{}", url_prefix.trim_end_matches('/'), filename);
    (output_dir.join(filename), url)
}
