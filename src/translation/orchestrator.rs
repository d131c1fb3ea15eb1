//! # Translation Orchestrator
//!
//! Chains the upstream adapters into the operations the rest of the server uses:
//!
//! ```text
//! translate_text:   validate → same-language shortcut → cache → MT → cache store
//! translate_voice:  validate → STT → translate_text → TTS (placeholder on failure)
//! synthesize_speech:           validate → TTS (placeholder on failure)
//! detect_language:  classifier → interpret answer (charset heuristic on failure)
//! ```
//!
//! ## Failure policy:
//! - Every adapter call is bounded by the upstream timeout (`UpstreamTimeout`)
//! - Transcription and text translation failures propagate; nothing is substituted
//! - Speech synthesis is the one stage with a fallback: a placeholder artifact
//! - Voice pipeline failures name the stage that failed (`AppError::Pipeline`)
//!
//! ## Concurrency:
//! The orchestrator holds no lock across an adapter call. Two identical concurrent
//! requests may both miss the cache and both call upstream; the later store wins.

use crate::error::{AppError, AppResult, PipelineStage};
use crate::translation::cache::TranslationCache;
use crate::translation::languages::{self, Language, DEFAULT_LANGUAGE};
use crate::translation::providers::placeholder::PlaceholderReason;
use crate::translation::providers::{
    LanguageClassifier, PlaceholderSynthesizer, ProviderError, SpeechSynthesizer, SpeechToText,
    TextTranslator,
};
use crate::translation::types::{
    LanguageDetection, StageTimings, SynthesizedAudio, TranslationResult, VoiceTranslationResult,
};
use chrono::Utc;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Longest text accepted for speech synthesis, in characters.
pub const MAX_SYNTHESIS_CHARS: usize = 4096;

const EXACT_MATCH_CONFIDENCE: f32 = 0.9;
const PARTIAL_MATCH_CONFIDENCE: f32 = 0.7;
const NO_MATCH_CONFIDENCE: f32 = 0.3;
const HEURISTIC_CONFIDENCE: f32 = 0.85;
const HEURISTIC_DEFAULT_CONFIDENCE: f32 = 0.5;

/// The four upstream capabilities the orchestrator drives.
#[derive(Clone)]
pub struct Adapters {
    pub transcriber: Arc<dyn SpeechToText>,
    pub translator: Arc<dyn TextTranslator>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub classifier: Arc<dyn LanguageClassifier>,
}

impl Adapters {
    /// Use one provider for every capability.
    pub fn single<P>(provider: Arc<P>) -> Self
    where
        P: SpeechToText + TextTranslator + SpeechSynthesizer + LanguageClassifier + 'static,
    {
        Self {
            transcriber: provider.clone(),
            translator: provider.clone(),
            synthesizer: provider.clone(),
            classifier: provider,
        }
    }
}

pub struct TranslationOrchestrator {
    adapters: Adapters,
    placeholder: PlaceholderSynthesizer,
    cache: Arc<TranslationCache>,
    timeout: Duration,
}

impl TranslationOrchestrator {
    pub fn new(
        adapters: Adapters,
        placeholder: PlaceholderSynthesizer,
        cache: Arc<TranslationCache>,
        timeout: Duration,
    ) -> Self {
        Self {
            adapters,
            placeholder,
            cache,
            timeout,
        }
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// Run an adapter call under the upstream timeout.
    async fn bounded<T, F>(&self, operation: &str, call: F) -> AppResult<T>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result.map_err(|e| {
                warn!(operation = operation, error = %e, "Upstream call failed");
                AppError::from(e)
            }),
            Err(_) => {
                warn!(operation = operation, timeout_ms = self.timeout.as_millis() as u64, "Upstream call timed out");
                Err(AppError::UpstreamTimeout(format!(
                    "{} did not answer within {} ms",
                    operation,
                    self.timeout.as_millis()
                )))
            }
        }
    }

    /// Translate text between two supported languages.
    ///
    /// Equal languages short-circuit to the identity translation without touching the
    /// cache or the upstream adapter; the input comes back exactly as given. Otherwise
    /// the trimmed text is translated and cached. Cache hits return the stored result
    /// flagged `from_cache`.
    pub async fn translate_text(&self, input: &str, from: &str, to: &str) -> AppResult<TranslationResult> {
        let started = Instant::now();

        let text = input.trim();
        if text.is_empty() {
            return Err(AppError::ValidationError("Text is required".to_string()));
        }
        let from = languages::resolve(from)?;
        let to = languages::resolve(to)?;

        if from.code == to.code {
            debug!(language = from.code, "Same-language translation, returning input");
            return Ok(TranslationResult::identity(input, from.code));
        }

        if let Some(mut cached) = self.cache.get(text, from.code, to.code) {
            debug!(from = from.code, to = to.code, "Translation cache hit");
            cached.from_cache = true;
            return Ok(cached);
        }

        let translator = &self.adapters.translator;
        let translated = self
            .bounded("translation", translator.translate(text, from, to))
            .await?;

        let result = TranslationResult {
            original_text: text.to_string(),
            translated_text: translated.text,
            source_language: from.code.to_string(),
            target_language: to.code.to_string(),
            confidence: translated.confidence.clamp(0.0, 1.0),
            provider: translator.name().to_string(),
            processing_time_ms: started.elapsed().as_millis() as u64,
            from_cache: false,
            timestamp: Utc::now(),
        };

        self.cache.set(text, from.code, to.code, result.clone());

        info!(
            from = from.code,
            to = to.code,
            provider = %result.provider,
            processing_time_ms = result.processing_time_ms,
            "Text translated"
        );
        Ok(result)
    }

    /// Speech-to-speech translation of the audio file at `audio`.
    ///
    /// Both codes are validated before anything is sent upstream. An empty transcript
    /// fails with `NoSpeechDetected` and stops the pipeline.
    pub async fn translate_voice(&self, audio: &Path, from: &str, to: &str) -> AppResult<VoiceTranslationResult> {
        let started = Instant::now();
        let from = languages::resolve(from)?;
        let to = languages::resolve(to)?;
        let mut timings = StageTimings::default();

        let stage_start = Instant::now();
        let transcriber = &self.adapters.transcriber;
        let transcript = self
            .bounded("transcription", transcriber.transcribe(audio, from))
            .await
            .map_err(|e| e.at_stage(PipelineStage::Transcription))?;
        timings.transcription_ms = stage_start.elapsed().as_millis() as u64;

        if transcript.text.trim().is_empty() {
            warn!(audio = %audio.display(), "Transcription returned no speech");
            return Err(AppError::NoSpeechDetected);
        }
        debug!(chars = transcript.text.len(), language = ?transcript.language, "Audio transcribed");

        let stage_start = Instant::now();
        let translation = self
            .translate_text(&transcript.text, from.code, to.code)
            .await
            .map_err(|e| e.at_stage(PipelineStage::Translation))?;
        timings.translation_ms = stage_start.elapsed().as_millis() as u64;

        let stage_start = Instant::now();
        let speech = self
            .synthesize(&translation.translated_text, to)
            .await
            .map_err(|e| e.at_stage(PipelineStage::Synthesis))?;
        timings.synthesis_ms = stage_start.elapsed().as_millis() as u64;

        let processing_time_ms = started.elapsed().as_millis() as u64;
        info!(
            from = from.code,
            to = to.code,
            transcription_ms = timings.transcription_ms,
            translation_ms = timings.translation_ms,
            synthesis_ms = timings.synthesis_ms,
            tts_provider = %speech.provider,
            "Voice translation completed"
        );

        Ok(VoiceTranslationResult {
            transcript: transcript.text,
            translated_text: translation.translated_text,
            source_language: from.code.to_string(),
            target_language: to.code.to_string(),
            confidence: translation.confidence,
            transcription_provider: transcriber.name().to_string(),
            translation_provider: translation.provider,
            from_cache: translation.from_cache,
            source_audio: audio.display().to_string(),
            audio: speech,
            timings,
            processing_time_ms,
            timestamp: Utc::now(),
        })
    }

    /// Text-to-speech on its own, with the same placeholder fallback as the voice pipeline.
    pub async fn synthesize_speech(&self, text: &str, language: &str) -> AppResult<SynthesizedAudio> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::ValidationError("Text is required".to_string()));
        }
        if text.chars().count() > MAX_SYNTHESIS_CHARS {
            return Err(AppError::ValidationError(format!(
                "Text too long (max {} characters)",
                MAX_SYNTHESIS_CHARS
            )));
        }
        let language = languages::resolve(language)?;
        self.synthesize(text, language).await
    }

    async fn synthesize(&self, text: &str, language: &'static Language) -> AppResult<SynthesizedAudio> {
        let voice = language.voice;
        let call = self.adapters.synthesizer.synthesize(text, language, voice);

        let reason = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(audio)) => return Ok(audio),
            Ok(Err(ProviderError::NotConfigured)) => PlaceholderReason::NotConfigured,
            Ok(Err(e)) => {
                warn!(error = %e, language = language.code, "Speech synthesis failed, using placeholder");
                PlaceholderReason::ProviderFailed
            }
            Err(_) => {
                warn!(language = language.code, "Speech synthesis timed out, using placeholder");
                PlaceholderReason::ProviderFailed
            }
        };

        self.placeholder.produce(text, language, voice, reason).await
    }

    /// Detect which supported language `text` is written in.
    ///
    /// Never fails for non-empty text: when the classifier is unavailable the
    /// character-set heuristic answers instead.
    pub async fn detect_language(&self, text: &str) -> AppResult<LanguageDetection> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AppError::ValidationError("Text is required".to_string()));
        }

        let candidates = languages::supported_codes();
        let classifier = &self.adapters.classifier;
        match self
            .bounded("language detection", classifier.classify(text, &candidates))
            .await
        {
            Ok(answer) => {
                let (code, confidence) = interpret_classification(&answer);
                debug!(answer = %answer, code = code, "Language classified");
                Ok(LanguageDetection {
                    code: code.to_string(),
                    confidence,
                    provider: classifier.name().to_string(),
                })
            }
            Err(e) => {
                debug!(error = %e, "Classifier unavailable, using charset heuristic");
                let code = languages::detect_by_charset(text);
                let confidence = if code == DEFAULT_LANGUAGE {
                    HEURISTIC_DEFAULT_CONFIDENCE
                } else {
                    HEURISTIC_CONFIDENCE
                };
                Ok(LanguageDetection {
                    code: code.to_string(),
                    confidence,
                    provider: "heuristic".to_string(),
                })
            }
        }
    }
}

/// Map a free-form classifier answer onto a supported code.
///
/// Exact code → high confidence; a code or language name somewhere in the answer →
/// lowered confidence; anything else → the default language with low confidence.
fn interpret_classification(answer: &str) -> (&'static str, f32) {
    let cleaned = answer.trim().trim_matches(|c: char| !c.is_alphanumeric());
    if let Some(lang) = languages::find(cleaned).filter(|lang| cleaned.len() == lang.code.len()) {
        return (lang.code, EXACT_MATCH_CONFIDENCE);
    }

    let upper = answer.to_uppercase();
    let tokens: Vec<&str> = upper
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .collect();

    for lang in languages::SUPPORTED_LANGUAGES {
        if tokens.contains(&lang.code) || upper.contains(&lang.name.to_uppercase()) {
            return (lang.code, PARTIAL_MATCH_CONFIDENCE);
        }
    }

    (DEFAULT_LANGUAGE, NO_MATCH_CONFIDENCE)
}
