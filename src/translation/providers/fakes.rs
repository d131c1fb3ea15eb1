//! In-memory adapters for tests. No network, call counts recorded.

use super::{
    LanguageClassifier, ProviderError, SpeechSynthesizer, SpeechToText, TextTranslator, Transcript,
    Translated,
};
use crate::translation::languages::Language;
use crate::translation::types::SynthesizedAudio;
use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// How a fake adapter answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    NotConfigured,
    /// Never answers within any reasonable timeout
    Hang,
}

impl Behavior {
    async fn apply(&self) -> Result<(), ProviderError> {
        match self {
            Behavior::Succeed => Ok(()),
            Behavior::Fail => Err(ProviderError::Status {
                status: 500,
                body: "fake failure".into(),
            }),
            Behavior::NotConfigured => Err(ProviderError::NotConfigured),
            Behavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }
}

pub struct FakeSpeechToText {
    pub transcript: String,
    pub behavior: Behavior,
    pub calls: AtomicUsize,
}

impl FakeSpeechToText {
    pub fn new(transcript: &str, behavior: Behavior) -> Self {
        Self {
            transcript: transcript.to_string(),
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechToText for FakeSpeechToText {
    fn name(&self) -> &str {
        "fake-stt"
    }

    async fn transcribe(&self, _audio: &Path, hint: &Language) -> Result<Transcript, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.behavior.apply().await?;
        Ok(Transcript {
            text: self.transcript.clone(),
            language: Some(hint.code.to_string()),
            confidence: 0.9,
        })
    }
}

/// Translates by prefixing the target code: `hello` → `[DE] hello`.
pub struct FakeTranslator {
    pub behavior: Behavior,
    pub calls: AtomicUsize,
}

impl FakeTranslator {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextTranslator for FakeTranslator {
    fn name(&self) -> &str {
        "fake-mt"
    }

    async fn translate(
        &self,
        text: &str,
        _from: &Language,
        to: &Language,
    ) -> Result<Translated, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.behavior.apply().await?;
        Ok(Translated {
            text: format!("[{}] {}", to.code, text),
            confidence: 0.95,
        })
    }
}

/// Returns an artifact description without touching the filesystem.
pub struct FakeSynthesizer {
    pub behavior: Behavior,
    pub calls: AtomicUsize,
}

impl FakeSynthesizer {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    fn name(&self) -> &str {
        "fake-tts"
    }

    async fn synthesize(
        &self,
        text: &str,
        language: &Language,
        voice: &str,
    ) -> Result<SynthesizedAudio, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.behavior.apply().await?;
        Ok(SynthesizedAudio {
            audio_path: format!("/tmp/fake_{}.mp3", language.code.to_lowercase()),
            audio_url: format!("/audio/fake_{}.mp3", language.code.to_lowercase()),
            language: language.code.to_string(),
            voice: voice.to_string(),
            duration_secs: 1,
            file_size: text.len(),
            provider: "fake-tts".to_string(),
        })
    }
}

/// Answers with a fixed string.
pub struct FakeClassifier {
    pub answer: String,
    pub behavior: Behavior,
}

impl FakeClassifier {
    pub fn new(answer: &str, behavior: Behavior) -> Self {
        Self {
            answer: answer.to_string(),
            behavior,
        }
    }
}

#[async_trait]
impl LanguageClassifier for FakeClassifier {
    fn name(&self) -> &str {
        "fake-classifier"
    }

    async fn classify(&self, _text: &str, _candidates: &[&str]) -> Result<String, ProviderError> {
        self.behavior.apply().await?;
        Ok(self.answer.clone())
    }
}
