//! # OpenAI Adapter
//!
//! One HTTP client implementing all four upstream capabilities against the OpenAI
//! REST API:
//! - **Translation / classification**: `POST /chat/completions` at temperature 0
//! - **Transcription**: `POST /audio/transcriptions` (multipart upload)
//! - **Speech**: `POST /audio/speech`, MP3 written to the output directory
//!
//! Without an API key every call fails fast with [`ProviderError::NotConfigured`].

use super::{
    artifact_location, classification_instruction, estimate_speech_secs, translation_instruction,
    LanguageClassifier, ProviderError, SpeechSynthesizer, SpeechToText, TextTranslator,
    Transcript, Translated,
};
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::translation::languages::Language;
use crate::translation::types::SynthesizedAudio;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Confidence attached to chat-completion translations (the API reports none).
const TRANSLATION_CONFIDENCE: f32 = 0.95;

/// Confidence attached to transcriptions (the API reports none).
const TRANSCRIPTION_CONFIDENCE: f32 = 0.9;

pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    translation_model: String,
    transcription_model: String,
    tts_model: String,
    output_dir: PathBuf,
    public_url_prefix: String,
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("translation_model", &self.translation_model)
            .field("transcription_model", &self.transcription_model)
            .field("tts_model", &self.tts_model)
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        let providers = &config.providers;
        Ok(Self {
            http,
            api_key: providers.openai_api_key.trim().to_string(),
            base_url: providers.openai_base_url.trim_end_matches('/').to_string(),
            translation_model: providers.translation_model.clone(),
            transcription_model: providers.transcription_model.clone(),
            tts_model: providers.tts_model.clone(),
            output_dir: PathBuf::from(&config.audio.output_dir),
            public_url_prefix: config.audio.public_url_prefix.clone(),
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn credentials(&self) -> Result<&str, ProviderError> {
        if self.is_configured() {
            Ok(&self.api_key)
        } else {
            Err(ProviderError::NotConfigured)
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Turn a non-success status into `ProviderError::Status` with the body attached.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ProviderError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Single-turn chat completion; returns the trimmed assistant message.
    async fn chat(&self, system: &str, user: &str) -> Result<String, ProviderError> {
        let key = self.credentials()?;

        let body = json!({
            "model": self.translation_model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user }
            ]
        });

        let response = self
            .http
            .post(self.endpoint("chat/completions"))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;
        let json: Value = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|content| content.trim().to_string())
            .ok_or_else(|| ProviderError::InvalidResponse("no message content in response".into()))
    }
}

fn audio_mime(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("mp3") => "audio/mpeg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        Some("webm") => "audio/webm",
        Some("ogg") => "audio/ogg",
        _ => "audio/wav",
    }
}

#[async_trait]
impl TextTranslator for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn translate(
        &self,
        text: &str,
        from: &Language,
        to: &Language,
    ) -> Result<Translated, ProviderError> {
        debug!(model = %self.translation_model, from = from.code, to = to.code, "Translation request");

        let translated = self.chat(&translation_instruction(from, to), text).await?;
        if translated.is_empty() {
            return Err(ProviderError::InvalidResponse("empty translation".into()));
        }

        Ok(Translated {
            text: translated,
            confidence: TRANSLATION_CONFIDENCE,
        })
    }
}

#[async_trait]
impl LanguageClassifier for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn classify(&self, text: &str, candidates: &[&str]) -> Result<String, ProviderError> {
        self.chat(&classification_instruction(candidates), text).await
    }
}

#[async_trait]
impl SpeechToText for OpenAiProvider {
    fn name(&self) -> &str {
        "openai-whisper"
    }

    async fn transcribe(&self, audio: &Path, hint: &Language) -> Result<Transcript, ProviderError> {
        let key = self.credentials()?;

        let bytes = tokio::fs::read(audio)
            .await
            .map_err(|e| ProviderError::Request(format!("cannot read audio: {}", e)))?;
        let filename = audio
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        debug!(model = %self.transcription_model, size = bytes.len(), file = %filename, "Transcription request");

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str(audio_mime(audio))
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.transcription_model.clone())
            .text("language", hint.code.to_lowercase())
            .text("response_format", "json");

        let response = self
            .http
            .post(self.endpoint("audio/transcriptions"))
            .bearer_auth(key)
            .multipart(form)
            .send()
            .await?;
        let json: Value = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let text = json["text"]
            .as_str()
            .ok_or_else(|| ProviderError::InvalidResponse("no 'text' field in response".into()))?;

        Ok(Transcript {
            text: text.trim().to_string(),
            language: json["language"].as_str().map(str::to_string),
            confidence: TRANSCRIPTION_CONFIDENCE,
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiProvider {
    fn name(&self) -> &str {
        "openai-tts"
    }

    async fn synthesize(
        &self,
        text: &str,
        language: &Language,
        voice: &str,
    ) -> Result<SynthesizedAudio, ProviderError> {
        let key = self.credentials()?;

        let body = json!({
            "model": self.tts_model,
            "voice": voice,
            "input": text,
            "response_format": "mp3"
        });

        let response = self
            .http
            .post(self.endpoint("audio/speech"))
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;
        let audio = Self::check_status(response).await?.bytes().await?;

        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| ProviderError::Request(format!("cannot create output dir: {}", e)))?;
        let (path, url) = artifact_location(&self.output_dir, &self.public_url_prefix, language);
        tokio::fs::write(&path, &audio)
            .await
            .map_err(|e| ProviderError::Request(format!("cannot write audio: {}", e)))?;

        info!(file = %path.display(), bytes = audio.len(), voice = voice, "Speech synthesized");

        Ok(SynthesizedAudio {
            audio_path: path.to_string_lossy().into_owned(),
            audio_url: url,
            language: language.code.to_string(),
            voice: voice.to_string(),
            duration_secs: estimate_speech_secs(text),
            file_size: audio.len(),
            provider: format!("openai-{}", self.tts_model),
        })
    }
}
