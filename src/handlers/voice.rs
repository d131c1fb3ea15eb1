//! # Voice API Handlers
//!
//! Speech-to-speech translation and speech synthesis over HTTP.
//!
//! ## Available Endpoints:
//! - `POST /api/voice` - multipart upload (`audio`, `fromLang`, `toLang`), returns the
//!   transcript, its translation and a URL of the synthesized translation
//! - `POST /api/voice/tts` - synthesize speech for a text
//! - `GET /audio/{filename}` - serve a synthesized file

use crate::audio::{upload, validate_upload, TempAudioFile};
use crate::handlers::translation::{code_or, DEFAULT_SOURCE, DEFAULT_TARGET};
use crate::translation::languages::DEFAULT_LANGUAGE;
use crate::{error::AppError, state::AppState};
use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpResponse};
use futures_util::stream::StreamExt;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Fields collected from the voice upload form.
#[derive(Debug, Default)]
struct VoiceForm {
    audio: Option<Vec<u8>>,
    from: Option<String>,
    to: Option<String>,
}

async fn read_field(field: &mut Field, limit: usize) -> Result<Vec<u8>, AppError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| AppError::ValidationError(format!("Chunk error: {}", e)))?;
        if bytes.len() + chunk.len() > limit {
            return Err(AppError::ValidationError(format!(
                "Form field too large (max: {} bytes)",
                limit
            )));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

async fn read_voice_form(payload: &mut Multipart, max_upload_bytes: usize) -> Result<VoiceForm, AppError> {
    let mut form = VoiceForm::default();

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| AppError::ValidationError(format!("Multipart error: {}", e)))?;

        let field_name = field
            .content_disposition()
            .and_then(|cd| cd.get_name())
            .map(str::to_string)
            .ok_or_else(|| AppError::ValidationError("Missing field name".to_string()))?;

        match field_name.as_str() {
            "audio" => form.audio = Some(read_field(&mut field, max_upload_bytes).await?),
            "fromLang" | "from" => form.from = Some(read_text(&mut field).await?),
            "toLang" | "to" => form.to = Some(read_text(&mut field).await?),
            other => {
                debug!(field = other, "Ignoring unknown form field");
                read_field(&mut field, max_upload_bytes).await?;
            }
        }
    }

    Ok(form)
}

async fn read_text(field: &mut Field) -> Result<String, AppError> {
    let bytes = read_field(field, 64).await?;
    String::from_utf8(bytes).map_err(|_| AppError::ValidationError("Form field is not valid UTF-8".to_string()))
}

/// Speech-to-speech translation of an uploaded recording.
///
/// ## Endpoint: `POST /api/voice`
///
/// ## Response:
/// ```json
/// {
///   "status": "success",
///   "original_text": "Привет",
///   "translated_text": "Hallo",
///   "source_language": "RU",
///   "target_language": "DE",
///   "audioUrl": "/audio/tts_3f2a..._de.mp3",
///   "confidence": 0.95,
///   "providers": { "transcription": "openai-whisper", "translation": "openai", "synthesis": "openai-tts-1" },
///   "timings": { "transcription_ms": 800, "translation_ms": 400, "synthesis_ms": 600 },
///   "processing_time": 1800
/// }
/// ```
pub async fn translate_voice(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, AppError> {
    let audio_config = &state.config.audio;
    let form = read_voice_form(&mut payload, audio_config.max_upload_bytes).await?;

    let audio = form
        .audio
        .ok_or_else(|| AppError::ValidationError("No audio file provided".to_string()))?;
    let format = validate_upload(&audio, audio_config.max_upload_bytes)?;
    let input_duration = upload::wav_duration_secs(&audio);

    let from = code_or(form.from.as_deref(), DEFAULT_SOURCE);
    let to = code_or(form.to.as_deref(), DEFAULT_TARGET);

    info!(
        bytes = audio.len(),
        format = format.extension(),
        from = %from,
        to = %to,
        "Voice upload received"
    );

    let staged = TempAudioFile::stage(PathBuf::from(&audio_config.temp_dir), audio, format).await?;
    let result = state.orchestrator.translate_voice(staged.path(), &from, &to).await;
    drop(staged);
    let result = result?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "original_text": result.transcript,
        "translated_text": result.translated_text,
        "source_language": result.source_language,
        "target_language": result.target_language,
        "audioUrl": result.audio.audio_url,
        "duration": result.audio.duration_secs,
        "input_duration": input_duration,
        "confidence": result.confidence,
        "from_cache": result.from_cache,
        "providers": {
            "transcription": result.transcription_provider,
            "translation": result.translation_provider,
            "synthesis": result.audio.provider
        },
        "timings": result.timings,
        "processing_time": result.processing_time_ms,
        "timestamp": result.timestamp.to_rfc3339()
    })))
}

#[derive(Debug, Deserialize)]
pub struct SpeechRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// ## Endpoint: `POST /api/voice/tts`
///
/// Request `{"text": "Hallo", "language": "de"}`; the language defaults to English.
pub async fn synthesize_speech(
    state: web::Data<AppState>,
    request: web::Json<SpeechRequest>,
) -> Result<HttpResponse, AppError> {
    let text = request.text.as_deref().unwrap_or_default();
    let language = code_or(request.language.as_deref(), DEFAULT_LANGUAGE);

    let audio = state.orchestrator.synthesize_speech(text, &language).await?;

    Ok(HttpResponse::Ok().json(json!({
        "audioUrl": audio.audio_url,
        "text": text.trim(),
        "language": audio.language,
        "voice": audio.voice,
        "duration": audio.duration_secs,
        "provider": audio.provider
    })))
}

/// Synthesized files are flat names like `tts_<hex>_de.mp3`.
fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// ## Endpoint: `GET /audio/{filename}`
pub async fn serve_audio(
    state: web::Data<AppState>,
    filename: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let filename = filename.into_inner();
    if !is_safe_filename(&filename) {
        return Err(AppError::NotFound(format!("Audio file {}", filename)));
    }

    let path = Path::new(&state.config.audio.output_dir).join(&filename);
    let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(format!("Audio file {}", filename)));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(HttpResponse::Ok().content_type("audio/mpeg").body(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{state_with, FakeSetup};
    use crate::translation::providers::fakes::Behavior;
    use actix_web::{http::StatusCode, test, App};
    use serde_json::Value;

    const BOUNDARY: &str = "----voice-test-boundary";

    fn multipart_body(audio: Option<&[u8]>, from: &str, to: &str) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in [("fromLang", from), ("toLang", to)] {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                    BOUNDARY, name, value
                )
                .as_bytes(),
            );
        }
        if let Some(audio) = audio {
            body.extend_from_slice(
                format!(
                    "--{}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"clip.ogg\"\r\nContent-Type: audio/ogg\r\n\r\n",
                    BOUNDARY
                )
                .as_bytes(),
            );
            body.extend_from_slice(audio);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        body
    }

    fn voice_request(body: Vec<u8>) -> test::TestRequest {
        test::TestRequest::post()
            .uri("/api/voice")
            .insert_header((
                "content-type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            ))
            .set_payload(body)
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .app_data(crate::handlers::json_config())
                    .route("/api/voice", web::post().to(translate_voice))
                    .route("/api/voice/tts", web::post().to(synthesize_speech))
                    .route("/audio/{filename}", web::get().to(serve_audio)),
            )
            .await
        };
    }

    fn staged_files(dir: &Path) -> usize {
        std::fs::read_dir(dir).map(|entries| entries.count()).unwrap_or(0)
    }

    #[actix_web::test]
    async fn test_voice_pipeline() {
        let (state, dir) = state_with(FakeSetup::default());
        let app = app!(state);

        let body = multipart_body(Some(b"OggS fake audio"), "en", "de");
        let body: Value = test::call_and_read_body_json(&app, voice_request(body).to_request()).await;

        assert_eq!(body["status"], "success");
        assert_eq!(body["original_text"], "hello world");
        assert_eq!(body["translated_text"], "[DE] hello world");
        assert_eq!(body["target_language"], "DE");
        assert_eq!(body["providers"]["synthesis"], "fake-tts");
        assert_eq!(body["audioUrl"], "/audio/fake_de.mp3");
        assert_eq!(staged_files(&dir.path().join("tmp")), 0);
    }

    #[actix_web::test]
    async fn test_voice_rejects_bad_uploads() {
        let (state, _dir) = state_with(FakeSetup::default());
        let app = app!(state);

        let resp = test::call_service(&app, voice_request(multipart_body(None, "en", "de")).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = multipart_body(Some(b"definitely not audio"), "en", "de");
        let resp = test::call_service(&app, voice_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = multipart_body(Some(b"OggS fake audio"), "en", "xx");
        let resp = test::call_service(&app, voice_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["type"], "unsupported_language");
    }

    #[actix_web::test]
    async fn test_voice_no_speech_cleans_up() {
        let (state, dir) = state_with(FakeSetup {
            transcript: "   ",
            ..FakeSetup::default()
        });
        let app = app!(state);

        let body = multipart_body(Some(b"OggS fake audio"), "en", "de");
        let resp = test::call_service(&app, voice_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(staged_files(&dir.path().join("tmp")), 0);
    }

    #[actix_web::test]
    async fn test_voice_stage_failure() {
        let (state, _dir) = state_with(FakeSetup {
            transcription: Behavior::Fail,
            ..FakeSetup::default()
        });
        let app = app!(state);

        let body = multipart_body(Some(b"OggS fake audio"), "en", "de");
        let resp = test::call_service(&app, voice_request(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["stage"], "transcription");
    }

    #[actix_web::test]
    async fn test_tts_placeholder_is_served() {
        let (state, _dir) = state_with(FakeSetup {
            synthesis: Behavior::NotConfigured,
            ..FakeSetup::default()
        });
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/voice/tts")
            .set_json(json!({"text": "Hallo Welt", "language": "de"}))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["provider"], "mock-tts");
        assert_eq!(body["language"], "DE");
        assert_eq!(body["voice"], "onyx");

        let url = body["audioUrl"].as_str().unwrap().to_string();
        let resp = test::call_service(&app, test::TestRequest::get().uri(&url).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("content-type").unwrap(), "audio/mpeg");
        let bytes = test::read_body(resp).await;
        assert_eq!(bytes.len(), 16);
    }

    #[actix_web::test]
    async fn test_tts_requires_text() {
        let (state, _dir) = state_with(FakeSetup::default());
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/api/voice/tts")
            .set_json(json!({"language": "de"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_serve_audio_rejects_unknown_and_traversal() {
        let (state, _dir) = state_with(FakeSetup::default());
        let app = app!(state);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/audio/missing.mp3").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        assert!(!is_safe_filename(".."));
        assert!(!is_safe_filename("../secret.mp3"));
        assert!(!is_safe_filename("a/b.mp3"));
        assert!(is_safe_filename("tts_0af3_de.mp3"));
    }
}
