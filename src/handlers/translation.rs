//! # Text Translation API
//!
//! ## Endpoint: `POST /api/translation`
//!
//! ## Request Body:
//! ```json
//! { "text": "Привет", "source_language": "RU", "target_language": "DE" }
//! ```
//! `fromLang`/`from` and `toLang`/`to` are accepted as aliases; codes are
//! case-insensitive and default to RU → DE.
//!
//! ## Response:
//! ```json
//! {
//!   "status": "success",
//!   "original_text": "Привет",
//!   "translated_text": "Hallo",
//!   "source_language": "ru",
//!   "target_language": "de",
//!   "confidence": 0.95,
//!   "timestamp": "2024-01-01T00:00:00Z",
//!   "processing_time": 412,
//!   "provider": "openai",
//!   "from_cache": false
//! }
//! ```

use crate::{error::AppError, state::AppState};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

pub const DEFAULT_SOURCE: &str = "RU";
pub const DEFAULT_TARGET: &str = "DE";

#[derive(Debug, Deserialize)]
pub struct TranslationRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default, alias = "fromLang", alias = "from")]
    pub source_language: Option<String>,
    #[serde(default, alias = "toLang", alias = "to")]
    pub target_language: Option<String>,
}

/// Language code from a request field, falling back when absent or blank.
pub(crate) fn code_or(value: Option<&str>, fallback: &'static str) -> String {
    match value.map(str::trim) {
        Some(code) if !code.is_empty() => code.to_string(),
        _ => fallback.to_string(),
    }
}

pub async fn translate_text(
    state: web::Data<AppState>,
    request: web::Json<TranslationRequest>,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();

    let text = request.text.as_deref().unwrap_or_default();
    if text.trim().is_empty() {
        return Err(AppError::ValidationError("Text is required".to_string()));
    }
    let from = code_or(request.source_language.as_deref(), DEFAULT_SOURCE);
    let to = code_or(request.target_language.as_deref(), DEFAULT_TARGET);

    let result = state.orchestrator.translate_text(text, &from, &to).await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "original_text": result.original_text,
        "translated_text": result.translated_text,
        "source_language": result.source_language.to_lowercase(),
        "target_language": result.target_language.to_lowercase(),
        "confidence": result.confidence,
        "timestamp": result.timestamp.to_rfc3339(),
        "processing_time": result.processing_time_ms,
        "provider": result.provider,
        "from_cache": result.from_cache
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::{state_with, FakeSetup};
    use crate::translation::providers::fakes::Behavior;
    use actix_web::{http::StatusCode, test as actix_test, App};
    use serde_json::Value;

    macro_rules! app {
        ($state:expr) => {
            actix_test::init_service(
                App::new()
                    .app_data(web::Data::new($state))
                    .app_data(crate::handlers::json_config())
                    .route("/api/translation", web::post().to(translate_text)),
            )
            .await
        };
    }

    #[test]
    fn test_request_aliases() {
        let request: TranslationRequest =
            serde_json::from_str(r#"{"text": "hi", "fromLang": "en", "to": "de"}"#).unwrap();
        assert_eq!(request.source_language.as_deref(), Some("en"));
        assert_eq!(request.target_language.as_deref(), Some("de"));

        assert_eq!(code_or(None, DEFAULT_SOURCE), "RU");
        assert_eq!(code_or(Some("  "), DEFAULT_TARGET), "DE");
    }

    #[actix_web::test]
    async fn test_translate_defaults_and_cache() {
        let (state, _dir) = state_with(FakeSetup::default());
        let app = app!(state);

        let req = actix_test::TestRequest::post()
            .uri("/api/translation")
            .set_json(json!({"text": "привет"}))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["status"], "success");
        assert_eq!(body["translated_text"], "[DE] привет");
        assert_eq!(body["source_language"], "ru");
        assert_eq!(body["target_language"], "de");
        assert_eq!(body["from_cache"], false);

        let req = actix_test::TestRequest::post()
            .uri("/api/translation")
            .set_json(json!({"text": "привет", "from": "ru", "toLang": "DE"}))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["from_cache"], true);
    }

    #[actix_web::test]
    async fn test_same_language_is_identity() {
        let (state, _dir) = state_with(FakeSetup::default());
        let app = app!(state);

        let req = actix_test::TestRequest::post()
            .uri("/api/translation")
            .set_json(json!({"text": "hello", "source_language": "en", "target_language": "EN"}))
            .to_request();
        let body: Value = actix_test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["translated_text"], "hello");
        assert_eq!(body["confidence"], 1.0);
        assert_eq!(body["provider"], "same-language");
    }

    #[actix_web::test]
    async fn test_translate_errors() {
        let (state, _dir) = state_with(FakeSetup {
            translation: Behavior::Fail,
            ..FakeSetup::default()
        });
        let app = app!(state);

        let req = actix_test::TestRequest::post()
            .uri("/api/translation")
            .set_json(json!({"text": "  "}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["error"]["type"], "validation_error");

        let req = actix_test::TestRequest::post()
            .uri("/api/translation")
            .set_json(json!({"text": "hi", "to": "XX"}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = actix_test::TestRequest::post()
            .uri("/api/translation")
            .set_json(json!({"text": "hi", "from": "en", "to": "de"}))
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[actix_web::test]
    async fn test_malformed_body_is_validation_error() {
        let (state, _dir) = state_with(FakeSetup::default());
        let app = app!(state);

        let req = actix_test::TestRequest::post()
            .uri("/api/translation")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
            .to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["error"]["type"], "validation_error");
    }
}
