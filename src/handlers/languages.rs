//! Language listing and detection endpoints.
//!
//! - `GET /api/languages` - supported languages
//! - `POST /api/languages/detect` - classify the language of a text

use crate::{error::AppError, state::AppState};
use crate::translation::languages::SUPPORTED_LANGUAGES;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    #[serde(default)]
    pub text: Option<String>,
}

pub async fn list_languages() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "success",
        "count": SUPPORTED_LANGUAGES.len(),
        "languages": SUPPORTED_LANGUAGES,
        "service": "DashkaChat"
    }))
}

pub async fn detect_language(
    state: web::Data<AppState>,
    request: web::Json<DetectRequest>,
) -> Result<HttpResponse, AppError> {
    let text = request.text.as_deref().unwrap_or_default();
    let detection = state.orchestrator.detect_language(text).await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "detected_language": detection.code,
        "confidence": detection.confidence,
        "provider": detection.provider
    })))
}
