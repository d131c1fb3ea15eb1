//! HTTP handlers for the REST surface.

pub mod languages;
pub mod translation;
pub mod voice;

use crate::error::AppError;
use actix_web::web;

pub use languages::{detect_language, list_languages};
pub use translation::translate_text;
pub use voice::{serve_audio, synthesize_speech, translate_voice};

/// JSON extractor config that reports malformed bodies in the crate's error format.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::ValidationError(format!("Invalid JSON body: {}", err)).into()
    })
}
