//! # Error Handling
//!
//! This module defines the error taxonomy shared by the HTTP handlers, the WebSocket
//! router and the translation pipeline, and how each error is turned into an HTTP
//! response.
//!
//! ## Error Categories:
//! - **User-correctable**: `ValidationError`, `UnsupportedLanguage`, `ProtocolError`
//! - **Pipeline outcomes**: `NoSpeechDetected`, `Pipeline` (a stage of the voice pipeline failed)
//! - **Upstream problems**: `UpstreamFailure`, `UpstreamTimeout`
//! - **Server-side problems**: `Internal`, `ConfigError`, `NotFound`
//!
//! ## Propagation rules:
//! Validation and protocol errors are reflected back to the caller that caused them.
//! Upstream errors on transcription and text translation propagate as failed operations,
//! never as a silently substituted result.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

/// Named stage of the voice translation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Transcription,
    Translation,
    Synthesis,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Transcription => "transcription",
            PipelineStage::Translation => "translation",
            PipelineStage::Synthesis => "synthesis",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Custom error types for the application.
///
/// ## Usage Example:
/// ```rust,ignore
/// return Err(AppError::ValidationError("Text is required".to_string()));
/// ```
#[derive(Debug)]
pub enum AppError {
    /// Internal server errors (I/O failures, poisoned state, etc.)
    Internal(String),

    /// Configuration file or environment variable problems
    ConfigError(String),

    /// Requested resource was not found
    NotFound(String),

    /// Missing or malformed required fields
    ValidationError(String),

    /// Language code outside the supported set
    UnsupportedLanguage(String),

    /// Speech-to-text produced an empty transcript
    NoSpeechDetected,

    /// An upstream adapter call errored or returned a malformed response
    UpstreamFailure(String),

    /// An upstream adapter call exceeded its time budget
    UpstreamTimeout(String),

    /// Unparseable message on the connection channel
    ProtocolError(String),

    /// A voice pipeline stage failed; the pipeline was aborted
    Pipeline {
        stage: PipelineStage,
        source: Box<AppError>,
    },
}

impl AppError {
    /// Wrap this error with the pipeline stage that produced it.
    pub fn at_stage(self, stage: PipelineStage) -> Self {
        AppError::Pipeline {
            stage,
            source: Box::new(self),
        }
    }

    /// Machine-readable error type used in JSON bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Internal(_) => "internal_error",
            AppError::ConfigError(_) => "config_error",
            AppError::NotFound(_) => "not_found",
            AppError::ValidationError(_) => "validation_error",
            AppError::UnsupportedLanguage(_) => "unsupported_language",
            AppError::NoSpeechDetected => "no_speech_detected",
            AppError::UpstreamFailure(_) => "upstream_failure",
            AppError::UpstreamTimeout(_) => "upstream_timeout",
            AppError::ProtocolError(_) => "protocol_error",
            AppError::Pipeline { source, .. } => source.kind(),
        }
    }

    /// The innermost error, looking through pipeline wrappers.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::Pipeline { source, .. } => source.root(),
            other => other,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ValidationError(msg) => write!(f, "{}", msg),
            AppError::UnsupportedLanguage(code) => write!(f, "Unsupported language: {}", code),
            AppError::NoSpeechDetected => write!(f, "No speech detected in audio"),
            AppError::UpstreamFailure(msg) => write!(f, "Upstream provider failed: {}", msg),
            AppError::UpstreamTimeout(msg) => write!(f, "Upstream provider timed out: {}", msg),
            AppError::ProtocolError(msg) => write!(f, "Protocol error: {}", msg),
            AppError::Pipeline { stage, source } => write!(f, "{} stage failed: {}", stage, source),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Pipeline { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

/// Converts errors into HTTP responses.
///
/// ## HTTP Status Code Mapping:
/// - ValidationError/UnsupportedLanguage/ProtocolError → 400
/// - NotFound → 404
/// - NoSpeechDetected → 422
/// - UpstreamFailure → 502, UpstreamTimeout → 504
/// - Internal/ConfigError → 500
/// - Pipeline → status of the wrapped error
///
/// ## JSON Response Format:
/// ```json
/// {
///   "error": {
///     "type": "unsupported_language",
///     "message": "Unsupported language: XX",
///     "timestamp": "2025-01-01T12:00:00Z"
///   }
/// }
/// ```
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Internal(_) | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_)
            | AppError::UnsupportedLanguage(_)
            | AppError::ProtocolError(_) => StatusCode::BAD_REQUEST,
            AppError::NoSpeechDetected => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            AppError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::Pipeline { source, .. } => source.status_code(),
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut body = json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
                "timestamp": chrono::Utc::now().to_rfc3339()
            }
        });

        if let AppError::Pipeline { stage, .. } = self {
            body["error"]["stage"] = json!(stage.as_str());
        }

        HttpResponse::build(self.status_code()).json(body)
    }
}

/// Automatic conversion from anyhow::Error to AppError.
///
/// ## Usage:
/// When you use `?` with an anyhow::Error, it automatically becomes an AppError::Internal.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// JSON parsing errors are almost always caused by the client, so they map to a
/// validation error (400) rather than an internal error (500).
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::ValidationError(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(format!("I/O error: {}", err))
    }
}

/// Type alias for Results that use our custom error type.
pub type AppResult<T> = Result<T, AppError>;
