//! # Error Handling
//!
//! Application-level error type and its HTTP representation.
//!
//! ## Two layers:
//! - `ExtractError` (in `extraction::error`) classifies what went wrong while
//!   rendering and reading a recording page
//! - `AppError` (here) is what handlers return; actix turns it into a response
//!   through the `ResponseError` trait
//!
//! ## Failure envelope:
//! Every error response has the same JSON shape:
//! ```json
//! {
//!   "success": false,
//!   "error": "Access to this call recording has expired",
//!   "error_type": "expired",
//!   "url": "https://app.gong.io/call?id=42",
//!   "timestamp": "2025-01-01T12:00:00Z"
//! }
//! ```
//! Raw browser and DOM errors are logged where they happen and never leak
//! into this envelope.

use crate::extraction::ExtractError;
use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    /// Unexpected server-side failure
    Internal(String),

    /// Client sent invalid or malformed data
    BadRequest(String),

    /// The `url` query parameter is absent or blank
    MissingUrl,

    /// The URL does not look like a recording link
    UnsupportedUrl { url: String, marker: String },

    /// Configuration file or environment variable problems
    ConfigError(String),

    /// User input failed validation rules
    ValidationError(String),

    /// The extraction pipeline failed for `url`
    Extraction { url: String, error: ExtractError },
}

impl AppError {
    pub fn extraction(url: impl Into<String>, error: ExtractError) -> Self {
        AppError::Extraction {
            url: url.into(),
            error,
        }
    }

    /// Machine-readable error type used in the envelope and in metrics.
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Internal(_) => "internal_error",
            AppError::BadRequest(_) => "bad_request",
            AppError::MissingUrl => "missing_url",
            AppError::UnsupportedUrl { .. } => "unsupported_url",
            AppError::ConfigError(_) => "config_error",
            AppError::ValidationError(_) => "validation_error",
            AppError::Extraction { error, .. } => error.kind(),
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            AppError::UnsupportedUrl { url, .. } | AppError::Extraction { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Message returned to the client.
    fn public_message(&self) -> String {
        match self {
            AppError::MissingUrl => "No URL provided".to_string(),
            AppError::UnsupportedUrl { marker, .. } => {
                format!("URL must be a call recording link containing '{}'", marker)
            }
            AppError::Extraction { error, .. } => match error {
                ExtractError::Expired | ExtractError::NoBlocksFound => {
                    "Access to this call recording has expired".to_string()
                }
                ExtractError::Invalid => "URL does not point to a valid call recording".to_string(),
                ExtractError::TimedOut(_) => "Transcript did not load in time".to_string(),
                ExtractError::BrowserInitFailure(_) => "Could not start a browser session".to_string(),
                ExtractError::InvalidSelector(_) => "Internal configuration error".to_string(),
            },
            AppError::Internal(msg)
            | AppError::BadRequest(msg)
            | AppError::ConfigError(msg)
            | AppError::ValidationError(msg) => msg.clone(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::MissingUrl => write!(f, "Bad request: no URL provided"),
            AppError::UnsupportedUrl { url, marker } => {
                write!(f, "Bad request: {} does not contain '{}'", url, marker)
            }
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::Extraction { url, error } => write!(f, "Extraction failed for {}: {}", url, error),
        }
    }
}

/// Status code mapping:
/// - MissingUrl/UnsupportedUrl/BadRequest/ValidationError → 400
/// - Expired/NoBlocksFound → 410, Invalid → 404
/// - TimedOut → 504, BrowserInitFailure → 503
/// - Internal/ConfigError/InvalidSelector → 500
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_)
            | AppError::MissingUrl
            | AppError::UnsupportedUrl { .. }
            | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Extraction { error, .. } => match error {
                ExtractError::Expired | ExtractError::NoBlocksFound => StatusCode::GONE,
                ExtractError::Invalid => StatusCode::NOT_FOUND,
                ExtractError::TimedOut(_) => StatusCode::GATEWAY_TIMEOUT,
                ExtractError::BrowserInitFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
                ExtractError::InvalidSelector(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": self.public_message(),
            "error_type": self.error_type(),
            "url": self.url(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        }))
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Malformed JSON in a request body is the client's fault.
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::BadRequest(format!("JSON parsing error: {}", err))
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
