//! Error Types for the Decilo API
//!
//! This module defines the error surface handed to callers:
//! - ApiError struct for structured error responses
//! - ErrorCode enum categorising errors, each with an HTTP status
//!
//! All errors serialise as JSON. Selection errors carry the offending
//! attribute and value in `details` so a UI can highlight the exact choice.

use decilo_core::{ConfigError, DeciloError, RecordStoreError, ResolutionError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;

// ============================================================================
// ERROR CODE ENUM
// ============================================================================

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // ========================================================================
    // Client Errors (400, 404, 422)
    // ========================================================================
    /// Selection names an attribute or value the product does not offer
    InvalidSelection,

    /// Request input is malformed
    InvalidInput,

    /// Requested product does not exist
    NotFound,

    /// Selection is valid but no single variant could be determined
    VariantNotResolved,

    // ========================================================================
    // Server Errors (500, 503, 504)
    // ========================================================================
    /// Record store unreachable
    ServiceUnavailable,

    /// Record store call timed out
    Timeout,

    /// Internal error, including record store faults
    InternalError,
}

impl ErrorCode {
    /// HTTP status code for this error code.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::InvalidSelection | ErrorCode::InvalidInput => 400,
            ErrorCode::NotFound => 404,
            ErrorCode::VariantNotResolved => 422,
            ErrorCode::ServiceUnavailable => 503,
            ErrorCode::Timeout => 504,
            ErrorCode::InternalError => 500,
        }
    }

    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidSelection => "Selected option is not available",
            ErrorCode::InvalidInput => "Invalid input data",
            ErrorCode::NotFound => "Product not found",
            ErrorCode::VariantNotResolved => {
                "Could not resolve product variant for the selected options"
            }
            ErrorCode::ServiceUnavailable => "Catalog service temporarily unavailable",
            ErrorCode::Timeout => "Catalog service timed out",
            ErrorCode::InternalError => "Internal server error",
        }
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status())
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

// ============================================================================
// API ERROR STRUCT
// ============================================================================

/// Structured error response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Additional structured context, e.g. `{"attribute": .., "value": ..}`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Create an error using the code's default message.
    pub fn from_code(code: ErrorCode) -> Self {
        Self::new(code, code.default_message())
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }

    // ========================================================================
    // Convenience constructors
    // ========================================================================

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    pub fn product_not_found(id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::NotFound, format!("Product {} not found", id))
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// CONVERSIONS FROM ENGINE ERRORS
// ============================================================================

impl From<ResolutionError> for ApiError {
    fn from(err: ResolutionError) -> Self {
        let message = err.to_string();
        match &err {
            ResolutionError::UnknownAttribute { attribute } => {
                Self::new(ErrorCode::InvalidSelection, message)
                    .with_details(json!({ "attribute": attribute, "value": null }))
            }
            ResolutionError::OptionNotAvailable { attribute, value } => {
                Self::new(ErrorCode::InvalidSelection, message)
                    .with_details(json!({ "attribute": attribute, "value": value }))
            }
            ResolutionError::NoMatchingVariant => Self::new(ErrorCode::VariantNotResolved, message),
            ResolutionError::AmbiguousSelection { candidates } => {
                let ids: Vec<i64> = candidates.iter().map(|id| id.raw()).collect();
                Self::new(ErrorCode::VariantNotResolved, message)
                    .with_details(json!({ "candidates": ids }))
            }
        }
    }
}

impl From<RecordStoreError> for ApiError {
    fn from(err: RecordStoreError) -> Self {
        match err {
            RecordStoreError::Transport { reason } => {
                tracing::warn!(reason = %reason, "Record store unreachable");
                Self::from_code(ErrorCode::ServiceUnavailable)
            }
            RecordStoreError::Timeout { after } => {
                tracing::warn!(after_secs = after.as_secs(), "Record store timed out");
                Self::from_code(ErrorCode::Timeout)
            }
            // Faults and decode failures are logged in full and reported generically.
            other => {
                tracing::error!(error = %other, "Record store failure");
                Self::from_code(ErrorCode::InternalError)
            }
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        Self::internal_error(err.to_string())
    }
}

impl From<DeciloError> for ApiError {
    fn from(err: DeciloError) -> Self {
        match err {
            DeciloError::Resolution(err) => err.into(),
            DeciloError::RecordStore(err) => err.into(),
            DeciloError::Config(err) => err.into(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal_error(format!("JSON serialization error: {}", err))
    }
}

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;
