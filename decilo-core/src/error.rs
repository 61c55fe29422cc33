//! Error types for Decilo operations

use crate::identity::VariantId;
use std::time::Duration;
use thiserror::Error;

/// Record store errors.
///
/// Everything here is an infrastructure fault: the engine never retries,
/// it propagates these to the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordStoreError {
    #[error("Record store unreachable: {reason}")]
    Transport { reason: String },

    #[error("Record store call timed out after {after:?}")]
    Timeout { after: Duration },

    #[error("Record store authentication failed")]
    AuthenticationFailed,

    #[error("Record store fault on {collection}.{method}: {message}")]
    Fault {
        collection: String,
        method: String,
        message: String,
    },

    #[error("Could not decode field {field} of {collection}: {reason}")]
    Decode {
        collection: String,
        field: String,
        reason: String,
    },
}

/// Selection and resolution failures.
///
/// These describe bad user input or inconsistent catalog data. They are
/// reported verbatim and never retried.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Unknown attribute: {attribute}")]
    UnknownAttribute { attribute: String },

    #[error("Option '{attribute}: {value}' not available for this product")]
    OptionNotAvailable { attribute: String, value: String },

    #[error("Could not resolve product variant for the selected options")]
    NoMatchingVariant,

    #[error("Selected options match {} product variants", candidates.len())]
    AmbiguousSelection { candidates: Vec<VariantId> },
}

impl ResolutionError {
    /// The selection itself named something the template does not offer.
    pub fn is_unresolvable_selection(&self) -> bool {
        matches!(
            self,
            Self::UnknownAttribute { .. } | Self::OptionNotAvailable { .. }
        )
    }

    /// The offending `(attribute, value)` pair, when there is one.
    pub fn offending_option(&self) -> Option<(&str, Option<&str>)> {
        match self {
            Self::UnknownAttribute { attribute } => Some((attribute.as_str(), None)),
            Self::OptionNotAvailable { attribute, value } => {
                Some((attribute.as_str(), Some(value.as_str())))
            }
            _ => None,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all Decilo errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeciloError {
    #[error("Record store error: {0}")]
    RecordStore(#[from] RecordStoreError),

    #[error("{0}")]
    Resolution(#[from] ResolutionError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl DeciloError {
    /// Errors caused by the request rather than the system.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Resolution(_))
    }

    /// Errors that may succeed if the same request is made later.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RecordStore(RecordStoreError::Transport { .. })
                | Self::RecordStore(RecordStoreError::Timeout { .. })
        )
    }
}

/// Result type alias for Decilo operations.
pub type DeciloResult<T> = Result<T, DeciloError>;

// =============================================================================
// TESTS
// =============================================================================
