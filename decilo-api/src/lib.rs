//! Decilo API - Portal Surface
//!
//! Everything a caller needs to put the variant engine in front of users:
//! environment configuration, tracing setup, serialisable request and
//! response payloads, the [`PortalApi`] service and the operator CLI.
//!
//! The engine itself lives in `decilo-variants`; this crate only wires it
//! up and translates its results and errors.

pub mod cli;
pub mod config;
pub mod error;
pub mod service;
pub mod state;
pub mod telemetry;
pub mod types;

pub use config::PortalConfig;
pub use error::{ApiError, ApiResult, ErrorCode};
pub use service::{parse_options, parse_size, PortalApi};
pub use state::AppState;
pub use telemetry::{init_tracing, TelemetryConfig, DEFAULT_LOG_FILTER};
pub use types::*;
