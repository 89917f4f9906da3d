use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::config::Config;

/// Raised by clients before any network call when a required credential or
/// identifier is absent. Carried inside `anyhow` chains so route handlers
/// can tell it apart from genuine upstream failures.
#[derive(Debug, Error)]
#[error("missing configuration: {0}")]
pub struct MissingConfig(pub &'static str);

/// Route-level error taxonomy: configuration errors, upstream failures and
/// validation errors, each with its own status class.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("configuration error")]
    Config { detail: Option<String> },

    #[error("upstream failure")]
    Upstream { detail: Option<String> },

    #[error("{0}")]
    Validation(String),

    #[error("unauthorized")]
    Unauthorized,
}

impl ApiError {
    /// A required credential/id is missing. Detail is only surfaced outside
    /// of production; always logged server-side.
    pub fn config(config: &Config, name: &'static str) -> Self {
        log::error!("missing configuration: {}", name);

        ApiError::Config {
            detail: (!config.is_production()).then(|| format!("missing configuration: {}", name)),
        }
    }

    /// An external service failed or was unreachable. The underlying message
    /// is logged and only exposed in non-production environments.
    pub fn upstream(config: &Config, err: anyhow::Error) -> Self {
        log::error!("upstream failure: {:#}", err);

        ApiError::Upstream {
            detail: (!config.is_production()).then(|| err.to_string()),
        }
    }

    /// Classify an error bubbling out of the content store client: a
    /// `MissingConfig` in the chain is a configuration error, anything else
    /// an upstream failure.
    pub fn from_store(config: &Config, err: anyhow::Error) -> Self {
        match err.downcast::<MissingConfig>() {
            Ok(missing) => ApiError::config(config, missing.0),
            Err(err) => ApiError::upstream(config, err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Config { detail } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail.unwrap_or_else(|| "server configuration error".to_string()),
            ),
            ApiError::Upstream { detail } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                detail.unwrap_or_else(|| "upstream service failure".to_string()),
            ),
            ApiError::Validation(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
