//! Error taxonomy.
//!
//! - `InvalidRequest`: bad user input, rejected before any service call.
//! - `ServiceError`: failures reported by the generative service.
//! - `ConfigError`: startup configuration problems (missing credential is fatal).
//! - `AppError`: what HTTP handlers return; maps the above onto status codes.
//!
//! A failed validation is not an error at all: it is a `ValidationReport`
//! with `passed = false`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvalidRequest {
    #[error("topic must not be empty")]
    EmptyTopic,

    #[error("topic is too long ({len} characters, max {max})")]
    TopicTooLong { len: usize, max: usize },

    #[error("question count must be between {min} and {max}, got {got}")]
    CountOutOfRange { got: i64, min: u32, max: u32 },
}

/// Failures of the external generative service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServiceError {
    #[error("authentication failed: {message}")]
    Auth { message: String },

    #[error("rate limited: {message}")]
    RateLimit { message: String },

    #[error("request timed out: {message}")]
    Timeout { message: String },

    #[error("upstream failure: {message}")]
    Upstream { message: String },
}

impl ServiceError {
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth { message: message.into() }
    }

    pub fn rate_limit(message: impl Into<String>) -> Self {
        Self::RateLimit { message: message.into() }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout { message: message.into() }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream { message: message.into() }
    }

    /// Short machine-readable kind, used in logs and API error bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "auth",
            Self::RateLimit { .. } => "rate_limit",
            Self::Timeout { .. } => "timeout",
            Self::Upstream { .. } => "upstream",
        }
    }

    /// Same kind, different message.
    pub fn with_message(self, message: impl Into<String>) -> Self {
        let message = message.into();
        match self {
            Self::Auth { .. } => Self::Auth { message },
            Self::RateLimit { .. } => Self::RateLimit { message },
            Self::Timeout { .. } => Self::Timeout { message },
            Self::Upstream { .. } => Self::Upstream { message },
        }
    }

    pub fn retry_hint(&self) -> &'static str {
        match self {
            Self::Auth { .. } => "Check that GEMINI_API_KEY is valid, then try again.",
            Self::RateLimit { .. } => "The service is rate limiting requests. Wait a minute and try again.",
            Self::Timeout { .. } => "The service took too long. Try again, or ask for fewer questions.",
            Self::Upstream { .. } => "The service failed to answer. Try again in a moment.",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not found in environment variables")]
    MissingCredential(&'static str),

    #[error("invalid value for {var}: {message}")]
    InvalidEnv { var: &'static str, message: String },

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Error type returned by HTTP handlers.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    InvalidRequest(#[from] InvalidRequest),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("not found: {0}")]
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, retry_hint) = match &self {
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request", None),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", None),
            AppError::Service(e) => {
                tracing::error!(target: "questgen_backend", kind = e.kind(), error = %e, "Generative service error");
                let status = match e {
                    ServiceError::RateLimit { .. } => StatusCode::TOO_MANY_REQUESTS,
                    ServiceError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                    ServiceError::Auth { .. } | ServiceError::Upstream { .. } => StatusCode::BAD_GATEWAY,
                };
                (status, e.kind(), Some(e.retry_hint()))
            }
        };
        let body = Json(json!({
            "error": self.to_string(),
            "kind": kind,
            "retryHint": retry_hint,
        }));
        (status, body).into_response()
    }
}
