//! Error types for the client library.
//!
//! Failed calls surface in one of two shapes:
//!
//! - [`ClientError::Api`]: a response arrived with a non-2xx status and was
//!   classified into an [`ApiError`]. These are terminal for the call.
//! - every other [`ClientError`] variant: the call never produced a response
//!   (transport faults, after the retry budget is spent) or the request could
//!   not be built in the first place.

use serde_json::Value;
use thiserror::Error;

/// Message used when an error body carries neither `error` nor `message`.
pub const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Classification of an unsuccessful HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// HTTP 401: the credential is missing, invalid or expired.
    Authentication,
    /// HTTP 404: the resource does not exist.
    NotFound,
    /// HTTP 422: the payload was malformed or rejected.
    Validation,
    /// Any other non-2xx status, including 5xx and unmapped 4xx.
    Generic,
}

impl ApiErrorKind {
    /// Maps a status code to its kind. Total over all codes.
    #[must_use]
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 => Self::Authentication,
            404 => Self::NotFound,
            422 => Self::Validation,
            _ => Self::Generic,
        }
    }
}

/// A classified API failure.
///
/// Carries the original status and the upstream payload so callers can
/// inspect provider-specific details.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind:?} error (HTTP {status}): {message}")]
pub struct ApiError {
    /// The classification.
    pub kind: ApiErrorKind,
    /// The HTTP status code of the response.
    pub status: u16,
    /// Human-readable message extracted from the payload.
    pub message: String,
    /// The decoded error body, if it was JSON.
    pub raw_payload: Option<Value>,
}

impl ApiError {
    /// Machine-readable error code from the payload's `code` field.
    #[must_use]
    pub fn code(&self) -> Option<&Value> {
        self.raw_payload.as_ref().and_then(|payload| payload.get("code"))
    }

    /// Structured details from the payload's `details` field.
    #[must_use]
    pub fn details(&self) -> Option<&Value> {
        self.raw_payload
            .as_ref()
            .and_then(|payload| payload.get("details"))
    }
}

/// Classifies an unsuccessful response.
///
/// The message is taken from the body's `error` field, then `message`, then
/// falls back to [`UNKNOWN_ERROR_MESSAGE`]. Every status yields exactly one
/// [`ApiError`].
///
/// # Examples
///
/// ```
/// use borderless_client::error::{classify, ApiErrorKind};
/// use serde_json::json;
///
/// let error = classify(404, Some(json!({"message": "not found"})));
/// assert_eq!(error.kind, ApiErrorKind::NotFound);
/// assert_eq!(error.message, "not found");
/// assert_eq!(error.status, 404);
/// ```
#[must_use]
pub fn classify(status: u16, body: Option<Value>) -> ApiError {
    let message = body
        .as_ref()
        .and_then(|payload| {
            message_field(payload, "error").or_else(|| message_field(payload, "message"))
        })
        .unwrap_or_else(|| UNKNOWN_ERROR_MESSAGE.to_string());

    ApiError {
        kind: ApiErrorKind::from_status(status),
        status,
        message,
        raw_payload: body,
    }
}

fn message_field(payload: &Value, field: &str) -> Option<String> {
    match payload.get(field)? {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Errors that can occur when dispatching a request.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// The API answered with a non-2xx status.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Network or HTTP failure reported by reqwest.
    ///
    /// DNS resolution, connection failures, timeouts or an interrupted body.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Failure reported through the middleware stack.
    ///
    /// Transport faults surface here once the retry budget is spent.
    #[error("Middleware error: {0}")]
    Middleware(#[from] reqwest_middleware::Error),

    /// JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The dispatcher could not be built from its configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The request could not be assembled (e.g. an invalid header).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The response did not have the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ClientError {
    /// Whether the failure happened before any response arrived.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Middleware(_))
    }

    /// The classified API error, if this is one.
    pub const fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::Api(error) => Some(error),
            _ => None,
        }
    }

    /// The classification, if this is an API error.
    pub const fn kind(&self) -> Option<ApiErrorKind> {
        match self {
            Self::Api(error) => Some(error.kind),
            _ => None,
        }
    }

    /// The HTTP status, if this is an API error.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api(error) => Some(error.status),
            _ => None,
        }
    }

    /// Check if this is an authentication error.
    pub const fn is_authentication_error(&self) -> bool {
        matches!(self.kind(), Some(ApiErrorKind::Authentication))
    }

    /// Check if this is a not-found error.
    pub const fn is_not_found(&self) -> bool {
        matches!(self.kind(), Some(ApiErrorKind::NotFound))
    }

    /// Check if this is a validation error.
    pub const fn is_validation_error(&self) -> bool {
        matches!(self.kind(), Some(ApiErrorKind::Validation))
    }
}

/// Result type alias using [`ClientError`].
pub type Result<T> = std::result::Result<T, ClientError>;
