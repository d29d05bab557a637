//! Unified error taxonomy shared across the sync core.
//!
//! Mirrors the fine-grained kind/category split a gRPC-facing hub needs:
//! callers match on `HubError` variants, while `category()` gives the
//! dotted string carried as wire metadata and `grpc_code()` gives the
//! coarse mapping a transport layer would set as its status code.

use serde::{Deserialize, Serialize};

/// Subkinds of [`HubError::BadRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BadRequestKind {
    ParseFailure,
    ValidationFailure,
    InvalidParam,
    Conflict,
    Duplicate,
}

impl BadRequestKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::ParseFailure => "parse_failure",
            Self::ValidationFailure => "validation_failure",
            Self::InvalidParam => "invalid_param",
            Self::Conflict => "conflict",
            Self::Duplicate => "duplicate",
        }
    }
}

/// Subkinds of [`HubError::Unavailable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnavailableKind {
    NetworkFailure,
    StorageFailure,
}

impl UnavailableKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::NetworkFailure => "network_failure",
            Self::StorageFailure => "storage_failure",
        }
    }
}

/// Error taxonomy for the sync core.
///
/// Every variant is surfaced to the caller rather than retried internally,
/// except `Unavailable`, which the outer scheduler is expected to retry.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum HubError {
    #[error("bad request ({}): {message}", kind.as_str())]
    BadRequest {
        kind: BadRequestKind,
        message: String,
    },
    #[error("not found: {message}")]
    NotFound { message: String },
    #[error("unavailable ({}): {message}", kind.as_str())]
    Unavailable {
        kind: UnavailableKind,
        message: String,
    },
    #[error("unauthenticated: {message}")]
    Unauthenticated { message: String },
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },
    #[error("unknown: {message}")]
    Unknown { message: String },
}

impl HubError {
    pub fn bad_request(kind: BadRequestKind, message: impl Into<String>) -> Self {
        Self::BadRequest {
            kind,
            message: message.into(),
        }
    }

    pub fn parse_failure(message: impl Into<String>) -> Self {
        Self::bad_request(BadRequestKind::ParseFailure, message)
    }

    pub fn validation_failure(message: impl Into<String>) -> Self {
        Self::bad_request(BadRequestKind::ValidationFailure, message)
    }

    pub fn invalid_param(message: impl Into<String>) -> Self {
        Self::bad_request(BadRequestKind::InvalidParam, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::bad_request(BadRequestKind::Conflict, message)
    }

    pub fn duplicate(message: impl Into<String>) -> Self {
        Self::bad_request(BadRequestKind::Duplicate, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn unavailable(kind: UnavailableKind, message: impl Into<String>) -> Self {
        Self::Unavailable {
            kind,
            message: message.into(),
        }
    }

    pub fn network_failure(message: impl Into<String>) -> Self {
        Self::unavailable(UnavailableKind::NetworkFailure, message)
    }

    pub fn storage_failure(message: impl Into<String>) -> Self {
        Self::unavailable(UnavailableKind::StorageFailure, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown {
            message: message.into(),
        }
    }

    /// Dotted fine-grained kind, carried as wire metadata `errCode`.
    pub fn category(&self) -> String {
        match self {
            Self::BadRequest { kind, .. } => format!("bad_request.{}", kind.as_str()),
            Self::NotFound { .. } => "not_found".to_string(),
            Self::Unavailable { kind, .. } => format!("unavailable.{}", kind.as_str()),
            Self::Unauthenticated { .. } => "unauthenticated".to_string(),
            Self::Unauthorized { .. } => "unauthorized".to_string(),
            Self::Unknown { .. } => "unknown".to_string(),
        }
    }

    /// Coarse gRPC status mapping a transport layer would apply.
    pub fn grpc_code(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "INVALID_ARGUMENT",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Unavailable { .. } => "UNAVAILABLE",
            Self::Unauthenticated { .. } => "UNAUTHENTICATED",
            Self::Unauthorized { .. } => "PERMISSION_DENIED",
            Self::Unknown { .. } => "UNKNOWN",
        }
    }

    /// Whether the outer scheduler should retry the round that produced this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
