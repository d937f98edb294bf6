//! Error model for the auth core.
//! Component errors are small `thiserror` enums; `AppError` is the unified shape a
//! request-handling layer maps to a response, with an HTTP status helper.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// Failures raised by the backing store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Credential check failures. Unknown email and wrong password both map to
/// `InvalidCredentials` so callers cannot tell them apart.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("Invalid email/password combination")]
    InvalidCredentials,

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    NotFound { code: String, message: String },
    Conflict { code: String, message: String },
    Auth { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::NotFound { code, .. }
            | AppError::Conflict { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::NotFound { message, .. }
            | AppError::Conflict { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::NotFound { .. } => 404,
            AppError::Conflict { .. } => 409,
            AppError::Auth { .. } => 401,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { .. } => AppError::NotFound { code: "not_found".into(), message: err.to_string() },
            StoreError::Conflict(_) => AppError::Conflict { code: "conflict".into(), message: err.to_string() },
            StoreError::Unavailable(_) | StoreError::Hash(_) => AppError::Internal { code: "store_error".into(), message: err.to_string() },
        }
    }
}

impl From<AuthFailure> for AppError {
    fn from(err: AuthFailure) -> Self {
        match err {
            AuthFailure::InvalidCredentials => AppError::Auth { code: "invalid_credentials".into(), message: err.to_string() },
            AuthFailure::Store(e) => e.into(),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
