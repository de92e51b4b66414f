//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.

use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Resource not found
    #[error("Resource not found")]
    NotFound,
    /// Validation error with message
    #[error("Validation error: {0}")]
    Validation(String),
    /// Unique key already taken
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Bad credentials or token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    /// Authenticated but not allowed
    #[error("Forbidden")]
    Forbidden,
    /// Database/persistence error
    #[error("Database error: {0}")]
    Database(String),
    /// External service error
    #[error("External service error: {0}")]
    External(String),
    /// Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

// Conversion from SeaORM errors (used in infrastructure layer)
impl From<DbErr> for DomainError {
    fn from(e: DbErr) -> Self {
        match e.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(msg)) => DomainError::Conflict(msg),
            _ => DomainError::Database(e.to_string()),
        }
    }
}

impl From<crate::integrations::IntegrationError> for DomainError {
    fn from(e: crate::integrations::IntegrationError) -> Self {
        DomainError::External(e.to_string())
    }
}
