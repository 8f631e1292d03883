//! Domain error types
//!
//! These errors are framework-agnostic and represent business-level failures.

use std::fmt;

#[derive(Debug)]
pub enum CirculationError {
    /// Attempted to loan or reserve a copy that is not claimable
    CopyUnavailable(String),
    /// Attempted to return a loan that already has a returned date
    AlreadyReturned,
    /// Lifecycle operation applied out of order (e.g. fulfilling a pending reservation)
    InvalidState(String),
    /// Borrower has reached a borrowing limit
    LimitExceeded(String),
    /// Resource not found
    NotFound,
    /// Validation error with message
    Validation(String),
    /// Database/persistence error
    Database(String),
}

impl fmt::Display for CirculationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CirculationError::CopyUnavailable(msg) => write!(f, "Copy unavailable: {}", msg),
            CirculationError::AlreadyReturned => write!(f, "Loan is already returned"),
            CirculationError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            CirculationError::LimitExceeded(msg) => write!(f, "Limit exceeded: {}", msg),
            CirculationError::NotFound => write!(f, "Resource not found"),
            CirculationError::Validation(msg) => write!(f, "Validation error: {}", msg),
            CirculationError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for CirculationError {}

// Conversion from SeaORM errors (used in the services layer)
impl From<sea_orm::DbErr> for CirculationError {
    fn from(e: sea_orm::DbErr) -> Self {
        CirculationError::Database(e.to_string())
    }
}
