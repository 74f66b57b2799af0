//! Dispatch core error type
//!
//! `DispatchError` is what every core operation returns. Outer layers convert
//! it into the shared [`AppError`] for transport.

use crate::db::repository::RepoError;
use shared::error::{AppError, ErrorCode};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Record kinds a lookup can miss
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Student,
    Order,
    PayRecord,
    Conflict,
    Notify,
}

impl Resource {
    pub const fn name(self) -> &'static str {
        match self {
            Resource::Student => "Student",
            Resource::Order => "Order",
            Resource::PayRecord => "Pay record",
            Resource::Conflict => "Conflict",
            Resource::Notify => "Notify",
        }
    }

    const fn not_found_code(self) -> ErrorCode {
        match self {
            Resource::Student => ErrorCode::StudentNotFound,
            Resource::Order => ErrorCode::OrderNotFound,
            Resource::PayRecord => ErrorCode::PayRecordNotFound,
            Resource::Conflict => ErrorCode::ConflictNotFound,
            Resource::Notify => ErrorCode::NotifyNotFound,
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Referenced student/institution missing or unusable
    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    /// Operator does not own/administer the target
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Operation not allowed from the order's current status
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Pay record is no longer pending (state conflict on a pay record)
    #[error("Already decided: {0}")]
    AlreadyDecided(String),

    /// Chosen student is not an eligible conflict winner
    #[error("No valid selection: {0}")]
    NoValidSelection(String),

    #[error("Already processed: {0}")]
    AlreadyProcessed(String),

    #[error("{0} {1} not found")]
    NotFound(Resource, i64),

    #[error("Validation error: {0}")]
    Validation(String),

    /// Transaction deadline fired before the unit of work finished.
    /// Callers must treat the outcome as unknown.
    #[error("Transaction deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),

    #[error("Unit of work panicked: {0}")]
    InternalPanic(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<sqlx::Error> for DispatchError {
    fn from(err: sqlx::Error) -> Self {
        DispatchError::Storage(err.to_string())
    }
}

impl From<RepoError> for DispatchError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Validation(msg) => DispatchError::Validation(msg),
            RepoError::Duplicate(msg) | RepoError::Database(msg) => DispatchError::Storage(msg),
        }
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::InvalidEntity(msg) => AppError::invalid_entity(msg),
            DispatchError::Unauthorized(msg) => AppError::not_owner(msg),
            DispatchError::InvalidState(msg) => {
                AppError::with_message(ErrorCode::OrderInvalidState, msg)
            }
            DispatchError::NoValidSelection(msg) => {
                AppError::with_message(ErrorCode::NoValidSelection, msg)
            }
            DispatchError::AlreadyDecided(msg) => {
                AppError::with_message(ErrorCode::PayRecordAlreadyDecided, msg)
            }
            DispatchError::AlreadyProcessed(msg) => {
                AppError::with_message(ErrorCode::ConflictAlreadyProcessed, msg)
            }
            DispatchError::NotFound(resource, id) => {
                AppError::with_message(resource.not_found_code(), format!("{resource} {id} not found"))
                    .with_detail("id", id)
            }
            DispatchError::Validation(msg) => AppError::validation(msg),
            DispatchError::DeadlineExceeded(after) => {
                tracing::error!(timeout_ms = after.as_millis() as u64, "Transaction deadline exceeded");
                AppError::timeout(format!("Transaction deadline exceeded after {after:?}"))
                    .with_detail("outcome", "unknown")
            }
            DispatchError::InternalPanic(msg) => {
                tracing::error!(panic = %msg, "Unit of work panicked");
                AppError::new(ErrorCode::InternalPanic)
            }
            DispatchError::Storage(msg) => {
                tracing::error!(error = %msg, "Storage error");
                AppError::new(ErrorCode::DatabaseError)
            }
        }
    }
}

/// Result type for dispatch core operations
pub type DispatchResult<T> = Result<T, DispatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_codes() {
        let cases = [
            (DispatchError::InvalidEntity("org".into()), ErrorCode::InvalidEntity),
            (DispatchError::Unauthorized("x".into()), ErrorCode::NotOwner),
            (DispatchError::InvalidState("x".into()), ErrorCode::OrderInvalidState),
            (DispatchError::NoValidSelection("x".into()), ErrorCode::NoValidSelection),
            (
                DispatchError::AlreadyProcessed("x".into()),
                ErrorCode::ConflictAlreadyProcessed,
            ),
            (DispatchError::AlreadyDecided("x".into()), ErrorCode::PayRecordAlreadyDecided),
            (DispatchError::NotFound(Resource::Student, 1), ErrorCode::StudentNotFound),
            (DispatchError::NotFound(Resource::Order, 1), ErrorCode::OrderNotFound),
            (DispatchError::NotFound(Resource::PayRecord, 1), ErrorCode::PayRecordNotFound),
            (DispatchError::NotFound(Resource::Conflict, 1), ErrorCode::ConflictNotFound),
            (DispatchError::NotFound(Resource::Notify, 1), ErrorCode::NotifyNotFound),
            (DispatchError::Validation("x".into()), ErrorCode::ValidationFailed),
            (
                DispatchError::DeadlineExceeded(Duration::from_secs(8)),
                ErrorCode::TimeoutError,
            ),
            (DispatchError::InternalPanic("boom".into()), ErrorCode::InternalPanic),
            (DispatchError::Storage("disk".into()), ErrorCode::DatabaseError),
        ];
        for (err, code) in cases {
            assert_eq!(AppError::from(err).code, code);
        }
    }

    #[test]
    fn storage_details_do_not_leak() {
        let app: AppError = DispatchError::Storage("no such table: secret".into()).into();
        assert!(!app.message.contains("secret"));
    }

    #[test]
    fn not_found_names_the_record() {
        let err = DispatchError::NotFound(Resource::PayRecord, 42);
        assert_eq!(err.to_string(), "Pay record 42 not found");
        let app = AppError::from(err);
        assert_eq!(app.message, "Pay record 42 not found");
        assert_eq!(app.details.unwrap()["id"], 42);
    }

    #[test]
    fn repo_errors_convert() {
        assert!(matches!(
            DispatchError::from(RepoError::Validation("bad".into())),
            DispatchError::Validation(_)
        ));
        assert!(matches!(
            DispatchError::from(RepoError::Duplicate("open conflict".into())),
            DispatchError::Storage(_)
        ));
    }
}
