//! Unified error codes for the dispatch core
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 2xxx: Permission errors
//! - 3xxx: Entity errors (institution, student)
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Duplicate lead (conflict) errors
//! - 8xxx: Notify errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,

    // ==================== 2xxx: Permission ====================
    /// Operator's institution does not own the target
    NotOwner = 2002,

    // ==================== 3xxx: Entity ====================
    /// Referenced entity is missing or not usable
    InvalidEntity = 3001,
    /// Student not found
    StudentNotFound = 3101,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Operation not allowed from the order's current status
    OrderInvalidState = 4002,

    // ==================== 5xxx: Payment ====================
    /// Pay record not found
    PayRecordNotFound = 5001,
    /// Pay record was already confirmed or rejected
    PayRecordAlreadyDecided = 5002,

    // ==================== 6xxx: Conflict ====================
    /// Conflict record not found
    ConflictNotFound = 6001,
    /// Conflict was already processed
    ConflictAlreadyProcessed = 6002,
    /// Chosen student is not an eligible candidate
    NoValidSelection = 6003,

    // ==================== 8xxx: Notify ====================
    /// Notify not found
    NotifyNotFound = 8001,

    // ==================== 9xxx: System ====================
    /// Database error
    DatabaseError = 9002,
    /// Operation timeout
    TimeoutError = 9004,
    /// Unit of work panicked
    InternalPanic = 9006,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotOwner => "Operator's institution does not own this resource",

            // Entity
            ErrorCode::InvalidEntity => "Referenced entity is invalid",
            ErrorCode::StudentNotFound => "Student not found",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::OrderInvalidState => "Operation not allowed in current order status",

            // Payment
            ErrorCode::PayRecordNotFound => "Pay record not found",
            ErrorCode::PayRecordAlreadyDecided => "Pay record has already been decided",

            // Conflict
            ErrorCode::ConflictNotFound => "Conflict not found",
            ErrorCode::ConflictAlreadyProcessed => "Conflict has already been processed",
            ErrorCode::NoValidSelection => "Chosen student is not an eligible candidate",

            ErrorCode::NotifyNotFound => "Notify not found",

            // System
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::InternalPanic => "Unit of work panicked",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(ErrorCode::ValidationFailed),
            2002 => Ok(ErrorCode::NotOwner),

            // Entity
            3001 => Ok(ErrorCode::InvalidEntity),
            3101 => Ok(ErrorCode::StudentNotFound),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::OrderInvalidState),

            // Payment
            5001 => Ok(ErrorCode::PayRecordNotFound),
            5002 => Ok(ErrorCode::PayRecordAlreadyDecided),

            // Conflict
            6001 => Ok(ErrorCode::ConflictNotFound),
            6002 => Ok(ErrorCode::ConflictAlreadyProcessed),
            6003 => Ok(ErrorCode::NoValidSelection),

            8001 => Ok(ErrorCode::NotifyNotFound),

            // System
            9002 => Ok(ErrorCode::DatabaseError),
            9004 => Ok(ErrorCode::TimeoutError),
            9006 => Ok(ErrorCode::InternalPanic),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::NotOwner.code(), 2002);
        assert_eq!(ErrorCode::InvalidEntity.code(), 3001);
        assert_eq!(ErrorCode::OrderInvalidState.code(), 4002);
        assert_eq!(ErrorCode::PayRecordAlreadyDecided.code(), 5002);
        assert_eq!(ErrorCode::NoValidSelection.code(), 6003);
        assert_eq!(ErrorCode::TimeoutError.code(), 9004);
        assert_eq!(ErrorCode::InternalPanic.code(), 9006);
    }

    #[test]
    fn test_try_from_roundtrips_every_declared_code() {
        let all = [
            ErrorCode::ValidationFailed,
            ErrorCode::NotOwner,
            ErrorCode::InvalidEntity,
            ErrorCode::StudentNotFound,
            ErrorCode::OrderNotFound,
            ErrorCode::OrderInvalidState,
            ErrorCode::PayRecordNotFound,
            ErrorCode::PayRecordAlreadyDecided,
            ErrorCode::ConflictNotFound,
            ErrorCode::ConflictAlreadyProcessed,
            ErrorCode::NoValidSelection,
            ErrorCode::NotifyNotFound,
            ErrorCode::DatabaseError,
            ErrorCode::TimeoutError,
            ErrorCode::InternalPanic,
        ];
        for code in all {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_invalid_code_rejected() {
        assert_eq!(ErrorCode::try_from(4999), Err(InvalidErrorCode(4999)));
        assert_eq!(ErrorCode::try_from(3), Err(InvalidErrorCode(3)));
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ErrorCode::NoValidSelection).unwrap();
        assert_eq!(json, "6003");
        let code: ErrorCode = serde_json::from_str("4002").unwrap();
        assert_eq!(code, ErrorCode::OrderInvalidState);
    }
}
