//! HTTP status code mapping for error codes
//!
//! The dispatch core has no HTTP surface of its own; this mapping is what an
//! outer API layer uses to turn an [`AppError`](super::AppError) into a status.

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // 404 Not Found
            Self::StudentNotFound
            | Self::OrderNotFound
            | Self::PayRecordNotFound
            | Self::ConflictNotFound
            | Self::NotifyNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::OrderInvalidState
            | Self::PayRecordAlreadyDecided
            | Self::ConflictAlreadyProcessed => StatusCode::CONFLICT,

            // 403 Forbidden
            Self::NotOwner => StatusCode::FORBIDDEN,

            // 422 Unprocessable (referenced entity exists but is unusable)
            Self::InvalidEntity | Self::NoValidSelection => StatusCode::UNPROCESSABLE_ENTITY,

            // 503 Service Unavailable (transient errors, client can retry)
            Self::TimeoutError => StatusCode::SERVICE_UNAVAILABLE,

            // 500 Internal Server Error
            Self::DatabaseError | Self::InternalPanic => StatusCode::INTERNAL_SERVER_ERROR,

            Self::ValidationFailed => StatusCode::BAD_REQUEST,
        }
    }
}
