//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the leading digit of the error code:
/// - 0xxx: General errors
/// - 1xxx: Authentication errors
/// - 2xxx: Permission errors
/// - 3xxx: Entity errors
/// - 4xxx: Order errors
/// - 5xxx: Payment errors
/// - 6xxx: Conflict errors
/// - 7xxx: Statistics errors
/// - 8xxx: Notify errors
/// - 9xxx: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    General,
    Auth,
    Permission,
    Entity,
    Order,
    Payment,
    Conflict,
    Statistics,
    Notify,
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Auth,
            2000..3000 => Self::Permission,
            3000..4000 => Self::Entity,
            4000..5000 => Self::Order,
            5000..6000 => Self::Payment,
            6000..7000 => Self::Conflict,
            7000..8000 => Self::Statistics,
            8000..9000 => Self::Notify,
            _ => Self::System,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Auth => "auth",
            Self::Permission => "permission",
            Self::Entity => "entity",
            Self::Order => "order",
            Self::Payment => "payment",
            Self::Conflict => "conflict",
            Self::Statistics => "statistics",
            Self::Notify => "notify",
            Self::System => "system",
        }
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(999), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(1001), ErrorCategory::Auth);
        assert_eq!(ErrorCategory::from_code(2002), ErrorCategory::Permission);
        assert_eq!(ErrorCategory::from_code(3101), ErrorCategory::Entity);
        assert_eq!(ErrorCategory::from_code(4002), ErrorCategory::Order);
        assert_eq!(ErrorCategory::from_code(5001), ErrorCategory::Payment);
        assert_eq!(ErrorCategory::from_code(6003), ErrorCategory::Conflict);
        assert_eq!(ErrorCategory::from_code(7001), ErrorCategory::Statistics);
        assert_eq!(ErrorCategory::from_code(8001), ErrorCategory::Notify);
        assert_eq!(ErrorCategory::from_code(9006), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(10000), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::NotOwner.category(), ErrorCategory::Permission);
        assert_eq!(ErrorCode::StudentNotFound.category(), ErrorCategory::Entity);
        assert_eq!(ErrorCode::PayRecordAlreadyDecided.category(), ErrorCategory::Payment);
        assert_eq!(
            ErrorCode::NoValidSelection.category(),
            ErrorCategory::Conflict
        );
        assert_eq!(ErrorCode::InternalPanic.category(), ErrorCategory::System);
    }

    #[test]
    fn test_category_serde() {
        let json = serde_json::to_string(&ErrorCategory::Statistics).unwrap();
        assert_eq!(json, "\"statistics\"");
        let category: ErrorCategory = serde_json::from_str("\"conflict\"").unwrap();
        assert_eq!(category, ErrorCategory::Conflict);
    }
}
