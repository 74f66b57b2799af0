//! Input validation helpers
//!
//! Centralized text length constants and validation functions.
//! SQLite TEXT has no built-in length enforcement.

use crate::error::{DispatchError, DispatchResult};

// ── Text length limits ──────────────────────────────────────────────

/// Student names, pay record titles, subjects
pub const MAX_NAME_LEN: usize = 200;

/// Remark content, notify content
pub const MAX_NOTE_LEN: usize = 500;

/// Telephone, lead source
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Upper bound on a single payment, in currency units
pub const MAX_PAYMENT_AMOUNT: i64 = 100_000_000;

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> DispatchResult<()> {
    if value.trim().is_empty() {
        return Err(DispatchError::Validation(format!("{field} must not be empty")));
    }
    let len = value.chars().count();
    if len > max_len {
        return Err(DispatchError::Validation(format!(
            "{field} is too long ({len} chars, max {max_len})"
        )));
    }
    Ok(())
}

/// Validate an optional free-text field (empty allowed).
pub fn validate_optional_text(value: &str, field: &str, max_len: usize) -> DispatchResult<()> {
    let len = value.chars().count();
    if len > max_len {
        return Err(DispatchError::Validation(format!(
            "{field} is too long ({len} chars, max {max_len})"
        )));
    }
    Ok(())
}

/// Payment amounts are strictly positive integers; direction comes from the mode.
pub fn validate_amount(amount: i64) -> DispatchResult<()> {
    if amount <= 0 {
        return Err(DispatchError::Validation(format!(
            "amount must be positive, got {amount}"
        )));
    }
    if amount > MAX_PAYMENT_AMOUNT {
        return Err(DispatchError::Validation(format!(
            "amount exceeds maximum allowed value of {MAX_PAYMENT_AMOUNT}"
        )));
    }
    Ok(())
}

/// Telephone: 5..=20 digits, optional leading `+`
pub fn validate_telephone(value: &str) -> DispatchResult<()> {
    let digits = value.strip_prefix('+').unwrap_or(value);
    if digits.len() < 5 || digits.len() > 20 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(DispatchError::Validation(format!(
            "telephone is invalid: {value:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_text_rejects_blank_and_long() {
        assert!(validate_required_text("tuition", "title", MAX_NAME_LEN).is_ok());
        assert!(validate_required_text("   ", "title", MAX_NAME_LEN).is_err());
        let long = "x".repeat(MAX_NAME_LEN + 1);
        assert!(validate_required_text(&long, "title", MAX_NAME_LEN).is_err());
    }

    #[test]
    fn length_counts_chars_not_bytes() {
        // 200 CJK chars = 600 bytes, still within the limit
        let cjk = "学".repeat(MAX_NAME_LEN);
        assert!(validate_required_text(&cjk, "name", MAX_NAME_LEN).is_ok());
    }

    #[test]
    fn amount_must_be_positive() {
        assert!(validate_amount(1000).is_ok());
        assert!(validate_amount(0).is_err());
        assert!(validate_amount(-5).is_err());
        assert!(validate_amount(MAX_PAYMENT_AMOUNT + 1).is_err());
    }

    #[test]
    fn telephone_format() {
        assert!(validate_telephone("13800000000").is_ok());
        assert!(validate_telephone("+8613800000000").is_ok());
        assert!(validate_telephone("138-0000").is_err());
        assert!(validate_telephone("").is_err());
        assert!(validate_telephone(" 13800000000").is_err());
    }
}
