//! Validation utilities shared by request inputs

use rust_decimal::Decimal;
use validator::ValidationError;

// ============================================================================
// Money
// ============================================================================

/// Cost and SRP amounts may be zero but never negative
pub fn validate_non_negative_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("amount must not be negative".into());
        return Err(err);
    }
    Ok(())
}

// ============================================================================
// Accounts
// ============================================================================

/// Usernames are lowercase ASCII letters, digits, dots, dashes or underscores
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.len() < 3 {
        return Err("Username must be at least 3 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_'))
    {
        return Err("Username may only contain lowercase letters, digits, '.', '-' and '_'");
    }
    Ok(())
}

// ============================================================================
// Pagination
// ============================================================================

/// Clamp raw skip/limit query values into a usable window; `limit` alone
/// bounds the page size
pub fn clamp_page(skip: i64, limit: i64) -> (i64, i64) {
    (skip.max(0), limit.max(0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amounts() {
        assert!(validate_non_negative_amount(&Decimal::ZERO).is_ok());
        assert!(validate_non_negative_amount(&Decimal::new(1999, 2)).is_ok());
        assert!(validate_non_negative_amount(&Decimal::new(-1, 2)).is_err());
    }

    #[test]
    fn test_negative_zero_is_zero() {
        let negative_zero: Decimal = "-0.00".parse().unwrap();
        assert!(validate_non_negative_amount(&negative_zero).is_ok());
    }

    #[test]
    fn test_username() {
        assert!(validate_username("pharm.north-1").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("Admin").is_err());
        assert!(validate_username("with space").is_err());
    }

    #[test]
    fn test_clamp_page() {
        assert_eq!(clamp_page(0, 100), (0, 100));
        assert_eq!(clamp_page(-5, -1), (0, 0));
        assert_eq!(clamp_page(3, 5000), (3, 5000));
    }
}
