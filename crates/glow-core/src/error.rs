//! # Error Types
//!
//! Domain-specific error types for glow-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  glow-core errors (this file)                                          │
//! │  ├── CoreError        - Domain rule failures                           │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  glow-db errors (separate crate)                                       │
//! │  ├── DbError          - NotFound, TransactionConflict, store failures  │
//! │  └── ApiError         - What the dashboard sees (serialized)           │
//! │                                                                         │
//! │  Flow: ValidationError → DbError → ApiError → Dashboard                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain rule failures raised by pure logic.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A payment would take a sale past its total.
    ///
    /// ## When This Occurs
    /// - Posting a payment larger than `total - amount_paid`
    /// - Two payment dialogs open on the same sale, both submitted
    #[error("Payment of {amount} exceeds outstanding balance {outstanding} on sale {sale_id}")]
    Overpayment {
        sale_id: String,
        amount: i64,
        outstanding: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any store call is made.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// A value exceeds the limit derived from another field.
    #[error("{field} ({value}) must not exceed {limit_field} ({limit})")]
    ExceedsLimit {
        field: String,
        value: i64,
        limit_field: String,
        limit: i64,
    },

    /// Value outside the accepted range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// A collection that must have entries is empty.
    #[error("{field} must contain at least one entry")]
    Empty { field: String },

    /// Invalid format (e.g., invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::Overpayment {
            sale_id: "S1".to_string(),
            amount: 500,
            outstanding: 200,
        };
        assert_eq!(
            err.to_string(),
            "Payment of 500 exceeds outstanding balance 200 on sale S1"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("location").to_string(),
            "location is required"
        );

        let err = ValidationError::ExceedsLimit {
            field: "amount_paid".to_string(),
            value: 6000,
            limit_field: "total".to_string(),
            limit: 5000,
        };
        assert_eq!(
            err.to_string(),
            "amount_paid (6000) must not exceed total (5000)"
        );
    }

    #[test]
    fn test_out_of_range_message() {
        let err = ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: 100_000,
        };
        assert_eq!(err.to_string(), "quantity must be between 1 and 100000");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("items").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
