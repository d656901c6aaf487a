//! # Error Types
//!
//! Domain-specific error types for shopledger-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  shopledger-core errors (this file)                             │
//! │  ├── CoreError        - Business rule violations                │
//! │  └── ValidationError  - Input validation failures               │
//! │                                                                 │
//! │  shopledger-db errors (separate crate)                          │
//! │  ├── DbError          - Storage failures                        │
//! │  └── LedgerError      - CoreError | DbError for coordinators    │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Errors are enum variants carrying context (product code, quantities),
//! never bare strings. The presentation layer owns user-facing wording.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations and domain logic failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced entity does not exist (or was soft-deleted).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A movement or line quantity was zero or negative.
    #[error("Invalid quantity: {quantity} (must be positive)")]
    InvalidQuantity { quantity: i64 },

    /// An `out` movement asked for more than the available stock.
    ///
    /// ## When This Occurs
    /// - A sale line exceeds the product's current stock
    /// - A manual stock-out exceeds current stock
    /// - A concurrent sale consumed the stock between validation and apply
    #[error("Insufficient stock for {code}: available {available}, requested {requested}")]
    InsufficientStock {
        code: String,
        available: i64,
        requested: i64,
    },

    /// A purchase receipt would push an item past its ordered quantity.
    #[error(
        "Over-receipt for {code}: ordered {ordered}, already received {received}, requested {requested}"
    )]
    OverReceipt {
        code: String,
        ordered: i64,
        received: i64,
        requested: i64,
    },

    /// A sale was submitted with no line items.
    #[error("Sale has no line items")]
    EmptyCart,

    /// Concurrent-update contention exhausted the bounded retries.
    #[error("Concurrent update conflict, retries exhausted")]
    Conflict,

    /// A redemption asked for more points than the customer holds.
    #[error("Insufficient loyalty points: available {available}, requested {requested}")]
    InsufficientPoints { available: i64, requested: i64 },

    /// The entity is not in a state that allows the requested operation.
    ///
    /// ## When This Occurs
    /// - Cancelling an invoice that is already cancelled
    /// - Receiving against a cancelled or fully received purchase order
    #[error("{entity} {id} is {status}, cannot perform operation")]
    InvalidStatus {
        entity: &'static str,
        id: String,
        status: String,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, bad characters in a code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Duplicate value (e.g., duplicate product code).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            code: "P001".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for P001: available 3, requested 5"
        );

        let err = CoreError::OverReceipt {
            code: "P002".to_string(),
            ordered: 10,
            received: 8,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Over-receipt for P002: ordered 10, already received 8, requested 5"
        );
    }

    #[test]
    fn test_not_found_helper() {
        let err = CoreError::not_found("Product", "abc");
        assert_eq!(err.to_string(), "Product not found: abc");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "code".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
