//! # Error Types
//!
//! Domain-specific error types for duka-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  duka-core errors (this file)                                          │
//! │  ├── CoreError        - Ledger and business rule violations            │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  duka-db errors (separate crate)                                       │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  duka-terminal errors (app)                                            │
//! │  └── ApiError         - What callers see (serialized)                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Caller       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Messages name the offending quantity or field. Callers show them verbatim,
//! e.g. `"Insufficient stock. Available: 3"`.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
///
/// Every variant is a rejected operation that leaves state unchanged.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A decrease would drive quantity below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Stock: quantity = 5
    ///      │
    ///      ▼
    /// Sell 6 ──► InsufficientStock { available: 5 }
    ///      │
    ///      ▼
    /// UI shows: "Insufficient stock. Available: 5"
    /// ```
    ///
    /// `available` is the quantity the caller could still take at check time.
    /// For a cart line that is stock minus what the cart already holds.
    #[error("Insufficient stock. Available: {available}")]
    InsufficientStock { available: i64 },

    /// No stock row exists for the (product, branch) pair.
    #[error("Stock does not exist for product {product_id} in branch {branch_id}")]
    NoStockRecord {
        product_id: String,
        branch_id: String,
    },

    /// A name that must be unique within its scope is already taken.
    #[error("{entity} already exists: {name}")]
    DuplicateEntity { entity: String, name: String },

    /// Finalize was called on a cart with no lines.
    #[error("Cart is empty")]
    CartEmpty,

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// The product is not a line in the cart.
    #[error("Product {product_id} is not in the cart")]
    LineNotFound { product_id: String },

    /// The acting user's role does not permit the operation.
    #[error("Not permitted: {reason}")]
    Forbidden { reason: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a DuplicateEntity error.
    pub fn duplicate(entity: impl Into<String>, name: impl Into<String>) -> Self {
        CoreError::DuplicateEntity {
            entity: entity.into(),
            name: name.into(),
        }
    }

    /// Creates a NoStockRecord error for a (product, branch) pair.
    pub fn no_stock(product_id: impl Into<String>, branch_id: impl Into<String>) -> Self {
        CoreError::NoStockRecord {
            product_id: product_id.into(),
            branch_id: branch_id.into(),
        }
    }

    /// Creates a Forbidden error.
    pub fn forbidden(reason: impl Into<String>) -> Self {
        CoreError::Forbidden {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any mutation runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// A confirmation field does not match its original.
    #[error("{field} confirmation does not match")]
    Mismatch { field: String },
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
    fn test_insufficient_stock_message_names_available_quantity() {
        let err = CoreError::InsufficientStock { available: 3 };
        assert_eq!(err.to_string(), "Insufficient stock. Available: 3");
    }

    #[test]
    fn test_duplicate_message() {
        let err = CoreError::duplicate("Branch", "Main Branch");
        assert_eq!(err.to_string(), "Branch already exists: Main Branch");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "name".to_string(),
        };
        assert_eq!(err.to_string(), "name is required");

        let err = ValidationError::Mismatch {
            field: "password".to_string(),
        };
        assert_eq!(err.to_string(), "password confirmation does not match");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::MustBePositive {
            field: "quantity".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
