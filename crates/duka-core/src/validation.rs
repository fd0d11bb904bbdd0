//! # Validation Module
//!
//! Input validation run before any mutation.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Command (duka-terminal)                                      │
//! │  └── Deserialization, string → enum parsing                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  └── Lengths, ranges, formats; no side effects                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── UNIQUE(product_id, branch_id), UNIQUE(email)                      │
//! │  ├── CHECK(quantity >= 0)                                              │
//! │  └── Foreign keys                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::{MAX_LINE_QUANTITY, MAX_PRICE_CENTS, MAX_REASON_LENGTH, MIN_PASSWORD_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required name-like field and returns it trimmed.
///
/// ## Example
/// ```rust
/// use duka_core::validation::validate_name;
///
/// assert_eq!(validate_name("name", "  Main Branch ", 255).unwrap(), "Main Branch");
/// assert!(validate_name("name", "   ", 255).is_err());
/// ```
pub fn validate_name(field: &str, value: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

/// Validates an optional free-text field. Blank becomes `None`.
pub fn validate_optional(
    field: &str,
    value: Option<&str>,
    max: usize,
) -> ValidationResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(v) if v.chars().count() > max => Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        }),
        Some(v) => Ok(Some(v.to_string())),
    }
}

/// Validates an email address and returns it trimmed and lowercased.
///
/// Structural check only: one `@`, non-empty local part, a dot in the domain.
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = validate_name("email", email, 255)?.to_lowercase();

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must be a valid email address".to_string(),
        });
    }

    Ok(email)
}

/// Validates a phone number (digits, spaces, `+`, `-`, parentheses).
pub fn validate_phone(phone: &str) -> ValidationResult<String> {
    let phone = validate_name("phone", phone, 20)?;

    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')'))
    {
        return Err(ValidationError::InvalidFormat {
            field: "phone".to_string(),
            reason: "must contain only digits, spaces, +, - and parentheses".to_string(),
        });
    }

    Ok(phone)
}

/// Validates a new password and its confirmation.
pub fn validate_password(password: &str, confirmation: &str) -> ValidationResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LENGTH,
        });
    }

    if password != confirmation {
        return Err(ValidationError::Mismatch {
            field: "password".to_string(),
        });
    }

    Ok(())
}

/// Validates an adjustment reason (optional, at most 1000 characters).
pub fn validate_reason(reason: Option<&str>) -> ValidationResult<Option<String>> {
    validate_optional("reason", reason, MAX_REASON_LENGTH)
}

/// Validates a search query and returns it trimmed.
///
/// Empty is allowed (no filter). Maximum 100 characters.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

/// Validates that a reference id is present and looks like a UUID.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    let id = id.trim();

    if id.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if uuid::Uuid::parse_str(id).is_err() {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a UUID".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a movement quantity (sale, purchase or adjustment line).
///
/// ## Rules
/// - Must be positive (>= 1)
/// - Must not exceed MAX_LINE_QUANTITY
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Save Adjustment                                                        │
/// │                                                                         │
/// │  quantity: 0                                                           │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(0) ← THIS FUNCTION                                  │
/// │       │                                                                 │
/// │       └── Error: "quantity must be positive" (no row touched)          │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a quantity that may be zero (opening stock, min_stock).
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if !(0..=MAX_LINE_QUANTITY).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a price in cents.
///
/// ## Example
/// ```rust
/// use duka_core::validation::validate_price_cents;
/// use duka_core::MAX_PRICE_CENTS;
///
/// assert!(validate_price_cents("buy_price", 5000).is_ok());
/// assert!(validate_price_cents("buy_price", 0).is_ok());
/// assert!(validate_price_cents("buy_price", -1).is_err());
/// assert!(validate_price_cents("buy_price", MAX_PRICE_CENTS + 1).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if !(0..=MAX_PRICE_CENTS).contains(&cents) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_PRICE_CENTS,
        });
    }

    Ok(())
}

// =============================================================================
// Totals
// =============================================================================

/// `unit_price_cents × quantity`, failing instead of overflowing.
pub fn line_total(unit_price_cents: i64, quantity: i64) -> ValidationResult<Money> {
    Money::from_cents(unit_price_cents)
        .checked_multiply_quantity(quantity)
        .ok_or_else(|| amount_out_of_range("line_total"))
}

/// Sum of line totals, failing instead of overflowing.
pub fn sum_line_totals<I>(line_totals: I) -> ValidationResult<Money>
where
    I: IntoIterator<Item = ValidationResult<Money>>,
{
    line_totals
        .into_iter()
        .try_fold(Money::zero(), |total, line| {
            total
                .checked_add(line?)
                .ok_or_else(|| amount_out_of_range("total"))
        })
}

fn amount_out_of_range(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX,
    }
}

/// Validates a markup in basis points (0% to 1000%).
pub fn validate_markup_bps(bps: u32) -> ValidationResult<()> {
    if bps > 100_000 {
        return Err(ValidationError::OutOfRange {
            field: "markup_bps".to_string(),
            min: 0,
            max: 100_000,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
