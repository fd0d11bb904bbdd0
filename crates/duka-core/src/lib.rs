//! # duka-core: Pure Business Logic for Duka
//!
//! Stock ledger rules and everything around them, as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Duka Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                duka-terminal (commands, config)                 │   │
//! │  │   add_sale_line, complete_sale, complete_purchase, ...          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                ★ duka-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │   │
//! │  │   │ ledger  │ │  cart   │ │ invoice │ │ access  │ │  money  │  │   │
//! │  │   │ +/- qty │ │ SaleCart│ │ PUR/INV │ │  Role   │ │  cents  │  │   │
//! │  │   └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    duka-db (Database Layer)                     │   │
//! │  │       SQLite, migrations, atomic purchase/sale/adjustment       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Stock, Purchase, Sale, StockAdjustment, ...)
//! - [`money`] - Integer money with markup math
//! - [`ledger`] - Guarded quantity transitions and reconciliation replay
//! - [`cart`] - Sale and purchase carts
//! - [`invoice`] - `PUR-YYYYMMDD-NNNN` / `INV-YYYYMMDD-NNNN`
//! - [`access`] - Role → branch scope resolution
//! - [`registration`] - Multi-step company registration form
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use duka_core::ledger;
//! use duka_core::money::Money;
//!
//! // Stock of 10, sell 4
//! assert_eq!(ledger::decrease(10, 4).unwrap(), 6);
//!
//! // First purchase at 50.00 sells at 65.00
//! assert_eq!(
//!     Money::from_cents(5000).apply_markup(duka_core::DEFAULT_MARKUP_BPS),
//!     Some(Money::from_cents(6500))
//! );
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod cart;
pub mod error;
pub mod invoice;
pub mod ledger;
pub mod money;
pub mod registration;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{Actor, BranchScope};
pub use cart::{PurchaseCart, SaleCart};
pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice::InvoiceKind;
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default markup applied to a buy price when no sell price exists (30%).
pub const DEFAULT_MARKUP_BPS: u32 = 3000;

/// Maximum distinct lines in one cart.
pub const MAX_CART_LINES: usize = 100;

/// Upper bound on a single movement quantity.
///
/// Guards against typos (an extra zero or two), not against real volume.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

/// Upper bound on a unit price in minor units (100 million major units).
///
/// With [`MAX_LINE_QUANTITY`] and [`MAX_CART_LINES`] this keeps every line
/// total and invoice total well inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 10_000_000_000;

/// Maximum adjustment reason length.
pub const MAX_REASON_LENGTH: usize = 1000;

/// Minimum password length for user accounts.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Default number of rows in "recent" histories.
pub const DEFAULT_RECENT_LIMIT: i64 = 50;
