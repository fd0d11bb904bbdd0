//! # duka-db: Database Layer for Duka
//!
//! SQLite persistence for the stock ledger and every flow that moves it.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Duka Data Flow                                 │
//! │                                                                         │
//! │  duka-terminal command (complete_sale)                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     duka-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ PurchaseRepo  │    │ 001_init.sql │  │   │
//! │  │   │ SqlitePool    │◄───│ SaleRepo      │    │              │  │   │
//! │  │   │               │    │ AdjustmentRepo│    │              │  │   │
//! │  │   │               │    │ ReportRepo ...│    │              │  │   │
//! │  │   └───────────────┘    └───────┬───────┘    └──────────────┘  │   │
//! │  │                                │                                │   │
//! │  │                   stock::{get_or_create, increase,             │   │
//! │  │                           decrease, set_quantity}              │   │
//! │  │                   (only code that writes stocks.quantity)      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (duka.db)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//!
//! ## Usage
//!
//! ```rust,ignore
//! use duka_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/duka.db")).await?;
//!
//! let receipt = db.purchases().complete_purchase(new_purchase).await?;
//! println!("{}", receipt.purchase.invoice_no); // PUR-20240315-0001
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::adjustment::{AdjustmentHistoryRow, AdjustmentReceipt, AdjustmentRepository};
pub use repository::branch::BranchRepository;
pub use repository::category::CategoryRepository;
pub use repository::company::{CompanyRepository, RegisteredCompany};
pub use repository::product::{ProductRepository, RegisteredProduct};
pub use repository::purchase::{PurchaseHistoryRow, PurchaseReceipt, PurchaseRepository};
pub use repository::report::{
    BranchPerformanceReport, DateRange, DeadStockReport, FastMovingReport, ReportRepository,
    SalespersonSummary, StockStatusReport,
};
pub use repository::sale::{SaleHistoryRow, SaleReceipt, SaleRepository};
pub use repository::stock::{LedgerCheck, StockListingRow, StockRepository};
pub use repository::supplier::SupplierRepository;
pub use repository::user::UserRepository;
