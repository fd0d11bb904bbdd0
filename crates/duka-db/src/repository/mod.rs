//! # Repository Module
//!
//! Database repository implementations for Duka.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Layout                                    │
//! │                                                                         │
//! │  Command                                                               │
//! │       │  db.sales().complete_sale(new_sale)                            │
//! │       ▼                                                                 │
//! │  SaleRepository ──── pool.begin() ────────────────┐                    │
//! │       │                                           │ one transaction    │
//! │       ├── invoice::next_invoice_number(&mut tx)   │                    │
//! │       ├── INSERT sales / sale_items               │                    │
//! │       └── stock::decrease(&mut tx, ..)            │                    │
//! │                                                   ▼                    │
//! │                                       finish(tx) → commit | rollback   │
//! │                                                                         │
//! │  Ledger helpers take `&mut SqliteConnection` so they only ever run on  │
//! │  the caller's transaction, never on a second pooled connection.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`PurchaseRepository`](purchase::PurchaseRepository) - Supplier intake
//! - [`SaleRepository`](sale::SaleRepository) - Checkout
//! - [`AdjustmentRepository`](adjustment::AdjustmentRepository) - Manual corrections
//! - [`StockRepository`](stock::StockRepository) - Ledger reads and reconciliation
//! - [`ReportRepository`](report::ReportRepository) - Read-only aggregations
//! - Catalog: products, categories, branches, suppliers
//! - Accounts: companies, users

pub mod adjustment;
pub mod branch;
pub mod category;
pub mod company;
pub mod invoice;
pub mod product;
pub mod purchase;
pub mod report;
pub mod sale;
pub mod stock;
pub mod supplier;
pub mod user;

#[cfg(test)]
pub(crate) mod test_support;

pub use adjustment::AdjustmentRepository;
pub use branch::BranchRepository;
pub use category::CategoryRepository;
pub use company::CompanyRepository;
pub use product::ProductRepository;
pub use purchase::PurchaseRepository;
pub use report::ReportRepository;
pub use sale::SaleRepository;
pub use stock::StockRepository;
pub use supplier::SupplierRepository;
pub use user::UserRepository;

use duka_core::BranchScope;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::warn;

use crate::error::{DbError, DbResult};

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Opens a transaction for an atomic operation.
pub(crate) async fn begin(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    pool.begin()
        .await
        .map_err(|e| DbError::from(e).in_transaction())
}

/// Commits on success, rolls back on failure.
///
/// Failures come back through [`DbError::in_transaction`], so anything that
/// is not a rule violation surfaces as `TransactionFailed`.
pub(crate) async fn finish<T>(
    tx: Transaction<'static, Sqlite>,
    result: DbResult<T>,
    operation: &'static str,
) -> DbResult<T> {
    match result {
        Ok(value) => {
            tx.commit()
                .await
                .map_err(|e| DbError::from(e).in_transaction())?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(operation, error = %rollback_err, "Rollback failed");
            }
            warn!(operation, error = %err, "Operation rolled back");
            Err(err.in_transaction())
        }
    }
}

// =============================================================================
// Query Helpers
// =============================================================================

/// Fails with `NotFound` unless `table` has a row with this id.
pub(crate) async fn ensure_exists(
    conn: &mut SqliteConnection,
    table: &'static str,
    entity: &'static str,
    id: &str,
) -> DbResult<()> {
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE id = ?1");
    let count: i64 = sqlx::query_scalar(&sql)
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;

    if count == 0 {
        return Err(DbError::not_found(entity, id));
    }
    Ok(())
}

/// Appends a branch filter on `branch_column`.
///
/// ```text
/// All          → 1 = 1
/// Company(c)   → <col> IN (SELECT id FROM branches WHERE company_id = ?)
/// Branch(b)    → <col> = ?
/// ```
pub(crate) fn push_scope(
    qb: &mut QueryBuilder<'_, Sqlite>,
    branch_column: &str,
    scope: &BranchScope,
) {
    match scope {
        BranchScope::All => {
            qb.push("1 = 1");
        }
        BranchScope::Company(company_id) => {
            qb.push(branch_column)
                .push(" IN (SELECT id FROM branches WHERE company_id = ")
                .push_bind(company_id.clone())
                .push(")");
        }
        BranchScope::Branch(branch_id) => {
            qb.push(branch_column).push(" = ").push_bind(branch_id.clone());
        }
    }
}

/// `%query%` for LIKE, or None for a blank search box.
pub(crate) fn like_pattern(search: Option<&str>) -> DbResult<Option<String>> {
    match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(query) => {
            let query = duka_core::validation::validate_search_query(query)?;
            Ok(Some(format!("%{query}%")))
        }
        None => Ok(None),
    }
}
