//! # Adjustment Repository
//!
//! Manual stock corrections with a before/after audit row.
//!
//! ## Save Adjustment
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NewAdjustment { product, branch, type, action, qty, reason? }         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │       ├── Stock(product, branch)?                                       │
//! │       │     absent + Decrease → NoStockRecord                           │
//! │       │     absent + Increase → zero row                                │
//! │       ├── ledger::plan_adjustment(before, action, qty)                  │
//! │       │     negative → InsufficientStock { available: before }          │
//! │       ├── INSERT stock_adjustments (before, after)                      │
//! │       └── stock::set_quantity(before → after)  compare-and-swap         │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Adjustment rows are append-only; the schema rejects UPDATE and DELETE.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::{begin, ensure_exists, finish, like_pattern, push_scope, stock};
use duka_core::ledger::plan_adjustment;
use duka_core::validation::{validate_id, validate_quantity, validate_reason};
use duka_core::{
    AdjustmentAction, AdjustmentType, BranchScope, CoreError, NewAdjustment, Stock,
    StockAdjustment,
};

/// Result of a committed adjustment.
#[derive(Debug, Clone, Serialize)]
pub struct AdjustmentReceipt {
    pub adjustment: StockAdjustment,
    pub stock: Stock,
}

/// One row of the adjustment history screen.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdjustmentHistoryRow {
    pub id: String,
    pub stock_id: String,
    pub product_id: String,
    pub product_name: String,
    pub branch_id: String,
    pub branch_name: String,
    pub user_name: String,
    pub adjustment_type: AdjustmentType,
    pub action: AdjustmentAction,
    pub quantity: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Repository for stock adjustments.
#[derive(Debug, Clone)]
pub struct AdjustmentRepository {
    pool: SqlitePool,
}

impl AdjustmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AdjustmentRepository { pool }
    }

    /// Applies and records an adjustment.
    pub async fn save_adjustment(&self, adjustment: NewAdjustment) -> DbResult<AdjustmentReceipt> {
        self.save_adjustment_at(adjustment, Utc::now()).await
    }

    pub async fn save_adjustment_at(
        &self,
        adjustment: NewAdjustment,
        at: DateTime<Utc>,
    ) -> DbResult<AdjustmentReceipt> {
        debug!(
            product_id = %adjustment.product_id,
            branch_id = %adjustment.branch_id,
            action = ?adjustment.action,
            quantity = adjustment.quantity,
            "Saving adjustment"
        );

        let mut tx = begin(&self.pool).await?;
        let result = apply(&mut tx, &adjustment, at).await;
        let receipt = finish(tx, result, "adjustment").await?;

        info!(
            stock_id = %receipt.stock.id,
            adjustment_type = %receipt.adjustment.adjustment_type,
            before = receipt.adjustment.quantity_before,
            after = receipt.adjustment.quantity_after,
            "Stock adjusted"
        );
        Ok(receipt)
    }

    /// Adjustment history, newest first.
    ///
    /// Search matches product name, adjustment type or reason.
    pub async fn list(
        &self,
        scope: &BranchScope,
        search: Option<&str>,
        limit: i64,
    ) -> DbResult<Vec<AdjustmentHistoryRow>> {
        let pattern = like_pattern(search)?;

        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT a.id, a.stock_id, p.id AS product_id, p.name AS product_name,
                   b.id AS branch_id, b.name AS branch_name, u.name AS user_name,
                   a.adjustment_type, a.action, a.quantity,
                   a.quantity_before, a.quantity_after, a.reason, a.created_at
            FROM stock_adjustments a
            JOIN stocks s ON s.id = a.stock_id
            JOIN products p ON p.id = s.product_id
            JOIN branches b ON b.id = s.branch_id
            JOIN users u ON u.id = a.user_id
            WHERE "#,
        );
        push_scope(&mut qb, "s.branch_id", scope);
        if let Some(pattern) = pattern {
            qb.push(" AND (p.name LIKE ")
                .push_bind(pattern.clone())
                .push(" OR a.adjustment_type LIKE ")
                .push_bind(pattern.clone())
                .push(" OR a.reason LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY a.created_at DESC, a.rowid DESC LIMIT ")
            .push_bind(limit.max(1));

        let rows = qb
            .build_query_as::<AdjustmentHistoryRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// All adjustments for one stock row, oldest first.
    pub async fn history_for_stock(&self, stock_id: &str) -> DbResult<Vec<StockAdjustment>> {
        let rows = sqlx::query_as::<_, StockAdjustment>(
            r#"
            SELECT id, stock_id, user_id, adjustment_type, action, quantity,
                   quantity_before, quantity_after, reason, created_at
            FROM stock_adjustments
            WHERE stock_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(stock_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

/// Applies an adjustment on the caller's transaction.
///
/// Also used for opening stock when a product is registered.
pub(crate) async fn apply(
    conn: &mut SqliteConnection,
    new: &NewAdjustment,
    at: DateTime<Utc>,
) -> DbResult<AdjustmentReceipt> {
    validate_id("product", &new.product_id)?;
    validate_id("branch", &new.branch_id)?;
    validate_quantity(new.quantity)?;
    let reason = validate_reason(new.reason.as_deref())?;

    ensure_exists(conn, "users", "User", &new.user_id).await?;

    let current = match stock::find(conn, &new.product_id, &new.branch_id).await? {
        Some(row) => row,
        None => match new.action {
            AdjustmentAction::Decrease => {
                return Err(CoreError::no_stock(&new.product_id, &new.branch_id).into())
            }
            AdjustmentAction::Increase => {
                ensure_exists(conn, "products", "Product", &new.product_id).await?;
                ensure_exists(conn, "branches", "Branch", &new.branch_id).await?;
                stock::get_or_create(conn, &new.product_id, &new.branch_id, at).await?
            }
        },
    };

    let plan = plan_adjustment(current.quantity, new.action, new.quantity)?;

    let adjustment = StockAdjustment {
        id: Uuid::new_v4().to_string(),
        stock_id: current.id.clone(),
        user_id: new.user_id.clone(),
        adjustment_type: new.adjustment_type,
        action: new.action,
        quantity: new.quantity,
        quantity_before: plan.quantity_before,
        quantity_after: plan.quantity_after,
        reason,
        created_at: at,
    };

    sqlx::query(
        r#"
        INSERT INTO stock_adjustments (
            id, stock_id, user_id, adjustment_type, action, quantity,
            quantity_before, quantity_after, reason, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&adjustment.id)
    .bind(&adjustment.stock_id)
    .bind(&adjustment.user_id)
    .bind(adjustment.adjustment_type)
    .bind(adjustment.action)
    .bind(adjustment.quantity)
    .bind(adjustment.quantity_before)
    .bind(adjustment.quantity_after)
    .bind(&adjustment.reason)
    .bind(adjustment.created_at)
    .execute(&mut *conn)
    .await?;

    let stock = stock::set_quantity(
        conn,
        &current.id,
        plan.quantity_before,
        plan.quantity_after,
        at,
    )
    .await?;

    Ok(AdjustmentReceipt { adjustment, stock })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::Fixture;
    use crate::DbError;

    fn request(fx: &Fixture, action: AdjustmentAction, quantity: i64) -> NewAdjustment {
        NewAdjustment {
            product_id: fx.product_id.clone(),
            branch_id: fx.branch_id.clone(),
            user_id: fx.admin_id.clone(),
            adjustment_type: AdjustmentType::Damaged,
            action,
            quantity,
            reason: Some("water damage".into()),
        }
    }

    #[tokio::test]
    async fn test_decrease_records_before_and_after() {
        // Stock 10, decrease 3 (damaged) → before 10, after 7
        let fx = Fixture::new().await;
        let stock = fx.stock_with(10, 100, 130).await;

        let receipt = fx
            .db
            .adjustments()
            .save_adjustment(request(&fx, AdjustmentAction::Decrease, 3))
            .await
            .unwrap();

        assert_eq!(receipt.adjustment.quantity_before, 10);
        assert_eq!(receipt.adjustment.quantity_after, 7);
        assert_eq!(receipt.stock.quantity, 7);
        assert_eq!(receipt.stock.id, stock.id);

        let history = fx.db.adjustments().history_for_stock(&stock.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].quantity_after, receipt.stock.quantity);
    }

    #[tokio::test]
    async fn test_decrease_below_zero_leaves_no_trace() {
        let fx = Fixture::new().await;
        let stock = fx.stock_with(2, 100, 130).await;

        let err = fx
            .db
            .adjustments()
            .save_adjustment(request(&fx, AdjustmentAction::Decrease, 5))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { available: 2 })
        ));
        assert_eq!(fx.quantity_of(&stock.id).await, 2);
        assert!(fx.db.adjustments().history_for_stock(&stock.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_row_decrease_vs_increase() {
        let fx = Fixture::new().await;
        let adjustments = fx.db.adjustments();

        let err = adjustments
            .save_adjustment(request(&fx, AdjustmentAction::Decrease, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::NoStockRecord { .. })));

        let receipt = adjustments
            .save_adjustment(request(&fx, AdjustmentAction::Increase, 4))
            .await
            .unwrap();
        assert_eq!(receipt.adjustment.quantity_before, 0);
        assert_eq!(receipt.stock.quantity, 4);
        assert_eq!(receipt.stock.sell_price_cents, 0);
    }

    #[tokio::test]
    async fn test_zero_quantity_is_a_validation_error() {
        let fx = Fixture::new().await;
        fx.stock_with(2, 100, 130).await;

        let err = fx
            .db
            .adjustments()
            .save_adjustment(request(&fx, AdjustmentAction::Increase, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_adjustment_rows_are_append_only() {
        let fx = Fixture::new().await;
        fx.stock_with(10, 100, 130).await;
        let receipt = fx
            .db
            .adjustments()
            .save_adjustment(request(&fx, AdjustmentAction::Decrease, 1))
            .await
            .unwrap();

        let update = sqlx::query("UPDATE stock_adjustments SET quantity = 2 WHERE id = ?1")
            .bind(&receipt.adjustment.id)
            .execute(fx.db.pool())
            .await;
        assert!(update.is_err());

        let delete = sqlx::query("DELETE FROM stock_adjustments WHERE id = ?1")
            .bind(&receipt.adjustment.id)
            .execute(fx.db.pool())
            .await;
        assert!(delete.is_err());
    }

    #[tokio::test]
    async fn test_history_search_matches_type_and_reason() {
        let fx = Fixture::new().await;
        fx.stock_with(10, 100, 130).await;
        let adjustments = fx.db.adjustments();
        adjustments
            .save_adjustment(request(&fx, AdjustmentAction::Decrease, 1))
            .await
            .unwrap();

        let scope = BranchScope::Company(fx.company_id.clone());
        assert_eq!(adjustments.list(&scope, Some("damaged"), 50).await.unwrap().len(), 1);
        assert_eq!(adjustments.list(&scope, Some("water"), 50).await.unwrap().len(), 1);
        assert_eq!(adjustments.list(&scope, Some("sugar"), 50).await.unwrap().len(), 1);
        assert!(adjustments.list(&scope, Some("expired"), 50).await.unwrap().is_empty());
    }
}
