//! # Stock Ledger
//!
//! The only code that writes `stocks.quantity`.
//!
//! ## Mutation Primitives
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  get_or_create(P, B)   INSERT .. ON CONFLICT(product_id, branch_id)    │
//! │                        DO NOTHING, then read. Two racing purchases     │
//! │                        converge on one row.                            │
//! │                                                                         │
//! │  increase(S, n, prices?)   quantity = quantity + n                     │
//! │                            prices overwrite (last write wins)          │
//! │                                                                         │
//! │  decrease(S, n)        UPDATE .. SET quantity = quantity - n           │
//! │                        WHERE id = S AND quantity >= n                  │
//! │                        0 rows → InsufficientStock { available }        │
//! │                                                                         │
//! │  set_quantity(S, before, after)                                        │
//! │                        UPDATE .. WHERE id = S AND quantity = before    │
//! │                        0 rows → TransactionFailed (row moved)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every primitive takes the caller's `&mut SqliteConnection`, which in
//! practice is always an open transaction.
//!
//! ## Reconciliation
//! ```text
//! stocks row ──► purchase_items ∪ sale_items ∪ stock_adjustments
//!                      │  (ordered by time, increases first on a tie)
//!                      ▼
//!              ledger::net_quantity ──► expected  == quantity?
//!              ledger::replay       ──► history never below zero?
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{like_pattern, push_scope};
use duka_core::ledger::{net_quantity, replay, Movement};
use duka_core::validation::validate_quantity;
use duka_core::{AdjustmentAction, BranchScope, CoreError, Stock};

// =============================================================================
// Ledger Primitives
// =============================================================================

/// Loads the stock row for a (product, branch) pair.
pub(crate) async fn find(
    conn: &mut SqliteConnection,
    product_id: &str,
    branch_id: &str,
) -> DbResult<Option<Stock>> {
    let stock = sqlx::query_as::<_, Stock>(
        r#"
        SELECT id, product_id, branch_id, buy_price_cents, sell_price_cents,
               quantity, created_at, updated_at
        FROM stocks
        WHERE product_id = ?1 AND branch_id = ?2
        "#,
    )
    .bind(product_id)
    .bind(branch_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(stock)
}

/// Loads a stock row by id.
pub(crate) async fn get(conn: &mut SqliteConnection, stock_id: &str) -> DbResult<Stock> {
    sqlx::query_as::<_, Stock>(
        r#"
        SELECT id, product_id, branch_id, buy_price_cents, sell_price_cents,
               quantity, created_at, updated_at
        FROM stocks
        WHERE id = ?1
        "#,
    )
    .bind(stock_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("Stock", stock_id))
}

/// Returns the existing row or inserts a zero row (quantity 0, prices 0).
pub(crate) async fn get_or_create(
    conn: &mut SqliteConnection,
    product_id: &str,
    branch_id: &str,
    at: DateTime<Utc>,
) -> DbResult<Stock> {
    sqlx::query(
        r#"
        INSERT INTO stocks (
            id, product_id, branch_id,
            buy_price_cents, sell_price_cents, quantity,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, 0, 0, 0, ?4, ?4)
        ON CONFLICT (product_id, branch_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(product_id)
    .bind(branch_id)
    .bind(at)
    .execute(&mut *conn)
    .await?;

    find(conn, product_id, branch_id)
        .await?
        .ok_or_else(|| DbError::Internal(format!("stock row for {product_id} vanished")))
}

/// Inserts a fresh row with explicit prices. Fails on a duplicate pair.
pub(crate) async fn create(
    conn: &mut SqliteConnection,
    product_id: &str,
    branch_id: &str,
    buy_price_cents: i64,
    sell_price_cents: i64,
    at: DateTime<Utc>,
) -> DbResult<Stock> {
    let stock = Stock {
        id: Uuid::new_v4().to_string(),
        product_id: product_id.to_string(),
        branch_id: branch_id.to_string(),
        buy_price_cents,
        sell_price_cents,
        quantity: 0,
        created_at: at,
        updated_at: at,
    };

    sqlx::query(
        r#"
        INSERT INTO stocks (
            id, product_id, branch_id,
            buy_price_cents, sell_price_cents, quantity,
            created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?6)
        "#,
    )
    .bind(&stock.id)
    .bind(&stock.product_id)
    .bind(&stock.branch_id)
    .bind(stock.buy_price_cents)
    .bind(stock.sell_price_cents)
    .bind(at)
    .execute(&mut *conn)
    .await?;

    Ok(stock)
}

/// Adds `amount` units, optionally overwriting (buy, sell) prices.
pub(crate) async fn increase(
    conn: &mut SqliteConnection,
    stock_id: &str,
    amount: i64,
    prices: Option<(i64, i64)>,
    at: DateTime<Utc>,
) -> DbResult<Stock> {
    validate_quantity(amount)?;
    debug!(stock_id = %stock_id, amount, "Increasing stock");

    let (buy, sell) = match prices {
        Some((buy, sell)) => (Some(buy), Some(sell)),
        None => (None, None),
    };

    let result = sqlx::query(
        r#"
        UPDATE stocks SET
            quantity = quantity + ?1,
            buy_price_cents = COALESCE(?2, buy_price_cents),
            sell_price_cents = COALESCE(?3, sell_price_cents),
            updated_at = ?4
        WHERE id = ?5
        "#,
    )
    .bind(amount)
    .bind(buy)
    .bind(sell)
    .bind(at)
    .bind(stock_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Stock", stock_id));
    }

    get(conn, stock_id).await
}

/// Removes `amount` units if and only if that many are on hand.
///
/// The check and the write are one statement, so two checkouts racing for
/// the last units can never both succeed.
pub(crate) async fn decrease(
    conn: &mut SqliteConnection,
    stock_id: &str,
    amount: i64,
    at: DateTime<Utc>,
) -> DbResult<Stock> {
    validate_quantity(amount)?;
    debug!(stock_id = %stock_id, amount, "Decreasing stock");

    let result = sqlx::query(
        r#"
        UPDATE stocks SET
            quantity = quantity - ?1,
            updated_at = ?2
        WHERE id = ?3 AND quantity >= ?1
        "#,
    )
    .bind(amount)
    .bind(at)
    .bind(stock_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        let current = get(conn, stock_id).await?;
        return Err(CoreError::InsufficientStock {
            available: current.quantity,
        }
        .into());
    }

    get(conn, stock_id).await
}

/// Compare-and-swap of the quantity, used by adjustments.
pub(crate) async fn set_quantity(
    conn: &mut SqliteConnection,
    stock_id: &str,
    expected_before: i64,
    new_quantity: i64,
    at: DateTime<Utc>,
) -> DbResult<Stock> {
    let result = sqlx::query(
        r#"
        UPDATE stocks SET
            quantity = ?1,
            updated_at = ?2
        WHERE id = ?3 AND quantity = ?4
        "#,
    )
    .bind(new_quantity)
    .bind(at)
    .bind(stock_id)
    .bind(expected_before)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::TransactionFailed(format!(
            "stock {stock_id} changed during adjustment (expected quantity {expected_before})"
        )));
    }

    get(conn, stock_id).await
}

// =============================================================================
// Read Models
// =============================================================================

/// A stock row joined with its product, category and branch.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct StockListingRow {
    pub stock_id: String,
    pub product_id: String,
    pub product_name: String,
    pub unit: String,
    pub min_stock: i64,
    pub category_name: String,
    pub branch_id: String,
    pub branch_name: String,
    pub quantity: i64,
    pub buy_price_cents: i64,
    pub sell_price_cents: i64,
    pub updated_at: DateTime<Utc>,
}

/// Stored quantity against the quantity implied by recorded movements.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerCheck {
    pub stock_id: String,
    pub product_id: String,
    pub branch_id: String,
    pub quantity: i64,
    pub purchased: i64,
    pub sold: i64,

    /// Net of increase minus decrease adjustments.
    pub adjusted: i64,

    /// Quantity implied by purchases, sales and adjustments.
    pub expected: i64,

    /// Set when replaying the movements in time order takes the row below
    /// zero, e.g. a sale recorded before the purchase that stocked it.
    pub history_error: Option<String>,
}

impl LedgerCheck {
    fn from_movements(row: StockQuantityRow, mut movements: Vec<TimedMovement>) -> Self {
        movements.sort_by_key(|m| (m.at, m.movement.delta() < 0));
        let ordered: Vec<Movement> = movements.into_iter().map(|m| m.movement).collect();

        let (mut purchased, mut sold, mut adjusted) = (0, 0, 0);
        for movement in &ordered {
            match *movement {
                Movement::Purchase(n) => purchased += n,
                Movement::Sale(n) => sold += n,
                Movement::Adjustment(..) => adjusted += movement.delta(),
            }
        }

        LedgerCheck {
            stock_id: row.stock_id,
            product_id: row.product_id,
            branch_id: row.branch_id,
            quantity: row.quantity,
            purchased,
            sold,
            adjusted,
            expected: net_quantity(&ordered),
            history_error: replay(&ordered).err().map(|e| e.to_string()),
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.quantity == self.expected && self.history_error.is_none()
    }
}

#[derive(FromRow)]
struct StockQuantityRow {
    stock_id: String,
    product_id: String,
    branch_id: String,
    quantity: i64,
}

#[derive(FromRow)]
struct MovementRow {
    stock_id: String,
    kind: String,
    quantity: i64,
    at: DateTime<Utc>,
}

struct TimedMovement {
    at: DateTime<Utc>,
    movement: Movement,
}

impl TryFrom<MovementRow> for TimedMovement {
    type Error = DbError;

    fn try_from(row: MovementRow) -> DbResult<Self> {
        let movement = match row.kind.as_str() {
            "purchase" => Movement::Purchase(row.quantity),
            "sale" => Movement::Sale(row.quantity),
            action => Movement::Adjustment(action.parse::<AdjustmentAction>()?, row.quantity),
        };
        Ok(TimedMovement { at: row.at, movement })
    }
}

pub(crate) const LISTING_SELECT: &str = r#"
    SELECT s.id AS stock_id, p.id AS product_id, p.name AS product_name,
           p.unit, p.min_stock, c.name AS category_name,
           b.id AS branch_id, b.name AS branch_name,
           s.quantity, s.buy_price_cents, s.sell_price_cents, s.updated_at
    FROM stocks s
    JOIN products p ON p.id = s.product_id
    JOIN categories c ON c.id = p.category_id
    JOIN branches b ON b.id = s.branch_id
    WHERE "#;

// =============================================================================
// Repository
// =============================================================================

/// Repository for stock ledger reads.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Gets a stock row by ID.
    pub async fn get_by_id(&self, stock_id: &str) -> DbResult<Option<Stock>> {
        let stock = sqlx::query_as::<_, Stock>(
            r#"
            SELECT id, product_id, branch_id, buy_price_cents, sell_price_cents,
                   quantity, created_at, updated_at
            FROM stocks
            WHERE id = ?1
            "#,
        )
        .bind(stock_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stock)
    }

    /// Gets the row for a (product, branch) pair.
    pub async fn find(&self, product_id: &str, branch_id: &str) -> DbResult<Option<Stock>> {
        let mut conn = self.pool.acquire().await?;
        find(&mut conn, product_id, branch_id).await
    }

    /// Stock listing, optionally filtered by product name.
    pub async fn list(
        &self,
        scope: &BranchScope,
        search: Option<&str>,
    ) -> DbResult<Vec<StockListingRow>> {
        let pattern = like_pattern(search)?;
        debug!(?scope, search = ?pattern, "Listing stock");

        let mut qb = QueryBuilder::<Sqlite>::new(LISTING_SELECT);
        push_scope(&mut qb, "s.branch_id", scope);
        if let Some(pattern) = pattern {
            qb.push(" AND p.name LIKE ").push_bind(pattern);
        }
        qb.push(" ORDER BY b.name, p.name");

        let rows = qb
            .build_query_as::<StockListingRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Products with quantity on hand in a branch, for the sale screen.
    pub async fn available_for_sale(
        &self,
        branch_id: &str,
        search: Option<&str>,
    ) -> DbResult<Vec<StockListingRow>> {
        let pattern = like_pattern(search)?;

        let mut qb = QueryBuilder::<Sqlite>::new(LISTING_SELECT);
        qb.push("s.branch_id = ")
            .push_bind(branch_id.to_string())
            .push(" AND s.quantity > 0");
        if let Some(pattern) = pattern {
            qb.push(" AND p.name LIKE ").push_bind(pattern);
        }
        qb.push(" ORDER BY p.name");

        let rows = qb
            .build_query_as::<StockListingRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Recomputes every stock row in scope from its recorded movements.
    ///
    /// Both the net and the time-ordered replay are checked, so a history
    /// that dipped below zero is reported even when the totals agree.
    pub async fn reconcile(&self, scope: &BranchScope) -> DbResult<Vec<LedgerCheck>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT s.id AS stock_id, s.product_id, s.branch_id, s.quantity FROM stocks s WHERE ",
        );
        push_scope(&mut qb, "s.branch_id", scope);
        qb.push(" ORDER BY s.branch_id, s.product_id");

        let rows = qb
            .build_query_as::<StockQuantityRow>()
            .fetch_all(&self.pool)
            .await?;

        let mut movements: HashMap<String, Vec<TimedMovement>> = HashMap::new();
        for row in self.movements(scope).await? {
            movements
                .entry(row.stock_id.clone())
                .or_default()
                .push(TimedMovement::try_from(row)?);
        }

        let checks: Vec<LedgerCheck> = rows
            .into_iter()
            .map(|row| {
                let history = movements.remove(&row.stock_id).unwrap_or_default();
                LedgerCheck::from_movements(row, history)
            })
            .collect();

        debug!(rows = checks.len(), "Ledger reconciled");
        Ok(checks)
    }

    /// Every purchase, sale and adjustment line against a stock row in scope.
    async fn movements(&self, scope: &BranchScope) -> DbResult<Vec<MovementRow>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT s.id AS stock_id, 'purchase' AS kind, pi.quantity, pu.purchased_at AS at
            FROM purchase_items pi
            JOIN purchases pu ON pu.id = pi.purchase_id
            JOIN stocks s ON s.product_id = pi.product_id AND s.branch_id = pu.branch_id
            WHERE "#,
        );
        push_scope(&mut qb, "s.branch_id", scope);
        qb.push(
            r#"
            UNION ALL
            SELECT s.id, 'sale', si.quantity, sa.sold_at
            FROM sale_items si
            JOIN sales sa ON sa.id = si.sale_id
            JOIN stocks s ON s.product_id = si.product_id AND s.branch_id = sa.branch_id
            WHERE "#,
        );
        push_scope(&mut qb, "s.branch_id", scope);
        qb.push(
            r#"
            UNION ALL
            SELECT a.stock_id, a.action, a.quantity, a.created_at
            FROM stock_adjustments a
            JOIN stocks s ON s.id = a.stock_id
            WHERE "#,
        );
        push_scope(&mut qb, "s.branch_id", scope);

        let rows = qb
            .build_query_as::<MovementRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::Fixture;
    use chrono::TimeZone;
    use duka_core::{AdjustmentType, NewAdjustment, NewSale, SaleLineInput};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, hour, 0, 0).unwrap()
    }

    fn sale_of(fx: &Fixture, quantity: i64) -> NewSale {
        NewSale {
            branch_id: fx.branch_id.clone(),
            user_id: fx.seller_id.clone(),
            lines: vec![SaleLineInput {
                product_id: fx.product_id.clone(),
                product_name: "Sugar 1kg".into(),
                quantity,
                unit_price_cents: 6500,
            }],
        }
    }

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let fx = Fixture::new().await;
        let mut conn = fx.db.pool().acquire().await.unwrap();
        let now = Utc::now();

        let first = get_or_create(&mut conn, &fx.product_id, &fx.branch_id, now)
            .await
            .unwrap();
        let second = get_or_create(&mut conn, &fx.product_id, &fx.branch_id, now)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.quantity, 0);
        assert_eq!(first.sell_price_cents, 0);
    }

    #[tokio::test]
    async fn test_decrease_is_conditional() {
        let fx = Fixture::new().await;
        let stock = fx.stock_with(5, 100, 130).await;
        let mut conn = fx.db.pool().acquire().await.unwrap();
        let now = Utc::now();

        let err = decrease(&mut conn, &stock.id, 6, now).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { available: 5 })
        ));

        let after = decrease(&mut conn, &stock.id, 5, now).await.unwrap();
        assert_eq!(after.quantity, 0);
    }

    #[tokio::test]
    async fn test_increase_overwrites_prices_only_when_given() {
        let fx = Fixture::new().await;
        let stock = fx.stock_with(2, 100, 130).await;
        let mut conn = fx.db.pool().acquire().await.unwrap();
        let now = Utc::now();

        let s = increase(&mut conn, &stock.id, 3, None, now).await.unwrap();
        assert_eq!((s.quantity, s.buy_price_cents, s.sell_price_cents), (5, 100, 130));

        let s = increase(&mut conn, &stock.id, 1, Some((90, 150)), now)
            .await
            .unwrap();
        assert_eq!((s.quantity, s.buy_price_cents, s.sell_price_cents), (6, 90, 150));
    }

    #[tokio::test]
    async fn test_set_quantity_rejects_stale_before() {
        let fx = Fixture::new().await;
        let stock = fx.stock_with(10, 100, 130).await;
        let mut conn = fx.db.pool().acquire().await.unwrap();

        let err = set_quantity(&mut conn, &stock.id, 9, 4, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::TransactionFailed(_)));

        let s = set_quantity(&mut conn, &stock.id, 10, 4, Utc::now())
            .await
            .unwrap();
        assert_eq!(s.quantity, 4);
    }

    #[tokio::test]
    async fn test_quantity_check_constraint_backs_the_ledger() {
        let fx = Fixture::new().await;
        let stock = fx.stock_with(1, 100, 130).await;

        let result = sqlx::query("UPDATE stocks SET quantity = -1 WHERE id = ?1")
            .bind(&stock.id)
            .execute(fx.db.pool())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_listing_respects_scope_and_search() {
        let fx = Fixture::new().await;
        fx.stock_with(4, 100, 130).await;
        let other = fx.product_named("Bread").await;
        fx.stock_for(&other, &fx.other_branch_id, 0, 50, 65).await;

        let stocks = fx.db.stocks();
        let all = stocks
            .list(&BranchScope::Company(fx.company_id.clone()), None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let main = stocks
            .list(&BranchScope::Branch(fx.branch_id.clone()), None)
            .await
            .unwrap();
        assert_eq!(main.len(), 1);
        assert_eq!(main[0].product_name, "Sugar 1kg");

        let bread = stocks
            .list(&BranchScope::All, Some("brea"))
            .await
            .unwrap();
        assert_eq!(bread.len(), 1);

        let sellable = stocks
            .available_for_sale(&fx.other_branch_id, None)
            .await
            .unwrap();
        assert!(sellable.is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_replays_every_movement_kind() {
        let fx = Fixture::new().await;
        fx.db
            .purchases()
            .complete_purchase_at(fx.purchase_of(&[(fx.product_id.as_str(), 20, 5000)]), at(9))
            .await
            .unwrap();
        fx.db.sales().complete_sale_at(sale_of(&fx, 4), at(10)).await.unwrap();
        fx.db
            .adjustments()
            .save_adjustment_at(
                NewAdjustment {
                    product_id: fx.product_id.clone(),
                    branch_id: fx.branch_id.clone(),
                    user_id: fx.admin_id.clone(),
                    adjustment_type: AdjustmentType::Expired,
                    action: AdjustmentAction::Decrease,
                    quantity: 3,
                    reason: None,
                },
                at(11),
            )
            .await
            .unwrap();

        let checks = fx.db.stocks().reconcile(&BranchScope::All).await.unwrap();
        assert_eq!(checks.len(), 1);
        let check = &checks[0];
        assert_eq!((check.purchased, check.sold, check.adjusted), (20, 4, -3));
        assert_eq!((check.quantity, check.expected), (13, 13));
        assert!(check.history_error.is_none());
        assert!(check.is_consistent());
    }

    #[tokio::test]
    async fn test_reconcile_flags_history_that_went_negative() {
        // Stocked at 10:00, but a sale was recorded at 09:00. The totals
        // agree with the row; the order does not.
        let fx = Fixture::new().await;
        fx.db
            .purchases()
            .complete_purchase_at(fx.purchase_of(&[(fx.product_id.as_str(), 5, 5000)]), at(10))
            .await
            .unwrap();
        fx.db.sales().complete_sale_at(sale_of(&fx, 1), at(9)).await.unwrap();

        let check = fx
            .db
            .stocks()
            .reconcile(&BranchScope::Branch(fx.branch_id.clone()))
            .await
            .unwrap()
            .remove(0);
        assert_eq!((check.quantity, check.expected), (4, 4));
        assert_eq!(
            check.history_error.as_deref(),
            Some("Insufficient stock. Available: 0")
        );
        assert!(!check.is_consistent());
    }

    #[tokio::test]
    async fn test_reconcile_same_instant_applies_increases_first() {
        let fx = Fixture::new().await;
        fx.db
            .purchases()
            .complete_purchase_at(fx.purchase_of(&[(fx.product_id.as_str(), 2, 5000)]), at(9))
            .await
            .unwrap();
        fx.db.sales().complete_sale_at(sale_of(&fx, 2), at(9)).await.unwrap();

        let checks = fx.db.stocks().reconcile(&BranchScope::All).await.unwrap();
        assert!(checks[0].is_consistent());
    }

    #[tokio::test]
    async fn test_reconcile_flags_rows_written_outside_the_ledger() {
        let fx = Fixture::new().await;
        fx.stock_with(4, 100, 130).await;
        let bread = fx.product_named("Bread").await;
        fx.stock_for(&bread, &fx.other_branch_id, 0, 50, 65).await;

        let checks = fx.db.stocks().reconcile(&BranchScope::All).await.unwrap();
        assert_eq!(checks.len(), 2);

        let sugar = checks.iter().find(|c| c.product_id == fx.product_id).unwrap();
        assert_eq!((sugar.quantity, sugar.expected), (4, 0));
        assert!(sugar.history_error.is_none());
        assert!(!sugar.is_consistent());

        let bread = checks.iter().find(|c| c.product_id == bread).unwrap();
        assert!(bread.is_consistent());

        let other = fx
            .db
            .stocks()
            .reconcile(&BranchScope::Branch(fx.other_branch_id.clone()))
            .await
            .unwrap();
        assert_eq!(other.len(), 1);
    }
}
