//! # Purchase Repository
//!
//! Supplier intake: one header, N items, N stock increases, one transaction.
//!
//! ## Complete Purchase
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NewPurchase { supplier, branch, user, lines }                         │
//! │       │                                                                 │
//! │       ├── lines empty?                    → CartEmpty (nothing opened)  │
//! │       ├── quantities / prices valid?      → ValidationError             │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │       ├── supplier, branch, user, products exist?  → NotFound           │
//! │       ├── PUR-YYYYMMDD-NNNN from invoice_counters                       │
//! │       ├── INSERT purchases (total = Σ qty × buy)                        │
//! │       └── for each line:                                                │
//! │             INSERT purchase_items                                       │
//! │             stock::get_or_create(product, branch)                       │
//! │             stock::increase(qty, buy, sell)                             │
//! │  COMMIT  (any failure: ROLLBACK, nothing persisted)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::{begin, ensure_exists, finish, invoice, like_pattern, push_scope, stock};
use duka_core::validation::{validate_id, validate_price_cents, validate_quantity};
use duka_core::{
    BranchScope, CoreError, InvoiceKind, NewPurchase, Purchase, PurchaseItem, Stock,
};

/// Result of a committed purchase.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseReceipt {
    pub purchase: Purchase,
    pub items: Vec<PurchaseItem>,

    /// Stock rows after the increase, in line order.
    pub stocks: Vec<Stock>,
}

/// One row of the purchase history screen.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PurchaseHistoryRow {
    pub id: String,
    pub invoice_no: String,
    pub supplier_id: String,
    pub supplier_name: String,
    pub branch_id: String,
    pub branch_name: String,
    pub user_name: String,
    pub total_cents: i64,
    pub item_count: i64,
    pub purchased_at: DateTime<Utc>,
}

/// Repository for purchase database operations.
#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Commits a purchase now.
    pub async fn complete_purchase(&self, purchase: NewPurchase) -> DbResult<PurchaseReceipt> {
        self.complete_purchase_at(purchase, Utc::now()).await
    }

    /// Commits a purchase stamped `at` (the invoice day comes from `at`).
    pub async fn complete_purchase_at(
        &self,
        purchase: NewPurchase,
        at: DateTime<Utc>,
    ) -> DbResult<PurchaseReceipt> {
        validate_new_purchase(&purchase)?;

        debug!(
            branch_id = %purchase.branch_id,
            supplier_id = %purchase.supplier_id,
            lines = purchase.lines.len(),
            "Completing purchase"
        );

        let mut tx = begin(&self.pool).await?;
        let result = write_purchase(&mut tx, &purchase, at).await;
        let receipt = finish(tx, result, "purchase").await?;

        info!(
            invoice_no = %receipt.purchase.invoice_no,
            branch_id = %receipt.purchase.branch_id,
            total_cents = receipt.purchase.total_cents,
            "Purchase completed"
        );
        Ok(receipt)
    }

    /// Gets a purchase header by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Purchase>> {
        let purchase = sqlx::query_as::<_, Purchase>(
            r#"
            SELECT id, supplier_id, branch_id, user_id, invoice_no, total_cents, purchased_at
            FROM purchases
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(purchase)
    }

    /// Gets all items for a purchase.
    pub async fn items(&self, purchase_id: &str) -> DbResult<Vec<PurchaseItem>> {
        let items = sqlx::query_as::<_, PurchaseItem>(
            r#"
            SELECT id, purchase_id, product_id, quantity,
                   buy_price_cents, sell_price_cents, line_total_cents
            FROM purchase_items
            WHERE purchase_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Latest purchases first, searchable by invoice number or supplier name.
    pub async fn list_recent(
        &self,
        scope: &BranchScope,
        search: Option<&str>,
        limit: i64,
    ) -> DbResult<Vec<PurchaseHistoryRow>> {
        let pattern = like_pattern(search)?;

        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT pu.id, pu.invoice_no, pu.supplier_id, su.name AS supplier_name,
                   pu.branch_id, b.name AS branch_name, u.name AS user_name,
                   pu.total_cents,
                   (SELECT COUNT(*) FROM purchase_items pi WHERE pi.purchase_id = pu.id) AS item_count,
                   pu.purchased_at
            FROM purchases pu
            JOIN suppliers su ON su.id = pu.supplier_id
            JOIN branches b ON b.id = pu.branch_id
            JOIN users u ON u.id = pu.user_id
            WHERE "#,
        );
        push_scope(&mut qb, "pu.branch_id", scope);
        if let Some(pattern) = pattern {
            qb.push(" AND (pu.invoice_no LIKE ")
                .push_bind(pattern.clone())
                .push(" OR su.name LIKE ")
                .push_bind(pattern)
                .push(")");
        }
        qb.push(" ORDER BY pu.purchased_at DESC, pu.invoice_no DESC LIMIT ")
            .push_bind(limit.max(1));

        let rows = qb
            .build_query_as::<PurchaseHistoryRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}

fn validate_new_purchase(purchase: &NewPurchase) -> DbResult<()> {
    if purchase.lines.is_empty() {
        return Err(CoreError::CartEmpty.into());
    }

    validate_id("supplier", &purchase.supplier_id)?;
    validate_id("branch", &purchase.branch_id)?;

    for line in &purchase.lines {
        validate_quantity(line.quantity)?;
        validate_price_cents("buy_price", line.buy_price_cents)?;
        validate_price_cents("sell_price", line.sell_price_cents)?;
    }
    purchase.total()?;
    Ok(())
}

async fn write_purchase(
    conn: &mut SqliteConnection,
    new: &NewPurchase,
    at: DateTime<Utc>,
) -> DbResult<PurchaseReceipt> {
    ensure_exists(conn, "suppliers", "Supplier", &new.supplier_id).await?;
    ensure_exists(conn, "branches", "Branch", &new.branch_id).await?;
    ensure_exists(conn, "users", "User", &new.user_id).await?;
    for line in &new.lines {
        ensure_exists(conn, "products", "Product", &line.product_id).await?;
    }

    let purchase = Purchase {
        id: Uuid::new_v4().to_string(),
        supplier_id: new.supplier_id.clone(),
        branch_id: new.branch_id.clone(),
        user_id: new.user_id.clone(),
        invoice_no: invoice::next_invoice_number(conn, InvoiceKind::Purchase, at).await?,
        total_cents: new.total()?.cents(),
        purchased_at: at,
    };

    sqlx::query(
        r#"
        INSERT INTO purchases (
            id, supplier_id, branch_id, user_id, invoice_no, total_cents, purchased_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&purchase.id)
    .bind(&purchase.supplier_id)
    .bind(&purchase.branch_id)
    .bind(&purchase.user_id)
    .bind(&purchase.invoice_no)
    .bind(purchase.total_cents)
    .bind(purchase.purchased_at)
    .execute(&mut *conn)
    .await?;

    let mut items = Vec::with_capacity(new.lines.len());
    let mut stocks = Vec::with_capacity(new.lines.len());

    for line in &new.lines {
        let item = PurchaseItem {
            id: Uuid::new_v4().to_string(),
            purchase_id: purchase.id.clone(),
            product_id: line.product_id.clone(),
            quantity: line.quantity,
            buy_price_cents: line.buy_price_cents,
            sell_price_cents: line.sell_price_cents,
            line_total_cents: line.line_total()?.cents(),
        };

        sqlx::query(
            r#"
            INSERT INTO purchase_items (
                id, purchase_id, product_id, quantity,
                buy_price_cents, sell_price_cents, line_total_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.purchase_id)
        .bind(&item.product_id)
        .bind(item.quantity)
        .bind(item.buy_price_cents)
        .bind(item.sell_price_cents)
        .bind(item.line_total_cents)
        .execute(&mut *conn)
        .await?;

        let row = stock::get_or_create(conn, &line.product_id, &new.branch_id, at).await?;
        let row = stock::increase(
            conn,
            &row.id,
            line.quantity,
            Some((line.buy_price_cents, line.sell_price_cents)),
            at,
        )
        .await?;

        items.push(item);
        stocks.push(row);
    }

    Ok(PurchaseReceipt {
        purchase,
        items,
        stocks,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
