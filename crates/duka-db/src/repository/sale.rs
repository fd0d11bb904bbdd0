//! # Sale Repository
//!
//! Checkout: one header, N items, N conditional stock decrements.
//!
//! ## Complete Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NewSale { branch, user, lines }                                       │
//! │       │                                                                 │
//! │       ├── lines empty?  → CartEmpty                                     │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │       ├── INV-YYYYMMDD-NNNN                                             │
//! │       ├── INSERT sales                                                  │
//! │       └── for each line:                                                │
//! │             stock row for (product, branch)?  no → NoStockRecord        │
//! │             INSERT sale_items (name + unit price snapshot)              │
//! │             UPDATE stocks SET quantity = quantity - n                   │
//! │               WHERE id = ? AND quantity >= n                            │
//! │               0 rows → InsufficientStock { available }                  │
//! │  COMMIT  (any failure: ROLLBACK, including earlier lines)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cart's stock check is advisory. The conditional decrement is the
//! authoritative one: two cashiers racing for the last unit get exactly one
//! success.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::{begin, ensure_exists, finish, invoice, like_pattern, push_scope, stock};
use duka_core::validation::{validate_id, validate_name, validate_price_cents, validate_quantity};
use duka_core::invoice::InvoiceNumber;
use duka_core::{
    BranchScope, CoreError, InvoiceKind, NewSale, Sale, SaleItem, Stock, ValidationError,
};

/// Result of a committed sale.
#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    pub sale: Sale,
    pub items: Vec<SaleItem>,

    /// Stock rows after the decrement, in line order.
    pub stocks: Vec<Stock>,
}

/// One row of the sales history screen.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SaleHistoryRow {
    pub id: String,
    pub invoice_no: String,
    pub branch_id: String,
    pub branch_name: String,
    pub user_id: String,
    pub user_name: String,
    pub total_cents: i64,
    pub item_count: i64,
    pub sold_at: DateTime<Utc>,
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Commits a sale now.
    pub async fn complete_sale(&self, sale: NewSale) -> DbResult<SaleReceipt> {
        self.complete_sale_at(sale, Utc::now()).await
    }

    /// Commits a sale stamped `at` (the invoice day comes from `at`).
    pub async fn complete_sale_at(&self, sale: NewSale, at: DateTime<Utc>) -> DbResult<SaleReceipt> {
        validate_new_sale(&sale)?;

        debug!(
            branch_id = %sale.branch_id,
            user_id = %sale.user_id,
            lines = sale.lines.len(),
            "Completing sale"
        );

        let mut tx = begin(&self.pool).await?;
        let result = write_sale(&mut tx, &sale, at).await;
        let receipt = finish(tx, result, "sale").await?;

        info!(
            invoice_no = %receipt.sale.invoice_no,
            branch_id = %receipt.sale.branch_id,
            total_cents = receipt.sale.total_cents,
            "Sale completed"
        );
        Ok(receipt)
    }

    /// Gets a sale header by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, branch_id, user_id, invoice_no, total_cents, sold_at
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets a sale header by invoice number.
    ///
    /// Anything that is not an `INV-YYYYMMDD-NNNN` number fails validation
    /// instead of coming back empty.
    pub async fn get_by_invoice(&self, invoice_no: &str) -> DbResult<Option<Sale>> {
        let number: InvoiceNumber = invoice_no.parse()?;
        if number.kind != InvoiceKind::Sale {
            return Err(ValidationError::InvalidFormat {
                field: "invoice_no".to_string(),
                reason: format!("{} is not a sale invoice", number),
            }
            .into());
        }

        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, branch_id, user_id, invoice_no, total_cents, sold_at
            FROM sales
            WHERE invoice_no = ?1
            "#,
        )
        .bind(number.to_string())
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets all items for a sale.
    pub async fn items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, product_id, product_name, quantity,
                   unit_price_cents, line_total_cents
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY rowid
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Latest sales first, searchable by invoice number.
    pub async fn list_recent(
        &self,
        scope: &BranchScope,
        search: Option<&str>,
        limit: i64,
    ) -> DbResult<Vec<SaleHistoryRow>> {
        let pattern = like_pattern(search)?;

        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT sa.id, sa.invoice_no, sa.branch_id, b.name AS branch_name,
                   sa.user_id, u.name AS user_name, sa.total_cents,
                   (SELECT COUNT(*) FROM sale_items si WHERE si.sale_id = sa.id) AS item_count,
                   sa.sold_at
            FROM sales sa
            JOIN branches b ON b.id = sa.branch_id
            JOIN users u ON u.id = sa.user_id
            WHERE "#,
        );
        push_scope(&mut qb, "sa.branch_id", scope);
        if let Some(pattern) = pattern {
            qb.push(" AND sa.invoice_no LIKE ").push_bind(pattern);
        }
        qb.push(" ORDER BY sa.sold_at DESC, sa.invoice_no DESC LIMIT ")
            .push_bind(limit.max(1));

        let rows = qb
            .build_query_as::<SaleHistoryRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}

fn validate_new_sale(sale: &NewSale) -> DbResult<()> {
    if sale.lines.is_empty() {
        return Err(CoreError::CartEmpty.into());
    }

    validate_id("branch", &sale.branch_id)?;

    for line in &sale.lines {
        validate_quantity(line.quantity)?;
        validate_price_cents("unit_price", line.unit_price_cents)?;
        validate_name("product_name", &line.product_name, 255)?;
    }
    sale.total()?;
    Ok(())
}

async fn write_sale(
    conn: &mut SqliteConnection,
    new: &NewSale,
    at: DateTime<Utc>,
) -> DbResult<SaleReceipt> {
    ensure_exists(conn, "branches", "Branch", &new.branch_id).await?;
    ensure_exists(conn, "users", "User", &new.user_id).await?;

    let sale = Sale {
        id: Uuid::new_v4().to_string(),
        branch_id: new.branch_id.clone(),
        user_id: new.user_id.clone(),
        invoice_no: invoice::next_invoice_number(conn, InvoiceKind::Sale, at).await?,
        total_cents: new.total()?.cents(),
        sold_at: at,
    };

    sqlx::query(
        r#"
        INSERT INTO sales (id, branch_id, user_id, invoice_no, total_cents, sold_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.branch_id)
    .bind(&sale.user_id)
    .bind(&sale.invoice_no)
    .bind(sale.total_cents)
    .bind(sale.sold_at)
    .execute(&mut *conn)
    .await?;

    let mut items = Vec::with_capacity(new.lines.len());
    let mut stocks = Vec::with_capacity(new.lines.len());

    for line in &new.lines {
        let row = stock::find(conn, &line.product_id, &new.branch_id)
            .await?
            .ok_or_else(|| CoreError::no_stock(&line.product_id, &new.branch_id))?;

        let item = SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            product_id: line.product_id.clone(),
            product_name: line.product_name.trim().to_string(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price_cents,
            line_total_cents: line.line_total()?.cents(),
        };

        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, product_id, product_name,
                quantity, unit_price_cents, line_total_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.line_total_cents)
        .execute(&mut *conn)
        .await?;

        let row = stock::decrease(conn, &row.id, line.quantity, at).await?;

        items.push(item);
        stocks.push(row);
    }

    Ok(SaleReceipt {
        sale,
        items,
        stocks,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::Fixture;
    use crate::DbError;
    use chrono::TimeZone;
    use duka_core::{SaleCart, SaleLineInput};

    #[tokio::test]
    async fn test_sale_decrements_stock_and_snapshots_price() {
        let fx = Fixture::new().await;
        let product = fx.product().await;
        let stock = fx.stock_with(10, 5000, 6500).await;

        let mut cart = SaleCart::new(&fx.branch_id);
        cart.add_line(&product, &stock, 4).unwrap();
        let new = cart.to_new_sale(&fx.seller_id).unwrap();

        let at = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let receipt = fx.db.sales().complete_sale_at(new, at).await.unwrap();

        assert_eq!(receipt.sale.invoice_no, "INV-20240315-0001");
        assert_eq!(receipt.sale.total_cents, 26_000);
        assert_eq!(receipt.items[0].unit_price_cents, 6500);
        assert_eq!(receipt.items[0].product_name, "Sugar 1kg");
        assert_eq!(receipt.stocks[0].quantity, 6);
    }

    #[tokio::test]
    async fn test_oversell_at_commit_is_rejected_with_available() {
        // Two carts both saw 5 on hand; the second commit must fail.
        let fx = Fixture::new().await;
        let product = fx.product().await;
        let stock = fx.stock_with(5, 5000, 6500).await;

        let mut first = SaleCart::new(&fx.branch_id);
        first.add_line(&product, &stock, 4).unwrap();
        let mut second = SaleCart::new(&fx.branch_id);
        second.add_line(&product, &stock, 3).unwrap();

        let sales = fx.db.sales();
        sales
            .complete_sale(first.to_new_sale(&fx.seller_id).unwrap())
            .await
            .unwrap();
        let err = sales
            .complete_sale(second.to_new_sale(&fx.seller_id).unwrap())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { available: 1 })
        ));
        assert_eq!(fx.quantity_of(&stock.id).await, 1);
    }

    #[tokio::test]
    async fn test_failing_line_rolls_back_earlier_lines() {
        let fx = Fixture::new().await;
        let sugar = fx.product().await;
        let sugar_stock = fx.stock_with(10, 5000, 6500).await;
        let rice = fx.product_named("Rice 2kg").await;
        let rice_stock = fx.stock_for(&rice, &fx.branch_id, 1, 100, 130).await;

        let new = NewSale {
            branch_id: fx.branch_id.clone(),
            user_id: fx.seller_id.clone(),
            lines: vec![
                SaleLineInput {
                    product_id: sugar.id.clone(),
                    product_name: sugar.name.clone(),
                    quantity: 3,
                    unit_price_cents: 6500,
                },
                SaleLineInput {
                    product_id: rice.clone(),
                    product_name: "Rice 2kg".into(),
                    quantity: 2,
                    unit_price_cents: 130,
                },
            ],
        };

        let err = fx.db.sales().complete_sale(new).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::InsufficientStock { available: 1 })
        ));

        assert_eq!(fx.quantity_of(&sugar_stock.id).await, 10);
        assert_eq!(fx.quantity_of(&rice_stock.id).await, 1);
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sale_items")
            .fetch_one(fx.db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);

        // The rolled-back checkout did not consume an invoice number.
        let cart_line = SaleLineInput {
            product_id: sugar.id.clone(),
            product_name: sugar.name.clone(),
            quantity: 1,
            unit_price_cents: 6500,
        };
        let at = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let receipt = fx
            .db
            .sales()
            .complete_sale_at(
                NewSale {
                    branch_id: fx.branch_id.clone(),
                    user_id: fx.seller_id.clone(),
                    lines: vec![cart_line],
                },
                at,
            )
            .await
            .unwrap();
        assert_eq!(receipt.sale.invoice_no, "INV-20240315-0001");
    }

    #[tokio::test]
    async fn test_sale_without_stock_row_is_rejected() {
        let fx = Fixture::new().await;
        let product = fx.product().await;

        let new = NewSale {
            branch_id: fx.other_branch_id.clone(),
            user_id: fx.admin_id.clone(),
            lines: vec![SaleLineInput {
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                quantity: 1,
                unit_price_cents: 100,
            }],
        };

        let err = fx.db.sales().complete_sale(new).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::NoStockRecord { .. })));
    }

    #[tokio::test]
    async fn test_recent_sales_search_by_invoice() {
        let fx = Fixture::new().await;
        let product = fx.product().await;
        let stock = fx.stock_with(10, 5000, 6500).await;

        let mut cart = SaleCart::new(&fx.branch_id);
        cart.add_line(&product, &stock, 1).unwrap();
        let day = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let sales = fx.db.sales();
        sales
            .complete_sale_at(cart.to_new_sale(&fx.seller_id).unwrap(), day)
            .await
            .unwrap();
        sales
            .complete_sale_at(cart.to_new_sale(&fx.seller_id).unwrap(), day)
            .await
            .unwrap();

        let scope = BranchScope::Branch(fx.branch_id.clone());
        let all = sales.list_recent(&scope, None, 50).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].invoice_no, "INV-20240315-0002");

        let found = sales.list_recent(&scope, Some("0001"), 50).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].user_name, "Baraka Otieno");

        let limited = sales.list_recent(&scope, None, 1).await.unwrap();
        assert_eq!(limited.len(), 1);

        let sale = sales.get_by_invoice("INV-20240315-0001").await.unwrap().unwrap();
        assert_eq!(sales.items(&sale.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_invoice_lookup_validates_the_number() {
        let fx = Fixture::new().await;
        let product = fx.product().await;
        let stock = fx.stock_with(10, 5000, 6500).await;

        let mut cart = SaleCart::new(&fx.branch_id);
        cart.add_line(&product, &stock, 2).unwrap();
        let day = Utc.with_ymd_and_hms(2024, 3, 15, 12, 0, 0).unwrap();
        let sales = fx.db.sales();
        let receipt = sales
            .complete_sale_at(cart.to_new_sale(&fx.seller_id).unwrap(), day)
            .await
            .unwrap();

        // Surrounding whitespace from a scanner is tolerated
        let found = sales.get_by_invoice(" INV-20240315-0001\n").await.unwrap();
        assert_eq!(found.map(|s| s.id), Some(receipt.sale.id));

        assert!(sales.get_by_invoice("INV-20240316-0001").await.unwrap().is_none());

        for bad in ["0001", "INV-2024-03-15-0001", "PUR-20240315-0001", ""] {
            let err = sales.get_by_invoice(bad).await.unwrap_err();
            assert!(
                matches!(err, DbError::Core(CoreError::Validation(_))),
                "{bad}: {err:?}"
            );
        }
    }
}
