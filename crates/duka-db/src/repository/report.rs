//! # Report Repository
//!
//! Read-only aggregations over the ledger and transaction history. Every
//! report takes a [`BranchScope`]; the dated ones also take a [`DateRange`].
//!
//! ## Reports
//! ```text
//! ┌────────────────────┬──────────────────────────────────────────────────┐
//! │ fast_moving        │ sale items grouped by product, qty desc          │
//! │ dead_stock         │ stocked products with no sales in the range      │
//! │ out_of_stock       │ stock rows with quantity <= 0                    │
//! │ low_stock          │ stock rows with quantity <= product.min_stock    │
//! │ branch_performance │ sales, purchases, profit, stock value per branch │
//! │ salesperson_summary│ one user's sales for one day, top 5 products     │
//! └────────────────────┴──────────────────────────────────────────────────┘
//! ```
//!
//! Ranges are whole days, inclusive at both ends, compared against the
//! stored UTC timestamps as `[from 00:00, to + 1 day 00:00)`.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use crate::repository::push_scope;
use crate::repository::stock::{StockListingRow, LISTING_SELECT};
use duka_core::{BranchScope, ValidationError};

/// Number of products on the salesperson dashboard.
const TOP_PRODUCTS: i64 = 5;

// =============================================================================
// Date Range
// =============================================================================

/// An inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    pub fn new(from: NaiveDate, to: NaiveDate) -> DbResult<Self> {
        if from > to {
            return Err(ValidationError::InvalidFormat {
                field: "date range".to_string(),
                reason: format!("start {from} is after end {to}"),
            }
            .into());
        }
        Ok(DateRange { from, to })
    }

    pub fn single_day(day: NaiveDate) -> Self {
        DateRange { from: day, to: day }
    }

    /// Half-open UTC bounds.
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let end_day = self.to.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
        (
            Utc.from_utc_datetime(&self.from.and_time(NaiveTime::MIN)),
            Utc.from_utc_datetime(&end_day.and_time(NaiveTime::MIN)),
        )
    }
}

/// Appends `<column> >= ? AND <column> < ?`.
fn push_range(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, range: &DateRange) {
    let (start, end) = range.bounds();
    qb.push(column)
        .push(" >= ")
        .push_bind(start)
        .push(" AND ")
        .push(column)
        .push(" < ")
        .push_bind(end);
}

// =============================================================================
// Report Types
// =============================================================================

/// Units sold and revenue for one product.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FastMovingRow {
    pub product_id: String,
    pub product_name: String,
    pub total_quantity: i64,
    pub total_sales_cents: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FastMovingSummary {
    pub total_products: usize,
    pub total_quantity: i64,
    pub total_sales_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FastMovingReport {
    pub range: DateRange,
    pub products: Vec<FastMovingRow>,
    pub summary: FastMovingSummary,
}

/// A stocked product that did not sell in the range.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DeadStockRow {
    pub product_id: String,
    pub product_name: String,
    pub category_name: String,
    pub unit: String,
    pub total_quantity: i64,

    /// Σ quantity × buy price over the product's stock rows in scope.
    pub total_buy_value_cents: i64,

    /// Comma-separated names of the branches holding it.
    pub branches: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeadStockSummary {
    pub total_products: usize,
    pub total_quantity: i64,
    pub total_buy_value_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeadStockReport {
    pub range: DateRange,
    pub products: Vec<DeadStockRow>,
    pub summary: DeadStockSummary,
}

/// Out-of-stock or low-stock listing.
#[derive(Debug, Clone, Serialize)]
pub struct StockStatusReport {
    pub rows: Vec<StockListingRow>,
    pub total: usize,
}

#[derive(Debug, Clone, FromRow)]
struct PerformanceRow {
    branch_id: String,
    branch_name: String,
    total_sales_cents: i64,
    total_purchases_cents: i64,
    products_sold: i64,
    stock_value_cents: i64,
}

/// One branch's figures for the range. Stock value is as of now.
#[derive(Debug, Clone, Serialize)]
pub struct BranchPerformanceRow {
    pub branch_id: String,
    pub branch_name: String,
    pub total_sales_cents: i64,
    pub total_purchases_cents: i64,

    /// Sales minus purchases.
    pub profit_cents: i64,
    pub products_sold: i64,
    pub stock_value_cents: i64,
}

impl From<PerformanceRow> for BranchPerformanceRow {
    fn from(row: PerformanceRow) -> Self {
        BranchPerformanceRow {
            profit_cents: row.total_sales_cents - row.total_purchases_cents,
            branch_id: row.branch_id,
            branch_name: row.branch_name,
            total_sales_cents: row.total_sales_cents,
            total_purchases_cents: row.total_purchases_cents,
            products_sold: row.products_sold,
            stock_value_cents: row.stock_value_cents,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BranchPerformanceTotals {
    pub total_sales_cents: i64,
    pub total_purchases_cents: i64,
    pub profit_cents: i64,
    pub products_sold: i64,
    pub stock_value_cents: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchPerformanceReport {
    pub range: DateRange,
    pub branches: Vec<BranchPerformanceRow>,
    pub totals: BranchPerformanceTotals,
}

/// A sales person's day at a glance.
#[derive(Debug, Clone, Serialize)]
pub struct SalespersonSummary {
    pub day: NaiveDate,
    pub sales_total_cents: i64,
    pub sales_count: i64,
    pub top_products: Vec<FastMovingRow>,
}

/// Whose sales a product aggregation covers.
enum SalesFilter<'a> {
    Scope(&'a BranchScope),
    User(&'a str),
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for report queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Products by units sold, most first.
    pub async fn fast_moving(
        &self,
        scope: &BranchScope,
        range: DateRange,
    ) -> DbResult<FastMovingReport> {
        let products = self
            .sales_by_product(SalesFilter::Scope(scope), &range, None)
            .await?;

        let summary = FastMovingSummary {
            total_products: products.len(),
            total_quantity: products.iter().map(|p| p.total_quantity).sum(),
            total_sales_cents: products.iter().map(|p| p.total_sales_cents).sum(),
        };

        debug!(?scope, products = summary.total_products, "Fast-moving report");
        Ok(FastMovingReport {
            range,
            products,
            summary,
        })
    }

    /// Products stocked in scope with no sales in scope during the range.
    ///
    /// Rows with zero quantity are included; a product that sits at zero
    /// and never sells is still dead.
    pub async fn dead_stock(&self, scope: &BranchScope, range: DateRange) -> DbResult<DeadStockReport> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT p.id AS product_id, p.name AS product_name, c.name AS category_name, p.unit,
                   SUM(st.quantity) AS total_quantity,
                   SUM(st.quantity * st.buy_price_cents) AS total_buy_value_cents,
                   GROUP_CONCAT(b.name, ', ') AS branches
            FROM stocks st
            JOIN products p ON p.id = st.product_id
            JOIN categories c ON c.id = p.category_id
            JOIN branches b ON b.id = st.branch_id
            WHERE "#,
        );
        push_scope(&mut qb, "st.branch_id", scope);
        qb.push(
            r#"
              AND NOT EXISTS (
                SELECT 1 FROM sale_items si
                JOIN sales s ON s.id = si.sale_id
                WHERE si.product_id = p.id AND "#,
        );
        push_scope(&mut qb, "s.branch_id", scope);
        qb.push(" AND ");
        push_range(&mut qb, "s.sold_at", &range);
        qb.push(") GROUP BY p.id, p.name, c.name, p.unit ORDER BY p.name");

        let products = qb
            .build_query_as::<DeadStockRow>()
            .fetch_all(&self.pool)
            .await?;

        let summary = DeadStockSummary {
            total_products: products.len(),
            total_quantity: products.iter().map(|p| p.total_quantity).sum(),
            total_buy_value_cents: products.iter().map(|p| p.total_buy_value_cents).sum(),
        };

        debug!(?scope, products = summary.total_products, "Dead-stock report");
        Ok(DeadStockReport {
            range,
            products,
            summary,
        })
    }

    pub async fn out_of_stock(&self, scope: &BranchScope) -> DbResult<StockStatusReport> {
        self.stock_status(scope, "s.quantity <= 0").await
    }

    pub async fn low_stock(&self, scope: &BranchScope) -> DbResult<StockStatusReport> {
        self.stock_status(scope, "s.quantity <= p.min_stock").await
    }

    /// Per-branch sales, purchases and stock value, with totals.
    pub async fn branch_performance(
        &self,
        scope: &BranchScope,
        range: DateRange,
    ) -> DbResult<BranchPerformanceReport> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT b.id AS branch_id, b.name AS branch_name,
                COALESCE((SELECT SUM(s.total_cents) FROM sales s
                          WHERE s.branch_id = b.id AND "#,
        );
        push_range(&mut qb, "s.sold_at", &range);
        qb.push(
            r#"), 0) AS total_sales_cents,
                COALESCE((SELECT SUM(pu.total_cents) FROM purchases pu
                          WHERE pu.branch_id = b.id AND "#,
        );
        push_range(&mut qb, "pu.purchased_at", &range);
        qb.push(
            r#"), 0) AS total_purchases_cents,
                COALESCE((SELECT SUM(si.quantity) FROM sale_items si
                          JOIN sales s ON s.id = si.sale_id
                          WHERE s.branch_id = b.id AND "#,
        );
        push_range(&mut qb, "s.sold_at", &range);
        qb.push(
            r#"), 0) AS products_sold,
                COALESCE((SELECT SUM(st.quantity * st.buy_price_cents) FROM stocks st
                          WHERE st.branch_id = b.id), 0) AS stock_value_cents
            FROM branches b
            WHERE "#,
        );
        push_scope(&mut qb, "b.id", scope);
        qb.push(" ORDER BY b.name");

        let branches: Vec<BranchPerformanceRow> = qb
            .build_query_as::<PerformanceRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(BranchPerformanceRow::from)
            .collect();

        let totals = branches
            .iter()
            .fold(BranchPerformanceTotals::default(), |mut t, b| {
                t.total_sales_cents += b.total_sales_cents;
                t.total_purchases_cents += b.total_purchases_cents;
                t.profit_cents += b.profit_cents;
                t.products_sold += b.products_sold;
                t.stock_value_cents += b.stock_value_cents;
                t
            });

        debug!(?scope, branches = branches.len(), "Branch performance report");
        Ok(BranchPerformanceReport {
            range,
            branches,
            totals,
        })
    }

    /// Totals and top sellers for one user on one day.
    pub async fn salesperson_summary(
        &self,
        user_id: &str,
        day: NaiveDate,
    ) -> DbResult<SalespersonSummary> {
        let range = DateRange::single_day(day);
        let (start, end) = range.bounds();

        let (sales_total_cents, sales_count): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COALESCE(SUM(total_cents), 0), COUNT(*)
            FROM sales
            WHERE user_id = ?1 AND sold_at >= ?2 AND sold_at < ?3
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        let top_products = self
            .sales_by_product(SalesFilter::User(user_id), &range, Some(TOP_PRODUCTS))
            .await?;

        Ok(SalespersonSummary {
            day,
            sales_total_cents,
            sales_count,
            top_products,
        })
    }

    async fn sales_by_product(
        &self,
        filter: SalesFilter<'_>,
        range: &DateRange,
        limit: Option<i64>,
    ) -> DbResult<Vec<FastMovingRow>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT si.product_id, p.name AS product_name,
                   SUM(si.quantity) AS total_quantity,
                   SUM(si.line_total_cents) AS total_sales_cents
            FROM sale_items si
            JOIN sales s ON s.id = si.sale_id
            JOIN products p ON p.id = si.product_id
            WHERE "#,
        );
        match filter {
            SalesFilter::Scope(scope) => push_scope(&mut qb, "s.branch_id", scope),
            SalesFilter::User(user_id) => {
                qb.push("s.user_id = ").push_bind(user_id.to_string());
            }
        }
        qb.push(" AND ");
        push_range(&mut qb, "s.sold_at", range);
        qb.push(" GROUP BY si.product_id, p.name ORDER BY total_quantity DESC, p.name");
        if let Some(limit) = limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        let rows = qb
            .build_query_as::<FastMovingRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn stock_status(&self, scope: &BranchScope, condition: &str) -> DbResult<StockStatusReport> {
        let mut qb = QueryBuilder::<Sqlite>::new(LISTING_SELECT);
        push_scope(&mut qb, "s.branch_id", scope);
        qb.push(" AND ").push(condition);
        qb.push(" ORDER BY s.quantity, p.name");

        let rows = qb
            .build_query_as::<StockListingRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(StockStatusReport {
            total: rows.len(),
            rows,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::Fixture;
    use crate::DbError;
    use duka_core::{CoreError, SaleCart};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn at(d: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, hour, 0, 0).unwrap()
    }

    /// Sugar: 20 bought at 50.00, 4 sold. Rice: 10 bought at 10.00, none
    /// sold. Bread: an empty row in the second branch.
    async fn trading_day(fx: &Fixture) -> String {
        let rice = fx.product_named("Rice 2kg").await;
        let bread = fx.product_named("Bread").await;
        fx.stock_for(&bread, &fx.other_branch_id, 0, 4000, 5200).await;

        let receipt = fx
            .db
            .purchases()
            .complete_purchase_at(fx.purchase_of(&[(&fx.product_id, 20, 5000), (&rice, 10, 1000)]), at(15, 9))
            .await
            .unwrap();
        let sugar_stock = receipt
            .stocks
            .iter()
            .find(|s| s.product_id == fx.product_id)
            .unwrap()
            .clone();

        let mut cart = SaleCart::new(&fx.branch_id);
        cart.add_line(&fx.product().await, &sugar_stock, 4).unwrap();
        fx.db
            .sales()
            .complete_sale_at(cart.to_new_sale(&fx.seller_id).unwrap(), at(15, 12))
            .await
            .unwrap();

        rice
    }

    #[test]
    fn test_range_bounds_cover_whole_days() {
        let range = DateRange::new(day(1), day(31)).unwrap();
        let (start, end) = range.bounds();
        assert_eq!(start, at(1, 0));
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap());

        let err = DateRange::new(day(2), day(1)).unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_fast_moving_groups_by_product() {
        let fx = Fixture::new().await;
        trading_day(&fx).await;
        let reports = fx.db.reports();
        let scope = BranchScope::Company(fx.company_id.clone());

        let report = reports
            .fast_moving(&scope, DateRange::single_day(day(15)))
            .await
            .unwrap();
        assert_eq!(report.products.len(), 1);
        assert_eq!(report.products[0].product_name, "Sugar 1kg");
        assert_eq!(report.products[0].total_quantity, 4);
        assert_eq!(report.summary.total_sales_cents, 26_000);

        let next_day = reports
            .fast_moving(&scope, DateRange::single_day(day(16)))
            .await
            .unwrap();
        assert!(next_day.products.is_empty());
        assert_eq!(next_day.summary.total_quantity, 0);
    }

    #[tokio::test]
    async fn test_dead_stock_lists_unsold_products() {
        let fx = Fixture::new().await;
        trading_day(&fx).await;

        let report = fx
            .db
            .reports()
            .dead_stock(
                &BranchScope::Branch(fx.branch_id.clone()),
                DateRange::single_day(day(15)),
            )
            .await
            .unwrap();

        assert_eq!(report.products.len(), 1);
        let rice = &report.products[0];
        assert_eq!(rice.product_name, "Rice 2kg");
        assert_eq!(rice.total_quantity, 10);
        assert_eq!(rice.total_buy_value_cents, 10_000);
        assert_eq!(rice.branches, "Main Branch");

        // Outside the sale's day, sugar is dead too.
        let report = fx
            .db
            .reports()
            .dead_stock(&BranchScope::All, DateRange::single_day(day(16)))
            .await
            .unwrap();
        assert_eq!(report.summary.total_products, 3);
    }

    #[tokio::test]
    async fn test_branch_performance_and_totals() {
        let fx = Fixture::new().await;
        trading_day(&fx).await;

        let report = fx
            .db
            .reports()
            .branch_performance(
                &BranchScope::Company(fx.company_id.clone()),
                DateRange::single_day(day(15)),
            )
            .await
            .unwrap();
        assert_eq!(report.branches.len(), 2);

        let main = &report.branches[0];
        assert_eq!(main.branch_name, "Main Branch");
        assert_eq!(main.total_sales_cents, 26_000);
        assert_eq!(main.total_purchases_cents, 110_000);
        assert_eq!(main.profit_cents, -84_000);
        assert_eq!(main.products_sold, 4);
        assert_eq!(main.stock_value_cents, 16 * 5000 + 10 * 1000);

        let second = &report.branches[1];
        assert_eq!(second.total_sales_cents, 0);
        assert_eq!(second.stock_value_cents, 0);

        assert_eq!(report.totals.profit_cents, -84_000);
        assert_eq!(report.totals.stock_value_cents, 90_000);
    }

    #[tokio::test]
    async fn test_out_of_stock_and_low_stock() {
        let fx = Fixture::new().await;
        trading_day(&fx).await;
        let reports = fx.db.reports();
        let company = BranchScope::Company(fx.company_id.clone());

        let out = reports.out_of_stock(&company).await.unwrap();
        assert_eq!(out.total, 1);
        assert_eq!(out.rows[0].product_name, "Bread");

        let main_only = reports
            .out_of_stock(&BranchScope::Branch(fx.branch_id.clone()))
            .await
            .unwrap();
        assert_eq!(main_only.total, 0);

        // Every fixture product has min_stock 5.
        let low = reports.low_stock(&company).await.unwrap();
        assert_eq!(low.total, 1);
    }

    #[tokio::test]
    async fn test_salesperson_summary_is_per_user_and_day() {
        let fx = Fixture::new().await;
        trading_day(&fx).await;
        let reports = fx.db.reports();

        let summary = reports.salesperson_summary(&fx.seller_id, day(15)).await.unwrap();
        assert_eq!(summary.sales_total_cents, 26_000);
        assert_eq!(summary.sales_count, 1);
        assert_eq!(summary.top_products.len(), 1);
        assert_eq!(summary.top_products[0].total_quantity, 4);

        let admin = reports.salesperson_summary(&fx.admin_id, day(15)).await.unwrap();
        assert_eq!(admin.sales_count, 0);
        assert!(admin.top_products.is_empty());
    }
}
