//! # Report Commands
//!
//! Scoped, read-only views over the ledger.
//!
//! ```text
//! ReportQuery { from, to, branchId }
//!      │
//!      ├── from/to missing ──► today
//!      ├── branchId ─────────► Actor::scope_for (sales persons stay pinned)
//!      ▼
//! ReportRepository ──► FastMovingReport / DeadStockReport / ...
//! ```

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::state::{ConfigState, DbState};
use duka_core::{Actor, BranchScope};
use duka_db::{
    BranchPerformanceReport, DateRange, DeadStockReport, FastMovingReport, LedgerCheck,
    SalespersonSummary, StockStatusReport,
};

/// Date range and optional branch filter for a report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportQuery {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
    #[serde(default)]
    pub branch_id: Option<String>,
}

impl ReportQuery {
    fn range(&self) -> Result<DateRange, ApiError> {
        let today = Utc::now().date_naive();
        let from = self.from.unwrap_or(today);
        let to = self.to.unwrap_or(today.max(from));
        Ok(DateRange::new(from, to)?)
    }

    fn scope(&self, actor: &Actor) -> Result<BranchScope, ApiError> {
        Ok(actor.scope_for(self.branch_id.as_deref())?)
    }
}

pub async fn fast_moving(
    db: &DbState,
    actor: &Actor,
    query: ReportQuery,
) -> Result<FastMovingReport, ApiError> {
    let (scope, range) = (query.scope(actor)?, query.range()?);
    debug!(?scope, ?range, "fast_moving command");
    Ok(db.inner().reports().fast_moving(&scope, range).await?)
}

pub async fn dead_stock(
    db: &DbState,
    actor: &Actor,
    query: ReportQuery,
) -> Result<DeadStockReport, ApiError> {
    let (scope, range) = (query.scope(actor)?, query.range()?);
    debug!(?scope, ?range, "dead_stock command");
    Ok(db.inner().reports().dead_stock(&scope, range).await?)
}

pub async fn out_of_stock(
    db: &DbState,
    actor: &Actor,
    branch_filter: Option<String>,
) -> Result<StockStatusReport, ApiError> {
    let scope = actor.scope_for(branch_filter.as_deref())?;
    Ok(db.inner().reports().out_of_stock(&scope).await?)
}

pub async fn low_stock(
    db: &DbState,
    actor: &Actor,
    branch_filter: Option<String>,
) -> Result<StockStatusReport, ApiError> {
    let scope = actor.scope_for(branch_filter.as_deref())?;
    Ok(db.inner().reports().low_stock(&scope).await?)
}

pub async fn branch_performance(
    db: &DbState,
    actor: &Actor,
    query: ReportQuery,
) -> Result<BranchPerformanceReport, ApiError> {
    let (scope, range) = (query.scope(actor)?, query.range()?);
    debug!(?scope, ?range, "branch_performance command");
    Ok(db.inner().reports().branch_performance(&scope, range).await?)
}

/// The home screen for a sales person.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub summary: SalespersonSummary,
    pub sales_total_display: String,

    /// Own-branch low stock, when enabled in the display settings.
    pub low_stock: Option<StockStatusReport>,
}

/// The actor's sales for a day (today by default) and top sellers.
pub async fn salesperson_dashboard(
    db: &DbState,
    config: &ConfigState,
    actor: &Actor,
    day: Option<NaiveDate>,
) -> Result<DashboardResponse, ApiError> {
    let day = day.unwrap_or_else(|| Utc::now().date_naive());
    debug!(user_id = %actor.user_id, %day, "salesperson_dashboard command");

    let db = db.inner();
    let summary = db.reports().salesperson_summary(&actor.user_id, day).await?;

    let low_stock = match (config.show_low_stock(), actor.branch_id.as_deref()) {
        (true, Some(branch_id)) => Some(
            db.reports()
                .low_stock(&BranchScope::Branch(branch_id.to_string()))
                .await?,
        ),
        _ => None,
    };

    Ok(DashboardResponse {
        sales_total_display: config.format_money(summary.sales_total_cents),
        summary,
        low_stock,
    })
}

/// Outcome of recomputing stock quantities from recorded movements.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerVerification {
    pub checked: usize,
    pub inconsistent: Vec<LedgerCheck>,
}

impl LedgerVerification {
    pub fn is_clean(&self) -> bool {
        self.inconsistent.is_empty()
    }
}

/// Compares every stock row in scope against its purchases, sales and
/// adjustments, both in total and replayed in time order.
pub async fn verify_ledger(db: &DbState, scope: &BranchScope) -> Result<LedgerVerification, ApiError> {
    let checks = db.inner().stocks().reconcile(scope).await?;
    let checked = checks.len();
    let inconsistent: Vec<LedgerCheck> = checks.into_iter().filter(|c| !c.is_consistent()).collect();

    for check in &inconsistent {
        warn!(
            stock_id = %check.stock_id,
            quantity = check.quantity,
            expected = check.expected,
            history_error = ?check.history_error,
            "Stock row does not match its movements"
        );
    }

    Ok(LedgerVerification {
        checked,
        inconsistent,
    })
}
