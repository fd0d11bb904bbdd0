//! # Sale Commands
//!
//! Checkout at the acting user's own branch.
//!
//! ## Cart Lifecycle
//! ```text
//! ┌──────────┐  add_sale_line   ┌──────────┐  complete_sale  ┌────────────┐
//! │  Empty   │─────────────────►│ In Cart  │────────────────►│ Committed  │
//! │  Cart    │                  │          │                 │ INV-...    │
//! └──────────┘◄─────────────────└──────────┘                 └────────────┘
//!               clear_sale_cart      │  ▲
//!                                    └──┘ update / remove line
//! ```
//!
//! A line is checked against stock when it is added, but nothing is held.
//! The commit re-checks every line; if another terminal sold the last unit
//! in the meantime the sale fails with `INSUFFICIENT_STOCK` and the cart
//! stays as it was.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::{company_product, ensure_branch_visible, StockSnapshot};
use crate::error::ApiError;
use crate::state::{CartState, ConfigState, DbState};
use duka_core::cart::SaleLine;
use duka_core::{Actor, CoreError, Sale, SaleCart, SaleItem};
use duka_db::{SaleHistoryRow, StockListingRow};

/// Cart contents with totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleCartResponse {
    pub branch_id: String,
    pub lines: Vec<SaleLine>,
    pub line_count: usize,
    pub total_quantity: i64,
    pub total_cents: i64,
    pub total_display: String,
}

impl SaleCartResponse {
    fn new(cart: &SaleCart, config: &ConfigState) -> Result<Self, ApiError> {
        let total = cart.total()?.cents();
        Ok(SaleCartResponse {
            branch_id: cart.branch_id.clone(),
            lines: cart.lines.clone(),
            line_count: cart.line_count(),
            total_quantity: cart.total_quantity(),
            total_cents: total,
            total_display: config.format_money(total),
        })
    }
}

/// Returned by a committed sale.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleCompletedResponse {
    pub sale_id: String,
    pub invoice_no: String,
    pub branch_id: String,
    pub total_cents: i64,
    pub total_display: String,
    pub sold_at: DateTime<Utc>,
    pub items: Vec<SaleItem>,

    /// Stock after the sale, one entry per line.
    pub stocks: Vec<StockSnapshot>,
}

/// Products with stock on hand at the actor's branch.
pub async fn available_products(
    db: &DbState,
    actor: &Actor,
    search: Option<String>,
) -> Result<Vec<StockListingRow>, ApiError> {
    let branch_id = actor.selling_branch()?;
    debug!(branch_id = %branch_id, search = ?search, "available_products command");

    let rows = db
        .inner()
        .stocks()
        .available_for_sale(branch_id, search.as_deref())
        .await?;
    Ok(rows)
}

/// Adds a product to the actor's sale cart, or increases its quantity.
///
/// ## Errors
/// - `NO_STOCK_RECORD` when the product is not stocked at the branch
/// - `INSUFFICIENT_STOCK` when stock minus what the cart holds is too low
pub async fn add_sale_line(
    db: &DbState,
    carts: &CartState,
    config: &ConfigState,
    actor: &Actor,
    product_id: &str,
    quantity: i64,
) -> Result<SaleCartResponse, ApiError> {
    debug!(product_id = %product_id, quantity, "add_sale_line command");

    let branch_id = actor.selling_branch()?;
    let product = company_product(db, actor, product_id).await?;
    let stock = db
        .inner()
        .stocks()
        .find(product_id, branch_id)
        .await?
        .ok_or_else(|| CoreError::no_stock(product_id, branch_id))?;

    carts.with_sale_cart(&actor.user_id, branch_id, |cart| -> Result<_, ApiError> {
        cart.add_line(&product, &stock, quantity)?;
        SaleCartResponse::new(cart, config)
    })
}

/// Sets a line to an absolute quantity.
pub async fn update_sale_line(
    db: &DbState,
    carts: &CartState,
    config: &ConfigState,
    actor: &Actor,
    product_id: &str,
    quantity: i64,
) -> Result<SaleCartResponse, ApiError> {
    debug!(product_id = %product_id, quantity, "update_sale_line command");

    let branch_id = actor.selling_branch()?;
    let stock = db
        .inner()
        .stocks()
        .find(product_id, branch_id)
        .await?
        .ok_or_else(|| CoreError::no_stock(product_id, branch_id))?;

    carts
        .with_existing_sale_cart(&actor.user_id, |cart| -> Result<_, ApiError> {
            cart.update_quantity(&stock, quantity)?;
            SaleCartResponse::new(cart, config)
        })
        .unwrap_or_else(|| Err(line_not_found(product_id)))
}

pub fn remove_sale_line(
    carts: &CartState,
    config: &ConfigState,
    actor: &Actor,
    product_id: &str,
) -> Result<SaleCartResponse, ApiError> {
    debug!(product_id = %product_id, "remove_sale_line command");

    carts
        .with_existing_sale_cart(&actor.user_id, |cart| -> Result<_, ApiError> {
            cart.remove_line(product_id)?;
            SaleCartResponse::new(cart, config)
        })
        .unwrap_or_else(|| Err(line_not_found(product_id)))
}

pub fn get_sale_cart(
    carts: &CartState,
    config: &ConfigState,
    actor: &Actor,
) -> Result<SaleCartResponse, ApiError> {
    let branch_id = actor.selling_branch()?;
    let cart = carts
        .sale_cart(&actor.user_id)
        .unwrap_or_else(|| SaleCart::new(branch_id));
    SaleCartResponse::new(&cart, config)
}

pub fn clear_sale_cart(carts: &CartState, actor: &Actor) {
    debug!(user_id = %actor.user_id, "clear_sale_cart command");
    carts.clear_sale_cart(&actor.user_id);
}

/// Commits the actor's cart as one sale.
///
/// On failure nothing is written and the cart is kept, so the cashier can
/// fix the offending line and retry.
pub async fn complete_sale(
    db: &DbState,
    carts: &CartState,
    config: &ConfigState,
    actor: &Actor,
) -> Result<SaleCompletedResponse, ApiError> {
    debug!(user_id = %actor.user_id, "complete_sale command");

    let branch_id = actor.selling_branch()?;
    let cart = carts
        .sale_cart(&actor.user_id)
        .filter(|cart| cart.branch_id == branch_id)
        .ok_or(CoreError::CartEmpty)?;
    let new_sale = cart.to_new_sale(&actor.user_id)?;

    let receipt = match db.inner().sales().complete_sale(new_sale).await {
        Ok(receipt) => receipt,
        Err(err) => {
            warn!(user_id = %actor.user_id, error = %err, "Sale rejected");
            return Err(err.into());
        }
    };

    carts.clear_sale_cart(&actor.user_id);

    info!(
        invoice_no = %receipt.sale.invoice_no,
        lines = receipt.items.len(),
        "Sale completed from terminal"
    );

    Ok(SaleCompletedResponse {
        sale_id: receipt.sale.id.clone(),
        invoice_no: receipt.sale.invoice_no.clone(),
        branch_id: receipt.sale.branch_id.clone(),
        total_cents: receipt.sale.total_cents,
        total_display: config.format_money(receipt.sale.total_cents),
        sold_at: receipt.sale.sold_at,
        stocks: receipt.stocks.iter().map(StockSnapshot::from).collect(),
        items: receipt.items,
    })
}

/// Latest sales in the actor's scope, searchable by invoice number.
pub async fn recent_sales(
    db: &DbState,
    config: &ConfigState,
    actor: &Actor,
    branch_filter: Option<String>,
    search: Option<String>,
) -> Result<Vec<SaleHistoryRow>, ApiError> {
    let scope = actor.scope_for(branch_filter.as_deref())?;
    debug!(?scope, search = ?search, "recent_sales command");

    let rows = db
        .inner()
        .sales()
        .list_recent(&scope, search.as_deref(), config.recent_limit())
        .await?;
    Ok(rows)
}

/// A committed sale, for reprinting its receipt.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceiptResponse {
    pub sale: Sale,
    pub total_display: String,
    pub items: Vec<SaleItem>,
}

/// Looks a sale up by its invoice number.
///
/// The sale must be in a branch the actor can see.
pub async fn sale_receipt(
    db: &DbState,
    config: &ConfigState,
    actor: &Actor,
    invoice_no: &str,
) -> Result<SaleReceiptResponse, ApiError> {
    debug!(invoice_no, "sale_receipt command");

    let sales = db.inner().sales();
    let sale = sales
        .get_by_invoice(invoice_no)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", invoice_no.trim()))?;
    ensure_branch_visible(db, actor, &sale.branch_id).await?;

    Ok(SaleReceiptResponse {
        total_display: config.format_money(sale.total_cents),
        items: sales.items(&sale.id).await?,
        sale,
    })
}

fn line_not_found(product_id: &str) -> ApiError {
    CoreError::LineNotFound {
        product_id: product_id.to_string(),
    }
    .into()
}
