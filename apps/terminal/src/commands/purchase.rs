//! # Purchase Commands
//!
//! Supplier intake into one branch.
//!
//! ```text
//! add_purchase_line ──► PurchaseCart (per user, one branch)
//!                            │
//!                            │ first purchase of a product in the branch:
//!                            │   sell = buy + configured markup
//!                            │ later purchases:
//!                            │   sell price already on the stock row is kept
//!                            ▼
//! complete_purchase ──► PUR-YYYYMMDD-NNNN, stock += quantity per line
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{company_product, ensure_branch_visible, StockSnapshot};
use crate::error::ApiError;
use crate::state::{CartState, ConfigState, DbState};
use duka_core::cart::PurchaseLine;
use duka_core::{Actor, CoreError, Money, PurchaseCart, PurchaseItem};
use duka_db::PurchaseHistoryRow;

/// One product line to receive.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLineRequest {
    /// Receiving branch. Sales persons always receive into their own.
    #[serde(default)]
    pub branch_id: Option<String>,
    pub product_id: String,
    pub quantity: i64,
    pub buy_price_cents: i64,
}

/// Cart contents with totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseCartResponse {
    pub branch_id: String,
    pub lines: Vec<PurchaseLine>,
    pub line_count: usize,
    pub total_cents: i64,
    pub total_display: String,
}

impl PurchaseCartResponse {
    fn new(cart: &PurchaseCart, config: &ConfigState) -> Result<Self, ApiError> {
        let total = cart.total()?.cents();
        Ok(PurchaseCartResponse {
            branch_id: cart.branch_id.clone(),
            lines: cart.lines.clone(),
            line_count: cart.line_count(),
            total_cents: total,
            total_display: config.format_money(total),
        })
    }
}

/// Returned by a committed purchase.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseCompletedResponse {
    pub purchase_id: String,
    pub invoice_no: String,
    pub supplier_id: String,
    pub branch_id: String,
    pub total_cents: i64,
    pub total_display: String,
    pub purchased_at: DateTime<Utc>,
    pub items: Vec<PurchaseItem>,

    /// Stock after the purchase, one entry per line.
    pub stocks: Vec<StockSnapshot>,
}

/// Adds a line to the actor's purchase cart.
///
/// The cart belongs to one branch; lines for a different branch are
/// rejected until the open cart is completed or cleared.
pub async fn add_purchase_line(
    db: &DbState,
    carts: &CartState,
    config: &ConfigState,
    actor: &Actor,
    request: PurchaseLineRequest,
) -> Result<PurchaseCartResponse, ApiError> {
    debug!(
        product_id = %request.product_id,
        quantity = request.quantity,
        buy_price_cents = request.buy_price_cents,
        "add_purchase_line command"
    );

    let branch_id = actor.working_branch(request.branch_id.as_deref())?;
    ensure_branch_visible(db, actor, &branch_id).await?;

    let product = company_product(db, actor, &request.product_id).await?;
    let existing = db
        .inner()
        .stocks()
        .find(&request.product_id, &branch_id)
        .await?;

    carts.with_purchase_cart(&actor.user_id, &branch_id, |cart| -> Result<_, ApiError> {
        if cart.branch_id != branch_id {
            return Err(ApiError::validation(
                "A purchase for another branch is open; complete or clear it first",
            ));
        }
        cart.add_line(
            &product,
            existing.as_ref(),
            request.quantity,
            Money::from_cents(request.buy_price_cents),
            config.markup_bps(),
        )?;
        PurchaseCartResponse::new(cart, config)
    })
}

pub fn update_purchase_line(
    carts: &CartState,
    config: &ConfigState,
    actor: &Actor,
    product_id: &str,
    quantity: i64,
) -> Result<PurchaseCartResponse, ApiError> {
    debug!(product_id = %product_id, quantity, "update_purchase_line command");

    carts
        .with_existing_purchase_cart(&actor.user_id, |cart| -> Result<_, ApiError> {
            cart.update_quantity(product_id, quantity)?;
            PurchaseCartResponse::new(cart, config)
        })
        .unwrap_or_else(|| Err(line_not_found(product_id)))
}

pub fn remove_purchase_line(
    carts: &CartState,
    config: &ConfigState,
    actor: &Actor,
    product_id: &str,
) -> Result<PurchaseCartResponse, ApiError> {
    debug!(product_id = %product_id, "remove_purchase_line command");

    carts
        .with_existing_purchase_cart(&actor.user_id, |cart| -> Result<_, ApiError> {
            cart.remove_line(product_id)?;
            PurchaseCartResponse::new(cart, config)
        })
        .unwrap_or_else(|| Err(line_not_found(product_id)))
}

pub fn get_purchase_cart(
    carts: &CartState,
    config: &ConfigState,
    actor: &Actor,
) -> Result<Option<PurchaseCartResponse>, ApiError> {
    carts
        .purchase_cart(&actor.user_id)
        .map(|cart| PurchaseCartResponse::new(&cart, config))
        .transpose()
}

pub fn clear_purchase_cart(carts: &CartState, actor: &Actor) {
    debug!(user_id = %actor.user_id, "clear_purchase_cart command");
    carts.clear_purchase_cart(&actor.user_id);
}

/// Commits the actor's purchase cart against a supplier.
pub async fn complete_purchase(
    db: &DbState,
    carts: &CartState,
    config: &ConfigState,
    actor: &Actor,
    supplier_id: &str,
) -> Result<PurchaseCompletedResponse, ApiError> {
    debug!(supplier_id = %supplier_id, "complete_purchase command");

    let cart = carts
        .purchase_cart(&actor.user_id)
        .ok_or(CoreError::CartEmpty)?;
    ensure_branch_visible(db, actor, &cart.branch_id).await?;
    let new_purchase = cart.to_new_purchase(supplier_id, &actor.user_id)?;

    let receipt = match db.inner().purchases().complete_purchase(new_purchase).await {
        Ok(receipt) => receipt,
        Err(err) => {
            warn!(user_id = %actor.user_id, error = %err, "Purchase rejected");
            return Err(err.into());
        }
    };

    carts.clear_purchase_cart(&actor.user_id);

    info!(
        invoice_no = %receipt.purchase.invoice_no,
        lines = receipt.items.len(),
        "Purchase completed from terminal"
    );

    Ok(PurchaseCompletedResponse {
        purchase_id: receipt.purchase.id.clone(),
        invoice_no: receipt.purchase.invoice_no.clone(),
        supplier_id: receipt.purchase.supplier_id.clone(),
        branch_id: receipt.purchase.branch_id.clone(),
        total_cents: receipt.purchase.total_cents,
        total_display: config.format_money(receipt.purchase.total_cents),
        purchased_at: receipt.purchase.purchased_at,
        stocks: receipt.stocks.iter().map(StockSnapshot::from).collect(),
        items: receipt.items,
    })
}

/// Latest purchases, searchable by invoice number or supplier name.
pub async fn recent_purchases(
    db: &DbState,
    config: &ConfigState,
    actor: &Actor,
    branch_filter: Option<String>,
    search: Option<String>,
) -> Result<Vec<PurchaseHistoryRow>, ApiError> {
    let scope = actor.scope_for(branch_filter.as_deref())?;
    debug!(?scope, search = ?search, "recent_purchases command");

    let rows = db
        .inner()
        .purchases()
        .list_recent(&scope, search.as_deref(), config.recent_limit())
        .await?;
    Ok(rows)
}

fn line_not_found(product_id: &str) -> ApiError {
    CoreError::LineNotFound {
        product_id: product_id.to_string(),
    }
    .into()
}
