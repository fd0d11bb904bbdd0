//! # Adjustment Commands
//!
//! Manual stock corrections (damaged, expired, counted) with an audit row.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{company_product, ensure_branch_visible, StockSnapshot};
use crate::error::ApiError;
use crate::state::{ConfigState, DbState};
use duka_core::{Actor, AdjustmentAction, AdjustmentType, NewAdjustment, StockAdjustment};
use duka_db::AdjustmentHistoryRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentRequest {
    /// Sales persons always adjust their own branch.
    #[serde(default)]
    pub branch_id: Option<String>,
    pub product_id: String,
    pub adjustment_type: AdjustmentType,
    pub action: AdjustmentAction,
    pub quantity: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentSavedResponse {
    pub adjustment: StockAdjustment,
    pub stock: StockSnapshot,
}

/// Applies one adjustment and records it.
///
/// A decrease below zero fails with `INSUFFICIENT_STOCK`; a product with
/// no stock row in the branch fails with `NO_STOCK_RECORD` for decreases.
pub async fn save_adjustment(
    db: &DbState,
    actor: &Actor,
    request: AdjustmentRequest,
) -> Result<AdjustmentSavedResponse, ApiError> {
    debug!(
        product_id = %request.product_id,
        adjustment_type = %request.adjustment_type,
        action = ?request.action,
        quantity = request.quantity,
        "save_adjustment command"
    );

    let branch_id = actor.working_branch(request.branch_id.as_deref())?;
    ensure_branch_visible(db, actor, &branch_id).await?;
    company_product(db, actor, &request.product_id).await?;

    let adjustment = NewAdjustment {
        product_id: request.product_id,
        branch_id,
        user_id: actor.user_id.clone(),
        adjustment_type: request.adjustment_type,
        action: request.action,
        quantity: request.quantity,
        reason: request.reason,
    };

    let receipt = match db.inner().adjustments().save_adjustment(adjustment).await {
        Ok(receipt) => receipt,
        Err(err) => {
            warn!(user_id = %actor.user_id, error = %err, "Adjustment rejected");
            return Err(err.into());
        }
    };

    Ok(AdjustmentSavedResponse {
        stock: StockSnapshot::from(&receipt.stock),
        adjustment: receipt.adjustment,
    })
}

/// Adjustment history, newest first.
///
/// Search matches product name, adjustment type or reason.
pub async fn adjustment_history(
    db: &DbState,
    config: &ConfigState,
    actor: &Actor,
    branch_filter: Option<String>,
    search: Option<String>,
) -> Result<Vec<AdjustmentHistoryRow>, ApiError> {
    let scope = actor.scope_for(branch_filter.as_deref())?;
    debug!(?scope, search = ?search, "adjustment_history command");

    let rows = db
        .inner()
        .adjustments()
        .list(&scope, search.as_deref(), config.recent_limit())
        .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::Terminal;
    use crate::error::ErrorCode;

    fn request(product_id: &str, action: AdjustmentAction, quantity: i64) -> AdjustmentRequest {
        AdjustmentRequest {
            branch_id: None,
            product_id: product_id.to_string(),
            adjustment_type: AdjustmentType::Damaged,
            action,
            quantity,
            reason: Some("Water damage in the store room".into()),
        }
    }

    #[tokio::test]
    async fn test_decrease_is_recorded() {
        let t = Terminal::new().await;

        let saved = save_adjustment(&t.db, &t.seller, request(&t.sugar_id, AdjustmentAction::Decrease, 2))
            .await
            .unwrap();
        assert_eq!(saved.adjustment.quantity_before, 10);
        assert_eq!(saved.adjustment.quantity_after, 8);
        assert_eq!(saved.stock.quantity, 8);

        let history = adjustment_history(&t.db, &t.config, &t.seller, None, Some("water".into()))
            .await
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].adjustment_type, AdjustmentType::Damaged);
    }

    #[tokio::test]
    async fn test_decrease_below_zero_is_rejected() {
        let t = Terminal::new().await;

        let err = save_adjustment(&t.db, &t.seller, request(&t.sugar_id, AdjustmentAction::Decrease, 11))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(err.message, "Insufficient stock. Available: 10");
        assert_eq!(t.quantity(&t.sugar_id, &t.branch_id).await, Some(10));
    }

    #[tokio::test]
    async fn test_seller_cannot_adjust_outside_their_company() {
        let t = Terminal::new().await;
        let outsider = Actor {
            company_id: "another-company".into(),
            ..t.seller.clone()
        };

        let err = save_adjustment(&t.db, &outsider, request(&t.sugar_id, AdjustmentAction::Increase, 1))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
