//! # Stock Ledger Rules
//!
//! Guarded quantity transitions shared by purchases, sales and adjustments.
//!
//! ## State Machine (per Stock row)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   quantity ──increase(n)──► quantity + n          (n >= 1)             │
//! │                                                                         │
//! │   quantity ──decrease(n)──► quantity − n          (n >= 1, n <= qty)   │
//! │                     │                                                   │
//! │                     └── n > qty ──► InsufficientStock { available }    │
//! │                                                                         │
//! │   No reserved / locked state: carts do not hold inventory.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! duka-db applies the same rules with conditional SQL updates, and its
//! reconciliation feeds each row's recorded movements through [`replay`]
//! and [`net_quantity`] to check the stored quantity.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{AdjustmentAction, Stock};
use crate::validation::{validate_price_cents, validate_quantity};
use crate::MAX_PRICE_CENTS;

/// Adds `amount` to `quantity`.
pub fn increase(quantity: i64, amount: i64) -> CoreResult<i64> {
    validate_quantity(amount)?;
    Ok(quantity + amount)
}

/// Subtracts `amount` from `quantity`, refusing to go below zero.
///
/// ## Example
/// ```rust
/// use duka_core::ledger::decrease;
/// use duka_core::CoreError;
///
/// assert_eq!(decrease(10, 4).unwrap(), 6);
/// assert!(matches!(decrease(5, 6), Err(CoreError::InsufficientStock { available: 5 })));
/// ```
pub fn decrease(quantity: i64, amount: i64) -> CoreResult<i64> {
    validate_quantity(amount)?;

    if amount > quantity {
        return Err(CoreError::InsufficientStock {
            available: quantity.max(0),
        });
    }

    Ok(quantity - amount)
}

// =============================================================================
// Adjustments
// =============================================================================

/// Before/after snapshot computed for an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AdjustmentPlan {
    pub quantity_before: i64,
    pub quantity_after: i64,
}

impl AdjustmentPlan {
    /// Signed change this plan applies.
    pub fn delta(&self) -> i64 {
        self.quantity_after - self.quantity_before
    }
}

/// Computes the result of applying an adjustment to `current`.
///
/// A decrease that would go negative fails with `InsufficientStock`
/// carrying `current`.
pub fn plan_adjustment(
    current: i64,
    action: AdjustmentAction,
    quantity: i64,
) -> CoreResult<AdjustmentPlan> {
    let quantity_after = match action {
        AdjustmentAction::Increase => increase(current, quantity)?,
        AdjustmentAction::Decrease => decrease(current, quantity)?,
    };

    Ok(AdjustmentPlan {
        quantity_before: current,
        quantity_after,
    })
}

// =============================================================================
// Pricing
// =============================================================================

/// Sell price for a purchase line.
///
/// Keeps the branch's current sell price when there is one; a missing stock
/// row or a zero price (e.g. a row opened by an increase adjustment) falls
/// back to `buy_price` plus the markup. A marked-up price above
/// `MAX_PRICE_CENTS` is a validation error.
///
/// ## User Workflow
/// ```text
/// Purchase line (P, B, buy 50.00)
///      │
///      ├── Stock(P, B) with sell 80.00 ──► sell stays 80.00
///      │
///      └── no Stock(P, B)              ──► sell = 50.00 × 1.3 = 65.00
/// ```
pub fn purchase_sell_price(
    existing: Option<&Stock>,
    buy_price: Money,
    markup_bps: u32,
) -> CoreResult<Money> {
    let price = match existing {
        Some(stock) if stock.sell_price_cents > 0 => stock.sell_price(),
        _ => buy_price
            .apply_markup(markup_bps)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "sell_price".to_string(),
                min: 0,
                max: MAX_PRICE_CENTS,
            })?,
    };

    validate_price_cents("sell_price", price.cents())?;
    Ok(price)
}

// =============================================================================
// Reconciliation
// =============================================================================

/// One recorded movement against a stock row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", content = "quantity", rename_all = "snake_case")]
pub enum Movement {
    Purchase(i64),
    Sale(i64),
    Adjustment(AdjustmentAction, i64),
}

impl Movement {
    /// Signed quantity change.
    pub fn delta(&self) -> i64 {
        match *self {
            Movement::Purchase(n) => n,
            Movement::Sale(n) => -n,
            Movement::Adjustment(AdjustmentAction::Increase, n) => n,
            Movement::Adjustment(AdjustmentAction::Decrease, n) => -n,
        }
    }
}

/// Replays movements in order from zero, enforcing the same guards as live
/// operations. The result is the quantity the stock row must hold.
pub fn replay<'a, I>(movements: I) -> CoreResult<i64>
where
    I: IntoIterator<Item = &'a Movement>,
{
    movements
        .into_iter()
        .try_fold(0i64, |quantity, movement| match *movement {
            Movement::Purchase(n) => increase(quantity, n),
            Movement::Sale(n) => decrease(quantity, n),
            Movement::Adjustment(action, n) => {
                plan_adjustment(quantity, action, n).map(|p| p.quantity_after)
            }
        })
}

/// Net of a set of movements without ordering guards.
pub fn net_quantity<'a, I>(movements: I) -> i64
where
    I: IntoIterator<Item = &'a Movement>,
{
    movements.into_iter().map(Movement::delta).sum()
}

// =============================================================================
// Unit Tests
// =============================================================================
