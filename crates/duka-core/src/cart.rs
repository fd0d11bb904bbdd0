//! # Carts
//!
//! In-progress sale and purchase carts, before anything touches the ledger.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart → Transaction                                   │
//! │                                                                         │
//! │  SaleCart                                                              │
//! │  add_line(product, stock, qty) ──► cumulative qty <= stock.quantity?   │
//! │       │                              └── no: InsufficientStock         │
//! │       ▼                                  { available: stock − in_cart }│
//! │  unit price frozen from stock.sell_price                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  to_new_sale(user) ──► NewSale ──► duka-db complete_sale (atomic)      │
//! │                                                                         │
//! │  PurchaseCart                                                          │
//! │  add_line(product, existing_stock, qty, buy, markup)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  sell price = existing sell price, else buy × (1 + markup)             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  to_new_purchase(supplier, user) ──► duka-db complete_purchase         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Carts do not reserve stock. The conditional decrement at commit is the
//! authoritative check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::ledger::purchase_sell_price;
use crate::money::Money;
use crate::types::{NewPurchase, NewSale, Product, PurchaseLineInput, SaleLineInput, Stock};
use crate::validation::{
    line_total, sum_line_totals, validate_price_cents, validate_quantity, ValidationResult,
};
use crate::MAX_CART_LINES;

// =============================================================================
// Sale Cart
// =============================================================================

/// A line in a sale cart.
///
/// Name and unit price are frozen when the line is first added.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLine {
    pub product_id: String,
    pub product_name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl SaleLine {
    /// Unit price × quantity.
    pub fn line_total(&self) -> ValidationResult<Money> {
        line_total(self.unit_price_cents, self.quantity)
    }
}

/// A checkout in progress at one branch.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding again increases quantity)
/// - Every line quantity is >= 1
/// - At add/update time, each line quantity was <= the branch stock
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleCart {
    pub branch_id: String,
    pub lines: Vec<SaleLine>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleCart {
    /// Creates an empty cart for a branch.
    pub fn new(branch_id: impl Into<String>) -> Self {
        SaleCart {
            branch_id: branch_id.into(),
            lines: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Quantity of a product already in the cart.
    pub fn quantity_of(&self, product_id: &str) -> i64 {
        self.lines
            .iter()
            .find(|l| l.product_id == product_id)
            .map_or(0, |l| l.quantity)
    }

    /// Adds a product, or increases the quantity of an existing line.
    ///
    /// `stock` must be the row for this cart's branch.
    ///
    /// ## Errors
    /// - `Validation` for a non-positive quantity, or a line that would pass
    ///   `MAX_LINE_QUANTITY` or carry a price above `MAX_PRICE_CENTS`
    /// - `NoStockRecord` if `stock` belongs to a different product/branch
    /// - `InsufficientStock { available: stock − already_in_cart }`
    /// - `CartTooLarge` when a new line would exceed the line limit
    pub fn add_line(&mut self, product: &Product, stock: &Stock, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;
        self.check_stock_row(product, stock)?;

        let in_cart = self.quantity_of(&product.id);
        validate_quantity(in_cart + quantity)?;
        if in_cart + quantity > stock.quantity {
            return Err(CoreError::InsufficientStock {
                available: (stock.quantity - in_cart).max(0),
            });
        }

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            line.quantity += quantity;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }

        validate_price_cents("unit_price", stock.sell_price_cents)?;
        self.lines.push(SaleLine {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            unit_price_cents: stock.sell_price_cents,
            quantity,
            added_at: Utc::now(),
        });
        Ok(())
    }

    /// Sets a line to an absolute quantity, re-checked against `stock`.
    pub fn update_quantity(&mut self, stock: &Stock, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == stock.product_id)
            .ok_or_else(|| CoreError::LineNotFound {
                product_id: stock.product_id.clone(),
            })?;

        if quantity > stock.quantity {
            return Err(CoreError::InsufficientStock {
                available: stock.quantity.max(0),
            });
        }

        line.quantity = quantity;
        Ok(())
    }

    /// Removes a line.
    pub fn remove_line(&mut self, product_id: &str) -> CoreResult<()> {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);

        if self.lines.len() == before {
            return Err(CoreError::LineNotFound {
                product_id: product_id.to_string(),
            });
        }
        Ok(())
    }

    /// Clears all lines.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.created_at = Utc::now();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Sum of line totals.
    pub fn total(&self) -> ValidationResult<Money> {
        sum_line_totals(self.lines.iter().map(SaleLine::line_total))
    }

    /// Converts the cart into a sale for `user_id`.
    ///
    /// Fails with `CartEmpty` when there are no lines.
    pub fn to_new_sale(&self, user_id: &str) -> CoreResult<NewSale> {
        if self.is_empty() {
            return Err(CoreError::CartEmpty);
        }

        Ok(NewSale {
            branch_id: self.branch_id.clone(),
            user_id: user_id.to_string(),
            lines: self
                .lines
                .iter()
                .map(|l| SaleLineInput {
                    product_id: l.product_id.clone(),
                    product_name: l.product_name.clone(),
                    quantity: l.quantity,
                    unit_price_cents: l.unit_price_cents,
                })
                .collect(),
        })
    }

    fn check_stock_row(&self, product: &Product, stock: &Stock) -> CoreResult<()> {
        if stock.product_id != product.id || stock.branch_id != self.branch_id {
            return Err(CoreError::no_stock(&product.id, &self.branch_id));
        }
        Ok(())
    }
}

// =============================================================================
// Purchase Cart
// =============================================================================

/// A line in a purchase cart.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub buy_price_cents: i64,

    /// Sell price the stock row will carry after this purchase.
    pub sell_price_cents: i64,

    /// Quantity on hand in the branch when the line was added.
    pub current_stock: i64,
}

impl PurchaseLine {
    /// Quantity × buy price.
    pub fn line_total(&self) -> ValidationResult<Money> {
        line_total(self.buy_price_cents, self.quantity)
    }
}

/// A supplier intake in progress for one branch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseCart {
    pub branch_id: String,
    pub lines: Vec<PurchaseLine>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl PurchaseCart {
    /// Creates an empty purchase cart for a branch.
    pub fn new(branch_id: impl Into<String>) -> Self {
        PurchaseCart {
            branch_id: branch_id.into(),
            lines: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds a product or increases the quantity of an existing line.
    ///
    /// A repeated product keeps the buy and sell price of its first line.
    ///
    /// ## Arguments
    /// * `existing` - current stock row for (product, branch), if any
    /// * `markup_bps` - default markup when no sell price exists yet
    pub fn add_line(
        &mut self,
        product: &Product,
        existing: Option<&Stock>,
        quantity: i64,
        buy_price: Money,
        markup_bps: u32,
    ) -> CoreResult<()> {
        validate_quantity(quantity)?;
        validate_price_cents("buy_price", buy_price.cents())?;

        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            validate_quantity(line.quantity + quantity)?;
            line.quantity += quantity;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }

        let existing = existing.filter(|s| s.product_id == product.id && s.branch_id == self.branch_id);
        let sell_price = purchase_sell_price(existing, buy_price, markup_bps)?;

        self.lines.push(PurchaseLine {
            product_id: product.id.clone(),
            product_name: product.name.clone(),
            quantity,
            buy_price_cents: buy_price.cents(),
            sell_price_cents: sell_price.cents(),
            current_stock: existing.map_or(0, |s| s.quantity),
        });
        Ok(())
    }

    /// Sets a line to an absolute quantity.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        validate_quantity(quantity)?;
        self.line_mut(product_id)?.quantity = quantity;
        Ok(())
    }

    /// Changes a line's buy price. The sell price is left as computed.
    pub fn update_buy_price(&mut self, product_id: &str, buy_price: Money) -> CoreResult<()> {
        validate_price_cents("buy_price", buy_price.cents())?;
        self.line_mut(product_id)?.buy_price_cents = buy_price.cents();
        Ok(())
    }

    /// Removes a line.
    pub fn remove_line(&mut self, product_id: &str) -> CoreResult<()> {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);

        if self.lines.len() == before {
            return Err(CoreError::LineNotFound {
                product_id: product_id.to_string(),
            });
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.created_at = Utc::now();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Sum of line subtotals.
    pub fn total(&self) -> ValidationResult<Money> {
        sum_line_totals(self.lines.iter().map(PurchaseLine::line_total))
    }

    /// Converts the cart into a purchase.
    ///
    /// Fails with `CartEmpty` when there are no lines.
    pub fn to_new_purchase(&self, supplier_id: &str, user_id: &str) -> CoreResult<NewPurchase> {
        if self.is_empty() {
            return Err(CoreError::CartEmpty);
        }

        Ok(NewPurchase {
            supplier_id: supplier_id.to_string(),
            branch_id: self.branch_id.clone(),
            user_id: user_id.to_string(),
            lines: self
                .lines
                .iter()
                .map(|l| PurchaseLineInput {
                    product_id: l.product_id.clone(),
                    quantity: l.quantity,
                    buy_price_cents: l.buy_price_cents,
                    sell_price_cents: l.sell_price_cents,
                })
                .collect(),
        })
    }

    fn line_mut(&mut self, product_id: &str) -> CoreResult<&mut PurchaseLine> {
        self.lines
            .iter_mut()
            .find(|l| l.product_id == product_id)
            .ok_or_else(|| CoreError::LineNotFound {
                product_id: product_id.to_string(),
            })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
