//! # Domain Types
//!
//! Core domain types used throughout duka.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Company ──► Branch ──► Stock ◄── Product ◄── Category                 │
//! │     │           │        │ (product_id, branch_id) unique              │
//! │     │           │        │                                              │
//! │     │           │        ├──► StockAdjustment (append-only)            │
//! │     │           │        │                                              │
//! │     │           ├──► Purchase ──► PurchaseItem   (+ quantity)          │
//! │     │           └──► Sale     ──► SaleItem       (− quantity)          │
//! │     │                                                                   │
//! │     └──► User { role: Admin | SalesPerson, branch_id? }                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Money Fields
//! Every price or total is stored as `*_cents: i64`. Accessors return
//! [`Money`] for arithmetic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{line_total, sum_line_totals, ValidationResult};

// =============================================================================
// Role
// =============================================================================

/// A user's role.
///
/// Closed set; every permission check matches on it exhaustively.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Back-office administrator.
    Admin,
    /// Counter staff bound to one branch.
    SalesPerson,
}

impl Role {
    /// Human-readable label.
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::SalesPerson => "Sales Person",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "admin" => Ok(Role::Admin),
            "sales_person" | "salesperson" => Ok(Role::SalesPerson),
            _ => Err(ValidationError::NotAllowed {
                field: "role".to_string(),
                allowed: vec!["admin".to_string(), "sales_person".to_string()],
            }),
        }
    }
}

// =============================================================================
// Company / Branch
// =============================================================================

/// A retail company. Root of the tenant tree.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A physical retail location; the unit of stock partitioning.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Branch {
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Catalog
// =============================================================================

/// Product grouping, unique by name within a company.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub company_id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A catalog product.
///
/// Branch-specific quantity and prices live in [`Stock`], not here.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Category this product belongs to. Fixed once stock exists.
    pub category_id: String,

    /// Display name; printed on sale items as a snapshot.
    pub name: String,

    /// Unit of measure ("pcs", "kg", "box").
    pub unit: String,

    /// Quantity at or below which the product shows up in the low-stock list.
    pub min_stock: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A supplier goods are purchased from.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// User
// =============================================================================

/// A system user.
///
/// `password_hash` is loaded from the database but never serialized.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct User {
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,

    /// Assigned branch. Required for sales persons.
    pub branch_id: Option<String>,

    #[serde(skip)]
    #[ts(skip)]
    pub password_hash: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Stock
// =============================================================================

/// The ledger row for one (product, branch) pair.
///
/// ## Invariants
/// - At most one row per (product_id, branch_id)
/// - `quantity >= 0` at all times
/// - `quantity` equals purchase inflows − sale outflows ± adjustment deltas
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Stock {
    pub id: String,
    pub product_id: String,
    pub branch_id: String,

    /// Last purchase buy price (last-write-wins).
    pub buy_price_cents: i64,

    /// Current selling price; sale lines freeze it when added to a cart.
    pub sell_price_cents: i64,

    pub quantity: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Stock {
    /// Returns the buy price as Money.
    #[inline]
    pub fn buy_price(&self) -> Money {
        Money::from_cents(self.buy_price_cents)
    }

    /// Returns the sell price as Money.
    #[inline]
    pub fn sell_price(&self) -> Money {
        Money::from_cents(self.sell_price_cents)
    }
}

// =============================================================================
// Purchase
// =============================================================================

/// Supplier intake header.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Purchase {
    pub id: String,
    pub supplier_id: String,
    pub branch_id: String,
    pub user_id: String,

    /// `PUR-YYYYMMDD-NNNN`
    pub invoice_no: String,

    pub total_cents: i64,

    #[ts(as = "String")]
    pub purchased_at: DateTime<Utc>,
}

/// One line of a purchase.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseItem {
    pub id: String,
    pub purchase_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub buy_price_cents: i64,

    /// Sell price written to the stock row by this line.
    pub sell_price_cents: i64,

    pub line_total_cents: i64,
}

// =============================================================================
// Sale
// =============================================================================

/// Customer checkout header.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub branch_id: String,

    /// Seller.
    pub user_id: String,

    /// `INV-YYYYMMDD-NNNN`
    pub invoice_no: String,

    pub total_cents: i64,

    #[ts(as = "String")]
    pub sold_at: DateTime<Utc>,
}

/// One line of a sale.
///
/// ## Snapshot Pattern
/// Name and unit price are copied at the time the line entered the cart,
/// so history survives later catalog edits.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

// =============================================================================
// Stock Adjustment
// =============================================================================

/// Why a manual adjustment was made.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentType {
    Damaged,
    Expired,
    ManualCorrection,
    StockCount,
}

impl AdjustmentType {
    /// Stored / wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentType::Damaged => "damaged",
            AdjustmentType::Expired => "expired",
            AdjustmentType::ManualCorrection => "manual_correction",
            AdjustmentType::StockCount => "stock_count",
        }
    }
}

impl fmt::Display for AdjustmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdjustmentType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "damaged" => Ok(AdjustmentType::Damaged),
            "expired" => Ok(AdjustmentType::Expired),
            "manual_correction" => Ok(AdjustmentType::ManualCorrection),
            "stock_count" => Ok(AdjustmentType::StockCount),
            _ => Err(ValidationError::NotAllowed {
                field: "adjustment_type".to_string(),
                allowed: ["damaged", "expired", "manual_correction", "stock_count"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            }),
        }
    }
}

/// Direction of a manual adjustment.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentAction {
    Increase,
    Decrease,
}

impl FromStr for AdjustmentAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "increase" => Ok(AdjustmentAction::Increase),
            "decrease" => Ok(AdjustmentAction::Decrease),
            _ => Err(ValidationError::NotAllowed {
                field: "action".to_string(),
                allowed: vec!["increase".to_string(), "decrease".to_string()],
            }),
        }
    }
}

/// Append-only audit record of a manual stock correction.
///
/// Never updated or deleted after insert.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockAdjustment {
    pub id: String,
    pub stock_id: String,
    pub user_id: String,
    pub adjustment_type: AdjustmentType,
    pub action: AdjustmentAction,
    pub quantity: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Operation Inputs
// =============================================================================

/// One purchase line as submitted for persistence.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseLineInput {
    pub product_id: String,
    pub quantity: i64,
    pub buy_price_cents: i64,
    pub sell_price_cents: i64,
}

impl PurchaseLineInput {
    /// quantity × buy price.
    pub fn line_total(&self) -> ValidationResult<Money> {
        line_total(self.buy_price_cents, self.quantity)
    }
}

/// A complete purchase ready to commit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPurchase {
    pub supplier_id: String,
    pub branch_id: String,
    pub user_id: String,
    pub lines: Vec<PurchaseLineInput>,
}

impl NewPurchase {
    /// Sum of line subtotals.
    pub fn total(&self) -> ValidationResult<Money> {
        sum_line_totals(self.lines.iter().map(PurchaseLineInput::line_total))
    }
}

/// One sale line as submitted for persistence.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleLineInput {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

impl SaleLineInput {
    /// quantity × unit price.
    pub fn line_total(&self) -> ValidationResult<Money> {
        line_total(self.unit_price_cents, self.quantity)
    }
}

/// A complete sale ready to commit.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewSale {
    pub branch_id: String,
    pub user_id: String,
    pub lines: Vec<SaleLineInput>,
}

impl NewSale {
    /// Sum of line subtotals.
    pub fn total(&self) -> ValidationResult<Money> {
        sum_line_totals(self.lines.iter().map(SaleLineInput::line_total))
    }
}

/// A manual stock correction request.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewAdjustment {
    pub product_id: String,
    pub branch_id: String,
    pub user_id: String,
    pub adjustment_type: AdjustmentType,
    pub action: AdjustmentAction,
    pub quantity: i64,
    pub reason: Option<String>,
}

/// Branch create/update payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BranchInput {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Supplier create/update payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SupplierInput {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// Manual stock registration: a new product with its opening stock in a branch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewStockedProduct {
    pub category_id: String,
    pub branch_id: String,
    pub name: String,
    pub unit: String,
    pub min_stock: i64,
    pub buy_price_cents: i64,
    pub sell_price_cents: i64,
    pub opening_quantity: i64,
}

/// Descriptive product fields that stay editable once stock exists.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    pub name: String,
    pub unit: String,
    pub min_stock: i64,

    /// New category; rejected when the product already has stock.
    pub category_id: Option<String>,
}

/// User creation payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub branch_id: Option<String>,
    pub password: String,
    pub password_confirmation: String,
}

/// Profile fields editable after creation. Passwords change separately.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserUpdate {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub role: Role,
    pub branch_id: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parsing_accepts_display_form() {
        assert_eq!("Sales Person".parse::<Role>().unwrap(), Role::SalesPerson);
        assert_eq!("sales_person".parse::<Role>().unwrap(), Role::SalesPerson);
        assert_eq!("admin".parse::<Role>().unwrap(), Role::Admin);
        assert!("cashier".parse::<Role>().is_err());
        assert_eq!(Role::SalesPerson.to_string(), "Sales Person");
    }

    #[test]
    fn test_adjustment_enums_round_trip_through_strings() {
        for t in [
            AdjustmentType::Damaged,
            AdjustmentType::Expired,
            AdjustmentType::ManualCorrection,
            AdjustmentType::StockCount,
        ] {
            assert_eq!(t.as_str().parse::<AdjustmentType>().unwrap(), t);
        }
        assert!("lost".parse::<AdjustmentType>().is_err());
        assert_eq!("decrease".parse::<AdjustmentAction>().unwrap(), AdjustmentAction::Decrease);
    }

    #[test]
    fn test_serde_uses_snake_case() {
        let json = serde_json::to_string(&AdjustmentType::ManualCorrection).unwrap();
        assert_eq!(json, "\"manual_correction\"");
        let json = serde_json::to_string(&Role::SalesPerson).unwrap();
        assert_eq!(json, "\"sales_person\"");
    }

    #[test]
    fn test_purchase_total_sums_lines() {
        let purchase = NewPurchase {
            supplier_id: "s".into(),
            branch_id: "b".into(),
            user_id: "u".into(),
            lines: vec![
                PurchaseLineInput {
                    product_id: "p1".into(),
                    quantity: 20,
                    buy_price_cents: 50,
                    sell_price_cents: 65,
                },
                PurchaseLineInput {
                    product_id: "p2".into(),
                    quantity: 2,
                    buy_price_cents: 1000,
                    sell_price_cents: 1300,
                },
            ],
        };
        assert_eq!(purchase.total().unwrap().cents(), 3000);
    }

    #[test]
    fn test_sale_total_reports_overflow() {
        let line = |unit_price_cents| SaleLineInput {
            product_id: "p1".into(),
            product_name: "Sugar 1kg".into(),
            quantity: 2,
            unit_price_cents,
        };
        let sale = NewSale {
            branch_id: "b".into(),
            user_id: "u".into(),
            lines: vec![line(6500), line(i64::MAX / 2)],
        };

        assert_eq!(sale.lines[0].line_total().unwrap().cents(), 13_000);
        assert!(matches!(
            sale.total(),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_user_password_hash_not_serialized() {
        let now = Utc::now();
        let user = User {
            id: "u".into(),
            company_id: "c".into(),
            name: "Amina".into(),
            email: "amina@example.com".into(),
            phone: None,
            role: Role::Admin,
            branch_id: None,
            password_hash: "secret-hash".into(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
    }
}
