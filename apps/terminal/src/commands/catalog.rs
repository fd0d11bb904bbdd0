//! # Catalog Commands
//!
//! Branches, categories, suppliers, products and the stock listing.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operation                      Admin          Sales person            │
//! │  ─────────────────────────      ───────────    ─────────────────────── │
//! │  branches: create/update/delete ✓              ✗ FORBIDDEN             │
//! │  categories: create/rename/del  ✓              ✗ FORBIDDEN             │
//! │  suppliers: create/update       ✓              ✓                       │
//! │  suppliers: delete              ✓              ✗ FORBIDDEN             │
//! │  products: register             any branch     own branch only         │
//! │  products: update               ✓              ✗ FORBIDDEN             │
//! │  listings                       company scope  own branch              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{company_product, ensure_branch_visible};
use crate::error::ApiError;
use crate::state::{ConfigState, DbState};
use duka_core::{
    Actor, Branch, BranchInput, Category, NewStockedProduct, Product, ProductUpdate, Supplier,
    SupplierInput,
};
use duka_db::{RegisteredProduct, StockListingRow};

// =============================================================================
// Branches
// =============================================================================

pub async fn list_branches(db: &DbState, actor: &Actor) -> Result<Vec<Branch>, ApiError> {
    let scope = actor.scope()?;
    debug!(?scope, "list_branches command");
    Ok(db.inner().branches().list(&scope).await?)
}

pub async fn create_branch(
    db: &DbState,
    actor: &Actor,
    input: BranchInput,
) -> Result<Branch, ApiError> {
    debug!(name = %input.name, "create_branch command");
    actor.require_admin()?;
    Ok(db.inner().branches().create(&actor.company_id, input).await?)
}

pub async fn update_branch(
    db: &DbState,
    actor: &Actor,
    branch_id: &str,
    input: BranchInput,
) -> Result<Branch, ApiError> {
    debug!(branch_id = %branch_id, "update_branch command");
    actor.require_admin()?;
    ensure_branch_visible(db, actor, branch_id).await?;
    Ok(db.inner().branches().update(branch_id, input).await?)
}

/// Deletes a branch. Branches that still hold stock, users or history
/// cannot be deleted.
pub async fn delete_branch(db: &DbState, actor: &Actor, branch_id: &str) -> Result<(), ApiError> {
    debug!(branch_id = %branch_id, "delete_branch command");
    actor.require_admin()?;
    ensure_branch_visible(db, actor, branch_id).await?;
    db.inner().branches().delete(branch_id).await?;
    info!(branch_id = %branch_id, "Branch deleted");
    Ok(())
}

// =============================================================================
// Categories
// =============================================================================

pub async fn list_categories(db: &DbState, actor: &Actor) -> Result<Vec<Category>, ApiError> {
    let scope = actor.scope()?;
    Ok(db.inner().categories().list(&scope).await?)
}

pub async fn create_category(
    db: &DbState,
    actor: &Actor,
    name: &str,
) -> Result<Category, ApiError> {
    debug!(name = %name, "create_category command");
    actor.require_admin()?;
    Ok(db.inner().categories().create(&actor.company_id, name).await?)
}

pub async fn rename_category(
    db: &DbState,
    actor: &Actor,
    category_id: &str,
    name: &str,
) -> Result<Category, ApiError> {
    debug!(category_id = %category_id, name = %name, "rename_category command");
    actor.require_admin()?;
    company_category(db, actor, category_id).await?;
    Ok(db.inner().categories().rename(category_id, name).await?)
}

pub async fn delete_category(
    db: &DbState,
    actor: &Actor,
    category_id: &str,
) -> Result<(), ApiError> {
    debug!(category_id = %category_id, "delete_category command");
    actor.require_admin()?;
    company_category(db, actor, category_id).await?;
    db.inner().categories().delete(category_id).await?;
    Ok(())
}

async fn company_category(
    db: &DbState,
    actor: &Actor,
    category_id: &str,
) -> Result<Category, ApiError> {
    db.inner()
        .categories()
        .get_by_id(category_id)
        .await?
        .filter(|c| c.company_id == actor.company_id)
        .ok_or_else(|| ApiError::not_found("Category", category_id))
}

// =============================================================================
// Suppliers
// =============================================================================

pub async fn search_suppliers(
    db: &DbState,
    config: &ConfigState,
    search: Option<String>,
) -> Result<Vec<Supplier>, ApiError> {
    debug!(search = ?search, "search_suppliers command");
    Ok(db
        .inner()
        .suppliers()
        .search(search.as_deref(), config.recent_limit())
        .await?)
}

pub async fn create_supplier(db: &DbState, input: SupplierInput) -> Result<Supplier, ApiError> {
    debug!(name = %input.name, "create_supplier command");
    Ok(db.inner().suppliers().create(input).await?)
}

pub async fn update_supplier(
    db: &DbState,
    supplier_id: &str,
    input: SupplierInput,
) -> Result<Supplier, ApiError> {
    debug!(supplier_id = %supplier_id, "update_supplier command");
    Ok(db.inner().suppliers().update(supplier_id, input).await?)
}

/// Deletes a supplier with no purchases on record.
pub async fn delete_supplier(
    db: &DbState,
    actor: &Actor,
    supplier_id: &str,
) -> Result<(), ApiError> {
    debug!(supplier_id = %supplier_id, "delete_supplier command");
    actor.require_admin()?;
    db.inner().suppliers().delete(supplier_id).await?;
    Ok(())
}

// =============================================================================
// Products & Stock
// =============================================================================

/// A new product stocked in one branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterProductRequest {
    /// Sales persons always register into their own branch.
    #[serde(default)]
    pub branch_id: Option<String>,
    pub category_id: String,
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub min_stock: i64,
    pub buy_price_cents: i64,
    pub sell_price_cents: i64,
    #[serde(default)]
    pub opening_quantity: i64,
}

/// Creates a product with its stock row; a positive opening quantity is
/// recorded as a stock-count adjustment.
pub async fn register_product(
    db: &DbState,
    actor: &Actor,
    request: RegisterProductRequest,
) -> Result<RegisteredProduct, ApiError> {
    debug!(name = %request.name, "register_product command");

    let branch_id = actor.working_branch(request.branch_id.as_deref())?;
    ensure_branch_visible(db, actor, &branch_id).await?;
    company_category(db, actor, &request.category_id).await?;

    let registered = db
        .inner()
        .products()
        .register(
            NewStockedProduct {
                category_id: request.category_id,
                branch_id,
                name: request.name,
                unit: request.unit,
                min_stock: request.min_stock,
                buy_price_cents: request.buy_price_cents,
                sell_price_cents: request.sell_price_cents,
                opening_quantity: request.opening_quantity,
            },
            &actor.user_id,
        )
        .await?;
    Ok(registered)
}

pub async fn update_product(
    db: &DbState,
    actor: &Actor,
    product_id: &str,
    update: ProductUpdate,
) -> Result<Product, ApiError> {
    debug!(product_id = %product_id, "update_product command");
    actor.require_admin()?;
    company_product(db, actor, product_id).await?;
    if let Some(category_id) = update.category_id.as_deref() {
        company_category(db, actor, category_id).await?;
    }
    Ok(db.inner().products().update(product_id, update).await?)
}

pub async fn list_products(
    db: &DbState,
    actor: &Actor,
    search: Option<String>,
) -> Result<Vec<Product>, ApiError> {
    Ok(db
        .inner()
        .products()
        .list(&actor.company_id, search.as_deref())
        .await?)
}

/// Stock rows in scope with product, category and branch names.
pub async fn stock_listing(
    db: &DbState,
    actor: &Actor,
    branch_filter: Option<String>,
    search: Option<String>,
) -> Result<Vec<StockListingRow>, ApiError> {
    let scope = actor.scope_for(branch_filter.as_deref())?;
    debug!(?scope, search = ?search, "stock_listing command");
    Ok(db.inner().stocks().list(&scope, search.as_deref()).await?)
}
