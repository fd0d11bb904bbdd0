//! # Product Repository
//!
//! Catalog products and manual stock registration.
//!
//! ## Register Product
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "Add stock" form: category, branch, name, unit, min stock,            │
//! │                    buy price, sell price, opening quantity              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN                                                                  │
//! │       ├── category belongs to the branch's company?  → NotFound         │
//! │       ├── same name already stocked in this branch?  → DuplicateEntity  │
//! │       ├── INSERT products                                               │
//! │       ├── INSERT stocks (quantity 0, given prices)                      │
//! │       └── opening quantity > 0:                                         │
//! │             stock_count / increase adjustment "Opening stock"           │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Opening stock goes through the adjustment log so reconciliation accounts
//! for every unit on hand.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::{adjustment, begin, finish, like_pattern, stock};
use duka_core::validation::{
    validate_id, validate_name, validate_non_negative, validate_price_cents,
};
use duka_core::{
    AdjustmentAction, AdjustmentType, CoreError, NewAdjustment, NewStockedProduct, Product,
    ProductUpdate, Stock, StockAdjustment,
};

/// Result of registering a product with its opening stock.
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredProduct {
    pub product: Product,
    pub stock: Stock,

    /// Present when the opening quantity was positive.
    pub opening: Option<StockAdjustment>,
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product and its stock row in one branch.
    pub async fn register(
        &self,
        input: NewStockedProduct,
        user_id: &str,
    ) -> DbResult<RegisteredProduct> {
        let input = validated(input)?;
        debug!(name = %input.name, branch_id = %input.branch_id, "Registering product");

        let mut tx = begin(&self.pool).await?;
        let result = write_registration(&mut tx, &input, user_id, Utc::now()).await;
        let registered = finish(tx, result, "register_product").await?;

        info!(
            product_id = %registered.product.id,
            branch_id = %registered.stock.branch_id,
            quantity = registered.stock.quantity,
            "Product registered"
        );
        Ok(registered)
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, category_id, name, unit, min_stock, created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Products of a company, optionally filtered by name.
    pub async fn list(&self, company_id: &str, search: Option<&str>) -> DbResult<Vec<Product>> {
        let pattern = like_pattern(search)?.unwrap_or_else(|| "%".to_string());

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT p.id, p.category_id, p.name, p.unit, p.min_stock, p.created_at, p.updated_at
            FROM products p
            JOIN categories c ON c.id = p.category_id
            WHERE c.company_id = ?1 AND p.name LIKE ?2
            ORDER BY p.name
            "#,
        )
        .bind(company_id)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Updates descriptive fields.
    ///
    /// The category is fixed once the product has stock anywhere.
    pub async fn update(&self, id: &str, update: ProductUpdate) -> DbResult<Product> {
        let name = validate_name("name", &update.name, 255)?;
        let unit = validate_name("unit", &update.unit, 50)?;
        validate_non_negative("min_stock", update.min_stock)?;

        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        let category_id = match update.category_id {
            Some(category_id) if category_id != current.category_id => {
                let stocked: i64 =
                    sqlx::query_scalar("SELECT COUNT(*) FROM stocks WHERE product_id = ?1")
                        .bind(id)
                        .fetch_one(&self.pool)
                        .await?;
                if stocked > 0 {
                    return Err(CoreError::forbidden(
                        "category cannot change once the product has stock",
                    )
                    .into());
                }
                category_id
            }
            _ => current.category_id.clone(),
        };

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE products SET
                name = ?1, unit = ?2, min_stock = ?3, category_id = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(&name)
        .bind(&unit)
        .bind(update.min_stock)
        .bind(&category_id)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        debug!(id = %id, "Product updated");

        Ok(Product {
            name,
            unit,
            min_stock: update.min_stock,
            category_id,
            updated_at: now,
            ..current
        })
    }
}

fn validated(input: NewStockedProduct) -> DbResult<NewStockedProduct> {
    validate_id("category", &input.category_id)?;
    validate_id("branch", &input.branch_id)?;
    validate_non_negative("min_stock", input.min_stock)?;
    validate_price_cents("buy_price", input.buy_price_cents)?;
    validate_price_cents("sell_price", input.sell_price_cents)?;
    validate_non_negative("opening_quantity", input.opening_quantity)?;

    Ok(NewStockedProduct {
        name: validate_name("name", &input.name, 255)?,
        unit: validate_name("unit", &input.unit, 50)?,
        ..input
    })
}

async fn write_registration(
    conn: &mut SqliteConnection,
    input: &NewStockedProduct,
    user_id: &str,
    at: DateTime<Utc>,
) -> DbResult<RegisteredProduct> {
    let same_company: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM categories c
        JOIN branches b ON b.company_id = c.company_id
        WHERE c.id = ?1 AND b.id = ?2
        "#,
    )
    .bind(&input.category_id)
    .bind(&input.branch_id)
    .fetch_one(&mut *conn)
    .await?;

    if same_company == 0 {
        return Err(DbError::not_found("Category", &input.category_id));
    }

    let duplicate: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM products p
        JOIN stocks s ON s.product_id = p.id
        WHERE s.branch_id = ?1 AND lower(p.name) = lower(?2)
        "#,
    )
    .bind(&input.branch_id)
    .bind(&input.name)
    .fetch_one(&mut *conn)
    .await?;

    if duplicate > 0 {
        return Err(CoreError::duplicate("Product", &input.name).into());
    }

    let product = Product {
        id: Uuid::new_v4().to_string(),
        category_id: input.category_id.clone(),
        name: input.name.clone(),
        unit: input.unit.clone(),
        min_stock: input.min_stock,
        created_at: at,
        updated_at: at,
    };

    sqlx::query(
        r#"
        INSERT INTO products (id, category_id, name, unit, min_stock, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        "#,
    )
    .bind(&product.id)
    .bind(&product.category_id)
    .bind(&product.name)
    .bind(&product.unit)
    .bind(product.min_stock)
    .bind(at)
    .execute(&mut *conn)
    .await?;

    let created = stock::create(
        conn,
        &product.id,
        &input.branch_id,
        input.buy_price_cents,
        input.sell_price_cents,
        at,
    )
    .await?;

    if input.opening_quantity == 0 {
        return Ok(RegisteredProduct {
            product,
            stock: created,
            opening: None,
        });
    }

    let opening = NewAdjustment {
        product_id: product.id.clone(),
        branch_id: input.branch_id.clone(),
        user_id: user_id.to_string(),
        adjustment_type: AdjustmentType::StockCount,
        action: AdjustmentAction::Increase,
        quantity: input.opening_quantity,
        reason: Some("Opening stock".to_string()),
    };
    let receipt = adjustment::apply(conn, &opening, at).await?;

    Ok(RegisteredProduct {
        product,
        stock: receipt.stock,
        opening: Some(receipt.adjustment),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::Fixture;

    fn maize_flour(fx: &Fixture, opening: i64) -> NewStockedProduct {
        NewStockedProduct {
            category_id: fx.category_id.clone(),
            branch_id: fx.branch_id.clone(),
            name: "  Maize Flour 2kg ".into(),
            unit: "pcs".into(),
            min_stock: 5,
            buy_price_cents: 15_000,
            sell_price_cents: 18_000,
            opening_quantity: opening,
        }
    }

    #[tokio::test]
    async fn test_register_with_opening_stock_is_audited() {
        let fx = Fixture::new().await;
        let registered = fx
            .db
            .products()
            .register(maize_flour(&fx, 12), &fx.admin_id)
            .await
            .unwrap();

        assert_eq!(registered.product.name, "Maize Flour 2kg");
        assert_eq!(registered.stock.quantity, 12);
        assert_eq!(registered.stock.sell_price_cents, 18_000);
        let opening = registered.opening.unwrap();
        assert_eq!(opening.adjustment_type, AdjustmentType::StockCount);
        assert_eq!((opening.quantity_before, opening.quantity_after), (0, 12));

        let checks = fx
            .db
            .stocks()
            .reconcile(&duka_core::BranchScope::All)
            .await
            .unwrap();
        assert!(checks.iter().all(|c| c.is_consistent()));
    }

    #[tokio::test]
    async fn test_duplicate_name_in_same_branch_is_rejected() {
        let fx = Fixture::new().await;
        let products = fx.db.products();
        products.register(maize_flour(&fx, 0), &fx.admin_id).await.unwrap();

        let mut again = maize_flour(&fx, 0);
        again.name = "maize flour 2KG".into();
        let err = products.register(again, &fx.admin_id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::DuplicateEntity { .. })
        ));

        // Same name in another branch is fine.
        let mut elsewhere = maize_flour(&fx, 0);
        elsewhere.branch_id = fx.other_branch_id.clone();
        products.register(elsewhere, &fx.admin_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_negative_prices_are_rejected() {
        let fx = Fixture::new().await;
        let mut input = maize_flour(&fx, 0);
        input.buy_price_cents = -1;

        let err = fx.db.products().register(input, &fx.admin_id).await.unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_category_is_fixed_once_stocked() {
        let fx = Fixture::new().await;
        let products = fx.db.products();
        let registered = products.register(maize_flour(&fx, 0), &fx.admin_id).await.unwrap();
        let other_category = fx.category_named("Beverages").await;

        let err = products
            .update(
                &registered.product.id,
                ProductUpdate {
                    name: "Maize Flour".into(),
                    unit: "pcs".into(),
                    min_stock: 3,
                    category_id: Some(other_category),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::Forbidden { .. })));

        let updated = products
            .update(
                &registered.product.id,
                ProductUpdate {
                    name: "Maize Flour".into(),
                    unit: "pcs".into(),
                    min_stock: 3,
                    category_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Maize Flour");
        assert_eq!(updated.min_stock, 3);

        let listed = products.list(&fx.company_id, Some("maize")).await.unwrap();
        assert_eq!(listed.len(), 1);
    }
}
