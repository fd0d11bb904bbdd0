//! # Commands Module
//!
//! Every operation a terminal front end can invoke.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs           ◄─── You are here (shared DTOs and access checks)
//! ├── sale.rs          ◄─── Sale cart, checkout, sales history
//! ├── purchase.rs      ◄─── Purchase cart, supplier intake, history
//! ├── adjustment.rs    ◄─── Manual stock corrections
//! ├── catalog.rs       ◄─── Branches, categories, suppliers, products, stock
//! ├── user.rs          ◄─── Login and user management
//! ├── registration.rs  ◄─── Company onboarding
//! └── report.rs        ◄─── Reports, dashboard, ledger check
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  complete_sale(&db, &carts, &config, &actor)                           │
//! │         │                                                               │
//! │         ├── actor ──► selling branch / scope (duka-core::access)       │
//! │         ├── carts ──► snapshot of the user's cart                      │
//! │         ├── db ─────► one transaction in duka-db                       │
//! │         ▼                                                               │
//! │  Result<SaleCompletedResponse, ApiError>                                │
//! │         │                                                               │
//! │         │ (serde)                                                       │
//! │         ▼                                                               │
//! │  { "saleId": "...", "invoiceNo": "INV-20240315-0001", "stocks": [...] } │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each command declares only the state it needs, plus the [`Actor`] it acts
//! for (from [`user::login`]).

pub mod adjustment;
pub mod catalog;
pub mod purchase;
pub mod registration;
pub mod report;
pub mod sale;
pub mod user;

use serde::Serialize;

use crate::error::ApiError;
use crate::state::DbState;
use duka_core::{Actor, BranchScope, CoreError, Product, Stock};

/// A stock row as it stands after a movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSnapshot {
    pub stock_id: String,
    pub product_id: String,
    pub branch_id: String,
    pub quantity: i64,
    pub buy_price_cents: i64,
    pub sell_price_cents: i64,
}

impl From<&Stock> for StockSnapshot {
    fn from(stock: &Stock) -> Self {
        StockSnapshot {
            stock_id: stock.id.clone(),
            product_id: stock.product_id.clone(),
            branch_id: stock.branch_id.clone(),
            quantity: stock.quantity,
            buy_price_cents: stock.buy_price_cents,
            sell_price_cents: stock.sell_price_cents,
        }
    }
}

/// Fails unless `branch_id` exists and lies inside the actor's scope.
pub(crate) async fn ensure_branch_visible(
    db: &DbState,
    actor: &Actor,
    branch_id: &str,
) -> Result<(), ApiError> {
    let branch = db
        .inner()
        .branches()
        .get_by_id(branch_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Branch", branch_id))?;

    let visible = match actor.scope()? {
        BranchScope::All => true,
        BranchScope::Company(company_id) => branch.company_id == company_id,
        BranchScope::Branch(own) => branch.id == own,
    };

    if visible {
        Ok(())
    } else {
        Err(CoreError::forbidden("branch is outside your access").into())
    }
}

/// Loads a product that belongs to the actor's company.
///
/// Products of other companies are reported as missing.
pub(crate) async fn company_product(
    db: &DbState,
    actor: &Actor,
    product_id: &str,
) -> Result<Product, ApiError> {
    let db = db.inner();
    let product = db
        .products()
        .get_by_id(product_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product", product_id))?;

    let category = db
        .categories()
        .get_by_id(&product.category_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Category", &product.category_id))?;

    if category.company_id != actor.company_id {
        return Err(ApiError::not_found("Product", product_id));
    }
    Ok(product)
}

#[cfg(test)]
pub(crate) mod test_support {
    //! A registered company with two branches, a seller and a stocked product.

    use crate::config::AppConfig;
    use crate::state::{CartState, ConfigState, DbState};
    use duka_core::registration::{AdminDetails, BranchDetails, CompanyDetails, RegistrationForm};
    use duka_core::{Actor, BranchInput, NewStockedProduct, NewUser, Role};
    use duka_db::{Database, DbConfig};

    pub const PASSWORD: &str = "counter-123";

    pub struct Terminal {
        pub db: DbState,
        pub carts: CartState,
        pub config: ConfigState,
        pub admin: Actor,
        pub seller: Actor,
        pub branch_id: String,
        pub other_branch_id: String,
        pub category_id: String,
        pub supplier_id: String,
        /// "Sugar 1kg" in the main branch: 10 on hand, sells at 65.00.
        pub sugar_id: String,
    }

    impl Terminal {
        pub async fn new() -> Self {
            let db = Database::new(DbConfig::in_memory()).await.unwrap();

            let mut form = RegistrationForm::new();
            form.submit_company(CompanyDetails {
                name: "Jamii Mart".into(),
                email: "info@jamii.test".into(),
                phone: "0700 111 222".into(),
                address: "Tom Mboya Street".into(),
            })
            .unwrap();
            form.submit_branch(BranchDetails {
                name: "Main Branch".into(),
                phone: "0700 111 223".into(),
                address: "Tom Mboya Street".into(),
            })
            .unwrap();
            let submission = form
                .finish(AdminDetails {
                    name: "Amina Yusuf".into(),
                    email: "amina@jamii.test".into(),
                    phone: None,
                    password: PASSWORD.into(),
                    password_confirmation: PASSWORD.into(),
                })
                .unwrap();
            let registered = db.companies().register(submission).await.unwrap();
            let admin = Actor::from(&registered.admin);
            let branch_id = registered.branch.id.clone();

            let other = db
                .branches()
                .create(
                    &registered.company.id,
                    BranchInput {
                        name: "Second Branch".into(),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();

            let seller = db
                .users()
                .create(
                    &admin,
                    NewUser {
                        name: "Baraka Otieno".into(),
                        email: "baraka@jamii.test".into(),
                        phone: None,
                        role: Role::SalesPerson,
                        branch_id: Some(branch_id.clone()),
                        password: PASSWORD.into(),
                        password_confirmation: PASSWORD.into(),
                    },
                )
                .await
                .unwrap();

            let category = db
                .categories()
                .create(&registered.company.id, "Groceries")
                .await
                .unwrap();

            let supplier = db
                .suppliers()
                .create(duka_core::SupplierInput {
                    name: "Mombasa Wholesale".into(),
                    ..Default::default()
                })
                .await
                .unwrap();

            let sugar = db
                .products()
                .register(
                    NewStockedProduct {
                        category_id: category.id.clone(),
                        branch_id: branch_id.clone(),
                        name: "Sugar 1kg".into(),
                        unit: "pcs".into(),
                        min_stock: 5,
                        buy_price_cents: 5000,
                        sell_price_cents: 6500,
                        opening_quantity: 10,
                    },
                    &admin.user_id,
                )
                .await
                .unwrap();

            Terminal {
                db: DbState::new(db),
                carts: CartState::new(),
                config: ConfigState::new(AppConfig::default()),
                admin,
                seller: Actor::from(&seller),
                branch_id,
                other_branch_id: other.id,
                category_id: category.id,
                supplier_id: supplier.id,
                sugar_id: sugar.product.id,
            }
        }

        pub async fn quantity(&self, product_id: &str, branch_id: &str) -> Option<i64> {
            self.db
                .inner()
                .stocks()
                .find(product_id, branch_id)
                .await
                .unwrap()
                .map(|s| s.quantity)
        }
    }
}
