//! Shared fixtures for repository tests.
//!
//! One company with two branches, an admin and a sales person in the main
//! branch, one category, one product and one supplier. No stock rows exist
//! until a test creates them.

use chrono::Utc;
use uuid::Uuid;

use crate::{Database, DbConfig};
use duka_core::{
    Actor, Money, NewPurchase, Product, PurchaseLineInput, Role, Stock, DEFAULT_MARKUP_BPS,
};

/// Never verifies; tests that log in set a real password first.
const PLACEHOLDER_HASH: &str = "not-a-real-hash";

pub(crate) struct Fixture {
    pub db: Database,
    pub company_id: String,
    pub branch_id: String,
    pub other_branch_id: String,
    pub admin_id: String,
    pub seller_id: String,
    pub category_id: String,
    pub product_id: String,
    pub supplier_id: String,
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

impl Fixture {
    pub async fn new() -> Self {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();

        let company_id = new_id();
        sqlx::query(
            "INSERT INTO companies (id, name, email, phone, address, created_at)
             VALUES (?1, 'Duka Test Traders', 'info@duka.test', '0700000000', 'Moi Avenue', ?2)",
        )
        .bind(&company_id)
        .bind(now)
        .execute(db.pool())
        .await
        .unwrap();

        let branch_id = new_id();
        let other_branch_id = new_id();
        for (id, name) in [(&branch_id, "Main Branch"), (&other_branch_id, "Second Branch")] {
            sqlx::query(
                "INSERT INTO branches (id, company_id, name, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
            )
            .bind(id)
            .bind(&company_id)
            .bind(name)
            .bind(now)
            .execute(db.pool())
            .await
            .unwrap();
        }

        let admin_id = new_id();
        let seller_id = new_id();
        for (id, name, email, role) in [
            (&admin_id, "Amina Yusuf", "admin@duka.test", Role::Admin),
            (&seller_id, "Baraka Otieno", "seller@duka.test", Role::SalesPerson),
        ] {
            sqlx::query(
                "INSERT INTO users (id, company_id, name, email, role, branch_id, password_hash, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
            )
            .bind(id)
            .bind(&company_id)
            .bind(name)
            .bind(email)
            .bind(role)
            .bind(&branch_id)
            .bind(PLACEHOLDER_HASH)
            .bind(now)
            .execute(db.pool())
            .await
            .unwrap();
        }

        let supplier_id = new_id();
        sqlx::query(
            "INSERT INTO suppliers (id, name, phone, created_at, updated_at)
             VALUES (?1, 'Mombasa Wholesale', '0733000000', ?2, ?2)",
        )
        .bind(&supplier_id)
        .bind(now)
        .execute(db.pool())
        .await
        .unwrap();

        let mut fixture = Fixture {
            db,
            company_id,
            branch_id,
            other_branch_id,
            admin_id,
            seller_id,
            category_id: String::new(),
            product_id: String::new(),
            supplier_id,
        };
        fixture.category_id = fixture.category_named("Groceries").await;
        fixture.product_id = fixture.product_named("Sugar 1kg").await;
        fixture
    }

    /// Inserts a category in the fixture company and returns its id.
    pub async fn category_named(&self, name: &str) -> String {
        let id = new_id();
        sqlx::query(
            "INSERT INTO categories (id, company_id, name, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
        )
        .bind(&id)
        .bind(&self.company_id)
        .bind(name)
        .bind(Utc::now())
        .execute(self.db.pool())
        .await
        .unwrap();
        id
    }

    /// Inserts a product in the fixture category and returns its id.
    pub async fn product_named(&self, name: &str) -> String {
        let id = new_id();
        sqlx::query(
            "INSERT INTO products (id, category_id, name, unit, min_stock, created_at, updated_at)
             VALUES (?1, ?2, ?3, 'pcs', 5, ?4, ?4)",
        )
        .bind(&id)
        .bind(&self.category_id)
        .bind(name)
        .bind(Utc::now())
        .execute(self.db.pool())
        .await
        .unwrap();
        id
    }

    /// The fixture product ("Sugar 1kg").
    pub async fn product(&self) -> Product {
        self.db
            .products()
            .get_by_id(&self.product_id)
            .await
            .unwrap()
            .unwrap()
    }

    /// A stock row for the fixture product in the main branch.
    pub async fn stock_with(&self, quantity: i64, buy_cents: i64, sell_cents: i64) -> Stock {
        self.stock_for(&self.product_id, &self.branch_id, quantity, buy_cents, sell_cents)
            .await
    }

    /// A stock row written directly, bypassing the movement log.
    pub async fn stock_for(
        &self,
        product_id: &str,
        branch_id: &str,
        quantity: i64,
        buy_cents: i64,
        sell_cents: i64,
    ) -> Stock {
        let id = new_id();
        sqlx::query(
            "INSERT INTO stocks (id, product_id, branch_id, buy_price_cents, sell_price_cents, quantity, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
        )
        .bind(&id)
        .bind(product_id)
        .bind(branch_id)
        .bind(buy_cents)
        .bind(sell_cents)
        .bind(quantity)
        .bind(Utc::now())
        .execute(self.db.pool())
        .await
        .unwrap();

        self.db.stocks().get_by_id(&id).await.unwrap().unwrap()
    }

    pub async fn quantity_of(&self, stock_id: &str) -> i64 {
        sqlx::query_scalar("SELECT quantity FROM stocks WHERE id = ?1")
            .bind(stock_id)
            .fetch_one(self.db.pool())
            .await
            .unwrap()
    }

    /// A purchase into the main branch from the fixture supplier.
    ///
    /// Lines are `(product_id, quantity, buy_cents)`; sell price is the
    /// default markup over buy.
    pub fn purchase_of(&self, lines: &[(&str, i64, i64)]) -> NewPurchase {
        NewPurchase {
            supplier_id: self.supplier_id.clone(),
            branch_id: self.branch_id.clone(),
            user_id: self.admin_id.clone(),
            lines: lines
                .iter()
                .map(|&(product_id, quantity, buy_cents)| PurchaseLineInput {
                    product_id: product_id.to_string(),
                    quantity,
                    buy_price_cents: buy_cents,
                    sell_price_cents: Money::from_cents(buy_cents)
                        .apply_markup(DEFAULT_MARKUP_BPS)
                        .unwrap()
                        .cents(),
                })
                .collect(),
        }
    }

    pub fn admin(&self) -> Actor {
        Actor {
            user_id: self.admin_id.clone(),
            company_id: self.company_id.clone(),
            role: Role::Admin,
            branch_id: Some(self.branch_id.clone()),
        }
    }

    pub fn seller(&self) -> Actor {
        Actor {
            user_id: self.seller_id.clone(),
            company_id: self.company_id.clone(),
            role: Role::SalesPerson,
            branch_id: Some(self.branch_id.clone()),
        }
    }
}
