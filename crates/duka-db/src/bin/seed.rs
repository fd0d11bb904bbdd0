//! # Seed Data Generator
//!
//! Populates a database with a demo company for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./duka_dev.db
//! cargo run -p duka-db --bin seed
//!
//! # Specify database path
//! cargo run -p duka-db --bin seed -- --db ./data/duka.db
//! ```
//!
//! ## Generated Data
//! - Company "Duka Demo Traders" with branches "Main Branch" and "Westlands"
//! - Admin `admin@duka.test` and one sales person per branch
//!   (all with password `password123`)
//! - Three suppliers
//! - Categories with a handful of products each
//! - One opening purchase per branch, so every product starts stocked
//!   through the ledger rather than by direct writes

use std::env;

use duka_core::ledger::purchase_sell_price;
use duka_core::registration::{AdminDetails, BranchDetails, CompanyDetails, RegistrationForm};
use duka_core::{
    Actor, BranchInput, Money, NewPurchase, NewStockedProduct, NewUser, PurchaseLineInput, Role,
    SupplierInput, DEFAULT_MARKUP_BPS,
};
use duka_db::{Database, DbConfig};

const ADMIN_EMAIL: &str = "admin@duka.test";
const DEMO_PASSWORD: &str = "password123";

/// (category, [(product, unit, buy price in cents)])
const CATALOG: &[(&str, &[(&str, &str, i64)])] = &[
    (
        "Groceries",
        &[
            ("Sugar 1kg", "pcs", 14_500),
            ("Maize Flour 2kg", "pcs", 16_000),
            ("Rice 2kg", "pcs", 28_000),
            ("Cooking Oil 1L", "pcs", 32_000),
        ],
    ),
    (
        "Beverages",
        &[
            ("Tea Leaves 250g", "pcs", 12_000),
            ("Drinking Water 500ml", "pcs", 3_000),
            ("Soda 300ml", "pcs", 4_500),
        ],
    ),
    (
        "Household",
        &[
            ("Bar Soap", "pcs", 9_000),
            ("Washing Powder 1kg", "pcs", 25_000),
            ("Matchbox", "box", 500),
        ],
    ),
];

const SUPPLIERS: &[(&str, &str)] = &[
    ("Mombasa Wholesale", "0733 100 200"),
    ("Nakuru Millers", "0722 300 400"),
    ("Rift Valley Distributors", "0711 500 600"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./duka_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Duka Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./duka_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Duka Seed Data Generator");
    println!("===========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if db.users().get_by_email(ADMIN_EMAIL).await?.is_some() {
        println!("⚠ Demo company already exists");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Company, main branch and admin in one go
    let mut form = RegistrationForm::new();
    form.submit_company(CompanyDetails {
        name: "Duka Demo Traders".into(),
        email: "info@duka.test".into(),
        phone: "0700 000 000".into(),
        address: "Moi Avenue, Nairobi".into(),
    })?;
    form.submit_branch(BranchDetails {
        name: "Main Branch".into(),
        phone: "0700 000 001".into(),
        address: "Moi Avenue, Nairobi".into(),
    })?;
    let submission = form.finish(AdminDetails {
        name: "Amina Yusuf".into(),
        email: ADMIN_EMAIL.into(),
        phone: None,
        password: DEMO_PASSWORD.into(),
        password_confirmation: DEMO_PASSWORD.into(),
    })?;
    let registered = db.companies().register(submission).await?;
    let company_id = registered.company.id.clone();
    let admin = Actor::from(&registered.admin);
    println!("✓ Registered {}", registered.company.name);

    let westlands = db
        .branches()
        .create(
            &company_id,
            BranchInput {
                name: "Westlands".into(),
                address: Some("Waiyaki Way".into()),
                phone: Some("0700 000 002".into()),
            },
        )
        .await?;
    let branches = [registered.branch.clone(), westlands];
    println!("✓ {} branches", branches.len());

    for (branch, (name, email)) in branches.iter().zip([
        ("Baraka Otieno", "baraka@duka.test"),
        ("Wanjiru Kamau", "wanjiru@duka.test"),
    ]) {
        db.users()
            .create(
                &admin,
                NewUser {
                    name: name.into(),
                    email: email.into(),
                    phone: None,
                    role: Role::SalesPerson,
                    branch_id: Some(branch.id.clone()),
                    password: DEMO_PASSWORD.into(),
                    password_confirmation: DEMO_PASSWORD.into(),
                },
            )
            .await?;
    }
    println!("✓ Sales users created");

    let mut suppliers = Vec::new();
    for (name, phone) in SUPPLIERS {
        let supplier = db
            .suppliers()
            .create(SupplierInput {
                name: name.to_string(),
                phone: Some(phone.to_string()),
                ..Default::default()
            })
            .await?;
        suppliers.push(supplier);
    }
    println!("✓ {} suppliers", suppliers.len());

    // Register every product in every branch with no opening stock; the
    // opening purchase below brings it in.
    let mut lines_by_branch: Vec<Vec<PurchaseLineInput>> = vec![Vec::new(); branches.len()];
    let mut product_count = 0;
    for (category_name, products) in CATALOG {
        let category = db.categories().create(&company_id, category_name).await?;

        for (name, unit, buy_cents) in products.iter() {
            let sell_cents =
                purchase_sell_price(None, Money::from_cents(*buy_cents), DEFAULT_MARKUP_BPS)?
                    .cents();

            for (idx, branch) in branches.iter().enumerate() {
                let registered = db
                    .products()
                    .register(
                        NewStockedProduct {
                            category_id: category.id.clone(),
                            branch_id: branch.id.clone(),
                            name: name.to_string(),
                            unit: unit.to_string(),
                            min_stock: 5,
                            buy_price_cents: *buy_cents,
                            sell_price_cents: sell_cents,
                            opening_quantity: 0,
                        },
                        &admin.user_id,
                    )
                    .await?;

                lines_by_branch[idx].push(PurchaseLineInput {
                    product_id: registered.product.id,
                    quantity: 20 + 10 * idx as i64,
                    buy_price_cents: *buy_cents,
                    sell_price_cents: sell_cents,
                });
                product_count += 1;
            }
        }
    }
    println!("✓ {} products across {} categories", product_count, CATALOG.len());

    for ((branch, lines), supplier) in branches.iter().zip(lines_by_branch).zip(suppliers.iter().cycle()) {
        let receipt = db
            .purchases()
            .complete_purchase(NewPurchase {
                supplier_id: supplier.id.clone(),
                branch_id: branch.id.clone(),
                user_id: admin.user_id.clone(),
                lines,
            })
            .await?;
        println!(
            "✓ Opening purchase {} for {} ({})",
            receipt.purchase.invoice_no,
            branch.name,
            Money::from_cents(receipt.purchase.total_cents).format_with("KSh ")
        );
    }

    let checks = db.stocks().reconcile(&admin.scope()?).await?;
    let drifted = checks.iter().filter(|c| !c.is_consistent()).count();
    println!();
    println!("Ledger check: {} rows, {} inconsistent", checks.len(), drifted);
    println!();
    println!("✓ Seed complete!");
    println!("  Log in as {} / {}", ADMIN_EMAIL, DEMO_PASSWORD);

    Ok(())
}
