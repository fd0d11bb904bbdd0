//! # Company Repository
//!
//! Onboarding writes the company, its first branch and the administrator
//! account in one transaction. A failure at any point leaves nothing behind.

use chrono::Utc;
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

use crate::error::DbResult;
use crate::repository::{begin, finish, user};
use duka_core::registration::RegistrationSubmission;
use duka_core::{Branch, Company, Role, User};

/// Everything created by a registration.
#[derive(Debug, Clone, Serialize)]
pub struct RegisteredCompany {
    pub company: Company,
    pub branch: Branch,
    pub admin: User,
}

/// Repository for company database operations.
#[derive(Debug, Clone)]
pub struct CompanyRepository {
    pool: SqlitePool,
}

impl CompanyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CompanyRepository { pool }
    }

    /// Registers a company from a finished registration form.
    ///
    /// The administrator is attached to the new branch, which gives them
    /// company-wide scope.
    pub async fn register(&self, submission: RegistrationSubmission) -> DbResult<RegisteredCompany> {
        let password_hash = user::hash_password(&submission.admin.password)?;
        let now = Utc::now();

        let company = Company {
            id: Uuid::new_v4().to_string(),
            name: submission.company.name,
            email: submission.company.email,
            phone: submission.company.phone,
            address: submission.company.address,
            created_at: now,
        };
        let branch = Branch {
            id: Uuid::new_v4().to_string(),
            company_id: company.id.clone(),
            name: submission.branch.name,
            address: Some(submission.branch.address),
            phone: Some(submission.branch.phone),
            created_at: now,
            updated_at: now,
        };
        let admin = User {
            id: Uuid::new_v4().to_string(),
            company_id: company.id.clone(),
            name: submission.admin.name,
            email: submission.admin.email,
            phone: submission.admin.phone,
            role: Role::Admin,
            branch_id: Some(branch.id.clone()),
            password_hash,
            created_at: now,
            updated_at: now,
        };

        let mut tx = begin(&self.pool).await?;
        let result = write_registration(&mut tx, &company, &branch, &admin).await;
        finish(tx, result, "register_company").await?;

        info!(
            company_id = %company.id,
            branch_id = %branch.id,
            admin_id = %admin.id,
            "Company registered"
        );

        Ok(RegisteredCompany {
            company,
            branch,
            admin,
        })
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Company>> {
        let company = sqlx::query_as::<_, Company>(
            "SELECT id, name, email, phone, address, created_at FROM companies WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(company)
    }
}

async fn write_registration(
    conn: &mut SqliteConnection,
    company: &Company,
    branch: &Branch,
    admin: &User,
) -> DbResult<()> {
    user::ensure_email_free(conn, &admin.email, None).await?;

    sqlx::query(
        r#"
        INSERT INTO companies (id, name, email, phone, address, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&company.id)
    .bind(&company.name)
    .bind(&company.email)
    .bind(&company.phone)
    .bind(&company.address)
    .bind(company.created_at)
    .execute(&mut *conn)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO branches (id, company_id, name, address, phone, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        "#,
    )
    .bind(&branch.id)
    .bind(&branch.company_id)
    .bind(&branch.name)
    .bind(&branch.address)
    .bind(&branch.phone)
    .bind(branch.created_at)
    .execute(&mut *conn)
    .await?;

    user::insert(conn, admin).await
}
