//! # User Repository
//!
//! Accounts, roles and branch assignment. Passwords are stored as argon2
//! PHC strings and never leave this module in plain form.
//!
//! ## Creation Rules
//! ```text
//! creator            new user's branch
//! ───────────────    ─────────────────────────────────────────
//! Admin              whatever branch was requested (same company)
//! SalesPerson        always the creator's own branch
//!
//! SalesPerson accounts without a branch are rejected.
//! ```

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::push_scope;
use duka_core::validation::{
    validate_email, validate_name, validate_optional, validate_password, validate_phone,
};
use duka_core::{Actor, BranchScope, CoreError, NewUser, Role, User, UserUpdate, ValidationError};

const USER_COLUMNS: &str = r#"
    id, company_id, name, email, phone, role, branch_id, password_hash, created_at, updated_at
"#;

/// Hashes a password into an argon2 PHC string.
pub(crate) fn hash_password(password: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {e}")))
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!(error = %e, "Stored password hash is unreadable");
            false
        }
    }
}

/// Fails with `DuplicateEntity` if the email is taken by another user.
pub(crate) async fn ensure_email_free(
    conn: &mut SqliteConnection,
    email: &str,
    except_id: Option<&str>,
) -> DbResult<()> {
    let taken: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM users WHERE email = ?1 AND id != COALESCE(?2, '')",
    )
    .bind(email)
    .bind(except_id)
    .fetch_one(&mut *conn)
    .await?;

    if taken > 0 {
        return Err(CoreError::duplicate("User", email).into());
    }
    Ok(())
}

/// Inserts a fully validated user row.
pub(crate) async fn insert(conn: &mut SqliteConnection, user: &User) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO users (
            id, company_id, name, email, phone, role, branch_id,
            password_hash, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
        "#,
    )
    .bind(&user.id)
    .bind(&user.company_id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.phone)
    .bind(user.role)
    .bind(&user.branch_id)
    .bind(&user.password_hash)
    .bind(user.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

fn validate_optional_phone(phone: Option<&str>) -> DbResult<Option<String>> {
    match validate_optional("phone", phone, 20)? {
        Some(phone) => Ok(Some(validate_phone(&phone)?)),
        None => Ok(None),
    }
}

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates a user in the creator's company.
    pub async fn create(&self, creator: &Actor, new_user: NewUser) -> DbResult<User> {
        validate_password(&new_user.password, &new_user.password_confirmation)?;
        let name = validate_name("name", &new_user.name, 255)?;
        let email = validate_email(&new_user.email)?;
        let phone = validate_optional_phone(new_user.phone.as_deref())?;
        let branch_id = creator.branch_for_new_user(new_user.role, new_user.branch_id.as_deref())?;

        let mut conn = self.pool.acquire().await?;
        if let Some(branch_id) = &branch_id {
            self.ensure_company_branch(&mut conn, &creator.company_id, branch_id)
                .await?;
        }
        ensure_email_free(&mut conn, &email, None).await?;

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            company_id: creator.company_id.clone(),
            name,
            email,
            phone,
            role: new_user.role,
            branch_id,
            password_hash: hash_password(&new_user.password)?,
            created_at: now,
            updated_at: now,
        };
        insert(&mut conn, &user).await?;

        info!(id = %user.id, role = %user.role, created_by = %creator.user_id, "User created");
        Ok(user)
    }

    /// Checks credentials. Unknown email and wrong password look the same.
    pub async fn authenticate(&self, email: &str, password: &str) -> DbResult<Option<User>> {
        let email = email.trim().to_lowercase();
        let Some(user) = self.get_by_email(&email).await? else {
            debug!("Login attempt for unknown email");
            return Ok(None);
        };

        if verify_password(password, &user.password_hash) {
            info!(id = %user.id, "User authenticated");
            Ok(Some(user))
        } else {
            debug!(id = %user.id, "Password mismatch");
            Ok(None)
        }
    }

    /// Updates profile, role and branch.
    pub async fn update(&self, id: &str, update: UserUpdate) -> DbResult<User> {
        let name = validate_name("name", &update.name, 255)?;
        let email = validate_email(&update.email)?;
        let phone = validate_optional_phone(update.phone.as_deref())?;
        let branch_id = update.branch_id.filter(|b| !b.is_empty());
        if update.role == Role::SalesPerson && branch_id.is_none() {
            return Err(ValidationError::Required {
                field: "branch".to_string(),
            }
            .into());
        }

        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;

        let mut conn = self.pool.acquire().await?;
        if let Some(branch_id) = &branch_id {
            self.ensure_company_branch(&mut conn, &current.company_id, branch_id)
                .await?;
        }
        ensure_email_free(&mut conn, &email, Some(id)).await?;

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE users
            SET name = ?1, email = ?2, phone = ?3, role = ?4, branch_id = ?5, updated_at = ?6
            WHERE id = ?7
            "#,
        )
        .bind(&name)
        .bind(&email)
        .bind(&phone)
        .bind(update.role)
        .bind(&branch_id)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;

        debug!(id = %id, "User updated");
        Ok(User {
            name,
            email,
            phone,
            role: update.role,
            branch_id,
            updated_at: now,
            ..current
        })
    }

    pub async fn change_password(
        &self,
        id: &str,
        password: &str,
        confirmation: &str,
    ) -> DbResult<()> {
        validate_password(password, confirmation)?;
        let hash = hash_password(password)?;

        let result = sqlx::query("UPDATE users SET password_hash = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(hash)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(id = %id, "Password changed");
        Ok(())
    }

    /// Deletes a user. Fails while their sales, purchases or adjustments exist.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn get_by_email(&self, email: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Users visible in a scope.
    ///
    /// Admins without a branch only show up under company or global scope.
    pub async fn list(&self, scope: &BranchScope) -> DbResult<Vec<User>> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT ");
        qb.push(USER_COLUMNS).push(" FROM users WHERE ");
        match scope {
            BranchScope::Company(company_id) => {
                qb.push("company_id = ").push_bind(company_id.clone());
            }
            other => push_scope(&mut qb, "branch_id", other),
        }
        qb.push(" ORDER BY name");

        let users = qb.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok(users)
    }

    async fn ensure_company_branch(
        &self,
        conn: &mut SqliteConnection,
        company_id: &str,
        branch_id: &str,
    ) -> DbResult<()> {
        let found: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM branches WHERE id = ?1 AND company_id = ?2",
        )
        .bind(branch_id)
        .bind(company_id)
        .fetch_one(&mut *conn)
        .await?;

        if found == 0 {
            return Err(DbError::not_found("Branch", branch_id));
        }
        Ok(())
    }
}
