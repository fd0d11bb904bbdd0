//! # Branch Repository
//!
//! Branch names are unique within a company (case-insensitive).

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::push_scope;
use duka_core::validation::{validate_name, validate_optional, validate_phone};
use duka_core::{Branch, BranchInput, BranchScope, CoreError};

/// Repository for branch database operations.
#[derive(Debug, Clone)]
pub struct BranchRepository {
    pool: SqlitePool,
}

impl BranchRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BranchRepository { pool }
    }

    /// Creates a branch in a company.
    pub async fn create(&self, company_id: &str, input: BranchInput) -> DbResult<Branch> {
        let input = validated(input)?;
        self.ensure_unique(company_id, &input.name, None).await?;

        let now = Utc::now();
        let branch = Branch {
            id: Uuid::new_v4().to_string(),
            company_id: company_id.to_string(),
            name: input.name,
            address: input.address,
            phone: input.phone,
            created_at: now,
            updated_at: now,
        };

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
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(id = %branch.id, name = %branch.name, "Branch created");
        Ok(branch)
    }

    /// Renames or re-addresses a branch.
    pub async fn update(&self, id: &str, input: BranchInput) -> DbResult<Branch> {
        let input = validated(input)?;
        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Branch", id))?;
        self.ensure_unique(&current.company_id, &input.name, Some(id))
            .await?;

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE branches SET name = ?1, address = ?2, phone = ?3, updated_at = ?4
            WHERE id = ?5
            "#,
        )
        .bind(&input.name)
        .bind(&input.address)
        .bind(&input.phone)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        debug!(id = %id, "Branch updated");
        Ok(Branch {
            name: input.name,
            address: input.address,
            phone: input.phone,
            updated_at: now,
            ..current
        })
    }

    /// Deletes a branch.
    ///
    /// Fails with `ForeignKeyViolation` while stock, users or transactions
    /// still reference it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM branches WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Branch", id));
        }

        info!(id = %id, "Branch deleted");
        Ok(())
    }

    /// Gets a branch by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Branch>> {
        let branch = sqlx::query_as::<_, Branch>(
            r#"
            SELECT id, company_id, name, address, phone, created_at, updated_at
            FROM branches
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(branch)
    }

    /// Branches visible in a scope, by name.
    pub async fn list(&self, scope: &BranchScope) -> DbResult<Vec<Branch>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            r#"
            SELECT id, company_id, name, address, phone, created_at, updated_at
            FROM branches
            WHERE "#,
        );
        push_scope(&mut qb, "id", scope);
        qb.push(" ORDER BY name");

        let branches = qb.build_query_as::<Branch>().fetch_all(&self.pool).await?;
        Ok(branches)
    }

    async fn ensure_unique(&self, company_id: &str, name: &str, except_id: Option<&str>) -> DbResult<()> {
        let taken: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM branches
            WHERE company_id = ?1 AND lower(name) = lower(?2) AND id != COALESCE(?3, '')
            "#,
        )
        .bind(company_id)
        .bind(name)
        .bind(except_id)
        .fetch_one(&self.pool)
        .await?;

        if taken > 0 {
            return Err(CoreError::duplicate("Branch", name).into());
        }
        Ok(())
    }
}

fn validated(input: BranchInput) -> DbResult<BranchInput> {
    let phone = match validate_optional("phone", input.phone.as_deref(), 20)? {
        Some(phone) => Some(validate_phone(&phone)?),
        None => None,
    };

    Ok(BranchInput {
        name: validate_name("branch name", &input.name, 255)?,
        address: validate_optional("address", input.address.as_deref(), 500)?,
        phone,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::Fixture;

    #[tokio::test]
    async fn test_duplicate_name_within_company() {
        let fx = Fixture::new().await;
        let branches = fx.db.branches();

        let err = branches
            .create(
                &fx.company_id,
                BranchInput {
                    name: "main branch".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Core(CoreError::DuplicateEntity { .. })));
        assert_eq!(err.to_string(), "Branch already exists: main branch");

        let created = branches
            .create(
                &fx.company_id,
                BranchInput {
                    name: "Kisumu".into(),
                    address: Some("Oginga Odinga St".into()),
                    phone: Some("+254 700 000 003".into()),
                },
            )
            .await
            .unwrap();

        // Keeping its own name is not a duplicate.
        let updated = branches
            .update(
                &created.id,
                BranchInput {
                    name: "Kisumu".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.address, None);
    }

    #[tokio::test]
    async fn test_scope_listing() {
        let fx = Fixture::new().await;
        let branches = fx.db.branches();

        let company = branches
            .list(&BranchScope::Company(fx.company_id.clone()))
            .await
            .unwrap();
        assert_eq!(company.len(), 2);

        let own = branches
            .list(&BranchScope::Branch(fx.branch_id.clone()))
            .await
            .unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].name, "Main Branch");
    }

    #[tokio::test]
    async fn test_delete_referenced_branch_fails() {
        let fx = Fixture::new().await;
        let err = fx.db.branches().delete(&fx.branch_id).await.unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));

        let empty = fx
            .db
            .branches()
            .create(
                &fx.company_id,
                BranchInput {
                    name: "Pop-up".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        fx.db.branches().delete(&empty.id).await.unwrap();
        assert!(fx.db.branches().get_by_id(&empty.id).await.unwrap().is_none());
    }
}
