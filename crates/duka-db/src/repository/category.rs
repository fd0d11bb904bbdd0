//! # Category Repository
//!
//! Category names are unique within a company (case-insensitive).

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use duka_core::validation::validate_name;
use duka_core::{BranchScope, Category, CoreError};

/// Repository for category database operations.
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    pub async fn create(&self, company_id: &str, name: &str) -> DbResult<Category> {
        let name = validate_name("category name", name, 255)?;
        self.ensure_unique(company_id, &name, None).await?;

        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4().to_string(),
            company_id: company_id.to_string(),
            name,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO categories (id, company_id, name, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?4)
            "#,
        )
        .bind(&category.id)
        .bind(&category.company_id)
        .bind(&category.name)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    pub async fn rename(&self, id: &str, name: &str) -> DbResult<Category> {
        let name = validate_name("category name", name, 255)?;
        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Category", id))?;
        self.ensure_unique(&current.company_id, &name, Some(id)).await?;

        let now = Utc::now();
        sqlx::query("UPDATE categories SET name = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(&name)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!(id = %id, "Category renamed");
        Ok(Category {
            name,
            updated_at: now,
            ..current
        })
    }

    /// Deletes a category. Fails while products still use it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Category", id));
        }
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, company_id, name, created_at, updated_at FROM categories WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// Categories of the companies a scope covers.
    pub async fn list(&self, scope: &BranchScope) -> DbResult<Vec<Category>> {
        let mut qb = QueryBuilder::<Sqlite>::new(
            "SELECT id, company_id, name, created_at, updated_at FROM categories WHERE ",
        );
        match scope {
            BranchScope::All => {
                qb.push("1 = 1");
            }
            BranchScope::Company(company_id) => {
                qb.push("company_id = ").push_bind(company_id.clone());
            }
            BranchScope::Branch(branch_id) => {
                qb.push("company_id = (SELECT company_id FROM branches WHERE id = ")
                    .push_bind(branch_id.clone())
                    .push(")");
            }
        }
        qb.push(" ORDER BY name");

        let categories = qb.build_query_as::<Category>().fetch_all(&self.pool).await?;
        Ok(categories)
    }

    async fn ensure_unique(&self, company_id: &str, name: &str, except_id: Option<&str>) -> DbResult<()> {
        let taken: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM categories
            WHERE company_id = ?1 AND lower(name) = lower(?2) AND id != COALESCE(?3, '')
            "#,
        )
        .bind(company_id)
        .bind(name)
        .bind(except_id)
        .fetch_one(&self.pool)
        .await?;

        if taken > 0 {
            return Err(CoreError::duplicate("Category", name).into());
        }
        Ok(())
    }
}
