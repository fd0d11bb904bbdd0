//! # Supplier Repository

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::like_pattern;
use duka_core::validation::{validate_email, validate_name, validate_optional, validate_phone};
use duka_core::{Supplier, SupplierInput};

/// Repository for supplier database operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn create(&self, input: SupplierInput) -> DbResult<Supplier> {
        let input = validated(input)?;
        let now = Utc::now();
        let supplier = Supplier {
            id: Uuid::new_v4().to_string(),
            name: input.name,
            phone: input.phone,
            email: input.email,
            address: input.address,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO suppliers (id, name, phone, email, address, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.phone)
        .bind(&supplier.email)
        .bind(&supplier.address)
        .bind(now)
        .execute(&self.pool)
        .await?;

        info!(id = %supplier.id, name = %supplier.name, "Supplier created");
        Ok(supplier)
    }

    pub async fn update(&self, id: &str, input: SupplierInput) -> DbResult<Supplier> {
        let input = validated(input)?;
        let current = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))?;

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE suppliers SET name = ?1, phone = ?2, email = ?3, address = ?4, updated_at = ?5
            WHERE id = ?6
            "#,
        )
        .bind(&input.name)
        .bind(&input.phone)
        .bind(&input.email)
        .bind(&input.address)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        debug!(id = %id, "Supplier updated");
        Ok(Supplier {
            name: input.name,
            phone: input.phone,
            email: input.email,
            address: input.address,
            updated_at: now,
            ..current
        })
    }

    /// Deletes a supplier. Fails while purchases reference it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }
        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, name, phone, email, address, created_at, updated_at
            FROM suppliers
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(supplier)
    }

    /// Suppliers matching name, phone or email.
    pub async fn search(&self, query: Option<&str>, limit: i64) -> DbResult<Vec<Supplier>> {
        let pattern = like_pattern(query)?.unwrap_or_else(|| "%".to_string());

        let suppliers = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, name, phone, email, address, created_at, updated_at
            FROM suppliers
            WHERE name LIKE ?1 OR phone LIKE ?1 OR email LIKE ?1
            ORDER BY name
            LIMIT ?2
            "#,
        )
        .bind(pattern)
        .bind(limit.max(1))
        .fetch_all(&self.pool)
        .await?;

        Ok(suppliers)
    }
}

fn validated(input: SupplierInput) -> DbResult<SupplierInput> {
    let phone = match validate_optional("phone", input.phone.as_deref(), 20)? {
        Some(phone) => Some(validate_phone(&phone)?),
        None => None,
    };
    let email = match validate_optional("email", input.email.as_deref(), 255)? {
        Some(email) => Some(validate_email(&email)?),
        None => None,
    };

    Ok(SupplierInput {
        name: validate_name("supplier name", &input.name, 255)?,
        phone,
        email,
        address: validate_optional("address", input.address.as_deref(), 500)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::Fixture;
    use duka_core::{CoreError, ValidationError};

    #[tokio::test]
    async fn test_create_search_update() {
        let fx = Fixture::new().await;
        let suppliers = fx.db.suppliers();

        let created = suppliers
            .create(SupplierInput {
                name: "Nakuru Millers".into(),
                phone: Some("0722 111 222".into()),
                email: Some("Orders@Millers.co.ke".into()),
                address: None,
            })
            .await
            .unwrap();
        assert_eq!(created.email.as_deref(), Some("orders@millers.co.ke"));

        assert_eq!(suppliers.search(Some("millers"), 10).await.unwrap().len(), 1);
        assert_eq!(suppliers.search(Some("0722"), 10).await.unwrap().len(), 1);
        assert_eq!(suppliers.search(None, 10).await.unwrap().len(), 2);

        let updated = suppliers
            .update(
                &created.id,
                SupplierInput {
                    name: "Nakuru Millers Ltd".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Nakuru Millers Ltd");
        assert_eq!(updated.phone, None);
    }

    #[tokio::test]
    async fn test_invalid_phone_is_rejected() {
        let fx = Fixture::new().await;
        let err = fx
            .db
            .suppliers()
            .create(SupplierInput {
                name: "Bad".into(),
                phone: Some("call me".into()),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Core(CoreError::Validation(ValidationError::InvalidFormat { .. }))
        ));
    }
}
