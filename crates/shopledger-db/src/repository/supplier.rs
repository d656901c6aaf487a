//! # Supplier Repository
//!
//! Supplier records referenced by purchase orders.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, LedgerResult};
use shopledger_core::validation::validate_name;
use shopledger_core::{CoreError, Supplier};

const SUPPLIER_COLUMNS: &str =
    "id, name, contact_person, email, phone, is_active, created_at, updated_at";

/// Repository for supplier database operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    /// Creates a new SupplierRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    /// Inserts a new supplier.
    pub async fn insert(&self, supplier: &Supplier) -> LedgerResult<()> {
        validate_name(&supplier.name).map_err(CoreError::from)?;

        debug!(name = %supplier.name, "Inserting supplier");

        sqlx::query(
            r#"
            INSERT INTO suppliers (
                id, name, contact_person, email, phone,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(&supplier.contact_person)
        .bind(&supplier.email)
        .bind(&supplier.phone)
        .bind(supplier.is_active)
        .bind(supplier.created_at)
        .bind(supplier.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a supplier by ID.
    pub async fn get(&self, id: &str) -> LedgerResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(supplier)
    }

    /// Lists active suppliers, sorted by name.
    pub async fn list_active(&self, limit: u32) -> LedgerResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {SUPPLIER_COLUMNS} FROM suppliers WHERE is_active = 1 ORDER BY name LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(suppliers)
    }

    /// Soft-deletes a supplier.
    pub async fn soft_delete(&self, id: &str) -> LedgerResult<()> {
        let now = Utc::now();

        let result =
            sqlx::query("UPDATE suppliers SET is_active = 0, updated_at = ?2 WHERE id = ?1")
                .bind(id)
                .bind(now)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id).into());
        }

        Ok(())
    }
}

/// Helper to generate a new supplier ID.
pub fn generate_supplier_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_supplier_roundtrip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let now = Utc::now();
        let supplier = Supplier {
            id: generate_supplier_id(),
            name: "Acme Wholesale".to_string(),
            contact_person: Some("Bob".to_string()),
            email: None,
            phone: Some("555-0100".to_string()),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        db.suppliers().insert(&supplier).await.unwrap();

        let stored = db.suppliers().get(&supplier.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Acme Wholesale");

        db.suppliers().soft_delete(&supplier.id).await.unwrap();
        assert!(db.suppliers().list_active(10).await.unwrap().is_empty());
    }
}
