//! # Customer Repository
//!
//! Customer records and the loyalty point balance.
//!
//! Point accrual happens inside the sale coordinator's transaction;
//! redemption is the explicit operation here. Both use guarded updates so
//! the balance can never go negative, mirroring how the ledger engine
//! guards stock.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, LedgerResult};
use shopledger_core::validation::validate_name;
use shopledger_core::{CoreError, Customer};

const CUSTOMER_COLUMNS: &str = "id, name, email, phone, address, credit_limit_cents, \
     loyalty_points, is_active, created_at, updated_at";

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a new customer.
    pub async fn insert(&self, customer: &Customer) -> LedgerResult<()> {
        validate_name(&customer.name).map_err(CoreError::from)?;

        debug!(name = %customer.name, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, name, email, phone, address, credit_limit_cents,
                loyalty_points, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(customer.credit_limit_cents)
        .bind(customer.loyalty_points)
        .bind(customer.is_active)
        .bind(customer.created_at)
        .bind(customer.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a customer by ID.
    pub async fn get(&self, id: &str) -> LedgerResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Lists active customers, sorted by name.
    pub async fn list_active(&self, limit: u32) -> LedgerResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE is_active = 1 ORDER BY name LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Soft-deletes a customer.
    pub async fn soft_delete(&self, id: &str) -> LedgerResult<()> {
        let now = Utc::now();

        let result =
            sqlx::query("UPDATE customers SET is_active = 0, updated_at = ?2 WHERE id = ?1")
                .bind(id)
                .bind(now)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id).into());
        }

        Ok(())
    }

    /// Redeems loyalty points and returns the new balance.
    ///
    /// ## Errors
    /// * `InvalidQuantity` - points ≤ 0
    /// * `NotFound` - unknown or inactive customer
    /// * `InsufficientPoints` - balance smaller than the redemption
    pub async fn redeem_points(&self, customer_id: &str, points: i64) -> LedgerResult<i64> {
        if points <= 0 {
            return Err(CoreError::InvalidQuantity { quantity: points }.into());
        }

        debug!(customer_id = %customer_id, points = %points, "Redeeming loyalty points");

        let now = Utc::now();

        // Guarded decrement: the balance check happens at write time.
        let result = sqlx::query(
            r#"
            UPDATE customers
            SET loyalty_points = loyalty_points - ?1, updated_at = ?2
            WHERE id = ?3 AND is_active = 1 AND loyalty_points >= ?1
            "#,
        )
        .bind(points)
        .bind(now)
        .bind(customer_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let available: Option<i64> = sqlx::query_scalar(
                "SELECT loyalty_points FROM customers WHERE id = ?1 AND is_active = 1",
            )
            .bind(customer_id)
            .fetch_optional(&self.pool)
            .await?;

            return match available {
                None => Err(CoreError::not_found("Customer", customer_id).into()),
                Some(available) => Err(CoreError::InsufficientPoints {
                    available,
                    requested: points,
                }
                .into()),
            };
        }

        let balance: i64 = sqlx::query_scalar("SELECT loyalty_points FROM customers WHERE id = ?1")
            .bind(customer_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(balance)
    }
}

/// Helper to generate a new customer ID.
pub fn generate_customer_id() -> String {
    Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn sample_customer(points: i64) -> Customer {
        let now = Utc::now();
        Customer {
            id: generate_customer_id(),
            name: "Alice".to_string(),
            email: Some("alice@example.com".to_string()),
            phone: None,
            address: None,
            credit_limit_cents: 0,
            loyalty_points: points,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_redeem_points() {
        let db = test_db().await;
        let customer = sample_customer(10);
        db.customers().insert(&customer).await.unwrap();

        let balance = db.customers().redeem_points(&customer.id, 4).await.unwrap();
        assert_eq!(balance, 6);
    }

    #[tokio::test]
    async fn test_redeem_more_than_balance_fails() {
        let db = test_db().await;
        let customer = sample_customer(3);
        db.customers().insert(&customer).await.unwrap();

        let err = db
            .customers()
            .redeem_points(&customer.id, 5)
            .await
            .unwrap_err();

        match err {
            LedgerError::Domain(CoreError::InsufficientPoints {
                available,
                requested,
            }) => {
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("expected InsufficientPoints, got {other:?}"),
        }

        // Balance untouched
        let stored = db.customers().get(&customer.id).await.unwrap().unwrap();
        assert_eq!(stored.loyalty_points, 3);
    }

    #[tokio::test]
    async fn test_redeem_from_unknown_customer_fails() {
        let db = test_db().await;
        let err = db
            .customers()
            .redeem_points("no-such-customer", 1)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_redeem_non_positive_rejected() {
        let db = test_db().await;
        let customer = sample_customer(10);
        db.customers().insert(&customer).await.unwrap();

        assert!(db.customers().redeem_points(&customer.id, 0).await.is_err());
        assert!(db.customers().redeem_points(&customer.id, -2).await.is_err());
    }
}
