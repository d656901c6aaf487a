//! # Ledger Engine
//!
//! The single choke point through which `products.stock` changes.
//!
//! ## Movement Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  apply_movement(product, out, qty, remark)                      │
//! │                                                                 │
//! │  ┌───────────────────── SINGLE TRANSACTION ──────────────────┐  │
//! │  │                                                           │  │
//! │  │  1. UPDATE products SET stock = stock - qty               │  │
//! │  │     WHERE id = ? AND stock >= qty      ← guard evaluated  │  │
//! │  │                                          at write time    │  │
//! │  │  2. SELECT stock  → new_stock, old_stock = new + qty      │  │
//! │  │                                                           │  │
//! │  │  3. INSERT INTO stock_history (old, new, qty, dir, ...)   │  │
//! │  │                                                           │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │                                                                 │
//! │  COMMIT ← stock change and history row land together or not    │
//! │           at all                                                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The guard on the `out` arm makes the stock check part of the write
//! itself: two concurrent sales of the last unit cannot both pass, no
//! matter how their transactions interleave. Lock contention is retried a
//! bounded number of times and then surfaced as `CoreError::Conflict`.

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;
use uuid::Uuid;

use crate::error::LedgerResult;
use shopledger_core::validation::validate_quantity;
use shopledger_core::{CoreError, StockDirection, StockHistory};

/// Retries for lock contention before reporting a conflict.
const MOVEMENT_RETRY_LIMIT: u32 = 3;

/// The ledger engine: validates and applies stock mutations, each paired
/// with an immutable history record.
#[derive(Debug, Clone)]
pub struct LedgerEngine {
    pool: SqlitePool,
}

impl LedgerEngine {
    /// Creates a new LedgerEngine.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerEngine { pool }
    }

    /// Applies a single stock movement in its own transaction.
    ///
    /// ## Errors
    /// * `NotFound` - productId does not resolve to an active product
    /// * `InvalidQuantity` - quantity ≤ 0
    /// * `InsufficientStock` - `out` movement exceeds current stock
    /// * `Conflict` - lock contention exhausted the bounded retries
    ///
    /// ## Guarantee
    /// The stock update and the history append are one atomic unit; either
    /// both persist or neither does.
    pub async fn apply_movement(
        &self,
        product_id: &str,
        direction: StockDirection,
        quantity: i64,
        remark: &str,
        actor: Option<&str>,
    ) -> LedgerResult<StockHistory> {
        for _ in 0..MOVEMENT_RETRY_LIMIT {
            match self
                .try_apply(product_id, direction, quantity, remark, actor)
                .await
            {
                Err(err) if err.is_busy() => continue,
                other => return other,
            }
        }

        Err(CoreError::Conflict.into())
    }

    /// One attempt: begin, apply, commit. A dropped transaction rolls back.
    async fn try_apply(
        &self,
        product_id: &str,
        direction: StockDirection,
        quantity: i64,
        remark: &str,
        actor: Option<&str>,
    ) -> LedgerResult<StockHistory> {
        let mut tx = self.pool.begin().await?;
        let history =
            apply_movement_tx(&mut tx, product_id, direction, quantity, remark, actor).await?;
        tx.commit().await?;
        Ok(history)
    }

    /// Returns history rows for one product, newest first.
    pub async fn history_for_product(
        &self,
        product_id: &str,
        limit: u32,
    ) -> LedgerResult<Vec<StockHistory>> {
        let rows = sqlx::query_as::<_, StockHistory>(
            r#"
            SELECT id, product_id, direction, quantity, old_stock, new_stock,
                   remark, actor, created_at
            FROM stock_history
            WHERE product_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Returns the most recent history rows across all products.
    pub async fn recent_history(&self, limit: u32) -> LedgerResult<Vec<StockHistory>> {
        let rows = sqlx::query_as::<_, StockHistory>(
            r#"
            SELECT id, product_id, direction, quantity, old_stock, new_stock,
                   remark, actor, created_at
            FROM stock_history
            ORDER BY created_at DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Counts history rows for a product.
    pub async fn history_count(&self, product_id: &str) -> LedgerResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM stock_history WHERE product_id = ?1")
                .bind(product_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }
}

/// Applies a movement inside a caller-owned transaction.
///
/// The coordinators use this to fold per-line movements into their own
/// all-or-nothing scope; `LedgerEngine::apply_movement` wraps it for
/// standalone adjustments.
pub(crate) async fn apply_movement_tx(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: &str,
    direction: StockDirection,
    quantity: i64,
    remark: &str,
    actor: Option<&str>,
) -> LedgerResult<StockHistory> {
    if quantity <= 0 {
        return Err(CoreError::InvalidQuantity { quantity }.into());
    }
    validate_quantity(quantity).map_err(CoreError::from)?;

    let now = Utc::now();

    debug!(
        product_id = %product_id,
        direction = %direction.as_str(),
        quantity = %quantity,
        "Applying stock movement"
    );

    // Guarded delta update. The `out` arm refuses to drive stock negative;
    // the condition is checked by SQLite at write time, under the write
    // lock, so a stale earlier read cannot oversell.
    let result = match direction {
        StockDirection::Out => {
            sqlx::query(
                r#"
                UPDATE products
                SET stock = stock - ?1, updated_at = ?2
                WHERE id = ?3 AND is_active = 1 AND stock >= ?1
                "#,
            )
            .bind(quantity)
            .bind(now)
            .bind(product_id)
            .execute(&mut **tx)
            .await?
        }
        StockDirection::In => {
            sqlx::query(
                r#"
                UPDATE products
                SET stock = stock + ?1, updated_at = ?2
                WHERE id = ?3 AND is_active = 1
                "#,
            )
            .bind(quantity)
            .bind(now)
            .bind(product_id)
            .execute(&mut **tx)
            .await?
        }
    };

    if result.rows_affected() == 0 {
        // Distinguish a missing product from an insufficient balance.
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT code, stock FROM products WHERE id = ?1 AND is_active = 1")
                .bind(product_id)
                .fetch_optional(&mut **tx)
                .await?;

        return match row {
            None => Err(CoreError::not_found("Product", product_id).into()),
            Some((code, stock)) => Err(CoreError::InsufficientStock {
                code,
                available: stock,
                requested: quantity,
            }
            .into()),
        };
    }

    let new_stock: i64 = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
        .bind(product_id)
        .fetch_one(&mut **tx)
        .await?;
    let old_stock = new_stock - direction.signed(quantity);

    let history = StockHistory {
        id: Uuid::new_v4().to_string(),
        product_id: product_id.to_string(),
        direction,
        quantity,
        old_stock,
        new_stock,
        remark: remark.to_string(),
        actor: actor.map(str::to_string),
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO stock_history (
            id, product_id, direction, quantity, old_stock, new_stock,
            remark, actor, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&history.id)
    .bind(&history.product_id)
    .bind(history.direction)
    .bind(history.quantity)
    .bind(history.old_stock)
    .bind(history.new_stock)
    .bind(&history.remark)
    .bind(&history.actor)
    .bind(history.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(history)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;
    use crate::pool::{Database, DbConfig};
    use chrono::Utc;
    use shopledger_core::Product;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(db: &Database, code: &str, stock: i64) -> Product {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            name: format!("Product {code}"),
            category_id: None,
            price_cents: 5_000,
            cost_cents: 3_000,
            stock,
            min_stock: 5,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.catalog().insert_product(&product).await.unwrap();
        product
    }

    #[tokio::test]
    async fn test_out_movement_updates_stock_and_history() {
        let db = test_db().await;
        let product = seed_product(&db, "P001", 10).await;

        let history = db
            .ledger()
            .apply_movement(&product.id, StockDirection::Out, 3, "damage write-off", None)
            .await
            .unwrap();

        assert_eq!(history.old_stock, 10);
        assert_eq!(history.new_stock, 7);
        assert_eq!(history.quantity, 3);
        assert_eq!(history.direction, StockDirection::Out);
        assert!(history.is_consistent());

        let stored = db.catalog().get_product(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 7);

        let rows = db.ledger().history_for_product(&product.id, 10).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].old_stock, 10);
        assert_eq!(rows[0].new_stock, 7);
        assert_eq!(rows[0].remark, "damage write-off");
    }

    #[tokio::test]
    async fn test_in_movement() {
        let db = test_db().await;
        let product = seed_product(&db, "P001", 4).await;

        let history = db
            .ledger()
            .apply_movement(&product.id, StockDirection::In, 6, "restock", Some("admin"))
            .await
            .unwrap();

        assert_eq!(history.old_stock, 4);
        assert_eq!(history.new_stock, 10);
        assert_eq!(history.actor.as_deref(), Some("admin"));

        let stored = db.catalog().get_product(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 10);
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_no_trace() {
        let db = test_db().await;
        let product = seed_product(&db, "P001", 5).await;

        let err = db
            .ledger()
            .apply_movement(&product.id, StockDirection::Out, 6, "too much", None)
            .await
            .unwrap_err();

        match err {
            LedgerError::Domain(CoreError::InsufficientStock {
                code,
                available,
                requested,
            }) => {
                assert_eq!(code, "P001");
                assert_eq!(available, 5);
                assert_eq!(requested, 6);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }

        // Stock unchanged, no history row written
        let stored = db.catalog().get_product(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 5);
        assert_eq!(db.ledger().history_count(&product.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_exact_stock_drains_to_zero() {
        let db = test_db().await;
        let product = seed_product(&db, "P001", 5).await;

        db.ledger()
            .apply_movement(&product.id, StockDirection::Out, 5, "clearance", None)
            .await
            .unwrap();

        let stored = db.catalog().get_product(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 0);
    }

    #[tokio::test]
    async fn test_invalid_quantity_rejected() {
        let db = test_db().await;
        let product = seed_product(&db, "P001", 5).await;

        for qty in [0, -3] {
            let err = db
                .ledger()
                .apply_movement(&product.id, StockDirection::In, qty, "bad", None)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                LedgerError::Domain(CoreError::InvalidQuantity { .. })
            ));
        }

        assert_eq!(db.ledger().history_count(&product.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_unknown_product_rejected() {
        let db = test_db().await;

        let err = db
            .ledger()
            .apply_movement("no-such-id", StockDirection::In, 1, "x", None)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            LedgerError::Domain(CoreError::NotFound { entity: "Product", .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_outs_never_oversell() {
        // N concurrent single-unit outs against stock S, N > S: exactly S
        // succeed, the rest fail typed, and stock lands on zero.
        let db = test_db().await;
        let product = seed_product(&db, "P001", 5).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let ledger = db.ledger();
            let product_id = product.id.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .apply_movement(&product_id, StockDirection::Out, 1, "rush", None)
                    .await
            }));
        }

        let mut ok = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(LedgerError::Domain(
                    CoreError::InsufficientStock { .. } | CoreError::Conflict,
                )) => rejected += 1,
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(ok, 5);
        assert_eq!(rejected, 3);

        let stored = db.catalog().get_product(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 0);
        assert_eq!(db.ledger().history_count(&product.id).await.unwrap(), 5);
    }
}
