//! # Purchase Receipt Coordinator
//!
//! The inbound counterpart of the sale coordinator: supplier purchase
//! orders and their receipt into stock.
//!
//! ## Receipt Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  receive_purchase_order(po, lines)                              │
//! │                                                                 │
//! │  ┌───────────────────── SINGLE TRANSACTION ──────────────────┐  │
//! │  │                                                           │  │
//! │  │  1. Load PO, require status pending|partial               │  │
//! │  │  2. Per line:                                             │  │
//! │  │     - cumulative guard: received + qty <= ordered         │  │
//! │  │     - ledger `in` movement + history row                  │  │
//! │  │     - bump item.quantity_received                         │  │
//! │  │  3. Recompute status: received | partial                  │  │
//! │  │                                                           │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │                                                                 │
//! │  COMMIT ← stock, item counters and status move together         │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, LedgerError, LedgerResult};
use crate::repository::ledger::apply_movement_tx;
use crate::repository::numbering::next_number;
use shopledger_core::{
    CoreError, Money, NewPurchaseOrder, PurchaseOrder, PurchaseOrderItem, PurchaseOrderStatus,
    ReceiptLine, StockDirection, ValidationError,
};

/// Retries for number-allocation races and lock contention.
const PURCHASE_RETRY_LIMIT: u32 = 3;

const PO_COLUMNS: &str = "id, number, supplier_id, order_date, expected_date, total_cents, \
     status, created_at, updated_at";

const PO_ITEM_COLUMNS: &str = "id, purchase_order_id, product_id, quantity_ordered, \
     quantity_received, unit_cost_cents, total_cost_cents, created_at";

/// Coordinates purchase orders and their receipt into stock.
#[derive(Debug, Clone)]
pub struct PurchaseCoordinator {
    pool: SqlitePool,
}

impl PurchaseCoordinator {
    /// Creates a new PurchaseCoordinator.
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseCoordinator { pool }
    }

    /// Creates a pending purchase order.
    ///
    /// The order total is the sum of its line totals
    /// (`quantity × unit_cost`); nothing touches stock until a receipt.
    pub async fn create_purchase_order(
        &self,
        order: NewPurchaseOrder,
    ) -> LedgerResult<(PurchaseOrder, Vec<PurchaseOrderItem>)> {
        if order.lines.is_empty() {
            return Err(CoreError::Validation(ValidationError::Required {
                field: "lines".to_string(),
            })
            .into());
        }

        for _ in 0..PURCHASE_RETRY_LIMIT {
            match self.try_create(&order).await {
                Err(err) if err.is_busy() => continue,
                Err(LedgerError::Storage(DbError::UniqueViolation { field, .. }))
                    if field.contains("purchase_orders.number") =>
                {
                    continue
                }
                other => return other,
            }
        }

        Err(CoreError::Conflict.into())
    }

    async fn try_create(
        &self,
        order: &NewPurchaseOrder,
    ) -> LedgerResult<(PurchaseOrder, Vec<PurchaseOrderItem>)> {
        debug!(supplier_id = %order.supplier_id, lines = order.lines.len(), "Creating purchase order");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let supplier_exists: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM suppliers WHERE id = ?1 AND is_active = 1")
                .bind(&order.supplier_id)
                .fetch_optional(&mut *tx)
                .await?;
        if supplier_exists.is_none() {
            return Err(CoreError::not_found("Supplier", &order.supplier_id).into());
        }

        let mut total = Money::zero();
        for line in &order.lines {
            if line.quantity <= 0 {
                return Err(CoreError::InvalidQuantity {
                    quantity: line.quantity,
                }
                .into());
            }
            if line.unit_cost_cents < 0 {
                return Err(CoreError::Validation(ValidationError::MustBePositive {
                    field: "unit_cost".to_string(),
                })
                .into());
            }

            let product_exists: Option<i64> =
                sqlx::query_scalar("SELECT 1 FROM products WHERE id = ?1 AND is_active = 1")
                    .bind(&line.product_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            if product_exists.is_none() {
                return Err(CoreError::not_found("Product", &line.product_id).into());
            }

            total += Money::from_cents(line.unit_cost_cents).multiply_quantity(line.quantity);
        }

        let number = next_number(&mut tx, "purchase_orders", "PO", now).await?;

        let po = PurchaseOrder {
            id: Uuid::new_v4().to_string(),
            number: number.clone(),
            supplier_id: order.supplier_id.clone(),
            order_date: now,
            expected_date: order.expected_date,
            total_cents: total.cents(),
            status: PurchaseOrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO purchase_orders (
                id, number, supplier_id, order_date, expected_date,
                total_cents, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&po.id)
        .bind(&po.number)
        .bind(&po.supplier_id)
        .bind(po.order_date)
        .bind(po.expected_date)
        .bind(po.total_cents)
        .bind(po.status)
        .bind(po.created_at)
        .bind(po.updated_at)
        .execute(&mut *tx)
        .await?;

        let mut items = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let item = PurchaseOrderItem {
                id: Uuid::new_v4().to_string(),
                purchase_order_id: po.id.clone(),
                product_id: line.product_id.clone(),
                quantity_ordered: line.quantity,
                quantity_received: 0,
                unit_cost_cents: line.unit_cost_cents,
                total_cost_cents: Money::from_cents(line.unit_cost_cents)
                    .multiply_quantity(line.quantity)
                    .cents(),
                created_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO purchase_order_items (
                    id, purchase_order_id, product_id, quantity_ordered,
                    quantity_received, unit_cost_cents, total_cost_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&item.purchase_order_id)
            .bind(&item.product_id)
            .bind(item.quantity_ordered)
            .bind(item.quantity_received)
            .bind(item.unit_cost_cents)
            .bind(item.total_cost_cents)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;

            items.push(item);
        }

        tx.commit().await?;

        info!(number = %po.number, total_cents = %po.total_cents, "Purchase order created");

        Ok((po, items))
    }

    /// Receives quantities against a purchase order, fully or partially.
    ///
    /// ## Errors
    /// * `NotFound` - unknown PO or item
    /// * `InvalidStatus` - PO is received or cancelled
    /// * `InvalidQuantity` - a line quantity ≤ 0
    /// * `OverReceipt` - cumulative received would exceed ordered; the
    ///   whole receipt rolls back
    pub async fn receive_purchase_order(
        &self,
        po_id: &str,
        receipts: Vec<ReceiptLine>,
        actor: Option<&str>,
    ) -> LedgerResult<PurchaseOrder> {
        if receipts.is_empty() {
            return Err(CoreError::Validation(ValidationError::Required {
                field: "receipts".to_string(),
            })
            .into());
        }

        for _ in 0..PURCHASE_RETRY_LIMIT {
            match self.try_receive(po_id, &receipts, actor).await {
                Err(err) if err.is_busy() => continue,
                other => return other,
            }
        }

        Err(CoreError::Conflict.into())
    }

    async fn try_receive(
        &self,
        po_id: &str,
        receipts: &[ReceiptLine],
        actor: Option<&str>,
    ) -> LedgerResult<PurchaseOrder> {
        debug!(po_id = %po_id, lines = receipts.len(), "Receiving purchase order");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let po = fetch_po_tx(&mut tx, po_id)
            .await?
            .ok_or_else(|| CoreError::not_found("PurchaseOrder", po_id))?;

        if !po.status.accepts_receipts() {
            return Err(CoreError::InvalidStatus {
                entity: "PurchaseOrder",
                id: po.id.clone(),
                status: po.status.as_str().to_string(),
            }
            .into());
        }

        let remark = format!("PO receipt {}", po.number);

        for line in receipts {
            if line.quantity <= 0 {
                return Err(CoreError::InvalidQuantity {
                    quantity: line.quantity,
                }
                .into());
            }

            let item = sqlx::query_as::<_, PurchaseOrderItem>(&format!(
                "SELECT {PO_ITEM_COLUMNS} FROM purchase_order_items \
                 WHERE id = ?1 AND purchase_order_id = ?2"
            ))
            .bind(&line.item_id)
            .bind(po_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::not_found("PurchaseOrderItem", &line.item_id))?;

            // Cumulative guard: earlier receipts count against the ordered
            // quantity.
            if item.quantity_received + line.quantity > item.quantity_ordered {
                let code: String = sqlx::query_scalar("SELECT code FROM products WHERE id = ?1")
                    .bind(&item.product_id)
                    .fetch_one(&mut *tx)
                    .await?;

                return Err(CoreError::OverReceipt {
                    code,
                    ordered: item.quantity_ordered,
                    received: item.quantity_received,
                    requested: line.quantity,
                }
                .into());
            }

            apply_movement_tx(
                &mut tx,
                &item.product_id,
                StockDirection::In,
                line.quantity,
                &remark,
                actor,
            )
            .await?;

            sqlx::query(
                "UPDATE purchase_order_items \
                 SET quantity_received = quantity_received + ?1 WHERE id = ?2",
            )
            .bind(line.quantity)
            .bind(&line.item_id)
            .execute(&mut *tx)
            .await?;
        }

        // Status recompute: received once nothing is outstanding.
        let outstanding: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM purchase_order_items \
             WHERE purchase_order_id = ?1 AND quantity_received < quantity_ordered",
        )
        .bind(po_id)
        .fetch_one(&mut *tx)
        .await?;

        let status = if outstanding == 0 {
            PurchaseOrderStatus::Received
        } else {
            PurchaseOrderStatus::Partial
        };

        sqlx::query("UPDATE purchase_orders SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(po_id)
            .bind(status)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(number = %po.number, status = %status.as_str(), "Purchase order receipt applied");

        Ok(PurchaseOrder {
            status,
            updated_at: now,
            ..po
        })
    }

    /// Cancels a purchase order that has not received anything yet.
    pub async fn cancel_purchase_order(&self, po_id: &str) -> LedgerResult<PurchaseOrder> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let po = fetch_po_tx(&mut tx, po_id)
            .await?
            .ok_or_else(|| CoreError::not_found("PurchaseOrder", po_id))?;

        if po.status != PurchaseOrderStatus::Pending {
            return Err(CoreError::InvalidStatus {
                entity: "PurchaseOrder",
                id: po.id.clone(),
                status: po.status.as_str().to_string(),
            }
            .into());
        }

        sqlx::query(
            "UPDATE purchase_orders SET status = 'cancelled', updated_at = ?2 \
             WHERE id = ?1 AND status = 'pending'",
        )
        .bind(po_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(number = %po.number, "Purchase order cancelled");

        Ok(PurchaseOrder {
            status: PurchaseOrderStatus::Cancelled,
            updated_at: now,
            ..po
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets a purchase order by ID.
    pub async fn get_by_id(&self, id: &str) -> LedgerResult<Option<PurchaseOrder>> {
        let po = sqlx::query_as::<_, PurchaseOrder>(&format!(
            "SELECT {PO_COLUMNS} FROM purchase_orders WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(po)
    }

    /// Gets all items for a purchase order, in insertion order.
    pub async fn get_items(&self, po_id: &str) -> LedgerResult<Vec<PurchaseOrderItem>> {
        let items = sqlx::query_as::<_, PurchaseOrderItem>(&format!(
            "SELECT {PO_ITEM_COLUMNS} FROM purchase_order_items \
             WHERE purchase_order_id = ?1 ORDER BY created_at"
        ))
        .bind(po_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists the most recent purchase orders.
    pub async fn list_recent(&self, limit: u32) -> LedgerResult<Vec<PurchaseOrder>> {
        let orders = sqlx::query_as::<_, PurchaseOrder>(&format!(
            "SELECT {PO_COLUMNS} FROM purchase_orders ORDER BY created_at DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }
}

/// Fetches a purchase order inside a transaction.
async fn fetch_po_tx(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
) -> Result<Option<PurchaseOrder>, sqlx::Error> {
    sqlx::query_as::<_, PurchaseOrder>(&format!(
        "SELECT {PO_COLUMNS} FROM purchase_orders WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

// =============================================================================
// Unit Tests
// =============================================================================
