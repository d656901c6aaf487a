//! # Sale Transaction Coordinator
//!
//! Turns a cart of (product, quantity) lines into a completed sale.
//!
//! ## Sale Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  create_sale(customer, lines)                                   │
//! │                                                                 │
//! │  ┌───────────────────── SINGLE TRANSACTION ──────────────────┐  │
//! │  │                                                           │  │
//! │  │  1. Resolve + pre-validate every line (stock, quantity)   │  │
//! │  │  2. Allocate invoice number (INV-YYYYMMDD-NNN)            │  │
//! │  │  3. INSERT invoice + invoice_items (price snapshots)      │  │
//! │  │  4. Per line: ledger `out` movement + history row         │  │
//! │  │  5. Accrue loyalty points (floor(total / unit))           │  │
//! │  │                                                           │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │                                                                 │
//! │  COMMIT ← invoice, items, stock changes and points land         │
//! │           together or roll back together                        │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Pre-validation (step 1) reports failures before anything is written,
//! but the per-line guarded updates in step 4 are what actually hold under
//! concurrency: stock consumed by another sale between steps 1 and 4 fails
//! the movement and rolls back the whole invoice.

use chrono::Utc;
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, LedgerError, LedgerResult};
use crate::repository::ledger::apply_movement_tx;
use crate::repository::numbering::next_number;
use shopledger_core::{
    CoreError, Invoice, InvoiceItem, InvoiceStatus, LoyaltyPolicy, Money, NewSale, StockDirection,
    ValidationError, MAX_SALE_LINES,
};

/// Retries for number-allocation races and lock contention.
const SALE_RETRY_LIMIT: u32 = 3;

const INVOICE_COLUMNS: &str = "id, number, customer_id, customer_name, date, total_cents, \
     status, actor, created_at, cancelled_at";

/// The outcome of a completed sale.
#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    /// Loyalty points credited to the customer (0 for walk-ins).
    pub points_accrued: i64,
}

/// Coordinates multi-line sales on top of the ledger engine.
#[derive(Debug, Clone)]
pub struct SaleCoordinator {
    pool: SqlitePool,
    policy: LoyaltyPolicy,
}

impl SaleCoordinator {
    /// Creates a new SaleCoordinator.
    pub fn new(pool: SqlitePool, policy: LoyaltyPolicy) -> Self {
        SaleCoordinator { pool, policy }
    }

    /// Creates a completed sale from a cart of lines.
    ///
    /// ## Errors
    /// * `EmptyCart` - no lines
    /// * `NotFound` - unknown product or customer
    /// * `InvalidQuantity` - a line quantity ≤ 0
    /// * `InsufficientStock` - a line exceeds available stock; nothing is
    ///   persisted
    /// * `Conflict` - contention exhausted the bounded retries
    pub async fn create_sale(&self, sale: NewSale) -> LedgerResult<SaleReceipt> {
        if sale.lines.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }
        if sale.lines.len() > MAX_SALE_LINES {
            return Err(CoreError::Validation(ValidationError::OutOfRange {
                field: "lines".to_string(),
                min: 1,
                max: MAX_SALE_LINES as i64,
            })
            .into());
        }

        for _ in 0..SALE_RETRY_LIMIT {
            match self.try_create(&sale).await {
                Err(err) if err.is_busy() => continue,
                // A raced invoice number fails the UNIQUE index; re-allocate.
                Err(LedgerError::Storage(DbError::UniqueViolation { field, .. }))
                    if field.contains("invoices.number") =>
                {
                    continue
                }
                other => return other,
            }
        }

        Err(CoreError::Conflict.into())
    }

    /// One attempt at the full sale transaction.
    async fn try_create(&self, sale: &NewSale) -> LedgerResult<SaleReceipt> {
        debug!(customer = %sale.customer_name, lines = sale.lines.len(), "Creating sale");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        // Resolve and pre-validate every line before any write, so a bad
        // cart fails without leaving partial state.
        let mut resolved: Vec<(String, String, i64, i64)> = Vec::with_capacity(sale.lines.len());
        let mut total = Money::zero();

        for line in &sale.lines {
            let row: Option<(String, String, i64, i64)> = sqlx::query_as(
                "SELECT code, name, price_cents, stock FROM products \
                 WHERE id = ?1 AND is_active = 1",
            )
            .bind(&line.product_id)
            .fetch_optional(&mut *tx)
            .await?;

            let (code, name, price_cents, stock) = match row {
                Some(row) => row,
                None => return Err(CoreError::not_found("Product", &line.product_id).into()),
            };

            if line.quantity <= 0 {
                return Err(CoreError::InvalidQuantity {
                    quantity: line.quantity,
                }
                .into());
            }
            if line.quantity > stock {
                return Err(CoreError::InsufficientStock {
                    code,
                    available: stock,
                    requested: line.quantity,
                }
                .into());
            }

            // Line amount uses the current catalog price
            total += Money::from_cents(price_cents).multiply_quantity(line.quantity);
            resolved.push((name, code, price_cents, line.quantity));
        }

        let number = next_number(&mut tx, "invoices", "INV", now).await?;

        let invoice = Invoice {
            id: Uuid::new_v4().to_string(),
            number: number.clone(),
            customer_id: sale.customer_id.clone(),
            customer_name: sale.customer_name.clone(),
            date: now,
            total_cents: total.cents(),
            status: InvoiceStatus::Completed,
            actor: sale.actor.clone(),
            created_at: now,
            cancelled_at: None,
        };

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, number, customer_id, customer_name, date, total_cents,
                status, actor, created_at, cancelled_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.number)
        .bind(&invoice.customer_id)
        .bind(&invoice.customer_name)
        .bind(invoice.date)
        .bind(invoice.total_cents)
        .bind(invoice.status)
        .bind(&invoice.actor)
        .bind(invoice.created_at)
        .bind(invoice.cancelled_at)
        .execute(&mut *tx)
        .await?;

        let remark = format!("Sale {} - Invoice {}", sale.customer_name, number);
        let mut items = Vec::with_capacity(sale.lines.len());

        for (line, (name, _code, price_cents, quantity)) in sale.lines.iter().zip(&resolved) {
            let item = InvoiceItem {
                id: Uuid::new_v4().to_string(),
                invoice_id: invoice.id.clone(),
                product_id: line.product_id.clone(),
                name_snapshot: name.clone(),
                quantity: *quantity,
                unit_price_cents: *price_cents,
                amount_cents: Money::from_cents(*price_cents)
                    .multiply_quantity(*quantity)
                    .cents(),
                created_at: now,
            };

            sqlx::query(
                r#"
                INSERT INTO invoice_items (
                    id, invoice_id, product_id, name_snapshot,
                    quantity, unit_price_cents, amount_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&item.id)
            .bind(&item.invoice_id)
            .bind(&item.product_id)
            .bind(&item.name_snapshot)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .bind(item.amount_cents)
            .bind(item.created_at)
            .execute(&mut *tx)
            .await?;

            apply_movement_tx(
                &mut tx,
                &line.product_id,
                StockDirection::Out,
                *quantity,
                &remark,
                sale.actor.as_deref(),
            )
            .await?;

            items.push(item);
        }

        // Loyalty accrual, inside the same transaction so a failed sale
        // never credits points.
        let mut points_accrued = 0;
        if let Some(customer_id) = &sale.customer_id {
            points_accrued = self.policy.points_for(total);

            let result = sqlx::query(
                r#"
                UPDATE customers
                SET loyalty_points = loyalty_points + ?1, updated_at = ?2
                WHERE id = ?3 AND is_active = 1
                "#,
            )
            .bind(points_accrued)
            .bind(now)
            .bind(customer_id)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(CoreError::not_found("Customer", customer_id).into());
            }
        }

        tx.commit().await?;

        info!(
            number = %invoice.number,
            total_cents = %invoice.total_cents,
            lines = items.len(),
            points = points_accrued,
            "Sale completed"
        );

        Ok(SaleReceipt {
            invoice,
            items,
            points_accrued,
        })
    }

    /// Cancels a completed invoice, reversing its ledger effects.
    ///
    /// Per item, a compensating `in` movement restores stock; points the
    /// sale accrued are deducted again (clamped at zero). Only a
    /// `completed` invoice can be cancelled.
    pub async fn cancel_invoice(&self, invoice_id: &str, actor: Option<&str>) -> LedgerResult<Invoice> {
        for _ in 0..SALE_RETRY_LIMIT {
            match self.try_cancel(invoice_id, actor).await {
                Err(err) if err.is_busy() => continue,
                other => return other,
            }
        }

        Err(CoreError::Conflict.into())
    }

    async fn try_cancel(&self, invoice_id: &str, actor: Option<&str>) -> LedgerResult<Invoice> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let invoice = fetch_invoice_tx(&mut tx, invoice_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Invoice", invoice_id))?;

        if invoice.status != InvoiceStatus::Completed {
            return Err(CoreError::InvalidStatus {
                entity: "Invoice",
                id: invoice.id.clone(),
                status: invoice.status.as_str().to_string(),
            }
            .into());
        }

        let items = sqlx::query_as::<_, InvoiceItem>(
            "SELECT id, invoice_id, product_id, name_snapshot, quantity, \
             unit_price_cents, amount_cents, created_at \
             FROM invoice_items WHERE invoice_id = ?1 ORDER BY created_at",
        )
        .bind(invoice_id)
        .fetch_all(&mut *tx)
        .await?;

        let remark = format!("Invoice {} cancelled", invoice.number);
        for item in &items {
            apply_movement_tx(
                &mut tx,
                &item.product_id,
                StockDirection::In,
                item.quantity,
                &remark,
                actor,
            )
            .await?;
        }

        // Claw back the accrued points. Clamped at zero: a balance already
        // spent cannot go negative.
        if let Some(customer_id) = &invoice.customer_id {
            let points = self.policy.points_for(invoice.total());
            if points > 0 {
                sqlx::query(
                    r#"
                    UPDATE customers
                    SET loyalty_points = MAX(loyalty_points - ?1, 0), updated_at = ?2
                    WHERE id = ?3
                    "#,
                )
                .bind(points)
                .bind(now)
                .bind(customer_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        let result = sqlx::query(
            "UPDATE invoices SET status = 'cancelled', cancelled_at = ?2 \
             WHERE id = ?1 AND status = 'completed'",
        )
        .bind(invoice_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice (completed)", invoice_id).into());
        }

        tx.commit().await?;

        info!(number = %invoice.number, "Invoice cancelled, stock restored");

        Ok(Invoice {
            status: InvoiceStatus::Cancelled,
            cancelled_at: Some(now),
            ..invoice
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an invoice by ID.
    pub async fn get_by_id(&self, id: &str) -> LedgerResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Gets an invoice by business number.
    pub async fn get_by_number(&self, number: &str) -> LedgerResult<Option<Invoice>> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE number = ?1"
        ))
        .bind(number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(invoice)
    }

    /// Gets all items for an invoice, in insertion order.
    pub async fn get_items(&self, invoice_id: &str) -> LedgerResult<Vec<InvoiceItem>> {
        let items = sqlx::query_as::<_, InvoiceItem>(
            "SELECT id, invoice_id, product_id, name_snapshot, quantity, \
             unit_price_cents, amount_cents, created_at \
             FROM invoice_items WHERE invoice_id = ?1 ORDER BY created_at",
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Lists the most recent invoices.
    pub async fn list_recent(&self, limit: u32) -> LedgerResult<Vec<Invoice>> {
        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices ORDER BY created_at DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(invoices)
    }

    /// Counts all invoices.
    pub async fn count(&self) -> LedgerResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Fetches an invoice inside a transaction.
async fn fetch_invoice_tx(
    tx: &mut Transaction<'_, Sqlite>,
    id: &str,
) -> Result<Option<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>(&format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await
}

// =============================================================================
// Unit Tests
// =============================================================================
