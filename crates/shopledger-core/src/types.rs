//! # Domain Types
//!
//! Core domain records for the inventory and sales ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Catalog            Ledger              Transactions            │
//! │  ────────           ──────────          ─────────────           │
//! │  Category           StockHistory        Invoice ── InvoiceItem  │
//! │  Product            StockDirection      PurchaseOrder ── Item   │
//! │                                                                 │
//! │  Parties                                                        │
//! │  ────────                                                       │
//! │  Customer (loyalty_points)   Supplier                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business number (product `code`, invoice `number`, PO `number`) -
//!   human-readable, unique, what staff actually type and print
//!
//! Derived values (`is_low_stock`, `stock_value`, `profit_margin`) are pure
//! functions over persisted fields and are never stored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Category
// =============================================================================

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Category {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Unique display name.
    pub name: String,

    /// Optional description.
    pub description: Option<String>,

    /// Whether the category is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
///
/// `stock` is mutated exclusively by the Ledger Engine; every change is
/// paired with a [`StockHistory`] row in the same transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business code - unique, also what a barcode/QR scan resolves to.
    pub code: String,

    /// Display name.
    pub name: String,

    /// Category this product belongs to.
    pub category_id: Option<String>,

    /// Unit sale price in cents.
    pub price_cents: i64,

    /// Unit cost in cents (for margin calculations).
    pub cost_cents: i64,

    /// Current stock quantity. Never negative.
    pub stock: i64,

    /// Minimum-stock threshold for low-stock alerts.
    pub min_stock: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the unit cost as Money.
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// A product is low on stock when it is at or below its threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    /// Total value of the stock on hand: `stock × price`.
    #[inline]
    pub fn stock_value(&self) -> Money {
        self.price().multiply_quantity(self.stock)
    }

    /// Profit margin `(price - cost) / price`, or 0.0 unless both price
    /// and cost are positive.
    pub fn profit_margin(&self) -> f64 {
        if self.price_cents > 0 && self.cost_cents > 0 {
            (self.price() - self.cost()).ratio_of(self.price())
        } else {
            0.0
        }
    }

    /// Checks whether an `out` movement of `quantity` can be satisfied.
    #[inline]
    pub fn can_deduct(&self, quantity: i64) -> bool {
        quantity > 0 && quantity <= self.stock
    }
}

// =============================================================================
// Stock Movements
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum StockDirection {
    /// Stock increase (purchase receipt, cancellation reversal, correction).
    In,
    /// Stock decrease (sale, damage write-off, correction).
    Out,
}

impl StockDirection {
    /// Stable string form, matching the persisted representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            StockDirection::In => "in",
            StockDirection::Out => "out",
        }
    }

    /// Signed stock delta for a movement of `quantity` in this direction.
    pub const fn signed(&self, quantity: i64) -> i64 {
        match self {
            StockDirection::In => quantity,
            StockDirection::Out => -quantity,
        }
    }
}

/// An immutable audit record of one stock mutation.
///
/// Append-only: rows are never updated or deleted. One row per ledger
/// mutation, written in the same transaction as the stock change itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StockHistory {
    pub id: String,
    pub product_id: String,
    pub direction: StockDirection,

    /// Moved quantity. Always positive; direction carries the sign.
    pub quantity: i64,

    /// Stock before the movement.
    pub old_stock: i64,

    /// Stock after the movement.
    pub new_stock: i64,

    /// Free-text remark ("Sale Alice - Invoice INV-...", "PO receipt ...").
    pub remark: String,

    /// Authenticated actor identity, when the caller supplies one.
    pub actor: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl StockHistory {
    /// Invariant: `new_stock == old_stock ± quantity` by direction.
    pub fn is_consistent(&self) -> bool {
        self.quantity > 0 && self.new_stock == self.old_stock + self.direction.signed(self.quantity)
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// The status of a sale invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    /// Sale finalized; stock deducted, points accrued.
    Completed,
    /// Sale reversed; stock restored, points clawed back.
    Cancelled,
}

impl InvoiceStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Completed => "completed",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

/// A sale invoice.
///
/// Immutable once created, except for the `completed` → `cancelled` status
/// transition which also reverses the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Invoice {
    pub id: String,

    /// Unique business number, `INV-YYYYMMDD-NNN`.
    pub number: String,

    /// Registered customer, when the sale names one.
    pub customer_id: Option<String>,

    /// Free-text customer name; covers walk-ins without a customer record.
    pub customer_name: String,

    /// Date of sale.
    pub date: DateTime<Utc>,

    /// Invoice total in cents. Equals the sum of its item amounts.
    pub total_cents: i64,

    pub status: InvoiceStatus,

    /// Authenticated actor identity, when the caller supplies one.
    pub actor: Option<String>,

    pub created_at: DateTime<Utc>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Invoice {
    /// Returns the invoice total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item on an invoice.
///
/// Uses the snapshot pattern: the product name and unit price are frozen at
/// sale time so later catalog edits do not rewrite history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvoiceItem {
    pub id: String,
    pub invoice_id: String,
    pub product_id: String,

    /// Product name at time of sale (frozen).
    pub name_snapshot: String,

    /// Quantity sold.
    pub quantity: i64,

    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,

    /// Line amount: `quantity × unit_price`.
    pub amount_cents: i64,

    pub created_at: DateTime<Utc>,
}

impl InvoiceItem {
    /// Returns the line amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Invariant: `amount == quantity × unit_price`.
    pub fn is_consistent(&self) -> bool {
        self.quantity > 0 && self.amount_cents == self.unit_price_cents * self.quantity
    }
}

// =============================================================================
// Purchase Orders
// =============================================================================

/// The status of a supplier purchase order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PurchaseOrderStatus {
    /// Ordered, nothing received yet.
    Pending,
    /// Some items received, some still outstanding.
    Partial,
    /// Every item fully received.
    Received,
    /// Cancelled before any receipt.
    Cancelled,
}

impl PurchaseOrderStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            PurchaseOrderStatus::Pending => "pending",
            PurchaseOrderStatus::Partial => "partial",
            PurchaseOrderStatus::Received => "received",
            PurchaseOrderStatus::Cancelled => "cancelled",
        }
    }

    /// Whether a receipt may still be posted against this order.
    pub const fn accepts_receipts(&self) -> bool {
        matches!(self, PurchaseOrderStatus::Pending | PurchaseOrderStatus::Partial)
    }
}

/// A supplier purchase order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseOrder {
    pub id: String,

    /// Unique business number, `PO-YYYYMMDD-NNN`.
    pub number: String,

    pub supplier_id: String,

    pub order_date: DateTime<Utc>,
    pub expected_date: Option<DateTime<Utc>>,

    /// Order total in cents. Equals the sum of its item line totals.
    pub total_cents: i64,

    pub status: PurchaseOrderStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseOrder {
    /// Returns the order total as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line item on a purchase order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PurchaseOrderItem {
    pub id: String,
    pub purchase_order_id: String,
    pub product_id: String,

    /// Quantity ordered from the supplier.
    pub quantity_ordered: i64,

    /// Cumulative quantity received so far. Never exceeds `quantity_ordered`.
    pub quantity_received: i64,

    /// Unit cost in cents agreed with the supplier.
    pub unit_cost_cents: i64,

    /// Line total: `quantity_ordered × unit_cost`.
    pub total_cost_cents: i64,

    pub created_at: DateTime<Utc>,
}

impl PurchaseOrderItem {
    /// Quantity still outstanding.
    #[inline]
    pub fn remaining(&self) -> i64 {
        self.quantity_ordered - self.quantity_received
    }

    /// Whether the ordered quantity has been fully received.
    #[inline]
    pub fn is_fully_received(&self) -> bool {
        self.quantity_received >= self.quantity_ordered
    }
}

// =============================================================================
// Customer
// =============================================================================

/// A customer with loyalty tracking.
///
/// `loyalty_points` is mutated only by sale accrual, cancellation reversal
/// and explicit redemption.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,

    /// Credit limit in cents.
    pub credit_limit_cents: i64,

    /// Loyalty point balance. Never negative.
    pub loyalty_points: i64,

    /// Whether the customer is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Supplier
// =============================================================================

/// A supplier of purchased stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,

    /// Whether the supplier is active (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Operation Inputs
// =============================================================================

/// One line of a sale request: which product, how many.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: String,
    pub quantity: i64,
}

/// Input for the sale coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSale {
    /// Free-text customer name (walk-ins included).
    pub customer_name: String,

    /// Registered customer to accrue loyalty points for, if any.
    pub customer_id: Option<String>,

    /// Authenticated actor identity for the audit trail, if any.
    pub actor: Option<String>,

    pub lines: Vec<SaleLine>,
}

/// One line of a new purchase order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPurchaseOrderLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
}

/// Input for creating a purchase order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPurchaseOrder {
    pub supplier_id: String,
    pub expected_date: Option<DateTime<Utc>>,
    pub lines: Vec<NewPurchaseOrderLine>,
}

/// One line of a purchase-order receipt: which PO item, how many arrived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLine {
    pub item_id: String,
    pub quantity: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(price_cents: i64, cost_cents: i64, stock: i64, min_stock: i64) -> Product {
        let now = Utc::now();
        Product {
            id: "p1".to_string(),
            code: "P001".to_string(),
            name: "Laptop".to_string(),
            category_id: None,
            price_cents,
            cost_cents,
            stock,
            min_stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_low_stock_threshold_is_inclusive() {
        assert!(product(1000, 800, 5, 5).is_low_stock());
        assert!(product(1000, 800, 3, 5).is_low_stock());
        assert!(!product(1000, 800, 6, 5).is_low_stock());
    }

    #[test]
    fn test_stock_value() {
        let p = product(99_999, 0, 10, 5);
        assert_eq!(p.stock_value().cents(), 999_990);
    }

    #[test]
    fn test_profit_margin() {
        let p = product(10_000, 6_000, 0, 0);
        assert!((p.profit_margin() - 0.4).abs() < 1e-9);

        // Zero price or zero cost short-circuits to 0.0
        assert_eq!(product(0, 6_000, 0, 0).profit_margin(), 0.0);
        assert_eq!(product(10_000, 0, 0, 0).profit_margin(), 0.0);
    }

    #[test]
    fn test_can_deduct() {
        let p = product(1000, 800, 5, 2);
        assert!(p.can_deduct(5));
        assert!(p.can_deduct(1));
        assert!(!p.can_deduct(6));
        assert!(!p.can_deduct(0));
        assert!(!p.can_deduct(-1));
    }

    #[test]
    fn test_direction_signed() {
        assert_eq!(StockDirection::In.signed(3), 3);
        assert_eq!(StockDirection::Out.signed(3), -3);
    }

    #[test]
    fn test_stock_history_consistency() {
        let now = Utc::now();
        let row = StockHistory {
            id: "h1".to_string(),
            product_id: "p1".to_string(),
            direction: StockDirection::Out,
            quantity: 3,
            old_stock: 10,
            new_stock: 7,
            remark: "test".to_string(),
            actor: None,
            created_at: now,
        };
        assert!(row.is_consistent());

        let bad = StockHistory {
            new_stock: 8,
            ..row.clone()
        };
        assert!(!bad.is_consistent());

        let zero_qty = StockHistory {
            quantity: 0,
            new_stock: 10,
            ..row
        };
        assert!(!zero_qty.is_consistent());
    }

    #[test]
    fn test_invoice_item_consistency() {
        let item = InvoiceItem {
            id: "i1".to_string(),
            invoice_id: "inv1".to_string(),
            product_id: "p1".to_string(),
            name_snapshot: "Laptop".to_string(),
            quantity: 2,
            unit_price_cents: 5000,
            amount_cents: 10_000,
            created_at: Utc::now(),
        };
        assert!(item.is_consistent());

        let bad = InvoiceItem {
            amount_cents: 9_999,
            ..item
        };
        assert!(!bad.is_consistent());
    }

    #[test]
    fn test_po_item_remaining() {
        let item = PurchaseOrderItem {
            id: "poi1".to_string(),
            purchase_order_id: "po1".to_string(),
            product_id: "p1".to_string(),
            quantity_ordered: 10,
            quantity_received: 8,
            unit_cost_cents: 700,
            total_cost_cents: 7000,
            created_at: Utc::now(),
        };
        assert_eq!(item.remaining(), 2);
        assert!(!item.is_fully_received());
    }

    #[test]
    fn test_po_status_accepts_receipts() {
        assert!(PurchaseOrderStatus::Pending.accepts_receipts());
        assert!(PurchaseOrderStatus::Partial.accepts_receipts());
        assert!(!PurchaseOrderStatus::Received.accepts_receipts());
        assert!(!PurchaseOrderStatus::Cancelled.accepts_receipts());
    }
}
