//! # Reporting Surface
//!
//! Read-only aggregates for dashboards and exports.
//!
//! Everything here is computed on demand from persisted state. Nothing is
//! cached, so there is no invalidation to get wrong; at small-business row
//! counts the recomputation cost is noise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::LedgerResult;
use shopledger_core::Product;

const PRODUCT_COLUMNS: &str = "id, code, name, category_id, price_cents, cost_cents, \
     stock, min_stock, is_active, created_at, updated_at";

// =============================================================================
// Read Models
// =============================================================================

/// Snapshot of the inventory position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct InventorySummary {
    pub total_products: i64,
    /// `SUM(stock × price)` over active products, in cents.
    pub total_stock_value_cents: i64,
    /// Products at or below their minimum-stock threshold.
    pub low_stock_count: i64,
    pub out_of_stock_count: i64,
}

/// Sales aggregates over a date window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub invoice_count: i64,
    pub total_cents: i64,
    /// Average invoice value in cents; 0 when the window is empty.
    pub average_cents: i64,
}

/// One row of the top-sellers ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TopProduct {
    pub product_id: String,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue_cents: i64,
}

/// Stock value grouped by category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryStockValue {
    pub category_id: Option<String>,
    pub category_name: String,
    pub stock_value_cents: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Read-only reporting queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    /// Creates a new ReportRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Inventory position across all active products.
    pub async fn inventory_summary(&self) -> LedgerResult<InventorySummary> {
        let summary = sqlx::query_as::<_, InventorySummary>(
            r#"
            SELECT
                COUNT(*) AS total_products,
                COALESCE(SUM(stock * price_cents), 0) AS total_stock_value_cents,
                COALESCE(SUM(CASE WHEN stock <= min_stock THEN 1 ELSE 0 END), 0) AS low_stock_count,
                COALESCE(SUM(CASE WHEN stock = 0 THEN 1 ELSE 0 END), 0) AS out_of_stock_count
            FROM products
            WHERE is_active = 1
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Active products at or below their minimum-stock threshold, the
    /// emptiest first.
    pub async fn low_stock_products(&self) -> LedgerResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 AND stock <= min_stock \
             ORDER BY stock, name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Active products with zero stock.
    pub async fn out_of_stock_products(&self) -> LedgerResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE is_active = 1 AND stock = 0 \
             ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Completed-sales aggregates over `[from, to)`.
    pub async fn sales_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> LedgerResult<SalesSummary> {
        let (invoice_count, total_cents): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(total_cents), 0)
            FROM invoices
            WHERE status = 'completed' AND date >= ?1 AND date < ?2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let average_cents = if invoice_count > 0 {
            total_cents / invoice_count
        } else {
            0
        };

        Ok(SalesSummary {
            invoice_count,
            total_cents,
            average_cents,
        })
    }

    /// Top products by quantity sold over `[from, to)`, aggregated from
    /// completed invoices.
    pub async fn top_products(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: u32,
    ) -> LedgerResult<Vec<TopProduct>> {
        let rows = sqlx::query_as::<_, TopProduct>(
            r#"
            SELECT
                ii.product_id AS product_id,
                p.name AS name,
                SUM(ii.quantity) AS quantity_sold,
                SUM(ii.amount_cents) AS revenue_cents
            FROM invoice_items ii
            INNER JOIN invoices i ON i.id = ii.invoice_id
            INNER JOIN products p ON p.id = ii.product_id
            WHERE i.status = 'completed' AND i.date >= ?1 AND i.date < ?2
            GROUP BY ii.product_id, p.name
            ORDER BY quantity_sold DESC, revenue_cents DESC
            LIMIT ?3
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Stock value distribution by category, largest first. Products
    /// without a category land in an "Uncategorized" bucket.
    pub async fn category_stock_value(&self) -> LedgerResult<Vec<CategoryStockValue>> {
        let rows = sqlx::query_as::<_, CategoryStockValue>(
            r#"
            SELECT
                p.category_id AS category_id,
                COALESCE(c.name, 'Uncategorized') AS category_name,
                COALESCE(SUM(p.stock * p.price_cents), 0) AS stock_value_cents
            FROM products p
            LEFT JOIN categories c ON c.id = p.category_id
            WHERE p.is_active = 1
            GROUP BY p.category_id, category_name
            ORDER BY stock_value_cents DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::catalog::{generate_category_id, generate_product_id};
    use chrono::Duration;
    use shopledger_core::{Category, NewSale, Product, SaleLine};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    async fn seed_product(
        db: &Database,
        code: &str,
        category_id: Option<String>,
        price_cents: i64,
        stock: i64,
        min_stock: i64,
    ) -> Product {
        let now = Utc::now();
        let product = Product {
            id: generate_product_id(),
            code: code.to_string(),
            name: format!("Product {code}"),
            category_id,
            price_cents,
            cost_cents: price_cents / 2,
            stock,
            min_stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.catalog().insert_product(&product).await.unwrap();
        product
    }

    async fn seed_category(db: &Database, name: &str) -> Category {
        let now = Utc::now();
        let category = Category {
            id: generate_category_id(),
            name: name.to_string(),
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.catalog().insert_category(&category).await.unwrap();
        category
    }

    fn window() -> (DateTime<Utc>, DateTime<Utc>) {
        let now = Utc::now();
        (now - Duration::days(1), now + Duration::days(1))
    }

    #[tokio::test]
    async fn test_inventory_summary() {
        let db = test_db().await;
        seed_product(&db, "P001", None, 1_000, 10, 3).await; // healthy
        seed_product(&db, "P002", None, 2_000, 2, 5).await; // low
        seed_product(&db, "P003", None, 500, 0, 5).await; // out (and low)

        let summary = db.reports().inventory_summary().await.unwrap();
        assert_eq!(summary.total_products, 3);
        assert_eq!(summary.total_stock_value_cents, 10 * 1_000 + 2 * 2_000);
        assert_eq!(summary.low_stock_count, 2);
        assert_eq!(summary.out_of_stock_count, 1);
    }

    #[tokio::test]
    async fn test_low_and_out_of_stock_lists() {
        let db = test_db().await;
        seed_product(&db, "P001", None, 1_000, 10, 3).await;
        let low = seed_product(&db, "P002", None, 1_000, 2, 5).await;
        let out = seed_product(&db, "P003", None, 1_000, 0, 5).await;

        let low_list = db.reports().low_stock_products().await.unwrap();
        assert_eq!(low_list.len(), 2);
        // Emptiest first
        assert_eq!(low_list[0].id, out.id);
        assert_eq!(low_list[1].id, low.id);

        let out_list = db.reports().out_of_stock_products().await.unwrap();
        assert_eq!(out_list.len(), 1);
        assert_eq!(out_list[0].id, out.id);
    }

    #[tokio::test]
    async fn test_sales_summary_and_top_products() {
        let db = test_db().await;
        let p1 = seed_product(&db, "P001", None, 5_000, 50, 3).await;
        let p2 = seed_product(&db, "P002", None, 1_000, 50, 3).await;

        for (product, qty) in [(&p1, 2), (&p2, 7), (&p1, 1)] {
            db.sales()
                .create_sale(NewSale {
                    customer_name: "Alice".to_string(),
                    customer_id: None,
                    actor: None,
                    lines: vec![SaleLine {
                        product_id: product.id.clone(),
                        quantity: qty,
                    }],
                })
                .await
                .unwrap();
        }

        let (from, to) = window();
        let summary = db.reports().sales_summary(from, to).await.unwrap();
        assert_eq!(summary.invoice_count, 3);
        assert_eq!(summary.total_cents, 2 * 5_000 + 7 * 1_000 + 5_000);
        assert_eq!(summary.average_cents, summary.total_cents / 3);

        let top = db.reports().top_products(from, to, 10).await.unwrap();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].product_id, p2.id);
        assert_eq!(top[0].quantity_sold, 7);
        assert_eq!(top[0].revenue_cents, 7_000);
        assert_eq!(top[1].product_id, p1.id);
        assert_eq!(top[1].quantity_sold, 3);
        assert_eq!(top[1].revenue_cents, 15_000);
    }

    #[tokio::test]
    async fn test_cancelled_invoices_excluded_from_sales() {
        let db = test_db().await;
        let product = seed_product(&db, "P001", None, 5_000, 10, 3).await;

        let receipt = db
            .sales()
            .create_sale(NewSale {
                customer_name: "Alice".to_string(),
                customer_id: None,
                actor: None,
                lines: vec![SaleLine {
                    product_id: product.id.clone(),
                    quantity: 2,
                }],
            })
            .await
            .unwrap();

        db.sales()
            .cancel_invoice(&receipt.invoice.id, None)
            .await
            .unwrap();

        let (from, to) = window();
        let summary = db.reports().sales_summary(from, to).await.unwrap();
        assert_eq!(summary.invoice_count, 0);
        assert_eq!(summary.total_cents, 0);
        assert_eq!(summary.average_cents, 0);

        assert!(db.reports().top_products(from, to, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_window() {
        let db = test_db().await;
        let (from, to) = window();
        let summary = db.reports().sales_summary(from, to).await.unwrap();
        assert_eq!(summary.invoice_count, 0);
        assert_eq!(summary.average_cents, 0);
    }

    #[tokio::test]
    async fn test_category_stock_value() {
        let db = test_db().await;
        let electronics = seed_category(&db, "Electronics").await;
        seed_product(&db, "P001", Some(electronics.id.clone()), 10_000, 5, 1).await;
        seed_product(&db, "P002", Some(electronics.id.clone()), 2_000, 10, 1).await;
        seed_product(&db, "P003", None, 500, 4, 1).await;

        let rows = db.reports().category_stock_value().await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].category_name, "Electronics");
        assert_eq!(rows[0].stock_value_cents, 5 * 10_000 + 10 * 2_000);
        assert_eq!(rows[1].category_name, "Uncategorized");
        assert_eq!(rows[1].stock_value_cents, 4 * 500);
    }

    #[tokio::test]
    async fn test_reads_are_idempotent() {
        let db = test_db().await;
        seed_product(&db, "P001", None, 1_000, 10, 3).await;
        seed_product(&db, "P002", None, 2_000, 0, 3).await;

        let first = db.reports().inventory_summary().await.unwrap();
        let second = db.reports().inventory_summary().await.unwrap();
        assert_eq!(first, second);

        let rows_a = db.reports().category_stock_value().await.unwrap();
        let rows_b = db.reports().category_stock_value().await.unwrap();
        assert_eq!(rows_a, rows_b);
    }
}
