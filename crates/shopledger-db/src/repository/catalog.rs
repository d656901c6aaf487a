//! # Catalog Repository
//!
//! Database operations for categories and products.
//!
//! One rule matters here: **this module never writes `products.stock`**.
//! `update_product` deliberately leaves the stock column out of its SET
//! list; stock moves only through the ledger engine, which pairs every
//! change with a history row.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, LedgerResult};
use shopledger_core::validation::{
    validate_code, validate_min_stock, validate_name, validate_price_cents,
};
use shopledger_core::{Category, CoreError, Product};

const PRODUCT_COLUMNS: &str = "id, code, name, category_id, price_cents, cost_cents, \
     stock, min_stock, is_active, created_at, updated_at";

/// Repository for catalog database operations.
///
/// ## Usage
/// ```rust,ignore
/// let catalog = db.catalog();
///
/// // Barcode/QR scan resolves through the business code
/// let product = catalog.get_product_by_code("P001").await?;
/// ```
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Inserts a new category.
    pub async fn insert_category(&self, category: &Category) -> LedgerResult<()> {
        validate_name(&category.name).map_err(CoreError::from)?;

        debug!(name = %category.name, "Inserting category");

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, is_active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.is_active)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a category by ID.
    pub async fn get_category(&self, id: &str) -> LedgerResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, is_active, created_at, updated_at \
             FROM categories WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(category)
    }

    /// Lists active categories, sorted by name.
    pub async fn list_categories(&self) -> LedgerResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, name, description, is_active, created_at, updated_at \
             FROM categories WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Inserts a new product.
    ///
    /// ## Errors
    /// * `Validation` - bad code/name/price/min_stock
    /// * `DbError::UniqueViolation` - code already exists
    pub async fn insert_product(&self, product: &Product) -> LedgerResult<()> {
        validate_code(&product.code).map_err(CoreError::from)?;
        validate_name(&product.name).map_err(CoreError::from)?;
        validate_price_cents(product.price_cents).map_err(CoreError::from)?;
        validate_price_cents(product.cost_cents).map_err(CoreError::from)?;
        validate_min_stock(product.min_stock).map_err(CoreError::from)?;

        debug!(code = %product.code, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, code, name, category_id, price_cents, cost_cents,
                stock, min_stock, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a product by its ID.
    pub async fn get_product(&self, id: &str) -> LedgerResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by its business code.
    ///
    /// This is the lookup behind barcode/QR scanning: the scanner decodes
    /// to the code string, and the code resolves here.
    pub async fn get_product_by_code(&self, code: &str) -> LedgerResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?1 AND is_active = 1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists active products, sorted by name.
    pub async fn list_products(&self, limit: u32) -> LedgerResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Updates a product's catalog fields.
    ///
    /// Stock is not touched here; the SET list excludes it so a stale
    /// in-memory `Product` can never clobber the ledger.
    pub async fn update_product(&self, product: &Product) -> LedgerResult<()> {
        validate_code(&product.code).map_err(CoreError::from)?;
        validate_name(&product.name).map_err(CoreError::from)?;
        validate_price_cents(product.price_cents).map_err(CoreError::from)?;
        validate_price_cents(product.cost_cents).map_err(CoreError::from)?;
        validate_min_stock(product.min_stock).map_err(CoreError::from)?;

        debug!(id = %product.id, "Updating product");

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                code = ?2,
                name = ?3,
                category_id = ?4,
                price_cents = ?5,
                cost_cents = ?6,
                min_stock = ?7,
                is_active = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.min_stock)
        .bind(product.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id).into());
        }

        Ok(())
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Historical invoices and stock history keep referencing the row.
    pub async fn soft_delete_product(&self, id: &str) -> LedgerResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let now = Utc::now();

        let result =
            sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
                .bind(id)
                .bind(now)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id).into());
        }

        Ok(())
    }

    /// Counts active products.
    pub async fn count_products(&self) -> LedgerResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Helper to generate a new category ID.
pub fn generate_category_id() -> String {
    Uuid::new_v4().to_string()
}

/// Helper to generate a new product ID.
pub fn generate_product_id() -> String {
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

    fn sample_product(code: &str) -> Product {
        let now = Utc::now();
        Product {
            id: generate_product_id(),
            code: code.to_string(),
            name: "Laptop 15\"".to_string(),
            category_id: None,
            price_cents: 99_999,
            cost_cents: 70_000,
            stock: 10,
            min_stock: 3,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_lookup_by_code() {
        let db = test_db().await;
        let product = sample_product("P001");
        db.catalog().insert_product(&product).await.unwrap();

        let by_code = db
            .catalog()
            .get_product_by_code("P001")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_code.id, product.id);
        assert_eq!(by_code.stock, 10);

        assert!(db
            .catalog()
            .get_product_by_code("NOPE")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_code_rejected() {
        let db = test_db().await;
        db.catalog()
            .insert_product(&sample_product("P001"))
            .await
            .unwrap();

        let err = db
            .catalog()
            .insert_product(&sample_product("P001"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Storage(DbError::UniqueViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_fields_rejected() {
        let db = test_db().await;

        let mut bad_code = sample_product("has space");
        bad_code.code = "has space".to_string();
        assert!(db.catalog().insert_product(&bad_code).await.is_err());

        let mut bad_price = sample_product("P002");
        bad_price.price_cents = -1;
        assert!(db.catalog().insert_product(&bad_price).await.is_err());
    }

    #[tokio::test]
    async fn test_update_does_not_touch_stock() {
        let db = test_db().await;
        let mut product = sample_product("P001");
        db.catalog().insert_product(&product).await.unwrap();

        // Caller holds a stale stock value; the update must not apply it
        product.name = "Laptop 15\" (2026)".to_string();
        product.price_cents = 89_999;
        product.stock = 9_999;
        db.catalog().update_product(&product).await.unwrap();

        let stored = db.catalog().get_product(&product.id).await.unwrap().unwrap();
        assert_eq!(stored.name, "Laptop 15\" (2026)");
        assert_eq!(stored.price_cents, 89_999);
        assert_eq!(stored.stock, 10);
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_code_lookup() {
        let db = test_db().await;
        let product = sample_product("P001");
        db.catalog().insert_product(&product).await.unwrap();

        db.catalog().soft_delete_product(&product.id).await.unwrap();

        assert!(db
            .catalog()
            .get_product_by_code("P001")
            .await
            .unwrap()
            .is_none());
        assert_eq!(db.catalog().count_products().await.unwrap(), 0);

        // Still reachable by ID for history rendering
        let stored = db.catalog().get_product(&product.id).await.unwrap().unwrap();
        assert!(!stored.is_active);
    }

    #[tokio::test]
    async fn test_categories_roundtrip() {
        let db = test_db().await;
        let now = Utc::now();
        let category = Category {
            id: generate_category_id(),
            name: "Electronics".to_string(),
            description: Some("Electronic items and gadgets".to_string()),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.catalog().insert_category(&category).await.unwrap();

        let listed = db.catalog().list_categories().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Electronics");
    }
}
