//! # Product Repository
//!
//! Catalog CRUD plus the stock primitive used by the sale transaction.
//!
//! ## Stock Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who May Write products.stock                         │
//! │                                                                         │
//! │  insert()          opening stock (default 0)                           │
//! │  update()          ✗ never touches stock                               │
//! │  decrement_stock() ✓ only inside record_sale's transaction             │
//! │                                                                         │
//! │  Delta update inside the open transaction:                             │
//! │     UPDATE products SET stock = stock - ?qty WHERE id = ?id            │
//! │  0 rows affected → the product is gone → NotFound aborts the sale.    │
//! │  No floor: stock may go negative.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use glow_core::validation::{validate_new_product, validate_non_negative_cents, validate_required, validate_sku};
use glow_core::{NewProduct, Product, ProductUpdate, ValidationError};

use crate::error::{DbError, DbResult};
use crate::services::Clock;

const PRODUCT_COLUMNS: &str = "id, name, sku, unit, cost_price_cents, sale_price_cents, \
     stock, reorder_level, expiry_date, created_at";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let product = db.products().insert(&new_product).await?;
/// let low = db.products().low_stock().await?;
/// ```
#[derive(Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    clock: Arc<dyn Clock>,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool, clock: Arc<dyn Clock>) -> Self {
        ProductRepository { pool, clock }
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The stored product (stock defaults to 0)
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn insert(&self, new: &NewProduct) -> DbResult<Product> {
        validate_new_product(new)?;

        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            sku: new.sku.trim().to_string(),
            unit: new.unit.trim().to_string(),
            cost_price_cents: new.cost_price_cents,
            sale_price_cents: new.sale_price_cents,
            stock: new.stock.unwrap_or(0),
            reorder_level: new.reorder_level,
            expiry_date: new.expiry_date,
            created_at: self.clock.now(),
        };

        debug!(sku = %product.sku, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, name, sku, unit, cost_price_cents, sale_price_cents,
                stock, reorder_level, expiry_date, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(&product.unit)
        .bind(product.cost_price_cents)
        .bind(product.sale_price_cents)
        .bind(product.stock)
        .bind(product.reorder_level)
        .bind(product.expiry_date)
        .bind(product.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: product.sku.clone(),
            },
            other => other,
        })?;

        Ok(product)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE sku = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    /// All products sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY name COLLATE NOCASE");
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    /// Products at or below their reorder level, lowest stock first.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE stock <= reorder_level ORDER BY stock, name"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Applies a product edit. Stock is not editable.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The product after the edit
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, id: &str, update: &ProductUpdate) -> DbResult<Product> {
        let mut product = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;

        if let Some(name) = &update.name {
            validate_required("name", name)?;
            product.name = name.trim().to_string();
        }
        if let Some(sku) = &update.sku {
            validate_sku(sku)?;
            product.sku = sku.trim().to_string();
        }
        if let Some(unit) = &update.unit {
            validate_required("unit", unit)?;
            product.unit = unit.trim().to_string();
        }
        if let Some(cost) = update.cost_price_cents {
            validate_non_negative_cents("cost_price", cost)?;
            product.cost_price_cents = cost;
        }
        if let Some(price) = update.sale_price_cents {
            validate_non_negative_cents("sale_price", price)?;
            product.sale_price_cents = price;
        }
        if let Some(level) = update.reorder_level {
            if level < 0 {
                return Err(ValidationError::MustNotBeNegative {
                    field: "reorder_level".to_string(),
                }
                .into());
            }
            product.reorder_level = level;
        }
        if update.expiry_date.is_some() {
            product.expiry_date = update.expiry_date;
        }

        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                sku = ?3,
                unit = ?4,
                cost_price_cents = ?5,
                sale_price_cents = ?6,
                reorder_level = ?7,
                expiry_date = ?8
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(&product.unit)
        .bind(product.cost_price_cents)
        .bind(product.sale_price_cents)
        .bind(product.reorder_level)
        .bind(product.expiry_date)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(product)
    }

    /// Hard delete. Past sales keep their line items.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }
        Ok(())
    }
}

/// Takes `quantity` units out of stock inside an open transaction.
pub(crate) async fn decrement_stock(
    conn: &mut SqliteConnection,
    product_id: &str,
    quantity: i64,
) -> DbResult<()> {
    debug!(product_id = %product_id, quantity, "Decrementing stock");

    let result = sqlx::query("UPDATE products SET stock = stock - ?2 WHERE id = ?1")
        .bind(product_id)
        .bind(quantity)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", product_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn soap() -> NewProduct {
        NewProduct {
            name: "Soap 100g".to_string(),
            sku: "SOAP-100".to_string(),
            unit: "pcs".to_string(),
            cost_price_cents: 700,
            sale_price_cents: 1000,
            stock: Some(10),
            reorder_level: 3,
            expiry_date: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let product = repo.insert(&soap()).await.unwrap();
        let fetched = repo.get(&product.id).await.unwrap().unwrap();

        assert_eq!(fetched, product);
        assert_eq!(fetched.stock, 10);
        assert_eq!(repo.count().await.unwrap(), 1);
        assert!(repo.get_by_sku("SOAP-100").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_opening_stock_defaults_to_zero() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut new = soap();
        new.stock = None;

        let product = db.products().insert(&new).await.unwrap();
        assert_eq!(product.stock, 0);
        assert!(product.needs_reorder());
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.products().insert(&soap()).await.unwrap();

        let err = db.products().insert(&soap()).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "SOAP-100"));
    }

    #[tokio::test]
    async fn test_update_never_touches_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        let product = repo.insert(&soap()).await.unwrap();

        let updated = repo
            .update(
                &product.id,
                &ProductUpdate {
                    sale_price_cents: Some(1200),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.sale_price_cents, 1200);
        assert_eq!(updated.stock, 10);
        assert_eq!(repo.get(&product.id).await.unwrap().unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_product() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();

        let err = repo
            .update("missing", &ProductUpdate::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(repo.delete("missing").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_low_stock() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        repo.insert(&soap()).await.unwrap();

        let mut low = soap();
        low.sku = "SHAMPOO-1".to_string();
        low.name = "Shampoo".to_string();
        low.stock = Some(2);
        let low = repo.insert(&low).await.unwrap();

        let flagged = repo.low_stock().await.unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(flagged[0].id, low.id);
    }

    #[tokio::test]
    async fn test_decrement_stock_goes_negative() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let product = db.products().insert(&soap()).await.unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        decrement_stock(&mut *tx, &product.id, 12).await.unwrap();
        let err = decrement_stock(&mut *tx, "missing", 1).await.unwrap_err();
        assert!(err.is_not_found());
        tx.commit().await.unwrap();

        let stock = db.products().get(&product.id).await.unwrap().unwrap().stock;
        assert_eq!(stock, -2);
    }
}
