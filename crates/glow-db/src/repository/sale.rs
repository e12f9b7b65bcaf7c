//! # Sale Repository
//!
//! The Sale Transaction Manager: records a sale and every side effect it
//! has on the ledger in one atomic, retried transaction.
//!
//! ## record_sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       record_sale(draft, salesman)                      │
//! │                                                                         │
//! │  validate_draft_sale(draft)          ValidationError, no store call    │
//! │  resolve salesman name               outside the transaction           │
//! │       │                                                                 │
//! │       ▼  with_retry ───────────────────────────────────────────────┐   │
//! │  BEGIN                                                             │   │
//! │  ├── read customer                   missing → NotFound            │   │
//! │  ├── INSERT sale (+ name/phone snapshots) and sale_items           │   │
//! │  ├── per line: stock -= quantity     missing → NotFound            │   │
//! │  ├── pending = total - paid ≠ 0 → customer.total_due += pending    │   │
//! │  ├── paid > 0 → INSERT payment (date = sale date)                  │   │
//! │  COMMIT                              conflict → re-run from BEGIN ─┘   │
//! │                                                                         │
//! │  Either every row above is written or none is.                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::{FromRow, SqliteConnection};
use tracing::{debug, info};
use uuid::Uuid;

use glow_core::validation::{validate_draft_sale, validate_required};
use glow_core::{DraftSale, Payment, Sale, SaleLineItem};

use crate::error::{DbError, DbResult};
use crate::repository::{customer, payment, product, LedgerContext};
use crate::retry::with_retry;
use crate::services::PhotoStore;

/// A `sales` row without its line items.
#[derive(Debug, FromRow)]
struct SaleRow {
    id: String,
    date: NaiveDate,
    salesman_id: String,
    salesman_name: String,
    customer_id: String,
    customer_name: String,
    customer_phone: String,
    discount_cents: i64,
    total_cents: i64,
    amount_paid_cents: i64,
    photo_ref: Option<String>,
    created_at: DateTime<Utc>,
}

impl SaleRow {
    fn into_sale(self, items: Vec<SaleLineItem>) -> Sale {
        Sale {
            id: self.id,
            date: self.date,
            salesman_id: self.salesman_id,
            salesman_name: self.salesman_name,
            customer_id: self.customer_id,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            items,
            discount_cents: self.discount_cents,
            total_cents: self.total_cents,
            amount_paid_cents: self.amount_paid_cents,
            photo_ref: self.photo_ref,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SaleItemRow {
    sale_id: String,
    product_id: String,
    quantity: i64,
    unit_price_cents: i64,
}

const SALE_COLUMNS: &str = "id, date, salesman_id, salesman_name, customer_id, customer_name, \
     customer_phone, discount_cents, total_cents, amount_paid_cents, photo_ref, created_at";

/// Repository for sales.
#[derive(Clone)]
pub struct SaleRepository {
    ctx: LedgerContext,
}

impl SaleRepository {
    pub(crate) fn new(ctx: LedgerContext) -> Self {
        SaleRepository { ctx }
    }

    /// Records a sale and all of its ledger effects atomically.
    ///
    /// ## Returns
    /// * `Ok(sale_id)` - Everything committed
    /// * `Err(DbError::Validation)` - Malformed draft, nothing touched
    /// * `Err(DbError::NotFound)` - Customer or a product is missing, nothing written
    /// * `Err(DbError::TransactionConflict)` - Retry budget spent, nothing written
    pub async fn record_sale(&self, draft: &DraftSale, salesman_id: &str) -> DbResult<String> {
        validate_required("salesman_id", salesman_id)?;
        validate_draft_sale(draft)?;

        let salesman_name = self.ctx.display_name(salesman_id).await?;

        let sale_id = with_retry(&self.ctx.retry, "record_sale", || {
            self.try_record_sale(draft, salesman_id, &salesman_name)
        })
        .await?;

        info!(
            sale_id = %sale_id,
            customer_id = %draft.customer_id,
            salesman_id = %salesman_id,
            total_cents = draft.total().cents(),
            amount_paid_cents = draft.amount_paid_cents,
            items = draft.items.len(),
            "Sale recorded"
        );

        Ok(sale_id)
    }

    /// Uploads the shop photo first, then records the sale with its url.
    ///
    /// A failed upload aborts before the ledger is touched. A sale that
    /// fails after a successful upload leaves an orphaned photo.
    pub async fn record_sale_with_photo(
        &self,
        draft: &DraftSale,
        salesman_id: &str,
        photo: &[u8],
        photos: &dyn PhotoStore,
    ) -> DbResult<String> {
        validate_required("salesman_id", salesman_id)?;
        validate_draft_sale(draft)?;

        let path = format!("shop-images/{}/{}.jpg", draft.customer_id, Uuid::new_v4());
        let url = photos.upload_photo(photo, &path).await?;
        debug!(path = %path, "Shop photo uploaded");

        let mut draft = draft.clone();
        draft.photo_ref = Some(url);
        self.record_sale(&draft, salesman_id).await
    }

    async fn try_record_sale(
        &self,
        draft: &DraftSale,
        salesman_id: &str,
        salesman_name: &str,
    ) -> DbResult<String> {
        let mut tx = self.ctx.pool.begin().await?;

        let customer = customer::fetch_customer(&mut *tx, &draft.customer_id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", &draft.customer_id))?;

        let sale_id = Uuid::new_v4().to_string();
        let total = draft.total();

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, date, salesman_id, salesman_name,
                customer_id, customer_name, customer_phone,
                discount_cents, total_cents, amount_paid_cents,
                photo_ref, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&sale_id)
        .bind(draft.date)
        .bind(salesman_id)
        .bind(salesman_name)
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(draft.discount_cents)
        .bind(total.cents())
        .bind(draft.amount_paid_cents)
        .bind(&draft.photo_ref)
        .bind(self.ctx.clock.now())
        .execute(&mut *tx)
        .await?;

        for (position, item) in draft.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sale_items (sale_id, position, product_id, quantity, unit_price_cents)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&sale_id)
            .bind(position as i64)
            .bind(&item.product_id)
            .bind(item.quantity)
            .bind(item.unit_price_cents)
            .execute(&mut *tx)
            .await?;

            product::decrement_stock(&mut *tx, &item.product_id, item.quantity).await?;
        }

        let pending = draft.pending_amount();
        if !pending.is_zero() {
            customer::adjust_total_due(&mut *tx, &customer.id, pending.cents()).await?;
        }

        if draft.amount_paid().is_positive() {
            let initial_payment = Payment {
                id: Uuid::new_v4().to_string(),
                sale_id: sale_id.clone(),
                amount_cents: draft.amount_paid_cents,
                date: start_of_day(draft.date),
                recorded_by_id: salesman_id.to_string(),
                recorded_by_name: salesman_name.to_string(),
            };
            payment::insert_payment(&mut *tx, &initial_payment).await?;
        }

        tx.commit().await?;
        Ok(sale_id)
    }

    /// A sale with its line items in entry order.
    pub async fn get(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.ctx.pool.acquire().await?;
        fetch_sale(&mut conn, id).await
    }

    /// All sales, newest date first.
    pub async fn list(&self) -> DbResult<Vec<Sale>> {
        let mut conn = self.ctx.pool.acquire().await?;
        fetch_sales_where(&mut conn, None).await
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.ctx.pool)
            .await?;
        Ok(count)
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}

pub(crate) async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
    let Some(row) = sqlx::query_as::<_, SaleRow>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    let items = sqlx::query_as::<_, SaleLineItem>(
        "SELECT product_id, quantity, unit_price_cents FROM sale_items \
         WHERE sale_id = ?1 ORDER BY position",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(row.into_sale(items)))
}

/// Sales (optionally of one customer) sorted by date then creation time,
/// newest first.
pub(crate) async fn fetch_sales_where(
    conn: &mut SqliteConnection,
    customer_id: Option<&str>,
) -> DbResult<Vec<Sale>> {
    let sql = format!(
        "SELECT {SALE_COLUMNS} FROM sales WHERE (?1 IS NULL OR customer_id = ?1) \
         ORDER BY date DESC, created_at DESC"
    );
    let rows = sqlx::query_as::<_, SaleRow>(&sql)
        .bind(customer_id)
        .fetch_all(&mut *conn)
        .await?;

    let item_rows = sqlx::query_as::<_, SaleItemRow>(
        r#"
        SELECT si.sale_id, si.product_id, si.quantity, si.unit_price_cents
        FROM sale_items si
        JOIN sales s ON s.id = si.sale_id
        WHERE (?1 IS NULL OR s.customer_id = ?1)
        ORDER BY si.sale_id, si.position
        "#,
    )
    .bind(customer_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut items_by_sale: HashMap<String, Vec<SaleLineItem>> = HashMap::new();
    for row in item_rows {
        items_by_sale
            .entry(row.sale_id)
            .or_default()
            .push(SaleLineItem {
                product_id: row.product_id,
                quantity: row.quantity,
                unit_price_cents: row.unit_price_cents,
            });
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let items = items_by_sale.remove(&row.id).unwrap_or_default();
            row.into_sale(items)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use async_trait::async_trait;
    use glow_core::{DraftLineItem, NewCustomer, NewProduct};
    use std::sync::Mutex;

    struct Fixture {
        db: Database,
        customer_id: String,
        product_id: String,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = db
            .customers()
            .insert(&NewCustomer {
                name: "Bilal Store".to_string(),
                phone: "0300-1112223".to_string(),
                address: "Main Bazaar".to_string(),
                salesman_id: "U1".to_string(),
            })
            .await
            .unwrap();
        let product = db
            .products()
            .insert(&NewProduct {
                name: "Soap".to_string(),
                sku: "SOAP".to_string(),
                unit: "pcs".to_string(),
                cost_price_cents: 600,
                sale_price_cents: 1000,
                stock: Some(10),
                reorder_level: 2,
                expiry_date: None,
            })
            .await
            .unwrap();
        Fixture {
            db,
            customer_id: customer.id,
            product_id: product.id,
        }
    }

    fn draft(f: &Fixture, quantity: i64, paid: i64) -> DraftSale {
        DraftSale {
            customer_id: f.customer_id.clone(),
            date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            items: vec![DraftLineItem::new(&f.product_id, quantity, 1000)],
            discount_cents: 0,
            amount_paid_cents: paid,
            photo_ref: None,
        }
    }

    #[tokio::test]
    async fn test_record_sale_writes_all_effects() {
        let f = fixture().await;

        let sale_id = f.db.sales().record_sale(&draft(&f, 5, 3000), "U1").await.unwrap();

        let sale = f.db.sales().get(&sale_id).await.unwrap().unwrap();
        assert_eq!(sale.total_cents, 5000);
        assert_eq!(sale.amount_paid_cents, 3000);
        assert_eq!(sale.customer_name, "Bilal Store");
        assert_eq!(sale.customer_phone, "0300-1112223");
        assert_eq!(sale.salesman_name, "N/A");
        assert_eq!(sale.items.len(), 1);

        let product = f.db.products().get(&f.product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 5);

        let customer = f.db.customers().get(&f.customer_id).await.unwrap().unwrap();
        assert_eq!(customer.total_due_cents, 2000);

        let payments = f.db.payments().payments_for_sale(&sale_id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount_cents, 3000);
        assert_eq!(payments[0].recorded_by_id, "U1");
        assert_eq!(payments[0].date, start_of_day(sale.date));
    }

    #[tokio::test]
    async fn test_unpaid_sale_writes_no_payment() {
        let f = fixture().await;
        let sale_id = f.db.sales().record_sale(&draft(&f, 2, 0), "U1").await.unwrap();

        assert!(f.db.payments().payments_for_sale(&sale_id).await.unwrap().is_empty());
        let customer = f.db.customers().get(&f.customer_id).await.unwrap().unwrap();
        assert_eq!(customer.total_due_cents, 2000);
    }

    #[tokio::test]
    async fn test_missing_customer_writes_nothing() {
        let f = fixture().await;
        let mut d = draft(&f, 1, 0);
        d.customer_id = "nobody".to_string();

        let err = f.db.sales().record_sale(&d, "U1").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Customer"));
        assert_eq!(f.db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_missing_product_rolls_back_everything() {
        let f = fixture().await;
        let mut d = draft(&f, 3, 1000);
        d.items.push(DraftLineItem::new("ghost", 1, 500));

        let err = f.db.sales().record_sale(&d, "U1").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Product"));

        assert_eq!(f.db.sales().count().await.unwrap(), 0);
        let product = f.db.products().get(&f.product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 10);
        let customer = f.db.customers().get(&f.customer_id).await.unwrap().unwrap();
        assert_eq!(customer.total_due_cents, 0);
        let payments: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM payments")
            .fetch_one(f.db.pool())
            .await
            .unwrap();
        assert_eq!(payments, 0);
    }

    #[tokio::test]
    async fn test_invalid_draft_rejected_before_store() {
        let f = fixture().await;
        let mut d = draft(&f, 1, 0);
        d.items.clear();

        let err = f.db.sales().record_sale(&d, "U1").await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[tokio::test]
    async fn test_oversized_quantity_rejected_without_writes() {
        let f = fixture().await;
        let mut d = draft(&f, 1, 0);
        d.items[0].quantity = i64::MAX / 2;
        d.items[0].unit_price_cents = 3;

        let err = f.db.sales().record_sale(&d, "U1").await.unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));

        assert_eq!(f.db.sales().count().await.unwrap(), 0);
        let product = f.db.products().get(&f.product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 10);
    }

    #[tokio::test]
    async fn test_line_items_keep_entry_order() {
        let f = fixture().await;
        let mut d = draft(&f, 1, 0);
        d.items.push(DraftLineItem::new(&f.product_id, 2, 900));
        d.items.push(DraftLineItem::new(&f.product_id, 3, 800));

        let sale_id = f.db.sales().record_sale(&d, "U1").await.unwrap();
        let sale = f.db.sales().get(&sale_id).await.unwrap().unwrap();

        let quantities: Vec<i64> = sale.items.iter().map(|i| i.quantity).collect();
        assert_eq!(quantities, vec![1, 2, 3]);
        let product = f.db.products().get(&f.product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 4);
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let f = fixture().await;
        let mut older = draft(&f, 1, 0);
        older.date = NaiveDate::from_ymd_opt(2025, 2, 1).unwrap();
        let older_id = f.db.sales().record_sale(&older, "U1").await.unwrap();
        let newer_id = f.db.sales().record_sale(&draft(&f, 1, 0), "U1").await.unwrap();

        let ids: Vec<String> = f.db.sales().list().await.unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![newer_id.clone(), older_id.clone()]);

        let for_customer = f.db.customers().sales_for_customer(&f.customer_id).await.unwrap();
        assert_eq!(for_customer.len(), 2);
        assert_eq!(for_customer[0].id, newer_id);
        assert_eq!(for_customer[0].items.len(), 1);
    }

    #[derive(Default)]
    struct RecordingPhotos {
        paths: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PhotoStore for RecordingPhotos {
        async fn upload_photo(&self, _bytes: &[u8], path: &str) -> DbResult<String> {
            self.paths.lock().unwrap().push(path.to_string());
            Ok(format!("https://photos.test/{}", path))
        }
    }

    struct FailingPhotos;

    #[async_trait]
    impl PhotoStore for FailingPhotos {
        async fn upload_photo(&self, _bytes: &[u8], _path: &str) -> DbResult<String> {
            Err(DbError::Internal("upload failed".to_string()))
        }
    }

    #[tokio::test]
    async fn test_record_sale_with_photo() {
        let f = fixture().await;
        let photos = RecordingPhotos::default();

        let sale_id = f
            .db
            .sales()
            .record_sale_with_photo(&draft(&f, 1, 0), "U1", b"jpeg", &photos)
            .await
            .unwrap();

        let sale = f.db.sales().get(&sale_id).await.unwrap().unwrap();
        let path = photos.paths.lock().unwrap()[0].clone();
        assert_eq!(sale.photo_ref, Some(format!("https://photos.test/{}", path)));
    }

    #[tokio::test]
    async fn test_failed_upload_leaves_ledger_untouched() {
        let f = fixture().await;

        let result = f
            .db
            .sales()
            .record_sale_with_photo(&draft(&f, 1, 0), "U1", b"jpeg", &FailingPhotos)
            .await;

        assert!(result.is_err());
        assert_eq!(f.db.sales().count().await.unwrap(), 0);
    }
}
