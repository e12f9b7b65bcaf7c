//! # Payment Repository
//!
//! The Payment Recorder: posts a payment against a sale and moves the
//! sale's `amount_paid` and the customer's `total_due` in the same
//! transaction.
//!
//! ```text
//! record_payment(sale_id, amount, recorder)
//!   validate amount > 0                      (before any store call)
//!   resolve recorder name                    (outside the transaction)
//!   with_retry {
//!     BEGIN
//!     read sale       → NotFound
//!     read customer   → NotFound
//!     amount ≤ outstanding (fresh read)      → Overpayment otherwise
//!     INSERT payment (date = now)
//!     sale.amount_paid     += amount
//!     customer.total_due   -= amount
//!     COMMIT
//!   }
//! ```
//! Two clerks paying the same sale at once both read, one commits, the
//! other's attempt conflicts and re-runs against the new `amount_paid`.

use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use glow_core::validation::{validate_payment_amount, validate_required};
use glow_core::{Money, Payment};

use crate::error::{DbError, DbResult};
use crate::repository::{customer, sale, LedgerContext};
use crate::retry::with_retry;

#[derive(Clone)]
pub struct PaymentRepository {
    ctx: LedgerContext,
}

impl PaymentRepository {
    pub(crate) fn new(ctx: LedgerContext) -> Self {
        PaymentRepository { ctx }
    }

    /// Records a payment against an existing sale.
    ///
    /// ## Returns
    /// * `Ok(payment_id)` - Payment, sale and customer all updated
    /// * `Err(DbError::Validation)` - amount ≤ 0
    /// * `Err(DbError::NotFound)` - Sale or its customer is missing
    /// * `Err(DbError::Domain(CoreError::Overpayment))` - amount exceeds what is owed
    /// * `Err(DbError::TransactionConflict)` - Retry budget spent
    pub async fn record_payment(
        &self,
        sale_id: &str,
        amount_cents: i64,
        recorded_by_id: &str,
    ) -> DbResult<String> {
        validate_payment_amount(amount_cents)?;
        validate_required("sale_id", sale_id)?;
        validate_required("recorded_by_id", recorded_by_id)?;

        let recorded_by_name = self.ctx.display_name(recorded_by_id).await?;

        let payment_id = with_retry(&self.ctx.retry, "record_payment", || {
            self.try_record_payment(sale_id, amount_cents, recorded_by_id, &recorded_by_name)
        })
        .await?;

        info!(
            payment_id = %payment_id,
            sale_id = %sale_id,
            amount_cents,
            recorded_by_id = %recorded_by_id,
            "Payment recorded"
        );

        Ok(payment_id)
    }

    async fn try_record_payment(
        &self,
        sale_id: &str,
        amount_cents: i64,
        recorded_by_id: &str,
        recorded_by_name: &str,
    ) -> DbResult<String> {
        let mut tx = self.ctx.pool.begin().await?;

        let sale = sale::fetch_sale(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;

        let customer = customer::fetch_customer(&mut *tx, &sale.customer_id)
            .await?
            .ok_or_else(|| DbError::not_found("Customer", &sale.customer_id))?;

        let new_amount_paid = sale.apply_payment(Money::from_cents(amount_cents))?;

        let payment = Payment {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            amount_cents,
            date: self.ctx.clock.now(),
            recorded_by_id: recorded_by_id.to_string(),
            recorded_by_name: recorded_by_name.to_string(),
        };
        insert_payment(&mut *tx, &payment).await?;

        sqlx::query("UPDATE sales SET amount_paid_cents = ?2 WHERE id = ?1")
            .bind(&sale.id)
            .bind(new_amount_paid.cents())
            .execute(&mut *tx)
            .await?;

        customer::adjust_total_due(&mut *tx, &customer.id, -amount_cents).await?;

        tx.commit().await?;
        Ok(payment.id)
    }

    /// Payments posted against a sale, newest first.
    pub async fn payments_for_sale(&self, sale_id: &str) -> DbResult<Vec<Payment>> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT id, sale_id, amount_cents, date, recorded_by_id, recorded_by_name
            FROM payments
            WHERE sale_id = ?1
            ORDER BY date DESC
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.ctx.pool)
        .await?;

        Ok(payments)
    }

    /// Σ payment amounts for a sale.
    pub async fn total_paid(&self, sale_id: &str) -> DbResult<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(amount_cents), 0) FROM payments WHERE sale_id = ?1")
                .bind(sale_id)
                .fetch_one(&self.ctx.pool)
                .await?;
        Ok(total)
    }
}

pub(crate) async fn insert_payment(conn: &mut SqliteConnection, payment: &Payment) -> DbResult<()> {
    debug!(sale_id = %payment.sale_id, amount_cents = payment.amount_cents, "Inserting payment");

    sqlx::query(
        r#"
        INSERT INTO payments (id, sale_id, amount_cents, date, recorded_by_id, recorded_by_name)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&payment.id)
    .bind(&payment.sale_id)
    .bind(payment.amount_cents)
    .bind(payment.date)
    .bind(&payment.recorded_by_id)
    .bind(&payment.recorded_by_name)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::services::FixedClock;
    use chrono::{NaiveDate, TimeZone, Utc};
    use glow_core::{CoreError, DraftLineItem, DraftSale, NewCustomer, NewProduct};
    use std::sync::Arc;

    async fn sale_with_outstanding(db: &Database) -> (String, String) {
        let customer = db
            .customers()
            .insert(&NewCustomer {
                name: "Bilal Store".to_string(),
                phone: String::new(),
                address: String::new(),
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
                cost_price_cents: 500,
                sale_price_cents: 1000,
                stock: Some(10),
                reorder_level: 0,
                expiry_date: None,
            })
            .await
            .unwrap();
        let sale_id = db
            .sales()
            .record_sale(
                &DraftSale {
                    customer_id: customer.id.clone(),
                    date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                    items: vec![DraftLineItem::new(&product.id, 5, 1000)],
                    discount_cents: 0,
                    amount_paid_cents: 3000,
                    photo_ref: None,
                },
                "U1",
            )
            .await
            .unwrap();
        (sale_id, customer.id)
    }

    #[tokio::test]
    async fn test_record_payment_settles_sale() {
        let at = Utc.with_ymd_and_hms(2025, 3, 2, 10, 0, 0).unwrap();
        let db = Database::new(DbConfig::in_memory())
            .await
            .unwrap()
            .with_clock(Arc::new(FixedClock(at)));
        let (sale_id, customer_id) = sale_with_outstanding(&db).await;

        db.payments().record_payment(&sale_id, 2000, "U2").await.unwrap();

        let sale = db.sales().get(&sale_id).await.unwrap().unwrap();
        assert_eq!(sale.amount_paid_cents, 5000);
        assert!(sale.is_settled());

        let customer = db.customers().get(&customer_id).await.unwrap().unwrap();
        assert_eq!(customer.total_due_cents, 0);

        let payments = db.payments().payments_for_sale(&sale_id).await.unwrap();
        assert_eq!(payments.len(), 2);
        assert_eq!(payments[0].date, at);
        assert_eq!(payments[0].recorded_by_name, "N/A");
        assert_eq!(db.payments().total_paid(&sale_id).await.unwrap(), 5000);
    }

    #[tokio::test]
    async fn test_overpayment_rejected_without_writes() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (sale_id, customer_id) = sale_with_outstanding(&db).await;

        let err = db.payments().record_payment(&sale_id, 2001, "U2").await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::Overpayment {
                outstanding: 2000,
                ..
            })
        ));

        assert_eq!(db.payments().total_paid(&sale_id).await.unwrap(), 3000);
        let customer = db.customers().get(&customer_id).await.unwrap().unwrap();
        assert_eq!(customer.total_due_cents, 2000);
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let (sale_id, _) = sale_with_outstanding(&db).await;

        for amount in [0, -500] {
            let err = db.payments().record_payment(&sale_id, amount, "U2").await.unwrap_err();
            assert!(matches!(err, DbError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn test_unknown_sale() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db.payments().record_payment("nope", 100, "U2").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { ref entity, .. } if entity == "Sale"));
    }
}
