//! # Customer Repository
//!
//! Customer records and the running balance primitive.
//!
//! ## Balance Identity
//! ```text
//! customer.total_due == Σ (sale.total - sale.amount_paid)   over the customer's sales
//!
//!   record_sale     total_due += total - amount_paid
//!   record_payment  total_due -= amount
//! ```
//! Both writes go through [`adjust_total_due`] inside the ledger transaction;
//! [`CustomerRepository::outstanding_from_sales`] recomputes the right-hand
//! side for audits.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use glow_core::validation::validate_new_customer;
use glow_core::{Customer, NewCustomer, Sale};

use crate::error::{DbError, DbResult};
use crate::repository::sale;

const CUSTOMER_COLUMNS: &str = "id, name, phone, address, salesman_id, total_due_cents";

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Creates a customer with nothing owed.
    pub async fn insert(&self, new: &NewCustomer) -> DbResult<Customer> {
        validate_new_customer(new)?;

        let customer = Customer {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            phone: new.phone.trim().to_string(),
            address: new.address.trim().to_string(),
            salesman_id: new.salesman_id.clone(),
            total_due_cents: 0,
        };

        debug!(name = %customer.name, salesman_id = %customer.salesman_id, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, phone, address, salesman_id, total_due_cents)
            VALUES (?1, ?2, ?3, ?4, ?5, 0)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.address)
        .bind(&customer.salesman_id)
        .execute(&self.pool)
        .await?;

        Ok(customer)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Customer>> {
        let mut conn = self.pool.acquire().await?;
        fetch_customer(&mut conn, id).await
    }

    /// Customers owned by a salesman, by name (case-insensitive).
    pub async fn list_by_salesman(&self, salesman_id: &str) -> DbResult<Vec<Customer>> {
        let sql = format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE salesman_id = ?1 \
             ORDER BY name COLLATE NOCASE"
        );
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .bind(salesman_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(customers)
    }

    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY name COLLATE NOCASE");
        let customers = sqlx::query_as::<_, Customer>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(customers)
    }

    /// Sales of one customer, newest first, with line items.
    pub async fn sales_for_customer(&self, customer_id: &str) -> DbResult<Vec<Sale>> {
        let mut conn = self.pool.acquire().await?;
        sale::fetch_sales_where(&mut conn, Some(customer_id)).await
    }

    /// Σ (total - amount_paid) over the customer's sales, straight from the
    /// sales table.
    pub async fn outstanding_from_sales(&self, customer_id: &str) -> DbResult<i64> {
        let outstanding: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(total_cents - amount_paid_cents), 0) FROM sales WHERE customer_id = ?1",
        )
        .bind(customer_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(outstanding)
    }
}

pub(crate) async fn fetch_customer(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<Customer>> {
    let sql = format!("SELECT {CUSTOMER_COLUMNS} FROM customers WHERE id = ?1");
    let customer = sqlx::query_as::<_, Customer>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(customer)
}

/// Adds `delta_cents` (negative for payments) to the customer's balance
/// inside an open transaction.
pub(crate) async fn adjust_total_due(
    conn: &mut SqliteConnection,
    customer_id: &str,
    delta_cents: i64,
) -> DbResult<()> {
    debug!(customer_id = %customer_id, delta_cents, "Adjusting customer balance");

    let result =
        sqlx::query("UPDATE customers SET total_due_cents = total_due_cents + ?2 WHERE id = ?1")
            .bind(customer_id)
            .bind(delta_cents)
            .execute(&mut *conn)
            .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Customer", customer_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn new_customer(name: &str, salesman_id: &str) -> NewCustomer {
        NewCustomer {
            name: name.to_string(),
            phone: "0300-1234567".to_string(),
            address: "Shop 4, Anarkali".to_string(),
            salesman_id: salesman_id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_starts_with_zero_due() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = db
            .customers()
            .insert(&new_customer("Bilal Store", "U1"))
            .await
            .unwrap();

        let fetched = db.customers().get(&customer.id).await.unwrap().unwrap();
        assert_eq!(fetched.total_due_cents, 0);
        assert_eq!(db.customers().outstanding_from_sales(&customer.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_list_by_salesman_sorted_case_insensitive() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.customers();
        repo.insert(&new_customer("zeta Mart", "U1")).await.unwrap();
        repo.insert(&new_customer("Alpha Traders", "U1")).await.unwrap();
        repo.insert(&new_customer("beta Kiryana", "U1")).await.unwrap();
        repo.insert(&new_customer("Other", "U2")).await.unwrap();

        let names: Vec<String> = repo
            .list_by_salesman("U1")
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["Alpha Traders", "beta Kiryana", "zeta Mart"]);
    }

    #[tokio::test]
    async fn test_adjust_total_due() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let customer = db
            .customers()
            .insert(&new_customer("Bilal Store", "U1"))
            .await
            .unwrap();

        let mut tx = db.pool().begin().await.unwrap();
        adjust_total_due(&mut *tx, &customer.id, 2500).await.unwrap();
        adjust_total_due(&mut *tx, &customer.id, -1000).await.unwrap();
        assert!(adjust_total_due(&mut *tx, "missing", 1)
            .await
            .unwrap_err()
            .is_not_found());
        tx.commit().await.unwrap();

        let due = db.customers().get(&customer.id).await.unwrap().unwrap().total_due_cents;
        assert_eq!(due, 1500);
    }

    #[tokio::test]
    async fn test_rejects_blank_name() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .customers()
            .insert(&new_customer("  ", "U1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }
}
