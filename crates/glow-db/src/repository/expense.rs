//! # Expense Repository

use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use glow_core::validation::validate_new_expense;
use glow_core::{Expense, NewExpense};

use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    pub async fn insert(&self, new: &NewExpense) -> DbResult<Expense> {
        validate_new_expense(new)?;

        let expense = Expense {
            id: Uuid::new_v4().to_string(),
            date: new.date,
            category: new.category,
            amount_cents: new.amount_cents,
            notes: new
                .notes
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
        };

        debug!(category = ?expense.category, amount_cents = expense.amount_cents, "Inserting expense");

        sqlx::query(
            "INSERT INTO expenses (id, date, category, amount_cents, notes) VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&expense.id)
        .bind(expense.date)
        .bind(expense.category)
        .bind(expense.amount_cents)
        .bind(&expense.notes)
        .execute(&self.pool)
        .await?;

        Ok(expense)
    }

    /// Newest first.
    pub async fn list(&self) -> DbResult<Vec<Expense>> {
        let expenses = sqlx::query_as::<_, Expense>(
            "SELECT id, date, category, amount_cents, notes FROM expenses ORDER BY date DESC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(expenses)
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Expense", id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;
    use glow_core::ExpenseCategory;

    fn expense(day: u32, category: ExpenseCategory, amount_cents: i64) -> NewExpense {
        NewExpense {
            date: NaiveDate::from_ymd_opt(2025, 3, day).unwrap(),
            category,
            amount_cents,
            notes: Some("  ".to_string()),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_newest_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.expenses();
        repo.insert(&expense(1, ExpenseCategory::Fuel, 5000)).await.unwrap();
        let rent = repo.insert(&expense(5, ExpenseCategory::Rent, 90000)).await.unwrap();

        let listed = repo.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], rent);
        assert!(listed[0].notes.is_none());
    }

    #[tokio::test]
    async fn test_rejects_zero_amount() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .expenses()
            .insert(&expense(1, ExpenseCategory::Food, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert!(db.expenses().delete("missing").await.unwrap_err().is_not_found());
    }
}
