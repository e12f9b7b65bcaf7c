//! # Assignment Repository
//!
//! The Assignment Rotator. A salesman has at most one `Pending` plan;
//! assigning a new one retires every earlier pending plan to `Visited` in
//! the same transaction.
//!
//! ```text
//!   before                          assign(U1, "Saddar")            after
//!   ┌──────────────────────┐                                ┌──────────────────────┐
//!   │ A1 U1 Anarkali  pend │  ── BEGIN                      │ A1 U1 Anarkali  vis  │
//!   │ A2 U2 Gulberg   pend │     flip U1's pending → visited│ A2 U2 Gulberg   pend │
//!   └──────────────────────┘     INSERT A3 pending          │ A3 U1 Saddar    pend │
//!                                COMMIT ──                  └──────────────────────┘
//! ```
//!
//! The partial unique index `idx_assignments_one_pending` backs the rule in
//! the schema: two concurrent rotations cannot both leave a pending row.

use sqlx::SqliteConnection;
use tracing::{debug, info};
use uuid::Uuid;

use glow_core::validation::{validate_new_assignment, validate_required};
use glow_core::{Assignment, AssignmentStatus, AssignmentUpdate, NewAssignment};

use crate::error::{DbError, DbResult};
use crate::repository::LedgerContext;
use crate::retry::with_retry;

const ASSIGNMENT_COLUMNS: &str = "id, salesman_id, salesman_name, location, items_to_take, \
     status, created_at, assigned_by_id, assigned_by_name, progress_notes";

#[derive(Clone)]
pub struct AssignmentRepository {
    ctx: LedgerContext,
}

impl AssignmentRepository {
    pub(crate) fn new(ctx: LedgerContext) -> Self {
        AssignmentRepository { ctx }
    }

    /// Gives a salesman a new pending plan, retiring the previous one.
    pub async fn assign(&self, new: &NewAssignment) -> DbResult<String> {
        validate_new_assignment(new)?;

        let salesman_name = self.ctx.display_name(&new.salesman_id).await?;
        let assigned_by_name = self.ctx.display_name(&new.assigned_by_id).await?;

        let (assignment_id, retired) = with_retry(&self.ctx.retry, "assign", || {
            self.try_assign(new, &salesman_name, &assigned_by_name)
        })
        .await?;

        info!(
            assignment_id = %assignment_id,
            salesman_id = %new.salesman_id,
            retired,
            "Assignment created"
        );

        Ok(assignment_id)
    }

    async fn try_assign(
        &self,
        new: &NewAssignment,
        salesman_name: &str,
        assigned_by_name: &str,
    ) -> DbResult<(String, usize)> {
        let mut tx = self.ctx.pool.begin().await?;

        let pending: Vec<String> =
            sqlx::query_scalar("SELECT id FROM assignments WHERE salesman_id = ?1 AND status = ?2")
                .bind(&new.salesman_id)
                .bind(AssignmentStatus::Pending)
                .fetch_all(&mut *tx)
                .await?;

        for id in &pending {
            set_status(&mut *tx, id, AssignmentStatus::Visited).await?;
        }

        let assignment_id = Uuid::new_v4().to_string();
        sqlx::query(
            r#"
            INSERT INTO assignments (
                id, salesman_id, salesman_name, location, items_to_take,
                status, created_at, assigned_by_id, assigned_by_name, progress_notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, NULL)
            "#,
        )
        .bind(&assignment_id)
        .bind(&new.salesman_id)
        .bind(salesman_name)
        .bind(new.location.trim())
        .bind(&new.items_to_take)
        .bind(AssignmentStatus::Pending)
        .bind(self.ctx.clock.now())
        .bind(&new.assigned_by_id)
        .bind(assigned_by_name)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((assignment_id, pending.len()))
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Assignment>> {
        let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = ?1");
        let assignment = sqlx::query_as::<_, Assignment>(&sql)
            .bind(id)
            .fetch_optional(&self.ctx.pool)
            .await?;
        Ok(assignment)
    }

    /// All assignments, newest first.
    pub async fn list(&self) -> DbResult<Vec<Assignment>> {
        let sql = format!("SELECT {ASSIGNMENT_COLUMNS} FROM assignments ORDER BY created_at DESC");
        let assignments = sqlx::query_as::<_, Assignment>(&sql)
            .fetch_all(&self.ctx.pool)
            .await?;
        Ok(assignments)
    }

    /// The salesman's current pending plan, if any.
    pub async fn pending_for(&self, salesman_id: &str) -> DbResult<Option<Assignment>> {
        let sql = format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE salesman_id = ?1 AND status = ?2"
        );
        let assignment = sqlx::query_as::<_, Assignment>(&sql)
            .bind(salesman_id)
            .bind(AssignmentStatus::Pending)
            .fetch_optional(&self.ctx.pool)
            .await?;
        Ok(assignment)
    }

    /// Edits location, items, notes or status.
    ///
    /// Re-opening a plan while the salesman already has another pending one
    /// fails with `UniqueViolation`.
    pub async fn update(&self, id: &str, update: &AssignmentUpdate) -> DbResult<Assignment> {
        let mut assignment = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("Assignment", id))?;

        if let Some(location) = &update.location {
            validate_required("location", location)?;
            assignment.location = location.trim().to_string();
        }
        if update.items_to_take.is_some() {
            assignment.items_to_take = update.items_to_take.clone();
        }
        if update.progress_notes.is_some() {
            assignment.progress_notes = update.progress_notes.clone();
        }
        if let Some(status) = update.status {
            assignment.status = status;
        }

        debug!(id = %id, status = ?assignment.status, "Updating assignment");

        let result = sqlx::query(
            r#"
            UPDATE assignments SET
                location = ?2,
                items_to_take = ?3,
                progress_notes = ?4,
                status = ?5
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&assignment.location)
        .bind(&assignment.items_to_take)
        .bind(&assignment.progress_notes)
        .bind(assignment.status)
        .execute(&self.ctx.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Assignment", id));
        }

        Ok(assignment)
    }
}

async fn set_status(
    conn: &mut SqliteConnection,
    id: &str,
    status: AssignmentStatus,
) -> DbResult<()> {
    sqlx::query("UPDATE assignments SET status = ?2 WHERE id = ?1")
        .bind(id)
        .bind(status)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
