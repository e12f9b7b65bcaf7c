//! # Worker Task Repository
//!
//! Daily tasks for warehouse workers.
//!
//! ## Expiry
//! A task left `Pending` past 13:00 UTC on any later day is marked
//! `Expired`. Listing applies the rule and persists the new status:
//! ```text
//!   created 2025-03-01 16:00   listed 2025-03-02 12:59 → still Pending
//!                              listed 2025-03-02 13:00 → Expired (written back)
//! ```

use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use glow_core::validation::{validate_new_worker_task, validate_required};
use glow_core::{NewWorkerTask, WorkerTask, WorkerTaskStatus, WorkerTaskUpdate};

use crate::error::{DbError, DbResult};
use crate::repository::LedgerContext;

const TASK_COLUMNS: &str =
    "id, worker_id, worker_name, task_description, created_at, status, progress_notes";

#[derive(Clone)]
pub struct WorkerTaskRepository {
    ctx: LedgerContext,
}

impl WorkerTaskRepository {
    pub(crate) fn new(ctx: LedgerContext) -> Self {
        WorkerTaskRepository { ctx }
    }

    fn pool(&self) -> &SqlitePool {
        &self.ctx.pool
    }

    pub async fn insert(&self, new: &NewWorkerTask) -> DbResult<WorkerTask> {
        validate_new_worker_task(new)?;

        let task = WorkerTask {
            id: Uuid::new_v4().to_string(),
            worker_id: new.worker_id.clone(),
            worker_name: self.ctx.display_name(&new.worker_id).await?,
            task_description: new.task_description.trim().to_string(),
            created_at: self.ctx.clock.now(),
            status: WorkerTaskStatus::Pending,
            progress_notes: None,
        };

        debug!(worker_id = %task.worker_id, "Inserting worker task");

        sqlx::query(
            r#"
            INSERT INTO worker_tasks (
                id, worker_id, worker_name, task_description, created_at, status, progress_notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL)
            "#,
        )
        .bind(&task.id)
        .bind(&task.worker_id)
        .bind(&task.worker_name)
        .bind(&task.task_description)
        .bind(task.created_at)
        .bind(task.status)
        .execute(self.pool())
        .await?;

        Ok(task)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<WorkerTask>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM worker_tasks WHERE id = ?1");
        let task = sqlx::query_as::<_, WorkerTask>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?;
        Ok(task)
    }

    pub async fn update(&self, id: &str, update: &WorkerTaskUpdate) -> DbResult<WorkerTask> {
        let mut task = self
            .get(id)
            .await?
            .ok_or_else(|| DbError::not_found("WorkerTask", id))?;

        if let Some(description) = &update.task_description {
            validate_required("task_description", description)?;
            task.task_description = description.trim().to_string();
        }
        if let Some(status) = update.status {
            task.status = status;
        }
        if update.progress_notes.is_some() {
            task.progress_notes = update.progress_notes.clone();
        }

        sqlx::query(
            r#"
            UPDATE worker_tasks SET
                task_description = ?2,
                status = ?3,
                progress_notes = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&task.task_description)
        .bind(task.status)
        .bind(&task.progress_notes)
        .execute(self.pool())
        .await?;

        Ok(task)
    }

    /// All tasks, newest first, with stale pending tasks expired.
    pub async fn list(&self) -> DbResult<Vec<WorkerTask>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM worker_tasks ORDER BY created_at DESC");
        let tasks = sqlx::query_as::<_, WorkerTask>(&sql)
            .fetch_all(self.pool())
            .await?;
        self.expire_stale(tasks).await
    }

    pub async fn list_for_worker(&self, worker_id: &str) -> DbResult<Vec<WorkerTask>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM worker_tasks WHERE worker_id = ?1 ORDER BY created_at DESC"
        );
        let tasks = sqlx::query_as::<_, WorkerTask>(&sql)
            .bind(worker_id)
            .fetch_all(self.pool())
            .await?;
        self.expire_stale(tasks).await
    }

    async fn expire_stale(&self, mut tasks: Vec<WorkerTask>) -> DbResult<Vec<WorkerTask>> {
        let now = self.ctx.clock.now();
        let mut expired = 0;

        for task in tasks.iter_mut().filter(|t| t.should_expire(now)) {
            // Guarded on status so a task started in the meantime is left alone.
            let result = sqlx::query("UPDATE worker_tasks SET status = ?2 WHERE id = ?1 AND status = ?3")
                .bind(&task.id)
                .bind(WorkerTaskStatus::Expired)
                .bind(WorkerTaskStatus::Pending)
                .execute(self.pool())
                .await?;
            if result.rows_affected() > 0 {
                task.status = WorkerTaskStatus::Expired;
                expired += 1;
            }
        }

        if expired > 0 {
            info!(expired, "Expired stale worker tasks");
        }
        Ok(tasks)
    }
}
