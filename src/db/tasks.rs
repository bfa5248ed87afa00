//! Task CRUD operations.

use crate::error::DatabaseError;
use crate::types::{Task, TaskStatus, TaskUpdate};
use crate::{Error, Result};

use super::{Database, NewTask, TaskRow};

impl Database {
    /// Insert a new task in `processing` state
    pub async fn insert_task(&self, task: &NewTask) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let links = serde_json::to_string(&task.links)?;

        sqlx::query(
            r#"
            INSERT INTO tasks (id, url, status, links, completed_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, NULL, ?, ?)
            "#,
        )
        .bind(&task.id)
        .bind(&task.url)
        .bind(TaskStatus::Processing.as_str())
        .bind(links)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to insert task: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Get a task by ID
    pub async fn fetch_task(&self, id: &str) -> Result<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, url, status, links, completed_at
            FROM tasks
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get task: {}",
                e
            )))
        })?;

        match row {
            Some(row) => Ok(Some(Task::try_from(row)?)),
            None => Ok(None),
        }
    }

    /// Rewrite a task's links, status and completion time
    ///
    /// Fails with [`Error::NotFound`] when no such task exists.
    pub async fn apply_update(&self, id: &str, update: &TaskUpdate) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let links = serde_json::to_string(&update.links)?;
        let completed_at = update.completed_at.map(|t| t.to_rfc3339());

        let result = sqlx::query(
            r#"
            UPDATE tasks
            SET status = ?, links = ?, completed_at = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.status.as_str())
        .bind(links)
        .bind(completed_at)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to update task: {}",
                e
            )))
        })?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// List tasks, most recently updated first
    pub async fn list_tasks(&self) -> Result<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT id, url, status, links, completed_at
            FROM tasks
            ORDER BY updated_at DESC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to list tasks: {}",
                e
            )))
        })?;

        rows.into_iter()
            .map(|row| Task::try_from(row).map_err(Error::from))
            .collect()
    }
}
