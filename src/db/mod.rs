//! Database layer for link-resolver
//!
//! Persists scraping tasks in SQLite. A task's links are stored as one JSON
//! document so that per-link fields owned by other components survive a
//! read-modify-write by the reconciler.
//!
//! ## Submodules
//!
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`tasks`] - Task CRUD and the [`TaskStore`] implementation

use crate::error::{DatabaseError, Result};
use crate::types::{Task, TaskLink, TaskStatus, TaskUpdate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

mod migrations;
mod tasks;

/// Document store holding tasks
///
/// Both operations are fallible and non-transactional: a read followed by a
/// write is not atomic, and concurrent writers race with last-write-wins.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Load a task by id
    async fn get_task(&self, id: &str) -> Result<Option<Task>>;

    /// Overwrite a task's links, status and completion time
    async fn update_task(&self, id: &str, update: TaskUpdate) -> Result<()>;
}

/// New task to be inserted into the database
#[derive(Debug, Clone)]
pub struct NewTask {
    /// Caller-chosen task id
    pub id: String,
    /// Source page URL
    pub url: String,
    /// Links found on the source page
    pub links: Vec<TaskLink>,
}

/// Task record from database
#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    /// Task id
    pub id: String,
    /// Source page URL
    pub url: String,
    /// Aggregate status (lowercase name)
    pub status: String,
    /// Links as a JSON array
    pub links: String,
    /// RFC 3339 completion time
    pub completed_at: Option<String>,
}

impl TryFrom<TaskRow> for Task {
    type Error = DatabaseError;

    fn try_from(row: TaskRow) -> std::result::Result<Self, Self::Error> {
        let links: Vec<TaskLink> =
            serde_json::from_str(&row.links).map_err(|e| DatabaseError::Corrupt {
                id: row.id.clone(),
                reason: format!("links: {}", e),
            })?;

        let completed_at = row
            .completed_at
            .as_deref()
            .map(DateTime::parse_from_rfc3339)
            .transpose()
            .map_err(|e| DatabaseError::Corrupt {
                id: row.id.clone(),
                reason: format!("completed_at: {}", e),
            })?
            .map(|t| t.with_timezone(&Utc));

        Ok(Task {
            status: TaskStatus::parse(&row.status),
            id: row.id,
            url: row.url,
            links,
            completed_at,
        })
    }
}

/// Database handle for link-resolver
pub struct Database {
    pool: SqlitePool,
}

#[async_trait]
impl TaskStore for Database {
    async fn get_task(&self, id: &str) -> Result<Option<Task>> {
        self.fetch_task(id).await
    }

    async fn update_task(&self, id: &str, update: TaskUpdate) -> Result<()> {
        self.apply_update(id, &update).await
    }
}
