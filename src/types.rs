//! Core types for link-resolver
//!
//! Wire and persistence shapes use camelCase field names so that the stream
//! and the stored task documents read the same way to consumers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Error, Result};

/// One link to be resolved, as submitted by the caller
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkItem {
    /// Caller-supplied identifier, echoed in every event (0 is a valid id)
    pub id: i64,
    /// Display name of the link
    pub name: String,
    /// The original, pre-resolution URL
    pub link: String,
}

/// Raw batch entry as it arrives over the wire
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ResolveRequestItem {
    /// Caller-supplied identifier; the batch index is used when absent
    #[serde(default)]
    pub id: Option<i64>,
    /// Display name
    #[serde(default)]
    pub name: Option<String>,
    /// URL to resolve; anything but a string fails only this item
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub link: Option<serde_json::Value>,
}

/// Batch submission body for `POST /resolve`
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolveRequest {
    /// Links to resolve (must be non-empty)
    #[serde(default)]
    pub links: Vec<ResolveRequestItem>,
    /// Task to reconcile results into once the batch finishes
    #[serde(default)]
    pub task_id: Option<String>,
}

impl ResolveRequest {
    /// Validate the request and normalize it into [`LinkItem`]s
    ///
    /// An empty batch is rejected. Items missing an id take their batch index;
    /// items missing a link are kept so that they fail individually.
    pub fn into_items(self) -> Result<Vec<LinkItem>> {
        if self.links.is_empty() {
            return Err(Error::InvalidRequest("no links provided".to_string()));
        }

        Ok(self
            .links
            .into_iter()
            .enumerate()
            .map(|(idx, item)| LinkItem {
                id: item.id.unwrap_or(idx as i64),
                name: item.name.unwrap_or_default(),
                link: match item.link {
                    Some(serde_json::Value::String(link)) => link,
                    _ => String::new(),
                },
            })
            .collect())
    }
}

/// Severity of a progress event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EventLevel {
    /// Informational progress
    Info,
    /// A stage completed successfully
    Success,
    /// Noteworthy but non-fatal (timer pages, intermediate hops)
    Warn,
    /// A failure
    Error,
}

/// Lifecycle marker carried by a progress event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    /// Work on the link is still in progress
    Processing,
    /// A direct link was found
    Done,
    /// The link could not be resolved
    Error,
    /// No further events will follow for this id
    Finished,
}

/// One unit of the progress stream
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResolutionEvent {
    /// The link id this event belongs to
    pub id: i64,
    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Severity
    pub level: EventLevel,
    /// The resolved direct link (terminal `done` events only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_link: Option<String>,
    /// Lifecycle marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<EventStatus>,
}

impl ResolutionEvent {
    /// Progress log line
    pub fn log(id: i64, message: impl Into<String>, level: EventLevel) -> Self {
        Self {
            id,
            message: Some(message.into()),
            level,
            final_link: None,
            status: Some(EventStatus::Processing),
        }
    }

    /// Terminal success carrying the direct link
    pub fn done(id: i64, message: impl Into<String>, final_link: impl Into<String>) -> Self {
        Self {
            id,
            message: Some(message.into()),
            level: EventLevel::Success,
            final_link: Some(final_link.into()),
            status: Some(EventStatus::Done),
        }
    }

    /// Terminal failure
    pub fn error(id: i64, message: impl Into<String>) -> Self {
        Self {
            id,
            message: Some(message.into()),
            level: EventLevel::Error,
            final_link: None,
            status: Some(EventStatus::Error),
        }
    }

    /// End-of-stream marker for one id
    pub fn finished(id: i64) -> Self {
        Self {
            id,
            message: None,
            level: EventLevel::Info,
            final_link: None,
            status: Some(EventStatus::Finished),
        }
    }

    /// Whether this is a `done` or `error` event
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, Some(EventStatus::Done | EventStatus::Error))
    }
}

/// A logged message kept with a link's result
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Message text
    pub message: String,
    /// Severity
    pub level: EventLevel,
}

/// Canonical per-link status
///
/// Stored documents may carry legacy spellings (`success`, `failed`, empty);
/// they are normalized here once, on ingest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "serde_json::Value")]
pub enum LinkStatus {
    /// Not yet attempted
    #[default]
    Pending,
    /// Being resolved
    Processing,
    /// Resolved to a direct link
    Done,
    /// Resolution failed
    Error,
}

impl LinkStatus {
    /// Whether the link has reached a final outcome
    pub fn is_resolved(&self) -> bool {
        matches!(self, LinkStatus::Done | LinkStatus::Error)
    }
}

impl From<&str> for LinkStatus {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "done" | "success" | "completed" => LinkStatus::Done,
            "error" | "failed" => LinkStatus::Error,
            "processing" => LinkStatus::Processing,
            _ => LinkStatus::Pending,
        }
    }
}

impl From<String> for LinkStatus {
    fn from(raw: String) -> Self {
        LinkStatus::from(raw.as_str())
    }
}

impl From<serde_json::Value> for LinkStatus {
    /// `null` and non-string values are treated like an empty status
    fn from(raw: serde_json::Value) -> Self {
        raw.as_str().map(LinkStatus::from).unwrap_or_default()
    }
}

/// Alternative download button reported by the direct-link delegate
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AltButton {
    /// Label shown on the button
    #[serde(default)]
    pub button_name: String,
    /// Link behind the button
    #[serde(default)]
    pub download_link: String,
}

/// Outcome of one pipeline run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResult {
    /// The link id from the batch
    pub id: i64,
    /// Display name from the batch
    pub name: String,
    /// The pre-resolution URL; reconciliation key
    pub original_link: String,
    /// Resolved direct link, if any
    pub final_link: Option<String>,
    /// Done or Error
    pub status: LinkStatus,
    /// Failure reason when status is Error
    pub error: Option<String>,
    /// Every message emitted for this link, in order
    pub logs: Vec<LogEntry>,
    /// Stage-specific extras (e.g. alternative buttons)
    #[serde(default)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Aggregate task status, derived from the link statuses
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// At least one link is unresolved
    #[default]
    Processing,
    /// Every link resolved and at least one succeeded
    Completed,
    /// Every link resolved and none succeeded
    Failed,
}

impl TaskStatus {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        }
    }

    /// Parse a stored status, treating unknown values as still processing
    pub fn parse(raw: &str) -> Self {
        match raw {
            "completed" => TaskStatus::Completed,
            "failed" => TaskStatus::Failed,
            _ => TaskStatus::Processing,
        }
    }
}

/// One link entry inside a persisted task
///
/// Fields the resolver does not know about are preserved in `extra`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskLink {
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Original URL
    #[serde(default)]
    pub link: String,
    /// Resolved direct link
    #[serde(default)]
    pub final_link: Option<String>,
    /// Canonical status
    #[serde(default)]
    pub status: LinkStatus,
    /// Failure reason
    #[serde(default)]
    pub error: Option<String>,
    /// Logs from the last run
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    /// Opaque per-link fields
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A persisted scraping task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Task identifier
    pub id: String,
    /// Source page URL
    pub url: String,
    /// Aggregate status
    pub status: TaskStatus,
    /// Link entries in stored order
    pub links: Vec<TaskLink>,
    /// When the task reached a terminal status
    pub completed_at: Option<DateTime<Utc>>,
}

/// The subset of a task the reconciler rewrites
#[derive(Clone, Debug, PartialEq)]
pub struct TaskUpdate {
    /// New aggregate status
    pub status: TaskStatus,
    /// Merged links
    pub links: Vec<TaskLink>,
    /// Completion timestamp, cleared when not terminal
    pub completed_at: Option<DateTime<Utc>>,
}
