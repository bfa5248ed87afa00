//! Merging batch results back into the persisted task
//!
//! Stored links are matched to results by their original URL, never by
//! position: a retry may resubmit any subset of a task's links in any order.
//! The aggregate task status is recomputed over every stored link after the
//! merge, not just the ones in this batch.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::db::TaskStore;
use crate::error::Result;
use crate::types::{LinkResult, LinkStatus, Task, TaskLink, TaskStatus, TaskUpdate};

/// Overwrite a stored link with the fields carried by a new result
///
/// Status and logs always follow the latest run. The final link is only
/// replaced when the run produced one, so a failed retry keeps a previously
/// resolved link.
pub fn merge_link(stored: &mut TaskLink, result: &LinkResult) {
    stored.status = result.status;
    stored.logs = result.logs.clone();

    if let Some(final_link) = &result.final_link {
        stored.final_link = Some(final_link.clone());
    }

    stored.error = match result.status {
        LinkStatus::Done => None,
        _ => result.error.clone().or_else(|| stored.error.take()),
    };

    for (key, value) in &result.extra {
        if !is_blank(value) {
            stored.extra.insert(key.clone(), value.clone());
        }
    }
}

/// Apply results to the stored links, keyed by original URL
///
/// Links without a matching result are returned untouched. When two results
/// share an original URL, the lower id wins.
pub fn merge_results(links: &[TaskLink], results: &HashMap<i64, LinkResult>) -> Vec<TaskLink> {
    let mut ordered: Vec<&LinkResult> = results.values().collect();
    ordered.sort_by_key(|r| r.id);

    let mut by_link: HashMap<&str, &LinkResult> = HashMap::with_capacity(ordered.len());
    for result in ordered {
        by_link.entry(result.original_link.as_str()).or_insert(result);
    }

    links
        .iter()
        .map(|stored| {
            let mut merged = stored.clone();
            if let Some(result) = by_link.get(stored.link.as_str()) {
                merge_link(&mut merged, result);
            }
            merged
        })
        .collect()
}

/// Task status as a pure function of its link statuses
pub fn aggregate_status(links: &[TaskLink]) -> TaskStatus {
    if !links.iter().all(|l| l.status.is_resolved()) {
        return TaskStatus::Processing;
    }
    if links.iter().any(|l| l.status == LinkStatus::Done) {
        TaskStatus::Completed
    } else {
        TaskStatus::Failed
    }
}

/// Completion timestamp for the new status
///
/// Set when the task becomes terminal, kept if it already was, cleared while
/// processing.
pub fn completed_at(
    previous: &Task,
    status: TaskStatus,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match status {
        TaskStatus::Processing => None,
        _ if previous.status != TaskStatus::Processing => previous.completed_at.or(Some(now)),
        _ => Some(now),
    }
}

/// Build the update for a task from one batch's results
pub fn plan_update(task: &Task, results: &HashMap<i64, LinkResult>, now: DateTime<Utc>) -> TaskUpdate {
    let links = merge_results(&task.links, results);
    let status = aggregate_status(&links);
    TaskUpdate {
        completed_at: completed_at(task, status, now),
        status,
        links,
    }
}

/// Load the task, merge the results and write it back
///
/// A missing task is logged and skipped. Store errors are returned for the
/// caller to log; they never reach the progress stream.
pub async fn reconcile(
    store: &dyn TaskStore,
    task_id: &str,
    results: &HashMap<i64, LinkResult>,
) -> Result<Option<TaskUpdate>> {
    let Some(task) = store.get_task(task_id).await? else {
        tracing::error!(task_id = %task_id, "task not found, results not persisted");
        return Ok(None);
    };

    let update = plan_update(&task, results, Utc::now());
    let matched = task
        .links
        .iter()
        .filter(|l| results.values().any(|r| r.original_link == l.link))
        .count();

    store.update_task(task_id, update.clone()).await?;

    tracing::info!(
        task_id = %task_id,
        matched,
        results = results.len(),
        status = update.status.as_str(),
        "task reconciled"
    );
    Ok(Some(update))
}

fn is_blank(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::String(s) => s.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::types::{EventLevel, LogEntry};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Mutex;

    fn stored(link: &str, status: LinkStatus) -> TaskLink {
        TaskLink {
            name: format!("name of {link}"),
            link: link.to_string(),
            status,
            ..Default::default()
        }
    }

    fn result(id: i64, link: &str, status: LinkStatus, final_link: Option<&str>) -> LinkResult {
        LinkResult {
            id,
            name: String::new(),
            original_link: link.to_string(),
            final_link: final_link.map(String::from),
            status,
            error: (status == LinkStatus::Error).then(|| "unrecognized link".to_string()),
            logs: vec![LogEntry {
                message: format!("run {id}"),
                level: EventLevel::Info,
            }],
            extra: Default::default(),
        }
    }

    fn task(links: Vec<TaskLink>) -> Task {
        Task {
            id: "t1".into(),
            url: "https://source.example/movie".into(),
            status: TaskStatus::Processing,
            links,
            completed_at: None,
        }
    }

    fn batch(results: Vec<LinkResult>) -> HashMap<i64, LinkResult> {
        results.into_iter().map(|r| (r.id, r)).collect()
    }

    #[test]
    fn only_the_matching_link_changes() {
        let mut c = stored("https://c", LinkStatus::Pending);
        c.extra.insert("quality".into(), json!("1080p"));
        let links = vec![
            stored("https://a", LinkStatus::Done),
            stored("https://b", LinkStatus::Pending),
            c,
        ];
        // batch-local id 0 points at the second stored link
        let results = batch(vec![result(0, "https://b", LinkStatus::Done, Some("https://cdn/b"))]);

        let merged = merge_results(&links, &results);

        assert_eq!(merged[0], links[0]);
        assert_eq!(merged[2], links[2]);
        assert_eq!(merged[1].final_link.as_deref(), Some("https://cdn/b"));
        assert_eq!(merged[1].status, LinkStatus::Done);
        assert_eq!(merged[1].logs[0].message, "run 0");
    }

    #[test]
    fn failed_retry_keeps_the_resolved_link() {
        let mut done = stored("https://a", LinkStatus::Done);
        done.final_link = Some("https://cdn/a".into());

        let merged = merge_results(
            &[done],
            &batch(vec![result(3, "https://a", LinkStatus::Error, None)]),
        );

        assert_eq!(merged[0].final_link.as_deref(), Some("https://cdn/a"));
        assert_eq!(merged[0].status, LinkStatus::Error);
        assert_eq!(merged[0].error.as_deref(), Some("unrecognized link"));
    }

    #[test]
    fn success_clears_a_previous_error() {
        let mut failed = stored("https://a", LinkStatus::Error);
        failed.error = Some("timeout".into());

        let merged = merge_results(
            &[failed],
            &batch(vec![result(0, "https://a", LinkStatus::Done, Some("https://cdn/a"))]),
        );
        assert_eq!(merged[0].error, None);
    }

    #[test]
    fn extras_are_copied_only_when_present() {
        let mut existing = stored("https://a", LinkStatus::Done);
        existing
            .extra
            .insert("allAvailableButtons".into(), json!([{"button_name": "old", "download_link": "x"}]));

        let mut fresh = result(0, "https://a", LinkStatus::Done, Some("https://cdn/a"));
        fresh.extra.insert("bestButtonName".into(), json!("Download [FSL Server]"));
        fresh.extra.insert("allAvailableButtons".into(), json!([]));

        let merged = merge_results(&[existing], &batch(vec![fresh]));
        assert_eq!(merged[0].extra["bestButtonName"], json!("Download [FSL Server]"));
        assert_eq!(merged[0].extra["allAvailableButtons"][0]["button_name"], json!("old"));
    }

    #[test]
    fn duplicate_original_links_prefer_the_lowest_id() {
        let results = batch(vec![
            result(9, "https://a", LinkStatus::Error, None),
            result(2, "https://a", LinkStatus::Done, Some("https://cdn/a")),
        ]);
        let merged = merge_results(&[stored("https://a", LinkStatus::Pending)], &results);
        assert_eq!(merged[0].status, LinkStatus::Done);
    }

    #[test]
    fn status_aggregation() {
        use LinkStatus as S;
        let cases = [
            (vec![S::Done, S::Processing], TaskStatus::Processing),
            (vec![S::Done, S::Pending], TaskStatus::Processing),
            (vec![S::Done, S::Error], TaskStatus::Completed),
            (vec![S::Error, S::Error], TaskStatus::Failed),
            (vec![S::Done, S::Done], TaskStatus::Completed),
        ];
        for (statuses, expected) in cases {
            let links: Vec<_> = statuses.iter().map(|s| stored("https://x", *s)).collect();
            assert_eq!(aggregate_status(&links), expected, "{statuses:?}");
        }
    }

    #[test]
    fn completion_time_follows_status() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let earlier = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();

        let update = plan_update(
            &task(vec![stored("https://a", LinkStatus::Pending), stored("https://b", LinkStatus::Done)]),
            &batch(vec![result(0, "https://a", LinkStatus::Done, Some("https://cdn/a"))]),
            now,
        );
        assert_eq!(update.status, TaskStatus::Completed);
        assert_eq!(update.completed_at, Some(now));

        let mut finished = task(vec![stored("https://a", LinkStatus::Done)]);
        finished.status = TaskStatus::Completed;
        finished.completed_at = Some(earlier);
        assert_eq!(completed_at(&finished, TaskStatus::Completed, now), Some(earlier));
        assert_eq!(completed_at(&finished, TaskStatus::Processing, now), None);
    }

    #[derive(Default)]
    struct MemoryStore {
        task: Mutex<Option<Task>>,
        fail_writes: bool,
    }

    #[async_trait]
    impl TaskStore for MemoryStore {
        async fn get_task(&self, id: &str) -> Result<Option<Task>> {
            Ok(self.task.lock().unwrap().clone().filter(|t| t.id == id))
        }

        async fn update_task(&self, _id: &str, update: TaskUpdate) -> Result<()> {
            if self.fail_writes {
                return Err(Error::Other("store offline".into()));
            }
            let mut guard = self.task.lock().unwrap();
            let task = guard.as_mut().unwrap();
            task.status = update.status;
            task.links = update.links;
            task.completed_at = update.completed_at;
            Ok(())
        }
    }

    #[tokio::test]
    async fn reconcile_writes_the_merged_task() {
        let store = MemoryStore {
            task: Mutex::new(Some(task(vec![
                stored("https://a", LinkStatus::Pending),
                stored("https://b", LinkStatus::Pending),
            ]))),
            ..Default::default()
        };
        let results = batch(vec![
            result(0, "https://b", LinkStatus::Done, Some("https://cdn/b")),
            result(1, "https://a", LinkStatus::Error, None),
        ]);

        let update = reconcile(&store, "t1", &results).await.unwrap().unwrap();
        assert_eq!(update.status, TaskStatus::Completed);

        let saved = store.task.lock().unwrap().clone().unwrap();
        assert_eq!(saved.links[1].final_link.as_deref(), Some("https://cdn/b"));
        assert_eq!(saved.links[0].status, LinkStatus::Error);
        assert!(saved.completed_at.is_some());
    }

    #[tokio::test]
    async fn missing_task_is_skipped() {
        let store = MemoryStore::default();
        let outcome = reconcile(&store, "nope", &HashMap::new()).await.unwrap();
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn write_failure_is_returned_to_the_caller() {
        let store = MemoryStore {
            task: Mutex::new(Some(task(vec![stored("https://a", LinkStatus::Pending)]))),
            fail_writes: true,
        };
        let err = reconcile(&store, "t1", &HashMap::new()).await.unwrap_err();
        assert!(matches!(err, Error::Other(_)));
    }
}
