//! Fan-out of a batch and collection of its results.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;

use futures::FutureExt;
use tokio::sync::mpsc;

use super::Resolver;
use crate::client::Fetcher;
use crate::error::{Error, PipelineError, Result};
use crate::pipeline::{self, DomainTable, Resolved};
use crate::reconcile;
use crate::stream::{EventEmitter, LinkReporter};
use crate::types::{LinkItem, LinkResult, LinkStatus, ResolutionEvent};

/// Decrements the active batch count when the batch ends, however it ends
struct ActiveBatch(std::sync::Arc<std::sync::atomic::AtomicUsize>);

impl Drop for ActiveBatch {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Resolver {
    /// Resolve every link concurrently and collect the results by id
    ///
    /// There is no concurrency cap: one task is spawned per item. A failing or
    /// panicking unit only affects its own result.
    pub async fn resolve_batch(
        &self,
        items: Vec<LinkItem>,
        emitter: EventEmitter,
    ) -> HashMap<i64, LinkResult> {
        let count = items.len();
        let (tx, mut rx) = mpsc::channel::<LinkResult>(count.max(1));

        for item in items {
            let tx = tx.clone();
            let fetcher = std::sync::Arc::clone(&self.fetcher);
            let table = std::sync::Arc::clone(&self.table);
            let emitter = emitter.clone();

            tokio::spawn(async move {
                let result = run_unit(&fetcher, &table, item, emitter).await;
                if tx.send(result).await.is_err() {
                    tracing::warn!("result collector dropped before unit finished");
                }
            });
        }
        drop(tx);

        let mut results = HashMap::with_capacity(count);
        while let Some(result) = rx.recv().await {
            results.insert(result.id, result);
        }

        if results.len() < count {
            tracing::warn!(
                expected = count,
                collected = results.len(),
                "some units produced no result"
            );
        }
        results
    }

    /// Resolve a batch, then reconcile the results into `task_id`
    ///
    /// Persistence is best-effort: store failures are logged, never returned.
    pub async fn run_batch(
        &self,
        items: Vec<LinkItem>,
        task_id: Option<String>,
        emitter: EventEmitter,
    ) -> HashMap<i64, LinkResult> {
        tracing::info!(links = items.len(), task_id = ?task_id, "starting batch");

        let results = self.resolve_batch(items, emitter.clone()).await;

        let done = results
            .values()
            .filter(|r| r.status == LinkStatus::Done)
            .count();
        tracing::info!(
            done,
            failed = results.len() - done,
            task_id = ?task_id,
            "batch finished"
        );

        match (task_id.as_deref(), self.store.as_deref()) {
            (Some(task_id), Some(store)) => {
                if let Err(e) = reconcile::reconcile(store, task_id, &results).await {
                    tracing::error!(task_id = %task_id, error = %e, "failed to persist batch results");
                }
            }
            (Some(task_id), None) => {
                tracing::debug!(task_id = %task_id, "no task store configured, skipping persistence");
            }
            _ => {}
        }

        // Last sender: the event stream ends only after persistence was attempted
        drop(emitter);
        results
    }

    /// Start a batch in the background and return its event stream
    ///
    /// The receiver yields events as they happen and closes once every unit
    /// has finished and persistence has been attempted. Dropping the receiver
    /// does not cancel the batch.
    pub fn start_batch(
        &self,
        items: Vec<LinkItem>,
        task_id: Option<String>,
    ) -> Result<mpsc::UnboundedReceiver<ResolutionEvent>> {
        if !self.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let (emitter, rx) = EventEmitter::channel();
        self.active_batches.fetch_add(1, Ordering::SeqCst);
        let guard = ActiveBatch(std::sync::Arc::clone(&self.active_batches));
        let resolver = self.clone();

        tokio::spawn(async move {
            let _guard = guard;
            resolver.run_batch(items, task_id, emitter).await;
        });

        Ok(rx)
    }
}

/// One link: run the pipeline, emit its terminal events, build its result
async fn run_unit(
    fetcher: &Fetcher,
    table: &DomainTable,
    item: LinkItem,
    emitter: EventEmitter,
) -> LinkResult {
    let mut reporter = LinkReporter::new(item.id, emitter);

    let outcome = guarded(pipeline::resolve_link(fetcher, table, &item.link, &mut reporter)).await;

    let mut result = LinkResult {
        id: item.id,
        name: item.name,
        original_link: item.link,
        final_link: None,
        status: LinkStatus::Error,
        error: None,
        logs: Vec::new(),
        extra: serde_json::Map::new(),
    };

    match outcome {
        Ok(Resolved { direct, message }) => {
            tracing::info!(link_id = result.id, final_link = %direct.link, "link resolved");
            reporter.done(message, &direct.link);

            if let Some(label) = direct.label.filter(|l| !l.is_empty()) {
                result
                    .extra
                    .insert("bestButtonName".to_string(), serde_json::Value::String(label));
            }
            if !direct.buttons.is_empty() {
                let buttons = direct
                    .buttons
                    .iter()
                    .map(|b| {
                        serde_json::json!({
                            "button_name": b.button_name,
                            "download_link": b.download_link,
                        })
                    })
                    .collect();
                result
                    .extra
                    .insert("allAvailableButtons".to_string(), serde_json::Value::Array(buttons));
            }

            result.status = LinkStatus::Done;
            result.final_link = Some(direct.link);
        }
        Err(e) => {
            if matches!(e, PipelineError::Panicked(_)) {
                tracing::error!(link_id = result.id, error = %e, "unit panicked");
            } else {
                tracing::warn!(link_id = result.id, error = %e, "link unresolved");
            }
            reporter.fail(e.to_string());
            result.error = Some(e.to_string());
        }
    }

    reporter.finished();
    result.logs = reporter.into_logs();
    result
}

/// Convert a panic inside the pipeline into a per-link error
async fn guarded<F>(pipeline: F) -> std::result::Result<Resolved, PipelineError>
where
    F: std::future::Future<Output = std::result::Result<Resolved, PipelineError>>,
{
    AssertUnwindSafe(pipeline)
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(PipelineError::Panicked(panic_message(panic.as_ref()))))
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unit of work panicked".to_string()
    }
}
