//! Per-link resolution pipeline
//!
//! A link moves through `Start -> (Timer)* -> IntermediateA? -> IntermediateB?
//! -> Final`, but the next state is always chosen by matching the *current*
//! link against the [`DomainTable`], never by a fixed order. A link already at
//! the final host skips everything before the direct-link resolver.
//!
//! The pipeline reports through a [`LinkReporter`] and returns the terminal
//! outcome; emitting the terminal `done`/`error` event is left to the caller.

pub mod dispatch;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use dispatch::{DomainRule, DomainTable, Tier};

use crate::client::Fetcher;
use crate::error::{PipelineError, StageError};
use crate::solvers::{self, DirectLink};
use crate::stream::LinkReporter;
use crate::types::EventLevel;

/// A link resolved to its direct download URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved {
    /// The direct link with any button metadata
    pub direct: DirectLink,
    /// Message for the terminal `done` event
    pub message: String,
}

/// Run one link through the stages that apply to it
pub async fn resolve_link(
    fetcher: &Fetcher,
    table: &DomainTable,
    link: &str,
    reporter: &mut LinkReporter,
) -> Result<Resolved, PipelineError> {
    let mut current = link.trim().to_string();
    if current.is_empty() {
        reporter.log("No link URL provided for this item", EventLevel::Error);
        return Err(PipelineError::MissingLink);
    }

    let tier = table.classify(&current);
    tracing::debug!(link_id = reporter.id(), url = %current, ?tier, "classified link");

    match tier {
        Some(Tier::DirectCdn) => {
            reporter.log("HubCDN link detected", EventLevel::Info);
            return solve_direct_cdn(fetcher, &current, reporter).await;
        }
        Some(Tier::Final) => {
            reporter.log(
                "Final host detected, skipping intermediate stages",
                EventLevel::Info,
            );
        }
        Some(Tier::Timer) => reporter.log("Timer page detected", EventLevel::Warn),
        _ => reporter.log("Analyzing link...", EventLevel::Info),
    }

    let mut timer_error = None;
    if tier != Some(Tier::Final) {
        timer_error = bypass_timers(fetcher, table, &mut current, reporter).await;

        if table.matches(&current, Tier::IntermediateA) {
            reporter.log("Solving HBLinks...", EventLevel::Info);
            let hop = solvers::hblinks::extract_hblinks(fetcher, &current)
                .await
                .map_err(|e| stage_failed(reporter, "HBLinks", e))?;
            reporter.log(
                format!("HBLinks solved via {}", hop.source),
                EventLevel::Success,
            );
            current = hop.link;
        }

        if table.matches(&current, Tier::IntermediateB) {
            reporter.log("Solving HubDrive...", EventLevel::Info);
            let hop = solvers::hubdrive::extract_hubdrive(fetcher, &current)
                .await
                .map_err(|e| stage_failed(reporter, "HubDrive", e))?;
            reporter.log(
                format!("HubDrive solved via {}", hop.source),
                EventLevel::Success,
            );
            reporter.log(format!("Link after HubDrive: {}", hop.link), EventLevel::Info);
            current = hop.link;
        }
    }

    if table.matches(&current, Tier::Final) {
        reporter.log("Getting direct link (HubCloud)...", EventLevel::Info);
        let direct = solvers::hubcloud::resolve_direct(fetcher, &current)
            .await
            .map_err(|e| stage_failed(reporter, "HubCloud", e))?;
        let message = format!(
            "Completed via {}",
            direct.label.as_deref().unwrap_or("best button")
        );
        return Ok(Resolved { direct, message });
    }

    reporter.log("Unrecognized link format or stuck", EventLevel::Error);
    Err(match timer_error {
        Some(source) => PipelineError::Stage {
            stage: "Timer bypass",
            source,
        },
        None => PipelineError::UnrecognizedLink,
    })
}

async fn solve_direct_cdn(
    fetcher: &Fetcher,
    link: &str,
    reporter: &mut LinkReporter,
) -> Result<Resolved, PipelineError> {
    reporter.log("Solving HubCDN...", EventLevel::Info);
    let direct = solvers::hubcdn::solve_hubcdn(fetcher, link)
        .await
        .map_err(|e| stage_failed(reporter, "HubCDN", e))?;
    Ok(Resolved {
        direct,
        message: "Completed: direct link found".to_string(),
    })
}

/// Follow chained timer pages, at most `max_timer_hops` times
///
/// Stops as soon as the link reaches a downstream host. A link that is not a
/// timer page on entry is left alone; on later iterations any unknown page is
/// sent through the decoder as an intermediate hop. Returns the decoder error
/// that ended the loop, if any.
async fn bypass_timers(
    fetcher: &Fetcher,
    table: &DomainTable,
    current: &mut String,
    reporter: &mut LinkReporter,
) -> Option<StageError> {
    let max_hops = fetcher.config().max_timer_hops;
    let mut hops = 0;

    while hops < max_hops && !table.is_downstream(current) {
        if hops == 0 && !table.matches(current, Tier::Timer) {
            break;
        }
        if hops > 0 {
            reporter.log(
                format!("Bypassing intermediate page: {}", current),
                EventLevel::Warn,
            );
        }

        reporter.log("Calling timer decoder...", EventLevel::Warn);
        match solvers::timer::decode_timer(fetcher, current).await {
            Ok(hop) => {
                *current = hop.link;
                reporter.log("Timer bypassed", EventLevel::Success);
                reporter.log(format!("Link after timer: {}", current), EventLevel::Info);
            }
            Err(e) => {
                tracing::warn!(link_id = reporter.id(), stage = "timer", kind = e.kind(), error = %e, "timer bypass failed");
                reporter.log(format!("Timer error: {}", e), EventLevel::Error);
                return Some(e);
            }
        }

        hops += 1;
    }

    if hops == max_hops && !table.is_downstream(current) {
        tracing::warn!(link_id = reporter.id(), hops, url = %current, "timer hop limit reached");
    }
    None
}

fn stage_failed(reporter: &mut LinkReporter, stage: &'static str, source: StageError) -> PipelineError {
    tracing::warn!(link_id = reporter.id(), stage, kind = source.kind(), error = %source, "stage failed");
    reporter.log(format!("{} error: {}", stage, source), EventLevel::Error);
    PipelineError::Stage { stage, source }
}
