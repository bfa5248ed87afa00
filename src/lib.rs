//! # link-resolver
//!
//! Resolves indirect, multi-hop download links into direct URLs.
//!
//! Each link in a batch runs through a pipeline of host-specific bypass
//! stages (timer pages, intermediate link hosts, a direct-link delegate).
//! All links run concurrently and report progress as a stream of
//! [`ResolutionEvent`]s; once the batch ends, the results are merged into a
//! persisted task record.
//!
//! ## Quick Start
//!
//! ```no_run
//! use link_resolver::{Config, LinkItem, Resolver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = Resolver::new(Config::default())?;
//!
//!     let mut events = resolver.start_batch(
//!         vec![LinkItem {
//!             id: 0,
//!             name: "1080p".to_string(),
//!             link: "https://hblinks.example/archives/1".to_string(),
//!         }],
//!         None,
//!     )?;
//!
//!     while let Some(event) = events.recv().await {
//!         println!("{:?}", event);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// REST API module
pub mod api;
/// Shared HTTP client and request profiles
pub mod client;
/// Configuration types
pub mod config;
/// SQLite task store
pub mod db;
/// Error types
pub mod error;
/// Per-link stage pipeline and domain dispatch
pub mod pipeline;
/// Merging batch results into stored tasks
pub mod reconcile;
/// Batch orchestration and lifecycle
pub mod resolver;
/// Host-specific bypass stages
pub mod solvers;
/// Progress event channel and NDJSON encoding
pub mod stream;
/// Core types
pub mod types;

// Re-export commonly used types
pub use config::Config;
pub use db::{Database, TaskStore};
pub use error::{Error, PipelineError, Result, StageError};
pub use resolver::Resolver;
pub use types::{
    EventLevel, EventStatus, LinkItem, LinkResult, LinkStatus, ResolutionEvent, ResolveRequest,
    Task, TaskStatus,
};

/// Serve the API until a termination signal, then shut the resolver down.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// The resolver stops accepting batches as soon as the signal arrives, so
/// requests still served during the drain get 503 and health reports
/// `shutting_down`. Running batches then get the resolver's shutdown grace
/// period.
///
/// # Example
///
/// ```no_run
/// use link_resolver::{Config, Resolver, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let resolver = Resolver::new(Config::default())?;
///     run_with_shutdown(resolver).await?;
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(resolver: Resolver) -> Result<()> {
    let bind_address = resolver.config().server.api.bind_address;
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .map_err(Error::Io)?;

    api::serve(
        listener,
        resolver.clone(),
        stop_accepting_after(resolver.clone(), wait_for_signal()),
    )
    .await?;
    resolver.shutdown().await;
    Ok(())
}

/// Wait for `signal`, then refuse new batches before the server drains
async fn stop_accepting_after<F>(resolver: Resolver, signal: F)
where
    F: std::future::Future<Output = ()>,
{
    signal.await;
    resolver.stop_accepting();
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
