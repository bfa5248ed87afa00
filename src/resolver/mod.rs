//! Batch orchestration
//!
//! The [`Resolver`] fans a batch out into one task per link, collects the
//! results over a channel and hands them to the reconciler. It is cheap to
//! clone; every field is shared.
//!
//! - [`batch`] - unit spawning, result collection and persistence
//! - [`lifecycle`] - graceful shutdown

mod batch;
mod lifecycle;


use crate::client::Fetcher;
use crate::config::Config;
use crate::db::TaskStore;
use crate::error::Result;
use crate::pipeline::DomainTable;

/// Main resolver instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct Resolver {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: std::sync::Arc<Config>,
    /// Shared HTTP client used by every stage solver
    pub(crate) fetcher: std::sync::Arc<Fetcher>,
    /// Host table driving stage dispatch
    pub(crate) table: std::sync::Arc<DomainTable>,
    /// Task store for reconciliation; batches without one are not persisted
    pub(crate) store: Option<std::sync::Arc<dyn TaskStore>>,
    /// Whether new batches are accepted (cleared during shutdown)
    pub(crate) accepting_new: std::sync::Arc<std::sync::atomic::AtomicBool>,
    /// Batches currently running, including their reconciliation
    pub(crate) active_batches: std::sync::Arc<std::sync::atomic::AtomicUsize>,
}

impl Resolver {
    /// Create a resolver from a validated configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let fetcher = Fetcher::new(config.resolver.clone())?;
        let table = DomainTable::from_config(&config.domains);

        tracing::info!(
            rules = table.rules().len(),
            timer_endpoint = %config.resolver.timer_endpoint,
            direct_endpoint = %config.resolver.direct_endpoint,
            "resolver initialized"
        );

        Ok(Self {
            config: std::sync::Arc::new(config),
            fetcher: std::sync::Arc::new(fetcher),
            table: std::sync::Arc::new(table),
            store: None,
            accepting_new: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true)),
            active_batches: std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0)),
        })
    }

    /// Persist batch results into the given store
    pub fn with_store(mut self, store: std::sync::Arc<dyn TaskStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Configuration the resolver was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Task store, if one is attached
    pub fn store(&self) -> Option<&std::sync::Arc<dyn TaskStore>> {
        self.store.as_ref()
    }

    /// Number of batches still running
    pub fn active_batches(&self) -> usize {
        self.active_batches
            .load(std::sync::atomic::Ordering::SeqCst)
    }
}
