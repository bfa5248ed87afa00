//! Shutdown coordination.

use std::sync::atomic::Ordering;

use super::Resolver;

impl Resolver {
    /// Stop accepting batches and wait for running ones to finish
    ///
    /// Running batches are given up to 30 seconds so that their results reach
    /// the task store.
    pub async fn shutdown(&self) {
        tracing::info!("Initiating graceful shutdown");
        self.stop_accepting();

        let shutdown_timeout = std::time::Duration::from_secs(30);
        match tokio::time::timeout(shutdown_timeout, self.wait_for_active_batches()).await {
            Ok(()) => tracing::info!("All running batches completed"),
            Err(_) => tracing::warn!(
                active = self.active_batches(),
                "Timeout waiting for batches to complete, proceeding with shutdown"
            ),
        }
    }

    /// Refuse new batches from now on; running ones are unaffected
    pub fn stop_accepting(&self) {
        if self.accepting_new.swap(false, Ordering::SeqCst) {
            tracing::info!(active = self.active_batches(), "no longer accepting batches");
        }
    }

    /// Whether new batches are still accepted
    pub fn is_accepting(&self) -> bool {
        self.accepting_new.load(Ordering::SeqCst)
    }

    async fn wait_for_active_batches(&self) {
        loop {
            let active = self.active_batches();
            if active == 0 {
                return;
            }
            tracing::debug!(active, "Waiting for running batches to complete");
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}
