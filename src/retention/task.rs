//! Periodic retention pass.
//!
//! # Responsibilities
//! - Every interval, read the item count
//! - At or above the ceiling, delete the first item `get_all` yields
//! - Log and skip on any store error; the next tick tries again

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::config::RetentionConfig;
use crate::observability::metrics;
use crate::store::{Store, StoreError};

/// Background job bounding the number of stored items.
pub struct RetentionTask {
    store: Arc<dyn Store>,
    config: RetentionConfig,
}

impl RetentionTask {
    pub fn new(store: Arc<dyn Store>, config: RetentionConfig) -> Self {
        Self { store, config }
    }

    /// Run ticks until `shutdown` fires. The first tick happens one interval
    /// after start.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Retention task disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            ceiling = self.config.ceiling,
            backend = self.store.backend(),
            "Retention task starting"
        );

        let period = Duration::from_secs(self.config.interval_secs);
        let mut ticker = time::interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        metrics::record_retention_failure(self.store.backend());
                        tracing::warn!(error = %e, "Retention tick failed, skipping until next interval");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Retention task received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// One retention pass. Returns the id of the evicted item, if any.
    ///
    /// The victim is whatever `get_all` happens to yield first, which differs
    /// between backends and between calls. Concurrent writers can move the
    /// count between the read and the delete, so the ceiling is approximate.
    pub async fn tick(&self) -> Result<Option<String>, StoreError> {
        let backend = self.store.backend();
        let count = self.store.count().await?;
        metrics::record_item_count(backend, count);

        if count < self.config.ceiling {
            tracing::debug!(count, ceiling = self.config.ceiling, "Below retention ceiling");
            return Ok(None);
        }

        let items = self.store.get_all().await?;
        let Some(id) = items.into_iter().find_map(|item| item.id) else {
            return Ok(None);
        };

        self.store.delete(&id).await?;
        metrics::record_eviction(backend);
        tracing::info!(id = %id, count, ceiling = self.config.ceiling, "Evicted item over retention ceiling");
        Ok(Some(id))
    }
}
