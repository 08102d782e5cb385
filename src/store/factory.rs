//! Backend selection and the process-wide store instance.
//!
//! # Responsibilities
//! - Pick a backend from the bound services: table first, then document,
//!   then memory
//! - Fall back to memory on any resolution failure
//! - Hold one store per process and start retention exactly once

use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::config::{RetentionConfig, StoreConfig};
use crate::lifecycle::Shutdown;
use crate::retention::RetentionTask;
use crate::store::bindings::{Credentials, ServiceBindings};
use crate::store::document::{DocumentEndpoint, DocumentStore};
use crate::store::memory::MemoryStore;
use crate::store::table::TableStore;
use crate::store::types::{StoreError, StoreResult};
use crate::store::Store;

static INSTANCE: OnceCell<Arc<dyn Store>> = OnceCell::const_new();

/// Builds the store chosen by the environment's service bindings.
#[derive(Debug, Clone)]
pub struct StoreFactory {
    config: StoreConfig,
    retention: RetentionConfig,
    bindings: ServiceBindings,
}

impl StoreFactory {
    /// Factory over explicit bindings.
    pub fn new(config: StoreConfig, retention: RetentionConfig, bindings: ServiceBindings) -> Self {
        Self {
            config,
            retention,
            bindings,
        }
    }

    /// Factory over the bindings published in `config.bindings_env`.
    /// Unreadable bindings are treated as none.
    pub fn from_env(config: StoreConfig, retention: RetentionConfig) -> Self {
        let bindings = ServiceBindings::from_env(&config.bindings_env).unwrap_or_else(|e| {
            tracing::warn!(
                variable = %config.bindings_env,
                error = %e,
                "Ignoring unreadable service bindings"
            );
            ServiceBindings::empty()
        });
        Self::new(config, retention, bindings)
    }

    pub fn bindings(&self) -> &ServiceBindings {
        &self.bindings
    }

    /// Construct the backend the bindings select. Never fails: any error is
    /// logged and answered with a memory store.
    pub async fn resolve(&self) -> Arc<dyn Store> {
        match self.try_resolve().await {
            Ok(store) => {
                tracing::info!(backend = store.backend(), "Store resolved");
                store
            }
            Err(e) => {
                tracing::error!(error = %e, "Store backend unavailable, falling back to memory");
                Arc::new(MemoryStore::new())
            }
        }
    }

    async fn try_resolve(&self) -> StoreResult<Arc<dyn Store>> {
        if let Some(creds) = self.bindings.get(&self.config.table_binding) {
            let uri = require_connection_string(&self.config.table_binding, creds)?;
            let store = TableStore::connect(
                uri,
                &self.config.table_database,
                &self.config.table_collection,
            )
            .await?;
            return Ok(Arc::new(store));
        }

        if let Some(creds) = self.bindings.get(&self.config.document_binding) {
            let url = require_connection_string(&self.config.document_binding, creds)?;
            let endpoint = DocumentEndpoint::parse(url)?
                .with_credentials(creds.username.clone(), creds.password.clone());
            let store = DocumentStore::connect(endpoint, &self.config.document_database).await?;
            return Ok(Arc::new(store));
        }

        tracing::info!("No storage service bound, using memory store");
        Ok(Arc::new(MemoryStore::new()))
    }

    fn retention_task(&self, store: Arc<dyn Store>) -> RetentionTask {
        RetentionTask::new(store, self.retention.clone())
    }
}

fn require_connection_string<'a>(name: &str, creds: &'a Credentials) -> StoreResult<&'a str> {
    creds
        .connection_string()
        .ok_or_else(|| StoreError::Config(format!("binding '{}' has no url or uri", name)))
}

/// The process-wide store. The first caller resolves it with `factory` and
/// spawns the retention task; later callers get the same instance and their
/// factory is ignored.
pub async fn instance(factory: &StoreFactory, shutdown: &Shutdown) -> Arc<dyn Store> {
    INSTANCE
        .get_or_init(|| async {
            let store = factory.resolve().await;
            let task = factory.retention_task(store.clone());
            tokio::spawn(task.run(shutdown.subscribe()));
            store
        })
        .await
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory(bindings: ServiceBindings) -> StoreFactory {
        StoreFactory::new(StoreConfig::default(), RetentionConfig::default(), bindings)
    }

    #[tokio::test]
    async fn test_no_bindings_gives_memory() {
        let store = factory(ServiceBindings::empty()).resolve().await;
        assert_eq!(store.backend(), "memory");
    }

    #[tokio::test]
    async fn test_unrelated_binding_gives_memory() {
        let bindings = ServiceBindings::empty().with("some-cache", Credentials::default());
        assert_eq!(factory(bindings).resolve().await.backend(), "memory");
    }

    #[tokio::test]
    async fn test_binding_without_url_falls_back() {
        let bindings = ServiceBindings::empty().with("todo-couch-db", Credentials::default());
        assert_eq!(factory(bindings).resolve().await.backend(), "memory");
    }

    #[tokio::test]
    async fn test_invalid_document_url_falls_back() {
        let creds = Credentials {
            url: Some("::::".into()),
            ..Default::default()
        };
        let bindings = ServiceBindings::empty().with("todo-couch-db", creds);
        assert_eq!(factory(bindings).resolve().await.backend(), "memory");
    }

    #[tokio::test]
    async fn test_invalid_table_uri_falls_back() {
        let creds = Credentials {
            uri: Some("not-a-mongo-uri".into()),
            ..Default::default()
        };
        let bindings = ServiceBindings::empty().with("todo-mongo-db", creds);
        assert_eq!(factory(bindings).resolve().await.backend(), "memory");
    }
}
