use crate::config::ServerConfig;
use crate::operations::{self, Operation, OperationResponse};
use crate::store::Store;
use crate::validation::OperationSchemas;
use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::info;

/// Shared state behind every request: configuration, the record store and
/// the published input schemas.
pub struct AppState {
    config: Arc<ServerConfig>,
    store: Store,
    schemas: OperationSchemas,
}

impl AppState {
    /// Opens the store named by `config.data_file`, or an in-memory one.
    pub fn new(config: Arc<ServerConfig>) -> Result<Self> {
        let store = match config.data_file() {
            Some(path) => Store::open(path)
                .with_context(|| format!("failed to open data file {}", path.display()))?,
            None => {
                info!("no data file configured, records are kept in memory only");
                Store::in_memory()
            }
        };

        Ok(Self::with_store(config, store))
    }

    /// State over an empty in-memory store, ignoring `config.data_file`.
    pub fn in_memory(config: ServerConfig) -> Self {
        Self::with_store(Arc::new(config), Store::in_memory())
    }

    fn with_store(config: Arc<ServerConfig>, store: Store) -> Self {
        Self {
            config,
            store,
            schemas: OperationSchemas::for_entities(),
        }
    }

    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.clone()
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn schemas(&self) -> &OperationSchemas {
        &self.schemas
    }

    /// Runs one operation with the configured page size cap.
    pub fn respond(
        &self,
        operation: Operation,
        arguments: &Map<String, Value>,
    ) -> OperationResponse {
        operations::respond(
            &self.store,
            operation,
            arguments,
            self.config.max_page_size,
        )
    }
}
