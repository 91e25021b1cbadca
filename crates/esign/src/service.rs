//! Main e-signature service implementation

use anyhow::Result;
use std::sync::Arc;
use storage::ObjectStore;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServiceConfig;
use crate::database::Database;
use crate::http::{router, AppState};
use crate::storage::build_object_store;

/// Main e-signature service
pub struct EsignServiceRunner {
    config: ServiceConfig,
    db: Arc<Database>,
    store: Arc<dyn ObjectStore>,
}

impl EsignServiceRunner {
    /// Create a new service: connect the database, prepare the schema and the object store
    pub async fn new(config: ServiceConfig) -> Result<Self> {
        // Initialize database
        let db = Arc::new(Database::connect(&config.database_url, config.db_max_connections).await?);
        if config.auto_migrate {
            db.ensure_schema().await?;
        } else {
            info!("AUTO_MIGRATE disabled - expecting an existing schema");
        }

        // Initialize storage
        let store = build_object_store(&config).await?;

        Ok(Self { config, db, store })
    }

    /// Router with the service state attached
    pub fn app(&self) -> axum::Router {
        router(AppState::new(
            self.db.clone(),
            self.store.clone(),
            self.config.clone(),
        ))
    }

    /// Run the HTTP server
    pub async fn run(self) -> Result<()> {
        let addr = self.config.listen_addr;
        let app = self.app();

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;
        info!("Starting e-signature service on {}", addr);

        axum::serve(listener, app)
            .await
            .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

        Ok(())
    }

    /// Get a handle to the database
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Get a handle to the object store
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }
}
