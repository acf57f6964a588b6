pub mod api;
pub mod config;
pub mod logic;
pub mod model;
pub mod store;

use anyhow::Context;
use std::sync::Arc;
use tokio::net::TcpListener;

// Export API types
pub use api::handlers;
pub use api::routes;

pub use logic::{resolve, PatchError};

// Export all model types
pub use model::*;

// Export store types
pub use store::{
    DepartmentStore, EmployeeStore, MemoryStore, PassportStore, PostgresStore, Store, StoreError,
    StoreResult,
};

use crate::config::{AppConfig, StorageBackend};

/// Serve the employee API for `store` on an already bound listener.
pub async fn serve<S: Store + 'static>(
    store: Arc<S>,
    listener: TcpListener,
) -> anyhow::Result<()> {
    let app = crate::api::routes::create_router().with_state(store);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Load configuration, open the configured store and serve until shutdown.
pub async fn run_server() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    log::info!(
        "Configuration loaded: server={}, backend={:?}",
        config.server_address(),
        config.database.backend
    );

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;

    match config.database.backend {
        StorageBackend::Postgres => {
            log::info!("Connecting to PostgreSQL...");
            let database_url = config.database_url()?;
            let postgres_store = PostgresStore::new(&database_url, config.max_connections())
                .await
                .context("Failed to create PostgreSQL connection pool")?;

            if config.database.run_migrations {
                log::info!("Running database migrations...");
                postgres_store
                    .migrate()
                    .await
                    .context("Failed to run database migrations")?;
            }

            log::info!("Employees API running on http://{}", bind_address);
            serve(Arc::new(postgres_store), listener).await
        }
        StorageBackend::Memory => {
            log::warn!("Using in-memory storage; data is lost on shutdown");
            log::info!("Employees API running on http://{}", bind_address);
            serve(Arc::new(MemoryStore::new()), listener).await
        }
    }
}
