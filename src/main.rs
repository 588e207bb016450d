use anyhow::Result;
use axum::Router;
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod handlers;
mod models;
mod routes;
mod services;
mod state;

use config::{AppConfig, Backend};
use services::{
    file_store::FileStore,
    local_storage::LocalStorage,
    order_service::OrderService,
    order_store::{
        OrderStore, json_file::JsonFileOrderStore, local_storage::LocalStorageOrderStore,
        sqlite::{self, SqliteOrderStore},
    },
};
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!("Starting print-intake with config: {:?}", cfg);

    // --- Handle migration mode ---
    if migrate {
        let pool = sqlite::connect(&cfg.database_url).await?;
        sqlite::run_migrations(&pool).await?;
        tracing::info!("Database migration complete.");
        return Ok(()); // exit after migration
    }

    // --- Ensure uploads directory exists ---
    if !Path::new(&cfg.uploads_dir).exists() {
        fs::create_dir_all(&cfg.uploads_dir)?;
        tracing::info!("Created uploads directory at {}", cfg.uploads_dir);
    }

    // --- Initialize core services ---
    let store = build_order_store(&cfg).await?;
    tracing::info!("Order backend: {}", store.backend_name());
    let orders = OrderService::new(store);
    let files = FileStore::new(cfg.uploads_dir.clone());

    // --- Build router ---
    let app: Router = routes::routes::app(AppState::new(orders, files));

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}

/// Construct the single order backend this deployment uses.
async fn build_order_store(cfg: &AppConfig) -> Result<Arc<dyn OrderStore>> {
    let store: Arc<dyn OrderStore> = match cfg.backend {
        Backend::JsonFile => {
            let store = JsonFileOrderStore::open(&cfg.data_dir).await?;
            tracing::info!("Orders file: {}", store.path().display());
            Arc::new(store)
        }
        Backend::LocalStorage => {
            let storage = LocalStorage::open(&cfg.local_storage_dir).await?;
            tracing::warn!(
                "Orders are kept in local storage at {}; they are visible only to this machine",
                storage.root().display()
            );
            Arc::new(LocalStorageOrderStore::new(storage))
        }
        Backend::Sqlite => {
            let pool = sqlite::connect(&cfg.database_url).await?;
            sqlite::run_migrations(&pool).await?;
            Arc::new(SqliteOrderStore::new(Arc::new(pool)))
        }
    };
    Ok(store)
}
