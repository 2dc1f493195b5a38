use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{error, info};

use sessioncart_rs::{
    create_app,
    handlers::{AppState, SessionSettings},
    init_observability,
    observability::{MeteredSessionStore, Metrics},
    repositories::{
        DynamoDbSessionStore, FlowerRepository, InMemoryFlowerRepository, InMemorySessionStore,
        SessionStore,
    },
    services::{CartService, CatalogService},
    shutdown_observability, Config, StoreBackend,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_environment()
        .await
        .context("failed to load configuration")?;

    init_observability(&config.observability).context("failed to initialize observability")?;

    info!(
        "Starting {} v{}",
        config.observability.service_name, config.observability.service_version
    );
    info!(
        backend = %config.session.store_backend,
        policy = %config.session.concurrency_policy,
        idle_timeout_seconds = config.session.idle_timeout_seconds,
        "Session configuration"
    );

    let metrics = Arc::new(Metrics::new()?);

    let backend: Arc<dyn SessionStore> = match config.session.store_backend {
        StoreBackend::Memory => Arc::new(InMemorySessionStore::new()),
        StoreBackend::Dynamodb => {
            let client = Arc::new(config.store.dynamodb_client().await);
            info!(
                "DynamoDB sessions table: {} ({})",
                config.store.sessions_table_name, config.store.region
            );
            Arc::new(DynamoDbSessionStore::new(
                client,
                config.store.sessions_table_name.clone(),
                config.store.region.clone(),
            ))
        }
    };
    let backend_label = match config.session.store_backend {
        StoreBackend::Memory => "memory",
        StoreBackend::Dynamodb => "dynamodb",
    };
    let store = Arc::new(MeteredSessionStore::new(
        backend,
        metrics.clone(),
        backend_label,
    ));

    let catalog: Arc<dyn FlowerRepository> = Arc::new(InMemoryFlowerRepository::seeded());

    let cart_service = CartService::new(
        store,
        config.session.concurrency_policy,
        config.session.idle_timeout(),
    )
    .with_catalog(catalog.clone())
    .with_metrics(metrics.clone());

    let state = AppState {
        cart_service: Arc::new(cart_service),
        catalog_service: Arc::new(CatalogService::new(catalog)),
        metrics,
    };

    let app = create_app(
        state,
        SessionSettings::new(
            config.session.cookie_name.clone(),
            config.session.idle_timeout(),
        ),
        config.server.request_timeout(),
    );

    let addr = SocketAddr::new(
        config
            .server
            .host
            .parse()
            .context("invalid server host")?,
        config.server.port,
    );
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Server listening on {}", addr);

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Shutdown signal received");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    shutdown_observability().await;
    info!("Server shutdown complete");
    Ok(())
}
