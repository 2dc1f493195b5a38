use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::net::TcpListener;

use sessioncart_rs::{
    create_app,
    handlers::{AppState, SessionSettings},
    models::ConcurrencyPolicy,
    observability::{MeteredSessionStore, Metrics},
    repositories::{FlowerRepository, InMemoryFlowerRepository, InMemorySessionStore},
    services::{CartService, CatalogService},
};

pub const COOKIE_NAME: &str = "sessioncart_id";

pub struct TestEnvironment {
    pub client: Client,
    pub base_url: String,
    pub store: Arc<InMemorySessionStore>,
}

impl TestEnvironment {
    /// Serve the full router over an in-memory store on an ephemeral port
    pub async fn new() -> Self {
        Self::with_policy(ConcurrencyPolicy::default()).await
    }

    pub async fn with_policy(policy: ConcurrencyPolicy) -> Self {
        let metrics = Arc::new(Metrics::new().expect("Failed to create metrics"));
        let store = Arc::new(InMemorySessionStore::new());
        let metered = Arc::new(MeteredSessionStore::new(
            store.clone(),
            metrics.clone(),
            "memory",
        ));
        let catalog: Arc<dyn FlowerRepository> = Arc::new(InMemoryFlowerRepository::seeded());

        let cart_service = CartService::new(metered, policy, Duration::from_secs(600))
            .with_catalog(catalog.clone())
            .with_metrics(metrics.clone());

        let state = AppState {
            cart_service: Arc::new(cart_service),
            catalog_service: Arc::new(CatalogService::new(catalog)),
            metrics,
        };

        let app = create_app(
            state,
            SessionSettings::new(COOKIE_NAME, Duration::from_secs(600)),
            Duration::from_secs(10),
        );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Failed to read local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        Self {
            client: new_client(),
            base_url: format!("http://{}", addr),
            store,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Client that keeps its own session cookie, like a browser
pub fn new_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to build HTTP client")
}
