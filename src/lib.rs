pub mod config;
pub mod handlers;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod services;

pub use config::{Config, ConfigError, StoreBackend};
pub use observability::{init_observability, shutdown_observability, Metrics};

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::{sync::Arc, time::Duration};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use handlers::{
    add_item, clear_cart, cors_middleware, get_cart, get_flower, health_check, list_flowers,
    metrics_handler, remove_item, request_validation_middleware, security_headers_middleware,
    session_middleware, AppState, SessionSettings,
};
use observability::observability_middleware;

/// Build the HTTP router. Cart routes run behind the session cookie middleware.
pub fn create_app(state: AppState, session: SessionSettings, request_timeout: Duration) -> Router {
    let metrics_for_middleware = state.metrics.clone();
    let session = Arc::new(session);

    let cart_routes = Router::new()
        .route("/cart", get(get_cart))
        .route("/cart/add", post(add_item))
        .route("/cart/remove", post(remove_item))
        .route("/cart/clear", post(clear_cart))
        .route_layer(middleware::from_fn(move |req, next| {
            session_middleware(session.clone(), req, next)
        }));

    Router::new()
        .route("/catalog", get(list_flowers))
        .route("/catalog/:id", get(get_flower))
        .route("/health/status", get(health_check))
        .route("/metrics", get(metrics_handler))
        .merge(cart_routes)
        .with_state(state)
        // Inner to outer; timeouts are recorded by the observability layer
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(cors_middleware))
        .layer(middleware::from_fn(request_validation_middleware))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
        .layer(TraceLayer::new_for_http())
}
