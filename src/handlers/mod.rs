pub mod cart;
pub mod catalog;
pub mod health;
pub mod metrics;
pub mod middleware;
pub mod session;

pub use cart::*;
pub use catalog::*;
pub use health::*;
pub use metrics::*;
pub use middleware::*;
pub use session::*;

use std::sync::Arc;

use crate::observability::Metrics;
use crate::services::{CartService, CatalogService};

/// Shared application state containing all services
#[derive(Clone)]
pub struct AppState {
    pub cart_service: Arc<CartService>,
    pub catalog_service: Arc<CatalogService>,
    pub metrics: Arc<Metrics>,
}
