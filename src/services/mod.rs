// Services module - business logic layer

pub mod cart_service;
pub mod catalog_service;
pub mod keyed_locks;

pub use cart_service::CartService;
pub use catalog_service::CatalogService;
pub use keyed_locks::{KeyGuard, KeyedLocks};
