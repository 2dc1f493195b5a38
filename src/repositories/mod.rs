// Repositories module - data access layer

pub mod dynamodb_session_store;
pub mod flower_repository;
pub mod session_store;

pub use dynamodb_session_store::{DynamoDbSessionStore, SessionRecord};
pub use flower_repository::{FlowerRepository, InMemoryFlowerRepository};
pub use session_store::{InMemorySessionStore, SessionStore};
