use std::sync::Arc;
use tracing::{info, instrument};

use crate::models::{Flower, ServiceError, ServiceResult};
use crate::repositories::FlowerRepository;

/// Read-only access to the flower catalog
pub struct CatalogService {
    repository: Arc<dyn FlowerRepository>,
}

impl CatalogService {
    pub fn new(repository: Arc<dyn FlowerRepository>) -> Self {
        Self { repository }
    }

    #[instrument(skip(self))]
    pub async fn list_flowers(&self) -> ServiceResult<Vec<Flower>> {
        let flowers = self.repository.find_all().await?;
        info!("Listed {} flowers", flowers.len());
        Ok(flowers)
    }

    #[instrument(skip(self))]
    pub async fn get_flower(&self, id: i32) -> ServiceResult<Flower> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(ServiceError::ProductNotFound { product_id: id })
    }
}
