use async_trait::async_trait;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::models::{Flower, StoreResult};

/// Trait defining read access to the flower catalog
#[async_trait]
pub trait FlowerRepository: Send + Sync {
    /// All flowers in catalog order
    async fn find_all(&self) -> StoreResult<Vec<Flower>>;

    /// Find a flower by its ID
    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Flower>>;
}

/// Catalog held in memory, seeded with the shop's flower range
#[derive(Debug, Clone)]
pub struct InMemoryFlowerRepository {
    flowers: Arc<Vec<Flower>>,
}

impl InMemoryFlowerRepository {
    pub fn new(flowers: Vec<Flower>) -> Self {
        Self {
            flowers: Arc::new(flowers),
        }
    }

    /// Catalog with the default flower range
    pub fn seeded() -> Self {
        Self::new(vec![
            Flower::new(14, "Summer Breeze Flower Box", dec!(4.99), dec!(1.69), 43),
            Flower::new(3, "Yellow Mellow Sunshine Bouquet", dec!(4.89), dec!(1.13), 319),
            Flower::new(18, "Sunshine Floral Ecstasy", dec!(5.69), dec!(0.47), 319),
            Flower::new(19, "Red Rose Beautiful Bunch", dec!(6.19), dec!(0.59), 252),
            Flower::new(1, "Dreamy Hues", dec!(5.59), dec!(1.12), 217),
        ])
    }
}

impl Default for InMemoryFlowerRepository {
    fn default() -> Self {
        Self::seeded()
    }
}

#[async_trait]
impl FlowerRepository for InMemoryFlowerRepository {
    async fn find_all(&self) -> StoreResult<Vec<Flower>> {
        Ok(self.flowers.as_ref().clone())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i32) -> StoreResult<Option<Flower>> {
        let found = self.flowers.iter().find(|flower| flower.id == id).cloned();
        debug!(found = found.is_some(), "Flower lookup");
        Ok(found)
    }
}
