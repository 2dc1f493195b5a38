use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::{KeyGuard, KeyedLocks};
use crate::models::{
    validate_cart_quantity, Cart, CartItem, CartLineView, CartView, CodecError,
    ConcurrencyPolicy, ServiceError, ServiceResult, SessionKey,
};
use crate::observability::Metrics;
use crate::repositories::{FlowerRepository, SessionStore};

/// Read-modify-write cart logic over a keyed session store
pub struct CartService {
    store: Arc<dyn SessionStore>,
    catalog: Option<Arc<dyn FlowerRepository>>,
    metrics: Option<Arc<Metrics>>,
    locks: KeyedLocks,
    policy: ConcurrencyPolicy,
    idle_timeout: Duration,
    session_count_ttl: Duration,
    session_count: Mutex<Option<(Instant, usize)>>,
}

/// How long a session count is reused before the store is asked again
pub const DEFAULT_SESSION_COUNT_TTL: Duration = Duration::from_secs(15);

/// Outcome of loading the stored blob for a session
enum Loaded {
    Missing,
    Found(Cart),
    Corrupt(CodecError),
}

impl CartService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        policy: ConcurrencyPolicy,
        idle_timeout: Duration,
    ) -> Self {
        Self {
            store,
            catalog: None,
            metrics: None,
            locks: KeyedLocks::new(),
            policy,
            idle_timeout,
            session_count_ttl: DEFAULT_SESSION_COUNT_TTL,
            session_count: Mutex::new(None),
        }
    }

    /// Validate product ids against `catalog` and enrich cart views with its data
    pub fn with_catalog(mut self, catalog: Arc<dyn FlowerRepository>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_session_count_ttl(mut self, ttl: Duration) -> Self {
        self.session_count_ttl = ttl;
        self
    }

    pub fn policy(&self) -> ConcurrencyPolicy {
        self.policy
    }

    /// Current cart; empty when the session has none or its stored cart is corrupt
    #[instrument(skip(self), fields(session_key = %key))]
    pub async fn get_cart(&self, key: &SessionKey) -> ServiceResult<Cart> {
        let result = self.load(key).await.map(|loaded| match loaded {
            Loaded::Found(cart) => cart,
            Loaded::Missing | Loaded::Corrupt(_) => Cart::new(),
        });
        self.record("get_cart", &result);
        result
    }

    /// Current cart, surfacing a corrupt stored cart as `ServiceError::CorruptCart`
    #[instrument(skip(self), fields(session_key = %key))]
    pub async fn try_get_cart(&self, key: &SessionKey) -> ServiceResult<Cart> {
        let result = match self.load(key).await {
            Ok(Loaded::Found(cart)) => Ok(cart),
            Ok(Loaded::Missing) => Ok(Cart::new()),
            Ok(Loaded::Corrupt(source)) => Err(ServiceError::CorruptCart {
                session_key: key.to_string(),
                source,
            }),
            Err(e) => Err(e),
        };
        self.record("try_get_cart", &result);
        result
    }

    /// Append `item` as a new line and persist the cart
    #[instrument(skip(self), fields(session_key = %key, product_id = item.product_id, quantity = item.quantity))]
    pub async fn add_item(&self, key: &SessionKey, item: CartItem) -> ServiceResult<Cart> {
        let result = self.add_item_inner(key, item).await;
        self.record("add_item", &result);
        result
    }

    async fn add_item_inner(&self, key: &SessionKey, item: CartItem) -> ServiceResult<Cart> {
        validate_cart_quantity(item.quantity)?;

        if let Some(catalog) = &self.catalog {
            if catalog.find_by_id(item.product_id).await?.is_none() {
                return Err(ServiceError::ProductNotFound {
                    product_id: item.product_id,
                });
            }
        }

        let cart = self
            .mutate(key, |cart| {
                cart.add_item(item);
                true
            })
            .await?;

        info!("Item added to cart, {} lines", cart.len());
        Ok(cart)
    }

    /// Remove the first line for `product_id`; absent items leave the cart unchanged
    #[instrument(skip(self), fields(session_key = %key, product_id = product_id))]
    pub async fn remove_item(&self, key: &SessionKey, product_id: i32) -> ServiceResult<Cart> {
        let result = self
            .mutate(key, |cart| {
                let removed = cart.remove_item(product_id);
                if !removed {
                    info!("Product not in cart, nothing removed");
                }
                removed
            })
            .await;
        self.record("remove_item", &result);
        result
    }

    /// Delete the session's cart
    #[instrument(skip(self), fields(session_key = %key))]
    pub async fn clear_cart(&self, key: &SessionKey) -> ServiceResult<()> {
        let result = {
            let _guard = self.acquire(key).await;
            self.store.remove(key.as_str()).await.map_err(ServiceError::from)
        };
        if result.is_ok() {
            info!("Cart cleared");
        }
        self.record("clear_cart", &result);
        result
    }

    /// Cart with catalog names and prices for display
    #[instrument(skip(self), fields(session_key = %key))]
    pub async fn cart_view(&self, key: &SessionKey) -> ServiceResult<CartView> {
        let cart = self.get_cart(key).await?;
        self.view_of(&cart).await
    }

    /// Render `cart` with catalog data
    pub async fn view_of(&self, cart: &Cart) -> ServiceResult<CartView> {
        let mut items = Vec::with_capacity(cart.len());
        for item in cart.items() {
            let flower = match &self.catalog {
                Some(catalog) => catalog.find_by_id(item.product_id).await?,
                None => None,
            };

            let line = match flower {
                Some(flower) => CartLineView {
                    product_id: item.product_id,
                    name: flower.name.clone(),
                    quantity: item.quantity,
                    unit_price: flower.sale_price,
                    line_total: flower.price_for(item.quantity),
                    is_available: flower.is_in_stock(),
                },
                None => {
                    if self.catalog.is_some() {
                        warn!("Product not found for cart line: {}", item.product_id);
                    }
                    CartLineView {
                        product_id: item.product_id,
                        name: "Product not found".to_string(),
                        quantity: item.quantity,
                        unit_price: Decimal::ZERO,
                        line_total: Decimal::ZERO,
                        is_available: false,
                    }
                }
            };
            items.push(line);
        }

        let total_price = items.iter().map(|line| line.line_total).sum();

        Ok(CartView {
            total_items: cart.total_items(),
            total_price,
            items,
        })
    }

    /// Number of live sessions in the store, cached for the session count TTL.
    /// Concurrent callers share one refresh.
    pub async fn session_count(&self) -> ServiceResult<usize> {
        let mut cached = self.session_count.lock().await;
        if let Some((counted_at, count)) = *cached {
            if counted_at.elapsed() < self.session_count_ttl {
                debug!("Reusing session count from {:?} ago", counted_at.elapsed());
                return Ok(count);
            }
        }

        let count = self.store.len().await?;
        *cached = Some((Instant::now(), count));
        if let Some(metrics) = &self.metrics {
            metrics.set_active_sessions(count);
        }
        Ok(count)
    }

    /// Load, apply `op`, and write back when the cart changed or a stored blob existed
    async fn mutate<F>(&self, key: &SessionKey, op: F) -> ServiceResult<Cart>
    where
        F: FnOnce(&mut Cart) -> bool,
    {
        let _guard = self.acquire(key).await;

        let (mut cart, existed) = match self.load(key).await? {
            Loaded::Found(cart) => (cart, true),
            Loaded::Missing => (Cart::new(), false),
            // Overwritten with the recovered cart on write-back
            Loaded::Corrupt(_) => (Cart::new(), true),
        };

        let changed = op(&mut cart);

        if changed || existed {
            let blob = cart.encode().map_err(|source| ServiceError::CorruptCart {
                session_key: key.to_string(),
                source,
            })?;
            self.store.set(key.as_str(), blob, self.idle_timeout).await?;
        }

        Ok(cart)
    }

    async fn acquire(&self, key: &SessionKey) -> Option<KeyGuard<'_>> {
        match self.policy {
            ConcurrencyPolicy::PerKeySerialized => Some(self.locks.lock(key.as_str()).await),
            ConcurrencyPolicy::LastWriteWins => None,
        }
    }

    async fn load(&self, key: &SessionKey) -> ServiceResult<Loaded> {
        let Some(blob) = self.store.get(key.as_str()).await? else {
            return Ok(Loaded::Missing);
        };

        match Cart::decode(&blob) {
            Ok(cart) => Ok(Loaded::Found(cart)),
            Err(e) => {
                warn!(error = %e, bytes = blob.len(), "Stored cart is corrupt, treating as empty");
                if let Some(metrics) = &self.metrics {
                    let reason = match &e {
                        CodecError::Malformed { .. } => "malformed",
                        CodecError::UnsupportedVersion { .. } => "unsupported_version",
                    };
                    metrics.record_corrupt_cart(reason);
                }
                Ok(Loaded::Corrupt(e))
            }
        }
    }

    fn record<T>(&self, operation: &str, result: &ServiceResult<T>) {
        if let Some(metrics) = &self.metrics {
            metrics.record_cart_operation(operation, result.is_ok());
        }
    }
}
