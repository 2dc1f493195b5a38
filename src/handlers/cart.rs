use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info, instrument};

use super::AppState;
use crate::models::{Cart, CartItem, CartView, ServiceError, SessionKey, StoreError};

/// Query parameters for adding a line
#[derive(Debug, Deserialize)]
pub struct AddItemQuery {
    pub product: i32,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

/// Query parameters for removing a line
#[derive(Debug, Deserialize)]
pub struct RemoveItemQuery {
    pub product: i32,
}

fn default_quantity() -> u32 {
    1
}

/// Get the session's cart
#[instrument(name = "get_cart", skip(state), fields(session_key = %session_key))]
pub async fn get_cart(
    State(state): State<AppState>,
    Extension(session_key): Extension<SessionKey>,
) -> Result<Json<CartView>, (StatusCode, Json<Value>)> {
    match state.cart_service.cart_view(&session_key).await {
        Ok(view) => {
            info!("Retrieved cart with {} items", view.total_items);
            Ok(Json(view))
        }
        Err(err) => {
            error!("Failed to get cart: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

/// Append a line to the session's cart
#[instrument(name = "add_item", skip(state), fields(session_key = %session_key))]
pub async fn add_item(
    State(state): State<AppState>,
    Extension(session_key): Extension<SessionKey>,
    Query(query): Query<AddItemQuery>,
) -> Result<Json<CartView>, (StatusCode, Json<Value>)> {
    info!(
        "Adding product {} (quantity {}) to cart",
        query.product, query.quantity
    );

    let item = CartItem::new(query.product, query.quantity);
    let cart = match state.cart_service.add_item(&session_key, item).await {
        Ok(cart) => cart,
        Err(err) => {
            error!("Failed to add item to cart: {}", err);
            return Err(service_error_to_response(err));
        }
    };

    render(&state, &cart).await
}

/// Remove the first line for a product from the session's cart
#[instrument(name = "remove_item", skip(state), fields(session_key = %session_key))]
pub async fn remove_item(
    State(state): State<AppState>,
    Extension(session_key): Extension<SessionKey>,
    Query(query): Query<RemoveItemQuery>,
) -> Result<Json<CartView>, (StatusCode, Json<Value>)> {
    info!("Removing product {} from cart", query.product);

    let cart = match state
        .cart_service
        .remove_item(&session_key, query.product)
        .await
    {
        Ok(cart) => cart,
        Err(err) => {
            error!("Failed to remove item from cart: {}", err);
            return Err(service_error_to_response(err));
        }
    };

    render(&state, &cart).await
}

/// View of the cart this request wrote
async fn render(
    state: &AppState,
    cart: &Cart,
) -> Result<Json<CartView>, (StatusCode, Json<Value>)> {
    state
        .cart_service
        .view_of(cart)
        .await
        .map(Json)
        .map_err(service_error_to_response)
}

/// Delete the session's cart
#[instrument(name = "clear_cart", skip(state), fields(session_key = %session_key))]
pub async fn clear_cart(
    State(state): State<AppState>,
    Extension(session_key): Extension<SessionKey>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    match state.cart_service.clear_cart(&session_key).await {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(err) => {
            error!("Failed to clear cart: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

/// Convert ServiceError to HTTP response
pub(crate) fn service_error_to_response(err: ServiceError) -> (StatusCode, Json<Value>) {
    let (status, message) = match &err {
        ServiceError::ProductNotFound { .. } => (StatusCode::NOT_FOUND, err.to_string()),
        ServiceError::InvalidQuantity { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        ServiceError::InvalidSessionKey { .. } => (StatusCode::BAD_REQUEST, err.to_string()),
        ServiceError::CorruptCart { .. } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Stored cart could not be read".to_string(),
        ),
        ServiceError::Store { source } => match source {
            StoreError::Timeout => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Session store timeout".to_string(),
            ),
            _ => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Session store unavailable".to_string(),
            ),
        },
    };

    (
        status,
        Json(json!({
            "error": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })),
    )
}
