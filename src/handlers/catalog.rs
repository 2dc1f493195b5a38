use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde_json::Value;
use tracing::{error, info, instrument};

use super::cart::service_error_to_response;
use super::AppState;
use crate::models::Flower;

/// List all flowers
#[instrument(name = "list_flowers", skip(state))]
pub async fn list_flowers(
    State(state): State<AppState>,
) -> Result<Json<Vec<Flower>>, (StatusCode, Json<Value>)> {
    match state.catalog_service.list_flowers().await {
        Ok(flowers) => Ok(Json(flowers)),
        Err(err) => {
            error!("Failed to list flowers: {}", err);
            Err(service_error_to_response(err))
        }
    }
}

/// Get a specific flower by ID
#[instrument(name = "get_flower", skip(state), fields(flower_id = flower_id))]
pub async fn get_flower(
    State(state): State<AppState>,
    Path(flower_id): Path<i32>,
) -> Result<Json<Flower>, (StatusCode, Json<Value>)> {
    match state.catalog_service.get_flower(flower_id).await {
        Ok(flower) => {
            info!("Retrieved flower: {}", flower.name);
            Ok(Json(flower))
        }
        Err(err) => {
            error!("Failed to get flower {}: {}", flower_id, err);
            Err(service_error_to_response(err))
        }
    }
}
