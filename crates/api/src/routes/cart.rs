//! Cart endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::ProductId;
use domain::{CartView, ValidationReport};
use market_store::{CartLine, MarketStore};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::Consumer;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct AddItemRequest {
    pub product_id: ProductId,
    pub quantity: u32,
}

#[derive(Deserialize)]
pub struct UpdateQuantityRequest {
    pub quantity: u32,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartLineResponse {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl From<CartLine> for CartLineResponse {
    fn from(line: CartLine) -> Self {
        Self {
            product_id: line.product_id,
            quantity: line.quantity,
            unit_price_cents: line.unit_price.cents(),
            subtotal_cents: line.subtotal().cents(),
        }
    }
}

#[derive(Serialize)]
pub struct PruneResponse {
    pub removed: Vec<ProductId>,
}

// -- Handlers --

/// POST /cart/items — add a product to the cart.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Consumer(consumer_id): Consumer,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<CartLineResponse>), ApiError> {
    let line = state
        .cart
        .add_item(consumer_id, req.product_id, req.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(line.into())))
}

/// PUT /cart/items/:product_id — set a line to an absolute quantity.
#[tracing::instrument(skip(state, req))]
pub async fn update_quantity<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Consumer(consumer_id): Consumer,
    Path(product_id): Path<ProductId>,
    Json(req): Json<UpdateQuantityRequest>,
) -> Result<Json<CartLineResponse>, ApiError> {
    let line = state
        .cart
        .update_quantity(consumer_id, product_id, req.quantity)
        .await?;
    Ok(Json(line.into()))
}

/// DELETE /cart/items/:product_id — remove a line from the cart.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Consumer(consumer_id): Consumer,
    Path(product_id): Path<ProductId>,
) -> Result<StatusCode, ApiError> {
    state.cart.remove_item(consumer_id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /cart — empty the cart entirely.
#[tracing::instrument(skip(state))]
pub async fn clear<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Consumer(consumer_id): Consumer,
) -> Result<StatusCode, ApiError> {
    state.cart.clear(consumer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /cart — cart lines with live display data and aggregate total.
#[tracing::instrument(skip(state))]
pub async fn get_cart<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Consumer(consumer_id): Consumer,
) -> Result<Json<CartView>, ApiError> {
    Ok(Json(state.cart.list(consumer_id).await?))
}

/// POST /cart/validate — advisory per-line problem report.
#[tracing::instrument(skip(state))]
pub async fn validate<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Consumer(consumer_id): Consumer,
) -> Result<Json<ValidationReport>, ApiError> {
    Ok(Json(state.cart.validate(consumer_id).await?))
}

/// POST /cart/prune — drop lines whose product is gone or invalid.
#[tracing::instrument(skip(state))]
pub async fn prune<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Consumer(consumer_id): Consumer,
) -> Result<Json<PruneResponse>, ApiError> {
    let removed = state.cart.prune_invalid(consumer_id).await?;
    Ok(Json(PruneResponse { removed }))
}
