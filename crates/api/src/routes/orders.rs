//! Checkout and order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{AddressId, OrderId, ProductId, VendorId};
use market_store::{MarketStore, Order, OrderLine, OrderStatus};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::Consumer;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CheckoutRequest {
    pub delivery_address_id: AddressId,
    pub notes: Option<String>,
}

#[derive(Deserialize)]
pub struct SetStatusRequest {
    pub status: OrderStatus,
}

#[derive(Deserialize, Default)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: OrderId,
    pub number: String,
    pub vendor_id: VendorId,
    pub total_cents: i64,
    pub status: OrderStatus,
    pub created_at: String,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            number: order.number.clone(),
            vendor_id: order.vendor_id,
            total_cents: order.total.cents(),
            status: order.status,
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

#[derive(Serialize)]
pub struct OrderLineResponse {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl From<&OrderLine> for OrderLineResponse {
    fn from(line: &OrderLine) -> Self {
        Self {
            product_id: line.product_id,
            product_name: line.product_name.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price.cents(),
            subtotal_cents: line.subtotal.cents(),
        }
    }
}

#[derive(Serialize)]
pub struct OrderDetailResponse {
    #[serde(flatten)]
    pub order: OrderResponse,
    pub notes: Option<String>,
    pub lines: Vec<OrderLineResponse>,
}

// -- Handlers --

/// POST /checkout — convert the whole cart into one order per vendor.
#[tracing::instrument(skip(state, req))]
pub async fn checkout<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Consumer(consumer_id): Consumer,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<Vec<OrderResponse>>), ApiError> {
    let orders = state
        .checkout
        .checkout(consumer_id, req.delivery_address_id, req.notes)
        .await?;
    let responses = orders.iter().map(OrderResponse::from).collect();
    Ok((StatusCode::CREATED, Json(responses)))
}

/// GET /orders — the authenticated consumer's orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Consumer(consumer_id): Consumer,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.orders.list_for_consumer(consumer_id).await?;
    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}

/// GET /orders/:id — one order with its receipt lines.
#[tracing::instrument(skip(state))]
pub async fn get<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Consumer(consumer_id): Consumer,
    Path(id): Path<OrderId>,
) -> Result<Json<OrderDetailResponse>, ApiError> {
    let (order, lines) = state.orders.get(id).await?;
    // Consumers only see their own orders; the vendor-facing read goes
    // through the vendor gateway, not this surface.
    if order.consumer_id != consumer_id {
        return Err(ApiError::NotFound(format!("Order {id} not found")));
    }

    Ok(Json(OrderDetailResponse {
        order: OrderResponse::from(&order),
        notes: order.notes.clone(),
        lines: lines.iter().map(OrderLineResponse::from).collect(),
    }))
}

/// PUT /orders/:id/status — vendor-side status transition.
///
/// Role enforcement happens at the upstream gateway; this surface only
/// enforces the state machine itself.
#[tracing::instrument(skip(state, req))]
pub async fn set_status<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<OrderId>,
    Json(req): Json<SetStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = state.orders.set_status(id, req.status).await?;
    Ok(Json(OrderResponse::from(&order)))
}

/// POST /orders/:id/cancel — cancel an order, restoring stock.
#[tracing::instrument(skip(state, req))]
pub async fn cancel<S: MarketStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Consumer(consumer_id): Consumer,
    Path(id): Path<OrderId>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let (order, _) = state.orders.get(id).await?;
    if order.consumer_id != consumer_id {
        return Err(ApiError::NotFound(format!("Order {id} not found")));
    }

    let order = state.orders.cancel(id, req.reason).await?;
    Ok(Json(OrderResponse::from(&order)))
}
