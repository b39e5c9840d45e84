//! HTTP API server for the feira checkout engine.
//!
//! Exposes the cart, checkout and order lifecycle surface with structured
//! logging (tracing) and Prometheus metrics. Authentication happens
//! upstream; the authenticated consumer id arrives in the `x-consumer-id`
//! header and is trusted as-is.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use domain::{CartService, CheckoutService, OrderLifecycle};
use market_store::MarketStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S> {
    pub cart: CartService<S>,
    pub checkout: CheckoutService<S>,
    pub orders: OrderLifecycle<S>,
    pub store: S,
}

/// Creates the application state over a store.
pub fn create_state<S: MarketStore + Clone>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        cart: CartService::new(store.clone()),
        checkout: CheckoutService::new(store.clone()),
        orders: OrderLifecycle::new(store.clone()),
        store,
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: MarketStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/cart", get(routes::cart::get_cart::<S>))
        .route("/cart", delete(routes::cart::clear::<S>))
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route(
            "/cart/items/{product_id}",
            put(routes::cart::update_quantity::<S>),
        )
        .route(
            "/cart/items/{product_id}",
            delete(routes::cart::remove_item::<S>),
        )
        .route("/cart/validate", post(routes::cart::validate::<S>))
        .route("/cart/prune", post(routes::cart::prune::<S>))
        .route("/checkout", post(routes::orders::checkout::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/orders/{id}/status", put(routes::orders::set_status::<S>))
        .route("/orders/{id}/cancel", post(routes::orders::cancel::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
