use thiserror::Error;

use common::{OrderId, ProductId};

use crate::status::OrderStatus;

/// Errors that can occur when interacting with the market store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// A conditional stock decrement found less stock than requested.
    /// Carries the live stock so the caller can retry with a corrected
    /// quantity.
    #[error("Insufficient stock for product {product_id}: requested {requested}, available {available}")]
    StockConflict {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// The product was inactive or outside its validity window at the
    /// moment of the write.
    #[error("Product {product_id} is no longer available for purchase")]
    ProductUnavailable { product_id: ProductId },

    /// An order status change that the state machine does not allow.
    #[error("Invalid order status transition: {current} -> {attempted}")]
    InvalidTransition {
        current: OrderStatus,
        attempted: OrderStatus,
    },

    /// A status column held a value the state machine does not know.
    #[error("Unknown order status in store: {0:?}")]
    UnknownStatus(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    /// The allowed target statuses for an [`StoreError::InvalidTransition`],
    /// empty for other variants.
    pub fn allowed_transitions(&self) -> &'static [OrderStatus] {
        match self {
            StoreError::InvalidTransition { current, .. } => current.allowed_next(),
            _ => &[],
        }
    }
}

/// Result type for market store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
