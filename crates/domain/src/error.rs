//! Engine error taxonomy.

use thiserror::Error;

use common::{Money, OrderId, ProductId};
use market_store::{OrderStatus, StoreError};

use crate::validation::LineIssue;

/// Errors surfaced by the cart, checkout and order lifecycle services.
///
/// Validation-kind errors carry enough structure (which line, which reason,
/// the live value) for the caller to re-render the cart; none of them is
/// retried automatically.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The product does not exist or is not currently for sale.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// The order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The consumer's cart has no line for this product.
    #[error("Product {0} is not in the cart")]
    CartLineNotFound(ProductId),

    /// Quantity must be a positive integer.
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    /// Checkout attempted with zero cart lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// Requested or combined quantity exceeds live stock. Never silently
    /// clamped; the live stock is reported so the caller can retry with a
    /// corrected quantity.
    #[error(
        "Insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: u32,
        available: u32,
    },

    /// Product inactive or outside its weekly validity window.
    #[error("Product {product_id} is not available for purchase")]
    ProductInvalid { product_id: ProductId },

    /// Snapshotted price diverged from the live price beyond tolerance.
    #[error("Price of product {product_id} changed from {snapshot} to {live}")]
    PriceChanged {
        product_id: ProductId,
        snapshot: Money,
        live: Money,
    },

    /// Illegal order status change, with the allowed targets.
    #[error("Cannot move order from {current} to {attempted}")]
    InvalidTransition {
        current: OrderStatus,
        attempted: OrderStatus,
        allowed: Vec<OrderStatus>,
    },

    /// Checkout blocked by the validation pass; nothing was written.
    #[error("Checkout blocked: {} cart line(s) failed validation", problems.len())]
    CheckoutRejected { problems: Vec<LineIssue> },

    /// Unexpected store failure, opaque to the caller.
    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::OrderNotFound(id) => CoreError::OrderNotFound(id),
            StoreError::StockConflict {
                product_id,
                requested,
                available,
            } => CoreError::InsufficientStock {
                product_id,
                requested,
                available,
            },
            StoreError::ProductUnavailable { product_id } => {
                CoreError::ProductInvalid { product_id }
            }
            StoreError::InvalidTransition { current, attempted } => CoreError::InvalidTransition {
                current,
                attempted,
                allowed: current.allowed_next().to_vec(),
            },
            other => CoreError::Store(other),
        }
    }
}
