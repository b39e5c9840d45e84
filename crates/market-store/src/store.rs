//! The `MarketStore` trait.

use async_trait::async_trait;

use common::{ConsumerId, OrderId, ProductId};

use crate::error::Result;
use crate::model::{CartLine, NewOrder, Order, OrderLine, Product};
use crate::status::OrderStatus;

/// Storage abstraction for catalog, carts and orders.
///
/// Implementations must make `commit_checkout` and `transition_order`
/// failure-atomic: either every effect of the call is applied or none is.
/// The stock checks inside those two methods are authoritative; everything
/// the caller validated beforehand is advisory.
#[async_trait]
pub trait MarketStore: Send + Sync {
    // -- Catalog --

    /// Inserts or replaces a product row. Used by the (external) catalog
    /// management surface and by tests.
    async fn put_product(&self, product: Product) -> Result<()>;

    /// Loads a product by id.
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    // -- Cart --

    /// Loads one cart line, if present.
    async fn get_cart_line(
        &self,
        consumer_id: ConsumerId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>>;

    /// Inserts or replaces the line keyed by `(consumer_id, product_id)`.
    async fn upsert_cart_line(&self, line: CartLine) -> Result<()>;

    /// Deletes one cart line. Returns false if no such line existed.
    async fn delete_cart_line(
        &self,
        consumer_id: ConsumerId,
        product_id: ProductId,
    ) -> Result<bool>;

    /// Deletes every line of the consumer's cart.
    async fn clear_cart(&self, consumer_id: ConsumerId) -> Result<()>;

    /// All cart lines of a consumer, oldest first, each paired with the
    /// live product state (`None` if the product row is gone).
    async fn cart_with_products(
        &self,
        consumer_id: ConsumerId,
    ) -> Result<Vec<(CartLine, Option<Product>)>>;

    /// Cleanup: deletes lines whose product no longer exists or is no
    /// longer valid, returning the affected product ids.
    async fn delete_invalid_cart_lines(&self, consumer_id: ConsumerId) -> Result<Vec<ProductId>>;

    // -- Checkout --

    /// Atomically creates all given orders with their lines, decrements
    /// each ordered product's stock (conditionally, re-checking validity
    /// and stock at write time) and clears the consumer's cart.
    ///
    /// On any failure nothing is applied: no order rows, no decrements,
    /// the cart untouched.
    async fn commit_checkout(
        &self,
        consumer_id: ConsumerId,
        orders: Vec<NewOrder>,
    ) -> Result<Vec<Order>>;

    // -- Orders --

    /// Loads an order by id.
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// The receipt lines of an order.
    async fn get_order_lines(&self, id: OrderId) -> Result<Vec<OrderLine>>;

    /// All orders placed by a consumer, newest first.
    async fn orders_for_consumer(&self, consumer_id: ConsumerId) -> Result<Vec<Order>>;

    /// Atomically moves an order to `target` after re-checking legality
    /// against the current status under a row lock.
    ///
    /// Moving to [`OrderStatus::Cancelled`] restores each order line's
    /// quantity to its product's stock as a relative increment in the same
    /// atomic scope. `note` is appended to the order's notes.
    async fn transition_order(
        &self,
        id: OrderId,
        target: OrderStatus,
        note: Option<String>,
    ) -> Result<Order>;
}
