//! Order status lifecycle: transitions and stock-restoring cancellation.

use common::{ConsumerId, OrderId};
use market_store::{MarketStore, Order, OrderLine, OrderStatus};

use crate::error::CoreError;

/// Governs every mutation of an order after its creation.
pub struct OrderLifecycle<S> {
    store: S,
}

impl<S: MarketStore> OrderLifecycle<S> {
    /// Creates the service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Loads an order with its receipt lines.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, id: OrderId) -> Result<(Order, Vec<OrderLine>), CoreError> {
        let order = self
            .store
            .get_order(id)
            .await?
            .ok_or(CoreError::OrderNotFound(id))?;
        let lines = self.store.get_order_lines(id).await?;
        Ok((order, lines))
    }

    /// All orders of a consumer, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn list_for_consumer(&self, consumer_id: ConsumerId) -> Result<Vec<Order>, CoreError> {
        Ok(self.store.orders_for_consumer(consumer_id).await?)
    }

    /// Moves an order to `target` if the state machine allows it.
    ///
    /// Moving to `cancelado` through here restores stock exactly like
    /// [`OrderLifecycle::cancel`], just without a reason note.
    #[tracing::instrument(skip(self))]
    pub async fn set_status(&self, id: OrderId, target: OrderStatus) -> Result<Order, CoreError> {
        let order = self.store.transition_order(id, target, None).await?;
        if target == OrderStatus::Cancelled {
            metrics::counter!("orders_cancelled_total").increment(1);
        }
        tracing::info!(%id, status = %order.status, "order status changed");
        Ok(order)
    }

    /// Cancels an order, restoring each line's quantity to its product's
    /// stock and appending the optional reason to the order notes.
    #[tracing::instrument(skip(self, reason))]
    pub async fn cancel(&self, id: OrderId, reason: Option<String>) -> Result<Order, CoreError> {
        let note = reason.map(|r| format!("cancelado: {r}"));
        let order = self
            .store
            .transition_order(id, OrderStatus::Cancelled, note)
            .await?;
        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(%id, "order cancelled, stock restored");
        Ok(order)
    }
}
