//! The checkout transaction: validated cart lines become one order per
//! vendor, all-or-nothing.

use chrono::Utc;

use common::{AddressId, ConsumerId, Week};
use market_store::{MarketStore, NewOrder, NewOrderLine, Order};

use crate::error::CoreError;
use crate::order_number;
use crate::split::split_by_vendor;
use crate::validation::validate_lines;

/// Drives the cart-to-order conversion.
pub struct CheckoutService<S> {
    store: S,
}

impl<S: MarketStore> CheckoutService<S> {
    /// Creates the service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Converts the consumer's entire cart into per-vendor orders.
    ///
    /// All-or-nothing across the whole cart: if any line fails validation
    /// the call aborts with the itemized problem list, and if any vendor
    /// group fails at commit time the store rolls back every order created
    /// in this call. The consumer either gets everything or a clear,
    /// retryable failure with no side effects.
    #[tracing::instrument(skip(self, notes))]
    pub async fn checkout(
        &self,
        consumer_id: ConsumerId,
        address_id: AddressId,
        notes: Option<String>,
    ) -> Result<Vec<Order>, CoreError> {
        let pairs = self.store.cart_with_products(consumer_id).await?;
        if pairs.is_empty() {
            return Err(CoreError::EmptyCart);
        }

        // Advisory pass; the store re-checks authoritatively at write time.
        let report = validate_lines(&pairs, Utc::now().date_naive(), Week::current());
        if !report.is_clean() {
            metrics::counter!("checkout_rejected_total").increment(1);
            return Err(CoreError::CheckoutRejected {
                problems: report.problems,
            });
        }

        let orders: Vec<NewOrder> = split_by_vendor(report.valid)
            .into_iter()
            .map(|group| NewOrder {
                number: order_number::generate(),
                vendor_id: group.vendor_id,
                address_id,
                notes: notes.clone(),
                lines: group
                    .lines
                    .into_iter()
                    .map(|validated| NewOrderLine {
                        product_id: validated.line.product_id,
                        product_name: validated.product.name,
                        unit_price: validated.line.unit_price,
                        quantity: validated.line.quantity,
                    })
                    .collect(),
            })
            .collect();

        let created = match self.store.commit_checkout(consumer_id, orders).await {
            Ok(created) => created,
            Err(err) => {
                metrics::counter!("checkout_conflicts_total").increment(1);
                return Err(err.into());
            }
        };

        metrics::counter!("orders_created_total").increment(created.len() as u64);
        tracing::info!(
            %consumer_id,
            orders = created.len(),
            "checkout converted cart into orders"
        );
        Ok(created)
    }
}
