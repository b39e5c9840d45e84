//! Cart store operations: add, update, remove, clear, list, validate.
//!
//! None of these touch stock. Stock is reserved only at order conversion —
//! an optimistic model, which is why every mutation here re-checks the
//! live product but the checkout commit re-checks it again.

use chrono::Utc;
use serde::Serialize;

use common::{ConsumerId, Money, ProductId, Week};
use market_store::{CartLine, MarketStore, Product};

use crate::error::CoreError;
use crate::validation::{ValidationReport, validate_lines};

/// Service over a consumer's cart lines.
pub struct CartService<S> {
    store: S,
}

/// A cart line joined with live product display data.
///
/// `unit_price` and `subtotal` are the line's own snapshot — the billing
/// truth. `live_price` may differ; the divergence is surfaced as the
/// `price_changed` warning, never silently reconciled.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub product_name: Option<String>,
    pub image_url: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
    pub live_price: Option<Money>,
    pub price_changed: bool,
}

/// The whole cart as returned to the consumer.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: Money,
}

impl<S: MarketStore> CartService<S> {
    /// Creates the service over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Adds `quantity` of a product to the cart.
    ///
    /// If a line for the product already exists the quantities are summed
    /// and the stock check applies to the combined quantity; the original
    /// price snapshot is kept. A fresh line snapshots the current price.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(
        &self,
        consumer_id: ConsumerId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartLine, CoreError> {
        if quantity == 0 {
            return Err(CoreError::InvalidQuantity);
        }
        let product = self.purchasable_product(product_id).await?;

        let line = match self.store.get_cart_line(consumer_id, product_id).await? {
            Some(mut existing) => {
                // Saturate so an overflowing combined quantity fails the
                // stock check instead of wrapping past it.
                let combined = existing.quantity.saturating_add(quantity);
                check_stock(&product, combined)?;
                existing.quantity = combined;
                existing.updated_at = Utc::now();
                existing
            }
            None => {
                check_stock(&product, quantity)?;
                CartLine::new(consumer_id, product_id, quantity, product.price)
            }
        };

        self.store.upsert_cart_line(line.clone()).await?;
        tracing::debug!(%consumer_id, %product_id, quantity = line.quantity, "cart line upserted");
        Ok(line)
    }

    /// Sets a line to an absolute quantity, re-snapshotting the price to
    /// the current product price.
    #[tracing::instrument(skip(self))]
    pub async fn update_quantity(
        &self,
        consumer_id: ConsumerId,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartLine, CoreError> {
        if quantity == 0 {
            return Err(CoreError::InvalidQuantity);
        }
        let product = self.purchasable_product(product_id).await?;

        let mut line = self
            .store
            .get_cart_line(consumer_id, product_id)
            .await?
            .ok_or(CoreError::CartLineNotFound(product_id))?;

        check_stock(&product, quantity)?;
        line.quantity = quantity;
        line.unit_price = product.price;
        line.updated_at = Utc::now();

        self.store.upsert_cart_line(line.clone()).await?;
        Ok(line)
    }

    /// Removes one line from the cart.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(
        &self,
        consumer_id: ConsumerId,
        product_id: ProductId,
    ) -> Result<(), CoreError> {
        if self.store.delete_cart_line(consumer_id, product_id).await? {
            Ok(())
        } else {
            Err(CoreError::CartLineNotFound(product_id))
        }
    }

    /// Empties the cart.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self, consumer_id: ConsumerId) -> Result<(), CoreError> {
        self.store.clear_cart(consumer_id).await?;
        Ok(())
    }

    /// The cart with live display data and aggregate total.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, consumer_id: ConsumerId) -> Result<CartView, CoreError> {
        let pairs = self.store.cart_with_products(consumer_id).await?;

        let lines: Vec<CartLineView> = pairs
            .into_iter()
            .map(|(line, product)| CartLineView {
                product_id: line.product_id,
                product_name: product.as_ref().map(|p| p.name.clone()),
                image_url: product.as_ref().and_then(|p| p.image_url.clone()),
                quantity: line.quantity,
                unit_price: line.unit_price,
                subtotal: line.subtotal(),
                live_price: product.as_ref().map(|p| p.price),
                price_changed: product
                    .as_ref()
                    .is_some_and(|p| line.unit_price.diverges_from(p.price)),
            })
            .collect();

        let total = lines.iter().map(|l| l.subtotal).sum();
        Ok(CartView { lines, total })
    }

    /// Advisory validation pass over the whole cart.
    #[tracing::instrument(skip(self))]
    pub async fn validate(&self, consumer_id: ConsumerId) -> Result<ValidationReport, CoreError> {
        let pairs = self.store.cart_with_products(consumer_id).await?;
        Ok(validate_lines(
            &pairs,
            Utc::now().date_naive(),
            Week::current(),
        ))
    }

    /// Cleanup: drops lines whose product no longer exists or is no longer
    /// valid, returning the removed product ids.
    #[tracing::instrument(skip(self))]
    pub async fn prune_invalid(&self, consumer_id: ConsumerId) -> Result<Vec<ProductId>, CoreError> {
        let removed = self.store.delete_invalid_cart_lines(consumer_id).await?;
        if !removed.is_empty() {
            tracing::info!(%consumer_id, count = removed.len(), "pruned invalid cart lines");
        }
        Ok(removed)
    }

    async fn purchasable_product(&self, product_id: ProductId) -> Result<Product, CoreError> {
        // An invalid product is indistinguishable from a missing one at
        // add-to-cart time: both are NotFound.
        self.store
            .get_product(product_id)
            .await?
            .filter(Product::is_valid_now)
            .ok_or(CoreError::ProductNotFound(product_id))
    }
}

fn check_stock(product: &Product, requested: u32) -> Result<(), CoreError> {
    if requested > product.stock {
        return Err(CoreError::InsufficientStock {
            product_id: product.id,
            requested,
            available: product.stock,
        });
    }
    Ok(())
}
