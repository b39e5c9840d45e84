//! In-memory market store for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use common::{ConsumerId, OrderId, ProductId, Week};

use crate::error::{Result, StoreError};
use crate::model::{CartLine, NewOrder, Order, OrderLine, Product};
use crate::status::OrderStatus;
use crate::store::MarketStore;

#[derive(Default)]
struct MemoryState {
    products: HashMap<ProductId, Product>,
    cart: HashMap<(ConsumerId, ProductId), CartLine>,
    orders: HashMap<OrderId, Order>,
    order_lines: HashMap<OrderId, Vec<OrderLine>>,
}

/// In-memory market store implementation.
///
/// A single `RwLock` over the whole state stands in for the database: each
/// atomic scope runs under one write guard, which gives the same
/// all-or-nothing behavior the Postgres backend gets from a transaction.
#[derive(Clone, Default)]
pub struct InMemoryMarketStore {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryMarketStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current stock of a product, for test assertions.
    pub async fn stock_of(&self, id: ProductId) -> Option<u32> {
        self.state.read().await.products.get(&id).map(|p| p.stock)
    }

    /// Total number of persisted orders, for test assertions.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }
}

#[async_trait]
impl MarketStore for InMemoryMarketStore {
    async fn put_product(&self, product: Product) -> Result<()> {
        self.state
            .write()
            .await
            .products
            .insert(product.id, product);
        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn get_cart_line(
        &self,
        consumer_id: ConsumerId,
        product_id: ProductId,
    ) -> Result<Option<CartLine>> {
        Ok(self
            .state
            .read()
            .await
            .cart
            .get(&(consumer_id, product_id))
            .cloned())
    }

    async fn upsert_cart_line(&self, line: CartLine) -> Result<()> {
        self.state
            .write()
            .await
            .cart
            .insert((line.consumer_id, line.product_id), line);
        Ok(())
    }

    async fn delete_cart_line(
        &self,
        consumer_id: ConsumerId,
        product_id: ProductId,
    ) -> Result<bool> {
        Ok(self
            .state
            .write()
            .await
            .cart
            .remove(&(consumer_id, product_id))
            .is_some())
    }

    async fn clear_cart(&self, consumer_id: ConsumerId) -> Result<()> {
        self.state
            .write()
            .await
            .cart
            .retain(|(c, _), _| *c != consumer_id);
        Ok(())
    }

    async fn cart_with_products(
        &self,
        consumer_id: ConsumerId,
    ) -> Result<Vec<(CartLine, Option<Product>)>> {
        let state = self.state.read().await;
        let mut lines: Vec<_> = state
            .cart
            .values()
            .filter(|l| l.consumer_id == consumer_id)
            .cloned()
            .collect();
        lines.sort_by_key(|l| l.added_at);
        Ok(lines
            .into_iter()
            .map(|l| {
                let product = state.products.get(&l.product_id).cloned();
                (l, product)
            })
            .collect())
    }

    async fn delete_invalid_cart_lines(&self, consumer_id: ConsumerId) -> Result<Vec<ProductId>> {
        let mut state = self.state.write().await;
        let today = Utc::now().date_naive();
        let week = Week::current();

        let stale: Vec<ProductId> = state
            .cart
            .values()
            .filter(|l| l.consumer_id == consumer_id)
            .filter(|l| {
                !state
                    .products
                    .get(&l.product_id)
                    .is_some_and(|p| p.is_valid_at(today, week))
            })
            .map(|l| l.product_id)
            .collect();

        for product_id in &stale {
            state.cart.remove(&(consumer_id, *product_id));
        }
        Ok(stale)
    }

    async fn commit_checkout(
        &self,
        consumer_id: ConsumerId,
        orders: Vec<NewOrder>,
    ) -> Result<Vec<Order>> {
        let mut state = self.state.write().await;
        let today = Utc::now().date_naive();
        let week = Week::current();

        // Authoritative pass: re-check validity and stock for every line
        // before mutating anything, so a failure leaves no effects.
        // Quantities are accumulated per product in case the same product
        // shows up in more than one line.
        let mut requested: HashMap<ProductId, u32> = HashMap::new();
        for new_order in &orders {
            for line in &new_order.lines {
                let product = state
                    .products
                    .get(&line.product_id)
                    .ok_or(StoreError::ProductUnavailable {
                        product_id: line.product_id,
                    })?;
                if !product.is_valid_at(today, week) {
                    return Err(StoreError::ProductUnavailable {
                        product_id: line.product_id,
                    });
                }
                let total = requested.entry(line.product_id).or_default();
                *total += line.quantity;
                if product.stock < *total {
                    return Err(StoreError::StockConflict {
                        product_id: line.product_id,
                        requested: *total,
                        available: product.stock,
                    });
                }
            }
        }

        let now = Utc::now();
        let mut created = Vec::with_capacity(orders.len());
        for new_order in orders {
            let order_id = OrderId::new();
            let mut lines = Vec::with_capacity(new_order.lines.len());
            for line in &new_order.lines {
                let product = state
                    .products
                    .get_mut(&line.product_id)
                    .expect("checked above");
                product.stock -= line.quantity;
                lines.push(OrderLine {
                    order_id,
                    product_id: line.product_id,
                    product_name: line.product_name.clone(),
                    unit_price: line.unit_price,
                    quantity: line.quantity,
                    subtotal: line.subtotal(),
                });
            }

            let order = Order {
                id: order_id,
                number: new_order.number,
                consumer_id,
                vendor_id: new_order.vendor_id,
                total: lines.iter().map(|l| l.subtotal).sum(),
                status: OrderStatus::Pending,
                address_id: new_order.address_id,
                notes: new_order.notes,
                created_at: now,
                updated_at: now,
            };
            state.order_lines.insert(order_id, lines);
            state.orders.insert(order_id, order.clone());
            created.push(order);
        }

        state.cart.retain(|(c, _), _| *c != consumer_id);
        Ok(created)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&id).cloned())
    }

    async fn get_order_lines(&self, id: OrderId) -> Result<Vec<OrderLine>> {
        Ok(self
            .state
            .read()
            .await
            .order_lines
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn orders_for_consumer(&self, consumer_id: ConsumerId) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.consumer_id == consumer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn transition_order(
        &self,
        id: OrderId,
        target: OrderStatus,
        note: Option<String>,
    ) -> Result<Order> {
        let mut state = self.state.write().await;

        let current = state
            .orders
            .get(&id)
            .ok_or(StoreError::OrderNotFound(id))?
            .status;
        if !current.can_transition_to(target) {
            return Err(StoreError::InvalidTransition {
                current,
                attempted: target,
            });
        }

        if target == OrderStatus::Cancelled {
            let lines = state.order_lines.get(&id).cloned().unwrap_or_default();
            for line in lines {
                if let Some(product) = state.products.get_mut(&line.product_id) {
                    product.stock += line.quantity;
                }
            }
        }

        let order = state.orders.get_mut(&id).expect("checked above");
        order.status = target;
        if let Some(note) = note {
            order.notes = Some(match order.notes.take() {
                Some(existing) => format!("{existing}\n{note}"),
                None => note,
            });
        }
        order.updated_at = Utc::now();
        Ok(order.clone())
    }
}
