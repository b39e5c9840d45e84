//! Persistent records: products, cart lines, orders and order lines.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use common::{AddressId, ConsumerId, Money, OrderId, ProductId, VendorId, Week};

use crate::status::OrderStatus;

/// A catalog product.
///
/// Owned by its vendor; the store only ever adjusts the `stock` field, and
/// only through the checkout commit and cancellation restore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub vendor_id: VendorId,
    pub name: String,
    pub image_url: Option<String>,
    /// Live price; cart and order lines carry their own snapshots.
    pub price: Money,
    pub stock: u32,
    pub active: bool,
    /// The rotation week this product is assigned to.
    pub week: Week,
    pub expires_on: NaiveDate,
}

impl Product {
    /// Whether the product can be purchased at the given moment.
    ///
    /// Validity is a calendar comparison, not a stored flag: a product
    /// assigned to last week becomes invalid on Monday without any write.
    pub fn is_valid_at(&self, today: NaiveDate, current_week: Week) -> bool {
        self.active && self.week == current_week && self.expires_on >= today
    }

    /// Whether the product can be purchased right now (UTC).
    pub fn is_valid_now(&self) -> bool {
        self.is_valid_at(Utc::now().date_naive(), Week::current())
    }
}

/// One line of a consumer's cart.
///
/// `unit_price` is the price snapshotted when the line was added or last
/// re-quantified; it may legitimately differ from the product's live price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub consumer_id: ConsumerId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
    pub added_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartLine {
    /// Creates a fresh line snapshotting the given price now.
    pub fn new(
        consumer_id: ConsumerId,
        product_id: ProductId,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        let now = Utc::now();
        Self {
            consumer_id,
            product_id,
            quantity,
            unit_price,
            added_at: now,
            updated_at: now,
        }
    }

    /// Billing subtotal: quantity times the snapshotted unit price.
    pub fn subtotal(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// A placed order. Immutable except for `status`, `notes` and `updated_at`.
///
/// An order never spans more than one vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-readable unique order number.
    pub number: String,
    pub consumer_id: ConsumerId,
    pub vendor_id: VendorId,
    pub total: Money,
    pub status: OrderStatus,
    pub address_id: AddressId,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An immutable receipt row: what was bought, under which name, at which
/// price. Decoupled from any later edit to the product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
    pub subtotal: Money,
}

/// An order to be created by the checkout commit, one per vendor group.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub number: String,
    pub vendor_id: VendorId,
    pub address_id: AddressId,
    pub notes: Option<String>,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrder {
    /// Order total: the sum of line subtotals.
    pub fn total(&self) -> Money {
        self.lines.iter().map(NewOrderLine::subtotal).sum()
    }
}

/// A line of a [`NewOrder`], carrying the snapshots to copy into the
/// receipt.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Money,
    pub quantity: u32,
}

impl NewOrderLine {
    /// Line subtotal: quantity times the snapshotted unit price.
    pub fn subtotal(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}
