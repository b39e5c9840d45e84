//! Persistence layer for the feira marketplace.
//!
//! The [`MarketStore`] trait is the synchronization point of the whole
//! system: every multi-entity atomic scope (the checkout commit, a status
//! transition with stock restoration) is a single trait method so each
//! backend can make it failure-atomic. [`PostgresMarketStore`] uses one
//! database transaction per scope; [`InMemoryMarketStore`] uses one write
//! lock and is intended for tests.

pub mod error;
pub mod memory;
pub mod model;
pub mod postgres;
pub mod status;
pub mod store;

pub use common::{AddressId, ConsumerId, Money, OrderId, ProductId, VendorId, Week};
pub use error::{Result, StoreError};
pub use memory::InMemoryMarketStore;
pub use model::{CartLine, NewOrder, NewOrderLine, Order, OrderLine, Product};
pub use postgres::PostgresMarketStore;
pub use status::OrderStatus;
pub use store::MarketStore;
