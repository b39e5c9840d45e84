//! Shared value types for the feira marketplace.
//!
//! Typed identifiers, integer-cents money, and the ISO week window that
//! governs product validity.

pub mod ids;
pub mod money;
pub mod week;

pub use ids::{AddressId, ConsumerId, OrderId, ProductId, VendorId};
pub use money::Money;
pub use week::Week;
