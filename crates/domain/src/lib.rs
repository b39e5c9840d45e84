//! Cart-to-order conversion engine for the feira marketplace.
//!
//! This crate turns a mutable multi-vendor cart into immutable per-vendor
//! orders:
//! - [`CartService`] owns cart mutations and the advisory validation pass
//! - [`validation`] classifies each cart line against live catalog state
//! - [`split`] groups validated lines into one order per vendor
//! - [`CheckoutService`] drives the all-or-nothing conversion
//! - [`OrderLifecycle`] governs every later status change, including the
//!   stock-restoring cancellation

pub mod cart;
pub mod checkout;
pub mod error;
pub mod lifecycle;
pub mod order_number;
pub mod split;
pub mod validation;

pub use cart::{CartLineView, CartService, CartView};
pub use checkout::CheckoutService;
pub use error::CoreError;
pub use lifecycle::OrderLifecycle;
pub use split::{VendorGroup, split_by_vendor};
pub use validation::{IssueKind, LineIssue, ValidatedLine, ValidationReport, validate_lines};
