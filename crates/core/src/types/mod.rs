//! Core types for cartsync.
//!
//! This module provides type-safe wrappers for the cart domain.

pub mod cart;
pub mod id;
pub mod price;
pub mod product;

pub use cart::{Cart, CartItem, PricingPolicy, recompute};
pub use id::*;
pub use price::{CurrencyCode, CurrencyCodeError, format_amount};
pub use product::{Product, ProductSnapshot};
