//! Read-only product records supplied by the catalog.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::ProductId;

/// A catalog product.
///
/// Owned by the catalog; the cart never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// List price per unit.
    pub price: Decimal,
    /// Sale price per unit, when the product is discounted.
    pub discounted_price: Option<Decimal>,
    /// Units available.
    pub stock: u32,
    /// Smallest quantity a cart line may hold (0 is treated as 1).
    pub min_order_quantity: u32,
    /// Largest quantity a cart line may hold, if limited.
    pub max_order_quantity: Option<u32>,
    /// Primary image URL.
    pub image: Option<String>,
}

impl Product {
    /// Unit price the customer pays: the discounted price when present.
    #[must_use]
    pub fn effective_price(&self) -> Decimal {
        self.discounted_price.unwrap_or(self.price)
    }

    /// Minimum order quantity, never below 1.
    #[must_use]
    pub fn minimum_quantity(&self) -> u32 {
        self.min_order_quantity.max(1)
    }

    /// Snapshot of the fields a cart line needs for display and pricing.
    #[must_use]
    pub fn snapshot(&self) -> ProductSnapshot {
        ProductSnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            image: self.image.clone(),
            price: self.effective_price(),
            min_order_quantity: self.minimum_quantity(),
            max_order_quantity: self.max_order_quantity,
        }
    }
}

/// Denormalized product fields carried by a cart item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    /// Product ID.
    pub id: ProductId,
    /// Display name at the time of the snapshot.
    pub name: String,
    /// Primary image URL.
    pub image: Option<String>,
    /// Effective unit price at the time of the snapshot.
    pub price: Decimal,
    /// Minimum order quantity (at least 1).
    pub min_order_quantity: u32,
    /// Maximum order quantity, if limited.
    pub max_order_quantity: Option<u32>,
}
