//! Cart, cart items and the totals recomputation.
//!
//! # Invariants
//!
//! - `subtotal` is the sum of every item's `total`
//! - `total = subtotal + delivery_fee - discount`
//! - `total` may be negative; validating discounts is the coupon logic's job
//!
//! [`recompute`] is the only function that derives these values.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ItemIdentity, ProductId};
use super::price::{CurrencyCode, format_amount};
use super::product::ProductSnapshot;

/// Externally supplied pricing constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct PricingPolicy {
    /// Flat delivery fee added to every cart.
    pub delivery_fee: Decimal,
    /// Currency all amounts are expressed in.
    pub currency_code: CurrencyCode,
}

impl PricingPolicy {
    /// Create a pricing policy.
    #[must_use]
    pub const fn new(delivery_fee: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            delivery_fee,
            currency_code,
        }
    }
}

/// One product line within a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    /// Server-assigned or locally synthesized identity.
    pub identity: ItemIdentity,
    /// Product fields captured when the line was created.
    pub product: ProductSnapshot,
    /// Units in the cart (always positive).
    pub quantity: u32,
    /// `product.price * quantity`.
    pub total: Decimal,
}

impl CartItem {
    /// Create a cart item, computing its line total.
    #[must_use]
    pub fn new(identity: ItemIdentity, product: ProductSnapshot, quantity: u32) -> Self {
        let total = line_total(product.price, quantity);
        Self {
            identity,
            product,
            quantity,
            total,
        }
    }

    /// Copy of this item with a different quantity and a fresh line total.
    #[must_use]
    pub fn with_quantity(&self, quantity: u32) -> Self {
        Self::new(self.identity.clone(), self.product.clone(), quantity)
    }

    /// The product this line refers to.
    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product.id
    }

    /// Minimum order quantity for this line (at least 1).
    #[must_use]
    pub fn minimum_quantity(&self) -> u32 {
        self.product.min_order_quantity.max(1)
    }
}

fn line_total(price: Decimal, quantity: u32) -> Decimal {
    price * Decimal::from(quantity)
}

/// The aggregate of line items plus derived monetary totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    /// Line items in display order.
    pub items: Vec<CartItem>,
    /// Sum of item totals.
    pub subtotal: Decimal,
    /// Delivery fee from the pricing policy.
    pub delivery_fee: Decimal,
    /// Precomputed discount.
    pub discount: Decimal,
    /// `subtotal + delivery_fee - discount`.
    pub total: Decimal,
    /// Coupon the discount came from, if any.
    pub coupon_code: Option<String>,
    /// Currency of every amount above.
    pub currency_code: CurrencyCode,
}

/// Derive a cart from its items and discount.
///
/// Pure and deterministic. Every path that changes cart contents must build
/// the new cart through this function.
#[must_use]
pub fn recompute(
    items: Vec<CartItem>,
    discount: Decimal,
    coupon_code: Option<String>,
    pricing: PricingPolicy,
) -> Cart {
    let subtotal: Decimal = items.iter().map(|item| item.total).sum();
    Cart {
        items,
        subtotal,
        delivery_fee: pricing.delivery_fee,
        discount,
        total: subtotal + pricing.delivery_fee - discount,
        coupon_code,
        currency_code: pricing.currency_code,
    }
}

impl Cart {
    /// An empty cart under the given pricing policy.
    #[must_use]
    pub fn empty(pricing: PricingPolicy) -> Self {
        recompute(Vec::new(), Decimal::ZERO, None, pricing)
    }

    /// The pricing policy this cart was computed with.
    #[must_use]
    pub const fn pricing(&self) -> PricingPolicy {
        PricingPolicy::new(self.delivery_fee, self.currency_code)
    }

    /// Whether the cart has no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total units across all items.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Units of one product in the cart, 0 when absent.
    #[must_use]
    pub fn item_quantity(&self, product_id: &ProductId) -> u32 {
        self.find(product_id).map_or(0, |item| item.quantity)
    }

    /// The line for a product, if present.
    #[must_use]
    pub fn find(&self, product_id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product_id() == product_id)
    }

    /// Subtotal formatted for display.
    #[must_use]
    pub fn display_subtotal(&self) -> String {
        format_amount(self.subtotal, self.currency_code)
    }

    /// Total formatted for display.
    #[must_use]
    pub fn display_total(&self) -> String {
        format_amount(self.total, self.currency_code)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::id::CartItemId;

    fn snapshot(id: &str, price: Decimal) -> ProductSnapshot {
        ProductSnapshot {
            id: ProductId::new(id),
            name: id.to_uppercase(),
            image: None,
            price,
            min_order_quantity: 1,
            max_order_quantity: None,
        }
    }

    fn item(id: &str, price: i64, quantity: u32) -> CartItem {
        CartItem::new(
            ItemIdentity::Confirmed(CartItemId::new(format!("line-{id}"))),
            snapshot(id, Decimal::from(price)),
            quantity,
        )
    }

    #[test]
    fn test_line_total() {
        let line = item("a", 100, 3);
        assert_eq!(line.total, Decimal::from(300));
    }

    #[test]
    fn test_with_quantity_recomputes_line_total() {
        let line = item("a", 100, 2).with_quantity(5);
        assert_eq!(line.quantity, 5);
        assert_eq!(line.total, Decimal::from(500));
        assert_eq!(line.identity, item("a", 100, 2).identity);
    }

    #[test]
    fn test_recompute_sums_items() {
        let items = vec![item("a", 100, 2), item("b", 25, 4)];
        let cart = recompute(items, Decimal::ZERO, None, PricingPolicy::default());
        assert_eq!(cart.subtotal, Decimal::from(300));
        assert_eq!(cart.total, Decimal::from(300));
    }

    #[test]
    fn test_recompute_applies_fee_and_discount() {
        let pricing = PricingPolicy::new(Decimal::from(15), CurrencyCode::USD);
        let cart = recompute(
            vec![item("a", 100, 1)],
            Decimal::from(40),
            Some("SAVE40".to_string()),
            pricing,
        );
        assert_eq!(cart.subtotal, Decimal::from(100));
        assert_eq!(cart.delivery_fee, Decimal::from(15));
        assert_eq!(cart.total, Decimal::from(75));
        assert_eq!(cart.coupon_code.as_deref(), Some("SAVE40"));
    }

    #[test]
    fn test_recompute_allows_negative_total() {
        let cart = recompute(
            vec![item("a", 10, 1)],
            Decimal::from(50),
            None,
            PricingPolicy::default(),
        );
        assert_eq!(cart.total, Decimal::from(-40));
    }

    #[test]
    fn test_recompute_handles_fractional_prices() {
        let line = CartItem::new(
            ItemIdentity::unconfirmed(),
            snapshot("a", Decimal::new(1999, 2)),
            3,
        );
        let cart = recompute(vec![line], Decimal::ZERO, None, PricingPolicy::default());
        assert_eq!(cart.subtotal, Decimal::new(5997, 2));
        assert_eq!(cart.display_total(), "$59.97");
    }

    #[test]
    fn test_empty_cart_total_is_delivery_fee() {
        let pricing = PricingPolicy::new(Decimal::from(5), CurrencyCode::USD);
        let cart = Cart::empty(pricing);
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal, Decimal::ZERO);
        assert_eq!(cart.total, Decimal::from(5));
        assert_eq!(cart.pricing(), pricing);
    }

    #[test]
    fn test_item_queries() {
        let cart = recompute(
            vec![item("a", 1, 2), item("b", 1, 3)],
            Decimal::ZERO,
            None,
            PricingPolicy::default(),
        );
        assert_eq!(cart.item_count(), 5);
        assert_eq!(cart.item_quantity(&ProductId::new("b")), 3);
        assert_eq!(cart.item_quantity(&ProductId::new("zzz")), 0);
        assert!(cart.find(&ProductId::new("a")).is_some());
    }

    #[test]
    fn test_minimum_quantity_never_zero() {
        let mut line = item("a", 1, 1);
        line.product.min_order_quantity = 0;
        assert_eq!(line.minimum_quantity(), 1);
    }

    mod properties {
        use proptest::prelude::*;

        use super::*;

        fn cents(max: i64) -> impl Strategy<Value = Decimal> {
            (0..=max).prop_map(|c| Decimal::new(c, 2))
        }

        fn items() -> impl Strategy<Value = Vec<CartItem>> {
            prop::collection::vec((cents(1_000_000), 1u32..1_000), 0..20).prop_map(|lines| {
                lines
                    .into_iter()
                    .enumerate()
                    .map(|(i, (price, quantity))| {
                        CartItem::new(
                            ItemIdentity::unconfirmed(),
                            snapshot(&format!("p-{i}"), price),
                            quantity,
                        )
                    })
                    .collect()
            })
        }

        proptest! {
            #[test]
            fn recompute_totals_follow_lines(
                items in items(),
                discount in cents(100_000_000),
                fee in cents(100_000),
            ) {
                let pricing = PricingPolicy::new(fee, CurrencyCode::EUR);
                let expected: Decimal = items.iter().map(|item| item.total).sum();

                let cart = recompute(items, discount, None, pricing);

                prop_assert_eq!(cart.subtotal, expected);
                prop_assert_eq!(cart.total, cart.subtotal + fee - discount);
                prop_assert_eq!(cart.delivery_fee, fee);
                prop_assert_eq!(cart.discount, discount);
                prop_assert_eq!(cart.currency_code, CurrencyCode::EUR);
            }

            #[test]
            fn line_total_is_price_times_quantity(
                price in cents(1_000_000),
                quantity in 1u32..10_000,
                requantity in 1u32..10_000,
            ) {
                let item = CartItem::new(ItemIdentity::unconfirmed(), snapshot("p", price), quantity);
                prop_assert_eq!(item.total, price * Decimal::from(quantity));

                let moved = item.with_quantity(requantity);
                prop_assert_eq!(moved.total, price * Decimal::from(requantity));
                prop_assert_eq!(moved.identity, item.identity);
            }
        }
    }
}
