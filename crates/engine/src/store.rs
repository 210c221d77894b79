//! Cart State Store: the single in-memory cart value.
//!
//! The cart lives in a `watch` channel so the presentation layer can hold a
//! receiver and re-render on every change. Writers replace the whole value;
//! nothing here performs I/O.

use std::sync::Arc;

use cartsync_core::{Cart, PricingPolicy};
use tokio::sync::watch;

/// Shared handle to the local cart.
#[derive(Debug, Clone)]
pub struct CartStateStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    tx: watch::Sender<Cart>,
    pricing: PricingPolicy,
}

impl CartStateStore {
    /// Create a store holding an empty cart.
    #[must_use]
    pub fn new(pricing: PricingPolicy) -> Self {
        let (tx, _rx) = watch::channel(Cart::empty(pricing));
        Self {
            inner: Arc::new(StoreInner { tx, pricing }),
        }
    }

    /// Pricing constants applied to every cart in this store.
    #[must_use]
    pub fn pricing(&self) -> PricingPolicy {
        self.inner.pricing
    }

    /// Clone of the current cart.
    #[must_use]
    pub fn snapshot(&self) -> Cart {
        self.inner.tx.borrow().clone()
    }

    /// Replace the cart wholesale.
    pub fn replace(&self, cart: Cart) {
        self.inner.tx.send_replace(cart);
    }

    /// Replace the cart with the empty cart.
    pub fn reset(&self) {
        self.replace(Cart::empty(self.inner.pricing));
    }

    /// Read-then-write under one lock.
    ///
    /// `patch` returns the next cart, or `None` to leave the cart (and
    /// observers) untouched. Returns whether the cart was replaced.
    pub fn update(&self, patch: impl FnOnce(&Cart) -> Option<Cart>) -> bool {
        self.inner.tx.send_if_modified(|cart| match patch(cart) {
            Some(next) => {
                *cart = next;
                true
            }
            None => false,
        })
    }

    /// Receiver that observes every cart change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.inner.tx.subscribe()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cartsync_core::{CartItem, CurrencyCode, ItemIdentity, ProductId, ProductSnapshot, recompute};
    use rust_decimal::Decimal;

    use super::*;

    fn pricing() -> PricingPolicy {
        PricingPolicy::new(Decimal::from(5), CurrencyCode::USD)
    }

    fn one_item_cart() -> Cart {
        let snapshot = ProductSnapshot {
            id: ProductId::new("p-1"),
            name: "Pineapple".to_string(),
            image: None,
            price: Decimal::from(10),
            min_order_quantity: 1,
            max_order_quantity: None,
        };
        recompute(
            vec![CartItem::new(ItemIdentity::unconfirmed(), snapshot, 2)],
            Decimal::ZERO,
            None,
            pricing(),
        )
    }

    #[test]
    fn test_starts_empty() {
        let store = CartStateStore::new(pricing());
        let cart = store.snapshot();
        assert!(cart.is_empty());
        assert_eq!(cart.total, Decimal::from(5));
    }

    #[test]
    fn test_replace_and_reset() {
        let store = CartStateStore::new(pricing());
        store.replace(one_item_cart());
        assert_eq!(store.snapshot().item_count(), 2);
        store.reset();
        assert!(store.snapshot().is_empty());
    }

    #[test]
    fn test_update_none_leaves_observers_untouched() {
        let store = CartStateStore::new(pricing());
        let rx = store.subscribe();
        assert!(!store.update(|_| None));
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_subscriber_observes_replace() {
        let store = CartStateStore::new(pricing());
        let mut rx = store.subscribe();
        store.replace(one_item_cart());
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().subtotal, Decimal::from(20));
    }
}
