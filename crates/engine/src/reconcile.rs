//! Reconciliation: replace the local cart with the remote cart.
//!
//! Fetch failures never wipe the local cart; a stale cart beats an empty one.

use std::sync::Arc;

use cartsync_core::recompute;
use rust_decimal::Decimal;
use tracing::{debug, instrument, warn};

use crate::remote::{RemoteCartStore, into_cart_items};
use crate::session::SessionSignal;
use crate::store::CartStateStore;

/// What a reconciliation did to the local cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Session is logged out; the cart was emptied.
    Cleared,
    /// The cart was replaced with `items` remote lines.
    Replaced { items: usize },
    /// The fetch failed; the local cart was kept.
    Kept,
}

/// Pulls authoritative state into the [`CartStateStore`].
#[derive(Clone)]
pub struct Reconciler {
    remote: Arc<dyn RemoteCartStore>,
    store: CartStateStore,
    session: SessionSignal,
}

impl Reconciler {
    /// Create a reconciler.
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteCartStore>,
        store: CartStateStore,
        session: SessionSignal,
    ) -> Self {
        Self {
            remote,
            store,
            session,
        }
    }

    /// Replace the local cart with the remote cart.
    ///
    /// Coupon and discount state is not carried by the remote cart, so the
    /// rebuilt cart always has a zero discount.
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> ReconcileOutcome {
        if !self.session.is_authenticated() {
            self.store.reset();
            debug!("Session logged out; cart emptied");
            return ReconcileOutcome::Cleared;
        }

        let remote = match self.remote.fetch_cart().await {
            Ok(remote) => remote,
            Err(e) => {
                warn!(error = %e, "Cart fetch failed; keeping local cart");
                return ReconcileOutcome::Kept;
            }
        };

        // The session may have ended while the fetch was in flight.
        if !self.session.is_authenticated() {
            self.store.reset();
            debug!("Session ended during fetch; cart emptied");
            return ReconcileOutcome::Cleared;
        }

        let items = into_cart_items(remote);
        let count = items.len();
        self.store.replace(recompute(
            items,
            Decimal::ZERO,
            None,
            self.store.pricing(),
        ));
        debug!(items = count, "Cart reconciled");
        ReconcileOutcome::Replaced { items: count }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use cartsync_core::{PricingPolicy, Product, ProductId};

    use super::*;
    use crate::remote::{FailureMode, MemoryCartStore};

    fn product(id: &str, price: i64, discounted: Option<i64>) -> Product {
        Product {
            id: ProductId::new(id),
            name: id.to_string(),
            price: Decimal::from(price),
            discounted_price: discounted.map(Decimal::from),
            stock: 50,
            min_order_quantity: 1,
            max_order_quantity: None,
            image: None,
        }
    }

    fn setup(
        authenticated: bool,
    ) -> (Arc<MemoryCartStore>, CartStateStore, SessionSignal, Reconciler) {
        let remote = Arc::new(MemoryCartStore::with_catalog([
            product("a", 100, None),
            product("b", 50, Some(40)),
        ]));
        let store = CartStateStore::new(PricingPolicy::default());
        let session = SessionSignal::new(authenticated);
        let reconciler = Reconciler::new(remote.clone(), store.clone(), session.clone());
        (remote, store, session, reconciler)
    }

    #[tokio::test]
    async fn test_logged_out_empties_cart_without_fetch() {
        let (remote, store, _session, reconciler) = setup(false);
        assert_eq!(reconciler.reconcile().await, ReconcileOutcome::Cleared);
        assert!(store.snapshot().is_empty());
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_replaces_with_remote_contents() {
        let (remote, store, _session, reconciler) = setup(true);
        remote.add_delta(&ProductId::new("a"), 2).await.unwrap();
        remote.add_delta(&ProductId::new("b"), 1).await.unwrap();

        let outcome = reconciler.reconcile().await;

        assert_eq!(outcome, ReconcileOutcome::Replaced { items: 2 });
        let cart = store.snapshot();
        assert_eq!(cart.subtotal, Decimal::from(240));
        assert_eq!(cart.total, Decimal::from(240));
        assert!(cart.items.iter().all(|item| item.identity.is_confirmed()));
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_local_cart() {
        let (remote, store, _session, reconciler) = setup(true);
        remote.add_delta(&ProductId::new("a"), 1).await.unwrap();
        reconciler.reconcile().await;
        let before = store.snapshot();

        remote.fail_next(FailureMode::Unavailable);
        assert_eq!(reconciler.reconcile().await, ReconcileOutcome::Kept);
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn test_reconcile_drops_local_discount() {
        let (remote, store, _session, reconciler) = setup(true);
        remote.add_delta(&ProductId::new("a"), 1).await.unwrap();
        store.update(|cart| {
            Some(recompute(
                cart.items.clone(),
                Decimal::from(10),
                Some("TEN".to_string()),
                cart.pricing(),
            ))
        });

        reconciler.reconcile().await;

        let cart = store.snapshot();
        assert_eq!(cart.discount, Decimal::ZERO);
        assert!(cart.coupon_code.is_none());
    }
}
