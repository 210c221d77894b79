//! Engine facade wiring the store, reconciler and coordinator together.
//!
//! The engine also watches the session signal and reconciles on every flip,
//! so logging in loads the remote cart and logging out empties the local
//! one.

use std::sync::{Arc, Mutex, PoisonError};

use cartsync_core::{Cart, PricingPolicy, Product, ProductId};
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, instrument};

use crate::coordinator::{MutationCoordinator, QuantityChange};
use crate::error::CartError;
use crate::reconcile::{ReconcileOutcome, Reconciler};
use crate::remote::RemoteCartStore;
use crate::session::SessionSignal;
use crate::store::CartStateStore;

/// A running cart synchronization engine.
pub struct CartEngine {
    store: CartStateStore,
    session: SessionSignal,
    reconciler: Reconciler,
    coordinator: MutationCoordinator,
    watcher: Mutex<Option<JoinHandle<()>>>,
}

impl CartEngine {
    /// Build the engine, run the initial reconciliation and start watching
    /// the session signal.
    ///
    /// Must be called from within a Tokio runtime.
    #[instrument(skip_all)]
    pub async fn start(
        remote: Arc<dyn RemoteCartStore>,
        session: SessionSignal,
        pricing: PricingPolicy,
    ) -> Self {
        let store = CartStateStore::new(pricing);
        let reconciler = Reconciler::new(Arc::clone(&remote), store.clone(), session.clone());
        let coordinator = MutationCoordinator::new(
            remote,
            store.clone(),
            session.clone(),
            reconciler.clone(),
        );

        // Subscribe before the initial reconcile so no flip is missed
        let signal = session.subscribe();
        let outcome = reconciler.reconcile().await;
        info!(?outcome, "Cart engine started");

        let watcher = tokio::spawn(watch_session(signal, reconciler.clone()));

        Self {
            store,
            session,
            reconciler,
            coordinator,
            watcher: Mutex::new(Some(watcher)),
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// The current cart.
    ///
    /// Always empty while the session is logged out, even before the
    /// session watcher has caught up with the flip.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.coordinator.cart()
    }

    /// Receiver that observes every change to the local cart.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.store.subscribe()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.coordinator.item_count()
    }

    /// Units of one product, 0 when absent.
    #[must_use]
    pub fn item_quantity(&self, product_id: &ProductId) -> u32 {
        self.coordinator.item_quantity(product_id)
    }

    /// The session signal this engine observes.
    #[must_use]
    pub const fn session(&self) -> &SessionSignal {
        &self.session
    }

    /// The mutation coordinator.
    #[must_use]
    pub const fn coordinator(&self) -> &MutationCoordinator {
        &self.coordinator
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// See [`MutationCoordinator::add_to_cart`].
    ///
    /// # Errors
    ///
    /// See [`MutationCoordinator::add_to_cart`].
    pub async fn add_to_cart(&self, product: &Product, quantity: u32) -> Result<(), CartError> {
        self.coordinator.add_to_cart(product, quantity).await
    }

    /// See [`MutationCoordinator::update_quantity`].
    ///
    /// # Errors
    ///
    /// See [`MutationCoordinator::update_quantity`].
    pub async fn update_quantity(
        &self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<QuantityChange, CartError> {
        self.coordinator.update_quantity(product_id, quantity).await
    }

    /// See [`MutationCoordinator::remove_from_cart`].
    ///
    /// # Errors
    ///
    /// See [`MutationCoordinator::remove_from_cart`].
    pub async fn remove_from_cart(&self, product_id: &ProductId) -> Result<(), CartError> {
        self.coordinator.remove_from_cart(product_id).await
    }

    /// See [`MutationCoordinator::clear_cart`].
    ///
    /// # Errors
    ///
    /// See [`MutationCoordinator::clear_cart`].
    pub async fn clear_cart(&self) -> Result<(), CartError> {
        self.coordinator.clear_cart().await
    }

    /// See [`MutationCoordinator::apply_discount`].
    pub fn apply_discount(&self, discount: Decimal, coupon_code: Option<String>) {
        self.coordinator.apply_discount(discount, coupon_code);
    }

    /// Reconcile with the remote cart now.
    pub async fn refresh(&self) -> ReconcileOutcome {
        self.reconciler.reconcile().await
    }

    /// Wait for every background sync spawned so far.
    pub async fn settle(&self) {
        self.coordinator.settle().await;
    }

    /// Stop watching the session signal and wait for background syncs.
    pub async fn shutdown(&self) {
        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(watcher) = watcher {
            watcher.abort();
        }
        self.settle().await;
        info!("Cart engine stopped");
    }
}

impl Drop for CartEngine {
    fn drop(&mut self) {
        if let Some(watcher) = self
            .watcher
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            watcher.abort();
        }
    }
}

/// Reconcile whenever the session signal flips.
///
/// Rapid flips coalesce; the reconcile reads the signal's latest value, so
/// the cart always ends in the state for the final value.
async fn watch_session(mut signal: watch::Receiver<bool>, reconciler: Reconciler) {
    while signal.changed().await.is_ok() {
        let authenticated = *signal.borrow_and_update();
        info!(authenticated, "Session signal changed");
        reconciler.reconcile().await;
    }
}
