//! Mutation Coordinator: the public cart mutations.
//!
//! Every mutation carries a [`ConsistencyPolicy`] and runs through one
//! pipeline:
//!
//! | Mutation        | Policy              | Local cart                     | Remote call        |
//! |-----------------|---------------------|--------------------------------|--------------------|
//! | Add             | `PessimisticCommit` | reconciled after remote success | awaited            |
//! | Remove          | `PessimisticCommit` | reconciled after remote success | awaited            |
//! | Clear           | `OptimisticPatch`   | emptied immediately            | background         |
//! | Shift quantity  | `OptimisticPatch`   | patched immediately            | background (delta) |
//!
//! Background syncs are never rolled back or retried. A failed one leaves
//! the local cart ahead of the remote cart until the next reconciliation.

use std::sync::{Arc, Mutex, PoisonError};

use cartsync_core::{Cart, Product, ProductId, recompute};
use rust_decimal::Decimal;
use tokio::task::JoinSet;
use tracing::{debug, error, instrument, warn};

use crate::error::CartError;
use crate::reconcile::Reconciler;
use crate::remote::{RemoteCartStore, RemoteError};
use crate::session::SessionSignal;
use crate::store::CartStateStore;

/// How a mutation keeps the local and remote carts consistent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsistencyPolicy {
    /// Remote first; the local cart changes only via reconciliation.
    PessimisticCommit,
    /// Local first; the remote call runs in the background.
    OptimisticPatch,
}

/// A cart mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Add `quantity` units of a product.
    Add { product_id: ProductId, quantity: u32 },
    /// Remove a product's line.
    Remove { product_id: ProductId },
    /// Remove every line.
    Clear,
    /// Set a line to `quantity`, sending `delta` to the remote store.
    ShiftQuantity {
        product_id: ProductId,
        quantity: u32,
        delta: i64,
    },
}

impl Mutation {
    /// The consistency policy this mutation runs under.
    #[must_use]
    pub const fn policy(&self) -> ConsistencyPolicy {
        match self {
            Self::Add { .. } | Self::Remove { .. } => ConsistencyPolicy::PessimisticCommit,
            Self::Clear | Self::ShiftQuantity { .. } => ConsistencyPolicy::OptimisticPatch,
        }
    }

    /// Generic message shown when the store gives none.
    const fn failure_message(&self) -> &'static str {
        match self {
            Self::Add { .. } => "Failed to add item to cart",
            Self::Remove { .. } => "Failed to remove item from cart",
            Self::Clear => "Failed to clear cart",
            Self::ShiftQuantity { .. } => "Failed to update cart",
        }
    }

    /// The local cart this mutation produces, for optimistic mutations.
    fn patch(&self, cart: &Cart) -> Option<Cart> {
        match self {
            Self::Clear => Some(Cart::empty(cart.pricing())),
            Self::ShiftQuantity {
                product_id,
                quantity,
                ..
            } => {
                cart.find(product_id)?;
                let items = cart
                    .items
                    .iter()
                    .map(|item| {
                        if item.product_id() == product_id {
                            item.with_quantity(*quantity)
                        } else {
                            item.clone()
                        }
                    })
                    .collect();
                Some(recompute(
                    items,
                    cart.discount,
                    cart.coupon_code.clone(),
                    cart.pricing(),
                ))
            }
            Self::Add { .. } | Self::Remove { .. } => None,
        }
    }

    /// Issue the remote call for this mutation.
    async fn send(&self, remote: &dyn RemoteCartStore) -> Result<(), RemoteError> {
        match self {
            Self::Add {
                product_id,
                quantity,
            } => remote.add_delta(product_id, i64::from(*quantity)).await,
            Self::Remove { product_id } => remote.remove_item(product_id).await,
            Self::Clear => remote.clear().await,
            Self::ShiftQuantity {
                product_id, delta, ..
            } => remote.add_delta(product_id, *delta).await,
        }
    }
}

/// Result of [`MutationCoordinator::update_quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityChange {
    /// The product has no line in the cart; nothing happened.
    NotInCart,
    /// The line already had the requested quantity; nothing happened.
    Unchanged,
    /// The local line was patched and `delta` sent in the background.
    Patched { delta: i64 },
    /// The quantity was non-positive and the line was removed.
    Removed,
}

/// Applies cart mutations to the local cart and the remote store.
#[derive(Clone)]
pub struct MutationCoordinator {
    remote: Arc<dyn RemoteCartStore>,
    store: CartStateStore,
    session: SessionSignal,
    reconciler: Reconciler,
    background: Arc<Mutex<JoinSet<()>>>,
}

impl MutationCoordinator {
    /// Create a coordinator.
    #[must_use]
    pub fn new(
        remote: Arc<dyn RemoteCartStore>,
        store: CartStateStore,
        session: SessionSignal,
        reconciler: Reconciler,
    ) -> Self {
        Self {
            remote,
            store,
            session,
            reconciler,
            background: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of `product` (a delta, not a set).
    ///
    /// # Errors
    ///
    /// - `AuthenticationRequired` when logged out (nothing is sent)
    /// - `InvalidQuantity` when `quantity` is 0 (nothing is sent)
    /// - `Remote` when the store fails; the local cart is unchanged
    #[instrument(skip(self, product), fields(product_id = %product.id))]
    pub async fn add_to_cart(&self, product: &Product, quantity: u32) -> Result<(), CartError> {
        if !self.session.is_authenticated() {
            debug!("Add rejected: not authenticated");
            return Err(CartError::AuthenticationRequired);
        }
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        self.run(Mutation::Add {
            product_id: product.id.clone(),
            quantity,
        })
        .await
    }

    /// Set a line's quantity.
    ///
    /// Works on [`Self::cart`], so nothing happens while logged out.
    /// Quantities at or below zero remove the line. The local cart is
    /// patched before this returns; the remote delta is sent in the
    /// background and its failure is only logged.
    ///
    /// # Errors
    ///
    /// - `BelowMinimum` when `0 < quantity < minimum order quantity`
    /// - `InvalidQuantity` when `quantity` exceeds `u32::MAX`
    /// - Any error of [`Self::remove_from_cart`] for non-positive quantities
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_quantity(
        &self,
        product_id: &ProductId,
        quantity: i64,
    ) -> Result<QuantityChange, CartError> {
        let cart = self.cart();
        let Some(item) = cart.find(product_id) else {
            debug!("Quantity update ignored: product not in cart");
            return Ok(QuantityChange::NotInCart);
        };

        let minimum = item.minimum_quantity();
        if quantity > 0 && quantity < i64::from(minimum) {
            return Err(CartError::BelowMinimum { minimum });
        }

        if quantity <= 0 {
            self.remove_from_cart(product_id).await?;
            return Ok(QuantityChange::Removed);
        }

        let quantity = u32::try_from(quantity).map_err(|_| CartError::InvalidQuantity)?;
        let delta = i64::from(quantity) - i64::from(item.quantity);
        if delta == 0 {
            return Ok(QuantityChange::Unchanged);
        }

        self.run(Mutation::ShiftQuantity {
            product_id: product_id.clone(),
            quantity,
            delta,
        })
        .await?;
        Ok(QuantityChange::Patched { delta })
    }

    /// Remove a product's line.
    ///
    /// # Errors
    ///
    /// - `AuthenticationRequired` when logged out (nothing is sent)
    /// - `Remote` when the store fails; the local cart is unchanged
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_from_cart(&self, product_id: &ProductId) -> Result<(), CartError> {
        if !self.session.is_authenticated() {
            debug!("Remove rejected: not authenticated");
            return Err(CartError::AuthenticationRequired);
        }
        self.run(Mutation::Remove {
            product_id: product_id.clone(),
        })
        .await
    }

    /// Empty the local cart now and clear the remote cart in the background.
    ///
    /// While logged out only the local cart is emptied.
    ///
    /// # Errors
    ///
    /// Never fails; a failed remote clear is only logged.
    #[instrument(skip(self))]
    pub async fn clear_cart(&self) -> Result<(), CartError> {
        if !self.session.is_authenticated() {
            self.store.reset();
            debug!("Clear while logged out: local cart emptied, nothing sent");
            return Ok(());
        }
        self.run(Mutation::Clear).await
    }

    /// Apply a precomputed discount to the local cart.
    ///
    /// The discount lives only in the local cart and is dropped by the next
    /// reconciliation.
    pub fn apply_discount(&self, discount: Decimal, coupon_code: Option<String>) {
        self.store.update(|cart| {
            Some(recompute(
                cart.items.clone(),
                discount,
                coupon_code,
                cart.pricing(),
            ))
        });
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The current cart.
    ///
    /// Always empty while the session is logged out, even before the
    /// session watcher has caught up with the flip.
    #[must_use]
    pub fn cart(&self) -> Cart {
        if self.session.is_authenticated() {
            self.store.snapshot()
        } else {
            Cart::empty(self.store.pricing())
        }
    }

    /// Total units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.cart().item_count()
    }

    /// Units of one product, 0 when absent.
    #[must_use]
    pub fn item_quantity(&self, product_id: &ProductId) -> u32 {
        self.cart().item_quantity(product_id)
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    async fn run(&self, mutation: Mutation) -> Result<(), CartError> {
        match mutation.policy() {
            ConsistencyPolicy::PessimisticCommit => self.commit(mutation).await,
            ConsistencyPolicy::OptimisticPatch => {
                self.patch(mutation);
                Ok(())
            }
        }
    }

    async fn commit(&self, mutation: Mutation) -> Result<(), CartError> {
        if let Err(e) = mutation.send(self.remote.as_ref()).await {
            error!(error = %e, mutation = ?mutation, "Cart mutation failed");
            return Err(CartError::from_remote(&e, mutation.failure_message()));
        }
        self.reconciler.reconcile().await;
        Ok(())
    }

    fn patch(&self, mutation: Mutation) {
        if !self.store.update(|cart| mutation.patch(cart)) {
            debug!(mutation = ?mutation, "Local patch found nothing to change");
            // The line vanished since the delta was computed
            if matches!(mutation, Mutation::ShiftQuantity { .. }) {
                return;
            }
        }
        self.spawn_sync(mutation);
    }

    fn spawn_sync(&self, mutation: Mutation) {
        let remote = Arc::clone(&self.remote);
        let mut tasks = self
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Reap finished syncs so the set does not grow without bound
        while tasks.try_join_next().is_some() {}
        tasks.spawn(async move {
            match mutation.send(remote.as_ref()).await {
                Ok(()) => debug!(mutation = ?mutation, "Background cart sync applied"),
                Err(e) => warn!(
                    error = %e,
                    mutation = ?mutation,
                    "Background cart sync failed; local cart not rolled back"
                ),
            }
        });
    }

    /// Wait for every background sync spawned so far.
    pub async fn settle(&self) {
        let mut tasks = std::mem::take(
            &mut *self
                .background
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "Background cart sync task aborted");
            }
        }
    }
}
