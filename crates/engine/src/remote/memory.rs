//! In-process remote cart store.
//!
//! Behaves like the real store (server-assigned line ids, add-delta
//! semantics, lines dropped when their quantity reaches zero) and records
//! every call. Failures can be injected per call or switched on globally.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use cartsync_core::{Product, ProductId};
use tracing::debug;

use super::types::{RemoteCart, RemoteCartItem, RemoteProduct};
use super::{RemoteCartStore, RemoteError};

/// A call received by a [`MemoryCartStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteCall {
    Fetch,
    AddDelta { product_id: ProductId, quantity: i64 },
    Remove { product_id: ProductId },
    Clear,
}

impl RemoteCall {
    /// Whether the call changes remote state.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        !matches!(self, Self::Fetch)
    }
}

/// How an injected failure presents itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureMode {
    /// The store answers `success: false` with an optional message.
    Rejected(Option<String>),
    /// The store cannot be reached.
    Unavailable,
}

impl FailureMode {
    fn into_error(self) -> RemoteError {
        match self {
            Self::Rejected(message) => RemoteError::Rejected { message },
            Self::Unavailable => RemoteError::Unavailable("cart store unreachable".to_string()),
        }
    }
}

#[derive(Debug)]
struct Line {
    id: String,
    product_id: ProductId,
    quantity: i64,
}

#[derive(Debug, Default)]
struct MemoryState {
    catalog: HashMap<ProductId, Product>,
    lines: Vec<Line>,
    next_line: u64,
    calls: Vec<RemoteCall>,
    queued_failures: VecDeque<FailureMode>,
    offline: bool,
    latency: Option<Duration>,
}

/// Server-authoritative cart kept in memory.
#[derive(Debug, Default)]
pub struct MemoryCartStore {
    state: Mutex<MemoryState>,
}

impl MemoryCartStore {
    /// Create an empty store with an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose catalog holds `products`.
    #[must_use]
    pub fn with_catalog(products: impl IntoIterator<Item = Product>) -> Self {
        let store = Self::new();
        for product in products {
            store.insert_product(product);
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add or replace a catalog product.
    pub fn insert_product(&self, product: Product) {
        self.lock().catalog.insert(product.id.clone(), product);
    }

    /// Make the next call fail with `mode`. Failures queue up in order.
    pub fn fail_next(&self, mode: FailureMode) {
        self.lock().queued_failures.push_back(mode);
    }

    /// Make every call fail as unreachable until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.lock().offline = offline;
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Option<Duration>) {
        self.lock().latency = latency;
    }

    /// Every call received so far, in arrival order.
    #[must_use]
    pub fn calls(&self) -> Vec<RemoteCall> {
        self.lock().calls.clone()
    }

    /// Calls that change remote state.
    #[must_use]
    pub fn mutation_calls(&self) -> Vec<RemoteCall> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.is_mutation())
            .cloned()
            .collect()
    }

    /// Remote quantity for a product, 0 when absent.
    #[must_use]
    pub fn quantity_of(&self, product_id: &ProductId) -> i64 {
        self.lock()
            .lines
            .iter()
            .find(|line| &line.product_id == product_id)
            .map_or(0, |line| line.quantity)
    }

    /// Number of remote lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lock().lines.len()
    }

    /// Record the call, wait out the latency, then check injected failures.
    async fn admit(&self, call: RemoteCall) -> Result<(), RemoteError> {
        let latency = {
            let mut state = self.lock();
            state.calls.push(call);
            state.latency
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.lock();
        if let Some(mode) = state.queued_failures.pop_front() {
            return Err(mode.into_error());
        }
        if state.offline {
            return Err(FailureMode::Unavailable.into_error());
        }
        Ok(())
    }
}

impl MemoryState {
    fn snapshot(&self) -> RemoteCart {
        let items = self
            .lines
            .iter()
            .filter_map(|line| {
                let product = self.catalog.get(&line.product_id)?;
                Some(RemoteCartItem {
                    id: Some(line.id.clone()),
                    product: RemoteProduct {
                        id: product.id.to_string(),
                        name: product.name.clone(),
                        price: product.price,
                        discounted_price: product.discounted_price,
                        images: product.image.iter().cloned().collect(),
                        stock: Some(product.stock),
                        min_order_quantity: Some(product.min_order_quantity),
                        max_order_quantity: product.max_order_quantity,
                    },
                    quantity: line.quantity,
                })
            })
            .collect();
        RemoteCart { items }
    }

    fn add_delta(&mut self, product_id: &ProductId, quantity: i64) -> Result<(), RemoteError> {
        if !self.catalog.contains_key(product_id) {
            return Err(RemoteError::Rejected {
                message: Some("Product not found".to_string()),
            });
        }

        if let Some(index) = self.lines.iter().position(|l| &l.product_id == product_id) {
            let remaining = self.lines.get(index).map_or(0, |l| l.quantity) + quantity;
            if remaining <= 0 {
                self.lines.remove(index);
            } else if let Some(line) = self.lines.get_mut(index) {
                line.quantity = remaining;
            }
            return Ok(());
        }

        if quantity <= 0 {
            return Err(RemoteError::Rejected {
                message: Some("Item not in cart".to_string()),
            });
        }

        self.next_line += 1;
        self.lines.push(Line {
            id: format!("line-{}", self.next_line),
            product_id: product_id.clone(),
            quantity,
        });
        Ok(())
    }

    fn remove(&mut self, product_id: &ProductId) -> Result<(), RemoteError> {
        let before = self.lines.len();
        self.lines.retain(|line| &line.product_id != product_id);
        if self.lines.len() == before {
            return Err(RemoteError::Rejected {
                message: Some("Item not in cart".to_string()),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteCartStore for MemoryCartStore {
    async fn fetch_cart(&self) -> Result<RemoteCart, RemoteError> {
        self.admit(RemoteCall::Fetch).await?;
        Ok(self.lock().snapshot())
    }

    async fn add_delta(&self, product_id: &ProductId, quantity: i64) -> Result<(), RemoteError> {
        self.admit(RemoteCall::AddDelta {
            product_id: product_id.clone(),
            quantity,
        })
        .await?;
        debug!(product_id = %product_id, quantity, "Memory store add delta");
        self.lock().add_delta(product_id, quantity)
    }

    async fn remove_item(&self, product_id: &ProductId) -> Result<(), RemoteError> {
        self.admit(RemoteCall::Remove {
            product_id: product_id.clone(),
        })
        .await?;
        self.lock().remove(product_id)
    }

    async fn clear(&self) -> Result<(), RemoteError> {
        self.admit(RemoteCall::Clear).await?;
        self.lock().lines.clear();
        Ok(())
    }
}
