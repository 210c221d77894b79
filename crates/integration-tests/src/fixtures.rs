//! Products, pricing and an engine harness shared by the integration tests.

use std::sync::Arc;
use std::time::Duration;

use cartsync_core::{Cart, CurrencyCode, PricingPolicy, Product, ProductId};
use cartsync_engine::{CartEngine, MemoryCartStore, SessionSignal};
use rust_decimal::Decimal;

/// How long a test waits for the engine to reach an expected state.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

/// A product with no discount and a minimum order quantity of 1.
#[must_use]
pub fn product(id: &str, price: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        price: Decimal::from(price),
        discounted_price: None,
        stock: 100,
        min_order_quantity: 1,
        max_order_quantity: None,
        image: Some(format!("https://cdn.test/{id}.jpg")),
    }
}

/// A product whose cart line may not drop below `minimum`.
#[must_use]
pub fn product_with_minimum(id: &str, price: i64, minimum: u32) -> Product {
    Product {
        min_order_quantity: minimum,
        ..product(id, price)
    }
}

/// Pricing with no delivery fee.
#[must_use]
pub const fn free_delivery() -> PricingPolicy {
    PricingPolicy::new(Decimal::ZERO, CurrencyCode::USD)
}

/// Pricing with a flat delivery fee.
#[must_use]
pub fn flat_delivery(fee: i64) -> PricingPolicy {
    PricingPolicy::new(Decimal::from(fee), CurrencyCode::USD)
}

/// A running engine over an in-memory remote store.
pub struct Harness {
    pub remote: Arc<MemoryCartStore>,
    pub session: SessionSignal,
    pub engine: CartEngine,
}

impl Harness {
    /// Start a logged-in engine whose catalog holds `products`.
    pub async fn start(products: impl IntoIterator<Item = Product>) -> Self {
        Self::start_with(products, true, free_delivery()).await
    }

    /// Start an engine with explicit session state and pricing.
    pub async fn start_with(
        products: impl IntoIterator<Item = Product>,
        authenticated: bool,
        pricing: PricingPolicy,
    ) -> Self {
        let remote = Arc::new(MemoryCartStore::with_catalog(products));
        let session = SessionSignal::new(authenticated);
        let engine = CartEngine::start(
            Arc::<MemoryCartStore>::clone(&remote),
            session.clone(),
            pricing,
        )
        .await;
        Self {
            remote,
            session,
            engine,
        }
    }

    /// Wait until the published cart satisfies `predicate`.
    ///
    /// # Panics
    ///
    /// Panics if the cart does not get there within [`WAIT_TIMEOUT`].
    pub async fn wait_for(&self, predicate: impl Fn(&Cart) -> bool) {
        let mut rx = self.engine.subscribe();
        let reached = tokio::time::timeout(WAIT_TIMEOUT, rx.wait_for(predicate)).await;
        assert!(
            matches!(reached, Ok(Ok(_))),
            "cart did not reach the expected state in time"
        );
    }
}
