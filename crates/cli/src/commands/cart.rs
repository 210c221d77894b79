//! Cart commands.
//!
//! Every invocation starts a fresh engine against the configured store,
//! performs one operation, waits for its background sync to settle and
//! prints the resulting cart.

use std::sync::Arc;

use cartsync_core::{Cart, CartItem, Product, ProductId};
use cartsync_engine::{
    CartEngine, CartError, ConfigError, EngineConfig, HttpCartStore, MemoryCartStore,
    QuantityChange, RemoteCartStore, SessionSignal,
};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;

use crate::{Cli, Commands};

/// Errors that can occur while running a cart command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The engine rejected the operation.
    #[error(transparent)]
    Cart(#[from] CartError),
}

/// Run the parsed command.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the operation fails.
pub(crate) async fn run(cli: Cli, config: &EngineConfig) -> Result<(), CommandError> {
    let memory = cli.offline.then(|| Arc::new(MemoryCartStore::new()));
    let remote: Arc<dyn RemoteCartStore> = match &memory {
        Some(memory) => Arc::<MemoryCartStore>::clone(memory),
        None => Arc::new(HttpCartStore::new(config.require_api()?)),
    };

    let session = SessionSignal::new(!cli.logged_out);
    let engine = CartEngine::start(remote, session, config.pricing()).await;

    let result = execute(&engine, memory.as_deref(), cli.command).await;
    engine.shutdown().await;
    result?;

    print_cart(&engine.cart());
    Ok(())
}

async fn execute(
    engine: &CartEngine,
    memory: Option<&MemoryCartStore>,
    command: Commands,
) -> Result<(), CartError> {
    match command {
        Commands::Show => {}
        Commands::Add {
            product_id,
            price,
            quantity,
            min,
            name,
        } => {
            let product = product_from_args(product_id, price, min, name);
            if let Some(memory) = memory {
                memory.insert_product(product.clone());
            }
            engine.add_to_cart(&product, quantity).await?;
            info!(product_id = %product.id, quantity, "Added to cart");
        }
        Commands::Set {
            product_id,
            quantity,
        } => {
            let product_id = ProductId::new(product_id);
            match engine.update_quantity(&product_id, quantity).await? {
                QuantityChange::NotInCart => info!(%product_id, "Product is not in the cart"),
                QuantityChange::Unchanged => info!(%product_id, "Quantity unchanged"),
                QuantityChange::Patched { delta } => {
                    info!(%product_id, delta, "Quantity updated");
                }
                QuantityChange::Removed => info!(%product_id, "Removed from cart"),
            }
        }
        Commands::Remove { product_id } => {
            let product_id = ProductId::new(product_id);
            engine.remove_from_cart(&product_id).await?;
            info!(%product_id, "Removed from cart");
        }
        Commands::Clear => {
            engine.clear_cart().await?;
            info!("Cart cleared");
        }
        Commands::Discount { amount, code } => {
            engine.apply_discount(amount, code);
        }
    }
    Ok(())
}

/// Build the product record an `add` command refers to.
fn product_from_args(id: String, price: Decimal, min: u32, name: Option<String>) -> Product {
    Product {
        name: name.unwrap_or_else(|| id.clone()),
        id: ProductId::new(id),
        price,
        discounted_price: None,
        stock: u32::MAX,
        min_order_quantity: min,
        max_order_quantity: None,
        image: None,
    }
}

fn print_cart(cart: &Cart) {
    if cart.is_empty() {
        info!("Cart is empty");
    }
    for item in &cart.items {
        info!(
            product_id = %item.product.id,
            name = %item.product.name,
            quantity = item.quantity,
            total = %item.total,
            identity = %item_identity_label(item),
            "Line"
        );
    }
    info!(
        items = cart.item_count(),
        subtotal = %cart.display_subtotal(),
        delivery_fee = %cart.delivery_fee,
        discount = %cart.discount,
        coupon = cart.coupon_code.as_deref().unwrap_or("-"),
        total = %cart.display_total(),
        "Cart"
    );
}

fn item_identity_label(item: &CartItem) -> String {
    match item.identity.confirmed_id() {
        Some(id) => id.to_string(),
        None => "unconfirmed".to_owned(),
    }
}
