//! Remote record to cart item conversion.

use cartsync_core::{CartItem, CartItemId, ItemIdentity, ProductId, ProductSnapshot};
use tracing::warn;

use super::types::{RemoteCart, RemoteCartItem, RemoteProduct};

/// Map every remote line into a local cart item, in remote order.
///
/// Lines with a non-positive quantity are dropped. Lines without a server id
/// get a locally synthesized, unconfirmed identity.
#[must_use]
pub fn into_cart_items(cart: RemoteCart) -> Vec<CartItem> {
    cart.items.into_iter().filter_map(convert_item).collect()
}

fn convert_item(item: RemoteCartItem) -> Option<CartItem> {
    let Ok(quantity) = u32::try_from(item.quantity) else {
        warn!(
            product_id = %item.product.id,
            quantity = item.quantity,
            "Skipping remote cart line with out-of-range quantity"
        );
        return None;
    };
    if quantity == 0 {
        warn!(product_id = %item.product.id, "Skipping remote cart line with zero quantity");
        return None;
    }

    let identity = item
        .id
        .filter(|id| !id.is_empty())
        .map_or_else(ItemIdentity::unconfirmed, |id| {
            ItemIdentity::Confirmed(CartItemId::new(id))
        });

    Some(CartItem::new(identity, convert_product(item.product), quantity))
}

fn convert_product(product: RemoteProduct) -> ProductSnapshot {
    ProductSnapshot {
        id: ProductId::new(product.id),
        name: product.name,
        image: product.images.into_iter().next(),
        price: product.discounted_price.unwrap_or(product.price),
        min_order_quantity: product.min_order_quantity.unwrap_or(1).max(1),
        max_order_quantity: product.max_order_quantity,
    }
}
