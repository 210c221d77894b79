//! Wire types for the remote cart store.
//!
//! Field names follow the store's camelCase JSON. Identifiers may arrive as
//! either `id` or `_id`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::RemoteError;

/// The authoritative cart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCart {
    /// Cart lines.
    #[serde(default)]
    pub items: Vec<RemoteCartItem>,
}

/// One cart line as stored remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteCartItem {
    /// Server-assigned line id.
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    /// Product snapshot.
    pub product: RemoteProduct,
    /// Units on the line.
    pub quantity: i64,
}

/// Product fields embedded in a cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteProduct {
    /// Product id.
    #[serde(alias = "_id")]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// List price.
    pub price: Decimal,
    /// Sale price, when discounted.
    #[serde(default)]
    pub discounted_price: Option<Decimal>,
    /// Image URLs.
    #[serde(default)]
    pub images: Vec<String>,
    /// Units in stock.
    #[serde(default)]
    pub stock: Option<u32>,
    /// Minimum order quantity.
    #[serde(default)]
    pub min_order_quantity: Option<u32>,
    /// Maximum order quantity.
    #[serde(default)]
    pub max_order_quantity: Option<u32>,
}

/// Acknowledgement returned by mutating operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAck {
    /// Whether the store applied the operation.
    pub success: bool,
    /// Explanation, usually present on failure.
    #[serde(default)]
    pub message: Option<String>,
}

impl RemoteAck {
    /// Turn a negative acknowledgement into an error.
    ///
    /// # Errors
    ///
    /// Returns `RemoteError::Rejected` when `success` is false.
    pub fn into_result(self) -> Result<(), RemoteError> {
        if self.success {
            Ok(())
        } else {
            Err(RemoteError::Rejected {
                message: self.message,
            })
        }
    }
}

/// Body of an add-delta request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AddDeltaRequest<'a> {
    pub product_id: &'a str,
    pub quantity: i64,
}

/// Body of a fetch response.
///
/// The cart comes either bare (`items` at the top level) or wrapped in a
/// `cart` field. A `success: false` body is a refusal even when it parses,
/// and a body with neither key is not a cart at all.
#[derive(Debug, Deserialize)]
pub(crate) struct CartEnvelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    cart: Option<RemoteCart>,
    #[serde(default)]
    items: Option<Vec<RemoteCartItem>>,
}

impl CartEnvelope {
    pub(crate) fn into_cart(self) -> Result<RemoteCart, RemoteError> {
        if self.success == Some(false) {
            return Err(RemoteError::Rejected {
                message: self.message,
            });
        }
        match (self.cart, self.items) {
            (Some(cart), _) => Ok(cart),
            (None, Some(items)) => Ok(RemoteCart { items }),
            (None, None) => Err(RemoteError::Malformed(
                "cart response has neither `cart` nor `items`".to_string(),
            )),
        }
    }
}
