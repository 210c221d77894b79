//! Remote cart store: the server-authoritative cart.
//!
//! # Contract
//!
//! Four operations, all asynchronous and independently fallible:
//!
//! - `fetch_cart` - the authoritative cart contents
//! - `add_delta` - add a signed quantity to a product's line
//! - `remove_item` - drop a product's line
//! - `clear` - drop every line
//!
//! # Implementations
//!
//! - [`HttpCartStore`] - JSON over HTTP via `reqwest`
//! - [`MemoryCartStore`] - in-process store with failure injection

mod conversions;
mod http;
mod memory;
pub mod types;

pub use conversions::into_cart_items;
pub use http::HttpCartStore;
pub use memory::{FailureMode, MemoryCartStore, RemoteCall};
pub use types::{RemoteAck, RemoteCart, RemoteCartItem, RemoteProduct};

use async_trait::async_trait;
use cartsync_core::ProductId;
use thiserror::Error;

/// The remote cart store's operations.
#[async_trait]
pub trait RemoteCartStore: Send + Sync {
    /// Fetch the authoritative cart.
    async fn fetch_cart(&self) -> Result<RemoteCart, RemoteError>;

    /// Add `quantity` (negative to decrement) to a product's line.
    async fn add_delta(&self, product_id: &ProductId, quantity: i64) -> Result<(), RemoteError>;

    /// Remove a product's line.
    async fn remove_item(&self, product_id: &ProductId) -> Result<(), RemoteError>;

    /// Remove every line.
    async fn clear(&self) -> Result<(), RemoteError>;
}

/// Errors that can occur when talking to the remote cart store.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Non-success HTTP status.
    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no details"))]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message from the response body, if any.
        message: Option<String>,
    },

    /// The store answered but refused the operation.
    #[error("Rejected: {}", .message.as_deref().unwrap_or("no details"))]
    Rejected {
        /// Message from the store, if any.
        message: Option<String>,
    },

    /// The store could not be reached.
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// The response parsed but does not describe a cart.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The configured base URL cannot carry path segments.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl RemoteError {
    /// The message the server supplied, when there is one.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } | Self::Rejected { message } => message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = RemoteError::Status {
            status: 503,
            message: None,
        };
        assert_eq!(err.to_string(), "HTTP 503: no details");
    }

    #[test]
    fn test_server_message_from_rejection() {
        let err = RemoteError::Rejected {
            message: Some("Out of stock".to_string()),
        };
        assert_eq!(err.server_message(), Some("Out of stock"));
        assert_eq!(err.to_string(), "Rejected: Out of stock");
    }

    #[test]
    fn test_blank_server_message_ignored() {
        let err = RemoteError::Status {
            status: 400,
            message: Some("  ".to_string()),
        };
        assert_eq!(err.server_message(), None);
    }

    #[test]
    fn test_transport_errors_have_no_server_message() {
        let err = RemoteError::Unavailable("timeout".to_string());
        assert_eq!(err.server_message(), None);
    }
}
