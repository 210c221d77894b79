//! Errors returned across the public cart API.
//!
//! Every mutation returns `Result<_, CartError>`. The `Display` text of each
//! variant is the message shown to the user.

use thiserror::Error;

use crate::remote::RemoteError;

/// Outcome of a rejected or failed cart operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    /// The session is logged out; the caller decides whether to redirect.
    #[error("Please log in to add items to your cart")]
    AuthenticationRequired,

    /// Requested quantity is under the product's minimum order quantity.
    #[error("Minimum quantity is {minimum}")]
    BelowMinimum {
        /// The product's minimum order quantity.
        minimum: u32,
    },

    /// Requested quantity is zero or out of range.
    #[error("Quantity must be at least 1")]
    InvalidQuantity,

    /// The remote cart store failed or refused the operation.
    #[error("{message}")]
    Remote {
        /// Server-supplied message, or a generic one for the operation.
        message: String,
    },
}

impl CartError {
    /// Build a remote failure, preferring the server's own message.
    #[must_use]
    pub fn from_remote(error: &RemoteError, fallback: &str) -> Self {
        Self::Remote {
            message: error.server_message().unwrap_or(fallback).to_string(),
        }
    }

    /// Whether the operation was rejected before reaching the network.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        !matches!(self, Self::Remote { .. })
    }
}
