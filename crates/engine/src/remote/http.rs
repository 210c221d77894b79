//! HTTP implementation of the remote cart store.
//!
//! JSON over `reqwest`. Endpoints, relative to the configured base URL:
//!
//! - `GET cart` - fetch
//! - `POST cart/add` with `{productId, quantity}` - add delta
//! - `DELETE cart/item/{productId}` - remove
//! - `DELETE cart` - clear

use std::sync::Arc;

use async_trait::async_trait;
use cartsync_core::ProductId;
use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::types::{AddDeltaRequest, CartEnvelope, RemoteAck, RemoteCart};
use super::{RemoteCartStore, RemoteError};
use crate::config::RemoteApiConfig;

/// Longest response body excerpt written to logs.
const LOG_BODY_LIMIT: usize = 500;

/// Client for a remote cart store speaking JSON over HTTP.
#[derive(Clone)]
pub struct HttpCartStore {
    inner: Arc<HttpCartStoreInner>,
}

struct HttpCartStoreInner {
    client: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl HttpCartStore {
    /// Create a new client for the configured endpoint.
    #[must_use]
    pub fn new(config: &RemoteApiConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create a client reusing an existing `reqwest::Client`.
    #[must_use]
    pub fn with_client(client: reqwest::Client, config: &RemoteApiConfig) -> Self {
        Self {
            inner: Arc::new(HttpCartStoreInner {
                client,
                base_url: config.base_url.clone(),
                token: config.token.clone(),
            }),
        }
    }

    /// Build an endpoint URL from path segments (each percent-encoded).
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RemoteError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| RemoteError::InvalidEndpoint(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let request = self
            .inner
            .client
            .request(method, url)
            .header("Accept", "application/json");
        match &self.inner.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Send a request and decode a JSON body.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RemoteError> {
        let response = request.send().await?;
        let status = response.status();

        // Read the body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %excerpt(&response_text),
                "Cart store returned non-success status"
            );
            let message = serde_json::from_str::<RemoteAck>(&response_text)
                .ok()
                .and_then(|ack| ack.message);
            return Err(RemoteError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %excerpt(&response_text),
                "Failed to parse cart store response"
            );
            RemoteError::Parse(e)
        })
    }

    async fn execute_ack(&self, request: RequestBuilder) -> Result<(), RemoteError> {
        self.execute::<RemoteAck>(request).await?.into_result()
    }
}

fn excerpt(body: &str) -> String {
    body.chars().take(LOG_BODY_LIMIT).collect()
}

#[async_trait]
impl RemoteCartStore for HttpCartStore {
    #[instrument(skip(self))]
    async fn fetch_cart(&self) -> Result<RemoteCart, RemoteError> {
        let url = self.endpoint(&["cart"])?;
        let envelope: CartEnvelope = self.execute(self.request(Method::GET, url)).await?;
        let cart = envelope.into_cart()?;
        debug!(lines = cart.items.len(), "Fetched remote cart");
        Ok(cart)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn add_delta(&self, product_id: &ProductId, quantity: i64) -> Result<(), RemoteError> {
        let url = self.endpoint(&["cart", "add"])?;
        let body = AddDeltaRequest {
            product_id: product_id.as_str(),
            quantity,
        };
        self.execute_ack(self.request(Method::POST, url).json(&body))
            .await
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn remove_item(&self, product_id: &ProductId) -> Result<(), RemoteError> {
        let url = self.endpoint(&["cart", "item", product_id.as_str()])?;
        self.execute_ack(self.request(Method::DELETE, url)).await
    }

    #[instrument(skip(self))]
    async fn clear(&self) -> Result<(), RemoteError> {
        let url = self.endpoint(&["cart"])?;
        self.execute_ack(self.request(Method::DELETE, url)).await
    }
}
