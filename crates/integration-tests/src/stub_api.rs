//! Stub cart API served over HTTP.
//!
//! Routes mirror the real cart API under `/api` and delegate to a
//! [`MemoryCartStore`], so failures injected into the store come back as
//! HTTP responses:
//!
//! - `Rejected` - `200 OK` with `{"success": false, "message": ...}`
//! - `Unavailable` - `503 Service Unavailable`
//!
//! Every request must carry `Authorization: Bearer` [`STUB_TOKEN`].

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use cartsync_core::ProductId;
use cartsync_engine::remote::{RemoteAck, RemoteCart};
use cartsync_engine::{MemoryCartStore, RemoteApiConfig, RemoteCartStore, RemoteError};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

/// Bearer token the stub accepts.
pub const STUB_TOKEN: &str = "stub-Xq7vT2mLp9Rk4Wz8";

#[derive(Clone)]
struct StubState {
    store: Arc<MemoryCartStore>,
}

#[derive(Serialize)]
struct CartBody {
    cart: RemoteCart,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddBody {
    product_id: String,
    quantity: i64,
}

/// A cart API listening on a local ephemeral port.
pub struct StubCartApi {
    addr: SocketAddr,
    server: JoinHandle<()>,
}

impl StubCartApi {
    /// Bind to `127.0.0.1:0` and start serving `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn spawn(store: Arc<MemoryCartStore>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;
        let app = router(StubState { store });

        let server = tokio::spawn(async move {
            // The server only stops when the test drops the stub
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { addr, server })
    }

    /// Client configuration pointing at this stub with the accepted token.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot be built.
    pub fn config(&self) -> Result<RemoteApiConfig, url::ParseError> {
        self.config_with_token(Some(STUB_TOKEN))
    }

    /// Client configuration pointing at this stub with an arbitrary token.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot be built.
    pub fn config_with_token(
        &self,
        token: Option<&str>,
    ) -> Result<RemoteApiConfig, url::ParseError> {
        Ok(RemoteApiConfig {
            base_url: Url::parse(&format!("http://{}/api/", self.addr))?,
            token: token.map(|t| SecretString::from(t.to_owned())),
        })
    }
}

impl Drop for StubCartApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn router(state: StubState) -> Router {
    let api = Router::new()
        .route("/cart", get(fetch_cart).delete(clear_cart))
        .route("/cart/add", post(add_delta))
        .route("/cart/item/{product_id}", delete(remove_item));

    Router::new().nest("/api", api).with_state(state)
}

// =============================================================================
// Handlers
// =============================================================================

async fn fetch_cart(State(state): State<StubState>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&headers) {
        return response;
    }
    match state.store.fetch_cart().await {
        Ok(cart) => Json(CartBody { cart }).into_response(),
        Err(e) => failure(e),
    }
}

async fn add_delta(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(body): Json<AddBody>,
) -> Response {
    if let Err(response) = authorize(&headers) {
        return response;
    }
    let product_id = ProductId::new(body.product_id);
    acknowledge(state.store.add_delta(&product_id, body.quantity).await)
}

async fn remove_item(
    State(state): State<StubState>,
    headers: HeaderMap,
    Path(product_id): Path<String>,
) -> Response {
    if let Err(response) = authorize(&headers) {
        return response;
    }
    acknowledge(state.store.remove_item(&ProductId::new(product_id)).await)
}

async fn clear_cart(State(state): State<StubState>, headers: HeaderMap) -> Response {
    if let Err(response) = authorize(&headers) {
        return response;
    }
    acknowledge(state.store.clear().await)
}

// =============================================================================
// Responses
// =============================================================================

fn authorize(headers: &HeaderMap) -> Result<(), Response> {
    let expected = format!("Bearer {STUB_TOKEN}");
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == expected);
    if authorized {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(RemoteAck {
                success: false,
                message: Some("Please log in".to_owned()),
            }),
        )
            .into_response())
    }
}

fn acknowledge(result: Result<(), RemoteError>) -> Response {
    match result {
        Ok(()) => Json(RemoteAck {
            success: true,
            message: None,
        })
        .into_response(),
        Err(e) => failure(e),
    }
}

fn failure(error: RemoteError) -> Response {
    match error {
        RemoteError::Rejected { message } => Json(RemoteAck {
            success: false,
            message,
        })
        .into_response(),
        other => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(RemoteAck {
                success: false,
                message: Some(other.to_string()),
            }),
        )
            .into_response(),
    }
}
