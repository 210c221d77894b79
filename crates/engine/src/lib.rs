//! Cartsync Engine - local cart replica synchronized with a remote cart store.
//!
//! # Architecture
//!
//! Three layers, each depending only on the one below it:
//!
//! - [`store`] - Holds the single in-memory [`Cart`] as an observable value
//! - [`reconcile`] - Replaces the local cart wholesale with the remote cart
//! - [`coordinator`] - Public mutations (add, update quantity, remove, clear)
//!
//! The remote store is the durable record. Add and remove wait for the
//! remote store and then reconcile; quantity changes and clear patch the
//! local cart first and sync in the background without rollback.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cartsync_engine::{CartEngine, EngineConfig, HttpCartStore, SessionSignal};
//!
//! let config = EngineConfig::from_env()?;
//! let remote = Arc::new(HttpCartStore::new(config.require_api()?));
//! let session = SessionSignal::new(true);
//! let engine = CartEngine::start(remote, session.clone(), config.pricing()).await;
//!
//! engine.add_to_cart(&product, 2).await?;
//! engine.update_quantity(&product.id, 5).await?;
//! println!("{}", engine.cart().display_total());
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod coordinator;
pub mod engine;
pub mod error;
pub mod reconcile;
pub mod remote;
pub mod session;
pub mod store;

pub use cartsync_core::{Cart, CartItem, PricingPolicy, Product, ProductId};
pub use config::{ConfigError, EngineConfig, RemoteApiConfig};
pub use coordinator::{ConsistencyPolicy, Mutation, MutationCoordinator, QuantityChange};
pub use engine::CartEngine;
pub use error::CartError;
pub use reconcile::{ReconcileOutcome, Reconciler};
pub use remote::{HttpCartStore, MemoryCartStore, RemoteCartStore, RemoteError};
pub use session::SessionSignal;
pub use store::CartStateStore;
