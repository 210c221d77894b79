//! Integration tests for the cart synchronization engine.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p cartsync-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_mutations` - Add, update, remove and clear against the memory store
//! - `cart_totals` - Totals derivation across mutation sequences
//! - `session` - Login, logout and reconciliation races
//! - `remote_failures` - Failure reporting and the no-rollback policy
//! - `http_store` - The HTTP store against a stub cart API
//!
//! # Harness
//!
//! [`fixtures::Harness`] starts a [`cartsync_engine::CartEngine`] over a
//! [`cartsync_engine::MemoryCartStore`]; [`stub_api::StubCartApi`] serves
//! the cart API over HTTP so the real client can be exercised end to end.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod fixtures;
pub mod stub_api;
