//! Cartsync Core - Cart model and totals.
//!
//! This crate provides the types shared by every cartsync component:
//! - `engine` - Local cart replica kept in sync with the remote cart store
//! - `cli` - Command-line harness for driving the engine
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no async runtime. [`recompute`] is the single place where cart
//! totals are derived; every mutation path in the engine goes through it.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, money, products, cart items and the cart itself

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
