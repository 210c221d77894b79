//! CLI command implementations.

pub mod cart;

pub(crate) use cart::run;
