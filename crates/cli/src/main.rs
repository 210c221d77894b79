//! Cartsync CLI - drive the cart engine from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the remote cart
//! cart-cli show
//!
//! # Add two units of a product priced at 12.50
//! cart-cli add p-123 12.50 --quantity 2
//!
//! # Set a line's quantity (0 removes it)
//! cart-cli set p-123 5
//!
//! # Try everything against an in-memory store
//! cart-cli --offline add p-1 100 --quantity 2
//! ```
//!
//! # Commands
//!
//! - `show` - Print the current cart
//! - `add` - Add units of a product
//! - `set` - Set a line's quantity
//! - `remove` - Remove a line
//! - `clear` - Empty the cart
//! - `discount` - Apply a precomputed discount locally

#![cfg_attr(not(test), forbid(unsafe_code))]

use cartsync_engine::EngineConfig;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "cart-cli")]
#[command(author, version, about = "Cart synchronization engine CLI")]
struct Cli {
    /// Use an in-memory cart store instead of `CART_API_BASE_URL`.
    ///
    /// The store starts empty on every run and is discarded on exit, so
    /// only `add` shows a non-empty cart.
    #[arg(long, global = true)]
    offline: bool,

    /// Run with the session signal logged out
    #[arg(long, global = true)]
    logged_out: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the current cart
    Show,
    /// Add units of a product
    Add {
        /// Product ID
        product_id: String,

        /// Unit price
        price: Decimal,

        /// Units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,

        /// Minimum order quantity
        #[arg(short, long, default_value_t = 1)]
        min: u32,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Set a line's quantity (0 or less removes it)
    Set {
        /// Product ID
        product_id: String,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a line
    Remove {
        /// Product ID
        product_id: String,
    },
    /// Empty the cart
    Clear,
    /// Apply a precomputed discount to the local cart
    Discount {
        /// Discount amount
        amount: Decimal,

        /// Coupon code the discount came from
        #[arg(short, long)]
        code: Option<String>,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &EngineConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cartsync_engine=info,cart_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match EngineConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    if let Err(e) = commands::run(cli, &config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_offline_help_says_store_starts_empty() {
        let command = Cli::command();
        let offline = command
            .get_arguments()
            .find(|arg| arg.get_id() == "offline")
            .unwrap();
        let help = offline.get_long_help().unwrap().to_string();
        assert!(help.contains("starts empty on every run"));
    }

    #[test]
    fn test_set_accepts_negative_quantity() {
        let cli = Cli::try_parse_from(["cart-cli", "--offline", "set", "p-1", "-2"]).unwrap();
        assert!(cli.offline);
        assert!(matches!(
            cli.command,
            Commands::Set { quantity: -2, .. }
        ));
    }
}
