//! Integration tests for remote store failures.
//!
//! Awaited mutations report failures and leave the local cart untouched.
//! Background syncs are never rolled back; the next reconciliation brings
//! the local cart back in line with the remote store.

#![allow(clippy::unwrap_used)]

use cartsync_engine::remote::FailureMode;
use cartsync_engine::{CartError, QuantityChange};
use cartsync_integration_tests::fixtures::{Harness, product};

fn remote_message(err: &CartError) -> &str {
    match err {
        CartError::Remote { message } => message,
        other => panic!("expected a remote failure, got {other:?}"),
    }
}

// =============================================================================
// Awaited Mutations
// =============================================================================

#[tokio::test]
async fn test_add_failure_reports_server_message() {
    let widget = product("widget", 10);
    let h = Harness::start([widget.clone()]).await;
    h.remote
        .fail_next(FailureMode::Rejected(Some("Only 1 left in stock".to_owned())));

    let err = h.engine.add_to_cart(&widget, 2).await.unwrap_err();

    assert_eq!(remote_message(&err), "Only 1 left in stock");
    assert!(!err.is_rejection());
    assert!(h.engine.cart().is_empty());
}

#[tokio::test]
async fn test_add_failure_without_message_uses_generic_text() {
    let widget = product("widget", 10);
    let h = Harness::start([widget.clone()]).await;
    h.remote.fail_next(FailureMode::Unavailable);

    let err = h.engine.add_to_cart(&widget, 2).await.unwrap_err();

    assert_eq!(remote_message(&err), "Failed to add item to cart");
}

#[tokio::test]
async fn test_add_of_unknown_product_is_rejected_by_store() {
    let h = Harness::start([product("widget", 10)]).await;

    let err = h
        .engine
        .add_to_cart(&product("ghost", 10), 1)
        .await
        .unwrap_err();

    assert_eq!(remote_message(&err), "Product not found");
}

#[tokio::test]
async fn test_remove_failure_keeps_line() {
    let widget = product("widget", 10);
    let h = Harness::start([widget.clone()]).await;
    h.engine.add_to_cart(&widget, 2).await.unwrap();
    h.remote.fail_next(FailureMode::Rejected(None));

    let err = h.engine.remove_from_cart(&widget.id).await.unwrap_err();

    assert_eq!(remote_message(&err), "Failed to remove item from cart");
    assert_eq!(h.engine.item_quantity(&widget.id), 2);
    assert_eq!(h.remote.quantity_of(&widget.id), 2);
}

// =============================================================================
// Background Syncs
// =============================================================================

#[tokio::test]
async fn test_failed_quantity_sync_is_not_rolled_back() {
    let widget = product("widget", 10);
    let h = Harness::start([widget.clone()]).await;
    h.engine.add_to_cart(&widget, 2).await.unwrap();
    h.remote.fail_next(FailureMode::Unavailable);

    let change = h.engine.update_quantity(&widget.id, 5).await.unwrap();
    h.engine.settle().await;

    assert_eq!(change, QuantityChange::Patched { delta: 3 });
    assert_eq!(h.engine.item_quantity(&widget.id), 5);
    assert_eq!(h.remote.quantity_of(&widget.id), 2);

    h.engine.refresh().await;
    assert_eq!(h.engine.item_quantity(&widget.id), 2);
}

#[tokio::test]
async fn test_failed_clear_is_not_rolled_back() {
    let widget = product("widget", 10);
    let h = Harness::start([widget.clone()]).await;
    h.engine.add_to_cart(&widget, 2).await.unwrap();
    h.remote.set_offline(true);

    h.engine.clear_cart().await.unwrap();
    h.engine.settle().await;

    assert!(h.engine.cart().is_empty());
    assert_eq!(h.remote.quantity_of(&widget.id), 2);

    h.remote.set_offline(false);
    h.engine.refresh().await;
    assert_eq!(h.engine.item_quantity(&widget.id), 2);
}
