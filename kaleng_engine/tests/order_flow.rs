mod support;

use chrono::Duration;
use kaleng_engine::{
    db_types::OrderStatusType,
    events::{EventHandlers, EventHooks, EventProducers},
    order_objects::PaymentUpdate,
    AccountManagement,
    OrderFlowApi,
    SqliteDatabase,
    StorefrontError,
};
use kls_common::Rupiah;
use support::*;

fn api(db: &SqliteDatabase) -> OrderFlowApi<SqliteDatabase> {
    OrderFlowApi::new(db.clone(), EventProducers::default())
}

#[tokio::test]
async fn checkout_reserves_stock_and_snapshots_prices() {
    let db = prepare_test_env(&random_db_url()).await;
    seed_user(&db, "alice").await;
    let cap = seed_product(&db, "Fat cap 94", 15_000, 20).await;
    let can = seed_product_with_variants(&db, "Flame Blue 400ml", 45_000, &[("Sapphire", 10), ("Riot Red", 4)]).await;
    let sapphire = &can.variants[1].id; // variants come back name-ordered: Riot Red, Sapphire
    let api = api(&db);

    let order = api
        .place_order(order_for("alice", vec![line(&cap.product.id, 3), variant_line(&can.product.id, sapphire, 2)]))
        .await
        .expect("Checkout failed");
    assert_eq!(order.status, OrderStatusType::Unpaid);
    assert_eq!(order.total, Rupiah::from(3 * 15_000 + 2 * 45_000));
    assert_eq!(product_stock(&db, &cap.product.id).await, 17);
    assert_eq!(variant_stock(&db, &can.product.id, sapphire).await, 8);

    // The item rows carry the price at purchase time, immune to later catalog edits.
    let items = db.fetch_order_items(&order).await.expect("Error fetching items");
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].price, Rupiah::from(15_000));
    assert_eq!(items[1].price, Rupiah::from(45_000));
    assert_eq!(items[1].variant_name.as_deref(), Some("Sapphire"));
}

#[tokio::test]
async fn one_bad_line_aborts_the_whole_checkout() {
    let db = prepare_test_env(&random_db_url()).await;
    seed_user(&db, "alice").await;
    let cap = seed_product(&db, "Skinny cap", 12_000, 10).await;
    let api = api(&db);

    let err = api
        .place_order(order_for("alice", vec![line(&cap.product.id, 5), line("prd_does_not_exist", 1)]))
        .await
        .expect_err("Checkout should have failed");
    assert!(matches!(err, StorefrontError::ProductNotFound(_)));
    // The valid line was not decremented either.
    assert_eq!(product_stock(&db, &cap.product.id).await, 10);
}

#[tokio::test]
async fn variant_is_required_when_the_product_has_variants() {
    let db = prepare_test_env(&random_db_url()).await;
    seed_user(&db, "alice").await;
    let can = seed_product_with_variants(&db, "Molotow One4All", 60_000, &[("Signal Black", 6)]).await;
    let api = api(&db);

    let err = api
        .place_order(order_for("alice", vec![line(&can.product.id, 1)]))
        .await
        .expect_err("Checkout should have failed");
    assert!(matches!(err, StorefrontError::VariantRequired { .. }));

    let err = api
        .place_order(order_for("alice", vec![variant_line(&can.product.id, "var_bogus", 1)]))
        .await
        .expect_err("Checkout should have failed");
    assert!(matches!(err, StorefrontError::VariantNotFound { .. }));
    assert_eq!(variant_stock(&db, &can.product.id, &can.variants[0].id).await, 6);
}

#[tokio::test]
async fn insufficient_stock_reports_availability() {
    let db = prepare_test_env(&random_db_url()).await;
    seed_user(&db, "alice").await;
    let cap = seed_product(&db, "Transversal cap", 9_000, 2).await;
    let api = api(&db);

    let err = api
        .place_order(order_for("alice", vec![line(&cap.product.id, 3)]))
        .await
        .expect_err("Checkout should have failed");
    match err {
        StorefrontError::InsufficientStock { available, requested, .. } => {
            assert_eq!(available, 2);
            assert_eq!(requested, 3);
        },
        e => panic!("Expected InsufficientStock, got {e}"),
    }
    assert_eq!(product_stock(&db, &cap.product.id).await, 2);
}

#[tokio::test]
async fn customer_cancellation_restores_stock_exactly_once() {
    let db = prepare_test_env(&random_db_url()).await;
    seed_user(&db, "alice").await;
    let can = seed_product_with_variants(&db, "Dope Classic", 38_000, &[("Ultramarine", 10)]).await;
    let vid = can.variants[0].id.clone();
    let api = api(&db);

    let order = api
        .place_order(order_for("alice", vec![variant_line(&can.product.id, &vid, 2)]))
        .await
        .expect("Checkout failed");
    assert_eq!(variant_stock(&db, &can.product.id, &vid).await, 8);

    let cancelled = api.cancel_order(&order.order_id, "alice", false).await.expect("Cancel failed");
    assert_eq!(cancelled.status, OrderStatusType::Cancelled);
    assert_eq!(variant_stock(&db, &can.product.id, &vid).await, 10);

    // A second cancellation attempt must not restore again.
    let err = api.cancel_order(&order.order_id, "alice", false).await.expect_err("Second cancel should fail");
    assert!(matches!(err, StorefrontError::InvalidStateChange { from: OrderStatusType::Cancelled, .. }));
    assert_eq!(variant_stock(&db, &can.product.id, &vid).await, 10);
}

#[tokio::test]
async fn only_the_owner_or_an_admin_may_cancel() {
    let db = prepare_test_env(&random_db_url()).await;
    seed_user(&db, "alice").await;
    seed_user(&db, "mallory").await;
    let cap = seed_product(&db, "Astro fat cap", 10_000, 5).await;
    let api = api(&db);

    let order = api.place_order(order_for("alice", vec![line(&cap.product.id, 1)])).await.expect("Checkout failed");

    // A stranger learns nothing about the order, not even that it exists.
    let err = api.cancel_order(&order.order_id, "mallory", false).await.expect_err("Cancel should fail");
    assert!(matches!(err, StorefrontError::OrderNotFound(_)));
    assert_eq!(product_stock(&db, &cap.product.id).await, 4);

    let cancelled = api.cancel_order(&order.order_id, "back-office", true).await.expect("Admin cancel failed");
    assert_eq!(cancelled.status, OrderStatusType::Cancelled);
    assert_eq!(product_stock(&db, &cap.product.id).await, 5);
}

#[tokio::test]
async fn settlement_is_idempotent() {
    let db = prepare_test_env(&random_db_url()).await;
    seed_user(&db, "alice").await;
    let cap = seed_product(&db, "Banana cap", 8_000, 9).await;
    let api = api(&db);

    let order = api.place_order(order_for("alice", vec![line(&cap.product.id, 4)])).await.expect("Checkout failed");

    let updated = api.apply_payment_update(&order.order_id, PaymentUpdate::Settled).await.expect("Update failed");
    assert_eq!(updated.expect("Expected a transition").status, OrderStatusType::Paid);
    assert_eq!(product_stock(&db, &cap.product.id).await, 5);

    // The gateway redelivers the same notification: same status, same stock, no error.
    let updated = api.apply_payment_update(&order.order_id, PaymentUpdate::Settled).await.expect("Update failed");
    assert!(updated.is_none());
    let order = db.fetch_order_by_order_id(&order.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Paid);
    assert_eq!(product_stock(&db, &cap.product.id).await, 5);
}

#[tokio::test]
async fn gateway_annulment_restores_stock_once() {
    let db = prepare_test_env(&random_db_url()).await;
    seed_user(&db, "alice").await;
    let cap = seed_product(&db, "Needle cap", 7_000, 6).await;
    let api = api(&db);

    let order = api.place_order(order_for("alice", vec![line(&cap.product.id, 2)])).await.expect("Checkout failed");
    assert_eq!(product_stock(&db, &cap.product.id).await, 4);

    let updated = api.apply_payment_update(&order.order_id, PaymentUpdate::Annulled).await.expect("Update failed");
    assert_eq!(updated.expect("Expected a transition").status, OrderStatusType::Cancelled);
    assert_eq!(product_stock(&db, &cap.product.id).await, 6);

    let updated = api.apply_payment_update(&order.order_id, PaymentUpdate::Annulled).await.expect("Update failed");
    assert!(updated.is_none());
    assert_eq!(product_stock(&db, &cap.product.id).await, 6);
}

#[tokio::test]
async fn pending_update_never_mutates() {
    let db = prepare_test_env(&random_db_url()).await;
    seed_user(&db, "alice").await;
    let cap = seed_product(&db, "Soft cap", 5_000, 3).await;
    let api = api(&db);

    let order = api.place_order(order_for("alice", vec![line(&cap.product.id, 1)])).await.expect("Checkout failed");
    let updated = api.apply_payment_update(&order.order_id, PaymentUpdate::Pending).await.expect("Update failed");
    assert!(updated.is_none());
    let order = db.fetch_order_by_order_id(&order.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Unpaid);
    assert_eq!(product_stock(&db, &cap.product.id).await, 2);
}

#[tokio::test]
async fn lifecycle_is_monotonic() {
    let db = prepare_test_env(&random_db_url()).await;
    seed_user(&db, "alice").await;
    let cap = seed_product(&db, "Outline cap", 11_000, 8).await;
    let api = api(&db);

    let order = api.place_order(order_for("alice", vec![line(&cap.product.id, 1)])).await.expect("Checkout failed");
    let oid = order.order_id.clone();
    for status in [OrderStatusType::Paid, OrderStatusType::Packed, OrderStatusType::Shipped, OrderStatusType::Completed] {
        let order = api.update_order_status(&oid, status).await.expect("Transition failed");
        assert_eq!(order.status, status);
    }

    // Completed is terminal: no cancellation, no moving backwards.
    let err = api.cancel_order(&oid, "alice", false).await.expect_err("Cancel should fail");
    assert!(matches!(err, StorefrontError::InvalidStateChange { .. }));
    let err = api.update_order_status(&oid, OrderStatusType::Packed).await.expect_err("Transition should fail");
    assert!(matches!(err, StorefrontError::InvalidStateChange { .. }));
    assert_eq!(product_stock(&db, &cap.product.id).await, 7);

    // And nothing resurrects a cancelled order.
    let order2 = api.place_order(order_for("alice", vec![line(&cap.product.id, 1)])).await.expect("Checkout failed");
    api.cancel_order(&order2.order_id, "alice", false).await.expect("Cancel failed");
    let err = api.update_order_status(&order2.order_id, OrderStatusType::Paid).await.expect_err("Should fail");
    assert!(matches!(err, StorefrontError::InvalidStateChange { from: OrderStatusType::Cancelled, .. }));
}

#[tokio::test]
async fn admin_cannot_cancel_a_packed_order() {
    let db = prepare_test_env(&random_db_url()).await;
    seed_user(&db, "alice").await;
    let cap = seed_product(&db, "Calligraphy cap", 13_000, 4).await;
    let api = api(&db);

    let order = api.place_order(order_for("alice", vec![line(&cap.product.id, 2)])).await.expect("Checkout failed");
    api.update_order_status(&order.order_id, OrderStatusType::Paid).await.expect("Transition failed");
    api.update_order_status(&order.order_id, OrderStatusType::Packed).await.expect("Transition failed");

    let err = api.update_order_status(&order.order_id, OrderStatusType::Cancelled).await.expect_err("Should fail");
    assert!(matches!(err, StorefrontError::InvalidStateChange { from: OrderStatusType::Packed, .. }));
    assert_eq!(product_stock(&db, &cap.product.id).await, 2);
}

#[tokio::test]
async fn sweep_cancels_stale_unpaid_orders_only() {
    let db = prepare_test_env(&random_db_url()).await;
    seed_user(&db, "alice").await;
    let can = seed_product_with_variants(&db, "Loop Aerosol", 42_000, &[("Torino Violet", 10)]).await;
    let vid = can.variants[0].id.clone();
    let api = api(&db);

    let stale = api
        .place_order(order_for("alice", vec![variant_line(&can.product.id, &vid, 2)]))
        .await
        .expect("Checkout failed");
    let fresh = api
        .place_order(order_for("alice", vec![variant_line(&can.product.id, &vid, 1)]))
        .await
        .expect("Checkout failed");
    let paid_and_stale = api
        .place_order(order_for("alice", vec![variant_line(&can.product.id, &vid, 1)]))
        .await
        .expect("Checkout failed");
    api.apply_payment_update(&paid_and_stale.order_id, PaymentUpdate::Settled).await.expect("Update failed");
    assert_eq!(variant_stock(&db, &can.product.id, &vid).await, 6);

    backdate_order(&db, &stale.order_id, 16).await;
    backdate_order(&db, &paid_and_stale.order_id, 20).await;

    let result = api.expire_unpaid_orders(Duration::minutes(15)).await.expect("Sweep failed");
    assert_eq!(result.cancelled_count(), 1);
    assert_eq!(result.cancelled_ids(), vec![stale.order_id.clone()]);
    // Only the stale unpaid order's reservation came back.
    assert_eq!(variant_stock(&db, &can.product.id, &vid).await, 8);

    let order = db.fetch_order_by_order_id(&fresh.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Unpaid);
    let order = db.fetch_order_by_order_id(&paid_and_stale.order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatusType::Paid);

    // Sweeping again finds nothing; stock is untouched.
    let result = api.expire_unpaid_orders(Duration::minutes(15)).await.expect("Sweep failed");
    assert_eq!(result.cancelled_count(), 0);
    assert_eq!(variant_stock(&db, &can.product.id, &vid).await, 8);
}

#[tokio::test]
async fn order_paid_hook_fires_exactly_once() {
    let db = prepare_test_env(&random_db_url()).await;
    seed_user(&db, "alice").await;
    let cap = seed_product(&db, "Dot cap", 14_000, 5).await;

    let (sender, mut receiver) = tokio::sync::mpsc::channel(4);
    let mut hooks = EventHooks::default();
    hooks.on_order_paid(move |ev| {
        let sender = sender.clone();
        Box::pin(async move {
            let _ = sender.send(ev.order.order_id).await;
        })
    });
    let handlers = EventHandlers::new(4, hooks);
    let api = OrderFlowApi::new(db.clone(), handlers.producers());
    handlers.start_handlers().await;

    let order = api.place_order(order_for("alice", vec![line(&cap.product.id, 1)])).await.expect("Checkout failed");
    api.apply_payment_update(&order.order_id, PaymentUpdate::Settled).await.expect("Update failed");
    // Redelivery must not notify subscribers a second time.
    api.apply_payment_update(&order.order_id, PaymentUpdate::Settled).await.expect("Update failed");

    let notified = tokio::time::timeout(std::time::Duration::from_secs(2), receiver.recv())
        .await
        .expect("Hook never fired")
        .expect("Hook channel closed");
    assert_eq!(notified, order.order_id);
    let again = tokio::time::timeout(std::time::Duration::from_millis(200), receiver.recv()).await;
    assert!(again.is_err(), "The paid hook fired more than once");
}

#[tokio::test]
async fn sweep_respects_the_deadline() {
    let db = prepare_test_env(&random_db_url()).await;
    seed_user(&db, "alice").await;
    let cap = seed_product(&db, "Stencil cap", 6_000, 5).await;
    let api = api(&db);

    let order = api.place_order(order_for("alice", vec![line(&cap.product.id, 1)])).await.expect("Checkout failed");
    backdate_order(&db, &order.order_id, 14).await;

    // Fourteen minutes old: not yet eligible.
    let result = api.expire_unpaid_orders(Duration::minutes(15)).await.expect("Sweep failed");
    assert_eq!(result.cancelled_count(), 0);

    backdate_order(&db, &order.order_id, 16).await;
    let result = api.expire_unpaid_orders(Duration::minutes(15)).await.expect("Sweep failed");
    assert_eq!(result.cancelled_count(), 1);
    assert_eq!(product_stock(&db, &cap.product.id).await, 5);
}
