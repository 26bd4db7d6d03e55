//! Webhook endpoint tests. The key properties: a structurally valid notification is always answered with HTTP 200,
//! no state is touched unless the signature checks out, and the status mapping drives the right engine call.
use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use kaleng_engine::{
    db_types::{Order, OrderId, OrderStatusType},
    events::EventProducers,
    OrderFlowApi,
};
use kls_common::Rupiah;
use midtrans_tools::helpers::notification_signature;
use serde_json::{json, Value};

use super::{helpers::post_request, mocks::MockStorefront};
use crate::webhook_routes::PaymentWebhookRoute;

const SERVER_KEY: &str = "SB-Mid-server-endpoint-tests";

fn signed_notification(order_id: &str, transaction_status: &str, gross_amount: &str) -> Value {
    let signature = notification_signature(order_id, "200", gross_amount, SERVER_KEY);
    json!({
        "order_id": order_id,
        "status_code": "200",
        "gross_amount": gross_amount,
        "signature_key": signature,
        "transaction_status": transaction_status,
    })
}

fn paid_order() -> Order {
    Order {
        id: 7,
        order_id: OrderId("KLS-0000007".into()),
        user_id: "usr_alice".to_string(),
        status: OrderStatusType::Paid,
        address: "Jl. Cikini Raya 45, Jakarta".to_string(),
        total: Rupiah::from(490_000),
        created_at: Utc.with_ymd_and_hms(2024, 6, 20, 9, 0, 0).unwrap(),
        updated_at: Utc.with_ymd_and_hms(2024, 6, 20, 9, 5, 0).unwrap(),
    }
}

#[actix_web::test]
async fn settlement_notification_marks_the_order_paid() {
    let _ = env_logger::try_init().ok();
    let body = signed_notification("KLS-0000007", "settlement", "490000.00");
    let (status, body) = post_request("", "/payment", body, configure_settlement).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).expect("Body is not JSON");
    assert_eq!(result["success"], true);
    assert_eq!(result["message"], "Order updated to Paid");
}

#[actix_web::test]
async fn bad_signature_is_acknowledged_but_changes_nothing() {
    let _ = env_logger::try_init().ok();
    let mut body = signed_notification("KLS-0000007", "settlement", "490000.00");
    body["signature_key"] = json!("deadbeef");
    // The mock has no expectations: any engine call would panic the test.
    let (status, body) = post_request("", "/payment", body, configure_untouched).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).expect("Body is not JSON");
    assert_eq!(result["success"], false);
    assert_eq!(result["message"], "Invalid signature.");
}

#[actix_web::test]
async fn connectivity_probes_are_acknowledged_without_side_effects() {
    let _ = env_logger::try_init().ok();
    let body = json!({ "ping": "midtrans" });
    let (status, body) = post_request("", "/payment", body, configure_untouched).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).expect("Body is not JSON");
    assert_eq!(result["success"], true);
}

#[actix_web::test]
async fn unrecognised_transaction_status_applies_no_transition() {
    let _ = env_logger::try_init().ok();
    let body = signed_notification("KLS-0000007", "partial_refund", "490000.00");
    let (status, body) = post_request("", "/payment", body, configure_untouched).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).expect("Body is not JSON");
    assert_eq!(result["success"], true);
}

#[actix_web::test]
async fn gateway_annulment_cancels_the_order() {
    let _ = env_logger::try_init().ok();
    let body = signed_notification("KLS-0000007", "expire", "490000.00");
    let (status, body) = post_request("", "/payment", body, configure_annulment).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).expect("Body is not JSON");
    assert_eq!(result["success"], true);
    assert_eq!(result["message"], "Order updated to Cancelled");
}

#[actix_web::test]
async fn unknown_orders_are_acknowledged_without_error() {
    let _ = env_logger::try_init().ok();
    let body = signed_notification("KLS-MISSING", "settlement", "10000");
    let (status, body) = post_request("", "/payment", body, configure_unknown_order).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).expect("Body is not JSON");
    assert_eq!(result["success"], true);
    assert_eq!(result["message"], "Order not found.");
}

fn register(cfg: &mut ServiceConfig, db: MockStorefront) {
    let api = OrderFlowApi::new(db, EventProducers::default());
    cfg.service(PaymentWebhookRoute::<MockStorefront>::new()).app_data(web::Data::new(api));
}

fn configure_settlement(cfg: &mut ServiceConfig) {
    let mut db = MockStorefront::new();
    db.expect_mark_order_paid()
        .withf(|oid| oid.as_str() == "KLS-0000007")
        .times(1)
        .returning(|_| Ok((paid_order(), true)));
    register(cfg, db);
}

fn configure_annulment(cfg: &mut ServiceConfig) {
    let mut db = MockStorefront::new();
    db.expect_cancel_order_with_restore().withf(|oid| oid.as_str() == "KLS-0000007").times(1).returning(|_| {
        let mut order = paid_order();
        order.status = OrderStatusType::Cancelled;
        Ok(order)
    });
    register(cfg, db);
}

fn configure_unknown_order(cfg: &mut ServiceConfig) {
    let mut db = MockStorefront::new();
    db.expect_mark_order_paid()
        .returning(|oid| Err(kaleng_engine::StorefrontError::OrderNotFound(OrderId(oid.as_str().to_string()))));
    register(cfg, db);
}

fn configure_untouched(cfg: &mut ServiceConfig) {
    register(cfg, MockStorefront::new());
}
