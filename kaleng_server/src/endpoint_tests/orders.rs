use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use kaleng_engine::{
    db_types::{Order, OrderId, OrderStatusType, Role},
    AccountApi,
};
use kls_common::Rupiah;
use log::debug;
use serde_json::Value;

use super::{
    helpers::{get_request, issue_token, user_claims},
    mocks::MockAccountManager,
};
use crate::routes::{MyOrdersRoute, OrderByIdRoute};

#[actix_web::test]
async fn fetch_my_orders_without_a_token() {
    let _ = env_logger::try_init().ok();
    let err = get_request("", "/orders", configure).await.expect_err("Expected error");
    assert!(err.contains("No session token was provided"), "unexpected error: {err}");
}

#[actix_web::test]
async fn fetch_my_orders() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(user_claims("usr_alice", vec![Role::User]));
    let (status, body) = get_request(&token, "/orders", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).expect("Body is not JSON");
    assert_eq!(result["user_id"], "usr_alice");
    assert_eq!(result["total_orders"], 250_000);
    assert_eq!(result["orders"].as_array().map(Vec::len), Some(2));
}

#[actix_web::test]
async fn fetch_my_orders_with_a_tampered_token() {
    let _ = env_logger::try_init().ok();
    let mut token = issue_token(user_claims("usr_alice", vec![Role::User]));
    token.replace_range(token.len() - 10..token.len() - 5, "00000");
    debug!("Calling /orders with tampered token {token}");
    let err = get_request(&token, "/orders", configure).await.expect_err("Expected error");
    assert!(err.contains("Session token is invalid"), "unexpected error: {err}");
}

#[actix_web::test]
async fn strangers_get_a_404_for_someone_elses_order() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(user_claims("usr_mallory", vec![Role::User]));
    let err = get_request(&token, "/orders/KLS-0000001", configure_order_by_id).await.expect_err("Expected error");
    assert!(err.contains("The data was not found"), "unexpected error: {err}");
}

#[actix_web::test]
async fn admins_may_read_any_order() {
    let _ = env_logger::try_init().ok();
    let token = issue_token(user_claims("usr_backoffice", vec![Role::User, Role::Admin]));
    let (status, body) = get_request(&token, "/orders/KLS-0000001", configure_order_by_id).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let result: Value = serde_json::from_str(&body).expect("Body is not JSON");
    assert_eq!(result["order_id"], "KLS-0000001");
    assert_eq!(result["items"].as_array().map(Vec::len), Some(0));
}

fn configure(cfg: &mut ServiceConfig) {
    let mut account_manager = MockAccountManager::new();
    account_manager.expect_fetch_orders_for_user().returning(move |_| Ok(orders_response()));
    let accounts_api = AccountApi::new(account_manager);
    cfg.service(MyOrdersRoute::<MockAccountManager>::new()).app_data(web::Data::new(accounts_api));
}

fn configure_order_by_id(cfg: &mut ServiceConfig) {
    let mut account_manager = MockAccountManager::new();
    account_manager
        .expect_fetch_order_by_order_id()
        .returning(move |_| Ok(orders_response().into_iter().next()));
    account_manager.expect_fetch_order_items().returning(|_| Ok(vec![]));
    let accounts_api = AccountApi::new(account_manager);
    cfg.service(OrderByIdRoute::<MockAccountManager>::new()).app_data(web::Data::new(accounts_api));
}

// Mock response to `fetch_orders_for_user` calls
fn orders_response() -> Vec<Order> {
    vec![
        Order {
            id: 1,
            order_id: OrderId("KLS-0000001".into()),
            user_id: "usr_alice".to_string(),
            status: OrderStatusType::Paid,
            address: "Jl. Braga 18, Bandung".to_string(),
            total: Rupiah::from(100_000),
            created_at: Utc.with_ymd_and_hms(2024, 6, 12, 13, 30, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 6, 12, 13, 35, 0).unwrap(),
        },
        Order {
            id: 2,
            order_id: OrderId("KLS-0000002".into()),
            user_id: "usr_alice".to_string(),
            status: OrderStatusType::Cancelled,
            address: "Jl. Braga 18, Bandung".to_string(),
            total: Rupiah::from(150_000),
            created_at: Utc.with_ymd_and_hms(2024, 6, 15, 18, 30, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2024, 6, 15, 18, 50, 0).unwrap(),
        },
    ]
}
