use std::fmt::Display;

use kaleng_engine::{
    db_types::{NewOrderItem, Order, OrderId, OrderStatusType},
    order_objects::OrderQueryFilter,
};
use midtrans_tools::SnapTransaction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// The checkout payload. Prices are not accepted from the client; the engine snapshots them from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<NewOrderItem>,
    pub address: String,
}

/// What the customer gets back from a successful checkout: the stored order plus the gateway handle to pay it with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutResponse {
    pub order: Order,
    pub payment: SnapTransaction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: OrderStatusType,
}

/// Query-string shape of the back-office order search. Flat, because urlencoded form data cannot express the
/// filter's status list directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderSearchParams {
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub status: Option<OrderStatusType>,
    #[serde(default)]
    pub since: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub until: Option<chrono::DateTime<chrono::Utc>>,
}

impl OrderSearchParams {
    pub fn into_filter(self) -> OrderQueryFilter {
        OrderQueryFilter {
            order_id: self.order_id.map(OrderId),
            user_id: self.user_id,
            address: self.address,
            status: self.status.map(|s| vec![s]),
            since: self.since,
            until: self.until,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResponse {
    pub cancelled_count: usize,
    pub cancelled_ids: Vec<OrderId>,
}
