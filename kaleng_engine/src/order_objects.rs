use std::fmt::Display;

use chrono::{DateTime, Utc};
use kls_common::Rupiah;
use serde::{Deserialize, Serialize};

use crate::db_types::{Order, OrderId, OrderItem, OrderStatusType};

//--------------------------------------    PaymentUpdate    ---------------------------------------------------------
/// The gateway-agnostic outcome of a payment notification, after the transport layer has authenticated the payload
/// and mapped the gateway's vocabulary onto the lifecycle. The engine only ever sees these three words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentUpdate {
    /// Payment confirmed in full. Moves an unpaid order to Paid.
    Settled,
    /// The transaction was cancelled, denied, or expired at the gateway. Cancels the order and restores stock.
    Annulled,
    /// Payment still in flight. Never mutates anything.
    Pending,
}

impl Display for PaymentUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentUpdate::Settled => write!(f, "Settled"),
            PaymentUpdate::Annulled => write!(f, "Annulled"),
            PaymentUpdate::Pending => write!(f, "Pending"),
        }
    }
}

//--------------------------------------   OrderWithItems    ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

//--------------------------------------     OrderResult     ---------------------------------------------------------
/// A user's orders plus the total value across them, for account pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    pub user_id: String,
    pub total_orders: Rupiah,
    pub orders: Vec<Order>,
}

//--------------------------------------     SweepResult     ---------------------------------------------------------
/// The outcome of one expiry sweep run. Orders that could not be cancelled (raced with another trigger, storage
/// error) are simply absent; the next sweep picks them up again if they still qualify.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepResult {
    pub cancelled: Vec<Order>,
}

impl SweepResult {
    pub fn cancelled_count(&self) -> usize {
        self.cancelled.len()
    }

    pub fn cancelled_ids(&self) -> Vec<OrderId> {
        self.cancelled.iter().map(|o| o.order_id.clone()).collect()
    }
}

//--------------------------------------  OrderQueryFilter   ---------------------------------------------------------
/// Search criteria for the back-office order list. Empty filter means "everything".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub order_id: Option<OrderId>,
    pub user_id: Option<String>,
    pub address: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<Vec<OrderStatusType>>,
}

impl OrderQueryFilter {
    pub fn with_order_id(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn with_user_id<S: Into<String>>(mut self, user_id: S) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_address<S: Into<String>>(mut self, address: S) -> Self {
        self.address = Some(address.into());
        self
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        self.status.get_or_insert_with(Vec::new).push(status);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.order_id.is_none()
            && self.user_id.is_none()
            && self.address.is_none()
            && self.since.is_none()
            && self.until.is_none()
            && self.status.is_none()
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters.");
        }
        if let Some(order_id) = &self.order_id {
            write!(f, "order_id: {order_id}. ")?;
        }
        if let Some(user_id) = &self.user_id {
            write!(f, "user_id: {user_id}. ")?;
        }
        if let Some(address) = &self.address {
            write!(f, "address: {address}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since: {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until: {until}. ")?;
        }
        if let Some(statuses) = &self.status {
            let s = statuses.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(", ");
            write!(f, "status in [{s}]. ")?;
        }
        Ok(())
    }
}
