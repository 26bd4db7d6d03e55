use serde::{Deserialize, Serialize};

use crate::db_types::Order;

/// Emitted when a checkout completes and stock has been reserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrderEvent {
    pub order: Order,
}

impl NewOrderEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted when an order transitions to `Paid`, whether via the payment webhook or a manual admin action.
/// Exactly one event fires per order that gets paid; webhook redeliveries do not re-emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// Emitted when an order is cancelled and its stock restored, regardless of which trigger won the race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}
