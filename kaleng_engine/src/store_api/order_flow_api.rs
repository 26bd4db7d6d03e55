use std::fmt::Debug;

use chrono::Duration;
use log::*;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType},
    events::{EventProducers, NewOrderEvent, OrderAnnulledEvent, OrderPaidEvent},
    order_objects::{PaymentUpdate, SweepResult},
    traits::{StorefrontDatabase, StorefrontError},
};

/// `OrderFlowApi` is the primary API for the order lifecycle: checkout, cancellation, payment updates, manual
/// back-office transitions, and the expiry sweep. Every path that touches stock goes through the backend's
/// conditional operations; this layer adds authorisation, idempotency decisions, and event emission.
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }
}

impl<B> OrderFlowApi<B>
where B: StorefrontDatabase
{
    /// Places a new order: validates every line against the catalog, reserves stock, and persists the order as
    /// `Unpaid`, all atomically. Any failure leaves the store exactly as it was.
    pub async fn place_order(&self, order: NewOrder) -> Result<Order, StorefrontError> {
        let stored = self.db.place_order(order).await?;
        debug!("🛒️ Order {} placed. Total {}", stored.order_id, stored.total);
        self.call_new_order_hook(&stored).await;
        Ok(stored)
    }

    /// Cancels an order on behalf of a customer. Only the order's owner (or an admin) may cancel, and only while
    /// the order is `Unpaid` or `Paid`; the reserved stock is restored in the same transaction.
    ///
    /// A non-owner gets `OrderNotFound` rather than a confirmation that the order exists.
    pub async fn cancel_order(
        &self,
        order_id: &OrderId,
        acting_user_id: &str,
        is_admin: bool,
    ) -> Result<Order, StorefrontError> {
        let order = self
            .db
            .fetch_order_by_order_id(order_id)
            .await
            .map_err(|e| StorefrontError::DatabaseError(e.to_string()))?
            .filter(|o| is_admin || o.user_id == acting_user_id)
            .ok_or_else(|| StorefrontError::OrderNotFound(order_id.clone()))?;
        trace!("🛒️ {} may cancel order {}", acting_user_id, order.order_id);
        let cancelled = self.db.cancel_order_with_restore(order_id).await?;
        info!("🛒️ Order {} cancelled by {}", cancelled.order_id, acting_user_id);
        self.call_order_annulled_hook(&cancelled).await;
        Ok(cancelled)
    }

    /// Applies an authenticated payment-gateway update to an order.
    ///
    /// Returns the order if a transition happened, `None` for the no-op outcomes: a `Pending` update, a `Settled`
    /// redelivery for an already-paid order, or an `Annulled` update for an order that some other trigger already
    /// cancelled. Re-applying the same update is always a no-op, never an error, and never touches stock twice.
    pub async fn apply_payment_update(
        &self,
        order_id: &OrderId,
        update: PaymentUpdate,
    ) -> Result<Option<Order>, StorefrontError> {
        match update {
            PaymentUpdate::Settled => {
                let (order, transitioned) = self.db.mark_order_paid(order_id).await?;
                if transitioned {
                    info!("💳️ Order {} is paid", order.order_id);
                    self.call_order_paid_hook(&order).await;
                    Ok(Some(order))
                } else {
                    debug!("💳️ Duplicate settlement notification for {}. Ignored", order.order_id);
                    Ok(None)
                }
            },
            PaymentUpdate::Annulled => match self.db.cancel_order_with_restore(order_id).await {
                Ok(order) => {
                    info!("💳️ Order {} annulled by the payment gateway", order.order_id);
                    self.call_order_annulled_hook(&order).await;
                    Ok(Some(order))
                },
                Err(StorefrontError::InvalidStateChange { from: OrderStatusType::Cancelled, .. }) => {
                    debug!("💳️ Duplicate annulment notification for {order_id}. Ignored");
                    Ok(None)
                },
                Err(e) => Err(e),
            },
            PaymentUpdate::Pending => {
                trace!("💳️ Payment for {order_id} is pending. Nothing to do");
                Ok(None)
            },
        }
    }

    /// A manual back-office transition. Validity is enforced by the state machine; a move to `Cancelled` restores
    /// stock, every other move leaves it alone.
    pub async fn update_order_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
    ) -> Result<Order, StorefrontError> {
        let order = self.db.advance_order_status(order_id, new_status).await?;
        info!("🛒️ Order {} manually moved to {}", order.order_id, order.status);
        match new_status {
            OrderStatusType::Paid => self.call_order_paid_hook(&order).await,
            OrderStatusType::Cancelled => self.call_order_annulled_hook(&order).await,
            _ => {},
        }
        Ok(order)
    }

    /// Cancels every order that has sat `Unpaid` longer than `limit`, restoring stock order by order. Failures are
    /// skipped and retried on the next run; overlapping sweeps are harmless.
    pub async fn expire_unpaid_orders(&self, limit: Duration) -> Result<SweepResult, StorefrontError> {
        let result = self.db.expire_unpaid_orders(limit).await?;
        for order in &result.cancelled {
            self.call_order_annulled_hook(order).await;
        }
        Ok(result)
    }

    async fn call_new_order_hook(&self, order: &Order) {
        for emitter in &self.producers.new_order_producer {
            trace!("🛒️📬️ Notifying new order hook subscribers");
            emitter.publish_event(NewOrderEvent::new(order.clone())).await;
        }
    }

    async fn call_order_paid_hook(&self, order: &Order) {
        for emitter in &self.producers.order_paid_producer {
            trace!("🛒️📬️ Notifying order paid hook subscribers");
            emitter.publish_event(OrderPaidEvent::new(order.clone())).await;
        }
    }

    async fn call_order_annulled_hook(&self, order: &Order) {
        for emitter in &self.producers.order_annulled_producer {
            trace!("🛒️📬️ Notifying order annulled hook subscribers");
            emitter.publish_event(OrderAnnulledEvent::new(order.clone())).await;
        }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}
