use chrono::Duration;
use thiserror::Error;

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType},
    order_objects::SweepResult,
    traits::{AccountManagement, CatalogManagement},
};

/// The highest level of behaviour for storefront backends: the operations with real correctness obligations.
///
/// Every method that lands an order on `Cancelled` also returns the reserved stock, inside the same transaction as
/// the status flip. Implementations must arbitrate concurrent triggers with conditional updates (transition the
/// status only if it is still in the allowed source set; decrement stock only if enough remains) rather than
/// read-modify-write at the application layer — two concurrent checkouts must never jointly oversell, and two
/// concurrent cancellation triggers must never both restore.
#[allow(async_fn_in_trait)]
pub trait StorefrontDatabase: Clone + AccountManagement + CatalogManagement {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Validates and reserves stock for every line of the order, then persists the order and its items, all in one
    /// atomic transaction. The order starts out `Unpaid`.
    ///
    /// Validation covers the whole order before anything is mutated: a missing product, a missing or unmatched
    /// variant, or a short stock counter fails the entire checkout with no partial decrement. The decrement itself
    /// is conditional, so a reservation that raced past validation still cannot push a counter below zero; it fails
    /// with [`StorefrontError::InsufficientStock`] instead and the transaction rolls back.
    async fn place_order(&self, order: NewOrder) -> Result<Order, StorefrontError>;

    /// Moves an `Unpaid` order to `Paid`. Stock is not touched.
    ///
    /// Returns the order and a flag indicating whether this call performed the transition. An order that is already
    /// `Paid` is an idempotent no-op (`false`) rather than an error, because the payment gateway redelivers
    /// notifications freely.
    async fn mark_order_paid(&self, order_id: &OrderId) -> Result<(Order, bool), StorefrontError>;

    /// Cancels an order that is still `Unpaid` or `Paid` and returns every reserved item to stock.
    ///
    /// The status flip and the restoration commit or roll back together, and the flip is conditional on the current
    /// status, which is what guarantees restore-exactly-once when the webhook, the expiry sweep, and a manual
    /// cancellation race each other.
    async fn cancel_order_with_restore(&self, order_id: &OrderId) -> Result<Order, StorefrontError>;

    /// An administrative transition to `new_status`, validated against the lifecycle graph
    /// ([`OrderStatusType::allowed_sources`]). A transition to `Cancelled` delegates to
    /// [`Self::cancel_order_with_restore`]; every other transition leaves stock alone.
    async fn advance_order_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
    ) -> Result<Order, StorefrontError>;

    /// Cancels every `Unpaid` order whose `created_at` is older than `limit`, restoring stock per order.
    ///
    /// Each qualifying order is cancelled in its own transaction; one failure is logged and skipped so the rest of
    /// the batch still proceeds, and the order is retried on the next sweep. Safe to call at arbitrary intervals,
    /// including from overlapping invocations.
    async fn expire_unpaid_orders(&self, limit: Duration) -> Result<SweepResult, StorefrontError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), StorefrontError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum StorefrontError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("Product {0} does not exist")]
    ProductNotFound(String),
    #[error("Please choose a variant for {product}")]
    VariantRequired { product: String },
    #[error("Variant {variant} does not exist for {product}")]
    VariantNotFound { product: String, variant: String },
    #[error("Order quantity for {product} must be greater than zero")]
    InvalidQuantity { product: String },
    #[error("Insufficient stock for {product}. Available: {available}, requested: {requested}")]
    InsufficientStock { product: String, variant: Option<String>, available: i64, requested: i64 },
    #[error("Cannot insert order, since it already exists with id {0}")]
    OrderAlreadyExists(OrderId),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {order_id} cannot move from {from} to {to}")]
    InvalidStateChange { order_id: OrderId, from: OrderStatusType, to: OrderStatusType },
    #[error("Not permitted: {0}")]
    Forbidden(String),
}

impl From<sqlx::Error> for StorefrontError {
    fn from(e: sqlx::Error) -> Self {
        StorefrontError::DatabaseError(e.to_string())
    }
}
