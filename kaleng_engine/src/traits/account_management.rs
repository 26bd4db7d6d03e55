use thiserror::Error;

use crate::{
    db_types::{NewUser, Order, OrderId, OrderItem, User},
    order_objects::OrderQueryFilter,
};

/// Read access to users and their orders, plus the single write needed to attribute orders: making sure a user row
/// exists for an externally-authenticated identity.
#[allow(async_fn_in_trait)]
pub trait AccountManagement {
    /// Fetches a user by id. `None` if no such user exists.
    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, AccountApiError>;

    /// Fetches a user by email address.
    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, AccountApiError>;

    /// Inserts the user if the id is new, otherwise returns the existing row untouched. Identity is issued by the
    /// external auth service; this is bookkeeping, not registration.
    async fn ensure_user(&self, user: NewUser) -> Result<User, AccountApiError>;

    /// Fetches a single order by its public order id.
    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, AccountApiError>;

    /// Fetches the line items for an order, in insertion order.
    async fn fetch_order_items(&self, order: &Order) -> Result<Vec<OrderItem>, AccountApiError>;

    /// Fetches all orders belonging to the user, newest first.
    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, AccountApiError>;

    /// Fetches orders matching the given filter, oldest first.
    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, AccountApiError>;
}

#[derive(Debug, Clone, Error)]
pub enum AccountApiError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("User error constructing query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for AccountApiError {
    fn from(e: sqlx::Error) -> Self {
        AccountApiError::DatabaseError(e.to_string())
    }
}
