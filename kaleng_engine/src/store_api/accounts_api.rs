//! Unified API for accessing users and their orders.
use std::fmt::Debug;

use kls_common::Rupiah;
use log::trace;

use crate::{
    db_types::{NewUser, Order, OrderId, User},
    order_objects::{OrderQueryFilter, OrderResult, OrderWithItems},
    traits::{AccountApiError, AccountManagement},
};

pub struct AccountApi<B> {
    db: B,
}

impl<B: Debug> Debug for AccountApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AccountApi ({:?})", self.db)
    }
}

impl<B> AccountApi<B>
where B: AccountManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn user_by_id(&self, user_id: &str) -> Result<Option<User>, AccountApiError> {
        self.db.fetch_user(user_id).await
    }

    pub async fn user_by_email(&self, email: &str) -> Result<Option<User>, AccountApiError> {
        self.db.fetch_user_by_email(email).await
    }

    pub async fn ensure_user(&self, user: NewUser) -> Result<User, AccountApiError> {
        self.db.ensure_user(user).await
    }

    /// Fetches all orders for the given user, wrapped in an [`OrderResult`] with the total across them.
    pub async fn orders_for_user(&self, user_id: &str) -> Result<OrderResult, AccountApiError> {
        let orders = self.db.fetch_orders_for_user(user_id).await?;
        trace!("💻️ {} orders fetched for user {user_id}", orders.len());
        let total_orders: Rupiah = orders.iter().map(|o| o.total).sum();
        Ok(OrderResult { user_id: user_id.to_string(), total_orders, orders })
    }

    pub async fn order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, AccountApiError> {
        self.db.fetch_order_by_order_id(order_id).await
    }

    /// Fetches an order together with its line items. `None` if no such order exists.
    pub async fn order_with_items(&self, order_id: &OrderId) -> Result<Option<OrderWithItems>, AccountApiError> {
        let order = match self.db.fetch_order_by_order_id(order_id).await? {
            Some(o) => o,
            None => return Ok(None),
        };
        let items = self.db.fetch_order_items(&order).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    pub async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, AccountApiError> {
        trace!("💻️ Searching orders: {query}");
        self.db.search_orders(query).await
    }
}
