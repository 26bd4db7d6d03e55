//! `SqliteDatabase` is the concrete SQLite backend for the storefront engine.
//!
//! It implements the traits in the [`crate::traits`] module on top of an sqlx connection pool. Multi-step
//! operations open a transaction and thread `&mut tx` through the low-level functions in [`super::db`], so the
//! stock counters and the order rows always move together.
use std::fmt::Debug;

use chrono::Duration;
use log::*;
use sqlx::SqlitePool;

use super::db::{new_pool, orders, products, users, MIGRATOR};
use crate::{
    db_types::{
        NewOrder,
        NewProduct,
        NewUser,
        Order,
        OrderId,
        OrderItem,
        OrderStatusType,
        ProductUpdate,
        ProductWithVariants,
        User,
    },
    order_objects::{OrderQueryFilter, SweepResult},
    traits::{AccountApiError, AccountManagement, CatalogApiError, CatalogManagement, StorefrontDatabase, StorefrontError},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Applies any pending schema migrations.
    pub async fn migrate(&self) -> Result<(), StorefrontError> {
        MIGRATOR.run(&self.pool).await.map_err(|e| StorefrontError::DatabaseError(e.to_string()))?;
        info!("🗃️ Database migrations complete");
        Ok(())
    }
}

impl StorefrontDatabase for SqliteDatabase {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn place_order(&self, order: NewOrder) -> Result<Order, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        // Whole-order validation before any mutation. The decrements below re-check, so a reservation racing past
        // this point still cannot oversell; it just fails with a fresher availability count.
        let lines = products::resolve_order_lines(&order.items, &mut tx).await?;
        for line in &lines {
            let remaining = match &line.variant_id {
                Some(vid) => products::try_reserve_variant_stock(vid, line.quantity, &mut tx).await?,
                None => products::try_reserve_product_stock(&line.product_id, line.quantity, &mut tx).await?,
            };
            match remaining {
                Some(left) => {
                    trace!("🗃️ Reserved {} x {} ({left} left)", line.quantity, line.product_name);
                },
                None => {
                    let available =
                        products::available_stock(&line.product_id, line.variant_id.as_deref(), &mut tx).await?;
                    debug!(
                        "🗃️ Reservation lost the race for {} (wanted {}, {available} available). Rolling back order {}",
                        line.product_name, line.quantity, order.order_id
                    );
                    return Err(StorefrontError::InsufficientStock {
                        product: line.product_name.clone(),
                        variant: line.variant_name.clone(),
                        available,
                        requested: line.quantity,
                    });
                },
            }
        }
        let stored = orders::insert_full_order(&order, &lines, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Order {} placed by {} for {}", stored.order_id, stored.user_id, stored.total);
        Ok(stored)
    }

    async fn mark_order_paid(&self, order_id: &OrderId) -> Result<(Order, bool), StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let transitioned =
            orders::transition_order_status(order_id, &[OrderStatusType::Unpaid], OrderStatusType::Paid, &mut tx)
                .await?;
        match transitioned {
            Some(order) => {
                tx.commit().await?;
                debug!("🗃️ Order {} marked as paid", order.order_id);
                Ok((order, true))
            },
            None => {
                let order = orders::fetch_order_by_order_id(order_id, &mut tx)
                    .await?
                    .ok_or_else(|| StorefrontError::OrderNotFound(order_id.clone()))?;
                if order.status == OrderStatusType::Paid {
                    // Redelivered confirmation. Same status, same stock; not an error.
                    debug!("🗃️ Order {} is already paid. No action to take", order.order_id);
                    Ok((order, false))
                } else {
                    Err(StorefrontError::InvalidStateChange {
                        order_id: order_id.clone(),
                        from: order.status,
                        to: OrderStatusType::Paid,
                    })
                }
            },
        }
    }

    async fn cancel_order_with_restore(&self, order_id: &OrderId) -> Result<Order, StorefrontError> {
        let mut tx = self.pool.begin().await?;
        let allowed = OrderStatusType::Cancelled.allowed_sources();
        match orders::transition_order_status(order_id, allowed, OrderStatusType::Cancelled, &mut tx).await? {
            Some(order) => {
                // This branch runs at most once per order: the conditional transition above fails for every
                // subsequent attempt, so the restoration below cannot be repeated.
                let items = orders::fetch_order_items(order.id, &mut tx).await?;
                for item in &items {
                    match &item.variant_id {
                        Some(vid) => products::release_variant_stock(vid, item.quantity, &mut tx).await?,
                        None => products::release_product_stock(&item.product_id, item.quantity, &mut tx).await?,
                    }
                }
                tx.commit().await?;
                debug!("🗃️ Order {} cancelled; {} lines restored to stock", order.order_id, items.len());
                Ok(order)
            },
            None => {
                let order = orders::fetch_order_by_order_id(order_id, &mut tx)
                    .await?
                    .ok_or_else(|| StorefrontError::OrderNotFound(order_id.clone()))?;
                Err(StorefrontError::InvalidStateChange {
                    order_id: order_id.clone(),
                    from: order.status,
                    to: OrderStatusType::Cancelled,
                })
            },
        }
    }

    async fn advance_order_status(
        &self,
        order_id: &OrderId,
        new_status: OrderStatusType,
    ) -> Result<Order, StorefrontError> {
        if new_status == OrderStatusType::Cancelled {
            return self.cancel_order_with_restore(order_id).await;
        }
        let allowed = new_status.allowed_sources();
        let mut tx = self.pool.begin().await?;
        match orders::transition_order_status(order_id, allowed, new_status, &mut tx).await? {
            Some(order) => {
                tx.commit().await?;
                Ok(order)
            },
            None => {
                let order = orders::fetch_order_by_order_id(order_id, &mut tx)
                    .await?
                    .ok_or_else(|| StorefrontError::OrderNotFound(order_id.clone()))?;
                Err(StorefrontError::InvalidStateChange { order_id: order_id.clone(), from: order.status, to: new_status })
            },
        }
    }

    async fn expire_unpaid_orders(&self, limit: Duration) -> Result<SweepResult, StorefrontError> {
        let expired = {
            let mut conn = self.pool.acquire().await?;
            orders::fetch_expired_unpaid(limit, &mut conn).await?
        };
        let mut result = SweepResult::default();
        for order_id in expired {
            // One transaction per order: a failure here must not take the rest of the batch down with it.
            match self.cancel_order_with_restore(&order_id).await {
                Ok(order) => result.cancelled.push(order),
                Err(StorefrontError::InvalidStateChange { from, .. }) => {
                    // Another trigger (webhook, manual cancel, overlapping sweep) got there first.
                    debug!("🗃️ Sweep skipped order {order_id}: already {from}");
                },
                Err(e) => {
                    warn!("🗃️ Sweep could not cancel order {order_id}. Will retry next run. {e}");
                },
            }
        }
        Ok(result)
    }

    async fn close(&mut self) -> Result<(), StorefrontError> {
        self.pool.close().await;
        Ok(())
    }
}

impl CatalogManagement for SqliteDatabase {
    async fn fetch_product(&self, product_id: &str) -> Result<Option<ProductWithVariants>, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        let product = products::fetch_product_with_variants(product_id, &mut conn).await?;
        Ok(product)
    }

    async fn fetch_products(&self) -> Result<Vec<ProductWithVariants>, CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        let result = products::fetch_products(&mut conn).await?;
        Ok(result)
    }

    async fn create_product(&self, product: NewProduct) -> Result<ProductWithVariants, CatalogApiError> {
        let mut tx = self.pool.begin().await?;
        let stored = products::insert_product(product, &mut tx).await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn update_product(
        &self,
        product_id: &str,
        update: ProductUpdate,
    ) -> Result<ProductWithVariants, CatalogApiError> {
        let mut tx = self.pool.begin().await?;
        let stored = products::update_product(product_id, update, &mut tx).await?;
        tx.commit().await?;
        Ok(stored)
    }

    async fn delete_product(&self, product_id: &str) -> Result<(), CatalogApiError> {
        let mut conn = self.pool.acquire().await?;
        products::delete_product(product_id, &mut conn).await
    }
}

impl AccountManagement for SqliteDatabase {
    async fn fetch_user(&self, user_id: &str) -> Result<Option<User>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user(user_id, &mut conn).await?;
        Ok(user)
    }

    async fn fetch_user_by_email(&self, email: &str) -> Result<Option<User>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let user = users::fetch_user_by_email(email, &mut conn).await?;
        Ok(user)
    }

    async fn ensure_user(&self, user: NewUser) -> Result<User, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        users::ensure_user(user, &mut conn).await
    }

    async fn fetch_order_by_order_id(&self, order_id: &OrderId) -> Result<Option<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order_by_order_id(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_items(&self, order: &Order) -> Result<Vec<OrderItem>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let items = orders::fetch_order_items(order.id, &mut conn).await?;
        Ok(items)
    }

    async fn fetch_orders_for_user(&self, user_id: &str) -> Result<Vec<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::fetch_orders_for_user(user_id, &mut conn).await?;
        Ok(result)
    }

    async fn search_orders(&self, query: OrderQueryFilter) -> Result<Vec<Order>, AccountApiError> {
        let mut conn = self.pool.acquire().await?;
        let result = orders::search_orders(query, &mut conn).await?;
        Ok(result)
    }
}
