use chrono::Duration;
use kls_common::Rupiah;
use log::{debug, trace};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderItem, OrderStatusType, ResolvedOrderLine},
    order_objects::OrderQueryFilter,
    traits::StorefrontError,
};

/// Inserts an order and its line items. Not atomic on its own; the caller embeds this in the reservation
/// transaction and passes `&mut tx` so the insert commits or rolls back together with the stock decrements.
pub async fn insert_full_order(
    order: &NewOrder,
    lines: &[ResolvedOrderLine],
    conn: &mut SqliteConnection,
) -> Result<Order, StorefrontError> {
    if fetch_order_by_order_id(&order.order_id, &mut *conn).await?.is_some() {
        return Err(StorefrontError::OrderAlreadyExists(order.order_id.clone()));
    }
    let total: Rupiah = lines.iter().map(ResolvedOrderLine::line_total).sum();
    let stored: Order = sqlx::query_as(
        r#"
            INSERT INTO orders (order_id, user_id, status, address, total)
            VALUES ($1, $2, 'Unpaid', $3, $4)
            RETURNING *;
        "#,
    )
    .bind(&order.order_id)
    .bind(&order.user_id)
    .bind(&order.address)
    .bind(total)
    .fetch_one(&mut *conn)
    .await?;
    for line in lines {
        sqlx::query(
            r#"
                INSERT INTO order_items (order_id, product_id, variant_id, variant_name, quantity, price)
                VALUES ($1, $2, $3, $4, $5, $6);
            "#,
        )
        .bind(stored.id)
        .bind(&line.product_id)
        .bind(&line.variant_id)
        .bind(&line.variant_name)
        .bind(line.quantity)
        .bind(line.unit_price)
        .execute(&mut *conn)
        .await?;
    }
    debug!("📝️ Order [{}] inserted with id {} ({} lines, {total})", stored.order_id, stored.id, lines.len());
    Ok(stored)
}

/// Returns the order with the given public order id.
pub async fn fetch_order_by_order_id(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE order_id = $1").bind(order_id.as_str()).fetch_optional(conn).await
}

pub async fn fetch_order_items(order_db_id: i64, conn: &mut SqliteConnection) -> Result<Vec<OrderItem>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM order_items WHERE order_id = $1 ORDER BY id").bind(order_db_id).fetch_all(conn).await
}

pub async fn fetch_orders_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await
}

/// Fetches orders according to the criteria in the `OrderQueryFilter`, ordered by `created_at` ascending.
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(order_id) = query.order_id {
        where_clause.push("order_id = ");
        where_clause.push_bind_unseparated(order_id.to_string());
    }
    if let Some(user_id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(address) = query.address {
        where_clause.push("address LIKE ");
        where_clause.push_bind_unseparated(format!("%{address}%"));
    }
    if query.status.as_ref().map(|s| !s.is_empty()).unwrap_or(false) {
        let statuses =
            query.status.as_ref().map(|s| s.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>()).unwrap_or_default();
        where_clause.push(format!("status IN ({})", statuses.join(",")));
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC");
    trace!("📝️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("📝️ Result of search_orders: {} rows", orders.len());
    Ok(orders)
}

/// The conditional status transition at the heart of the lifecycle state machine.
///
/// Flips the order to `new_status` only if its current status is still in `allowed_from`, in a single UPDATE, and
/// returns the updated row. `None` means the order either does not exist or was no longer in an allowed source
/// state — the caller re-reads to tell the two apart. Two racing triggers can never both see a row returned.
pub async fn transition_order_status(
    order_id: &OrderId,
    allowed_from: &[OrderStatusType],
    new_status: OrderStatusType,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let sources = allowed_from.iter().map(|s| format!("'{s}'")).collect::<Vec<_>>().join(",");
    let sql = format!(
        "UPDATE orders SET status = $1, updated_at = CURRENT_TIMESTAMP \
         WHERE order_id = $2 AND status IN ({sources}) RETURNING *"
    );
    let order: Option<Order> =
        sqlx::query_as(&sql).bind(new_status.to_string()).bind(order_id.as_str()).fetch_optional(conn).await?;
    if let Some(o) = &order {
        debug!("📝️ Order [{}] moved to {}", o.order_id, o.status);
    }
    Ok(order)
}

/// The public order ids of all `Unpaid` orders older than `limit`, oldest first. The sweep cancels each one
/// individually through the conditional transition, so this read does not need to lock anything.
pub async fn fetch_expired_unpaid(limit: Duration, conn: &mut SqliteConnection) -> Result<Vec<OrderId>, sqlx::Error> {
    let rows: Vec<(String,)> = sqlx::query_as(
        "SELECT order_id FROM orders WHERE status = 'Unpaid' AND \
         (unixepoch(CURRENT_TIMESTAMP) - unixepoch(created_at)) > $1 ORDER BY created_at ASC",
    )
    .bind(limit.num_seconds())
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(|(id,)| OrderId(id)).collect())
}
