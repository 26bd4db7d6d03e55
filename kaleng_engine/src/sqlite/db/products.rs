use log::{debug, trace};
use rand::distributions::{Alphanumeric, DistString};
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewOrderItem, NewProduct, NewVariant, Product, ProductUpdate, ProductWithVariants, ResolvedOrderLine, Variant},
    traits::{CatalogApiError, StorefrontError},
};

fn new_row_id(prefix: &str) -> String {
    let suffix = Alphanumeric.sample_string(&mut rand::thread_rng(), 16).to_lowercase();
    format!("{prefix}_{suffix}")
}

//--------------------------------------   Catalog reads    ---------------------------------------------------------

pub async fn fetch_product(product_id: &str, conn: &mut SqliteConnection) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await
}

pub async fn fetch_variants(product_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Variant>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM variants WHERE product_id = $1 ORDER BY name").bind(product_id).fetch_all(conn).await
}

pub async fn fetch_product_with_variants(
    product_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ProductWithVariants>, sqlx::Error> {
    let product = match fetch_product(product_id, conn).await? {
        Some(p) => p,
        None => return Ok(None),
    };
    let variants = fetch_variants(product_id, conn).await?;
    Ok(Some(ProductWithVariants { product, variants }))
}

pub async fn fetch_products(conn: &mut SqliteConnection) -> Result<Vec<ProductWithVariants>, sqlx::Error> {
    let products: Vec<Product> = sqlx::query_as("SELECT * FROM products ORDER BY name").fetch_all(&mut *conn).await?;
    let mut result = Vec::with_capacity(products.len());
    for product in products {
        let variants = fetch_variants(&product.id, &mut *conn).await?;
        result.push(ProductWithVariants { product, variants });
    }
    Ok(result)
}

//--------------------------------------   Catalog writes   ---------------------------------------------------------

pub async fn insert_product(
    product: NewProduct,
    conn: &mut SqliteConnection,
) -> Result<ProductWithVariants, CatalogApiError> {
    let id = new_row_id("prd");
    let stored: Product = sqlx::query_as(
        r#"
            INSERT INTO products (id, name, description, price, stock, variant_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *;
        "#,
    )
    .bind(&id)
    .bind(product.name)
    .bind(product.description)
    .bind(product.price)
    .bind(product.stock)
    .bind(product.variant_type)
    .fetch_one(&mut *conn)
    .await?;
    for variant in product.variants {
        insert_variant(&id, &variant, &mut *conn).await?;
    }
    let variants = fetch_variants(&id, conn).await?;
    debug!("🗂️ Product [{}] created with {} variants", stored.name, variants.len());
    Ok(ProductWithVariants { product: stored, variants })
}

async fn insert_variant(
    product_id: &str,
    variant: &NewVariant,
    conn: &mut SqliteConnection,
) -> Result<Variant, sqlx::Error> {
    sqlx::query_as(
        r#"
            INSERT INTO variants (id, product_id, name, stock)
            VALUES ($1, $2, $3, $4)
            RETURNING *;
        "#,
    )
    .bind(new_row_id("var"))
    .bind(product_id)
    .bind(&variant.name)
    .bind(variant.stock)
    .fetch_one(conn)
    .await
}

pub async fn update_product(
    product_id: &str,
    update: ProductUpdate,
    conn: &mut SqliteConnection,
) -> Result<ProductWithVariants, CatalogApiError> {
    if update.is_empty() {
        return Err(CatalogApiError::EmptyUpdate);
    }
    let mut builder = sqlx::QueryBuilder::new("UPDATE products SET updated_at = CURRENT_TIMESTAMP, ");
    let mut set_clause = builder.separated(", ");
    if let Some(name) = update.name {
        set_clause.push("name = ");
        set_clause.push_bind_unseparated(name);
    }
    if let Some(description) = update.description {
        set_clause.push("description = ");
        set_clause.push_bind_unseparated(description);
    }
    if let Some(price) = update.price {
        set_clause.push("price = ");
        set_clause.push_bind_unseparated(price);
    }
    if let Some(stock) = update.stock {
        set_clause.push("stock = ");
        set_clause.push_bind_unseparated(stock);
    }
    if let Some(variant_type) = update.variant_type {
        set_clause.push("variant_type = ");
        set_clause.push_bind_unseparated(variant_type);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(product_id);
    builder.push(" RETURNING *");
    trace!("🗂️ Executing query: {}", builder.sql());
    let product: Option<Product> = builder.build_query_as().fetch_optional(&mut *conn).await?;
    let product = product.ok_or_else(|| CatalogApiError::ProductNotFound(product_id.to_string()))?;
    if let Some(variants) = update.variants {
        replace_variants(product_id, &variants, &mut *conn).await?;
    }
    let variants = fetch_variants(product_id, conn).await?;
    Ok(ProductWithVariants { product, variants })
}

/// Replaces the product's variant set: rows are matched by name, new names inserted, absent names deleted. Stock on
/// surviving variants is only overwritten when the update names a count, so an admin can rename the set without
/// clobbering counters the reservation protocol is working on.
async fn replace_variants(
    product_id: &str,
    variants: &[NewVariant],
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    let existing = fetch_variants(product_id, &mut *conn).await?;
    for variant in variants {
        match existing.iter().find(|v| v.name == variant.name) {
            Some(v) => {
                sqlx::query("UPDATE variants SET stock = $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
                    .bind(variant.stock)
                    .bind(&v.id)
                    .execute(&mut *conn)
                    .await?;
            },
            None => {
                insert_variant(product_id, variant, &mut *conn).await?;
            },
        }
    }
    for stale in existing.iter().filter(|v| !variants.iter().any(|nv| nv.name == v.name)) {
        sqlx::query("DELETE FROM variants WHERE id = $1").bind(&stale.id).execute(&mut *conn).await?;
    }
    Ok(())
}

pub async fn delete_product(product_id: &str, conn: &mut SqliteConnection) -> Result<(), CatalogApiError> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(product_id).execute(conn).await?;
    if result.rows_affected() == 0 {
        return Err(CatalogApiError::ProductNotFound(product_id.to_string()));
    }
    debug!("🗂️ Product {product_id} deleted");
    Ok(())
}

//--------------------------------------  Order resolution  ---------------------------------------------------------

/// The validation pass of the reservation protocol. Resolves every requested line against the catalog — which
/// counter it draws from, the current availability, and the unit price snapshot — and fails the whole order on the
/// first line that cannot be satisfied. Performs no mutation.
pub async fn resolve_order_lines(
    items: &[NewOrderItem],
    conn: &mut SqliteConnection,
) -> Result<Vec<ResolvedOrderLine>, StorefrontError> {
    let mut lines = Vec::with_capacity(items.len());
    for item in items {
        let product = fetch_product(&item.product_id, &mut *conn)
            .await?
            .ok_or_else(|| StorefrontError::ProductNotFound(item.product_id.clone()))?;
        if item.quantity <= 0 {
            return Err(StorefrontError::InvalidQuantity { product: product.name });
        }
        let variants = fetch_variants(&item.product_id, &mut *conn).await?;
        let line = if variants.is_empty() {
            if product.stock < item.quantity {
                return Err(StorefrontError::InsufficientStock {
                    product: product.name,
                    variant: None,
                    available: product.stock,
                    requested: item.quantity,
                });
            }
            ResolvedOrderLine {
                product_id: product.id,
                product_name: product.name,
                variant_id: None,
                variant_name: None,
                quantity: item.quantity,
                unit_price: product.price,
            }
        } else {
            let variant_id = item
                .variant_id
                .as_ref()
                .ok_or_else(|| StorefrontError::VariantRequired { product: product.name.clone() })?;
            let variant = variants.iter().find(|v| &v.id == variant_id).ok_or_else(|| {
                StorefrontError::VariantNotFound { product: product.name.clone(), variant: variant_id.clone() }
            })?;
            if variant.stock < item.quantity {
                return Err(StorefrontError::InsufficientStock {
                    product: product.name,
                    variant: Some(variant.name.clone()),
                    available: variant.stock,
                    requested: item.quantity,
                });
            }
            ResolvedOrderLine {
                product_id: product.id,
                product_name: product.name,
                variant_id: Some(variant.id.clone()),
                variant_name: Some(variant.name.clone()),
                quantity: item.quantity,
                unit_price: product.price,
            }
        };
        lines.push(line);
    }
    Ok(lines)
}

//--------------------------------------    Stock counters   ---------------------------------------------------------

/// Decrement-if-sufficient on a product counter. Returns the remaining stock, or `None` if the counter held fewer
/// than `quantity` units — the caller must treat that as a failed reservation, not retry the arithmetic.
pub async fn try_reserve_product_stock(
    product_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        "UPDATE products SET stock = stock - $1, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $2 AND stock >= $1 RETURNING stock",
    )
    .bind(quantity)
    .bind(product_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(|(stock,)| stock))
}

/// Decrement-if-sufficient on a variant counter.
pub async fn try_reserve_variant_stock(
    variant_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        "UPDATE variants SET stock = stock - $1, updated_at = CURRENT_TIMESTAMP \
         WHERE id = $2 AND stock >= $1 RETURNING stock",
    )
    .bind(quantity)
    .bind(variant_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(|(stock,)| stock))
}

pub async fn release_product_stock(
    product_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE products SET stock = stock + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(quantity)
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn release_variant_stock(
    variant_id: &str,
    quantity: i64,
    conn: &mut SqliteConnection,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE variants SET stock = stock + $1, updated_at = CURRENT_TIMESTAMP WHERE id = $2")
        .bind(quantity)
        .bind(variant_id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Re-reads the counter a failed reservation drew from, for the user-facing error message.
pub async fn available_stock(
    product_id: &str,
    variant_id: Option<&str>,
    conn: &mut SqliteConnection,
) -> Result<i64, sqlx::Error> {
    let row: Option<(i64,)> = match variant_id {
        Some(vid) => sqlx::query_as("SELECT stock FROM variants WHERE id = $1").bind(vid).fetch_optional(conn).await?,
        None => {
            sqlx::query_as("SELECT stock FROM products WHERE id = $1").bind(product_id).fetch_optional(conn).await?
        },
    };
    Ok(row.map(|(stock,)| stock).unwrap_or_default())
}
