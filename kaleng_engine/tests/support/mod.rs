//! Shared scaffolding for the engine integration tests: throwaway SQLite databases plus a handful of seed helpers.
#![allow(dead_code)]

use kaleng_engine::{
    db_types::{NewOrder, NewOrderItem, NewProduct, NewUser, NewVariant, OrderId, ProductWithVariants, User},
    AccountManagement,
    CatalogManagement,
    SqliteDatabase,
};
use kls_common::Rupiah;

pub fn random_db_url() -> String {
    let dir = std::env::temp_dir();
    format!("sqlite://{}/kaleng_test_{}.db", dir.display(), rand::random::<u64>())
}

/// Creates a fresh database at `url` and runs the migrations against it.
pub async fn prepare_test_env(url: &str) -> SqliteDatabase {
    prepare_test_env_with(url, 5).await
}

/// As [`prepare_test_env`], with an explicit pool size. The contention tests use a single connection so that
/// overlapping units of work serialize at the pool instead of surfacing as SQLITE_BUSY noise.
pub async fn prepare_test_env_with(url: &str, max_connections: u32) -> SqliteDatabase {
    dotenvy::dotenv().ok();
    let _ = env_logger::try_init();
    let db = SqliteDatabase::new_with_url(url, max_connections).await.expect("Error creating connection to database");
    db.migrate().await.expect("Error running DB migrations");
    db
}

pub async fn seed_user(db: &SqliteDatabase, id: &str) -> User {
    let user = NewUser { id: id.to_string(), name: Some(id.to_string()), email: format!("{id}@example.com") };
    db.ensure_user(user).await.expect("Error seeding user")
}

pub async fn seed_product(db: &SqliteDatabase, name: &str, price: i64, stock: i64) -> ProductWithVariants {
    let product = NewProduct {
        name: name.to_string(),
        description: format!("{name} — test catalog entry"),
        price: Rupiah::from(price),
        stock,
        variant_type: None,
        variants: vec![],
    };
    db.create_product(product).await.expect("Error seeding product")
}

pub async fn seed_product_with_variants(
    db: &SqliteDatabase,
    name: &str,
    price: i64,
    variants: &[(&str, i64)],
) -> ProductWithVariants {
    let product = NewProduct {
        name: name.to_string(),
        description: format!("{name} — test catalog entry"),
        price: Rupiah::from(price),
        stock: 0,
        variant_type: Some("Color".to_string()),
        variants: variants.iter().map(|(n, s)| NewVariant { name: n.to_string(), stock: *s }).collect(),
    };
    db.create_product(product).await.expect("Error seeding product")
}

pub fn order_for(user_id: &str, items: Vec<NewOrderItem>) -> NewOrder {
    NewOrder::new(user_id.to_string(), "Jl. Kemang Raya 12, Jakarta Selatan".to_string(), items)
}

pub fn line(product_id: &str, quantity: i64) -> NewOrderItem {
    NewOrderItem { product_id: product_id.to_string(), variant_id: None, quantity }
}

pub fn variant_line(product_id: &str, variant_id: &str, quantity: i64) -> NewOrderItem {
    NewOrderItem { product_id: product_id.to_string(), variant_id: Some(variant_id.to_string()), quantity }
}

pub async fn product_stock(db: &SqliteDatabase, product_id: &str) -> i64 {
    let product = db.fetch_product(product_id).await.expect("Error fetching product").expect("Product missing");
    product.product.stock
}

pub async fn variant_stock(db: &SqliteDatabase, product_id: &str, variant_id: &str) -> i64 {
    let product = db.fetch_product(product_id).await.expect("Error fetching product").expect("Product missing");
    product.variants.iter().find(|v| v.id == variant_id).expect("Variant missing").stock
}

/// Rewrites an order's creation time to `minutes` minutes ago, for exercising the expiry sweep.
pub async fn backdate_order(db: &SqliteDatabase, order_id: &OrderId, minutes: i64) {
    sqlx::query("UPDATE orders SET created_at = datetime('now', $1) WHERE order_id = $2")
        .bind(format!("-{minutes} minutes"))
        .bind(order_id.as_str())
        .execute(db.pool())
        .await
        .expect("Error backdating order");
}
