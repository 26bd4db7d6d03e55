//! # SQLite database methods
//!
//! "Low-level" SQLite interactions live here, maintained as plain functions (rather than stateful structs) that
//! accept a `&mut SqliteConnection`. Callers can hand in a pooled connection, or open a transaction and pass
//! `&mut tx` so several calls commit or roll back as one atomic unit.
use std::str::FromStr;

use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError,
    SqlitePool,
};

pub mod orders;
pub mod products;
pub mod users;

pub static MIGRATOR: Migrator = sqlx::migrate!("./src/sqlite/migrations");

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}
