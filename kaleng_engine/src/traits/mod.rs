//! Behaviour contracts for storefront backends.
//!
//! A concrete backend (currently SQLite, see [`crate::SqliteDatabase`]) implements these traits; everything above
//! them — the order flow, catalog, and account APIs — is generic, so the whole core can run against a mock or an
//! alternative store.
mod account_management;
mod catalog_management;
mod storefront_database;

pub use account_management::{AccountApiError, AccountManagement};
pub use catalog_management::{CatalogApiError, CatalogManagement};
pub use storefront_database::{StorefrontDatabase, StorefrontError};
