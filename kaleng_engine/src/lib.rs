//! Kaleng Street Supply — storefront engine
//!
//! This library holds the core logic of the storefront: the product/variant inventory model, the order lifecycle
//! state machine, the stock reservation protocol, and the expiry sweep. It is transport-agnostic; the HTTP server
//! crate is a thin shell over the APIs exported here.
//!
//! The library is divided into two main sections:
//! 1. Database management and control ([`mod@sqlite`]). The supported backend is SQLite via sqlx. You should never
//!    need to touch the database directly; use the public APIs instead. The exception is the data types stored in
//!    the database, which are defined in the public [`mod@db_types`] module.
//! 2. The public storefront API ([`OrderFlowApi`], [`CatalogApi`], [`AccountApi`]). Backends implement the traits in
//!    [`mod@traits`]; the APIs are generic over them, which is what makes the order flow testable against mocks.
//!
//! The engine also emits events ([`mod@events`]) when orders are created, paid, or annulled. A small hook system
//! lets deployments attach async side effects (transactional mail, fulfilment pings) without coupling the engine to
//! any delivery mechanism.
pub mod db_types;
pub mod events;
pub mod order_objects;
mod store_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDatabase;
pub use store_api::{AccountApi, CatalogApi, OrderFlowApi};
pub use traits::{AccountApiError, AccountManagement, CatalogApiError, CatalogManagement, StorefrontDatabase, StorefrontError};
