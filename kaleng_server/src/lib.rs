//! # Kaleng Street Supply server
//!
//! The HTTP shell around [`kaleng_engine`]. It is responsible for:
//! * the customer-facing storefront API (catalog reads, checkout, order history, cancellation),
//! * the back-office API (order search, manual status transitions, product administration),
//! * receiving and authenticating payment notifications from the gateway, and
//! * running the unpaid-order expiry worker.
//!
//! ## Configuration
//! The server is configured via `KLS_`-prefixed environment variables. See [config](config/index.html).
pub mod auth;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod expiry_worker;
pub mod helpers;
pub mod integrations;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod webhook_routes;

#[cfg(test)]
mod endpoint_tests;
