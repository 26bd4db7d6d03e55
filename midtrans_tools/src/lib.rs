//! Client tools for the Midtrans payment gateway.
//!
//! This crate covers the two directions the storefront talks to the gateway in:
//! * Outbound: creating a Snap transaction for a freshly placed order ([`MidtransApi::create_transaction`]). The
//!   returned token and redirect URL are handed to the client, which completes payment on the gateway's pages.
//! * Inbound: parsing and authenticating the asynchronous payment notifications the gateway POSTs back
//!   ([`data_objects::PaymentNotification`] and [`helpers::verify_notification_signature`]).
//!
//! The crate knows nothing about orders or stock; mapping a transaction status onto an order lifecycle transition is
//! the storefront's job.
mod api;
mod config;
pub mod data_objects;
mod error;
pub mod helpers;

pub use api::MidtransApi;
pub use config::MidtransConfig;
pub use data_objects::{FraudStatus, PaymentNotification, SnapTransaction, TransactionStatus};
pub use error::MidtransApiError;
