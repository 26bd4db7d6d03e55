use std::fmt::Display;

use kls_common::Rupiah;
use serde::{Deserialize, Serialize};

//--------------------------------------  Snap transactions  ---------------------------------------------------------

/// Request body for creating a Snap transaction. Midtrans requires the gross amount to match the sum of the order's
/// line items, so callers should pass the persisted order total verbatim.
#[derive(Debug, Clone, Serialize)]
pub struct SnapTransactionRequest {
    pub transaction_details: TransactionDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_details: Option<CustomerDetails>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionDetails {
    pub order_id: String,
    pub gross_amount: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CustomerDetails {
    pub email: String,
}

impl SnapTransactionRequest {
    pub fn new(order_id: String, gross_amount: Rupiah) -> Self {
        Self {
            transaction_details: TransactionDetails { order_id, gross_amount: gross_amount.value() },
            customer_details: None,
        }
    }

    pub fn with_customer_email(mut self, email: String) -> Self {
        self.customer_details = Some(CustomerDetails { email });
        self
    }
}

/// The gateway's response to a transaction request. The token drives the embedded payment widget; the redirect URL
/// is the hosted fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapTransaction {
    pub token: String,
    pub redirect_url: String,
}

//--------------------------------------     Notifications   ---------------------------------------------------------

/// The transaction status reported in a payment notification.
///
/// The set of statuses the gateway can send is open-ended (new payment methods introduce new values), so anything
/// unrecognised parses to [`TransactionStatus::Other`] rather than failing. Callers must treat `Other` as
/// "no conclusion", never as success or failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Card payment authorised; final verdict depends on the fraud assessment.
    Capture,
    /// Funds received and settled. Terminal success.
    Settlement,
    /// Awaiting payment.
    Pending,
    /// Rejected by the gateway or the acquiring bank.
    Deny,
    /// Cancelled by the merchant or the gateway.
    Cancel,
    /// The payment window elapsed without payment.
    Expire,
    #[serde(other)]
    Other,
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransactionStatus::Capture => "capture",
            TransactionStatus::Settlement => "settlement",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Deny => "deny",
            TransactionStatus::Cancel => "cancel",
            TransactionStatus::Expire => "expire",
            TransactionStatus::Other => "other",
        };
        write!(f, "{s}")
    }
}

/// The fraud assessment accompanying card captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudStatus {
    Accept,
    Challenge,
    Deny,
    #[serde(other)]
    Other,
}

/// An asynchronous payment notification as POSTed by the gateway.
///
/// `gross_amount` stays a string: it participates verbatim in the signature and the gateway is inconsistent about
/// whether it sends "490000" or "490000.00".
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentNotification {
    pub order_id: String,
    pub status_code: String,
    pub gross_amount: String,
    pub signature_key: String,
    pub transaction_status: TransactionStatus,
    #[serde(default)]
    pub fraud_status: Option<FraudStatus>,
    #[serde(default)]
    pub transaction_id: Option<String>,
}
