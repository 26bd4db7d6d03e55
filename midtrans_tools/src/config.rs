use kls_common::Secret;
use log::*;

#[derive(Debug, Clone, Default)]
pub struct MidtransConfig {
    /// Base URL of the Snap API, e.g. "https://app.midtrans.com/snap/v1" for production.
    pub base_url: String,
    /// The merchant server key. Authenticates outbound API calls and is the shared secret in notification
    /// signatures.
    pub server_key: Secret<String>,
}

impl MidtransConfig {
    pub fn new_from_env_or_default() -> Self {
        let base_url = std::env::var("KLS_MIDTRANS_BASE_URL").unwrap_or_else(|_| {
            warn!("KLS_MIDTRANS_BASE_URL not set, using the sandbox environment");
            "https://app.sandbox.midtrans.com/snap/v1".to_string()
        });
        let server_key = Secret::new(std::env::var("KLS_MIDTRANS_SERVER_KEY").unwrap_or_else(|_| {
            warn!("KLS_MIDTRANS_SERVER_KEY not set, using a (probably useless) default");
            "SB-Mid-server-00000000000000".to_string()
        }));
        Self { base_url, server_key }
    }
}
