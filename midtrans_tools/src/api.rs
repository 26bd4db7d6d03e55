use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    config::MidtransConfig,
    data_objects::{SnapTransaction, SnapTransactionRequest},
    MidtransApiError,
};

#[derive(Clone)]
pub struct MidtransApi {
    config: MidtransConfig,
    client: Arc<Client>,
}

impl MidtransApi {
    pub fn new(config: MidtransConfig) -> Result<Self, MidtransApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        headers.insert("Accept", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| MidtransApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    /// Requests a Snap transaction for the given order. The returned token is short-lived; the storefront hands it
    /// straight to the client rather than persisting it.
    pub async fn create_transaction(
        &self,
        request: SnapTransactionRequest,
    ) -> Result<SnapTransaction, MidtransApiError> {
        trace!(
            "🤝️ Requesting Snap transaction for order {} ({})",
            request.transaction_details.order_id,
            request.transaction_details.gross_amount
        );
        let transaction: SnapTransaction = self.rest_query(Method::POST, "/transactions", Some(request)).await?;
        debug!("🤝️ Snap transaction created. Redirect URL: {}", transaction.redirect_url);
        Ok(transaction)
    }

    async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, MidtransApiError> {
        let url = format!("{}{path}", self.config.base_url);
        trace!("🤝️ Sending REST query: {url}");
        // Midtrans authenticates with HTTP Basic auth: the server key as username, empty password.
        let mut req = self.client.request(method, url).basic_auth(self.config.server_key.reveal(), Some(""));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| MidtransApiError::ResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("🤝️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| MidtransApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| MidtransApiError::ResponseError(e.to_string()))?;
            Err(MidtransApiError::QueryError { status, message })
        }
    }
}
