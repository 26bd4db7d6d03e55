//! Courier rate lookup against the Biteship aggregator.
//!
//! Outbound only; the chosen rate ends up as a plain line item on the order total and plays no part in the order
//! state machine. Destinations are hybrid: an area id is the most precise, then a postal code, then raw
//! coordinates, and the first one present wins.
use std::sync::Arc;

use kls_common::{Rupiah, Secret};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::ServerError;

/// Flat rate weight assumption per unit, in grams. The catalog does not track item weight.
const UNIT_WEIGHT_GRAMS: i64 = 500;
const COURIERS: &str = "jne,jnt,sicepat,anteraja,ninja";

#[derive(Debug, Clone, Default)]
pub struct ShippingConfig {
    pub base_url: String,
    pub api_key: Secret<String>,
    /// Postal code of the warehouse the couriers collect from.
    pub origin_postal_code: u32,
}

impl ShippingConfig {
    pub fn from_env_or_default() -> Self {
        let base_url = std::env::var("KLS_BITESHIP_BASE_URL").unwrap_or_else(|_| {
            warn!("KLS_BITESHIP_BASE_URL not set, using the public endpoint");
            "https://api.biteship.com".to_string()
        });
        let api_key = Secret::new(std::env::var("KLS_BITESHIP_API_KEY").unwrap_or_else(|_| {
            warn!("KLS_BITESHIP_API_KEY not set. Rate lookups will be rejected upstream.");
            String::default()
        }));
        let origin_postal_code = std::env::var("KLS_WAREHOUSE_POSTAL_CODE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(12920);
        Self { base_url, api_key, origin_postal_code }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateRequest {
    #[serde(default)]
    pub destination_area_id: Option<String>,
    #[serde(default)]
    pub destination_postal_code: Option<u32>,
    #[serde(default)]
    pub destination_latitude: Option<f64>,
    #[serde(default)]
    pub destination_longitude: Option<f64>,
    pub items: Vec<RateItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateItem {
    pub price: Rupiah,
    pub quantity: i64,
}

impl RateRequest {
    pub fn has_destination(&self) -> bool {
        self.destination_area_id.is_some()
            || self.destination_postal_code.is_some()
            || (self.destination_latitude.is_some() && self.destination_longitude.is_some())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourierRate {
    pub courier_code: String,
    pub courier_service_code: String,
    pub courier_service_name: String,
    pub price: Rupiah,
    #[serde(default)]
    pub duration: Option<String>,
}

#[derive(Clone)]
pub struct CourierRatesApi {
    config: ShippingConfig,
    client: Arc<Client>,
}

impl CourierRatesApi {
    pub fn new(config: ShippingConfig) -> Result<Self, ServerError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.api_key.reveal())
            .map_err(|e| ServerError::InitializeError(e.to_string()))?;
        headers.insert("Authorization", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client =
            Client::builder().default_headers(headers).build().map_err(|e| ServerError::InitializeError(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn fetch_rates(&self, request: &RateRequest) -> Result<Vec<CourierRate>, ServerError> {
        let total_weight: i64 = request.items.iter().map(|i| i.quantity * UNIT_WEIGHT_GRAMS).sum();
        let total_value: Rupiah = request.items.iter().map(|i| i.price * i.quantity).sum();
        let mut payload = json!({
            "origin_postal_code": self.config.origin_postal_code,
            "couriers": COURIERS,
            "items": [{
                "name": "Street art supplies",
                "value": total_value.value(),
                "weight": total_weight,
                "quantity": 1,
            }],
        });
        if let Some(area_id) = &request.destination_area_id {
            payload["destination_area_id"] = json!(area_id);
        } else if let Some(postal_code) = request.destination_postal_code {
            payload["destination_postal_code"] = json!(postal_code);
        } else if let (Some(lat), Some(lng)) = (request.destination_latitude, request.destination_longitude) {
            payload["destination_latitude"] = json!(lat);
            payload["destination_longitude"] = json!(lng);
        }
        trace!("🚚️ Requesting courier rates for {total_weight}g");
        let url = format!("{}/v1/rates/couriers", self.config.base_url);
        let response = self
            .client
            .post(url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ServerError::ShippingServiceUnavailable(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            warn!("🚚️ Courier aggregator returned {status}: {message}");
            return Err(ServerError::ShippingServiceUnavailable(format!("{status}")));
        }
        let body: Value =
            response.json().await.map_err(|e| ServerError::ShippingServiceUnavailable(e.to_string()))?;
        let rates = body["pricing"]
            .as_array()
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| serde_json::from_value::<CourierRate>(entry.clone()).ok())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        debug!("🚚️ {} courier rates fetched", rates.len());
        Ok(rates)
    }
}
