//! HTTP client for the currency rates supplier.
//!
//! Rates are fetched once and cached with a TTL; conversion is a lookup
//! against the cached table.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::info;

use super::{CurrencyApi, SupplierError};
use crate::config::SuppliersConfig;

pub struct HttpCurrencyClient {
    client: reqwest::Client,
    base_url: String,
    base_currency: String,
    ttl: Duration,
    rates: RwLock<Option<CachedRates>>,
}

struct CachedRates {
    /// Units of foreign currency per one unit of base currency
    per_base: HashMap<String, f64>,
    fetched_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

impl HttpCurrencyClient {
    pub fn new(config: &SuppliersConfig, base_currency: String) -> Result<Self, SupplierError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| SupplierError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.currency_base_url.trim_end_matches('/').to_string(),
            base_currency,
            ttl: Duration::seconds(config.rates_ttl_secs as i64),
            rates: RwLock::new(None),
        })
    }

    async fn rate_for(&self, currency: &str) -> Result<f64, SupplierError> {
        {
            let guard = self.rates.read().await;
            if let Some(cached) = guard.as_ref() {
                if cached.fetched_at + self.ttl > Utc::now() {
                    return cached.per_base.get(currency).copied().ok_or_else(|| {
                        SupplierError::Api(format!("no rate available for {}", currency))
                    });
                }
            }
        }

        let mut guard = self.rates.write().await;
        if guard
            .as_ref()
            .map(|c| c.fetched_at + self.ttl > Utc::now())
            .unwrap_or(false)
        {
            // refreshed by another task while waiting for the write lock
        } else {
            let url = format!(
                "{}/latest?base={}",
                self.base_url,
                urlencoding::encode(&self.base_currency)
            );
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| SupplierError::Network(e.to_string()))?;

            if !response.status().is_success() {
                return Err(SupplierError::Api(format!(
                    "HTTP error: {}",
                    response.status().as_u16()
                )));
            }

            let parsed: RatesResponse = response
                .json()
                .await
                .map_err(|e| SupplierError::Parse(e.to_string()))?;

            info!(
                base = %self.base_currency,
                rates = parsed.rates.len(),
                "Refreshed currency rates"
            );

            *guard = Some(CachedRates {
                per_base: parsed.rates,
                fetched_at: Utc::now(),
            });
        }

        guard
            .as_ref()
            .and_then(|c| c.per_base.get(currency).copied())
            .ok_or_else(|| SupplierError::Api(format!("no rate available for {}", currency)))
    }
}

#[async_trait]
impl CurrencyApi for HttpCurrencyClient {
    async fn convert_to_base(
        &self,
        amount: f64,
        from_currency: &str,
    ) -> Result<f64, SupplierError> {
        if from_currency.eq_ignore_ascii_case(&self.base_currency) {
            return Ok(amount);
        }
        let rate = self.rate_for(from_currency).await?;
        if rate <= 0.0 {
            return Err(SupplierError::Api(format!(
                "non-positive rate for {}",
                from_currency
            )));
        }
        Ok(amount / rate)
    }
}
