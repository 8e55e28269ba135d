//! HTTP client for the ground transfer supplier.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::warn;

use super::token::TokenProvider;
use super::{
    GroundTransferApi, QuoteDetail, QuoteSearchRequest, QuoteSearchResponse, SupplierError,
};
use crate::config::SuppliersConfig;

pub struct HttpGroundTransferClient {
    client: reqwest::Client,
    base_url: String,
    token: Arc<TokenProvider>,
    /// Limits concurrent requests to avoid overwhelming the supplier
    rate_limiter: Arc<Semaphore>,
}

impl HttpGroundTransferClient {
    pub fn new(
        config: &SuppliersConfig,
        token: Arc<TokenProvider>,
    ) -> Result<Self, SupplierError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| SupplierError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.transfer_base_url.trim_end_matches('/').to_string(),
            token,
            rate_limiter: Arc::new(Semaphore::new(config.max_concurrent_requests)),
        })
    }

    async fn parse_body<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        context: &str,
    ) -> Result<T, SupplierError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SupplierError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(SupplierError::Api(format!(
                "HTTP error: {} ({})",
                status.as_u16(),
                context
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            warn!(
                context = context,
                error = %e,
                body = &body[..body.len().min(500)],
                "Failed to parse transfer supplier response"
            );
            SupplierError::Parse(e.to_string())
        })
    }
}

#[async_trait]
impl GroundTransferApi for HttpGroundTransferClient {
    async fn search_quotes(
        &self,
        request: QuoteSearchRequest,
    ) -> Result<QuoteSearchResponse, SupplierError> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .expect("Semaphore closed unexpectedly");

        let bearer = self.token.bearer().await?;
        let url = format!("{}/quotes", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(bearer)
            .json(&request)
            .send()
            .await
            .map_err(|e| SupplierError::Network(e.to_string()))?;

        Self::parse_body(response, "quote search").await
    }

    async fn quote_detail(
        &self,
        quotation_id: &str,
        quote_id: &str,
    ) -> Result<QuoteDetail, SupplierError> {
        let _permit = self
            .rate_limiter
            .acquire()
            .await
            .expect("Semaphore closed unexpectedly");

        let bearer = self.token.bearer().await?;
        let url = format!(
            "{}/quotes/{}/options/{}",
            self.base_url,
            urlencoding::encode(quotation_id),
            urlencoding::encode(quote_id)
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| SupplierError::Network(e.to_string()))?;

        Self::parse_body(response, "quote detail").await
    }
}
