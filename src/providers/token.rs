//! Bearer token provisioning with TTL-based refresh.
//!
//! Suppliers share one OAuth client-credentials endpoint. The provider caches
//! the token and refreshes it shortly before expiry; it is injected into each
//! client instead of living in process-wide state.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use super::SupplierError;
use crate::config::SuppliersConfig;

/// Refresh this many seconds before the reported expiry to absorb clock skew.
const EXPIRY_SKEW_SECS: i64 = 60;

pub struct TokenProvider {
    client: reqwest::Client,
    auth_url: String,
    client_id: String,
    client_secret: String,
    cached: RwLock<Option<CachedToken>>,
}

#[derive(Clone)]
struct CachedToken {
    bearer: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

impl TokenProvider {
    pub fn new(config: &SuppliersConfig) -> Result<Self, SupplierError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| SupplierError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            auth_url: config.auth_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            cached: RwLock::new(None),
        })
    }

    /// Return a valid bearer token, refreshing it when absent or stale.
    pub async fn bearer(&self) -> Result<String, SupplierError> {
        {
            let guard = self.cached.read().await;
            if let Some(token) = guard.as_ref() {
                if token.expires_at > Utc::now() {
                    return Ok(token.bearer.clone());
                }
            }
        }

        let mut guard = self.cached.write().await;
        // Another task may have refreshed while we waited for the write lock
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Utc::now() {
                return Ok(token.bearer.clone());
            }
        }

        debug!(auth_url = %self.auth_url, "Refreshing supplier bearer token");

        let response = self
            .client
            .post(&self.auth_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| SupplierError::Auth(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SupplierError::Auth(format!(
                "token endpoint returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| SupplierError::Auth(format!("malformed token response: {}", e)))?;

        let expires_at =
            Utc::now() + Duration::seconds((token.expires_in - EXPIRY_SKEW_SECS).max(0));
        let bearer = token.access_token.clone();
        *guard = Some(CachedToken {
            bearer: token.access_token,
            expires_at,
        });

        Ok(bearer)
    }
}
