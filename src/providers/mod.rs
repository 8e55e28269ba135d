//! Supplier capability seams.
//!
//! Every third-party supplier is consumed through an object-safe trait so the
//! transfer engine can be exercised with fakes. The HTTP implementations live
//! in the sibling modules; credentials come from an injected `TokenProvider`
//! rather than process-wide state.

pub mod currency;
pub mod flights;
pub mod token;
pub mod transfers;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Flight, Location};

#[derive(Debug, Error)]
pub enum SupplierError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Supplier API error: {0}")]
    Api(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Authentication error: {0}")]
    Auth(String),
}

/// Ground transfer quote search parameters.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteSearchRequest {
    pub origin: Location,
    pub destination: Location,
    pub pickup: DateTime<Utc>,
    pub return_by: DateTime<Utc>,
    pub passengers: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuoteSearchResponse {
    #[serde(default)]
    pub quotes: Vec<VehicleQuote>,
}

/// One vehicle option returned by the transfer supplier. Order is
/// supplier-defined and meaningful: selection takes the first option whose
/// capacity satisfies the party.
#[derive(Debug, Clone, Deserialize)]
pub struct VehicleQuote {
    #[serde(rename = "quoteId")]
    pub quote_id: String,
    #[serde(rename = "quotationId")]
    pub quotation_id: String,
    pub provider: Option<String>,
    pub vehicle: VehicleInfo,
    pub price: f64,
    pub currency: Option<String>,
    #[serde(rename = "durationMinutes")]
    pub duration_minutes: i64,
    #[serde(rename = "distanceKm")]
    pub distance_km: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VehicleInfo {
    pub name: String,
    pub capacity: u32,
}

/// Detailed pricing for a previously searched quote.
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteDetail {
    pub fare: f64,
    pub currency: String,
    pub vehicle: Option<String>,
}

#[async_trait]
pub trait GroundTransferApi: Send + Sync {
    async fn search_quotes(
        &self,
        request: QuoteSearchRequest,
    ) -> Result<QuoteSearchResponse, SupplierError>;

    async fn quote_detail(
        &self,
        quotation_id: &str,
        quote_id: &str,
    ) -> Result<QuoteDetail, SupplierError>;
}

#[async_trait]
pub trait FlightSearchApi: Send + Sync {
    /// Search flights between two cities on a date. An empty list means no
    /// connection exists; that is not an error.
    async fn search_flights(
        &self,
        origin_city: &str,
        destination_city: &str,
        date: NaiveDate,
        seats: u32,
    ) -> Result<Vec<Flight>, SupplierError>;
}

#[async_trait]
pub trait CurrencyApi: Send + Sync {
    /// Convert an amount from `from_currency` into the configured base
    /// currency.
    async fn convert_to_base(&self, amount: f64, from_currency: &str)
        -> Result<f64, SupplierError>;
}
