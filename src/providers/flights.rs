//! HTTP client for the flight search supplier.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, warn};

use super::token::TokenProvider;
use super::{FlightSearchApi, SupplierError};
use crate::config::SuppliersConfig;
use crate::models::{Airport, Flight};

pub struct HttpFlightSearchClient {
    client: reqwest::Client,
    base_url: String,
    token: Arc<TokenProvider>,
}

#[derive(Debug, Deserialize)]
struct FlightSearchResponse {
    #[serde(default)]
    flights: Vec<FlightRecord>,
}

/// Supplier flight record. Everything optional; records without usable
/// airports are dropped during mapping.
#[derive(Debug, Deserialize)]
struct FlightRecord {
    carrier: Option<String>,
    #[serde(rename = "flightNumber")]
    flight_number: Option<String>,
    origin: Option<AirportRecord>,
    destination: Option<AirportRecord>,
    #[serde(rename = "departureTime")]
    departure_time: Option<String>,
    #[serde(rename = "arrivalTime")]
    arrival_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AirportRecord {
    code: Option<String>,
    name: Option<String>,
    city: Option<String>,
    country: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl HttpFlightSearchClient {
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
            base_url: config.flight_base_url.trim_end_matches('/').to_string(),
            token,
        })
    }
}

fn map_airport(record: AirportRecord) -> Option<Airport> {
    Some(Airport {
        code: record.code?,
        name: record.name,
        city: record.city?,
        country: record.country,
        latitude: record.latitude,
        longitude: record.longitude,
    })
}

fn map_flight(record: FlightRecord) -> Option<Flight> {
    Some(Flight {
        carrier: record.carrier,
        flight_number: record.flight_number,
        origin: map_airport(record.origin?)?,
        destination: map_airport(record.destination?)?,
        departure_time: record.departure_time,
        arrival_time: record.arrival_time,
        synthetic: false,
    })
}

#[async_trait]
impl FlightSearchApi for HttpFlightSearchClient {
    async fn search_flights(
        &self,
        origin_city: &str,
        destination_city: &str,
        date: NaiveDate,
        seats: u32,
    ) -> Result<Vec<Flight>, SupplierError> {
        let bearer = self.token.bearer().await?;
        let url = format!(
            "{}/search?origin={}&destination={}&date={}&seats={}",
            self.base_url,
            urlencoding::encode(origin_city),
            urlencoding::encode(destination_city),
            date.format("%Y-%m-%d"),
            seats
        );

        debug!(origin = %origin_city, destination = %destination_city, %date, "Searching flights");

        let response = self
            .client
            .get(&url)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(|e| SupplierError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SupplierError::Api(format!(
                "HTTP error: {}",
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SupplierError::Network(e.to_string()))?;

        let parsed: FlightSearchResponse = serde_json::from_str(&body).map_err(|e| {
            warn!(
                error = %e,
                body = &body[..body.len().min(500)],
                "Failed to parse flight search response"
            );
            SupplierError::Parse(e.to_string())
        })?;

        let total = parsed.flights.len();
        let flights: Vec<Flight> = parsed.flights.into_iter().filter_map(map_flight).collect();
        if flights.len() < total {
            warn!(
                dropped = total - flights.len(),
                "Dropped flight records with incomplete airport data"
            );
        }

        Ok(flights)
    }
}
