//! Transfer leg construction.
//!
//! Builds one directed leg between two normalized locations: a ground quote
//! by default, or an inter-city flight composite when the ground duration
//! exceeds the air-fallback threshold and both endpoints are hotels. Supplier
//! failures never escape this module; they resolve to `BuiltLeg::Unavailable`
//! so a transfer problem cannot block the itinerary change that triggered it.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use super::time::{pickup_lead_time, resolve_timestamp};
use super::TransferEngine;
use crate::models::{
    traveler_count, Flight, GroundLeg, GroundQuote, InterCityTransfers, Location, RoomOccupancy,
};
use crate::providers::{QuoteSearchRequest, SupplierError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    Hotel,
    Airport,
}

/// Parameters for one leg build.
#[derive(Debug, Clone)]
pub struct LegRequest {
    pub origin: Location,
    pub destination: Location,
    pub origin_kind: EndpointKind,
    pub destination_kind: EndpointKind,
    pub pickup: DateTime<Utc>,
    pub date: NaiveDate,
    /// Extra seats reserved beyond the party size
    pub capacity_margin: u32,
}

/// Outcome of a leg build. `Unavailable` is never persisted; the caller
/// skips the slot and records the message.
#[derive(Debug, Clone)]
pub enum BuiltLeg {
    Ground(GroundLeg),
    InterCityFlight {
        flight: Flight,
        transfers: InterCityTransfers,
    },
    Unavailable { message: String },
}

enum LegFailure {
    NoCapacity,
    Supplier(SupplierError),
}

impl From<SupplierError> for LegFailure {
    fn from(err: SupplierError) -> Self {
        LegFailure::Supplier(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransferOptionKind {
    Ground,
    Flight,
}

/// One candidate transfer for manual selection.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransferOption {
    #[serde(rename = "type")]
    pub kind: TransferOptionKind,
    pub provider: String,
    pub vehicle: Option<String>,
    pub duration_minutes: Option<i64>,
    pub price: Option<f64>,
    pub currency: Option<String>,
}

/// Pre-booking re-check result.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RevalidationResult {
    pub is_valid: bool,
    pub new_quote: Option<GroundQuote>,
}

impl TransferEngine {
    /// Build the leg connecting `req.origin` to `req.destination`.
    pub async fn build_leg(&self, travelers: &[RoomOccupancy], req: LegRequest) -> BuiltLeg {
        let ground = match self.ground_leg(travelers, &req).await {
            Ok(leg) => leg,
            Err(LegFailure::NoCapacity) => {
                return BuiltLeg::Unavailable {
                    message: "No vehicle found with sufficient capacity".to_string(),
                }
            }
            Err(LegFailure::Supplier(err)) => {
                warn!(
                    origin = %req.origin.city,
                    destination = %req.destination.city,
                    error = %err,
                    "Ground transfer quote failed"
                );
                return BuiltLeg::Unavailable {
                    message: err.to_string(),
                };
            }
        };

        let both_hotels = req.origin_kind == EndpointKind::Hotel
            && req.destination_kind == EndpointKind::Hotel;
        // Strict comparison: a quote of exactly the threshold stays ground.
        if both_hotels
            && ground.quote.duration_minutes > self.policy.air_fallback_threshold_minutes
        {
            if let Some(composite) = self.air_alternative(travelers, &req).await {
                return composite;
            }
        }

        BuiltLeg::Ground(ground)
    }

    async fn ground_leg(
        &self,
        travelers: &[RoomOccupancy],
        req: &LegRequest,
    ) -> Result<GroundLeg, LegFailure> {
        let count = traveler_count(travelers);
        let required = count + req.capacity_margin;

        let response = self
            .ground
            .search_quotes(QuoteSearchRequest {
                origin: req.origin.clone(),
                destination: req.destination.clone(),
                pickup: req.pickup,
                return_by: req.pickup + Duration::hours(24),
                passengers: count,
            })
            .await?;

        // First capacity-satisfying option in supplier order, not cheapest
        // eligible. Supplier ordering is part of the pricing contract.
        let selected = response
            .quotes
            .iter()
            .find(|q| q.vehicle.capacity >= required)
            .ok_or(LegFailure::NoCapacity)?;

        let detail = self
            .ground
            .quote_detail(&selected.quotation_id, &selected.quote_id)
            .await?;

        let (fare, currency) = if detail
            .currency
            .eq_ignore_ascii_case(&self.policy.base_currency)
        {
            (detail.fare, detail.currency.clone())
        } else {
            let converted = self
                .currency
                .convert_to_base(detail.fare, &detail.currency)
                .await?;
            (converted, self.policy.base_currency.clone())
        };

        Ok(GroundLeg {
            provider: selected
                .provider
                .clone()
                .unwrap_or_else(|| "ground".to_string()),
            quote: GroundQuote {
                fare,
                currency,
                vehicle: selected.vehicle.name.clone(),
                duration_minutes: selected.duration_minutes,
                distance_km: selected.distance_km,
            },
            origin: req.origin.clone(),
            destination: req.destination.clone(),
            quotation_id: selected.quotation_id.clone(),
        })
    }

    /// Try to replace a long ground leg with an inter-city flight composite.
    /// Any failure here means "keep the ground leg", never an error.
    async fn air_alternative(
        &self,
        travelers: &[RoomOccupancy],
        req: &LegRequest,
    ) -> Option<BuiltLeg> {
        let seats = traveler_count(travelers);
        let flights = match self
            .flights
            .search_flights(&req.origin.city, &req.destination.city, req.date, seats)
            .await
        {
            Ok(flights) => flights,
            Err(err) => {
                warn!(
                    origin = %req.origin.city,
                    destination = %req.destination.city,
                    error = %err,
                    "Flight search failed, keeping ground leg"
                );
                return None;
            }
        };

        let flight = flights.into_iter().next()?;

        let departure_airport = match Location::from_airport(&flight.origin, "departure airport") {
            Ok(loc) => loc,
            Err(err) => {
                warn!(error = %err, "Keeping ground leg");
                return None;
            }
        };
        let arrival_airport = match Location::from_airport(&flight.destination, "arrival airport")
        {
            Ok(loc) => loc,
            Err(err) => {
                warn!(error = %err, "Keeping ground leg");
                return None;
            }
        };

        let outbound = LegRequest {
            origin: req.origin.clone(),
            destination: departure_airport,
            origin_kind: EndpointKind::Hotel,
            destination_kind: EndpointKind::Airport,
            pickup: pickup_lead_time(
                flight.departure_time.as_deref(),
                req.date,
                self.policy.pickup_lead_hours,
            ),
            date: req.date,
            capacity_margin: 0,
        };
        let landing = flight
            .arrival_time
            .as_deref()
            .map(|t| resolve_timestamp(t, req.date))
            .unwrap_or(req.pickup);
        let inbound = LegRequest {
            origin: arrival_airport,
            destination: req.destination.clone(),
            origin_kind: EndpointKind::Airport,
            destination_kind: EndpointKind::Hotel,
            pickup: landing,
            date: req.date,
            capacity_margin: 0,
        };

        // Independent slots; issue both at once. Boxed because this recurses
        // through build_leg.
        let (hotel_to_airport, airport_to_hotel) = tokio::join!(
            Box::pin(self.build_leg(travelers, outbound)),
            Box::pin(self.build_leg(travelers, inbound))
        );

        match (hotel_to_airport, airport_to_hotel) {
            (BuiltLeg::Ground(hta), BuiltLeg::Ground(ath)) => Some(BuiltLeg::InterCityFlight {
                flight,
                transfers: InterCityTransfers {
                    hotel_to_airport: hta,
                    airport_to_hotel: ath,
                },
            }),
            _ => {
                warn!(
                    origin = %req.origin.city,
                    destination = %req.destination.city,
                    "Airport leg construction failed, keeping ground leg"
                );
                None
            }
        }
    }

    /// Ranked candidate transfers between two points, for manual selection.
    /// Read-only; never mutates an itinerary.
    pub async fn transfer_options(
        &self,
        origin: &Location,
        destination: &Location,
        date: NaiveDate,
        travelers: &[RoomOccupancy],
    ) -> Result<Vec<TransferOption>, SupplierError> {
        let count = traveler_count(travelers);
        let pickup = resolve_timestamp(&date.format("%Y-%m-%d").to_string(), date);

        let response = self
            .ground
            .search_quotes(QuoteSearchRequest {
                origin: origin.clone(),
                destination: destination.clone(),
                pickup,
                return_by: pickup + Duration::hours(24),
                passengers: count,
            })
            .await?;

        let mut options: Vec<TransferOption> = response
            .quotes
            .iter()
            .filter(|q| q.vehicle.capacity >= count)
            .map(|q| TransferOption {
                kind: TransferOptionKind::Ground,
                provider: q.provider.clone().unwrap_or_else(|| "ground".to_string()),
                vehicle: Some(q.vehicle.name.clone()),
                duration_minutes: Some(q.duration_minutes),
                price: Some(q.price),
                currency: q.currency.clone(),
            })
            .collect();
        options.sort_by(|a, b| {
            a.price
                .partial_cmp(&b.price)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let exceeds_threshold = response
            .quotes
            .iter()
            .any(|q| q.duration_minutes > self.policy.air_fallback_threshold_minutes);
        if exceeds_threshold {
            match self
                .flights
                .search_flights(&origin.city, &destination.city, date, count)
                .await
            {
                Ok(flights) => {
                    options.extend(flights.into_iter().map(|f| {
                        let duration = f
                            .departure_time
                            .as_deref()
                            .zip(f.arrival_time.as_deref())
                            .map(|(dep, arr)| {
                                (resolve_timestamp(arr, date) - resolve_timestamp(dep, date))
                                    .num_minutes()
                            })
                            .filter(|d| *d > 0);
                        TransferOption {
                            kind: TransferOptionKind::Flight,
                            provider: f.carrier.unwrap_or_else(|| "flight".to_string()),
                            vehicle: f.flight_number,
                            duration_minutes: duration,
                            price: None,
                            currency: None,
                        }
                    }));
                }
                Err(err) => {
                    warn!(error = %err, "Flight options unavailable");
                }
            }
        }

        Ok(options)
    }

    /// Pre-booking availability and price re-check for a transfer route.
    pub async fn revalidate_transfer(
        &self,
        origin: &Location,
        destination: &Location,
        date: NaiveDate,
        travelers: &[RoomOccupancy],
    ) -> RevalidationResult {
        let pickup = resolve_timestamp(&date.format("%Y-%m-%d").to_string(), date);
        let req = LegRequest {
            origin: origin.clone(),
            destination: destination.clone(),
            origin_kind: EndpointKind::Hotel,
            destination_kind: EndpointKind::Hotel,
            pickup,
            date,
            capacity_margin: 0,
        };
        match self.ground_leg(travelers, &req).await {
            Ok(leg) => RevalidationResult {
                is_valid: true,
                new_quote: Some(leg.quote),
            },
            Err(LegFailure::NoCapacity) => RevalidationResult {
                is_valid: false,
                new_quote: None,
            },
            Err(LegFailure::Supplier(err)) => {
                warn!(error = %err, "Transfer revalidation failed");
                RevalidationResult {
                    is_valid: false,
                    new_quote: None,
                }
            }
        }
    }
}
