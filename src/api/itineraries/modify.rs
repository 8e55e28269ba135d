use axum::{
    extract::{Path, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::api::error::{conflict, not_found, store_error, ApiError, ErrorResponse};
use crate::api::AppState;
use crate::models::{Flight, Hotel};
use crate::transfers::apply_updates;

use super::ItineraryResponse;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeHotelRequest {
    pub city: String,
    /// Travel date identifying the edited day slot
    pub date: NaiveDate,
    pub hotel: Hotel,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ChangeFlightRequest {
    pub city: String,
    pub date: NaiveDate,
    pub flight: Flight,
}

/// Replace the stay hotel of a city and rebuild its adjacent transfers
#[utoipa::path(
    post,
    path = "/api/itineraries/{token}/hotel",
    params(("token" = String, Path, description = "Booking token")),
    request_body = ChangeHotelRequest,
    responses(
        (status = 200, description = "Hotel replaced", body = ItineraryResponse),
        (status = 404, description = "Unknown token, city or date", body = ErrorResponse),
        (status = 409, description = "Another update for this slot is in progress", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "itineraries"
)]
pub async fn change_hotel(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(request): Json<ChangeHotelRequest>,
) -> Result<Json<ItineraryResponse>, ApiError> {
    let _guard = state
        .locks
        .guard(&token, &request.city, request.date)
        .ok_or_else(|| conflict("An update for this city and date is already in progress"))?;

    let mut itinerary = state.store.load(&token).await.map_err(store_error)?;
    let Some(ci) = itinerary.city_index(&request.city) else {
        return Err(not_found(format!("City not in itinerary: {}", request.city)));
    };

    // Swap the stay hotel wherever the city carries one; attach it to the
    // requested day when the city has none yet
    let city = &mut itinerary.cities[ci];
    let mut replaced = false;
    for day in &mut city.days {
        if !day.hotels.is_empty() {
            day.hotels = vec![request.hotel.clone()];
            replaced = true;
        }
    }
    if !replaced {
        let day = city
            .days
            .iter_mut()
            .find(|d| d.date == request.date)
            .ok_or_else(|| {
                not_found(format!("No day {} in {}", request.date, request.city))
            })?;
        day.hotels = vec![request.hotel.clone()];
    }

    let outcome = state
        .engine
        .reconcile_for_hotel_change(&itinerary, &request.city)
        .await;
    apply_updates(&mut itinerary, &outcome.updates);
    state.store.save(&itinerary).await.map_err(store_error)?;

    Ok(Json(ItineraryResponse {
        itinerary,
        transfer_update_failed: outcome.transfer_update_failed(),
        messages: outcome.failures,
    }))
}

/// Replace a flight and rebuild the airport transfers it touches
#[utoipa::path(
    post,
    path = "/api/itineraries/{token}/flight",
    params(("token" = String, Path, description = "Booking token")),
    request_body = ChangeFlightRequest,
    responses(
        (status = 200, description = "Flight replaced", body = ItineraryResponse),
        (status = 404, description = "Unknown token, city or date", body = ErrorResponse),
        (status = 409, description = "Another update for this slot is in progress", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "itineraries"
)]
pub async fn change_flight(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(request): Json<ChangeFlightRequest>,
) -> Result<Json<ItineraryResponse>, ApiError> {
    let _guard = state
        .locks
        .guard(&token, &request.city, request.date)
        .ok_or_else(|| conflict("An update for this city and date is already in progress"))?;

    let mut itinerary = state.store.load(&token).await.map_err(store_error)?;
    let Some(ci) = itinerary.city_index(&request.city) else {
        return Err(not_found(format!("City not in itinerary: {}", request.city)));
    };
    let city = &mut itinerary.cities[ci];
    let day = city
        .days
        .iter_mut()
        .find(|d| d.date == request.date)
        .ok_or_else(|| not_found(format!("No day {} in {}", request.date, request.city)))?;

    // Engine-added synthetic flights are owned by reconciliation, never by
    // the caller
    if let Some(slot) = day.flights.iter_mut().find(|f| !f.synthetic) {
        *slot = request.flight.clone();
    } else {
        day.flights.push(request.flight.clone());
    }

    let outcome = state
        .engine
        .reconcile_for_flight_change(&itinerary, &request.city, request.date)
        .await;
    apply_updates(&mut itinerary, &outcome.updates);
    state.store.save(&itinerary).await.map_err(store_error)?;

    Ok(Json(ItineraryResponse {
        itinerary,
        transfer_update_failed: outcome.transfer_update_failed(),
        messages: outcome.failures,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::location::{GeoBlock, HotelContent};
    use crate::models::{City, Day, Itinerary, RoomOccupancy, TransferLeg};
    use crate::store::ItineraryStore;
    use crate::transfers::test_support::*;
    use crate::transfers::LockManager;
    use axum::http::StatusCode;
    use sqlx::SqlitePool;
    use std::sync::Arc;

    async fn app_state() -> AppState {
        let pool = SqlitePool::connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("migrations");
        let engine = engine_with(
            Arc::new(FakeGround::with_quotes(vec![quote("van", 6, 40.0, 120)])),
            Arc::new(FakeFlights::new(FlightBehavior::Empty)),
        );
        AppState {
            store: ItineraryStore::new(pool),
            engine: Arc::new(engine),
            locks: LockManager::new(),
        }
    }

    fn hotel(name: &str) -> Hotel {
        Hotel {
            id: Some(name.to_lowercase()),
            name: name.to_string(),
            content: HotelContent {
                geolocation: Some(GeoBlock {
                    lat: Some(15.49),
                    long: Some(73.82),
                    ..Default::default()
                }),
                ..Default::default()
            },
        }
    }

    fn stored_itinerary() -> Itinerary {
        let mut inbound = test_flight("Delhi", "Goa");
        inbound.arrival_time = Some("2026-09-01T09:30:00Z".to_string());
        Itinerary {
            token: "tok-1".to_string(),
            base_currency: "USD".to_string(),
            travelers: vec![RoomOccupancy {
                adults: 2,
                children: 0,
            }],
            cities: vec![City {
                name: "Goa".to_string(),
                country: "India".to_string(),
                days: vec![Day {
                    date: "2026-09-01".parse().unwrap(),
                    flights: vec![inbound],
                    hotels: vec![hotel("Old Beach")],
                    transfers: vec![],
                }],
            }],
        }
    }

    #[tokio::test]
    async fn hotel_change_rebuilds_arrival_transfer_and_persists() {
        let state = app_state().await;
        state.store.save(&stored_itinerary()).await.unwrap();

        let response = change_hotel(
            State(state.clone()),
            Path("tok-1".to_string()),
            Json(ChangeHotelRequest {
                city: "Goa".to_string(),
                date: "2026-09-01".parse().unwrap(),
                hotel: hotel("New Beach"),
            }),
        )
        .await
        .unwrap();

        assert!(!response.0.transfer_update_failed);
        let stored = state.store.load("tok-1").await.unwrap();
        assert_eq!(stored.cities[0].days[0].hotels[0].name, "New Beach");
        assert!(matches!(
            stored.cities[0].days[0].transfers[0],
            TransferLeg::AirportToHotel { .. }
        ));
    }

    #[tokio::test]
    async fn concurrent_edit_of_same_slot_is_rejected() {
        let state = app_state().await;
        state.store.save(&stored_itinerary()).await.unwrap();

        let date: NaiveDate = "2026-09-01".parse().unwrap();
        let _held = state.locks.guard("tok-1", "Goa", date).unwrap();

        let err = change_hotel(
            State(state.clone()),
            Path("tok-1".to_string()),
            Json(ChangeHotelRequest {
                city: "Goa".to_string(),
                date,
                hotel: hotel("New Beach"),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.0, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_city_is_not_found() {
        let state = app_state().await;
        state.store.save(&stored_itinerary()).await.unwrap();

        let err = change_hotel(
            State(state.clone()),
            Path("tok-1".to_string()),
            Json(ChangeHotelRequest {
                city: "Atlantis".to_string(),
                date: "2026-09-01".parse().unwrap(),
                hotel: hotel("New Beach"),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn flight_change_replaces_flight_and_rebuilds_leg() {
        let state = app_state().await;
        state.store.save(&stored_itinerary()).await.unwrap();

        let mut new_flight = test_flight("Delhi", "Goa");
        new_flight.flight_number = Some("6E-777".to_string());
        new_flight.arrival_time = Some("2026-09-01T16:00:00Z".to_string());

        let response = change_flight(
            State(state.clone()),
            Path("tok-1".to_string()),
            Json(ChangeFlightRequest {
                city: "Goa".to_string(),
                date: "2026-09-01".parse().unwrap(),
                flight: new_flight,
            }),
        )
        .await
        .unwrap();

        assert!(!response.0.transfer_update_failed);
        let stored = state.store.load("tok-1").await.unwrap();
        let day = &stored.cities[0].days[0];
        assert_eq!(day.flights.len(), 1);
        assert_eq!(day.flights[0].flight_number.as_deref(), Some("6E-777"));
        assert!(matches!(
            day.transfers[0],
            TransferLeg::AirportToHotel { .. }
        ));
    }
}
