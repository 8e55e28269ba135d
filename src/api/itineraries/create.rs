use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::api::error::{bad_request, store_error, ApiError, ErrorResponse};
use crate::api::AppState;
use crate::models::{City, Itinerary, RoomOccupancy};
use crate::transfers::apply_updates;

use super::ItineraryResponse;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateItineraryRequest {
    /// Currency fares are expressed in. All fares are quoted in the service's
    /// configured base currency, so this must match it when provided.
    #[serde(default)]
    pub base_currency: Option<String>,
    pub travelers: Vec<RoomOccupancy>,
    /// Cities in visiting order, with their days, flights and hotels
    pub cities: Vec<City>,
}

/// Create an itinerary and build its initial transfers
#[utoipa::path(
    post,
    path = "/api/itineraries",
    request_body = CreateItineraryRequest,
    responses(
        (status = 201, description = "Itinerary created", body = ItineraryResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "itineraries"
)]
pub async fn create_itinerary(
    State(state): State<AppState>,
    Json(request): Json<CreateItineraryRequest>,
) -> Result<(StatusCode, Json<ItineraryResponse>), ApiError> {
    if request.cities.is_empty() {
        return Err(bad_request("At least one city is required"));
    }
    if request.travelers.is_empty() {
        return Err(bad_request("At least one room occupancy is required"));
    }
    // The engine converts every fare into the configured base currency, so a
    // document in any other currency would carry mislabeled fares.
    if let Some(requested) = request.base_currency.as_deref() {
        if !requested.eq_ignore_ascii_case(&state.engine.policy.base_currency) {
            return Err(bad_request(format!(
                "base_currency {} is not supported; fares are quoted in {}",
                requested, state.engine.policy.base_currency
            )));
        }
    }

    let mut itinerary = Itinerary {
        token: Uuid::new_v4().to_string(),
        base_currency: state.engine.policy.base_currency.clone(),
        travelers: request.travelers,
        cities: request.cities,
    };

    let outcome = state.engine.reconcile_for_creation(&itinerary).await;
    apply_updates(&mut itinerary, &outcome.updates);
    state.store.save(&itinerary).await.map_err(store_error)?;

    Ok((
        StatusCode::CREATED,
        Json(ItineraryResponse {
            itinerary,
            transfer_update_failed: outcome.transfer_update_failed(),
            messages: outcome.failures,
        }),
    ))
}

/// Fetch an itinerary by booking token
#[utoipa::path(
    get,
    path = "/api/itineraries/{token}",
    params(("token" = String, Path, description = "Booking token")),
    responses(
        (status = 200, description = "The itinerary", body = Itinerary),
        (status = 404, description = "Unknown token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    tag = "itineraries"
)]
pub async fn get_itinerary(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<Itinerary>, ApiError> {
    let itinerary = state.store.load(&token).await.map_err(store_error)?;
    Ok(Json(itinerary))
}
