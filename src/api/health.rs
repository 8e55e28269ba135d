use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use utoipa::ToSchema;

use crate::store::ItineraryStore;

#[derive(Clone)]
pub struct HealthState {
    pub store: ItineraryStore,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Whether the service is running
    pub healthy: bool,
    /// Whether the itinerary database answered a query
    pub database_reachable: bool,
    /// Number of stored itineraries
    pub itinerary_count: i64,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service health status", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<HealthState>) -> Json<HealthResponse> {
    let (reachable, count) = match state.store.count().await {
        Ok(count) => (true, count),
        Err(err) => {
            tracing::warn!("Health check database query failed: {}", err);
            (false, 0)
        }
    };

    Json(HealthResponse {
        healthy: true,
        database_reachable: reachable,
        itinerary_count: count,
    })
}

pub fn router(store: ItineraryStore) -> Router {
    let state = HealthState { store };
    Router::new()
        .route("/", get(health_check))
        .with_state(state)
}
