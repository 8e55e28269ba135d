pub mod create;
pub mod modify;

use axum::{
    routing::{get, post},
    Router,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Itinerary;

use super::AppState;

/// Response for every mutation: the persisted document plus the outcome of
/// the transfer reconciliation it triggered.
#[derive(Debug, Serialize, ToSchema)]
pub struct ItineraryResponse {
    pub itinerary: Itinerary,
    /// True when one or more transfer legs could not be rebuilt. The change
    /// itself is still applied and persisted.
    pub transfer_update_failed: bool,
    /// Reasons for any legs that could not be rebuilt
    pub messages: Vec<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(create::create_itinerary))
        .route("/{token}", get(create::get_itinerary))
        .route("/{token}/hotel", post(modify::change_hotel))
        .route("/{token}/flight", post(modify::change_flight))
        .with_state(state)
}
