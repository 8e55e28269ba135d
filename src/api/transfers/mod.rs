use axum::{extract::State, routing::post, Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::{internal_error, ApiError, ErrorResponse};
use crate::api::AppState;
use crate::models::{Location, RoomOccupancy};
use crate::transfers::{RevalidationResult, TransferOption};

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransferQueryRequest {
    pub origin: Location,
    pub destination: Location,
    /// Travel date for the transfer
    pub date: NaiveDate,
    pub travelers: Vec<RoomOccupancy>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransferOptionsResponse {
    /// Ground options sorted by price, followed by flight options when the
    /// route is long enough to fly
    pub options: Vec<TransferOption>,
}

/// List candidate transfers between two points for manual selection
#[utoipa::path(
    post,
    path = "/api/transfers/options",
    request_body = TransferQueryRequest,
    responses(
        (status = 200, description = "Candidate transfers", body = TransferOptionsResponse),
        (status = 500, description = "Supplier failure", body = ErrorResponse)
    ),
    tag = "transfers"
)]
pub async fn list_options(
    State(state): State<AppState>,
    Json(request): Json<TransferQueryRequest>,
) -> Result<Json<TransferOptionsResponse>, ApiError> {
    let options = state
        .engine
        .transfer_options(
            &request.origin,
            &request.destination,
            request.date,
            &request.travelers,
        )
        .await
        .map_err(|e| internal_error(format!("Transfer search failed: {}", e)))?;
    Ok(Json(TransferOptionsResponse { options }))
}

/// Re-check that a transfer between two points is still bookable
#[utoipa::path(
    post,
    path = "/api/transfers/revalidate",
    request_body = TransferQueryRequest,
    responses(
        (status = 200, description = "Revalidation outcome", body = RevalidationResult)
    ),
    tag = "transfers"
)]
pub async fn revalidate(
    State(state): State<AppState>,
    Json(request): Json<TransferQueryRequest>,
) -> Json<RevalidationResult> {
    let result = state
        .engine
        .revalidate_transfer(
            &request.origin,
            &request.destination,
            request.date,
            &request.travelers,
        )
        .await;
    Json(result)
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/options", post(list_options))
        .route("/revalidate", post(revalidate))
        .with_state(state)
}
