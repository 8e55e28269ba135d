use axum::{http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

pub fn internal_error(message: impl Into<String>) -> ApiError {
    error(StatusCode::INTERNAL_SERVER_ERROR, message)
}

pub fn bad_request(message: impl Into<String>) -> ApiError {
    error(StatusCode::BAD_REQUEST, message)
}

pub fn not_found(message: impl Into<String>) -> ApiError {
    error(StatusCode::NOT_FOUND, message)
}

pub fn conflict(message: impl Into<String>) -> ApiError {
    error(StatusCode::CONFLICT, message)
}

/// Map a store failure to a response, treating a missing token as 404.
pub fn store_error(err: crate::store::StoreError) -> ApiError {
    match err {
        crate::store::StoreError::NotFound(token) => {
            not_found(format!("Itinerary not found: {}", token))
        }
        other => internal_error(format!("Storage error: {}", other)),
    }
}
