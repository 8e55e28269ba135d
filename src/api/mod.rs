pub mod error;
pub mod health;
pub mod itineraries;
pub mod transfers;

pub use error::{internal_error, ErrorResponse};

use std::sync::Arc;

use axum::Router;

use crate::store::ItineraryStore;
use crate::transfers::{LockManager, TransferEngine};

#[derive(Clone)]
pub struct AppState {
    pub store: ItineraryStore,
    pub engine: Arc<TransferEngine>,
    pub locks: LockManager,
}

pub fn router(state: AppState) -> Router {
    let store = state.store.clone();
    Router::new()
        .nest("/itineraries", itineraries::router(state.clone()))
        .nest("/transfers", transfers::router(state))
        .nest("/health", health::router(store))
}
