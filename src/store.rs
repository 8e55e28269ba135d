//! SQLite-backed itinerary persistence.
//!
//! The whole itinerary travels as a single JSON document keyed by its booking
//! token; reconciliation always rewrites the full document, so there is no
//! partial-update path.

use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::Itinerary;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Malformed itinerary document: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Itinerary not found: {0}")]
    NotFound(String),
}

#[derive(Clone)]
pub struct ItineraryStore {
    pool: SqlitePool,
}

impl ItineraryStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn load(&self, token: &str) -> Result<Itinerary, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT document FROM itineraries WHERE token = ?")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        let (document,) = row.ok_or_else(|| StoreError::NotFound(token.to_string()))?;
        Ok(serde_json::from_str(&document)?)
    }

    pub async fn save(&self, itinerary: &Itinerary) -> Result<(), StoreError> {
        let document = serde_json::to_string(itinerary)?;
        sqlx::query(
            "INSERT INTO itineraries (token, document, updated_at) VALUES (?, ?, ?)
             ON CONFLICT(token) DO UPDATE SET
                 document = excluded.document,
                 updated_at = excluded.updated_at",
        )
        .bind(&itinerary.token)
        .bind(&document)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM itineraries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
