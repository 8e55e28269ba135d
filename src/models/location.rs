//! Canonical location extraction.
//!
//! Hotel static content arrives in several shapes depending on which upstream
//! code path resolved it: coordinates may live under `geolocation.lat/long`,
//! `geoCode.lat/long`, `geolocation.latitude/longitude`, or flat on the
//! record. Extraction is an ordered list of strategies so the precedence is
//! visible and testable rather than buried in optional chaining.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use super::{Airport, Hotel};

/// A fully resolved location. Construction fails unless a coordinate pair was
/// found; downstream supplier APIs reject partial coordinates with unhelpful
/// errors, so a location never defaults to (0, 0).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Location {
    pub city: String,
    pub country: String,
    pub address: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Error)]
#[error("no geolocation found for {role}")]
pub struct MissingGeolocation {
    pub role: String,
}

/// Hotel static content as attached by the upstream booking flow.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct HotelContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<GeoBlock>,
    #[serde(
        default,
        rename = "geoCode",
        skip_serializing_if = "Option::is_none"
    )]
    pub geo_code: Option<GeoBlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// A coordinate block that may use either naming convention.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct GeoBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// Address either as a preformatted string or as structured parts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum AddressField {
    Text(String),
    Parts(AddressParts),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct AddressParts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line1: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<NamedRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<NamedRef>,
    #[serde(
        default,
        rename = "postalCode",
        skip_serializing_if = "Option::is_none"
    )]
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct NamedRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

type GeoStrategy = fn(&HotelContent) -> Option<(f64, f64)>;

fn geo_from_geolocation(content: &HotelContent) -> Option<(f64, f64)> {
    let block = content.geolocation.as_ref()?;
    Some((block.lat?, block.long?))
}

fn geo_from_geo_code(content: &HotelContent) -> Option<(f64, f64)> {
    let block = content.geo_code.as_ref()?;
    Some((block.lat?, block.long?))
}

fn geo_from_geolocation_long_names(content: &HotelContent) -> Option<(f64, f64)> {
    let block = content.geolocation.as_ref()?;
    Some((block.latitude?, block.longitude?))
}

fn geo_from_flat_fields(content: &HotelContent) -> Option<(f64, f64)> {
    Some((content.latitude?, content.longitude?))
}

/// Tried in order; first strategy yielding a complete pair wins.
const GEO_STRATEGIES: &[GeoStrategy] = &[
    geo_from_geolocation,
    geo_from_geo_code,
    geo_from_geolocation_long_names,
    geo_from_flat_fields,
];

fn format_address(address: &AddressField) -> Option<String> {
    match address {
        AddressField::Text(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        AddressField::Parts(parts) => {
            let mut pieces: Vec<String> = Vec::new();
            if let Some(line1) = parts.line1.as_deref().filter(|s| !s.is_empty()) {
                pieces.push(line1.to_string());
            }
            if let Some(city) = parts.city.as_ref().and_then(|c| c.name.as_deref()) {
                pieces.push(city.to_string());
            }
            if let Some(country) = parts.country.as_ref().and_then(|c| c.name.as_deref()) {
                pieces.push(country.to_string());
            }
            if let Some(code) = parts.postal_code.as_deref().filter(|s| !s.is_empty()) {
                pieces.push(format!("Postal Code {}", code));
            }
            if pieces.is_empty() {
                None
            } else {
                Some(pieces.join(", "))
            }
        }
    }
}

impl Location {
    /// Normalize a hotel record. `role` names the slot being built (e.g.
    /// "origin hotel") and is carried into the error for diagnostics.
    pub fn from_hotel(
        hotel: &Hotel,
        city: &str,
        country: &str,
        role: &str,
    ) -> Result<Self, MissingGeolocation> {
        let (latitude, longitude) = GEO_STRATEGIES
            .iter()
            .find_map(|strategy| strategy(&hotel.content))
            .ok_or_else(|| MissingGeolocation {
                role: role.to_string(),
            })?;

        Ok(Self {
            city: city.to_string(),
            country: country.to_string(),
            address: hotel.content.address.as_ref().and_then(format_address),
            latitude,
            longitude,
        })
    }

    /// Normalize an airport record.
    pub fn from_airport(airport: &Airport, role: &str) -> Result<Self, MissingGeolocation> {
        let (latitude, longitude) = airport
            .latitude
            .zip(airport.longitude)
            .ok_or_else(|| MissingGeolocation {
                role: role.to_string(),
            })?;

        Ok(Self {
            city: airport.city.clone(),
            country: airport.country.clone().unwrap_or_default(),
            address: airport.name.clone(),
            latitude,
            longitude,
        })
    }
}
