//! Itinerary document model.
//!
//! The itinerary is persisted as one JSON document per booking token. Each
//! city owns an ordered list of days; a day carries its flights, hotels and
//! the transfer legs computed by the reconciliation engine.

pub mod location;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub use location::{HotelContent, Location};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Itinerary {
    /// Booking token identifying this itinerary
    pub token: String,
    /// Currency all fares are expressed in
    pub base_currency: String,
    /// Room occupancies for the whole party
    pub travelers: Vec<RoomOccupancy>,
    /// Cities in visiting order. The first city's first day is the global
    /// arrival point, the last city's last day the global departure point.
    pub cities: Vec<City>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RoomOccupancy {
    pub adults: u32,
    #[serde(default)]
    pub children: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct City {
    pub name: String,
    pub country: String,
    /// days[0] is the arrival day, days[last] the departure day for this city
    pub days: Vec<Day>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Day {
    pub date: NaiveDate,
    #[serde(default)]
    pub flights: Vec<Flight>,
    #[serde(default)]
    pub hotels: Vec<Hotel>,
    #[serde(default)]
    pub transfers: Vec<TransferLeg>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Flight {
    pub carrier: Option<String>,
    pub flight_number: Option<String>,
    pub origin: Airport,
    pub destination: Airport,
    /// Departure timestamp as delivered by the supplier. May be a full ISO
    /// datetime, a bare date, or a clock time; see `transfers::time`.
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
    /// True for flight entries added by the engine as part of an inter-city
    /// composite, so they can be replaced on re-reconciliation.
    #[serde(default)]
    pub synthetic: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Airport {
    /// IATA code (e.g. "BLR")
    pub code: String,
    pub name: Option<String>,
    pub city: String,
    pub country: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Hotel {
    pub id: Option<String>,
    pub name: String,
    /// Static content attached by the upstream hotel booking flow
    #[serde(default)]
    pub content: HotelContent,
}

/// One directed transfer connecting two points of the journey.
///
/// Cross-day legs are always attached to exactly one day: the departure-side
/// leg to the origin city's last day, the arrival-side leg to the destination
/// city's first day.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransferLeg {
    AirportToHotel { transfer: GroundLeg },
    HotelToAirport { transfer: GroundLeg },
    CityToCity { transfer: GroundLeg },
    InterCityFlight {
        flight: Flight,
        transfers: InterCityTransfers,
    },
}

/// The two ground legs connecting an inter-city flight to the hotels on
/// either side.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InterCityTransfers {
    pub hotel_to_airport: GroundLeg,
    pub airport_to_hotel: GroundLeg,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GroundLeg {
    pub provider: String,
    pub quote: GroundQuote,
    pub origin: Location,
    pub destination: Location,
    pub quotation_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct GroundQuote {
    pub fare: f64,
    pub currency: String,
    pub vehicle: String,
    pub duration_minutes: i64,
    pub distance_km: Option<f64>,
}

/// Total traveler count across a set of rooms.
pub fn traveler_count(travelers: &[RoomOccupancy]) -> u32 {
    travelers.iter().map(|r| r.adults + r.children).sum()
}

impl Itinerary {
    pub fn traveler_count(&self) -> u32 {
        traveler_count(&self.travelers)
    }

    pub fn city_index(&self, name: &str) -> Option<usize> {
        self.cities
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn day_mut(&mut self, city_name: &str, date: NaiveDate) -> Option<&mut Day> {
        let ci = self.city_index(city_name)?;
        self.cities[ci].days.iter_mut().find(|d| d.date == date)
    }
}

impl City {
    /// The hotel the party stays at in this city: the first hotel found,
    /// scanning from the arrival day.
    pub fn primary_hotel(&self) -> Option<&Hotel> {
        self.days.iter().find_map(|d| d.hotels.first())
    }

    /// Inbound flight landing in this city on its arrival day, if any.
    /// Synthetic flights are engine artifacts belonging to an inter-city
    /// composite and never count as an arrival.
    pub fn arrival_flight(&self) -> Option<&Flight> {
        let day = self.days.first()?;
        day.flights
            .iter()
            .find(|f| !f.synthetic && f.destination.city.eq_ignore_ascii_case(&self.name))
            .or_else(|| {
                // Supplier city names are unreliable; accept any non-synthetic
                // flight as the arrival, as long as it does not depart from here
                day.flights
                    .iter()
                    .find(|f| !f.synthetic && !f.origin.city.eq_ignore_ascii_case(&self.name))
            })
    }

    /// Outbound flight leaving this city on its departure day, if any.
    /// Synthetic flights never count.
    pub fn departure_flight(&self) -> Option<&Flight> {
        let day = self.days.last()?;
        day.flights
            .iter()
            .find(|f| !f.synthetic && f.origin.city.eq_ignore_ascii_case(&self.name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airport(code: &str, city: &str) -> Airport {
        Airport {
            code: code.to_string(),
            name: None,
            city: city.to_string(),
            country: None,
            latitude: Some(12.95),
            longitude: Some(77.67),
        }
    }

    fn flight(from: &str, from_city: &str, to: &str, to_city: &str) -> Flight {
        Flight {
            carrier: Some("6E".to_string()),
            flight_number: Some("6E-123".to_string()),
            origin: airport(from, from_city),
            destination: airport(to, to_city),
            departure_time: None,
            arrival_time: None,
            synthetic: false,
        }
    }

    #[test]
    fn traveler_count_sums_rooms() {
        let itin = Itinerary {
            token: "t".to_string(),
            base_currency: "USD".to_string(),
            travelers: vec![
                RoomOccupancy { adults: 2, children: 1 },
                RoomOccupancy { adults: 1, children: 0 },
            ],
            cities: vec![],
        };
        assert_eq!(itin.traveler_count(), 4);
    }

    #[test]
    fn arrival_flight_matches_city_by_destination() {
        let city = City {
            name: "Bengaluru".to_string(),
            country: "India".to_string(),
            days: vec![Day {
                date: NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
                flights: vec![
                    flight("BLR", "Bengaluru", "GOI", "Goa"),
                    flight("DEL", "Delhi", "BLR", "Bengaluru"),
                ],
                hotels: vec![],
                transfers: vec![],
            }],
        };
        let inbound = city.arrival_flight().unwrap();
        assert_eq!(inbound.origin.code, "DEL");
    }

    #[test]
    fn synthetic_flights_are_never_arrival_or_departure() {
        let mut synthetic = flight("BLR", "Bengaluru", "GOI", "Goa");
        synthetic.synthetic = true;
        let city = City {
            name: "Goa".to_string(),
            country: "India".to_string(),
            days: vec![Day {
                date: NaiveDate::from_ymd_opt(2026, 9, 3).unwrap(),
                flights: vec![synthetic],
                hotels: vec![],
                transfers: vec![],
            }],
        };
        assert!(city.arrival_flight().is_none());

        let mut synthetic = flight("GOI", "Goa", "BOM", "Mumbai");
        synthetic.synthetic = true;
        let city = City {
            name: "Goa".to_string(),
            country: "India".to_string(),
            days: vec![Day {
                date: NaiveDate::from_ymd_opt(2026, 9, 3).unwrap(),
                flights: vec![synthetic],
                hotels: vec![],
                transfers: vec![],
            }],
        };
        assert!(city.departure_flight().is_none());
    }

    #[test]
    fn departure_flight_requires_origin_match() {
        let city = City {
            name: "Goa".to_string(),
            country: "India".to_string(),
            days: vec![Day {
                date: NaiveDate::from_ymd_opt(2026, 9, 3).unwrap(),
                flights: vec![flight("DEL", "Delhi", "GOI", "Goa")],
                hotels: vec![],
                transfers: vec![],
            }],
        };
        assert!(city.departure_flight().is_none());
    }
}
