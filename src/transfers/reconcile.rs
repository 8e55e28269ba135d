//! Itinerary transfer reconciliation.
//!
//! Given a change event (initial creation, hotel swap, flight swap) the
//! reconciler determines which transfer legs went stale, rebuilds only those,
//! and emits replacement `transfers` arrays per affected day slot. Days whose
//! adjacency did not change are never touched. The reconciler works over an
//! immutable snapshot and returns `SlotUpdate`s; the caller writes them into
//! the document and persists it.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use tracing::{info, warn};

use super::leg::{BuiltLeg, EndpointKind, LegRequest};
use super::time::{pickup_lead_time, resolve_timestamp};
use super::TransferEngine;
use crate::models::{Flight, Itinerary, Location, TransferLeg};

/// Replacement content for one (city, day) slot.
#[derive(Debug, Clone)]
pub struct SlotUpdate {
    pub city: String,
    pub date: NaiveDate,
    /// Complete replacement for the day's transfers array
    pub transfers: Vec<TransferLeg>,
    /// Synthetic flight entries to append to the day's flights array
    pub extra_flights: Vec<Flight>,
}

#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    pub updates: Vec<SlotUpdate>,
    /// Human-readable reasons for slots that could not be rebuilt. A
    /// non-empty list means partial success, never a failed change.
    pub failures: Vec<String>,
}

impl ReconcileOutcome {
    fn slot_mut(&mut self, city: &str, date: NaiveDate) -> &mut SlotUpdate {
        if let Some(idx) = self
            .updates
            .iter()
            .position(|u| u.city.eq_ignore_ascii_case(city) && u.date == date)
        {
            return &mut self.updates[idx];
        }
        self.updates.push(SlotUpdate {
            city: city.to_string(),
            date,
            transfers: Vec::new(),
            extra_flights: Vec::new(),
        });
        self.updates.last_mut().expect("just pushed")
    }

    fn push_leg(&mut self, city: &str, date: NaiveDate, leg: TransferLeg) {
        self.slot_mut(city, date).transfers.push(leg);
    }

    fn push_extra_flight(&mut self, city: &str, date: NaiveDate, flight: Flight) {
        self.slot_mut(city, date).extra_flights.push(flight);
    }

    /// Record a failed rebuild: the slot still gets an (empty) replacement so
    /// the stale leg is cleared, and the reason is kept for the response.
    fn fail_slot(&mut self, city: &str, date: NaiveDate, message: String) {
        self.slot_mut(city, date);
        warn!(city = %city, %date, message = %message, "Transfer slot could not be rebuilt");
        self.failures.push(message);
    }

    fn merge(&mut self, other: ReconcileOutcome) {
        for update in other.updates {
            let slot = self.slot_mut(&update.city, update.date);
            slot.transfers.extend(update.transfers);
            slot.extra_flights.extend(update.extra_flights);
        }
        self.failures.extend(other.failures);
    }

    pub fn transfer_update_failed(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Write slot updates into the document. Each touched day's transfers array
/// is replaced wholesale; previously added synthetic flights are dropped
/// before the new ones are appended.
pub fn apply_updates(itinerary: &mut Itinerary, updates: &[SlotUpdate]) {
    for update in updates {
        let Some(day) = itinerary.day_mut(&update.city, update.date) else {
            warn!(city = %update.city, date = %update.date, "Slot update targets unknown day");
            continue;
        };
        day.transfers = update.transfers.clone();
        day.flights.retain(|f| !f.synthetic);
        day.flights.extend(update.extra_flights.iter().cloned());
    }
}

impl TransferEngine {
    /// Build the full set of transfers for a freshly assembled itinerary:
    /// the two journey endpoints plus one link per city boundary.
    pub async fn reconcile_for_creation(&self, itinerary: &Itinerary) -> ReconcileOutcome {
        let mut out = ReconcileOutcome::default();
        if itinerary.cities.is_empty() {
            return out;
        }

        out.merge(self.rebuild_arrival_leg(itinerary, 0).await);

        // City links touch disjoint slots; issue them all at once.
        let link_count = itinerary.cities.len().saturating_sub(1);
        let links: Vec<_> = (0..link_count)
            .map(|ci| self.rebuild_city_link(itinerary, ci))
            .collect();
        for fragment in futures::future::join_all(links).await {
            out.merge(fragment);
        }

        out.merge(
            self.rebuild_departure_leg(itinerary, itinerary.cities.len() - 1)
                .await,
        );

        info!(
            token = %itinerary.token,
            slots = out.updates.len(),
            failures = out.failures.len(),
            "Reconciled transfers for itinerary creation"
        );
        out
    }

    /// Rebuild the legs adjacent to a replaced hotel. The snapshot must
    /// already contain the new hotel.
    pub async fn reconcile_for_hotel_change(
        &self,
        itinerary: &Itinerary,
        city_name: &str,
    ) -> ReconcileOutcome {
        let mut out = ReconcileOutcome::default();
        let Some(ci) = itinerary.city_index(city_name) else {
            out.failures
                .push(format!("unknown city in itinerary: {}", city_name));
            return out;
        };
        let last = itinerary.cities.len() - 1;
        let is_first = ci == 0;
        let is_last = ci == last;

        if is_first {
            out.merge(self.rebuild_arrival_leg(itinerary, ci).await);
            if !is_last {
                out.merge(self.rebuild_city_link(itinerary, ci).await);
            }
        }
        if is_last {
            if ci > 0 {
                out.merge(self.rebuild_city_link(itinerary, ci - 1).await);
            }
            out.merge(self.rebuild_departure_leg(itinerary, ci).await);
        }
        if !is_first && !is_last {
            // Incoming and outgoing links target disjoint days
            let (incoming, outgoing) = tokio::join!(
                self.rebuild_city_link(itinerary, ci - 1),
                self.rebuild_city_link(itinerary, ci)
            );
            out.merge(incoming);
            out.merge(outgoing);
        }

        info!(
            token = %itinerary.token,
            city = %city_name,
            slots = out.updates.len(),
            failures = out.failures.len(),
            "Reconciled transfers for hotel change"
        );
        out
    }

    /// Rebuild only the airport-adjacent leg(s) touching a replaced flight's
    /// day. City-to-city legs elsewhere are untouched.
    pub async fn reconcile_for_flight_change(
        &self,
        itinerary: &Itinerary,
        city_name: &str,
        date: NaiveDate,
    ) -> ReconcileOutcome {
        let mut out = ReconcileOutcome::default();
        let Some(ci) = itinerary.city_index(city_name) else {
            out.failures
                .push(format!("unknown city in itinerary: {}", city_name));
            return out;
        };
        let city = &itinerary.cities[ci];
        let is_first_day = city.days.first().map(|d| d.date == date).unwrap_or(false);
        let is_last_day = city.days.last().map(|d| d.date == date).unwrap_or(false);

        if is_first_day && city.arrival_flight().is_some() {
            out.merge(self.rebuild_arrival_leg(itinerary, ci).await);
        }
        if is_last_day && city.departure_flight().is_some() {
            out.merge(self.rebuild_departure_leg(itinerary, ci).await);
        }

        // Only airport-adjacent legs are rebuilt here; city links co-located
        // on a touched day must survive the wholesale slot replacement.
        for update in &mut out.updates {
            let Some(day) = itinerary
                .cities
                .iter()
                .find(|c| c.name.eq_ignore_ascii_case(&update.city))
                .and_then(|c| c.days.iter().find(|d| d.date == update.date))
            else {
                continue;
            };
            for leg in &day.transfers {
                match leg {
                    TransferLeg::CityToCity { .. } => update.transfers.push(leg.clone()),
                    TransferLeg::InterCityFlight { flight, .. } => {
                        update.transfers.push(leg.clone());
                        update.extra_flights.push(flight.clone());
                    }
                    TransferLeg::AirportToHotel { .. } | TransferLeg::HotelToAirport { .. } => {}
                }
            }
        }

        info!(
            token = %itinerary.token,
            city = %city_name,
            %date,
            slots = out.updates.len(),
            "Reconciled transfers for flight change"
        );
        out
    }

    /// Airport → hotel leg for a city's arrival day, when it has an inbound
    /// flight.
    async fn rebuild_arrival_leg(&self, itinerary: &Itinerary, ci: usize) -> ReconcileOutcome {
        let mut out = ReconcileOutcome::default();
        let city = &itinerary.cities[ci];
        let Some(day) = city.days.first() else {
            return out;
        };
        let Some(flight) = city.arrival_flight() else {
            return out;
        };
        let Some(hotel) = city.primary_hotel() else {
            out.fail_slot(
                &city.name,
                day.date,
                format!("{}: no hotel to connect the arrival airport to", city.name),
            );
            return out;
        };

        let airport = match Location::from_airport(&flight.destination, "arrival airport") {
            Ok(loc) => loc,
            Err(err) => {
                out.fail_slot(&city.name, day.date, err.to_string());
                return out;
            }
        };
        let hotel_loc =
            match Location::from_hotel(hotel, &city.name, &city.country, "arrival hotel") {
                Ok(loc) => loc,
                Err(err) => {
                    out.fail_slot(&city.name, day.date, err.to_string());
                    return out;
                }
            };

        let pickup = resolve_timestamp(flight.arrival_time.as_deref().unwrap_or(""), day.date);
        let built = self
            .build_leg(
                &itinerary.travelers,
                LegRequest {
                    origin: airport,
                    destination: hotel_loc,
                    origin_kind: EndpointKind::Airport,
                    destination_kind: EndpointKind::Hotel,
                    pickup,
                    date: day.date,
                    capacity_margin: 0,
                },
            )
            .await;

        match built {
            BuiltLeg::Ground(transfer) => {
                out.push_leg(&city.name, day.date, TransferLeg::AirportToHotel { transfer })
            }
            BuiltLeg::InterCityFlight { .. } => out.fail_slot(
                &city.name,
                day.date,
                "unexpected composite for an airport transfer".to_string(),
            ),
            BuiltLeg::Unavailable { message } => out.fail_slot(
                &city.name,
                day.date,
                format!("{} arrival transfer: {}", city.name, message),
            ),
        }
        out
    }

    /// Hotel → airport leg for a city's departure day, when it has an
    /// outbound flight.
    async fn rebuild_departure_leg(&self, itinerary: &Itinerary, ci: usize) -> ReconcileOutcome {
        let mut out = ReconcileOutcome::default();
        let city = &itinerary.cities[ci];
        let Some(day) = city.days.last() else {
            return out;
        };
        let Some(flight) = city.departure_flight() else {
            return out;
        };
        let Some(hotel) = city.primary_hotel() else {
            out.fail_slot(
                &city.name,
                day.date,
                format!("{}: no hotel to connect to the departure airport", city.name),
            );
            return out;
        };

        let hotel_loc =
            match Location::from_hotel(hotel, &city.name, &city.country, "departure hotel") {
                Ok(loc) => loc,
                Err(err) => {
                    out.fail_slot(&city.name, day.date, err.to_string());
                    return out;
                }
            };
        let airport = match Location::from_airport(&flight.origin, "departure airport") {
            Ok(loc) => loc,
            Err(err) => {
                out.fail_slot(&city.name, day.date, err.to_string());
                return out;
            }
        };

        let pickup = pickup_lead_time(
            flight.departure_time.as_deref(),
            day.date,
            self.policy.pickup_lead_hours,
        );
        let built = self
            .build_leg(
                &itinerary.travelers,
                LegRequest {
                    origin: hotel_loc,
                    destination: airport,
                    origin_kind: EndpointKind::Hotel,
                    destination_kind: EndpointKind::Airport,
                    pickup,
                    date: day.date,
                    capacity_margin: 0,
                },
            )
            .await;

        match built {
            BuiltLeg::Ground(transfer) => {
                out.push_leg(&city.name, day.date, TransferLeg::HotelToAirport { transfer })
            }
            BuiltLeg::InterCityFlight { .. } => out.fail_slot(
                &city.name,
                day.date,
                "unexpected composite for an airport transfer".to_string(),
            ),
            BuiltLeg::Unavailable { message } => out.fail_slot(
                &city.name,
                day.date,
                format!("{} departure transfer: {}", city.name, message),
            ),
        }
        out
    }

    /// Link between consecutive cities `from_ci` and `from_ci + 1`. A ground
    /// result attaches to the destination city's first day; a composite is
    /// split: hotel→airport on the origin city's last day, the composite plus
    /// a synthetic flight on the destination city's first day.
    async fn rebuild_city_link(&self, itinerary: &Itinerary, from_ci: usize) -> ReconcileOutcome {
        let mut out = ReconcileOutcome::default();
        let origin_city = &itinerary.cities[from_ci];
        let dest_city = &itinerary.cities[from_ci + 1];
        let (Some(origin_day), Some(dest_day)) =
            (origin_city.days.last(), dest_city.days.first())
        else {
            return out;
        };

        let Some(origin_hotel) = origin_city.primary_hotel() else {
            out.fail_slot(
                &dest_city.name,
                dest_day.date,
                format!("{}: no origin hotel for the city link", origin_city.name),
            );
            return out;
        };
        let Some(dest_hotel) = dest_city.primary_hotel() else {
            out.fail_slot(
                &dest_city.name,
                dest_day.date,
                format!("{}: no destination hotel for the city link", dest_city.name),
            );
            return out;
        };

        let origin_loc = match Location::from_hotel(
            origin_hotel,
            &origin_city.name,
            &origin_city.country,
            "origin hotel",
        ) {
            Ok(loc) => loc,
            Err(err) => {
                out.fail_slot(&dest_city.name, dest_day.date, err.to_string());
                return out;
            }
        };
        let dest_loc = match Location::from_hotel(
            dest_hotel,
            &dest_city.name,
            &dest_city.country,
            "destination hotel",
        ) {
            Ok(loc) => loc,
            Err(err) => {
                out.fail_slot(&dest_city.name, dest_day.date, err.to_string());
                return out;
            }
        };

        let pickup = Utc.from_utc_datetime(&dest_day.date.and_time(NaiveTime::MIN));
        let built = self
            .build_leg(
                &itinerary.travelers,
                LegRequest {
                    origin: origin_loc,
                    destination: dest_loc,
                    origin_kind: EndpointKind::Hotel,
                    destination_kind: EndpointKind::Hotel,
                    pickup,
                    date: dest_day.date,
                    capacity_margin: self.policy.intercity_capacity_margin,
                },
            )
            .await;

        match built {
            BuiltLeg::Ground(transfer) => out.push_leg(
                &dest_city.name,
                dest_day.date,
                TransferLeg::CityToCity { transfer },
            ),
            BuiltLeg::InterCityFlight {
                mut flight,
                transfers,
            } => {
                out.push_leg(
                    &origin_city.name,
                    origin_day.date,
                    TransferLeg::HotelToAirport {
                        transfer: transfers.hotel_to_airport.clone(),
                    },
                );
                flight.synthetic = true;
                out.push_extra_flight(&dest_city.name, dest_day.date, flight.clone());
                out.push_leg(
                    &dest_city.name,
                    dest_day.date,
                    TransferLeg::InterCityFlight { flight, transfers },
                );
            }
            BuiltLeg::Unavailable { message } => out.fail_slot(
                &dest_city.name,
                dest_day.date,
                format!(
                    "{} to {}: {}",
                    origin_city.name, dest_city.name, message
                ),
            ),
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{City, Day, Hotel, RoomOccupancy};
    use crate::models::location::{GeoBlock, HotelContent};
    use crate::transfers::test_support::*;
    use std::sync::Arc;

    fn hotel(name: &str, lat: f64, long: f64) -> Hotel {
        Hotel {
            id: Some(name.to_lowercase()),
            name: name.to_string(),
            content: HotelContent {
                geolocation: Some(GeoBlock {
                    lat: Some(lat),
                    long: Some(long),
                    ..Default::default()
                }),
                ..Default::default()
            },
        }
    }

    fn day(date: &str, hotels: Vec<Hotel>, flights: Vec<Flight>) -> Day {
        Day {
            date: date.parse().unwrap(),
            flights,
            hotels,
            transfers: vec![],
        }
    }

    fn inbound_flight(to_city: &str) -> Flight {
        let mut flight = test_flight("Delhi", to_city);
        flight.arrival_time = Some("2026-09-01T09:30:00Z".to_string());
        flight
    }

    fn outbound_flight(from_city: &str) -> Flight {
        let mut flight = test_flight(from_city, "Delhi");
        flight.departure_time = Some("2026-09-05T18:00:00Z".to_string());
        flight
    }

    /// Two-city itinerary: A (days 1-2, arrival flight) then B (days 3-4).
    fn two_city_itinerary() -> Itinerary {
        Itinerary {
            token: "tok-1".to_string(),
            base_currency: "USD".to_string(),
            travelers: vec![RoomOccupancy {
                adults: 2,
                children: 0,
            }],
            cities: vec![
                City {
                    name: "Bengaluru".to_string(),
                    country: "India".to_string(),
                    days: vec![
                        day(
                            "2026-09-01",
                            vec![hotel("Grand A", 12.97, 77.59)],
                            vec![inbound_flight("Bengaluru")],
                        ),
                        day("2026-09-02", vec![], vec![]),
                    ],
                },
                City {
                    name: "Goa".to_string(),
                    country: "India".to_string(),
                    days: vec![
                        day("2026-09-03", vec![hotel("Beach B", 15.49, 73.82)], vec![]),
                        day("2026-09-04", vec![], vec![]),
                    ],
                },
            ],
        }
    }

    fn three_city_itinerary() -> Itinerary {
        let mut itin = two_city_itinerary();
        itin.cities.push(City {
            name: "Mumbai".to_string(),
            country: "India".to_string(),
            days: vec![day(
                "2026-09-05",
                vec![hotel("Harbour C", 18.92, 72.83)],
                vec![outbound_flight("Mumbai")],
            )],
        });
        itin
    }

    fn leg_kind(leg: &TransferLeg) -> &'static str {
        match leg {
            TransferLeg::AirportToHotel { .. } => "airport_to_hotel",
            TransferLeg::HotelToAirport { .. } => "hotel_to_airport",
            TransferLeg::CityToCity { .. } => "city_to_city",
            TransferLeg::InterCityFlight { .. } => "inter_city_flight",
        }
    }

    fn slot<'a>(out: &'a ReconcileOutcome, city: &str, date: &str) -> &'a SlotUpdate {
        out.updates
            .iter()
            .find(|u| u.city == city && u.date == date.parse::<NaiveDate>().unwrap())
            .unwrap_or_else(|| panic!("no slot update for {} {}", city, date))
    }

    #[tokio::test]
    async fn creation_builds_arrival_leg_and_city_link() {
        let ground = Arc::new(FakeGround::with_quotes(vec![quote("van", 6, 40.0, 120)]));
        let flights = Arc::new(FakeFlights::new(FlightBehavior::Empty));
        let engine = engine_with(ground, flights);

        let itin = two_city_itinerary();
        let out = engine.reconcile_for_creation(&itin).await;

        assert!(!out.transfer_update_failed());
        assert_eq!(out.updates.len(), 2);

        let arrival = slot(&out, "Bengaluru", "2026-09-01");
        assert_eq!(arrival.transfers.len(), 1);
        assert_eq!(leg_kind(&arrival.transfers[0]), "airport_to_hotel");

        let link = slot(&out, "Goa", "2026-09-03");
        assert_eq!(link.transfers.len(), 1);
        assert_eq!(leg_kind(&link.transfers[0]), "city_to_city");
        match &link.transfers[0] {
            TransferLeg::CityToCity { transfer } => {
                assert_eq!(transfer.origin.city, "Bengaluru");
                assert_eq!(transfer.destination.city, "Goa");
            }
            other => panic!("unexpected leg {:?}", other),
        }
    }

    #[tokio::test]
    async fn long_city_link_splits_composite_across_boundary_days() {
        let ground = Arc::new(FakeGround::with_quotes(vec![quote("van", 6, 40.0, 360)]));
        let flights = Arc::new(FakeFlights::new(FlightBehavior::Returns(vec![test_flight(
            "Bengaluru",
            "Goa",
        )])));
        let engine = engine_with(ground, flights);

        let itin = two_city_itinerary();
        let out = engine.reconcile_for_creation(&itin).await;

        // Departure-side leg on A's last day
        let origin_side = slot(&out, "Bengaluru", "2026-09-02");
        assert_eq!(origin_side.transfers.len(), 1);
        assert_eq!(leg_kind(&origin_side.transfers[0]), "hotel_to_airport");

        // Composite plus synthetic flight on B's first day
        let dest_side = slot(&out, "Goa", "2026-09-03");
        assert_eq!(dest_side.transfers.len(), 1);
        assert_eq!(leg_kind(&dest_side.transfers[0]), "inter_city_flight");
        assert_eq!(dest_side.extra_flights.len(), 1);
        assert!(dest_side.extra_flights[0].synthetic);

        // The arrival airport leg stays ground even though the city link
        // exceeded the threshold: airport endpoints never go to air.
        let arrival = slot(&out, "Bengaluru", "2026-09-01");
        assert_eq!(leg_kind(&arrival.transfers[0]), "airport_to_hotel");
    }

    #[tokio::test]
    async fn middle_city_hotel_swap_rebuilds_exactly_two_links() {
        let ground = Arc::new(FakeGround::with_quotes(vec![quote("van", 6, 40.0, 120)]));
        let flights = Arc::new(FakeFlights::new(FlightBehavior::Empty));
        let engine = engine_with(ground, flights);

        let mut itin = three_city_itinerary();
        // Swap the middle city's hotel
        itin.cities[1].days[0].hotels = vec![hotel("New Beach B", 15.50, 73.80)];

        let out = engine.reconcile_for_hotel_change(&itin, "Goa").await;

        assert!(!out.transfer_update_failed());
        assert_eq!(out.updates.len(), 2);
        let incoming = slot(&out, "Goa", "2026-09-03");
        assert_eq!(leg_kind(&incoming.transfers[0]), "city_to_city");
        let outgoing = slot(&out, "Mumbai", "2026-09-05");
        assert_eq!(leg_kind(&outgoing.transfers[0]), "city_to_city");

        // Mumbai's own outbound-airport leg is not among the updates: the
        // only Mumbai slot touched is the incoming city link.
        assert!(outgoing
            .transfers
            .iter()
            .all(|l| leg_kind(l) != "hotel_to_airport"));
    }

    #[tokio::test]
    async fn first_city_hotel_swap_rebuilds_arrival_and_outgoing_link() {
        let ground = Arc::new(FakeGround::with_quotes(vec![quote("van", 6, 40.0, 120)]));
        let flights = Arc::new(FakeFlights::new(FlightBehavior::Empty));
        let engine = engine_with(ground, flights);

        let itin = two_city_itinerary();
        let out = engine.reconcile_for_hotel_change(&itin, "Bengaluru").await;

        assert_eq!(out.updates.len(), 2);
        assert_eq!(
            leg_kind(&slot(&out, "Bengaluru", "2026-09-01").transfers[0]),
            "airport_to_hotel"
        );
        assert_eq!(
            leg_kind(&slot(&out, "Goa", "2026-09-03").transfers[0]),
            "city_to_city"
        );
    }

    #[tokio::test]
    async fn hotel_swap_reconciliation_is_idempotent() {
        let ground = Arc::new(FakeGround::with_quotes(vec![quote("van", 6, 40.0, 120)]));
        let flights = Arc::new(FakeFlights::new(FlightBehavior::Empty));
        let engine = engine_with(ground, flights);

        let itin = three_city_itinerary();
        let first = engine.reconcile_for_hotel_change(&itin, "Goa").await;
        let second = engine.reconcile_for_hotel_change(&itin, "Goa").await;

        assert_eq!(first.updates.len(), second.updates.len());
        for (a, b) in first.updates.iter().zip(second.updates.iter()) {
            assert_eq!(a.city, b.city);
            assert_eq!(a.date, b.date);
            assert_eq!(a.transfers.len(), b.transfers.len());
            for (la, lb) in a.transfers.iter().zip(b.transfers.iter()) {
                assert_eq!(leg_kind(la), leg_kind(lb));
            }
        }
    }

    #[tokio::test]
    async fn flight_change_touches_only_airport_adjacent_slot() {
        let ground = Arc::new(FakeGround::with_quotes(vec![quote("van", 6, 40.0, 120)]));
        let flights = Arc::new(FakeFlights::new(FlightBehavior::Empty));
        let engine = engine_with(ground, flights);

        let itin = three_city_itinerary();
        let out = engine
            .reconcile_for_flight_change(&itin, "Bengaluru", "2026-09-01".parse().unwrap())
            .await;

        assert_eq!(out.updates.len(), 1);
        assert_eq!(
            leg_kind(&slot(&out, "Bengaluru", "2026-09-01").transfers[0]),
            "airport_to_hotel"
        );
    }

    #[tokio::test]
    async fn flight_change_preserves_colocated_composite_leg() {
        let ground = Arc::new(FakeGround::with_quotes(vec![quote("van", 6, 40.0, 360)]));
        let flights = Arc::new(FakeFlights::new(FlightBehavior::Returns(vec![test_flight(
            "Bengaluru",
            "Goa",
        )])));
        let engine = engine_with(ground, flights);

        let mut itin = two_city_itinerary();
        let created = engine.reconcile_for_creation(&itin).await;
        apply_updates(&mut itin, &created.updates);
        // The long city link put a composite and its synthetic flight on
        // Goa's first day
        assert!(itin.cities[1].days[0].flights.iter().any(|f| f.synthetic));

        // Traveler books a real arrival flight into Goa for the same day
        let mut booked = test_flight("Delhi", "Goa");
        booked.arrival_time = Some("2026-09-03T09:00:00Z".to_string());
        itin.cities[1].days[0].flights.push(booked);

        let out = engine
            .reconcile_for_flight_change(&itin, "Goa", "2026-09-03".parse().unwrap())
            .await;
        apply_updates(&mut itin, &out.updates);

        let day = &itin.cities[1].days[0];
        let kinds: Vec<_> = day.transfers.iter().map(leg_kind).collect();
        assert!(kinds.contains(&"airport_to_hotel"));
        assert!(kinds.contains(&"inter_city_flight"));
        assert_eq!(day.flights.iter().filter(|f| f.synthetic).count(), 1);
        assert!(day
            .flights
            .iter()
            .any(|f| !f.synthetic && f.origin.city == "Delhi"));
    }

    #[tokio::test]
    async fn synthetic_flight_alone_does_not_trigger_airport_leg_rebuild() {
        let ground = Arc::new(FakeGround::with_quotes(vec![quote("van", 6, 40.0, 360)]));
        let flights = Arc::new(FakeFlights::new(FlightBehavior::Returns(vec![test_flight(
            "Bengaluru",
            "Goa",
        )])));
        let engine = engine_with(ground, flights);

        let mut itin = two_city_itinerary();
        let created = engine.reconcile_for_creation(&itin).await;
        apply_updates(&mut itin, &created.updates);

        let out = engine
            .reconcile_for_flight_change(&itin, "Goa", "2026-09-03".parse().unwrap())
            .await;
        assert!(out.updates.is_empty());
        assert!(!out.transfer_update_failed());
    }

    #[tokio::test]
    async fn flight_change_on_departure_day_rebuilds_hotel_to_airport() {
        let ground = Arc::new(FakeGround::with_quotes(vec![quote("van", 6, 40.0, 120)]));
        let flights = Arc::new(FakeFlights::new(FlightBehavior::Empty));
        let engine = engine_with(ground, flights);

        let itin = three_city_itinerary();
        let out = engine
            .reconcile_for_flight_change(&itin, "Mumbai", "2026-09-05".parse().unwrap())
            .await;

        assert_eq!(out.updates.len(), 1);
        assert_eq!(
            leg_kind(&slot(&out, "Mumbai", "2026-09-05").transfers[0]),
            "hotel_to_airport"
        );
    }

    #[tokio::test]
    async fn supplier_outage_yields_partial_success_not_error() {
        let engine = engine_with(
            Arc::new(FailingGround),
            Arc::new(FakeFlights::new(FlightBehavior::Empty)),
        );

        let itin = two_city_itinerary();
        let out = engine.reconcile_for_creation(&itin).await;

        assert!(out.transfer_update_failed());
        // Slots are still emitted (empty) so stale legs get cleared
        assert!(!out.updates.is_empty());
        assert!(out.updates.iter().all(|u| u.transfers.is_empty()));
    }

    #[tokio::test]
    async fn apply_updates_replaces_transfers_and_synthetic_flights() {
        let mut itin = two_city_itinerary();
        // Seed a stale synthetic flight on Goa's first day
        let mut stale = test_flight("Bengaluru", "Goa");
        stale.synthetic = true;
        itin.cities[1].days[0].flights.push(stale);

        let mut fresh = test_flight("Bengaluru", "Goa");
        fresh.flight_number = Some("6E-999".to_string());
        fresh.synthetic = true;

        let updates = vec![SlotUpdate {
            city: "Goa".to_string(),
            date: "2026-09-03".parse().unwrap(),
            transfers: vec![],
            extra_flights: vec![fresh],
        }];
        apply_updates(&mut itin, &updates);

        let day = &itin.cities[1].days[0];
        assert_eq!(day.flights.len(), 1);
        assert_eq!(day.flights[0].flight_number.as_deref(), Some("6E-999"));
        assert!(day.transfers.is_empty());
    }

    #[tokio::test]
    async fn missing_hotel_geolocation_aborts_only_that_slot() {
        let ground = Arc::new(FakeGround::with_quotes(vec![quote("van", 6, 40.0, 120)]));
        let flights = Arc::new(FakeFlights::new(FlightBehavior::Empty));
        let engine = engine_with(ground, flights);

        let mut itin = two_city_itinerary();
        // Destination hotel loses its coordinates
        itin.cities[1].days[0].hotels = vec![Hotel {
            id: None,
            name: "No Coords".to_string(),
            content: HotelContent::default(),
        }];

        let out = engine.reconcile_for_creation(&itin).await;

        assert!(out.transfer_update_failed());
        assert!(out
            .failures
            .iter()
            .any(|m| m.contains("destination hotel")));
        // The arrival leg for the first city is unaffected
        let arrival = slot(&out, "Bengaluru", "2026-09-01");
        assert_eq!(arrival.transfers.len(), 1);
    }
}
