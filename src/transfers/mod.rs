//! Itinerary transfer orchestration.
//!
//! The engine decides, on creation and on every later mutation, which ground
//! or air transfer connects two consecutive points of the journey, and
//! recomputes only the day slots whose adjacency changed.

pub mod leg;
pub mod lock;
pub mod reconcile;
pub mod time;

use std::sync::Arc;

use crate::config::Config;
use crate::providers::{CurrencyApi, FlightSearchApi, GroundTransferApi};

pub use leg::{BuiltLeg, EndpointKind, LegRequest, RevalidationResult, TransferOption};
pub use lock::{LockGuard, LockManager};
pub use reconcile::{apply_updates, ReconcileOutcome, SlotUpdate};

/// Resolved transfer policy, derived from configuration.
#[derive(Debug, Clone)]
pub struct TransferPolicy {
    pub air_fallback_threshold_minutes: i64,
    pub pickup_lead_hours: i64,
    pub intercity_capacity_margin: u32,
    pub base_currency: String,
}

impl TransferPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            air_fallback_threshold_minutes: config.transfer_policy.air_fallback_threshold_minutes,
            pickup_lead_hours: config.transfer_policy.pickup_lead_hours,
            intercity_capacity_margin: config.transfer_policy.intercity_capacity_margin,
            base_currency: config.base_currency.clone(),
        }
    }
}

pub struct TransferEngine {
    pub(crate) ground: Arc<dyn GroundTransferApi>,
    pub(crate) flights: Arc<dyn FlightSearchApi>,
    pub(crate) currency: Arc<dyn CurrencyApi>,
    pub(crate) policy: TransferPolicy,
}

impl TransferEngine {
    pub fn new(
        ground: Arc<dyn GroundTransferApi>,
        flights: Arc<dyn FlightSearchApi>,
        currency: Arc<dyn CurrencyApi>,
        policy: TransferPolicy,
    ) -> Self {
        Self {
            ground,
            flights,
            currency,
            policy,
        }
    }
}
