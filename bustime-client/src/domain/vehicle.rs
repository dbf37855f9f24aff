//! Live vehicles.

use std::fmt;

use chrono::DateTime;
use chrono_tz::Tz;
use tokio::sync::OnceCell;

use crate::api::client::{PatternQuery, PredictionQuery, VehicleQuery};
use crate::api::error::BustimeError;
use crate::cache::CachedBustimeClient;

use super::geo::Position;
use super::ids::{PatternId, RouteId, VehicleId};
use super::pattern::Pattern;
use super::prediction::Prediction;

/// An individual vehicle on a route with a reported position.
///
/// Vehicles compare by ID. The prediction list is resolved lazily on first
/// access and then pinned for this instance's lifetime; [`Vehicle::update`]
/// produces fresh relationship state along with fresh fields.
#[derive(Debug)]
pub struct Vehicle {
    pub id: VehicleId,
    /// When the vehicle last reported, in the operator's zone
    pub last_reported: DateTime<Tz>,
    pub position: Position,
    /// Heading in degrees (0 north, 180 south)
    pub heading: u16,
    /// Pattern the current trip follows
    pub pattern_id: PatternId,
    /// Feet traveled into the current trip
    pub trip_distance_ft: f64,
    /// Designator of the route being served
    pub route: RouteId,
    /// Destination text (e.g. "Oakland")
    pub destination: String,
    pub speed_mph: u32,
    /// False when the feed omits the delay flag
    pub delayed: bool,

    pub(crate) predictions: OnceCell<Vec<Prediction>>,
}

impl Vehicle {
    /// Arrival/departure predictions for this vehicle, fetched once per
    /// instance and cached.
    pub async fn predictions(
        &self,
        api: &CachedBustimeClient,
    ) -> Result<&[Prediction], BustimeError> {
        let predictions = self
            .predictions
            .get_or_try_init(|| async {
                api.predictions(&PredictionQuery::for_vehicles([self.id.clone()]))
                    .await
            })
            .await?;
        Ok(predictions.as_slice())
    }

    /// The next stop this vehicle is predicted to reach, if any.
    pub async fn next_stop(
        &self,
        api: &CachedBustimeClient,
    ) -> Result<Option<&Prediction>, BustimeError> {
        Ok(self.predictions(api).await?.first())
    }

    /// The geographic pattern of the current trip.
    pub async fn pattern(&self, api: &CachedBustimeClient) -> Result<Option<Pattern>, BustimeError> {
        let patterns = api
            .patterns(&PatternQuery::by_ids([self.pattern_id.clone()]))
            .await?;
        Ok(patterns.iter().find(|p| p.id == self.pattern_id).cloned())
    }

    /// Replace every field in place by re-fetching this vehicle by ID.
    ///
    /// The replacement is atomic from the caller's perspective: either a
    /// complete new record is applied (including fresh, unresolved
    /// relationship state), or the value is left exactly as it was.
    pub async fn update(&mut self, api: &CachedBustimeClient) -> Result<(), BustimeError> {
        let mut fresh = api
            .vehicles(&VehicleQuery::by_ids([self.id.clone()]))
            .await?;

        match fresh.drain(..).find(|v| v.id == self.id) {
            Some(vehicle) => {
                *self = vehicle;
                Ok(())
            }
            None => Err(BustimeError::NoData(format!(
                "vehicle {} is not reporting live data",
                self.id
            ))),
        }
    }
}

impl PartialEq for Vehicle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Vehicle {}

impl fmt::Display for Vehicle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bus #{} on {} {} - at {} as of {}",
            self.id,
            self.route,
            self.destination,
            self.position,
            self.last_reported.format("%Y-%m-%d %H:%M:%S")
        )
    }
}

/// A vehicle identity with or without live telemetry.
///
/// The tracking system sometimes knows a vehicle ID without receiving
/// position reports for it; predictions can reference such vehicles. The
/// offline variant stands in for that case so iteration over predictions
/// does not abort on the first dead feed.
#[derive(Debug)]
pub enum VehicleState {
    /// Telemetry available
    Live(Vehicle),
    /// Known ID, no live data
    Offline { id: VehicleId },
}

impl VehicleState {
    pub fn id(&self) -> &VehicleId {
        match self {
            VehicleState::Live(v) => &v.id,
            VehicleState::Offline { id } => id,
        }
    }

    pub fn as_live(&self) -> Option<&Vehicle> {
        match self {
            VehicleState::Live(v) => Some(v),
            VehicleState::Offline { .. } => None,
        }
    }

    pub fn is_offline(&self) -> bool {
        matches!(self, VehicleState::Offline { .. })
    }
}

impl fmt::Display for VehicleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleState::Live(v) => v.fmt(f),
            VehicleState::Offline { id } => write!(f, "bus #{id}: no live data"),
        }
    }
}
