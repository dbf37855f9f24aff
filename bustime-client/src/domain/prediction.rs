//! Arrival/departure predictions.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tokio::sync::OnceCell;

use crate::api::client::VehicleQuery;
use crate::api::error::BustimeError;
use crate::cache::CachedBustimeClient;

use super::ids::{RouteId, StopId, VehicleId};
use super::route::Direction;
use super::stop::Stop;
use super::vehicle::VehicleState;

/// Whether a prediction is for an arrival or a departure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionKind {
    Arrival,
    Departure,
}

/// Denormalized stop data carried inside a prediction record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictedStop {
    pub id: StopId,
    pub name: String,
    /// Feet from the vehicle to this stop
    pub feet_to_stop: u32,
}

/// A predicted arrival or departure for one vehicle at one stop.
///
/// The associated vehicle and stop resolve lazily and are cached on the
/// instance; repeated access never re-issues a request. Freshness is
/// derived on demand, never stored.
#[derive(Debug)]
pub struct Prediction {
    /// When the prediction was generated, in the operator's zone
    pub generated_at: DateTime<Tz>,
    /// Predicted arrival/departure time
    pub predicted_time: DateTime<Tz>,
    pub kind: PredictionKind,
    /// False when the feed omits the delay flag
    pub delayed: bool,
    /// Designator of the route being served
    pub route: RouteId,
    pub direction: Direction,
    /// Destination text
    pub destination: String,
    /// Vehicle the prediction refers to
    pub vehicle_id: VehicleId,
    /// Denormalized predicted-stop triple
    pub stop_ref: PredictedStop,

    vehicle: OnceCell<VehicleState>,
    stop: OnceLock<Stop>,
}

impl Prediction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        generated_at: DateTime<Tz>,
        predicted_time: DateTime<Tz>,
        kind: PredictionKind,
        delayed: bool,
        route: RouteId,
        direction: Direction,
        destination: String,
        vehicle_id: VehicleId,
        stop_ref: PredictedStop,
    ) -> Self {
        Self {
            generated_at,
            predicted_time,
            kind,
            delayed,
            route,
            direction,
            destination,
            vehicle_id,
            stop_ref,
            vehicle: OnceCell::new(),
            stop: OnceLock::new(),
        }
    }

    /// Elapsed time since this prediction was generated.
    pub fn freshness(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.generated_at)
    }

    /// Time remaining until the predicted arrival/departure. Negative once
    /// the predicted instant has passed.
    pub fn time_remaining(&self, now: DateTime<Utc>) -> Duration {
        self.predicted_time.signed_duration_since(now)
    }

    /// Feet from the associated vehicle to the predicted stop.
    pub fn feet_to_stop(&self) -> u32 {
        self.stop_ref.feet_to_stop
    }

    /// The vehicle this prediction refers to, fetched once and cached.
    ///
    /// A vehicle that is tracked but not reporting live telemetry resolves
    /// to [`VehicleState::Offline`] rather than an error, so callers can
    /// iterate a prediction list without special-casing dead feeds.
    pub async fn vehicle(
        &self,
        api: &CachedBustimeClient,
    ) -> Result<&VehicleState, BustimeError> {
        self.vehicle
            .get_or_try_init(|| async {
                let mut found = api
                    .vehicles(&VehicleQuery::by_ids([self.vehicle_id.clone()]))
                    .await?;
                Ok(match found.drain(..).find(|v| v.id == self.vehicle_id) {
                    Some(vehicle) => VehicleState::Live(vehicle),
                    None => VehicleState::Offline {
                        id: self.vehicle_id.clone(),
                    },
                })
            })
            .await
    }

    /// The predicted stop, constructed from the denormalized record data
    /// on first access and cached. No request is issued; the API has no
    /// stop-by-ID lookup.
    pub fn stop(&self) -> &Stop {
        self.stop.get_or_init(|| {
            Stop::new(self.stop_ref.id.clone(), Some(self.stop_ref.name.clone()))
        })
    }
}

impl fmt::Display for Prediction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phrase = match self.kind {
            PredictionKind::Arrival => "ETA",
            PredictionKind::Departure => "ETD",
        };
        write!(
            f,
            "{phrase} {} bus #{} at stop #{}",
            self.predicted_time.format("%H:%M:%S"),
            self.vehicle_id,
            self.stop_ref.id
        )
    }
}
