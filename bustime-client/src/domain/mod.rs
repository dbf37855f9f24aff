//! Domain types for the BusTime feed.
//!
//! Typed views over normalized API records. Identity is always the
//! upstream-assigned external ID; relationship-valued accessors resolve
//! lazily through a client handle and cache the result on the instance.

mod bulletin;
mod geo;
mod ids;
mod pattern;
mod prediction;
mod route;
mod stop;
pub mod time;
mod vehicle;

pub use bulletin::{AffectedService, Bulletin, NA_SENTINEL, ServiceKind};
pub use geo::Position;
pub use ids::{PatternId, RouteId, StopId, VehicleId};
pub use pattern::{Pattern, PatternPoint, PointKind};
pub use prediction::{PredictedStop, Prediction, PredictionKind};
pub use route::{Direction, Route, RouteRegistry};
pub use stop::{Stop, StopWithLocation, UNNAMED_STOP};
pub use time::{FEED_TIMESTAMP_FORMAT, FEED_TIMEZONE, parse_feed_timestamp};
pub use vehicle::{Vehicle, VehicleState};
