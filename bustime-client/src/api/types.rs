//! BusTime API response DTOs.
//!
//! These types map the business children of the `bustime-response`
//! envelope. Scalars are kept as strings here (the XML rendering has
//! nothing else; the JSON rendering mostly agrees) and coerced into real
//! types by the conversion layer. Every container field goes through the
//! cardinality normalizer, without exception.

use serde::Deserialize;

use super::norm::{coerce_opt_string, coerce_string, one_or_many};

/// Body of a `getvehicles` response.
#[derive(Debug, Clone, Deserialize)]
pub struct VehiclesBody {
    #[serde(default, deserialize_with = "one_or_many")]
    pub vehicle: Vec<VehicleDto>,
}

/// One live vehicle record.
#[derive(Debug, Clone, Deserialize)]
pub struct VehicleDto {
    /// Vehicle ID (bus number)
    #[serde(deserialize_with = "coerce_string")]
    pub vid: String,

    /// Local date/time of the last position report, `YYYYMMDD HH:MM:SS`
    #[serde(deserialize_with = "coerce_string")]
    pub tmstmp: String,

    #[serde(deserialize_with = "coerce_string")]
    pub lat: String,

    #[serde(deserialize_with = "coerce_string")]
    pub lon: String,

    /// Heading in degrees (0 north, 180 south)
    #[serde(deserialize_with = "coerce_string")]
    pub hdg: String,

    /// Pattern ID of the current trip
    #[serde(deserialize_with = "coerce_string")]
    pub pid: String,

    /// Feet traveled into the current trip
    #[serde(deserialize_with = "coerce_string")]
    pub pdist: String,

    /// Route designator (e.g. "28X")
    #[serde(deserialize_with = "coerce_string")]
    pub rt: String,

    /// Destination text (e.g. "Oakland")
    #[serde(deserialize_with = "coerce_string")]
    pub des: String,

    /// Speed in mph
    #[serde(deserialize_with = "coerce_string")]
    pub spd: String,

    /// Present (and truthy) only when the vehicle is delayed
    #[serde(default, deserialize_with = "coerce_opt_string")]
    pub dly: Option<String>,
}

/// Body of a `getroutes` response.
#[derive(Debug, Clone, Deserialize)]
pub struct RoutesBody {
    #[serde(default, deserialize_with = "one_or_many")]
    pub route: Vec<RouteDto>,
}

/// One route record.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteDto {
    /// Route designator
    #[serde(deserialize_with = "coerce_string")]
    pub rt: String,

    /// Display name (e.g. "AIRPORT FLYER")
    #[serde(deserialize_with = "coerce_string")]
    pub rtnm: String,

    /// Map display color (e.g. "#b22222")
    #[serde(default, deserialize_with = "coerce_opt_string")]
    pub rtclr: Option<String>,
}

/// Body of a `getdirections` response: direction names served by a route.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsBody {
    #[serde(default, deserialize_with = "one_or_many")]
    pub dir: Vec<String>,
}

/// Body of a `getstops` response.
#[derive(Debug, Clone, Deserialize)]
pub struct StopsBody {
    #[serde(default, deserialize_with = "one_or_many")]
    pub stop: Vec<StopDto>,
}

/// One stop record from a route's stop listing.
#[derive(Debug, Clone, Deserialize)]
pub struct StopDto {
    /// Stop ID
    #[serde(deserialize_with = "coerce_string")]
    pub stpid: String,

    /// Stop display name. Occasionally absent in the feed.
    #[serde(default, deserialize_with = "coerce_opt_string")]
    pub stpnm: Option<String>,

    #[serde(deserialize_with = "coerce_string")]
    pub lat: String,

    #[serde(deserialize_with = "coerce_string")]
    pub lon: String,
}

/// Body of a `getpatterns` response.
#[derive(Debug, Clone, Deserialize)]
pub struct PatternsBody {
    #[serde(default, deserialize_with = "one_or_many")]
    pub ptr: Vec<PatternDto>,
}

/// One geographic pattern (a routing of a bus route).
#[derive(Debug, Clone, Deserialize)]
pub struct PatternDto {
    /// Pattern ID
    #[serde(deserialize_with = "coerce_string")]
    pub pid: String,

    /// Pattern length in feet
    #[serde(deserialize_with = "coerce_string")]
    pub ln: String,

    /// Route direction this pattern serves
    #[serde(deserialize_with = "coerce_string")]
    pub rtdir: String,

    /// Ordered geographic points
    #[serde(default, deserialize_with = "one_or_many")]
    pub pt: Vec<PatternPointDto>,
}

/// One point in a pattern: either a stop (`typ` = "S") or a shape
/// waypoint (`typ` = "W").
#[derive(Debug, Clone, Deserialize)]
pub struct PatternPointDto {
    /// Position of this point in the pattern
    #[serde(deserialize_with = "coerce_string")]
    pub seq: String,

    /// "S" for stop, "W" for waypoint
    #[serde(deserialize_with = "coerce_string")]
    pub typ: String,

    #[serde(default, deserialize_with = "coerce_opt_string")]
    pub stpid: Option<String>,

    #[serde(default, deserialize_with = "coerce_opt_string")]
    pub stpnm: Option<String>,

    /// Feet into the pattern, only present on stop points
    #[serde(default, deserialize_with = "coerce_opt_string")]
    pub pdist: Option<String>,

    #[serde(deserialize_with = "coerce_string")]
    pub lat: String,

    #[serde(deserialize_with = "coerce_string")]
    pub lon: String,
}

/// Body of a `getpredictions` response.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionsBody {
    #[serde(default, deserialize_with = "one_or_many")]
    pub prd: Vec<PredictionDto>,
}

/// One arrival/departure prediction.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionDto {
    /// When this prediction was generated
    #[serde(deserialize_with = "coerce_string")]
    pub tmstmp: String,

    /// "A" for arrival, "D" for departure
    #[serde(deserialize_with = "coerce_string")]
    pub typ: String,

    /// Predicted stop ID
    #[serde(deserialize_with = "coerce_string")]
    pub stpid: String,

    /// Predicted stop name
    #[serde(default, deserialize_with = "coerce_opt_string")]
    pub stpnm: Option<String>,

    /// Vehicle the prediction is for
    #[serde(deserialize_with = "coerce_string")]
    pub vid: String,

    /// Feet from the vehicle to the stop
    #[serde(deserialize_with = "coerce_string")]
    pub dstp: String,

    /// Route designator
    #[serde(deserialize_with = "coerce_string")]
    pub rt: String,

    /// Route direction
    #[serde(deserialize_with = "coerce_string")]
    pub rtdir: String,

    /// Destination text
    #[serde(deserialize_with = "coerce_string")]
    pub des: String,

    /// Predicted arrival/departure time
    #[serde(deserialize_with = "coerce_string")]
    pub prdtm: String,

    /// Present (and truthy) only when the vehicle is delayed
    #[serde(default, deserialize_with = "coerce_opt_string")]
    pub dly: Option<String>,
}

/// Body of a `getservicebulletins` response.
#[derive(Debug, Clone, Deserialize)]
pub struct BulletinsBody {
    #[serde(default, deserialize_with = "one_or_many")]
    pub sb: Vec<BulletinDto>,
}

/// One service bulletin.
#[derive(Debug, Clone, Deserialize)]
pub struct BulletinDto {
    /// Bulletin name/ID. Frequently absent.
    #[serde(default, deserialize_with = "coerce_opt_string")]
    pub nm: Option<String>,

    /// Subject line
    #[serde(default, deserialize_with = "coerce_opt_string")]
    pub sbj: Option<String>,

    /// Full text
    #[serde(default, deserialize_with = "coerce_opt_string")]
    pub dtl: Option<String>,

    /// Short text
    #[serde(default, deserialize_with = "coerce_opt_string")]
    pub brf: Option<String>,

    /// Priority (high, medium, low)
    #[serde(default, deserialize_with = "coerce_opt_string")]
    pub prty: Option<String>,

    /// Services the bulletin applies to
    #[serde(default, deserialize_with = "one_or_many")]
    pub srvc: Vec<AffectedServiceDto>,
}

/// One affected-service record inside a bulletin. Any subset of the
/// fields may be present; stop fields and route fields classify the
/// record independently.
#[derive(Debug, Clone, Deserialize)]
pub struct AffectedServiceDto {
    #[serde(default, deserialize_with = "coerce_opt_string")]
    pub rt: Option<String>,

    #[serde(default, deserialize_with = "coerce_opt_string")]
    pub rtdir: Option<String>,

    #[serde(default, deserialize_with = "coerce_opt_string")]
    pub stpid: Option<String>,

    #[serde(default, deserialize_with = "coerce_opt_string")]
    pub stpnm: Option<String>,
}

/// Body of a `gettime` response.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeBody {
    /// Official API time, `YYYYMMDD HH:MM:SS` in the operator's zone
    #[serde(deserialize_with = "coerce_string")]
    pub tm: String,
}
