//! Conversion from API DTOs to domain types.
//!
//! All coercion lives here: string→number, feed timestamp→localized
//! datetime, presence-based booleans, and defaulting of optional fields.
//! Conversion failures name the offending field so a bad feed record can
//! be logged and skipped without losing the rest of the response.

use tokio::sync::OnceCell;

use crate::domain::{
    AffectedService, Bulletin, Direction, Pattern, PatternId, PatternPoint, PointKind, Position,
    PredictedStop, Prediction, PredictionKind, Route, RouteId, ServiceKind, StopId,
    StopWithLocation, UNNAMED_STOP, Vehicle, VehicleId, parse_feed_timestamp,
};

use super::error::ConversionError;
use super::types::{
    AffectedServiceDto, BulletinDto, PatternDto, PatternPointDto, PredictionDto, RouteDto,
    StopDto, VehicleDto,
};

fn parse_f64(field: &'static str, value: &str) -> Result<f64, ConversionError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConversionError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

fn parse_u16(field: &'static str, value: &str) -> Result<u16, ConversionError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConversionError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

fn parse_u32(field: &'static str, value: &str) -> Result<u32, ConversionError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConversionError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

/// The feed encodes booleans as presence of a field; when present the
/// value is normally the string "true". An explicit "false"/"0" is
/// honored, anything else present counts as set.
fn presence_flag(value: Option<&str>) -> bool {
    match value {
        None => false,
        Some(v) => {
            let v = v.trim();
            !(v.is_empty() || v.eq_ignore_ascii_case("false") || v == "0")
        }
    }
}

/// Convert a vehicle record.
pub fn convert_vehicle(dto: &VehicleDto) -> Result<Vehicle, ConversionError> {
    let position = Position::new(
        parse_f64("lat", &dto.lat)?,
        parse_f64("lon", &dto.lon)?,
    )?;

    Ok(Vehicle {
        id: VehicleId::new(dto.vid.clone()),
        last_reported: parse_feed_timestamp("tmstmp", &dto.tmstmp)?,
        position,
        heading: parse_u16("hdg", &dto.hdg)?,
        pattern_id: PatternId::new(dto.pid.clone()),
        trip_distance_ft: parse_f64("pdist", &dto.pdist)?,
        route: RouteId::new(dto.rt.clone()),
        destination: dto.des.clone(),
        speed_mph: parse_u32("spd", &dto.spd)?,
        delayed: presence_flag(dto.dly.as_deref()),
        predictions: OnceCell::new(),
    })
}

/// Convert a route record.
pub fn convert_route(dto: &RouteDto) -> Route {
    Route::new(RouteId::new(dto.rt.clone()), dto.rtnm.clone(), dto.rtclr.clone())
}

/// Convert a stop record from a route's stop listing.
pub fn convert_stop(dto: &StopDto) -> Result<StopWithLocation, ConversionError> {
    let position = Position::new(
        parse_f64("lat", &dto.lat)?,
        parse_f64("lon", &dto.lon)?,
    )?;
    Ok(StopWithLocation::new(
        StopId::new(dto.stpid.clone()),
        dto.stpnm.clone(),
        position,
    ))
}

/// Convert a geographic pattern. Points are ordered by `seq` regardless
/// of feed order.
pub fn convert_pattern(dto: &PatternDto) -> Result<Pattern, ConversionError> {
    let mut points = dto
        .pt
        .iter()
        .map(convert_pattern_point)
        .collect::<Result<Vec<_>, _>>()?;
    points.sort_by_key(|p| p.seq);

    Ok(Pattern {
        id: PatternId::new(dto.pid.clone()),
        length_ft: parse_f64("ln", &dto.ln)?,
        direction: Direction::parse(&dto.rtdir)?,
        points,
    })
}

fn convert_pattern_point(dto: &PatternPointDto) -> Result<PatternPoint, ConversionError> {
    let position = Position::new(
        parse_f64("lat", &dto.lat)?,
        parse_f64("lon", &dto.lon)?,
    )?;

    let kind = match dto.typ.trim() {
        "W" | "w" => PointKind::Waypoint,
        "S" | "s" => {
            let id = dto
                .stpid
                .clone()
                .ok_or(ConversionError::MissingField("stpid"))?;
            let name = dto
                .stpnm
                .clone()
                .unwrap_or_else(|| UNNAMED_STOP.to_string());
            let dist = match &dto.pdist {
                Some(v) => parse_f64("pdist", v)?,
                None => 0.0,
            };
            PointKind::Stop {
                id: StopId::new(id),
                name,
                dist_into_pattern_ft: dist,
            }
        }
        other => {
            return Err(ConversionError::UnexpectedValue {
                field: "typ",
                value: other.to_string(),
            });
        }
    };

    Ok(PatternPoint {
        seq: parse_u32("seq", &dto.seq)?,
        position,
        kind,
    })
}

/// Convert a prediction record.
pub fn convert_prediction(dto: &PredictionDto) -> Result<Prediction, ConversionError> {
    let kind = match dto.typ.trim() {
        "A" | "a" => PredictionKind::Arrival,
        "D" | "d" => PredictionKind::Departure,
        other => {
            return Err(ConversionError::UnexpectedValue {
                field: "typ",
                value: other.to_string(),
            });
        }
    };

    let stop_ref = PredictedStop {
        id: StopId::new(dto.stpid.clone()),
        name: dto
            .stpnm
            .clone()
            .unwrap_or_else(|| UNNAMED_STOP.to_string()),
        feet_to_stop: parse_u32("dstp", &dto.dstp)?,
    };

    Ok(Prediction::new(
        parse_feed_timestamp("tmstmp", &dto.tmstmp)?,
        parse_feed_timestamp("prdtm", &dto.prdtm)?,
        kind,
        presence_flag(dto.dly.as_deref()),
        RouteId::new(dto.rt.clone()),
        Direction::parse(&dto.rtdir)?,
        dto.des.clone(),
        VehicleId::new(dto.vid.clone()),
        stop_ref,
    ))
}

/// Convert a service bulletin. Infallible: every field the feed may omit
/// has a documented default.
pub fn convert_bulletin(dto: &BulletinDto) -> Bulletin {
    let body = [dto.dtl.as_deref(), dto.brf.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("\n");

    let mut affected_stops = Vec::new();
    let mut affected_routes = Vec::new();
    for svc in &dto.srvc {
        classify_affected(svc, &mut affected_stops, &mut affected_routes);
    }

    Bulletin::new(
        dto.nm.clone(),
        dto.sbj.clone(),
        body,
        dto.prty.clone(),
        affected_stops,
        affected_routes,
    )
}

/// One `srvc` record can name a stop, a route, or both at once; each
/// aspect classifies independently.
fn classify_affected(
    svc: &AffectedServiceDto,
    stops: &mut Vec<AffectedService>,
    routes: &mut Vec<AffectedService>,
) {
    if svc.stpid.is_some() || svc.stpnm.is_some() {
        stops.push(AffectedService {
            kind: ServiceKind::Stop,
            id: svc.stpid.clone(),
            name: svc.stpnm.clone(),
        });
    }
    if svc.rt.is_some() || svc.rtdir.is_some() {
        routes.push(AffectedService {
            kind: ServiceKind::Route,
            id: svc.rt.clone(),
            name: svc.rtdir.clone(),
        });
    }
}
