//! GeoJSON export for geographic patterns.
//!
//! Pure format conversion: a [`Pattern`] becomes a `FeatureCollection`
//! with one Point feature per pattern point. No state, no caching.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};

use crate::domain::{Pattern, PatternPoint, PointKind};

/// Convert a pattern into a GeoJSON `FeatureCollection`.
///
/// Each point becomes a Point feature tagged `waypoint` or `stop`; stop
/// features additionally carry the stop's id, name, and distance into the
/// route. Pattern-level data (`pid`, `length`, `direction`) rides on the
/// collection's foreign members.
pub fn pattern_to_geojson(pattern: &Pattern) -> FeatureCollection {
    let features = pattern.points.iter().map(point_to_feature).collect();

    let mut members = JsonObject::new();
    members.insert("pid".to_string(), serde_json::json!(pattern.id.as_str()));
    members.insert("length".to_string(), serde_json::json!(pattern.length_ft));
    members.insert(
        "direction".to_string(),
        serde_json::json!(pattern.direction.as_api_str()),
    );

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(members),
    }
}

fn point_to_feature(point: &PatternPoint) -> Feature {
    // GeoJSON positions are (longitude, latitude)
    let geometry = Geometry::new(Value::Point(vec![
        point.position.longitude,
        point.position.latitude,
    ]));

    let mut properties = JsonObject::new();
    properties.insert("i".to_string(), serde_json::json!(point.seq));

    match &point.kind {
        PointKind::Waypoint => {
            properties.insert("type".to_string(), serde_json::json!("waypoint"));
        }
        PointKind::Stop {
            id,
            name,
            dist_into_pattern_ft,
        } => {
            properties.insert("type".to_string(), serde_json::json!("stop"));
            properties.insert("id".to_string(), serde_json::json!(id.as_str()));
            properties.insert("name".to_string(), serde_json::json!(name));
            properties.insert(
                "dist_into_route".to_string(),
                serde_json::json!(dist_into_pattern_ft),
            );
        }
    }

    Feature {
        bbox: None,
        geometry: Some(geometry),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}
