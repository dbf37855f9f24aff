//! Geographic patterns (routings).
//!
//! A pattern is the ordered set of geographic points that make up one
//! routing of a bus route; a route can have several.

use super::geo::Position;
use super::ids::{PatternId, StopId};
use super::route::Direction;

/// One routing of a bus route.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub id: PatternId,
    /// Total pattern length in feet
    pub length_ft: f64,
    /// Route direction this pattern serves
    pub direction: Direction,
    /// Points in `seq` order
    pub points: Vec<PatternPoint>,
}

impl Pattern {
    /// The stop points of this pattern, in sequence order.
    pub fn stop_points(&self) -> impl Iterator<Item = &PatternPoint> {
        self.points.iter().filter(|p| p.is_stop())
    }
}

/// A single point along a pattern.
#[derive(Debug, Clone)]
pub struct PatternPoint {
    /// Position of this point within the pattern
    pub seq: u32,
    pub position: Position,
    pub kind: PointKind,
}

impl PatternPoint {
    pub fn is_stop(&self) -> bool {
        matches!(self.kind, PointKind::Stop { .. })
    }
}

/// What a pattern point represents.
#[derive(Debug, Clone)]
pub enum PointKind {
    /// A shape waypoint with no passenger significance
    Waypoint,
    /// A served stop
    Stop {
        id: StopId,
        name: String,
        /// Feet into the pattern at which the stop sits
        dist_into_pattern_ft: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waypoint(seq: u32) -> PatternPoint {
        PatternPoint {
            seq,
            position: Position::new(40.449, -79.983).unwrap(),
            kind: PointKind::Waypoint,
        }
    }

    fn stop_point(seq: u32, id: &str) -> PatternPoint {
        PatternPoint {
            seq,
            position: Position::new(40.450, -79.984).unwrap(),
            kind: PointKind::Stop {
                id: StopId::from(id),
                name: "Test Ave FS".into(),
                dist_into_pattern_ft: 42.4,
            },
        }
    }

    #[test]
    fn stop_points_filters_waypoints() {
        let pattern = Pattern {
            id: PatternId::from("2250"),
            length_ft: 52712.0,
            direction: Direction::Outbound,
            points: vec![waypoint(1), stop_point(2, "1"), waypoint(3), stop_point(4, "2")],
        };

        let stops: Vec<_> = pattern.stop_points().collect();
        assert_eq!(stops.len(), 2);
        assert!(stops.iter().all(|p| p.is_stop()));
    }
}
