//! Bus stops.

use std::fmt;
use std::hash::{Hash, Hasher};

use super::geo::Position;
use super::ids::StopId;

/// Sentinel name used when the feed cannot supply one. Some call sites
/// only ever see a stop ID, so a nameless stop is a normal condition.
pub const UNNAMED_STOP: &str = "(Unnamed)";

/// A bus stop known only by ID and display name.
///
/// Stops compare by ID; the name is presentation data and takes no part in
/// identity.
#[derive(Debug, Clone)]
pub struct Stop {
    pub id: StopId,
    pub name: String,
}

impl Stop {
    /// Construct a stop, defaulting a missing name to [`UNNAMED_STOP`].
    pub fn new(id: StopId, name: Option<String>) -> Self {
        Self {
            id,
            name: name.unwrap_or_else(|| UNNAMED_STOP.to_string()),
        }
    }

    /// Construct from a bare ID when no richer information is available.
    ///
    /// The API has no stop-by-ID lookup, so this is all a caller gets from
    /// an ID alone; the recommended path to a named stop is through a
    /// route's stop listing.
    pub fn from_id(id: StopId) -> Self {
        Self::new(id, None)
    }
}

impl PartialEq for Stop {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Stop {}

impl Hash for Stop {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Stop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stop #{} {}", self.id, self.name)
    }
}

/// A stop with a resolved geographic position.
///
/// This richer form comes from a route's stop listing or a geographic
/// pattern; it cannot be produced from an ID alone.
#[derive(Debug, Clone)]
pub struct StopWithLocation {
    pub stop: Stop,
    pub position: Position,
}

impl StopWithLocation {
    pub fn new(id: StopId, name: Option<String>, position: Position) -> Self {
        Self {
            stop: Stop::new(id, name),
            position,
        }
    }

    pub fn id(&self) -> &StopId {
        &self.stop.id
    }

    pub fn name(&self) -> &str {
        &self.stop.name
    }
}

impl PartialEq for StopWithLocation {
    fn eq(&self, other: &Self) -> bool {
        self.stop == other.stop
    }
}

impl Eq for StopWithLocation {}

impl fmt::Display for StopWithLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.stop, self.position)
    }
}
