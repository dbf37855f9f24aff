//! Routes, directions, and the process-wide route registry.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::api::client::{BulletinQuery, PatternQuery, VehicleQuery};
use crate::api::error::{BustimeError, ConversionError};
use crate::cache::CachedBustimeClient;

use super::bulletin::Bulletin;
use super::ids::RouteId;
use super::pattern::Pattern;
use super::stop::StopWithLocation;
use super::vehicle::Vehicle;

/// Travel direction of a route.
///
/// The feed has exactly two: INBOUND is toward downtown, OUTBOUND away
/// from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Inbound,
    Outbound,
}

impl Direction {
    /// The value the API expects in `dir`/`rtdir` parameters.
    pub fn as_api_str(self) -> &'static str {
        match self {
            Direction::Inbound => "INBOUND",
            Direction::Outbound => "OUTBOUND",
        }
    }

    /// Parse a feed direction string, case-insensitively.
    pub fn parse(value: &str) -> Result<Self, ConversionError> {
        match value.trim().to_ascii_uppercase().as_str() {
            "INBOUND" => Ok(Direction::Inbound),
            "OUTBOUND" => Ok(Direction::Outbound),
            _ => Err(ConversionError::UnexpectedValue {
                field: "dir",
                value: value.to_string(),
            }),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// A bus route (e.g. 28X AIRPORT FLYER).
///
/// Routes compare by designator. Directional stop lists and the direction
/// list populate lazily and are then pinned for this instance's lifetime;
/// a caller wanting fresh stop data must obtain a new `Route` instance.
/// Vehicles-on-route is live data and is fetched through on every call.
#[derive(Debug)]
pub struct Route {
    pub designator: RouteId,
    /// Display name (e.g. "AIRPORT FLYER")
    pub name: String,
    /// Map display color, when the feed supplies one
    pub color: Option<String>,

    directions: OnceCell<Arc<Vec<Direction>>>,
    inbound_stops: OnceCell<Arc<Vec<StopWithLocation>>>,
    outbound_stops: OnceCell<Arc<Vec<StopWithLocation>>>,
}

impl Route {
    pub fn new(designator: RouteId, name: String, color: Option<String>) -> Self {
        Self {
            designator,
            name,
            color,
            directions: OnceCell::new(),
            inbound_stops: OnceCell::new(),
            outbound_stops: OnceCell::new(),
        }
    }

    /// Directions this route serves, fetched once per instance.
    pub async fn directions(
        &self,
        api: &CachedBustimeClient,
    ) -> Result<&[Direction], BustimeError> {
        let dirs = self
            .directions
            .get_or_try_init(|| async { api.route_directions(&self.designator).await })
            .await?;
        Ok(dirs.as_slice())
    }

    /// Stops served in one direction.
    ///
    /// Populated lazily, once per direction per instance, and never
    /// refetched afterwards — unlike the whole-response caches, this
    /// per-instance copy has no TTL.
    pub async fn stops(
        &self,
        api: &CachedBustimeClient,
        direction: Direction,
    ) -> Result<&[StopWithLocation], BustimeError> {
        let cell = match direction {
            Direction::Inbound => &self.inbound_stops,
            Direction::Outbound => &self.outbound_stops,
        };
        let stops = cell
            .get_or_try_init(|| async { api.stops(&self.designator, direction).await })
            .await?;
        Ok(stops.as_slice())
    }

    /// Stops for both directions, fetched concurrently.
    pub async fn stops_both_directions(
        &self,
        api: &CachedBustimeClient,
    ) -> Result<(&[StopWithLocation], &[StopWithLocation]), BustimeError> {
        futures::future::try_join(
            self.stops(api, Direction::Inbound),
            self.stops(api, Direction::Outbound),
        )
        .await
    }

    /// Search this route's stops, optionally in one direction, for a
    /// case-insensitive match against stop name or ID.
    pub async fn find_stop(
        &self,
        api: &CachedBustimeClient,
        query: &str,
        direction: Option<Direction>,
    ) -> Result<Vec<StopWithLocation>, BustimeError> {
        let needle = query.to_lowercase();
        let matches = |stop: &StopWithLocation| {
            stop.name().to_lowercase().contains(&needle)
                || stop.id().as_str().to_lowercase().contains(&needle)
        };

        let mut found = Vec::new();
        match direction {
            Some(dir) => {
                found.extend(self.stops(api, dir).await?.iter().filter(|s| matches(s)).cloned());
            }
            None => {
                let (inbound, outbound) = self.stops_both_directions(api).await?;
                found.extend(inbound.iter().filter(|s| matches(s)).cloned());
                found.extend(outbound.iter().filter(|s| matches(s)).cloned());
            }
        }
        Ok(found)
    }

    /// Vehicles currently serving this route. Live data; never cached.
    pub async fn vehicles(&self, api: &CachedBustimeClient) -> Result<Vec<Vehicle>, BustimeError> {
        api.vehicles(&VehicleQuery::on_routes([self.designator.clone()]))
            .await
    }

    /// Service bulletins for this route.
    pub async fn bulletins(
        &self,
        api: &CachedBustimeClient,
    ) -> Result<Arc<Vec<Bulletin>>, BustimeError> {
        api.bulletins(&BulletinQuery::for_routes([self.designator.clone()]))
            .await
    }

    /// Geographic patterns (routings) of this route.
    pub async fn patterns(
        &self,
        api: &CachedBustimeClient,
    ) -> Result<Arc<Vec<Pattern>>, BustimeError> {
        api.patterns(&PatternQuery::for_route(self.designator.clone()))
            .await
    }
}

impl Clone for Route {
    /// Cloning yields a route with the same identity but fresh, unresolved
    /// relationship state. This is the sanctioned way to force
    /// re-resolution of pinned stop lists.
    fn clone(&self) -> Self {
        Self::new(self.designator.clone(), self.name.clone(), self.color.clone())
    }
}

impl PartialEq for Route {
    fn eq(&self, other: &Self) -> bool {
        self.designator == other.designator
    }
}

impl Eq for Route {}

impl Hash for Route {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.designator.hash(state);
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.designator, self.name)
    }
}

/// Index of every route the system tracks, keyed by designator.
///
/// The full route list is fetched at most once per registry lifetime, with
/// concurrent first lookups collapsed into a single fetch. There is no
/// periodic refresh; construct a new registry to re-read the route list.
/// Pass the registry by reference to whatever needs lookup — it owns no
/// global state.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    routes: OnceCell<HashMap<RouteId, Arc<Route>>>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a route by designator.
    ///
    /// `Ok(None)` means the fetch succeeded but no such route exists —
    /// distinct from a transport or API failure.
    pub async fn get(
        &self,
        api: &CachedBustimeClient,
        designator: &RouteId,
    ) -> Result<Option<Arc<Route>>, BustimeError> {
        Ok(self.ensure(api).await?.get(designator).cloned())
    }

    /// Every tracked route, in designator order.
    pub async fn all(&self, api: &CachedBustimeClient) -> Result<Vec<Arc<Route>>, BustimeError> {
        let index = self.ensure(api).await?;
        let mut routes: Vec<Arc<Route>> = index.values().cloned().collect();
        routes.sort_by(|a, b| a.designator.cmp(&b.designator));
        Ok(routes)
    }

    /// Number of tracked routes, fetching the list if needed.
    pub async fn len(&self, api: &CachedBustimeClient) -> Result<usize, BustimeError> {
        Ok(self.ensure(api).await?.len())
    }

    async fn ensure(
        &self,
        api: &CachedBustimeClient,
    ) -> Result<&HashMap<RouteId, Arc<Route>>, BustimeError> {
        self.routes
            .get_or_try_init(|| async {
                let routes = api.routes().await?;
                Ok(routes
                    .iter()
                    .map(|r| (r.designator.clone(), Arc::new(r.clone())))
                    .collect())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_parses_case_insensitively() {
        assert_eq!(Direction::parse("INBOUND").unwrap(), Direction::Inbound);
        assert_eq!(Direction::parse("outbound").unwrap(), Direction::Outbound);
        assert_eq!(Direction::parse(" Inbound ").unwrap(), Direction::Inbound);
        assert!(Direction::parse("SIDEWAYS").is_err());
    }

    #[test]
    fn direction_round_trips_to_api_form() {
        for dir in [Direction::Inbound, Direction::Outbound] {
            assert_eq!(Direction::parse(dir.as_api_str()).unwrap(), dir);
        }
    }

    #[test]
    fn routes_compare_by_designator() {
        let a = Route::new(RouteId::from("28X"), "AIRPORT FLYER".into(), None);
        let b = Route::new(RouteId::from("28X"), "renamed".into(), Some("#b22222".into()));
        let c = Route::new(RouteId::from("61C"), "AIRPORT FLYER".into(), None);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn clone_resets_relationship_state() {
        let route = Route::new(RouteId::from("28X"), "AIRPORT FLYER".into(), None);
        route
            .directions
            .set(Arc::new(vec![Direction::Inbound]))
            .expect("cell starts empty");

        let fresh = route.clone();
        assert_eq!(fresh, route);
        assert!(fresh.directions.get().is_none());
    }

    #[test]
    fn route_display() {
        let route = Route::new(RouteId::from("28X"), "AIRPORT FLYER".into(), None);
        assert_eq!(route.to_string(), "28X AIRPORT FLYER");
    }
}
