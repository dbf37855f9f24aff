//! Caching layer for BusTime API responses.
//!
//! The API enforces a daily call quota, so the read-mostly endpoints
//! (route list, directions, per-route stop lists, geographic patterns,
//! service bulletins) each get a whole-response cache with its own
//! capacity and time-to-live, tuned to how often the underlying data
//! actually changes. Vehicle positions and predictions are live data and
//! are never cached here.
//!
//! Lookups go through moka's `try_get_with`, which bounds the cache by
//! LRU capacity plus absolute TTL and collapses concurrent misses on the
//! same key into a single underlying fetch. A failed or timed-out load is
//! not stored, and its flight group is released, so subsequent callers
//! retry instead of hanging on a dead slot.

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use chrono_tz::Tz;
use moka::future::Cache as MokaCache;

use crate::api::client::{
    BulletinQuery, BustimeClient, PatternQuery, PredictionQuery, VehicleQuery,
};
use crate::api::error::BustimeError;
use crate::domain::{
    Bulletin, Direction, Pattern, Prediction, Route, RouteId, StopWithLocation, Vehicle,
};

/// Capacity and TTL for one endpoint cache.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    pub ttl: Duration,
    pub max_capacity: u64,
}

impl CachePolicy {
    pub const fn new(ttl: Duration, max_capacity: u64) -> Self {
        Self { ttl, max_capacity }
    }
}

/// Per-endpoint cache policies.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// The route list: one entry, changes on service picks only.
    pub routes: CachePolicy,
    /// Directions per route.
    pub directions: CachePolicy,
    /// Stop list per (route, direction).
    pub stops: CachePolicy,
    /// Patterns per query.
    pub patterns: CachePolicy,
    /// Bulletins per query; these actually change during the day.
    pub bulletins: CachePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            routes: CachePolicy::new(Duration::from_secs(6 * 60 * 60), 4),
            directions: CachePolicy::new(Duration::from_secs(6 * 60 * 60), 512),
            stops: CachePolicy::new(Duration::from_secs(6 * 60 * 60), 512),
            patterns: CachePolicy::new(Duration::from_secs(6 * 60 * 60), 256),
            bulletins: CachePolicy::new(Duration::from_secs(10 * 60), 128),
        }
    }
}

fn build_cache<K, V>(policy: &CachePolicy) -> MokaCache<K, V>
where
    K: std::hash::Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    MokaCache::builder()
        .time_to_live(policy.ttl)
        .max_capacity(policy.max_capacity)
        .build()
}

/// BusTime client with whole-response caching for read-mostly endpoints.
///
/// This is the handle domain entities resolve their lazy relationships
/// through; live endpoints pass straight through to the underlying
/// [`BustimeClient`].
#[derive(Debug)]
pub struct CachedBustimeClient {
    client: BustimeClient,
    routes: MokaCache<(), Arc<Vec<Route>>>,
    directions: MokaCache<RouteId, Arc<Vec<Direction>>>,
    stops: MokaCache<(RouteId, Direction), Arc<Vec<StopWithLocation>>>,
    patterns: MokaCache<String, Arc<Vec<Pattern>>>,
    bulletins: MokaCache<String, Arc<Vec<Bulletin>>>,
}

impl CachedBustimeClient {
    /// Create a new cached client.
    pub fn new(client: BustimeClient, config: &CacheConfig) -> Self {
        Self {
            client,
            routes: build_cache(&config.routes),
            directions: build_cache(&config.directions),
            stops: build_cache(&config.stops),
            patterns: build_cache(&config.patterns),
            bulletins: build_cache(&config.bulletins),
        }
    }

    /// The underlying client, for operations that bypass the cache.
    pub fn client(&self) -> &BustimeClient {
        &self.client
    }

    /// Passthrough: the API's official time.
    pub async fn system_time(&self) -> Result<DateTime<Tz>, BustimeError> {
        self.client.system_time().await
    }

    /// Passthrough: vehicle positions are live data and never cached.
    pub async fn vehicles(&self, query: &VehicleQuery) -> Result<Vec<Vehicle>, BustimeError> {
        self.client.vehicles(query).await
    }

    /// Passthrough: predictions are live data and never cached.
    pub async fn predictions(
        &self,
        query: &PredictionQuery,
    ) -> Result<Vec<Prediction>, BustimeError> {
        self.client.predictions(query).await
    }

    /// The route list, fetched at most once per TTL window.
    pub async fn routes(&self) -> Result<Arc<Vec<Route>>, BustimeError> {
        self.routes
            .try_get_with((), async { self.client.routes().await.map(Arc::new) })
            .await
            .map_err(share)
    }

    /// Directions for a route.
    pub async fn route_directions(
        &self,
        route: &RouteId,
    ) -> Result<Arc<Vec<Direction>>, BustimeError> {
        self.directions
            .try_get_with(route.clone(), async {
                self.client.route_directions(route).await.map(Arc::new)
            })
            .await
            .map_err(share)
    }

    /// Stop list for a route in one direction.
    pub async fn stops(
        &self,
        route: &RouteId,
        direction: Direction,
    ) -> Result<Arc<Vec<StopWithLocation>>, BustimeError> {
        self.stops
            .try_get_with((route.clone(), direction), async {
                self.client.stops(route, direction).await.map(Arc::new)
            })
            .await
            .map_err(share)
    }

    /// Geographic patterns. The lookup key is the canonical call-parameter
    /// string, so invalid queries fail before touching the cache.
    pub async fn patterns(&self, query: &PatternQuery) -> Result<Arc<Vec<Pattern>>, BustimeError> {
        let key = BustimeClient::pattern_params(query)?.canonical();
        self.patterns
            .try_get_with(key, async { self.client.patterns(query).await.map(Arc::new) })
            .await
            .map_err(share)
    }

    /// Service bulletins, keyed like [`Self::patterns`].
    pub async fn bulletins(
        &self,
        query: &BulletinQuery,
    ) -> Result<Arc<Vec<Bulletin>>, BustimeError> {
        let key = BustimeClient::bulletin_params(query)?.canonical();
        self.bulletins
            .try_get_with(key, async { self.client.bulletins(query).await.map(Arc::new) })
            .await
            .map_err(share)
    }

    /// Drop every cached response.
    pub fn invalidate_all(&self) {
        self.routes.invalidate_all();
        self.directions.invalidate_all();
        self.stops.invalidate_all();
        self.patterns.invalidate_all();
        self.bulletins.invalidate_all();
    }

    /// Total cached entries across all endpoint caches (for monitoring).
    pub fn entry_count(&self) -> u64 {
        self.routes.entry_count()
            + self.directions.entry_count()
            + self.stops.entry_count()
            + self.patterns.entry_count()
            + self.bulletins.entry_count()
    }
}

/// A load failure is delivered to every single-flight waiter as a shared
/// error; unwrap it back into an owned value.
fn share(err: Arc<BustimeError>) -> BustimeError {
    (*err).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::client::BustimeConfig;

    fn cached_client() -> CachedBustimeClient {
        let client = BustimeClient::new(BustimeConfig::new("test-key")).unwrap();
        CachedBustimeClient::new(client, &CacheConfig::default())
    }

    #[test]
    fn default_policies_reflect_change_frequency() {
        let config = CacheConfig::default();
        // Bulletins churn during the day; route topology does not.
        assert!(config.bulletins.ttl < config.routes.ttl);
        assert!(config.bulletins.ttl < config.patterns.ttl);
        assert_eq!(config.routes.max_capacity, 4);
    }

    #[test]
    fn cache_starts_empty() {
        assert_eq!(cached_client().entry_count(), 0);
    }

    #[tokio::test]
    async fn invalid_query_fails_before_cache() {
        let cached = cached_client();
        let err = cached.patterns(&PatternQuery::by_ids([])).await.unwrap_err();
        assert!(matches!(err, BustimeError::InvalidCall(_)));
        assert_eq!(cached.entry_count(), 0);
    }
}
