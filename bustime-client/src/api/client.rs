//! BusTime HTTP client.
//!
//! One method per API operation. Invalid parameter combinations are
//! rejected locally, before any network traffic; the transport issues a
//! single GET per call with no internal retries, and a semaphore bounds
//! concurrent requests so a burst of lazy resolutions cannot stampede the
//! call quota.

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use chrono_tz::Tz;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::domain::{
    Bulletin, Direction, Pattern, PatternId, Prediction, Route, RouteId, StopId,
    StopWithLocation, Vehicle, VehicleId, parse_feed_timestamp,
};

use super::convert;
use super::endpoint::{Endpoint, QueryParams, build_url};
use super::envelope::{ResponseFormat, decode};
use super::error::BustimeError;
use super::types::{
    BulletinsBody, DirectionsBody, PatternsBody, PredictionsBody, RoutesBody, StopsBody,
    TimeBody, VehiclesBody,
};

/// Default base URL for the Port Authority BusTime API.
const DEFAULT_BASE_URL: &str = "http://realtime.portauthority.org/bustime/api/v3";

/// Default locale for message text.
const DEFAULT_LOCALE: &str = "en_US";

/// Default time resolution ("s" for seconds, "m" for minutes).
const DEFAULT_TIME_RESOLUTION: &str = "s";

/// Default RTPI data feed name. The deployment hosts several feeds; this
/// is the bus feed.
const DEFAULT_RTPI_DATAFEED: &str = "Port Authority Bus";

/// Default maximum concurrent requests.
const DEFAULT_MAX_CONCURRENT: usize = 5;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Configuration for the BusTime client.
#[derive(Debug, Clone)]
pub struct BustimeConfig {
    /// API key for authentication
    pub api_key: String,
    /// Base URL for the API (defaults to the production deployment)
    pub base_url: String,
    /// Locale for message text
    pub locale: String,
    /// Time resolution of feed timestamps
    pub time_resolution: String,
    /// RTPI data feed name
    pub rtpidatafeed: String,
    /// Wire format to request and decode
    pub format: ResponseFormat,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum concurrent requests
    pub max_concurrent: usize,
}

impl BustimeConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            time_resolution: DEFAULT_TIME_RESOLUTION.to_string(),
            rtpidatafeed: DEFAULT_RTPI_DATAFEED.to_string(),
            format: ResponseFormat::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the message locale.
    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    /// Select the wire format.
    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set maximum concurrent requests.
    pub fn with_max_concurrent(mut self, n: usize) -> Self {
        self.max_concurrent = n;
        self
    }

    /// Set the RTPI data feed name.
    pub fn with_rtpidatafeed(mut self, feed: impl Into<String>) -> Self {
        self.rtpidatafeed = feed.into();
        self
    }
}

/// Vehicle lookup filter: by vehicle IDs or by routes, never both.
#[derive(Debug, Clone, Default)]
pub struct VehicleQuery {
    pub vehicles: Vec<VehicleId>,
    pub routes: Vec<RouteId>,
}

impl VehicleQuery {
    /// Positions of specific vehicles (at most 10).
    pub fn by_ids(ids: impl IntoIterator<Item = VehicleId>) -> Self {
        Self {
            vehicles: ids.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Every vehicle currently on the given routes (at most 10).
    pub fn on_routes(routes: impl IntoIterator<Item = RouteId>) -> Self {
        Self {
            routes: routes.into_iter().collect(),
            ..Self::default()
        }
    }

    fn to_params(&self) -> Result<QueryParams, BustimeError> {
        if self.vehicles.is_empty() && self.routes.is_empty() {
            return Err(BustimeError::InvalidCall(
                "either `vid` or `rt` must be specified".into(),
            ));
        }
        if !self.vehicles.is_empty() && !self.routes.is_empty() {
            return Err(BustimeError::InvalidCall(
                "`vid` and `rt` cannot be specified simultaneously".into(),
            ));
        }
        let mut params = QueryParams::new();
        params.push_list("vid", &self.vehicles)?;
        params.push_list("rt", &self.routes)?;
        Ok(params)
    }
}

/// Prediction lookup filter: by stops (optionally narrowed to routes) or
/// by vehicles, never both.
#[derive(Debug, Clone, Default)]
pub struct PredictionQuery {
    pub stops: Vec<StopId>,
    pub routes: Vec<RouteId>,
    pub vehicles: Vec<VehicleId>,
    /// Limit on the number of predictions returned (`top`)
    pub limit: Option<u32>,
}

impl PredictionQuery {
    /// Predictions for the given stops (at most 10).
    pub fn for_stops(stops: impl IntoIterator<Item = StopId>) -> Self {
        Self {
            stops: stops.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Predictions for the given vehicles (at most 10).
    pub fn for_vehicles(vehicles: impl IntoIterator<Item = VehicleId>) -> Self {
        Self {
            vehicles: vehicles.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Narrow a stop query to specific routes.
    pub fn on_routes(mut self, routes: impl IntoIterator<Item = RouteId>) -> Self {
        self.routes = routes.into_iter().collect();
        self
    }

    /// Cap the number of predictions returned.
    pub fn limit(mut self, n: u32) -> Self {
        self.limit = Some(n);
        self
    }

    fn to_params(&self) -> Result<QueryParams, BustimeError> {
        if self.stops.is_empty() && self.vehicles.is_empty() {
            return Err(BustimeError::InvalidCall(
                "either `stpid` or `vid` must be specified".into(),
            ));
        }
        if !self.vehicles.is_empty() && (!self.stops.is_empty() || !self.routes.is_empty()) {
            return Err(BustimeError::InvalidCall(
                "`vid` cannot be combined with `stpid` or `rt`".into(),
            ));
        }
        if !self.routes.is_empty() && self.stops.is_empty() {
            return Err(BustimeError::InvalidCall(
                "an `rt` filter requires `stpid`".into(),
            ));
        }
        let mut params = QueryParams::new();
        params.push_list("stpid", &self.stops)?;
        params.push_list("rt", &self.routes)?;
        params.push_list("vid", &self.vehicles)?;
        params.push_opt("top", self.limit.map(|n| n.to_string()));
        Ok(params)
    }
}

/// Bulletin lookup filter: by routes (optionally one direction) and/or by
/// stops; at least one of routes or stops is required.
#[derive(Debug, Clone, Default)]
pub struct BulletinQuery {
    pub routes: Vec<RouteId>,
    /// Narrow route bulletins to one direction; requires `routes`
    pub direction: Option<Direction>,
    pub stops: Vec<StopId>,
}

impl BulletinQuery {
    /// Bulletins affecting the given routes (at most 10).
    pub fn for_routes(routes: impl IntoIterator<Item = RouteId>) -> Self {
        Self {
            routes: routes.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Bulletins affecting the given stops (at most 10).
    pub fn for_stops(stops: impl IntoIterator<Item = StopId>) -> Self {
        Self {
            stops: stops.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Narrow route bulletins to one direction.
    pub fn in_direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    fn to_params(&self) -> Result<QueryParams, BustimeError> {
        if self.routes.is_empty() && self.stops.is_empty() {
            return Err(BustimeError::InvalidCall(
                "either `rt` or `stpid` must be specified".into(),
            ));
        }
        if self.direction.is_some() && self.routes.is_empty() {
            return Err(BustimeError::InvalidCall("`rtdir` requires `rt`".into()));
        }
        let mut params = QueryParams::new();
        params.push_list("rt", &self.routes)?;
        params.push_opt("rtdir", self.direction.map(|d| d.as_api_str().to_string()));
        params.push_list("stpid", &self.stops)?;
        Ok(params)
    }
}

/// Pattern lookup filter: one route's patterns or specific pattern IDs.
#[derive(Debug, Clone)]
pub enum PatternQuery {
    ForRoute(RouteId),
    ByIds(Vec<PatternId>),
}

impl PatternQuery {
    /// Every pattern of one route.
    pub fn for_route(route: RouteId) -> Self {
        PatternQuery::ForRoute(route)
    }

    /// Patterns by ID (at most 10).
    pub fn by_ids(ids: impl IntoIterator<Item = PatternId>) -> Self {
        PatternQuery::ByIds(ids.into_iter().collect())
    }

    fn to_params(&self) -> Result<QueryParams, BustimeError> {
        let mut params = QueryParams::new();
        match self {
            PatternQuery::ForRoute(rt) => params.push("rt", rt.as_str()),
            PatternQuery::ByIds(ids) => {
                if ids.is_empty() {
                    return Err(BustimeError::InvalidCall(
                        "either `rt` or `pid` must be specified".into(),
                    ));
                }
                params.push_list("pid", ids)?;
            }
        }
        Ok(params)
    }
}

/// BusTime API client.
#[derive(Debug, Clone)]
pub struct BustimeClient {
    http: reqwest::Client,
    config: BustimeConfig,
    semaphore: Arc<Semaphore>,
}

impl BustimeClient {
    /// Create a new client with the given configuration.
    pub fn new(config: BustimeConfig) -> Result<Self, BustimeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BustimeError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent)),
            config,
        })
    }

    pub fn config(&self) -> &BustimeConfig {
        &self.config
    }

    /// Instance defaults serialized on every request: `key` first, then
    /// the remaining defaults in lexicographic key order.
    fn default_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        params.push("key", self.config.api_key.clone());
        params.push("format", self.config.format.as_param());
        params.push("localestring", self.config.locale.clone());
        params.push("rtpidatafeed", self.config.rtpidatafeed.clone());
        params.push("tmres", self.config.time_resolution.clone());
        params
    }

    fn wrap_reqwest(&self, err: reqwest::Error) -> BustimeError {
        if err.is_timeout() {
            BustimeError::Timeout {
                timeout_secs: self.config.timeout_secs,
            }
        } else {
            BustimeError::Transport(err.to_string())
        }
    }

    /// Issue one GET and decode the envelope into the canonical tree.
    async fn fetch_tree(
        &self,
        endpoint: Endpoint,
        params: &QueryParams,
    ) -> Result<Value, BustimeError> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| BustimeError::Transport("request semaphore closed".into()))?;

        let url = build_url(&self.config.base_url, endpoint, &self.default_params(), params);
        debug!(endpoint = endpoint.path(), "requesting");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| self.wrap_reqwest(e))?;

        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(BustimeError::QuotaExceeded(format!(
                "HTTP 429 from {}",
                endpoint.path()
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BustimeError::Api(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let body = response.text().await.map_err(|e| self.wrap_reqwest(e))?;
        decode(&body, self.config.format)
    }

    fn parse_body<T: DeserializeOwned>(tree: Value) -> Result<T, BustimeError> {
        serde_json::from_value(tree)
            .map_err(|e| BustimeError::Malformed(format!("unexpected response shape: {e}")))
    }

    /// The API's official time (operator-local).
    #[instrument(skip(self))]
    pub async fn system_time(&self) -> Result<DateTime<Tz>, BustimeError> {
        let tree = self.fetch_tree(Endpoint::SystemTime, &QueryParams::new()).await?;
        let body: TimeBody = Self::parse_body(tree)?;
        Ok(parse_feed_timestamp("tm", &body.tm)?)
    }

    /// Vehicle positions by ID or by route.
    ///
    /// Returns an empty list when the API reports no matching live data
    /// (e.g. no vehicles currently on the route).
    #[instrument(skip(self, query))]
    pub async fn vehicles(&self, query: &VehicleQuery) -> Result<Vec<Vehicle>, BustimeError> {
        let params = query.to_params()?;
        let tree = match self.fetch_tree(Endpoint::Vehicles, &params).await {
            Err(e) if e.is_no_data() => return Ok(Vec::new()),
            other => other?,
        };
        let body: VehiclesBody = Self::parse_body(tree)?;
        Ok(convert_all(&body.vehicle, convert::convert_vehicle, "vehicle"))
    }

    /// The full list of routes the system tracks.
    #[instrument(skip(self))]
    pub async fn routes(&self) -> Result<Vec<Route>, BustimeError> {
        let tree = self.fetch_tree(Endpoint::Routes, &QueryParams::new()).await?;
        let body: RoutesBody = Self::parse_body(tree)?;
        Ok(body.route.iter().map(convert::convert_route).collect())
    }

    /// Directions served by a route.
    #[instrument(skip(self))]
    pub async fn route_directions(&self, route: &RouteId) -> Result<Vec<Direction>, BustimeError> {
        let mut params = QueryParams::new();
        params.push("rt", route.as_str());
        let tree = self.fetch_tree(Endpoint::RouteDirections, &params).await?;
        let body: DirectionsBody = Self::parse_body(tree)?;
        Ok(convert_all(&body.dir, |d| Direction::parse(d), "direction"))
    }

    /// Stops served by a route in one direction.
    #[instrument(skip(self))]
    pub async fn stops(
        &self,
        route: &RouteId,
        direction: Direction,
    ) -> Result<Vec<StopWithLocation>, BustimeError> {
        let mut params = QueryParams::new();
        params.push("rt", route.as_str());
        params.push("dir", direction.as_api_str());
        let tree = self.fetch_tree(Endpoint::Stops, &params).await?;
        let body: StopsBody = Self::parse_body(tree)?;
        Ok(convert_all(&body.stop, convert::convert_stop, "stop"))
    }

    /// Geographic patterns by route or by pattern ID.
    #[instrument(skip(self, query))]
    pub async fn patterns(&self, query: &PatternQuery) -> Result<Vec<Pattern>, BustimeError> {
        let params = query.to_params()?;
        let tree = match self.fetch_tree(Endpoint::Patterns, &params).await {
            Err(e) if e.is_no_data() => return Ok(Vec::new()),
            other => other?,
        };
        let body: PatternsBody = Self::parse_body(tree)?;
        Ok(convert_all(&body.ptr, convert::convert_pattern, "pattern"))
    }

    /// Arrival/departure predictions for stops or vehicles.
    ///
    /// "No predictions currently available" is an empty list, not an
    /// error, so pollers can loop without special-casing.
    #[instrument(skip(self, query))]
    pub async fn predictions(
        &self,
        query: &PredictionQuery,
    ) -> Result<Vec<Prediction>, BustimeError> {
        let params = query.to_params()?;
        let tree = match self.fetch_tree(Endpoint::Predictions, &params).await {
            Err(e) if e.is_no_data() => return Ok(Vec::new()),
            other => other?,
        };
        let body: PredictionsBody = Self::parse_body(tree)?;
        Ok(convert_all(&body.prd, convert::convert_prediction, "prediction"))
    }

    /// Service bulletins for routes and/or stops.
    #[instrument(skip(self, query))]
    pub async fn bulletins(&self, query: &BulletinQuery) -> Result<Vec<Bulletin>, BustimeError> {
        let params = query.to_params()?;
        let tree = match self.fetch_tree(Endpoint::Bulletins, &params).await {
            Err(e) if e.is_no_data() => return Ok(Vec::new()),
            other => other?,
        };
        let body: BulletinsBody = Self::parse_body(tree)?;
        Ok(body.sb.iter().map(convert::convert_bulletin).collect())
    }

    pub(crate) fn pattern_params(query: &PatternQuery) -> Result<QueryParams, BustimeError> {
        query.to_params()
    }

    pub(crate) fn bulletin_params(query: &BulletinQuery) -> Result<QueryParams, BustimeError> {
        query.to_params()
    }
}

/// Convert a batch of records, logging and skipping any that fail rather
/// than dropping the whole response.
fn convert_all<D, T, E: std::fmt::Display>(
    dtos: &[D],
    convert: impl Fn(&D) -> Result<T, E>,
    what: &'static str,
) -> Vec<T> {
    dtos.iter()
        .filter_map(|dto| match convert(dto) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("skipping {what} record: {e}");
                None
            }
        })
        .collect()
}
