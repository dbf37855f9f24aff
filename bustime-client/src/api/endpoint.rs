//! Endpoint identifiers and canonical request-target construction.
//!
//! The BusTime API takes every argument as a query parameter. The rules
//! here are the ones the server actually cares about, plus determinism for
//! our own tests: absent values are omitted entirely, list-like values are
//! flattened to comma-joined strings (at most [`MAX_IDS`] entries), and the
//! serialized parameter order is stable for a given input.

use std::fmt::Display;

use url::form_urlencoded;

use super::error::BustimeError;

/// Maximum number of IDs the API accepts in one comma-joined filter.
pub const MAX_IDS: usize = 10;

/// A logical BusTime API operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    SystemTime,
    Vehicles,
    Routes,
    RouteDirections,
    Stops,
    Patterns,
    Predictions,
    Bulletins,
}

impl Endpoint {
    /// Path segment under the API base URL.
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::SystemTime => "gettime",
            Endpoint::Vehicles => "getvehicles",
            Endpoint::Routes => "getroutes",
            Endpoint::RouteDirections => "getdirections",
            Endpoint::Stops => "getstops",
            Endpoint::Patterns => "getpatterns",
            Endpoint::Predictions => "getpredictions",
            Endpoint::Bulletins => "getservicebulletins",
        }
    }
}

/// An ordered set of query parameters.
///
/// `push_*` methods implement the omission and flattening rules; the pair
/// order is preserved as inserted, so callers control grouping (the client
/// keeps `key` first, then its instance defaults, then sorted call
/// parameters).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(&'static str, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single required parameter.
    pub fn push(&mut self, key: &'static str, value: impl Into<String>) {
        self.pairs.push((key, value.into()));
    }

    /// Append a parameter if the value is present; absent values are
    /// omitted from the serialized form entirely.
    pub fn push_opt(&mut self, key: &'static str, value: Option<impl Into<String>>) {
        if let Some(v) = value {
            self.pairs.push((key, v.into()));
        }
    }

    /// Flatten a list-like value to a comma-joined string.
    ///
    /// An empty slice is treated as absent. More than [`MAX_IDS`] entries
    /// is an invalid call, rejected before any request is built.
    pub fn push_list<T: Display>(
        &mut self,
        key: &'static str,
        values: &[T],
    ) -> Result<(), BustimeError> {
        if values.is_empty() {
            return Ok(());
        }
        if values.len() > MAX_IDS {
            return Err(BustimeError::InvalidCall(format!(
                "at most {MAX_IDS} `{key}` values per call, got {}",
                values.len()
            )));
        }
        let joined = values
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        self.pairs.push((key, joined));
        Ok(())
    }

    /// Sort pairs by key. Call parameters are sorted before serialization;
    /// instance defaults keep their insertion order.
    pub fn sort(&mut self) {
        self.pairs.sort_by(|a, b| a.0.cmp(b.0));
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The canonical `k=v&...` form of these parameters alone, without any
    /// authentication key. Used as a cache lookup key.
    pub fn canonical(&self) -> String {
        let mut sorted = self.clone();
        sorted.sort();
        let mut ser = form_urlencoded::Serializer::new(String::new());
        for (k, v) in &sorted.pairs {
            ser.append_pair(k, v);
        }
        ser.finish()
    }

    fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }
}

/// Construct the full request target for an endpoint.
///
/// `defaults` (the authentication key and per-client options) are
/// serialized first, in insertion order; `params` are sorted by key so the
/// output is deterministic regardless of how the call assembled them.
pub fn build_url(base: &str, endpoint: Endpoint, defaults: &QueryParams, params: &QueryParams) -> String {
    let mut sorted = params.clone();
    sorted.sort();

    let mut ser = form_urlencoded::Serializer::new(String::new());
    for (k, v) in defaults.pairs() {
        ser.append_pair(k, v);
    }
    for (k, v) in sorted.pairs() {
        ser.append_pair(k, v);
    }

    format!("{}/{}?{}", base.trim_end_matches('/'), endpoint.path(), ser.finish())
}
