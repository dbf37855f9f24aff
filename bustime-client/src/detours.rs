//! Detour notice collaborator interface.
//!
//! Detour notices are published on the operator's website, not through
//! the BusTime API, and reach this crate via whatever scraping-based
//! source the embedding application wires in. This module defines only
//! the records and the source trait; the client must keep working when
//! the collaborator is absent or unreachable, which is what
//! [`NoDetourSource`] provides.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::RouteId;

/// Failure of the detour collaborator. Deliberately opaque: the source is
/// an external system with failure modes of its own.
#[derive(Debug, Clone, Error)]
pub enum DetourError {
    /// The source is absent, unreachable, or returned something unusable
    #[error("detour source unavailable: {0}")]
    Unavailable(String),
}

/// A detour notice headline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetourNotice {
    /// Upstream reference ID of the notice
    pub reference_id: String,
    pub title: String,
    /// First day the detour applies, when the source could parse one
    pub start: Option<NaiveDate>,
    /// Last day the detour applies, when the source could parse one
    pub end: Option<NaiveDate>,
}

/// Full detail for one notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetourDetail {
    /// Routes the detour affects
    pub routes: Vec<RouteId>,
    /// Free-text paragraphs as published
    pub text: Vec<String>,
}

/// A source of detour notices.
pub trait DetourSource: Send + Sync {
    /// Current notices for a route. An empty list means no detours.
    fn notices(
        &self,
        route: &RouteId,
    ) -> impl Future<Output = Result<Vec<DetourNotice>, DetourError>> + Send;

    /// Detail for one notice.
    fn detail(
        &self,
        notice: &DetourNotice,
    ) -> impl Future<Output = Result<DetourDetail, DetourError>> + Send;
}

/// The null collaborator: reports no detours for any route.
///
/// Use when no scraper is configured so detour-aware code paths degrade
/// to "no notices" instead of failing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDetourSource;

impl DetourSource for NoDetourSource {
    async fn notices(&self, _route: &RouteId) -> Result<Vec<DetourNotice>, DetourError> {
        Ok(Vec::new())
    }

    async fn detail(&self, notice: &DetourNotice) -> Result<DetourDetail, DetourError> {
        Err(DetourError::Unavailable(format!(
            "no detour source configured (notice {})",
            notice.reference_id
        )))
    }
}
