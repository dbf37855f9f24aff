//! Service bulletins.

use std::fmt;

/// Sentinel for bulletin fields the feed routinely omits. Using a literal
/// `"n/a"` rather than an option mirrors the upstream contract: bulletin
/// IDs are frequently absent and consumers render them as-is.
pub const NA_SENTINEL: &str = "n/a";

/// A service bulletin, usually a detour or other route change notice.
#[derive(Debug, Clone)]
pub struct Bulletin {
    /// Bulletin name/ID; [`NA_SENTINEL`] when the source omits one
    pub id: String,
    pub subject: Option<String>,
    /// Detail and brief text joined by a newline; either may be absent
    /// independently, and both absent yields an empty body
    pub body: String,
    /// Priority (high, medium, low); [`NA_SENTINEL`] when omitted
    pub priority: String,
    affected_stops: Vec<AffectedService>,
    affected_routes: Vec<AffectedService>,
}

impl Bulletin {
    pub fn new(
        id: Option<String>,
        subject: Option<String>,
        body: String,
        priority: Option<String>,
        affected_stops: Vec<AffectedService>,
        affected_routes: Vec<AffectedService>,
    ) -> Self {
        Self {
            id: id.unwrap_or_else(|| NA_SENTINEL.to_string()),
            subject,
            body,
            priority: priority.unwrap_or_else(|| NA_SENTINEL.to_string()),
            affected_stops,
            affected_routes,
        }
    }

    /// Stops this bulletin applies to.
    pub fn affected_stops(&self) -> &[AffectedService] {
        &self.affected_stops
    }

    /// Routes this bulletin applies to.
    pub fn affected_routes(&self) -> &[AffectedService] {
        &self.affected_routes
    }
}

impl fmt::Display for Bulletin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bulletin #{} [{}]: {}",
            self.id,
            self.priority,
            self.subject.as_deref().unwrap_or("(no subject)")
        )
    }
}

/// A service descriptor a bulletin applies to: a type tag plus the ID and
/// name the feed supplied for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffectedService {
    pub kind: ServiceKind,
    pub id: Option<String>,
    pub name: Option<String>,
}

/// Kind of service a bulletin entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Stop,
    Route,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_id_resolves_to_sentinel() {
        let b = Bulletin::new(None, Some("Stop Relocation".into()), String::new(), None, vec![], vec![]);
        assert_eq!(b.id, "n/a");
        assert_eq!(b.priority, "n/a");
    }

    #[test]
    fn supplied_id_is_kept() {
        let b = Bulletin::new(
            Some("Weekly Detours".into()),
            None,
            String::new(),
            Some("low".into()),
            vec![],
            vec![],
        );
        assert_eq!(b.id, "Weekly Detours");
        assert_eq!(b.priority, "low");
    }
}
