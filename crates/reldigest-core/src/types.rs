use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

/// Stable identifier for one step in a workflow graph.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct StepId(pub String);

impl StepId {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StepId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for StepId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for one workflow invocation.
///
/// Defaults to a value derived from the calendar date so that repeated
/// same-day invocations share session scoping while cross-day invocations
/// do not.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct InvocationId(pub String);

impl InvocationId {
    /// A guaranteed-fresh invocation id.
    pub fn fresh() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: &str) -> Self {
        Self(s.to_string())
    }

    /// The default invocation id for a given calendar date.
    pub fn for_date(date: NaiveDate) -> Self {
        Self(format!("digest-{}", date.format("%Y-%m-%d")))
    }

    pub fn for_today() -> Self {
        Self::for_date(Utc::now().date_naive())
    }
}

impl std::fmt::Display for InvocationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deterministic key scoping an external capability's conversational memory
/// to one step of one invocation on one calendar day.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct SessionKey(String);

impl SessionKey {
    /// Pure derivation — no global state, so concurrent runs cannot
    /// cross-contaminate each other's memory scope.
    pub fn derive(step: &StepId, invocation: &InvocationId, date: NaiveDate) -> Self {
        Self(format!("{}-{}-{}", step, invocation, date.format("%Y-%m-%d")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A target service whose release notes are collected.
///
/// Built once at startup from static configuration; immutable thereafter.
/// The `step_id` doubles as the id of the fetch step for this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub step_id: StepId,
    pub display_name: String,
    pub source_locator: Url,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_key_is_deterministic() {
        let step = StepId::from("releaseFetchCline");
        let invocation = InvocationId::from_string("digest-2025-05-15");
        let date = NaiveDate::from_ymd_opt(2025, 5, 15).unwrap();

        let a = SessionKey::derive(&step, &invocation, date);
        let b = SessionKey::derive(&step, &invocation, date);
        assert_eq!(a, b);
        assert_eq!(
            a.as_str(),
            "releaseFetchCline-digest-2025-05-15-2025-05-15"
        );
    }

    #[test]
    fn test_session_key_differs_across_days() {
        let step = StepId::from("summarize");
        let invocation = InvocationId::from_string("manual");
        let monday = NaiveDate::from_ymd_opt(2025, 5, 12).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2025, 5, 13).unwrap();

        assert_ne!(
            SessionKey::derive(&step, &invocation, monday),
            SessionKey::derive(&step, &invocation, tuesday)
        );
    }

    #[test]
    fn test_session_key_differs_across_steps_and_invocations() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 15).unwrap();
        let inv = InvocationId::from_string("a");

        assert_ne!(
            SessionKey::derive(&StepId::from("x"), &inv, date),
            SessionKey::derive(&StepId::from("y"), &inv, date)
        );
        assert_ne!(
            SessionKey::derive(&StepId::from("x"), &inv, date),
            SessionKey::derive(&StepId::from("x"), &InvocationId::from_string("b"), date)
        );
    }

    #[test]
    fn test_invocation_id_for_date() {
        let date = NaiveDate::from_ymd_opt(2025, 5, 15).unwrap();
        assert_eq!(InvocationId::for_date(date).0, "digest-2025-05-15");
    }

    #[test]
    fn test_fresh_invocation_ids_are_unique() {
        assert_ne!(InvocationId::fresh(), InvocationId::fresh());
    }
}
