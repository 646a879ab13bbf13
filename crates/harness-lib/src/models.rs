//! Core data models for the check harness

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Status reported by a service check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl CheckStatus {
    /// Numeric code used by the agent wire format
    pub fn code(&self) -> u8 {
        match self {
            CheckStatus::Ok => 0,
            CheckStatus::Warning => 1,
            CheckStatus::Critical => 2,
            CheckStatus::Unknown => 3,
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Ok => write!(f, "OK"),
            CheckStatus::Warning => write!(f, "WARNING"),
            CheckStatus::Critical => write!(f, "CRITICAL"),
            CheckStatus::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// How a metric value is aggregated downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Point-in-time value, restated on every run
    Gauge,
    /// Per-second rate derived from a monotonic counter
    Rate,
    /// Delta accumulated over the run
    Count,
}

impl fmt::Display for MetricType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricType::Gauge => write!(f, "gauge"),
            MetricType::Rate => write!(f, "rate"),
            MetricType::Count => write!(f, "count"),
        }
    }
}

/// Kind of an emitted observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationKind {
    Metric(MetricType),
    ServiceCheck,
}

impl ObservationKind {
    pub fn is_metric(&self) -> bool {
        matches!(self, ObservationKind::Metric(_))
    }
}

/// Unordered set of `key:value` style tags
///
/// Backed by a `BTreeSet` so two tag sets built from the same tags in a
/// different order compare, display and serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet(BTreeSet<String>);

impl TagSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        self.0.insert(tag.into())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// True when every tag of `self` is present in `other`
    pub fn is_subset(&self, other: &TagSet) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S: Into<String>> Extend<S> for TagSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, tag) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", tag)?;
        }
        write!(f, "]")
    }
}

/// A single metric or service check emitted by a check run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub kind: ObservationKind,
    pub name: String,
    pub tags: TagSet,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CheckStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Logical timestamp assigned by the store at record time
    #[serde(default)]
    pub sequence: u64,
}

impl Observation {
    pub fn metric(
        metric_type: MetricType,
        name: impl Into<String>,
        value: f64,
        tags: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            kind: ObservationKind::Metric(metric_type),
            name: name.into(),
            tags: tags.into_iter().collect(),
            value,
            status: None,
            message: None,
            sequence: 0,
        }
    }

    pub fn service_check(
        name: impl Into<String>,
        status: CheckStatus,
        tags: impl IntoIterator<Item = impl Into<String>>,
        message: Option<String>,
    ) -> Self {
        Self {
            kind: ObservationKind::ServiceCheck,
            name: name.into(),
            tags: tags.into_iter().collect(),
            value: f64::from(status.code()),
            status: Some(status),
            message,
            sequence: 0,
        }
    }
}
