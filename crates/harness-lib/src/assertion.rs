//! Metric assertion engine
//!
//! Evaluates expectations against an [`ObservationStore`]. A scenario runs
//! every expectation against the same store and keeps every failure, so a
//! test author sees all tag mismatches from one run.

use crate::matcher::{matches, TagPattern};
use crate::models::{CheckStatus, ObservationKind, TagSet};
use crate::store::ObservationStore;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum distinct tag sets reported per failing expectation
pub const MAX_SAMPLE_TAG_SETS: usize = 20;

/// Which kind of observation an expectation looks at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedKind {
    #[default]
    Metric,
    ServiceCheck,
}

impl ExpectedKind {
    fn accepts(&self, kind: &ObservationKind) -> bool {
        match self {
            ExpectedKind::Metric => kind.is_metric(),
            ExpectedKind::ServiceCheck => matches!(kind, ObservationKind::ServiceCheck),
        }
    }
}

fn default_min_count() -> usize {
    1
}

/// An expected (name, tags, count) triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
    #[serde(default)]
    pub kind: ExpectedKind,
    pub name: String,
    #[serde(default)]
    pub pattern: TagPattern,
    #[serde(default = "default_min_count")]
    pub min_count: usize,
    #[serde(default)]
    pub exact: bool,
    /// Required status, service checks only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CheckStatus>,
}

impl Expectation {
    /// Expect at least one metric named `name`, any tags
    pub fn metric(name: impl Into<String>) -> Self {
        Self {
            kind: ExpectedKind::Metric,
            name: name.into(),
            pattern: TagPattern::Unspecified,
            min_count: 1,
            exact: false,
            status: None,
        }
    }

    /// Expect at least one service check named `name`, any tags or status
    pub fn service_check(name: impl Into<String>) -> Self {
        Self {
            kind: ExpectedKind::ServiceCheck,
            ..Self::metric(name)
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pattern = TagPattern::required(tags);
        self
    }

    pub fn with_pattern(mut self, pattern: TagPattern) -> Self {
        self.pattern = pattern;
        self
    }

    pub fn with_status(mut self, status: CheckStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn at_least(mut self, count: usize) -> Self {
        self.min_count = count;
        self.exact = false;
        self
    }

    pub fn exactly(mut self, count: usize) -> Self {
        self.min_count = count;
        self.exact = true;
        self
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            ExpectedKind::Metric => "metric",
            ExpectedKind::ServiceCheck => "service check",
        };
        let count = if self.exact { "exactly" } else { "at least" };
        write!(f, "{} {} {} {}", kind, self.name, count, self.min_count)?;
        if let TagPattern::RequiredSet(tags) = &self.pattern {
            write!(f, " with tags {}", tags)?;
        }
        if let Some(status) = self.status {
            write!(f, " with status {}", status)?;
        }
        Ok(())
    }
}

/// Result of evaluating one expectation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssertionOutcome {
    pub expectation: Expectation,
    pub ok: bool,
    pub matched_count: usize,
    /// Distinct tag sets observed under the expectation's name
    pub sample_tag_sets: Vec<TagSet>,
}

impl fmt::Display for AssertionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected {}, matched {}",
            self.expectation, self.matched_count
        )?;
        if self.sample_tag_sets.is_empty() {
            write!(f, "; nothing named {} was emitted", self.expectation.name)
        } else {
            write!(f, "; observed tag sets:")?;
            for tags in &self.sample_tag_sets {
                write!(f, "\n    {}", tags)?;
            }
            Ok(())
        }
    }
}

/// Evaluate a single expectation against the store
pub fn assert_expectation(expectation: &Expectation, store: &ObservationStore) -> AssertionOutcome {
    let candidates: Vec<_> = store
        .query_by_name(&expectation.name)
        .into_iter()
        .filter(|o| expectation.kind.accepts(&o.kind))
        .collect();

    let matched_count = candidates
        .iter()
        .filter(|o| matches(&o.tags, &expectation.pattern))
        .filter(|o| expectation.status.map_or(true, |s| o.status == Some(s)))
        .count();

    let ok = if expectation.exact {
        matched_count == expectation.min_count
    } else {
        matched_count >= expectation.min_count
    };

    let mut sample_tag_sets: Vec<TagSet> = Vec::new();
    for observation in &candidates {
        if sample_tag_sets.len() >= MAX_SAMPLE_TAG_SETS {
            break;
        }
        if !sample_tag_sets.contains(&observation.tags) {
            sample_tag_sets.push(observation.tags.clone());
        }
    }

    AssertionOutcome {
        expectation: expectation.clone(),
        ok,
        matched_count,
        sample_tag_sets,
    }
}

/// Evaluate every expectation against one store snapshot
pub fn evaluate_scenario(expectations: &[Expectation], store: &ObservationStore) -> ScenarioReport {
    ScenarioReport {
        outcomes: expectations
            .iter()
            .map(|e| assert_expectation(e, store))
            .collect(),
        teardown_errors: Vec::new(),
    }
}

/// Aggregated outcome of a scenario
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub outcomes: Vec<AssertionOutcome>,
    /// Teardown failures reported by the scenario runner
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub teardown_errors: Vec<String>,
}

impl ScenarioReport {
    pub fn failures(&self) -> impl Iterator<Item = &AssertionOutcome> {
        self.outcomes.iter().filter(|o| !o.ok)
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    /// Turn the report into an error listing every failed expectation
    pub fn into_result(self) -> Result<ScenarioReport, AssertionError> {
        if self.is_success() {
            return Ok(self);
        }
        let details = self
            .failures()
            .map(|f| format!("  - {}", f))
            .collect::<Vec<_>>()
            .join("\n");
        Err(AssertionError::Failed {
            failed: self.failure_count(),
            total: self.outcomes.len(),
            details,
        })
    }
}

#[derive(Debug, Error)]
pub enum AssertionError {
    #[error("{failed} of {total} expectations failed:\n{details}")]
    Failed {
        failed: usize,
        total: usize,
        details: String,
    },
}
