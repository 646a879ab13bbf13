//! Observation store and the emission boundary checks write into
//!
//! The store is an append-only log. Every observation gets a logical
//! sequence number at record time; queries return observations in that
//! order so count assertions reproduce across repeated runs.

use crate::models::{CheckStatus, MetricType, Observation, ObservationKind, TagSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors raised when recording an observation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("observation has no name")]
    MissingName,
}

/// Emission boundary used by checks
///
/// A check only ever sees this trait, never the store type, so the same
/// check can emit into a test store or a forwarding sink.
pub trait MetricSink: Send + Sync {
    fn emit_metric(
        &self,
        metric_type: MetricType,
        name: &str,
        value: f64,
        tags: &[String],
    ) -> Result<(), StoreError>;

    fn emit_service_check(
        &self,
        name: &str,
        status: CheckStatus,
        tags: &[String],
        message: Option<&str>,
    ) -> Result<(), StoreError>;

    /// Record a non-fatal warning for the current run
    fn warning(&self, message: String);

    fn gauge(&self, name: &str, value: f64, tags: &[String]) -> Result<(), StoreError> {
        self.emit_metric(MetricType::Gauge, name, value, tags)
    }

    fn rate(&self, name: &str, value: f64, tags: &[String]) -> Result<(), StoreError> {
        self.emit_metric(MetricType::Rate, name, value, tags)
    }

    fn count(&self, name: &str, value: f64, tags: &[String]) -> Result<(), StoreError> {
        self.emit_metric(MetricType::Count, name, value, tags)
    }
}

/// Serializable copy of the store contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub observations: Vec<Observation>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

#[derive(Debug, Default)]
struct StoreInner {
    observations: Vec<Observation>,
    /// name -> positions in `observations`
    by_name: HashMap<String, Vec<usize>>,
    warnings: Vec<String>,
    next_sequence: u64,
}

impl StoreInner {
    fn push(&mut self, mut observation: Observation) {
        observation.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.by_name
            .entry(observation.name.clone())
            .or_default()
            .push(self.observations.len());
        self.observations.push(observation);
    }
}

/// Append-only log of observations emitted during check runs
#[derive(Debug, Default)]
pub struct ObservationStore {
    inner: RwLock<StoreInner>,
}

impl ObservationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from previously recorded observations, keeping their order
    pub fn from_observations(
        observations: impl IntoIterator<Item = Observation>,
    ) -> Result<Self, StoreError> {
        let store = Self::new();
        for observation in observations {
            store.record(observation)?;
        }
        Ok(store)
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append an observation, assigning its sequence number
    pub fn record(&self, observation: Observation) -> Result<(), StoreError> {
        if observation.name.trim().is_empty() {
            return Err(StoreError::MissingName);
        }
        debug!(
            name = %observation.name,
            tags = %observation.tags,
            value = observation.value,
            "Recording observation"
        );
        self.write().push(observation);
        Ok(())
    }

    /// All observations with `name`, in recording order
    pub fn query_by_name(&self, name: &str) -> Vec<Observation> {
        let inner = self.read();
        inner
            .by_name
            .get(name)
            .map(|positions| {
                positions
                    .iter()
                    .map(|&i| inner.observations[i].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Distinct observation names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().by_name.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn warnings(&self) -> Vec<String> {
        self.read().warnings.clone()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        let inner = self.read();
        StoreSnapshot {
            observations: inner.observations.clone(),
            warnings: inner.warnings.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.read().observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().observations.is_empty()
    }

    /// Clear all observations and warnings
    ///
    /// Only called between scenarios. Repeated runs of one scenario
    /// accumulate into the same store.
    pub fn reset(&self) {
        let mut inner = self.write();
        let dropped = inner.observations.len();
        *inner = StoreInner::default();
        debug!(dropped, "Observation store reset");
    }
}

impl MetricSink for ObservationStore {
    fn emit_metric(
        &self,
        metric_type: MetricType,
        name: &str,
        value: f64,
        tags: &[String],
    ) -> Result<(), StoreError> {
        self.record(Observation {
            kind: ObservationKind::Metric(metric_type),
            name: name.to_string(),
            tags: tags.iter().cloned().collect::<TagSet>(),
            value,
            status: None,
            message: None,
            sequence: 0,
        })
    }

    fn emit_service_check(
        &self,
        name: &str,
        status: CheckStatus,
        tags: &[String],
        message: Option<&str>,
    ) -> Result<(), StoreError> {
        self.record(Observation::service_check(
            name,
            status,
            tags.iter().cloned(),
            message.map(str::to_string),
        ))
    }

    fn warning(&self, message: String) {
        warn!(warning = %message, "Check warning");
        self.write().warnings.push(message);
    }
}
