//! Check harness library
//!
//! This crate provides the core functionality for:
//! - Recording metrics and service checks emitted by monitoring checks
//! - Matching observations against expected names, tags and counts
//! - Running checks once or twice against a shared store
//! - Include/exclude tag filtering of observed entities
//! - The checks themselves (service state, container metrics)

pub mod assertion;
pub mod checks;
pub mod config;
pub mod driver;
pub mod filter;
pub mod matcher;
pub mod models;
pub mod observability;
pub mod scenario;
pub mod store;

pub use assertion::{
    assert_expectation, evaluate_scenario, AssertionError, AssertionOutcome, Expectation,
    ExpectedKind, ScenarioReport,
};
pub use config::{CheckConfig, ConfigError, InstanceConfig};
pub use driver::{
    AgentCheck, CheckDriver, CheckError, DriverError, DriverState, RunMode, RunSummary,
};
pub use filter::{is_included, FilterError, FilterSet, FilterSpec};
pub use matcher::{matches, TagPattern};
pub use models::*;
pub use observability::{HarnessMetrics, StructuredLogger};
pub use scenario::{run_scenario, NoProvisioning, Provisioner, Scenario, ScenarioError};
pub use store::{MetricSink, ObservationStore, StoreError, StoreSnapshot};
