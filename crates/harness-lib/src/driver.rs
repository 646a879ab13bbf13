//! Check execution driver
//!
//! Sequences calls into a check and leaves the observations in the store
//! for the assertion engine. Repeated runs never reset the store, which is
//! how accumulation and rate-priming bugs show up in tests.

use crate::config::{CheckConfig, ConfigError, InstanceConfig};
use crate::observability::{HarnessMetrics, StructuredLogger};
use crate::store::{MetricSink, ObservationStore, StoreError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Errors a check instance can return
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Failure talking to the monitored system (connection, query, ...)
    #[error("{context}: {source}")]
    Backend {
        context: String,
        #[source]
        source: anyhow::Error,
    },
}

impl CheckError {
    pub fn backend(context: impl Into<String>, source: anyhow::Error) -> Self {
        CheckError::Backend {
            context: context.into(),
            source,
        }
    }
}

/// A monitoring check under test
#[async_trait]
pub trait AgentCheck: Send + Sync {
    type Instance: InstanceConfig;

    fn name(&self) -> &str;

    /// Run the check once for one instance, emitting into `sink`
    async fn check(&self, instance: &Self::Instance, sink: &dyn MetricSink)
        -> Result<(), CheckError>;
}

/// One failed instance of an invocation
#[derive(Debug)]
pub struct InstanceFailure {
    pub run: u32,
    pub instance: usize,
    pub error: CheckError,
}

impl fmt::Display for InstanceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run {} instance {}: {}", self.run, self.instance, self.error)
    }
}

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("{}: {} instance failure(s): {}", .check, .failures.len(), join_failures(.failures))]
    InstanceFailures {
        check: String,
        failures: Vec<InstanceFailure>,
    },
}

impl DriverError {
    pub fn failures(&self) -> &[InstanceFailure] {
        match self {
            DriverError::InstanceFailures { failures, .. } => failures,
        }
    }
}

fn join_failures(failures: &[InstanceFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Driver lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running,
}

/// What one `run_once`/`run_twice` call did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub runs: u32,
    pub instances_run: usize,
    pub observations_added: usize,
    pub elapsed: Duration,
}

/// Scenario category: a single run, or two runs without reset in between
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    FreshRun,
    RepeatedRun,
}

impl RunMode {
    pub async fn execute<C: AgentCheck>(
        &self,
        driver: &mut CheckDriver<C>,
        config: &CheckConfig<C::Instance>,
    ) -> Result<RunSummary, DriverError> {
        match self {
            RunMode::FreshRun => driver.run_once(config).await,
            RunMode::RepeatedRun => driver.run_twice(config).await,
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::FreshRun => write!(f, "fresh_run"),
            RunMode::RepeatedRun => write!(f, "repeated_run"),
        }
    }
}

/// Runs a check against a shared observation store
pub struct CheckDriver<C: AgentCheck> {
    check: C,
    store: Arc<ObservationStore>,
    state: DriverState,
    runs: u32,
    metrics: HarnessMetrics,
    logger: StructuredLogger,
}

impl<C: AgentCheck> CheckDriver<C> {
    pub fn new(check: C) -> Self {
        Self::with_store(check, Arc::new(ObservationStore::new()))
    }

    pub fn with_store(check: C, store: Arc<ObservationStore>) -> Self {
        let logger = StructuredLogger::new(format!("driver:{}", check.name()));
        Self {
            check,
            store,
            state: DriverState::Idle,
            runs: 0,
            metrics: HarnessMetrics::new(),
            logger,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn store(&self) -> &Arc<ObservationStore> {
        &self.store
    }

    pub fn check(&self) -> &C {
        &self.check
    }

    /// Total runs since the driver was created
    pub fn runs(&self) -> u32 {
        self.runs
    }

    /// Invoke every instance once
    pub async fn run_once(
        &mut self,
        config: &CheckConfig<C::Instance>,
    ) -> Result<RunSummary, DriverError> {
        let (summary, failures) = self.invoke(config).await;
        self.finish(summary, failures)
    }

    /// Invoke every instance twice, keeping the first run's observations
    pub async fn run_twice(
        &mut self,
        config: &CheckConfig<C::Instance>,
    ) -> Result<RunSummary, DriverError> {
        let (first, mut failures) = self.invoke(config).await;
        let (second, more) = self.invoke(config).await;
        failures.extend(more);

        let summary = RunSummary {
            runs: first.runs + second.runs,
            instances_run: first.instances_run + second.instances_run,
            observations_added: first.observations_added + second.observations_added,
            elapsed: first.elapsed + second.elapsed,
        };
        self.finish(summary, failures)
    }

    async fn invoke(
        &mut self,
        config: &CheckConfig<C::Instance>,
    ) -> (RunSummary, Vec<InstanceFailure>) {
        self.state = DriverState::Running;
        self.runs += 1;
        let run = self.runs;
        let start = Instant::now();
        let before = self.store.len();
        let mut failures = Vec::new();

        debug!(check = %self.check.name(), run, "Invoking check");

        for (index, instance) in config.instances.iter().enumerate() {
            if let Err(error) = self.check.check(instance, self.store.as_ref()).await {
                self.logger
                    .log_instance_failure(self.check.name(), index, &error.to_string());
                self.metrics.inc_instance_failures(self.check.name());
                failures.push(InstanceFailure {
                    run,
                    instance: index,
                    error,
                });
            }
        }

        let elapsed = start.elapsed();
        let observations_added = self.store.len().saturating_sub(before);
        self.metrics
            .observe_check_run(self.check.name(), elapsed.as_secs_f64());
        self.metrics.set_observations_recorded(self.store.len() as i64);
        self.logger.log_check_run(
            self.check.name(),
            run,
            config.instances.len(),
            observations_added,
            elapsed.as_millis(),
        );
        self.state = DriverState::Idle;

        (
            RunSummary {
                runs: 1,
                instances_run: config.instances.len(),
                observations_added,
                elapsed,
            },
            failures,
        )
    }

    fn finish(
        &self,
        summary: RunSummary,
        failures: Vec<InstanceFailure>,
    ) -> Result<RunSummary, DriverError> {
        if failures.is_empty() {
            Ok(summary)
        } else {
            Err(DriverError::InstanceFailures {
                check: self.check.name().to_string(),
                failures,
            })
        }
    }
}
