//! Scenario runner with scoped provisioning
//!
//! A scenario provisions the external entities a check should observe
//! (containers, remote hosts), runs the check in a fresh or repeated mode,
//! evaluates its expectations and tears every entity down again, whatever
//! the outcome.

use crate::assertion::{evaluate_scenario, Expectation, ScenarioReport};
use crate::config::CheckConfig;
use crate::driver::{AgentCheck, CheckDriver, DriverError, RunMode};
use crate::observability::{HarnessMetrics, StructuredLogger};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::info;

/// Acquires and releases external resources a scenario depends on
#[async_trait]
pub trait Provisioner: Send + Sync {
    type Spec: fmt::Debug + Send + Sync;
    type Handle: fmt::Display + Send + Sync;

    async fn provision(&self, spec: &Self::Spec) -> anyhow::Result<Self::Handle>;

    async fn teardown(&self, handle: Self::Handle) -> anyhow::Result<()>;
}

/// Provisioner for scenarios that need no external entities
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProvisioning;

#[async_trait]
impl Provisioner for NoProvisioning {
    type Spec = ();
    type Handle = String;

    async fn provision(&self, _spec: &()) -> anyhow::Result<String> {
        Ok(String::new())
    }

    async fn teardown(&self, _handle: String) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to provision {spec}: {source}")]
    Provision {
        spec: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// A named set of expectations and the run mode they are checked under
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub mode: RunMode,
    pub expectations: Vec<Expectation>,
}

impl Scenario {
    pub fn fresh(name: impl Into<String>, expectations: Vec<Expectation>) -> Self {
        Self {
            name: name.into(),
            mode: RunMode::FreshRun,
            expectations,
        }
    }

    pub fn repeated(name: impl Into<String>, expectations: Vec<Expectation>) -> Self {
        Self {
            name: name.into(),
            mode: RunMode::RepeatedRun,
            expectations,
        }
    }
}

/// Provision, run, evaluate, tear down
///
/// The driver's store is reset before the check runs so scenarios never see
/// each other's observations.
pub async fn run_scenario<C, P>(
    driver: &mut CheckDriver<C>,
    provisioner: &P,
    specs: &[P::Spec],
    config: &CheckConfig<C::Instance>,
    scenario: &Scenario,
) -> Result<ScenarioReport, ScenarioError>
where
    C: AgentCheck,
    P: Provisioner,
{
    let logger = StructuredLogger::new(format!("scenario:{}", scenario.name));
    let mut handles = Vec::with_capacity(specs.len());

    for spec in specs {
        match provisioner.provision(spec).await {
            Ok(handle) => {
                info!(scenario = %scenario.name, entity = %handle, "Provisioned entity");
                handles.push(handle);
            }
            Err(source) => {
                teardown_all(provisioner, handles, &logger).await;
                return Err(ScenarioError::Provision {
                    spec: format!("{:?}", spec),
                    source,
                });
            }
        }
    }

    driver.store().reset();
    let run = scenario.mode.execute(driver, config).await;

    let report = match run {
        Ok(_) => {
            let mut report = evaluate_scenario(&scenario.expectations, driver.store());
            report.teardown_errors = teardown_all(provisioner, handles, &logger).await;
            report
        }
        Err(error) => {
            teardown_all(provisioner, handles, &logger).await;
            return Err(error.into());
        }
    };

    logger.log_scenario_report(
        &scenario.name,
        &scenario.mode.to_string(),
        report.outcomes.len(),
        report.failure_count(),
    );
    HarnessMetrics::new().record_scenario(report.failure_count() as u64);

    Ok(report)
}

async fn teardown_all<P: Provisioner>(
    provisioner: &P,
    handles: Vec<P::Handle>,
    logger: &StructuredLogger,
) -> Vec<String> {
    let mut errors = Vec::new();
    // Release in reverse acquisition order
    for handle in handles.into_iter().rev() {
        let label = handle.to_string();
        if let Err(e) = provisioner.teardown(handle).await {
            logger.log_teardown_failure(&label, &e.to_string());
            errors.push(format!("{}: {}", label, e));
        }
    }
    errors
}
