//! Check execution commands

use anyhow::{Context, Result};
use harness_lib::checks::{
    ContainerCheck, ContainerInstance, StaticContainerRuntime, StaticServiceManager,
    WindowsServiceCheck, WindowsServiceInstance,
};
use harness_lib::{AgentCheck, CheckConfig, CheckDriver, InstanceConfig, RunMode};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::output::{print_info, print_table, print_warning, OutputFormat, ObservationRow};

/// Options shared by every `run` subcommand
pub struct RunOptions {
    pub twice: bool,
    pub dump: Option<PathBuf>,
    pub format: OutputFormat,
}

impl RunOptions {
    fn mode(&self) -> RunMode {
        if self.twice {
            RunMode::RepeatedRun
        } else {
            RunMode::FreshRun
        }
    }
}

/// Run the service state check against a service snapshot
pub async fn run_windows_service(instance: &Path, services: &Path, options: RunOptions) -> Result<()> {
    let config = load_check_config::<WindowsServiceInstance>(instance)?;
    let manager = StaticServiceManager::from_file(services)?;
    let mut driver = CheckDriver::new(WindowsServiceCheck::new(manager));
    execute(&mut driver, &config, &options).await
}

/// Run the container check against a runtime snapshot
pub async fn run_container(instance: &Path, snapshot: &Path, options: RunOptions) -> Result<()> {
    let config = load_check_config::<ContainerInstance>(instance)?;
    let runtime = StaticContainerRuntime::from_file(snapshot)?;
    let mut driver = CheckDriver::new(ContainerCheck::new(runtime));
    execute(&mut driver, &config, &options).await
}

fn load_check_config<I: InstanceConfig>(path: &Path) -> Result<CheckConfig<I>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read check config {}", path.display()))?;
    CheckConfig::from_json(&content)
        .with_context(|| format!("Invalid check config {}", path.display()))
}

async fn execute<C: AgentCheck>(
    driver: &mut CheckDriver<C>,
    config: &CheckConfig<C::Instance>,
    options: &RunOptions,
) -> Result<()> {
    let mode = options.mode();
    info!(check = %driver.check().name(), mode = %mode, "Running check");
    let result = mode.execute(driver, config).await;

    // Whatever was recorded is still worth showing when an instance failed
    let snapshot = driver.store().snapshot();
    if let Some(path) = &options.dump {
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write observations to {}", path.display()))?;
    }

    match options.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&snapshot)?),
        OutputFormat::Table => {
            let rows: Vec<ObservationRow> = snapshot.observations.iter().map(ObservationRow::from).collect();
            print_table(&rows, options.format)?;
            for warning in &snapshot.warnings {
                print_warning(warning);
            }
        }
    }

    let summary = result.with_context(|| format!("{} run failed", driver.check().name()))?;
    if options.format == OutputFormat::Table {
        print_info(&format!(
            "{} run(s), {} instance run(s), {} observation(s) in {}ms",
            summary.runs,
            summary.instances_run,
            summary.observations_added,
            summary.elapsed.as_millis()
        ));
        if let Some(path) = &options.dump {
            print_info(&format!("Observations written to {}", path.display()));
        }
    }
    Ok(())
}
