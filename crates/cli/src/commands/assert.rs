//! Expectation evaluation against recorded observations

use anyhow::{Context, Result};
use harness_lib::{
    evaluate_scenario, Expectation, HarnessMetrics, ObservationStore, ScenarioReport, StoreSnapshot,
};
use serde::Serialize;
use std::path::Path;
use tabled::Tabled;

use crate::output::{color_result, print_error, print_success, print_table, OutputFormat};

/// Row for the assertion results table
#[derive(Tabled, Serialize)]
struct OutcomeRow {
    #[tabled(rename = "Expectation")]
    expectation: String,
    #[tabled(rename = "Matched")]
    matched: usize,
    #[tabled(rename = "Result")]
    result: String,
}

/// Evaluate an expectations file against a dumped observations file
pub fn assert_observations(observations: &Path, expectations: &Path, format: OutputFormat) -> Result<()> {
    let report = evaluate_files(observations, expectations)?;
    HarnessMetrics::new().record_scenario(report.failure_count() as u64);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Table => {
            let rows: Vec<OutcomeRow> = report
                .outcomes
                .iter()
                .map(|o| OutcomeRow {
                    expectation: o.expectation.to_string(),
                    matched: o.matched_count,
                    result: color_result(o.ok),
                })
                .collect();
            print_table(&rows, format)?;
        }
    }

    match report.into_result() {
        Ok(report) => {
            if format == OutputFormat::Table {
                print_success(&format!("All {} expectations met", report.outcomes.len()));
            }
            Ok(())
        }
        Err(e) => {
            print_error(&e.to_string());
            Err(e.into())
        }
    }
}

fn evaluate_files(observations: &Path, expectations: &Path) -> Result<ScenarioReport> {
    let content = std::fs::read_to_string(observations)
        .with_context(|| format!("Failed to read observations {}", observations.display()))?;
    let snapshot: StoreSnapshot =
        serde_json::from_str(&content).context("Failed to parse observations")?;

    let content = std::fs::read_to_string(expectations)
        .with_context(|| format!("Failed to read expectations {}", expectations.display()))?;
    let expectations: Vec<Expectation> =
        serde_json::from_str(&content).context("Failed to parse expectations")?;

    let store = ObservationStore::from_observations(snapshot.observations)?;
    Ok(evaluate_scenario(&expectations, &store))
}
