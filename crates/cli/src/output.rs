//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use harness_lib::{CheckStatus, MetricType, Observation, ObservationKind};
use serde::{Deserialize, Serialize};
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table, or the items as JSON
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return Ok(());
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
    }
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn format_kind(kind: &ObservationKind) -> &'static str {
    match kind {
        ObservationKind::Metric(MetricType::Gauge) => "gauge",
        ObservationKind::Metric(MetricType::Rate) => "rate",
        ObservationKind::Metric(MetricType::Count) => "count",
        ObservationKind::ServiceCheck => "service_check",
    }
}

/// Color a check status by severity
pub fn color_status(status: CheckStatus) -> String {
    let label = status.to_string();
    match status {
        CheckStatus::Ok => label.green().to_string(),
        CheckStatus::Warning => label.yellow().to_string(),
        CheckStatus::Critical => label.red().to_string(),
        CheckStatus::Unknown => label.dimmed().to_string(),
    }
}

pub fn color_result(ok: bool) -> String {
    if ok {
        "PASS".green().bold().to_string()
    } else {
        "FAIL".red().bold().to_string()
    }
}

/// Row for the observations table
#[derive(Tabled, Serialize)]
pub struct ObservationRow {
    #[tabled(rename = "#")]
    pub sequence: u64,
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "Tags")]
    pub tags: String,
}

impl From<&Observation> for ObservationRow {
    fn from(observation: &Observation) -> Self {
        let value = match observation.status {
            Some(status) => color_status(status),
            None => format!("{:.2}", observation.value),
        };
        Self {
            sequence: observation.sequence,
            kind: format_kind(&observation.kind).to_string(),
            name: observation.name.clone(),
            value,
            tags: observation.tags.to_string(),
        }
    }
}
