//! Service state lookup

use anyhow::Result;
use harness_lib::checks::ServiceState;
use serde::Serialize;
use tabled::Tabled;

use crate::output::{color_status, print_table, OutputFormat};

#[derive(Tabled, Serialize)]
struct StateRow {
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Recognized")]
    recognized: bool,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Code")]
    code: u8,
}

/// Print the service check status a service manager state maps to
pub fn show_state(label: &str, format: OutputFormat) -> Result<()> {
    let state = ServiceState::from_label(label);
    let status = state.status();
    let status = match format {
        OutputFormat::Table => color_status(status),
        OutputFormat::Json => status.to_string(),
    };
    let row = StateRow {
        state: label.to_string(),
        recognized: state.label() == label,
        status,
        code: state.status().code(),
    };
    print_table(&[row], format)
}
