//! Include/exclude filter evaluation

use anyhow::{Context, Result};
use colored::Colorize;
use harness_lib::FilterSet;
use serde::Serialize;

use crate::output::OutputFormat;

#[derive(Debug, Serialize)]
struct FilterDecision<'a> {
    tags: &'a [String],
    include: &'a [String],
    exclude: &'a [String],
    included: bool,
}

/// Print whether an entity with `tags` passes the filters
pub fn check_filter(
    include: &[String],
    exclude: &[String],
    tags: &[String],
    format: OutputFormat,
) -> Result<()> {
    let filters = FilterSet::new(include, exclude).context("Invalid filter pattern")?;
    let included = filters.is_included(tags);

    match format {
        OutputFormat::Json => {
            let decision = FilterDecision {
                tags,
                include,
                exclude,
                included,
            };
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
        OutputFormat::Table => {
            if filters.is_empty() {
                println!("{}", "No filters configured".dimmed());
            }
            let verdict = if included {
                "included".green().bold()
            } else {
                "excluded".red().bold()
            };
            println!("[{}] {}", tags.join(", "), verdict);
        }
    }
    Ok(())
}
