//! Check harness CLI
//!
//! Runs monitoring checks against recorded backend snapshots, evaluates
//! expectations over dumped observations, and answers filter and
//! service-state questions.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{assert, filter, run, state};
use harness_lib::{HarnessMetrics, StructuredLogger};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{LogFormat, Settings};

const CLI_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Check harness CLI
#[derive(Parser)]
#[command(name = "checkctl")]
#[command(author, version, about = "Run and assert monitoring agent checks", long_about = None)]
pub struct Cli {
    /// Output format (overrides the settings file)
    #[arg(long, short, env = "CHECKCTL_FORMAT")]
    pub format: Option<output::OutputFormat>,

    /// Log format (overrides the settings file)
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Print harness metrics in Prometheus text format when done
    #[arg(long)]
    pub print_metrics: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a check against a recorded backend
    #[command(subcommand)]
    Run(RunCommands),

    /// Evaluate expectations against recorded observations
    Assert {
        /// Observations JSON written by `run --dump`
        #[arg(long)]
        observations: PathBuf,

        /// JSON array of expectations
        #[arg(long)]
        expectations: PathBuf,
    },

    /// Check whether a tag set passes include/exclude filters
    Filter {
        /// Include pattern (repeatable)
        #[arg(long)]
        include: Vec<String>,

        /// Exclude pattern (repeatable)
        #[arg(long)]
        exclude: Vec<String>,

        /// Candidate tags, e.g. docker_image:nginx
        #[arg(required = true)]
        tags: Vec<String>,
    },

    /// Show the status a service state maps to
    State {
        /// Service manager state label, e.g. "Start Pending"
        state: String,
    },
}

#[derive(Subcommand)]
pub enum RunCommands {
    /// Run the service state check
    WindowsService {
        /// Check config with `instances`
        #[arg(long)]
        instance: PathBuf,

        /// Service snapshot: {"hosts": {"<host>": [{"name", "state"}]}}
        #[arg(long)]
        services: PathBuf,

        /// Run the check twice without resetting observations
        #[arg(long)]
        twice: bool,

        /// Write recorded observations to this file
        #[arg(long)]
        dump: Option<PathBuf>,
    },

    /// Run the container metrics check
    Container {
        /// Check config with `instances`
        #[arg(long)]
        instance: PathBuf,

        /// Runtime snapshot with containers, images and stats
        #[arg(long)]
        snapshot: PathBuf,

        /// Run the check twice without resetting observations
        #[arg(long)]
        twice: bool,

        /// Write recorded observations to this file
        #[arg(long)]
        dump: Option<PathBuf>,
    },
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json().with_writer(std::io::stderr)).init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load()?;

    init_tracing(cli.log_format.unwrap_or(settings.log_format));
    StructuredLogger::new("checkctl").log_startup(CLI_VERSION);

    let format = cli.format.unwrap_or(settings.output_format);

    let result = match cli.command {
        Commands::Run(RunCommands::WindowsService {
            instance,
            services,
            twice,
            dump,
        }) => {
            let options = run::RunOptions { twice, dump, format };
            run::run_windows_service(&instance, &services, options).await
        }
        Commands::Run(RunCommands::Container {
            instance,
            snapshot,
            twice,
            dump,
        }) => {
            let options = run::RunOptions { twice, dump, format };
            run::run_container(&instance, &snapshot, options).await
        }
        Commands::Assert {
            observations,
            expectations,
        } => assert::assert_observations(&observations, &expectations, format),
        Commands::Filter {
            include,
            exclude,
            tags,
        } => filter::check_filter(&include, &exclude, &tags, format),
        Commands::State { state } => state::show_state(&state, format),
    };

    if cli.print_metrics {
        print!("{}", HarnessMetrics::new().render()?);
    }

    result
}
