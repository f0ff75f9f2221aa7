//! Ticket statistics report generator
//!
//! A single-operator batch tool: one CSV ticket export in, one or more
//! HTML reports out. Clustering, statistics and rendering run fully
//! in-memory; nothing is persisted between runs.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ticketstats::cli::{Cli, Commands};
use ticketstats::evaluate::{cluster_forest, evaluate, ClustersOptions, EvaluateOptions};
use ticketstats::ClusterError;

/// Process exit codes, see the CLI help text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    GenericError = 1,
    NotFound = 3,
    ValidationFailed = 4,
}

impl ExitCode {
    fn code(self) -> i32 {
        self as i32
    }
}

/// Maps an error to its process exit code.
fn error_to_exit_code(error: &anyhow::Error) -> ExitCode {
    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        if io_error.kind() == std::io::ErrorKind::NotFound {
            return ExitCode::NotFound;
        }
    }
    if error.downcast_ref::<ClusterError>().is_some() {
        return ExitCode::ValidationFailed;
    }
    ExitCode::GenericError
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Report {
            csv,
            project,
            component,
            tracker_url,
            split_by_component,
            output_dir,
            config,
        } => evaluate(&EvaluateOptions {
            csv,
            project,
            component,
            tracker_base: tracker_url,
            split_by_component,
            output_dir,
            config,
        }),
        Commands::Clusters {
            csv,
            project,
            component,
            full,
            config,
        } => {
            let forest = cluster_forest(&ClustersOptions {
                csv,
                project,
                component,
                config,
                full,
            })?;
            print!("{}", forest);
            Ok(())
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet);

    if let Err(error) = run(cli) {
        eprintln!("Error: {:#}", error);
        std::process::exit(error_to_exit_code(&error).code());
    }
}
