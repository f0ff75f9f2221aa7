//! Command-line interface definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Ticket statistics report generator
///
/// Reads a semicolon-delimited CSV ticket export, reconstructs the
/// parent/child clusters from issue links and renders work-effort and
/// resolution-time statistics as an HTML report.
///
/// Exit Codes:
///   0  - Command succeeded
///   1  - Generic error occurred
///   2  - Invalid arguments or usage error
///   3  - Input file not found
///   4  - Validation failed (ticket links contain a cycle)
#[derive(Parser)]
#[command(name = "ticketstats")]
#[command(about = "Reports for issue tracker CSV exports", long_about = None)]
pub struct Cli {
    /// Suppress informational output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate HTML report(s) from a ticket export
    Report {
        /// Path to the CSV ticket export
        csv: PathBuf,

        /// Project key filter (overrides the configured default)
        #[arg(short, long)]
        project: Option<String>,

        /// Component filter (overrides the configured default and
        /// disables splitting)
        #[arg(short, long)]
        component: Option<String>,

        /// Base URL of the tracker web UI, used for ticket links in the
        /// report
        #[arg(long, default_value = "")]
        tracker_url: String,

        /// Additionally generate one report per component
        #[arg(long)]
        split_by_component: bool,

        /// Directory the report file(s) are written to
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Path to the configuration file (default: ticketstats.toml if
        /// present)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the clustered ticket forest to stdout
    Clusters {
        /// Path to the CSV ticket export
        csv: PathBuf,

        /// Project key filter (overrides the configured default)
        #[arg(short, long)]
        project: Option<String>,

        /// Component filter (overrides the configured default)
        #[arg(short, long)]
        component: Option<String>,

        /// Print all children instead of truncating long lists
        #[arg(long)]
        full: bool,

        /// Path to the configuration file (default: ticketstats.toml if
        /// present)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}
